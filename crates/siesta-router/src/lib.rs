//! # Siesta Router
//!
//! Verb-aware path routing for REST resources: compiles human-readable path
//! templates into anchored matchers and selects the first registered route
//! that accepts an incoming (path, method) pair.
//!
//! ## Features
//!
//! - **Literal routes** - `/books`, `/v1.0/status`
//! - **Named parameters** - `/books/:id` captures one path segment
//! - **Wildcard parameters** - `/files/:path*` captures across `/`
//! - **Verb-tagged routes** - one of GET, POST, PUT, DELETE per route
//! - **First-match dispatch** - routes are tried in insertion order
//! - **Read-only matching** - endpoints are immutable after registration and
//!   safe to share across request workers without locking
//!
//! ## Quick Start
//!
//! ```rust
//! use siesta_router::{Endpoint, Method, Route};
//!
//! let mut endpoint = Endpoint::new("/books");
//! endpoint.add_route(Route::new("/books", Method::Get, ()).unwrap());
//! endpoint.add_route(Route::new("/books/:id", Method::Get, ()).unwrap());
//!
//! let (route, params) = endpoint.find_route("/books/42", Method::Get).unwrap();
//! assert_eq!(route.template(), "/books/:id");
//! assert_eq!(params.get("id"), Some("42"));
//! ```
//!
//! ## Template Syntax
//!
//! | Template | Matches | Captures |
//! |----------|---------|----------|
//! | `/books` | `/books`, `/books/` | nothing |
//! | `/books/:id` | `/books/42` | `id = "42"` |
//! | `/files/:path*` | `/files/a/b/c` | `path = "a/b/c"` |
//! | `/v1.0/status` | `/v1.0/status` only | nothing |
//!
//! A named parameter matches one-or-more characters excluding `/`, `#` and
//! `?`. A wildcard parameter matches one-or-more of anything, including `/`.
//! Parameter names may not contain `/ # ? ( ) . \`. At most one trailing
//! slash is stripped from the subject path before matching.
//!
//! ## Concurrency
//!
//! An [`Endpoint`] is built once, single-threaded, during resource
//! registration and is read-only afterward. [`Endpoint::find_route`] and
//! [`Route::matches`] perform no mutation, so any number of request workers
//! can match against the same endpoint concurrently. Interleaving
//! [`Endpoint::add_route`] with matching is not supported; finish
//! registration before serving begins.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// Wildcard parameters: a `:name` run immediately followed by `*`.
static WILDCARD_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([^/#?()\.\\]+)\*").unwrap());

/// Plain parameters: any `:name` run left after wildcard rewriting.
static NAMED_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r":([^/#?()\.\\]+)").unwrap());

/// A path template that cannot be turned into a valid matcher.
///
/// Raised for malformed parameter names (characters the matcher rejects in a
/// capture group name) and for unbalanced syntax carried into the pattern.
/// Registration should fail fast on this error rather than skip the route.
#[derive(Debug, Error)]
#[error("path template {template:?} does not compile to a matcher")]
pub struct CompileError {
    template: String,
    #[source]
    source: regex::Error,
}

impl CompileError {
    /// The template that failed to compile.
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// The verbs a route can be tagged with.
///
/// Request methods outside this set are never matched; the dispatcher treats
/// them like any other failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Token form of the verb, e.g. `"GET"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Parse a verb token. Only `GET`, `POST`, `PUT` and `DELETE` are
    /// recognized.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named values extracted from a successful path match.
///
/// Keys are unique; insertion order is irrelevant. Empty captured values are
/// never inserted, so an empty path parameter is indistinguishable from an
/// absent one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet(HashMap<String, String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Value extracted for the given parameter name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|v| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, String);
    type IntoIter = std::collections::hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An anchored matcher built once from a path template.
///
/// Compiling the same template always yields a matcher with identical
/// matching semantics, and literal dots in the template match literal dots
/// in the path.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile a path template into an anchored matcher.
    ///
    /// The rewrite runs in a fixed order: literal dots are escaped first,
    /// wildcard parameters are rewritten before plain ones, and the result
    /// is anchored to the whole subject. Later steps must not re-escape or
    /// re-parse what earlier steps produced.
    ///
    /// ```rust
    /// use siesta_router::CompiledPattern;
    ///
    /// let pattern = CompiledPattern::compile("/files/:path*").unwrap();
    /// let params = pattern.captures("/files/a/b/c").unwrap();
    /// assert_eq!(params.get("path"), Some("a/b/c"));
    /// ```
    pub fn compile(template: &str) -> Result<Self, CompileError> {
        let escaped = escape_literal_dots(template);
        let with_wildcards = WILDCARD_PARAM.replace_all(&escaped, "(?P<${1}>.+)");
        let with_params = NAMED_PARAM.replace_all(&with_wildcards, "(?P<${1}>[^/#?]+)");
        let anchored = format!(r"\A{}\z", with_params);

        let regex = Regex::new(&anchored).map_err(|source| CompileError {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            template: template.to_string(),
            regex,
        })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Test an exact subject string, extracting named parameters.
    ///
    /// The subject is taken as-is; trailing-slash normalization is the
    /// route's job, not the pattern's.
    pub fn captures(&self, subject: &str) -> Option<ParameterSet> {
        let caps = self.regex.captures(subject)?;
        let mut params = ParameterSet::new();
        for name in self.regex.capture_names().flatten() {
            if let Some(value) = caps.name(name) {
                if !value.as_str().is_empty() {
                    params.insert(name, value.as_str());
                }
            }
        }
        Some(params)
    }
}

/// Escape every `.` not already escaped, so it matches itself rather than
/// "any character". Runs before parameter rewriting; parameter names cannot
/// contain `.` or `\`, so the inserted escapes survive the later steps.
fn escape_literal_dots(template: &str) -> String {
    let mut escaped = String::with_capacity(template.len());
    let mut prev_was_backslash = false;
    for ch in template.chars() {
        if ch == '.' && !prev_was_backslash {
            escaped.push('\\');
        }
        prev_was_backslash = ch == '\\';
        escaped.push(ch);
    }
    escaped
}

/// A verb-tagged route: a compiled pattern plus the handler registered for
/// it.
///
/// Created once during resource registration and immutable afterward; owned
/// exclusively by its [`Endpoint`]. The handler slot is generic so the
/// serving layer can store a typed reference captured at registration time
/// instead of resolving anything by name per request.
#[derive(Debug, Clone)]
pub struct Route<H> {
    template: String,
    method: Method,
    pattern: CompiledPattern,
    handler: H,
}

impl<H> Route<H> {
    /// Build a route from a path template.
    ///
    /// Fails with [`CompileError`] on a malformed template; registration
    /// should abort for that resource rather than silently skip the route.
    pub fn new(
        template: impl Into<String>,
        method: Method,
        handler: H,
    ) -> Result<Self, CompileError> {
        let template = template.into();
        let pattern = CompiledPattern::compile(&template)?;
        Ok(Self {
            template,
            method,
            pattern,
            handler,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Match a concrete request path against this route's pattern.
    ///
    /// At most one trailing `/` is stripped from the subject before testing,
    /// so `matches(p)` and `matches(p + "/")` agree for any `p` not already
    /// ending in `/`. On success, every named capture with a non-empty value
    /// lands in the returned [`ParameterSet`].
    pub fn matches(&self, path: &str) -> Option<ParameterSet> {
        let subject = path.strip_suffix('/').unwrap_or(path);
        self.pattern.captures(subject)
    }
}

/// An ordered collection of routes under a common root path: every operation
/// registered for one resource.
///
/// Built single-threaded during registration and read-only afterward.
/// Matching performs no mutation, so concurrent [`Endpoint::find_route`]
/// calls need no locking. Callers must not interleave
/// [`Endpoint::add_route`] with matching.
#[derive(Debug, Clone)]
pub struct Endpoint<H> {
    root: String,
    routes: Vec<Route<H>>,
}

impl<H> Endpoint<H> {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            routes: Vec::new(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Append a route, preserving insertion order.
    ///
    /// An empty route (blank template) is rejected with a diagnostic and the
    /// route list is left unchanged; the guard catches default-initialized
    /// values reaching registration. Returns whether the route was added.
    pub fn add_route(&mut self, route: Route<H>) -> bool {
        if route.template.is_empty() {
            warn!(root = %self.root, "rejecting empty route registration");
            return false;
        }
        debug!(template = %route.template, method = %route.method, "route registered");
        self.routes.push(route);
        true
    }

    /// The first route, in insertion order, whose method equals `method` and
    /// whose pattern accepts `path`, together with the extracted parameters.
    ///
    /// `None` covers both "wrong method" and "wrong path"; callers are not
    /// given a way to tell the two apart.
    ///
    /// ```rust
    /// use siesta_router::{Endpoint, Method, Route};
    ///
    /// let mut endpoint = Endpoint::new("/items");
    /// endpoint.add_route(Route::new("/items/:id", Method::Delete, ()).unwrap());
    ///
    /// assert!(endpoint.find_route("/items/7", Method::Delete).is_some());
    /// assert!(endpoint.find_route("/items/7", Method::Put).is_none());
    /// ```
    pub fn find_route(&self, path: &str, method: Method) -> Option<(&Route<H>, ParameterSet)> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| route.matches(path).map(|params| (route, params)))
    }

    /// All registered routes, in insertion order.
    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn get_route(template: &str) -> Route<()> {
        Route::new(template, Method::Get, ()).unwrap()
    }

    #[test]
    fn literal_template_matches_only_itself() {
        let route = get_route("/books");
        assert!(route.matches("/books").is_some());
        assert!(route.matches("/books/").is_some());
        assert!(route.matches("/books/42").is_none());
        assert!(route.matches("/book").is_none());
        assert!(route.matches("/bookstore").is_none());
    }

    #[test]
    fn named_parameter_extracts_one_segment() {
        let route = get_route("/books/:id");
        let params = route.matches("/books/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn empty_segment_is_no_match() {
        // "/books/" normalizes to "/books", which the pattern rejects: a
        // parameter requires at least one character.
        let route = get_route("/books/:id");
        assert!(route.matches("/books/").is_none());
    }

    #[test]
    fn named_parameter_stops_at_separators() {
        let route = get_route("/books/:id");
        assert!(route.matches("/books/4/2").is_none());
    }

    #[test]
    fn multiple_parameters_extract_independently() {
        let route = get_route("/users/:user/books/:book");
        let params = route.matches("/users/7/books/42").unwrap();
        assert_eq!(params.get("user"), Some("7"));
        assert_eq!(params.get("book"), Some("42"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn wildcard_parameter_crosses_slashes() {
        let route = get_route("/files/:path*");
        let params = route.matches("/files/a/b/c").unwrap();
        assert_eq!(params.get("path"), Some("a/b/c"));

        let params = route.matches("/files/readme").unwrap();
        assert_eq!(params.get("path"), Some("readme"));
    }

    #[test]
    fn trailing_slash_is_idempotent() {
        let route = get_route("/books/:id");
        assert_eq!(route.matches("/books/42"), route.matches("/books/42/"));

        let route = get_route("/books");
        assert_eq!(route.matches("/books"), route.matches("/books/"));
    }

    #[test]
    fn only_one_trailing_slash_is_stripped() {
        let route = get_route("/books");
        assert!(route.matches("/books//").is_none());
    }

    #[test]
    fn literal_dot_is_not_a_wildcard() {
        let route = get_route("/v1.0/status");
        assert!(route.matches("/v1.0/status").is_some());
        assert!(route.matches("/v1x0/status").is_none());
    }

    #[test]
    fn already_escaped_dot_is_left_alone() {
        let pattern = CompiledPattern::compile(r"/v1\.0/status").unwrap();
        assert!(pattern.captures("/v1.0/status").is_some());
        assert!(pattern.captures("/v1x0/status").is_none());
    }

    #[test]
    fn parameter_name_stops_at_dot() {
        let route = get_route("/files/:name.json");
        let params = route.matches("/files/report.json").unwrap();
        assert_eq!(params.get("name"), Some("report"));
        assert!(route.matches("/files/report_json").is_none());
    }

    #[test]
    fn recompilation_is_equivalent() {
        let a = CompiledPattern::compile("/books/:id").unwrap();
        let b = CompiledPattern::compile("/books/:id").unwrap();
        assert_eq!(a.captures("/books/9"), b.captures("/books/9"));
        assert_eq!(a.captures("/books"), b.captures("/books"));
    }

    #[test]
    fn malformed_parameter_name_fails_to_compile() {
        let err = CompiledPattern::compile("/books/:book-id").unwrap_err();
        assert_eq!(err.template(), "/books/:book-id");
    }

    #[test]
    fn unbalanced_template_fails_to_compile() {
        assert!(CompiledPattern::compile("/books/(").is_err());
    }

    #[test]
    fn empty_route_is_rejected() {
        let mut endpoint: Endpoint<()> = Endpoint::new("/books");
        assert!(!endpoint.add_route(Route::new("", Method::Get, ()).unwrap()));
        assert_eq!(endpoint.routes().len(), 0);

        assert!(endpoint.add_route(Route::new("/books", Method::Get, ()).unwrap()));
        assert_eq!(endpoint.routes().len(), 1);
    }

    #[test]
    fn find_route_requires_matching_method() {
        let mut endpoint = Endpoint::new("/books");
        endpoint.add_route(Route::new("/books/:id", Method::Get, ()).unwrap());

        assert!(endpoint.find_route("/books/1", Method::Get).is_some());
        assert!(endpoint.find_route("/books/1", Method::Put).is_none());
        assert!(endpoint.find_route("/books/1", Method::Delete).is_none());
    }

    #[test]
    fn first_matching_route_wins() {
        let mut endpoint = Endpoint::new("/files");
        endpoint.add_route(Route::new("/files/:path*", Method::Get, "wild").unwrap());
        endpoint.add_route(Route::new("/files/:id", Method::Get, "item").unwrap());

        // The wildcard is a superset matcher; added first, it always wins.
        let (route, _) = endpoint.find_route("/files/42", Method::Get).unwrap();
        assert_eq!(*route.handler(), "wild");

        // Reversed insertion order reverses the winner.
        let mut endpoint = Endpoint::new("/files");
        endpoint.add_route(Route::new("/files/:id", Method::Get, "item").unwrap());
        endpoint.add_route(Route::new("/files/:path*", Method::Get, "wild").unwrap());

        let (route, _) = endpoint.find_route("/files/42", Method::Get).unwrap();
        assert_eq!(*route.handler(), "item");
    }

    #[test]
    fn list_get_delete_scenario() {
        let mut endpoint = Endpoint::new("/items");
        endpoint.add_route(Route::new("/items", Method::Get, "list").unwrap());
        endpoint.add_route(Route::new("/items/:id", Method::Get, "get").unwrap());
        endpoint.add_route(Route::new("/items/:id", Method::Delete, "delete").unwrap());

        let (route, params) = endpoint.find_route("/items", Method::Get).unwrap();
        assert_eq!(*route.handler(), "list");
        assert!(params.is_empty());

        let (route, params) = endpoint.find_route("/items/7", Method::Get).unwrap();
        assert_eq!(*route.handler(), "get");
        assert_eq!(params.get("id"), Some("7"));

        assert!(endpoint.find_route("/items/7", Method::Put).is_none());

        let (route, params) = endpoint.find_route("/items/7", Method::Delete).unwrap();
        assert_eq!(*route.handler(), "delete");
        assert_eq!(params.get("id"), Some("7"));
    }

    #[test]
    fn method_tokens_round_trip() {
        for method in [Method::Get, Method::Post, Method::Put, Method::Delete] {
            assert_eq!(Method::from_token(method.as_str()), Some(method));
        }
        assert_eq!(Method::from_token("PATCH"), None);
        assert_eq!(Method::from_token("get"), None);
    }
}
