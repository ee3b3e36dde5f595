// File: src/api.rs
// Purpose: Resource registration and request dispatch

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method as HttpMethod, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Router,
};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::params::Params;
use crate::resource::{
    remove_route, retrieve_route, save_route, DeleteSupported, GetSupported, Handler,
    ListSupported, PostSupported, PutSupported, RemoveFn, RetrieveFn, SaveFn,
};
use siesta_router::{CompileError, Endpoint, Method};

/// Registers the conventional route set for one resource.
///
/// A list-style route sits at exactly the root; item-style routes sit at
/// `root/:id`. Each capability method requires the matching trait bound, so
/// a resource without a capability cannot be registered for it - missing
/// capabilities are a compile-time error, not a request-time discovery.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use siesta::{EndpointBuilder, ListSupported, Params, StatusCode, Value};
///
/// struct Items;
///
/// impl ListSupported for Items {
///     fn list(&self, _params: &Params) -> (StatusCode, Value) {
///         (StatusCode::OK, Value::Array(vec![]))
///     }
/// }
///
/// let endpoint = EndpointBuilder::new("/items")
///     .list(Arc::new(Items))
///     .unwrap()
///     .build();
/// assert_eq!(endpoint.routes().len(), 1);
/// ```
pub struct EndpointBuilder {
    endpoint: Endpoint<Handler>,
}

impl EndpointBuilder {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new(root),
        }
    }

    fn item_template(&self) -> String {
        format!("{}/:id", self.endpoint.root())
    }

    /// Register collection listing at the root path.
    pub fn list<R>(mut self, resource: Arc<R>) -> Result<Self, CompileError>
    where
        R: ListSupported + 'static,
    {
        let template = self.endpoint.root().to_string();
        let handler: RetrieveFn = Arc::new(move |params| resource.list(params));
        self.endpoint
            .add_route(retrieve_route(&template, Method::Get, handler)?);
        Ok(self)
    }

    /// Register single-item retrieval at `root/:id`.
    pub fn get<R>(mut self, resource: Arc<R>) -> Result<Self, CompileError>
    where
        R: GetSupported + 'static,
    {
        let template = self.item_template();
        let handler: RetrieveFn = Arc::new(move |params| resource.get(params));
        self.endpoint
            .add_route(retrieve_route(&template, Method::Get, handler)?);
        Ok(self)
    }

    /// Register item creation at `root/:id`.
    pub fn post<R>(mut self, resource: Arc<R>) -> Result<Self, CompileError>
    where
        R: PostSupported + 'static,
    {
        let template = self.item_template();
        let handler: SaveFn = Arc::new(move |body, params| resource.post(body, params));
        self.endpoint
            .add_route(save_route(&template, Method::Post, handler)?);
        Ok(self)
    }

    /// Register item replacement at `root/:id`.
    pub fn put<R>(mut self, resource: Arc<R>) -> Result<Self, CompileError>
    where
        R: PutSupported + 'static,
    {
        let template = self.item_template();
        let handler: SaveFn = Arc::new(move |body, params| resource.put(body, params));
        self.endpoint
            .add_route(save_route(&template, Method::Put, handler)?);
        Ok(self)
    }

    /// Register item removal at `root/:id`.
    pub fn delete<R>(mut self, resource: Arc<R>) -> Result<Self, CompileError>
    where
        R: DeleteSupported + 'static,
    {
        let template = self.item_template();
        let handler: RemoveFn = Arc::new(move |params| resource.delete(params));
        self.endpoint
            .add_route(remove_route(&template, Method::Delete, handler)?);
        Ok(self)
    }

    /// Finish registration and hand the endpoint over for mounting.
    pub fn build(self) -> Endpoint<Handler> {
        self.endpoint
    }
}

/// A group of resource endpoints served as one JSON API.
///
/// Endpoints are mounted before serving begins and never change afterward;
/// dispatch walks them in mount order and asks each for the first matching
/// route.
#[derive(Default)]
pub struct Api {
    endpoints: Vec<Endpoint<Handler>>,
}

#[derive(Clone)]
struct DispatchState {
    endpoints: Arc<Vec<Endpoint<Handler>>>,
}

impl Api {
    pub fn new() -> Self {
        Self {
            endpoints: Vec::new(),
        }
    }

    /// Mount a built endpoint. Later mounts are tried later at dispatch.
    pub fn mount(&mut self, endpoint: Endpoint<Handler>) {
        info!(
            root = %endpoint.root(),
            routes = endpoint.routes().len(),
            "endpoint mounted"
        );
        self.endpoints.push(endpoint);
    }

    /// Convert into an axum router whose fallback dispatches to the mounted
    /// endpoints. Consumes the API: once serving starts, no further
    /// registration is possible.
    pub fn into_router(self) -> Router {
        let state = DispatchState {
            endpoints: Arc::new(self.endpoints),
        };
        Router::new().fallback(dispatch).with_state(state)
    }

    /// Bind the address and serve requests until shutdown.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!("serving on http://{addr}");
        axum::serve(listener, self.into_router())
            .await
            .context("server error")?;
        Ok(())
    }
}

async fn dispatch(
    State(state): State<DispatchState>,
    method: HttpMethod,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(method) = Method::from_token(method.as_str()) else {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    };
    let path = uri.path();

    let matched = state
        .endpoints
        .iter()
        .find_map(|endpoint| endpoint.find_route(path, method));

    // Wrong verb and wrong path are deliberately indistinguishable here.
    let Some((route, captured)) = matched else {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    };

    debug!(path, %method, template = route.template(), "route matched");

    let mut params = Params::from_map(query);
    merge_form_fields(&mut params, &headers, &body);
    params.absorb(captured);

    invoke(route.handler(), &headers, &body, &params)
}

/// Decode an `application/x-www-form-urlencoded` body into the parameter
/// map. JSON bodies are left for the save handlers; other content types are
/// ignored.
fn merge_form_fields(params: &mut Params, headers: &HeaderMap, body: &Bytes) {
    let Some(content_type) = headers.get("content-type").and_then(|v| v.to_str().ok()) else {
        return;
    };
    if !content_type.contains("application/x-www-form-urlencoded") {
        return;
    }

    let raw = String::from_utf8_lossy(body);
    for pair in raw.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            params.insert(
                urlencoding::decode(key).unwrap_or_default().to_string(),
                urlencoding::decode(value).unwrap_or_default().to_string(),
            );
        }
    }
}

/// Call the handler the matched route carries. Which method runs is decided
/// by route identity alone, never by inspecting the extracted parameters.
fn invoke(handler: &Handler, headers: &HeaderMap, body: &Bytes, params: &Params) -> Response {
    match handler {
        Handler::Retrieve(f) => {
            let (status, data) = f(params);
            (status, Json(data)).into_response()
        }
        Handler::Save(f) => {
            let payload = match decode_json_body(headers, body) {
                Ok(payload) => payload,
                Err(response) => return response,
            };
            let (status, data) = f(payload, params);
            (status, Json(data)).into_response()
        }
        Handler::Remove(f) => f(params).into_response(),
    }
}

/// Decode the JSON body for save-category handlers. A form-encoded body has
/// already been folded into the parameter map, so the payload stays null; an
/// unparseable JSON body is the client's error.
fn decode_json_body(headers: &HeaderMap, body: &Bytes) -> Result<JsonValue, Response> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.contains("application/json") || body.is_empty() {
        return Ok(JsonValue::Null);
    }

    serde_json::from_slice(body).map_err(|err| {
        debug!(%err, "rejecting unparseable JSON body");
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response()
    })
}
