// File: src/params.rs
// Purpose: Merged request parameters (query values, form fields, path captures)

use std::collections::HashMap;
use std::str::FromStr;

use siesta_router::ParameterSet;

/// Parameters handed to resource methods: query string values, decoded form
/// fields, and path captures merged into one map.
///
/// Path captures are merged last and override everything else, so
/// `params.get("id")` on an item route is always the value the route
/// extracted from the path.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Value for the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    /// Value for the given key, parsed into `T`.
    pub fn get_as<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key)?.parse().ok()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Fold extracted path captures in, overriding existing entries.
    pub fn absorb(&mut self, captured: ParameterSet) {
        for (name, value) in captured {
            self.values.insert(name, value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
