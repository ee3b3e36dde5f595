// File: src/resource.rs
// Purpose: Capability traits a resource implements, and the typed handler
// references captured from them at registration time

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::Value;

use crate::params::Params;
use siesta_router::{CompileError, Method, Route};

/// Collection listing: `GET` on the resource root.
pub trait ListSupported: Send + Sync {
    fn list(&self, params: &Params) -> (StatusCode, Value);
}

/// Single-item retrieval: `GET` on `root/:id`.
pub trait GetSupported: Send + Sync {
    fn get(&self, params: &Params) -> (StatusCode, Value);
}

/// Item creation: `POST` on `root/:id` with a JSON body.
pub trait PostSupported: Send + Sync {
    fn post(&self, body: Value, params: &Params) -> (StatusCode, Value);
}

/// Item replacement: `PUT` on `root/:id` with a JSON body.
pub trait PutSupported: Send + Sync {
    fn put(&self, body: Value, params: &Params) -> (StatusCode, Value);
}

/// Item removal: `DELETE` on `root/:id`. The status code is the whole
/// response; no body is produced.
pub trait DeleteSupported: Send + Sync {
    fn delete(&self, params: &Params) -> StatusCode;
}

/// Handler for routes that read: list and get.
pub type RetrieveFn = Arc<dyn Fn(&Params) -> (StatusCode, Value) + Send + Sync>;

/// Handler for routes that write from a JSON body: post and put.
pub type SaveFn = Arc<dyn Fn(Value, &Params) -> (StatusCode, Value) + Send + Sync>;

/// Handler for routes that remove: delete.
pub type RemoveFn = Arc<dyn Fn(&Params) -> StatusCode + Send + Sync>;

/// A typed handler reference stored on a route.
///
/// Captured once at registration; dispatch calls whatever the matched route
/// carries and never resolves anything by name at request time.
#[derive(Clone)]
pub enum Handler {
    Retrieve(RetrieveFn),
    Save(SaveFn),
    Remove(RemoveFn),
}

/// Build a retrieve-category route (list, get).
pub fn retrieve_route(
    template: &str,
    method: Method,
    handler: RetrieveFn,
) -> Result<Route<Handler>, CompileError> {
    Route::new(template, method, Handler::Retrieve(handler))
}

/// Build a save-category route (post, put).
pub fn save_route(
    template: &str,
    method: Method,
    handler: SaveFn,
) -> Result<Route<Handler>, CompileError> {
    Route::new(template, method, Handler::Save(handler))
}

/// Build a remove-category route (delete).
pub fn remove_route(
    template: &str,
    method: Method,
    handler: RemoveFn,
) -> Result<Route<Handler>, CompileError> {
    Route::new(template, method, Handler::Remove(handler))
}
