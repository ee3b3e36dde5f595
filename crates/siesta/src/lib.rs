// Siesta - REST resources over verb-aware routing
// Capability-declared resources, typed handlers captured at registration,
// first-match JSON dispatch

pub mod api;
pub mod config;
pub mod params;
pub mod resource;

// Framework types
pub use api::{Api, EndpointBuilder};
pub use config::Config;
pub use params::Params;
pub use resource::{
    remove_route, retrieve_route, save_route, DeleteSupported, GetSupported, Handler,
    ListSupported, PostSupported, PutSupported, RemoveFn, RetrieveFn, SaveFn,
};

// Re-export the routing core
pub use siesta_router::{CompileError, CompiledPattern, Endpoint, Method, ParameterSet, Route};

// Re-export commonly used types from dependencies
pub use axum;
pub use axum::http::StatusCode;
pub use serde_json::Value;
