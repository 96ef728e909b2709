//! dinedesk-server
//!
//! HTTP boundary of the system. `routes` holds the router and all handlers,
//! `state` the shared application state, `api_types` the request/response
//! JSON shapes. The binary entry point (`main.rs`) stays thin: tracing,
//! state construction, middleware, serve.

pub mod api_types;
pub mod routes;
pub mod state;
