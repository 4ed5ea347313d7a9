//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
pub(crate) mod handlers;
mod rate_limit;
mod server;

pub use handlers::ApiError;
pub use rate_limit::DEFAULT_REQUESTS_PER_MINUTE;
pub use server::{DEFAULT_CORS_ORIGINS, HttpServer};
