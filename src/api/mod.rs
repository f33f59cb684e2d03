//! HTTP API.
//!
//! Exposes the chat pipeline and appointment scheduling as JSON endpoints
//! under `/api/`. `api_router()` returns a `Router` that can be mounted on
//! any axum server; `start_api_server()` binds and serves it.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_api_server, ApiServer, ServerInfo};
pub use types::ApiContext;
