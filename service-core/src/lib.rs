//! service-core: Shared infrastructure for the image studio workspace.
pub mod config;
pub mod dtos;
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower_http;
pub use tracing;
