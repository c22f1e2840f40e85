//! Axum HTTP API server.
//!
//! This crate provides:
//! - The submission/status surface over the job registry
//! - Streaming retrieval of finished artifacts
//! - Config, startup wiring, and the retention sweeper spawn

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
