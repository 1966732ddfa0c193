//! Axum-based HTTP server for the embedcache prediction service.
//!
//! # Components
//!
//! - `handlers`: Implementation of individual endpoints (predict, stats, health, metrics, admin).
//! - `middleware`: Request ID tracking layers.
//! - `routes`: The router configuration that ties everything together.

mod handlers;
mod middleware;
mod routes;

pub use routes::{create_router, AppState};
