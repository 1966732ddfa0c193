//! Data models for the prediction HTTP API.
//!
//! This module contains the request/response bodies exchanged with clients
//! (`api`). Cache, latency and policy snapshots are reused from their owning
//! modules so the wire shape always matches what the service reports.

pub mod api;

pub use api::{
    HealthResponse, PolicyStatus, PredictRequest, PredictResponse, RiskUpdateResponse,
    StatsResponse,
};
