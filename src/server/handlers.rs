// HTTP request handlers

use super::routes::AppState;
use crate::agent::RiskSnapshot;
use crate::error::ServiceError;
use crate::metrics;
use crate::models::{HealthResponse, PredictRequest, PredictResponse, RiskUpdateResponse, StatsResponse};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::time::Instant;
use tracing::{debug, info, warn};

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        cache_enabled: state.service.is_cache_enabled(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Handler for /predict
pub async fn predict_handler(
    State(state): State<AppState>,
    body: String, // Get raw JSON as string first
) -> Result<Json<PredictResponse>, ServiceError> {
    let start = Instant::now();

    let result = serde_json::from_str::<PredictRequest>(&body)
        .map_err(|e| ServiceError::InvalidRequest(format!("JSON deserialization error: {}", e)))
        .and_then(|req| {
            debug!(
                "Received predict request: rows={}, use_cache={}",
                req.features.len(),
                req.use_cache
            );
            state.service.predict(&req)
        });

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(ServiceError::InvalidRequest(msg)) => {
            warn!("Rejected predict request: {}", msg);
            StatusCode::BAD_REQUEST
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    metrics::record_request("/predict", status.as_u16(), start.elapsed().as_secs_f64());

    result.map(Json)
}

/// Handler for /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.service.stats())
}

/// Handler for /metrics (Prometheus text format)
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [("Content-Type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Handler for /admin/cache/clear
pub async fn clear_cache_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.clear_cache())
}

/// Handler for /admin/risk: an external metrics provider pushes a snapshot
pub async fn risk_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<RiskUpdateResponse>, ServiceError> {
    let snapshot: RiskSnapshot = serde_json::from_str(&body)
        .map_err(|e| ServiceError::InvalidRequest(format!("JSON deserialization error: {}", e)))?;

    let decision = state.service.apply_risk(&snapshot);
    info!(
        "External risk snapshot applied: correctness_risk={:?}, drift_score={:?} -> {}",
        snapshot.correctness_risk, snapshot.drift_score, decision
    );

    Ok(Json(RiskUpdateResponse {
        decision,
        cache: state.service.cache().stats(),
    }))
}
