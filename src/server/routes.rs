// HTTP routes configuration

use super::handlers::{
    clear_cache_handler, health_handler, metrics_handler, predict_handler, risk_handler,
    stats_handler,
};
use super::middleware::{request_id_layers, trace_layer};
use crate::config::AppConfig;
use crate::error::Result;
use crate::service::PredictionService;
use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

pub fn create_router(config: AppConfig, service: PredictionService) -> Result<Router> {
    let compression = config.performance.enable_compression;
    let max_body_bytes = config.performance.max_body_bytes;

    let state = AppState {
        service: Arc::new(service),
    };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .route("/admin/cache/clear", post(clear_cache_handler))
        .route("/admin/risk", post(risk_handler));

    if compression {
        app = app.layer(CompressionLayer::new());
    }

    let app = app
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(trace_layer())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    Ok(app)
}
