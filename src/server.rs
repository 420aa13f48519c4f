//! HTTP prediction service.
//!
//! This module provides an HTTP server that:
//! - Accepts one feature vector via POST /predict/
//! - Accepts an ordered list of feature vectors via POST /predict_batch/
//! - Classifies them with a model artifact loaded once at startup
//!
//! # Architecture
//!
//! ```text
//! client ──→ POST /predict/ ─────→ [scaler → classifier] ──→ {"prediction": ...}
//!        ──→ POST /predict_batch/ ─→ [scaler → classifier] ──→ {"predictions": [...]}
//! ```
//!
//! The model is never mutated after startup, so requests share it without
//! locking and are handled independently.

use crate::core::features::FeatureVector;
use crate::inference::{BatchPredictResponse, ModelBundle, PredictResponse};
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Model used for every request
    pub model: Arc<ModelBundle>,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16, model: ModelBundle) -> Self {
        Self {
            port,
            model: Arc::new(model),
        }
    }
}

/// Shared server state
pub struct ServerState {
    model: Arc<ModelBundle>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_version: state.model.version.clone(),
    })
}

/// POST /predict/
async fn predict(
    State(state): State<Arc<ServerState>>,
    Json(vector): Json<FeatureVector>,
) -> Json<PredictResponse> {
    let prediction = state.model.classify_one(&vector);
    tracing::debug!(%prediction, "single prediction");
    Json(PredictResponse { prediction })
}

/// POST /predict_batch/
///
/// Labels are returned in request order.
async fn predict_batch(
    State(state): State<Arc<ServerState>>,
    Json(vectors): Json<Vec<FeatureVector>>,
) -> Result<Json<BatchPredictResponse>, ApiError> {
    if vectors.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: "Batch must contain at least one record".to_string(),
                code: "EMPTY_BATCH".to_string(),
            }),
        ));
    }

    let predictions = state.model.classify(&vectors);
    tracing::debug!(count = predictions.len(), "batch prediction");
    Ok(Json(BatchPredictResponse { predictions }))
}

/// Build the router without binding a socket.
pub fn router(model: Arc<ModelBundle>) -> Router {
    let state = Arc::new(ServerState { model });

    Router::new()
        .route("/health", get(health))
        .route("/predict/", post(predict))
        .route("/predict_batch/", post(predict_batch))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(config.model);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Prediction service listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
