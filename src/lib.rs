//! FDS ML Service
//!
//! Anomaly scores for transaction records, backed by either a dense
//! autoencoder (reconstruction error) or an isolation forest (decision
//! function).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   models/   ┌─────────────────────────────────────────┐
//! │  train_*     │ ──────────► │  Bootstrap (autoencoder → iforest)      │
//! │  binaries    │  artifacts  └──────────────────┬──────────────────────┘
//! └──────────────┘                                ▼ Arc<ServingState>
//!            ┌─────────────────────────────────────────────────────────┐
//!  request ─►│ align ─► scale ─► model.infer ─► scoring policy ─► [0,1]│
//!            └─────────────────────────────────────────────────────────┘
//! ```

pub mod artifacts;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod handlers;
pub mod models;
pub mod state;
pub mod training;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use engine::ModelKind;
use state::ServingState;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    /// `None` when bootstrap found no usable artifacts
    pub serving: Option<Arc<ServingState>>,
}

impl AppState {
    pub fn new(config: config::Config, serving: Option<ServingState>) -> Self {
        Self {
            config,
            serving: serving.map(Arc::new),
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.serving.is_some()
    }

    pub fn model_kind(&self) -> Option<ModelKind> {
        self.serving.as_ref().map(|s| s.model_kind())
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/predict/batch", post(handlers::predict::predict_batch))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
