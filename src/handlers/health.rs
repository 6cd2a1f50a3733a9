//! Root and health check handlers

use axum::{extract::State, Json};

use crate::models::{HealthResponse, RootResponse};
use crate::AppState;

pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "ML Service is running",
        endpoints: vec!["/predict", "/predict/batch", "/health"],
        model_loaded: state.is_model_loaded(),
        model_type: state.model_kind(),
    })
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_loaded: state.is_model_loaded(),
        model_type: state.model_kind(),
    })
}
