//! Error handling

use std::path::PathBuf;

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Failures while loading the artifact triple at bootstrap.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read feature schema {path}: {source}")]
    SchemaLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact mismatch: {0}")]
    Mismatch(String),

    #[cfg(feature = "onnx")]
    #[error("onnx runtime error: {0}")]
    Onnx(String),
}

/// Request-scoped scoring failures.
#[derive(Debug, Error)]
pub enum ServingError {
    #[error("Model not loaded")]
    NotLoaded,

    #[error("scaler expects {expected} features, got {actual}")]
    ScalerMismatch { expected: usize, actual: usize },

    #[error("could not convert value {value} of feature '{feature}' to float")]
    NonNumeric { feature: String, value: String },

    #[error("model output has {actual} rows, expected {expected}")]
    OutputShape { expected: usize, actual: usize },

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Model fitting failures in the training pipeline.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Transport-boundary error, rendered as `{error, status}`.
#[derive(Debug)]
pub enum AppError {
    // Service has no model
    ModelNotLoaded,

    // Request body could not be decoded
    ValidationError(String),

    // This particular request failed while scoring
    ScoringFailed(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ModelNotLoaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Model not loaded. Train a model and restart the service.",
            ),
            AppError::ValidationError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            AppError::ScoringFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.as_str()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ServingError> for AppError {
    fn from(err: ServingError) -> Self {
        match err {
            ServingError::NotLoaded => AppError::ModelNotLoaded,
            other => AppError::ScoringFailed(other.to_string()),
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(err.to_string())
    }
}
