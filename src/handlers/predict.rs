//! Scoring handlers
//!
//! The two endpoints report failures differently and both conventions are
//! kept: `/predict` uses status codes (503 unloaded, 500 failed), while
//! `/predict/batch` always answers 200 with an `error` field.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::ServingError;
use crate::features::InboundRecord;
use crate::models::{BatchPredictResponse, PredictRequest, PredictResponse};
use crate::state::ServingState;
use crate::{AppError, AppResult, AppState};

/// Score wrapped records
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    // Unloaded wins over body validation
    let serving = state.serving.clone().ok_or(AppError::ModelNotLoaded)?;
    let Json(req) = payload?;

    let records: Vec<InboundRecord> = req.records.into_iter().map(|r| r.data).collect();
    let scores = run_scoring(serving, records).await?.map_err(|e| {
        tracing::error!("Prediction failed: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(PredictResponse { scores }))
}

/// Score a bare list of records
pub async fn predict_batch(
    State(state): State<AppState>,
    payload: Result<Json<Vec<InboundRecord>>, JsonRejection>,
) -> AppResult<Json<BatchPredictResponse>> {
    let Some(serving) = state.serving.clone() else {
        return Ok(Json(BatchPredictResponse::failed(ServingError::NotLoaded.to_string())));
    };
    let Json(records) = payload?;

    Ok(Json(batch_response(run_scoring(serving, records).await)))
}

/// Every outcome, a lost scoring task included, becomes a 200 body.
fn batch_response(
    outcome: Result<Result<Vec<f64>, ServingError>, tokio::task::JoinError>,
) -> BatchPredictResponse {
    match outcome {
        Ok(Ok(scores)) => BatchPredictResponse::ok(scores),
        Ok(Err(e)) => {
            tracing::error!("Batch prediction failed: {}", e);
            BatchPredictResponse::failed(e.to_string())
        }
        Err(e) => {
            tracing::error!("Batch scoring task failed: {}", e);
            BatchPredictResponse::failed(e.to_string())
        }
    }
}

/// Inference is CPU-bound; keep it off the async workers.
async fn run_scoring(
    serving: Arc<ServingState>,
    records: Vec<InboundRecord>,
) -> Result<Result<Vec<f64>, ServingError>, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || serving.score(&records)).await
}
