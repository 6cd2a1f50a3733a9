//! Scoring request/response bodies

use serde::{Deserialize, Serialize};

use crate::features::InboundRecord;

/// One record inside a `/predict` body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Record {
    pub data: InboundRecord,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PredictRequest {
    pub records: Vec<Record>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PredictResponse {
    pub scores: Vec<f64>,
}

/// `/predict/batch` always answers 200; failures go in `error`.
#[derive(Debug, Deserialize, Serialize)]
pub struct BatchPredictResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scores: Vec<f64>,
}

impl BatchPredictResponse {
    pub fn ok(scores: Vec<f64>) -> Self {
        Self { error: None, scores }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            scores: Vec::new(),
        }
    }
}
