//! Service status bodies

use serde::Serialize;

use crate::engine::ModelKind;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub endpoints: Vec<&'static str>,
    pub model_loaded: bool,
    pub model_type: Option<ModelKind>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_type: Option<ModelKind>,
}
