//! ONNX Runtime autoencoder
//!
//! Serves an externally exported autoencoder (`autoencoder.onnx`). The model
//! must take a `[batch, features]` f32 tensor and return a tensor of the same
//! shape. Sessions need exclusive access to run, so concurrent requests
//! serialize on the mutex.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use crate::error::{ArtifactError, ServingError};

pub struct OnnxAutoencoder {
    session: Mutex<Session>,
    output_name: String,
}

impl std::fmt::Debug for OnnxAutoencoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxAutoencoder")
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl OnnxAutoencoder {
    pub fn load(model_path: &Path) -> Result<Self, ArtifactError> {
        tracing::info!("Loading ONNX model from: {}", model_path.display());

        let session = Session::builder()
            .map_err(|e| ArtifactError::Onnx(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ArtifactError::Onnx(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ArtifactError::Onnx(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ArtifactError::Onnx("No output defined".to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }

    pub fn reconstruct(&self, scaled: &Array2<f64>) -> Result<Array2<f64>, ServingError> {
        let (rows, cols) = scaled.dim();
        if rows == 0 {
            return Ok(Array2::zeros((0, cols)));
        }

        let input_tensor = Value::from_array(scaled.mapv(|v| v as f32))
            .map_err(|e| ServingError::Inference(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ServingError::Inference(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| ServingError::Inference("No output".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ServingError::Inference(format!("Extract error: {}", e)))?;

        if data.len() != rows * cols {
            return Err(ServingError::Inference(format!(
                "ONNX output has {} values, expected {}",
                data.len(),
                rows * cols
            )));
        }

        Array2::from_shape_vec((rows, cols), data.iter().map(|&v| f64::from(v)).collect())
            .map_err(|e| ServingError::Inference(format!("Array error: {}", e)))
    }
}
