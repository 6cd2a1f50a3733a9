//! Engine Module - scaler, models and scoring policy
//!
//! Everything here is a pure function of immutable fitted parameters, so a
//! loaded engine can be shared across requests without locking.

pub mod autoencoder;
pub mod isolation_forest;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scaler;
pub mod scoring;

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::ServingError;

// Re-export common types
pub use autoencoder::{Activation, DenseAutoencoder, DenseLayer};
pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use scaler::StandardScaler;
pub use scoring::{score, ModelOutput};

/// Which model family produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Autoencoder,
    IsolationForest,
}

impl ModelKind {
    /// Bootstrap tries artifacts in this order
    pub const LOAD_ORDER: [ModelKind; 2] = [ModelKind::Autoencoder, ModelKind::IsolationForest];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Autoencoder => "autoencoder",
            ModelKind::IsolationForest => "isolation_forest",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Autoencoder backends
#[derive(Debug)]
pub enum AutoencoderModel {
    Dense(DenseAutoencoder),
    #[cfg(feature = "onnx")]
    Onnx(onnx::OnnxAutoencoder),
}

/// A loaded model, never mutated after bootstrap
#[derive(Debug)]
pub enum ModelArtifact {
    Autoencoder(AutoencoderModel),
    IsolationForest(IsolationForest),
}

impl ModelArtifact {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelArtifact::Autoencoder(_) => ModelKind::Autoencoder,
            ModelArtifact::IsolationForest(_) => ModelKind::IsolationForest,
        }
    }

    /// Expected input width, when the artifact declares one
    pub fn input_dim(&self) -> Option<usize> {
        match self {
            ModelArtifact::Autoencoder(AutoencoderModel::Dense(ae)) => Some(ae.input_dim()),
            #[cfg(feature = "onnx")]
            ModelArtifact::Autoencoder(AutoencoderModel::Onnx(_)) => None,
            ModelArtifact::IsolationForest(forest) => Some(forest.n_features()),
        }
    }

    pub fn infer(&self, scaled: &Array2<f64>) -> Result<ModelOutput, ServingError> {
        match self {
            ModelArtifact::Autoencoder(AutoencoderModel::Dense(ae)) => {
                Ok(ModelOutput::Reconstruction(ae.reconstruct(scaled)))
            }
            #[cfg(feature = "onnx")]
            ModelArtifact::Autoencoder(AutoencoderModel::Onnx(session)) => {
                Ok(ModelOutput::Reconstruction(session.reconstruct(scaled)?))
            }
            ModelArtifact::IsolationForest(forest) => {
                Ok(ModelOutput::Decision(forest.decision_function(scaled)))
            }
        }
    }
}
