//! Standard scaler - per-feature `(x - mean) / scale`
//!
//! Fitted only by the training binaries. Serving calls `transform`.

use std::path::Path;

use crc32fast::Hasher;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::artifacts::{read_json, write_json};
use crate::error::{ArtifactError, ServingError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit on rows of `data`. Constant columns get scale 1.0.
    pub fn fit(data: &Array2<f64>) -> Self {
        let cols = data.ncols();
        if data.nrows() == 0 {
            return Self {
                mean: Array1::zeros(cols),
                scale: Array1::ones(cols),
            };
        }

        let mean = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(cols));
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s.abs() < f64::EPSILON || !s.is_finite() { 1.0 } else { s });

        Self { mean, scale }
    }

    pub fn fit_transform(data: &Array2<f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(data);
        let scaled = (data - &scaler.mean) / &scaler.scale;
        (scaler, scaled)
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, ServingError> {
        if data.ncols() != self.n_features() {
            return Err(ServingError::ScalerMismatch {
                expected: self.n_features(),
                actual: data.ncols(),
            });
        }

        Ok((data - &self.mean) / &self.scale)
    }

    /// CRC32 over the fitted parameters; models record it to pin their scaler.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&(self.n_features() as u64).to_le_bytes());
        for v in self.mean.iter().chain(self.scale.iter()) {
            hasher.update(&v.to_le_bytes());
        }
        hasher.finalize()
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let scaler: Self = read_json(path)?;
        if scaler.mean.len() != scaler.scale.len() {
            return Err(ArtifactError::Mismatch(format!(
                "scaler has {} means but {} scales",
                scaler.mean.len(),
                scaler.scale.len()
            )));
        }
        Ok(scaler)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        write_json(path, self)
    }
}
