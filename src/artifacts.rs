//! Artifact triple on disk - the only contract between training and serving
//!
//! ```text
//! MODEL_DIR/
//! ├── features.txt            one feature name per line
//! ├── scaler.json             StandardScaler (mean / scale)
//! ├── autoencoder.json        ModelFile<DenseAutoencoder>
//! ├── autoencoder.onnx        exported autoencoder (feature = "onnx")
//! └── isolation_forest.json   ModelFile<IsolationForest>
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::engine::{ModelKind, StandardScaler};
use crate::error::ArtifactError;
use crate::features::FeatureSchema;

pub const FEATURES_FILE: &str = "features.txt";
pub const SCALER_FILE: &str = "scaler.json";
pub const AUTOENCODER_FILE: &str = "autoencoder.json";
pub const AUTOENCODER_ONNX_FILE: &str = "autoencoder.onnx";
pub const ISOLATION_FOREST_FILE: &str = "isolation_forest.json";

/// Bump when the JSON layout of model files changes
pub const FORMAT_VERSION: u32 = 1;

/// Well-known paths inside the model directory
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn features(&self) -> PathBuf {
        self.dir.join(FEATURES_FILE)
    }

    pub fn scaler(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn model(&self, kind: ModelKind) -> PathBuf {
        match kind {
            ModelKind::Autoencoder => self.dir.join(AUTOENCODER_FILE),
            ModelKind::IsolationForest => self.dir.join(ISOLATION_FOREST_FILE),
        }
    }

    pub fn onnx_autoencoder(&self) -> PathBuf {
        self.dir.join(AUTOENCODER_ONNX_FILE)
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }
}

/// Metadata written in front of every JSON model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub model_type: ModelKind,
    pub schema_hash: u32,
    pub scaler_fingerprint: u32,
    pub trained_at: DateTime<Utc>,
}

impl ArtifactHeader {
    pub fn new(kind: ModelKind, schema: &FeatureSchema, scaler: &StandardScaler) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            model_type: kind,
            schema_hash: schema.layout_hash(),
            scaler_fingerprint: scaler.fingerprint(),
            trained_at: Utc::now(),
        }
    }

    /// Check that this model was trained against exactly this schema and scaler.
    pub fn verify(
        &self,
        kind: ModelKind,
        schema: &FeatureSchema,
        scaler: &StandardScaler,
    ) -> Result<(), ArtifactError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ArtifactError::Mismatch(format!(
                "unsupported format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }
        if self.model_type != kind {
            return Err(ArtifactError::Mismatch(format!(
                "file holds a {} model, expected {}",
                self.model_type, kind
            )));
        }
        if self.schema_hash != schema.layout_hash() {
            return Err(ArtifactError::Mismatch(format!(
                "feature schema hash {:08x} does not match features file ({:08x})",
                self.schema_hash,
                schema.layout_hash()
            )));
        }
        if self.scaler_fingerprint != scaler.fingerprint() {
            return Err(ArtifactError::Mismatch(format!(
                "model was trained with scaler {:08x}, loaded scaler is {:08x}",
                self.scaler_fingerprint,
                scaler.fingerprint()
            )));
        }
        Ok(())
    }
}

/// A persisted model together with its header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile<T> {
    pub header: ArtifactHeader,
    pub model: T,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()
}
