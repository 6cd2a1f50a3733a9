//! Training Module - offline fitting of the artifact triple
//!
//! Never runs inside the server. Both pipelines filter a labeled CSV to its
//! normal rows, fit a scaler and a model, and persist model, scaler and
//! feature list to the model directory.

pub mod autoencoder;
pub mod dataset;
pub mod isolation_forest;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::artifacts::{write_json, ArtifactHeader, ArtifactPaths, ModelFile};
use crate::engine::{ModelKind, StandardScaler};
use crate::features::FeatureSchema;

pub use autoencoder::{AutoencoderConfig, AutoencoderReport, TrainingHistory};
pub use dataset::{default_feature_columns, DatasetSpec, LabeledDataset};
pub use isolation_forest::{IsolationForestReport, ScoreSummary, ValidationReport};

/// Write model, scaler and feature list. The scaler and feature list paths
/// are shared by both model kinds; the latest run owns them.
pub fn save_artifacts<T: Serialize>(
    paths: &ArtifactPaths,
    kind: ModelKind,
    schema: &FeatureSchema,
    scaler: &StandardScaler,
    model: &T,
) -> Result<()> {
    paths
        .ensure_dir()
        .with_context(|| format!("failed to create {}", paths.dir().display()))?;

    let file = ModelFile {
        header: ArtifactHeader::new(kind, schema, scaler),
        model,
    };

    let model_path = paths.model(kind);
    write_json(&model_path, &file)
        .with_context(|| format!("failed to write {}", model_path.display()))?;
    scaler
        .save(&paths.scaler())
        .with_context(|| format!("failed to write {}", paths.scaler().display()))?;
    schema
        .save(&paths.features())
        .with_context(|| format!("failed to write {}", paths.features().display()))?;

    tracing::info!("Model saved to: {}", model_path.display());
    tracing::info!("Scaler saved to: {}", paths.scaler().display());
    tracing::info!("Features saved to: {}", paths.features().display());

    Ok(())
}
