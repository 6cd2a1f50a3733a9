//! Serving state and one-shot bootstrap
//!
//! ```text
//! Unloaded ─► TryingAutoencoder ─► TryingIsolationForest ─► Unloaded (final)
//!                    │                       │
//!                    ▼                       ▼
//!           Loaded(Autoencoder)    Loaded(IsolationForest)
//! ```
//!
//! Evaluated once at process start. No retry, reload or file watching.

use crate::artifacts::{read_json, ArtifactPaths, ModelFile};
use crate::engine::{
    score, AutoencoderModel, DenseAutoencoder, IsolationForest, ModelArtifact, ModelKind,
    StandardScaler,
};
use crate::error::{ArtifactError, ServingError};
use crate::features::{align, FeatureSchema, InboundRecord};

/// Model + scaler + schema, read-only after bootstrap
#[derive(Debug)]
pub struct ServingState {
    pub model: ModelArtifact,
    pub scaler: StandardScaler,
    pub schema: FeatureSchema,
}

impl ServingState {
    pub fn new(model: ModelArtifact, scaler: StandardScaler, schema: FeatureSchema) -> Self {
        Self {
            model,
            scaler,
            schema,
        }
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model.kind()
    }

    /// align -> scale -> infer -> score. One score per record, same order.
    pub fn score(&self, records: &[InboundRecord]) -> Result<Vec<f64>, ServingError> {
        let aligned = align(records, &self.schema)?;
        let scaled = self.scaler.transform(&aligned)?;
        // Huge finite inputs can still overflow once scaled
        if let Some(((_, col), _)) = scaled.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ServingError::Inference(format!(
                "feature '{}' is out of range after scaling",
                self.schema.names()[col]
            )));
        }
        let output = self.model.infer(&scaled)?;
        score(&output, &scaled)
    }
}

/// Try each model family in `ModelKind::LOAD_ORDER`; `None` when all fail.
pub fn bootstrap(paths: &ArtifactPaths) -> Option<ServingState> {
    for kind in ModelKind::LOAD_ORDER {
        if !model_file_exists(paths, kind) {
            tracing::debug!("No {} artifact in {}", kind, paths.dir().display());
            continue;
        }

        tracing::info!("Trying {} artifacts in {}", kind, paths.dir().display());
        match load(paths, kind) {
            Ok(state) => {
                tracing::info!(
                    "Loaded {} model ({} features)",
                    kind,
                    state.schema.len()
                );
                return Some(state);
            }
            Err(e) => tracing::warn!("Failed to load {} artifacts: {}", kind, e),
        }
    }

    tracing::warn!("No model loaded; /predict will answer 503 until restart");
    None
}

fn model_file_exists(paths: &ArtifactPaths, kind: ModelKind) -> bool {
    if paths.model(kind).exists() {
        return true;
    }
    cfg!(feature = "onnx") && kind == ModelKind::Autoencoder && paths.onnx_autoencoder().exists()
}

/// Load one artifact triple and check the pieces belong together.
pub fn load(paths: &ArtifactPaths, kind: ModelKind) -> Result<ServingState, ArtifactError> {
    let schema = FeatureSchema::load(&paths.features())?;
    let scaler = StandardScaler::load(&paths.scaler())?;

    if scaler.n_features() != schema.len() {
        return Err(ArtifactError::Mismatch(format!(
            "scaler expects {} features, features file lists {}",
            scaler.n_features(),
            schema.len()
        )));
    }

    let model = load_model(paths, kind, &schema, &scaler)?;

    if let Some(width) = model.input_dim() {
        if width != schema.len() {
            return Err(ArtifactError::Mismatch(format!(
                "{} model takes {} features, features file lists {}",
                kind,
                width,
                schema.len()
            )));
        }
    }

    Ok(ServingState::new(model, scaler, schema))
}

fn load_model(
    paths: &ArtifactPaths,
    kind: ModelKind,
    schema: &FeatureSchema,
    scaler: &StandardScaler,
) -> Result<ModelArtifact, ArtifactError> {
    let path = paths.model(kind);

    match kind {
        ModelKind::Autoencoder => {
            // JSON network wins; the exported ONNX graph is the fallback
            #[cfg(feature = "onnx")]
            {
                if !path.exists() {
                    let session = crate::engine::onnx::OnnxAutoencoder::load(&paths.onnx_autoencoder())?;
                    return Ok(ModelArtifact::Autoencoder(AutoencoderModel::Onnx(session)));
                }
            }

            let file: ModelFile<DenseAutoencoder> = read_json(&path)?;
            file.header.verify(kind, schema, scaler)?;
            file.model.validate()?;
            Ok(ModelArtifact::Autoencoder(AutoencoderModel::Dense(file.model)))
        }
        ModelKind::IsolationForest => {
            let file: ModelFile<IsolationForest> = read_json(&path)?;
            file.header.verify(kind, schema, scaler)?;
            Ok(ModelArtifact::IsolationForest(file.model))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{write_json, ArtifactHeader};
    use crate::engine::{DenseLayer, Activation, IsolationForestParams};
    use ndarray::{Array1, Array2};
    use serde_json::json;
    use tempfile::tempdir;

    fn training_rows() -> Array2<f64> {
        Array2::from_shape_fn((64, 3), |(i, j)| ((i * (j + 3)) % 17) as f64 / 4.0)
    }

    /// Write schema + scaler; returns them for building model headers
    fn write_common(paths: &ArtifactPaths) -> (FeatureSchema, StandardScaler) {
        let schema = FeatureSchema::parse("V1\nV2\nAmount\n");
        let scaler = StandardScaler::fit(&training_rows());
        schema.save(&paths.features()).unwrap();
        scaler.save(&paths.scaler()).unwrap();
        (schema, scaler)
    }

    fn write_forest(paths: &ArtifactPaths, schema: &FeatureSchema, scaler: &StandardScaler) {
        let scaled = scaler.transform(&training_rows()).unwrap();
        let params = IsolationForestParams {
            n_estimators: 10,
            ..Default::default()
        };
        let file = ModelFile {
            header: ArtifactHeader::new(ModelKind::IsolationForest, schema, scaler),
            model: IsolationForest::fit(&scaled, &params).unwrap(),
        };
        write_json(&paths.model(ModelKind::IsolationForest), &file).unwrap();
    }

    fn identity_autoencoder(width: usize) -> DenseAutoencoder {
        DenseAutoencoder {
            layers: vec![DenseLayer {
                weights: Array2::eye(width),
                bias: Array1::zeros(width),
                activation: Activation::Linear,
            }],
        }
    }

    fn write_autoencoder(paths: &ArtifactPaths, header: ArtifactHeader, width: usize) {
        let file = ModelFile {
            header,
            model: identity_autoencoder(width),
        };
        write_json(&paths.model(ModelKind::Autoencoder), &file).unwrap();
    }

    fn record(value: serde_json::Value) -> InboundRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_dir_stays_unloaded() {
        let dir = tempdir().unwrap();
        assert!(bootstrap(&ArtifactPaths::new(dir.path())).is_none());
    }

    #[test]
    fn test_prefers_autoencoder() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        let (schema, scaler) = write_common(&paths);
        write_forest(&paths, &schema, &scaler);
        write_autoencoder(&paths, ArtifactHeader::new(ModelKind::Autoencoder, &schema, &scaler), 3);

        let state = bootstrap(&paths).unwrap();
        assert_eq!(state.model_kind(), ModelKind::Autoencoder);
    }

    #[test]
    fn test_falls_back_when_autoencoder_is_corrupt() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        let (schema, scaler) = write_common(&paths);
        write_forest(&paths, &schema, &scaler);
        std::fs::write(paths.model(ModelKind::Autoencoder), "not json").unwrap();

        let state = bootstrap(&paths).unwrap();
        assert_eq!(state.model_kind(), ModelKind::IsolationForest);
    }

    #[test]
    fn test_falls_back_when_autoencoder_pairs_with_other_scaler() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        let (schema, scaler) = write_common(&paths);
        write_forest(&paths, &schema, &scaler);

        let foreign = StandardScaler::fit(&Array2::from_shape_fn((4, 3), |(i, j)| (i + j) as f64));
        write_autoencoder(&paths, ArtifactHeader::new(ModelKind::Autoencoder, &schema, &foreign), 3);

        let state = bootstrap(&paths).unwrap();
        assert_eq!(state.model_kind(), ModelKind::IsolationForest);
    }

    #[test]
    fn test_missing_features_file_fails_everything() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        let (schema, scaler) = write_common(&paths);
        write_forest(&paths, &schema, &scaler);
        std::fs::remove_file(paths.features()).unwrap();

        assert!(matches!(
            load(&paths, ModelKind::IsolationForest),
            Err(ArtifactError::SchemaLoad { .. })
        ));
        assert!(bootstrap(&paths).is_none());
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        let (schema, scaler) = write_common(&paths);
        write_autoencoder(&paths, ArtifactHeader::new(ModelKind::Autoencoder, &schema, &scaler), 4);

        assert!(matches!(
            load(&paths, ModelKind::Autoencoder),
            Err(ArtifactError::Mismatch(_))
        ));
    }

    #[test]
    fn test_forest_scores_in_unit_interval_and_repeatable() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        let (schema, scaler) = write_common(&paths);
        write_forest(&paths, &schema, &scaler);
        let state = bootstrap(&paths).unwrap();

        let records = vec![
            record(json!({"V1": 1.0, "V2": 2.0, "Amount": 3.0})),
            record(json!({"V1": 400.0, "Amount": -90.0})),
            record(json!({})),
        ];
        let first = state.score(&records).unwrap();
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|s| (0.0..=1.0).contains(s)));
        assert_eq!(first, state.score(&records).unwrap());
    }

    #[test]
    fn test_autoencoder_scores_are_non_negative() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        let (schema, scaler) = write_common(&paths);
        write_autoencoder(&paths, ArtifactHeader::new(ModelKind::Autoencoder, &schema, &scaler), 3);
        let state = bootstrap(&paths).unwrap();

        let scores = state
            .score(&[record(json!({"V1": 5.0})), record(json!({"Amount": 1.0}))])
            .unwrap();
        // Identity network reconstructs perfectly
        assert_eq!(scores, vec![0.0, 0.0]);
        assert!(state.score(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_overflow_after_scaling_is_an_error() {
        // Narrow spread, so a scale well below 1
        let rows = training_rows().mapv(|v| v / 100.0);
        let (scaler, scaled) = StandardScaler::fit_transform(&rows);
        let forest = IsolationForest::fit(&scaled, &IsolationForestParams::default()).unwrap();
        let state = ServingState::new(
            ModelArtifact::IsolationForest(forest),
            scaler,
            FeatureSchema::parse("V1\nV2\nAmount\n"),
        );

        let err = state
            .score(&[record(json!({"V1": 1.0})), record(json!({"Amount": -1.7e308}))])
            .unwrap_err();
        assert!(matches!(err, ServingError::Inference(ref msg) if msg.contains("Amount")));
    }
}
