//! Isolation forest training and full-dataset validation summary

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use super::dataset::{DatasetSpec, LabeledDataset};
use super::save_artifacts;
use crate::artifacts::ArtifactPaths;
use crate::engine::{IsolationForest, IsolationForestParams, ModelKind, StandardScaler};

/// mean / max / min of anomaly scores for one label group
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let sum: f64 = scores.iter().sum();
        Some(Self {
            count: scores.len(),
            mean: sum / scores.len() as f64,
            max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: scores.iter().copied().fold(f64::INFINITY, f64::min),
        })
    }
}

impl fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} mean={:.4} max={:.4} min={:.4}",
            self.count, self.mean, self.max, self.min
        )
    }
}

/// Anomaly scores (`-score_samples`, higher = more anomalous) split by label
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub anomalous: Option<ScoreSummary>,
    pub normal: Option<ScoreSummary>,
}

pub fn validate(
    forest: &IsolationForest,
    scaler: &StandardScaler,
    dataset: &LabeledDataset,
    normal_label: &str,
) -> Result<ValidationReport> {
    let scaled = scaler.transform(&dataset.features)?;
    let anomaly_scores = -forest.score_samples(&scaled);

    let mut normal = Vec::new();
    let mut anomalous = Vec::new();
    for (score, is_normal) in anomaly_scores.iter().zip(dataset.normal_mask(normal_label)) {
        if is_normal {
            normal.push(*score);
        } else {
            anomalous.push(*score);
        }
    }

    Ok(ValidationReport {
        anomalous: ScoreSummary::from_scores(&anomalous),
        normal: ScoreSummary::from_scores(&normal),
    })
}

#[derive(Debug, Clone)]
pub struct IsolationForestReport {
    pub total_rows: usize,
    pub normal_rows: usize,
    pub validation: ValidationReport,
}

/// CSV -> normal rows -> scaler -> isolation forest -> artifact triple
pub fn run(
    csv_path: &Path,
    paths: &ArtifactPaths,
    spec: &DatasetSpec,
    params: &IsolationForestParams,
) -> Result<IsolationForestReport> {
    tracing::info!("Loading: {}", csv_path.display());
    let dataset = LabeledDataset::from_csv(csv_path, spec)?;
    tracing::info!("Loaded {} rows", dataset.len());

    let normal = dataset.normal_rows(&spec.normal_label);
    tracing::info!("Normal transactions: {}", normal.nrows());

    let (scaler, scaled) = StandardScaler::fit_transform(&normal);

    tracing::info!(
        "Training IsolationForest (n_estimators={}, contamination={})...",
        params.n_estimators,
        params.contamination
    );
    let forest = IsolationForest::fit(&scaled, params).context("isolation forest training failed")?;
    tracing::info!("Fitted {} trees on {} rows", forest.n_estimators(), scaled.nrows());

    save_artifacts(paths, ModelKind::IsolationForest, &dataset.schema, &scaler, &forest)?;

    tracing::info!("Validating on full dataset...");
    let validation = validate(&forest, &scaler, &dataset, &spec.normal_label)?;

    Ok(IsolationForestReport {
        total_rows: dataset.len(),
        normal_rows: normal.nrows(),
        validation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let s = ScoreSummary::from_scores(&[0.5, 0.25, 0.75]).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, 0.5);
        assert_eq!(s.max, 0.75);
        assert_eq!(s.min, 0.25);
        assert!(ScoreSummary::from_scores(&[]).is_none());
    }
}
