//! Scoring policy - raw model output to one anomaly score per row
//!
//! Higher is more anomalous. The two formulas are not calibrated against
//! each other; only the isolation-forest score is bounded to [0, 1].

use ndarray::{Array1, Array2, Axis};

use crate::error::ServingError;

/// Per-variant raw output of a model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// Autoencoder reconstruction, same shape as the scaled input
    Reconstruction(Array2<f64>),
    /// Isolation-forest decision function, one value per row (lower = more anomalous)
    Decision(Array1<f64>),
}

/// Fails instead of returning a non-finite score.
pub fn score(output: &ModelOutput, scaled: &Array2<f64>) -> Result<Vec<f64>, ServingError> {
    let scores = raw_scores(output, scaled)?;
    if let Some(row) = scores.iter().position(|s| !s.is_finite()) {
        return Err(ServingError::Inference(format!("score for row {} is not finite", row)));
    }
    Ok(scores)
}

fn raw_scores(output: &ModelOutput, scaled: &Array2<f64>) -> Result<Vec<f64>, ServingError> {
    match output {
        ModelOutput::Reconstruction(reconstruction) => reconstruction_error(scaled, reconstruction),
        ModelOutput::Decision(raw) => {
            if raw.len() != scaled.nrows() {
                return Err(ServingError::OutputShape {
                    expected: scaled.nrows(),
                    actual: raw.len(),
                });
            }
            Ok(raw.iter().map(|&d| decision_to_score(d)).collect())
        }
    }
}

/// Mean squared reconstruction error per row; unbounded above.
fn reconstruction_error(scaled: &Array2<f64>, reconstruction: &Array2<f64>) -> Result<Vec<f64>, ServingError> {
    if reconstruction.shape() != scaled.shape() {
        return Err(ServingError::Inference(format!(
            "reconstruction shape {:?} does not match input {:?}",
            reconstruction.shape(),
            scaled.shape()
        )));
    }

    let squared = (scaled - reconstruction).mapv_into(|d| d * d);
    let mse = squared
        .mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(scaled.nrows()));

    Ok(mse.to_vec())
}

/// `(1 - d) / 2` clamped to [0, 1]. Assumes `d` roughly in [-1, 1]; tails are
/// compressed by the clamp.
fn decision_to_score(decision: f64) -> f64 {
    ((1.0 - decision) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_reconstruction_error_is_row_mse() {
        let scaled = array![[1.0, 2.0], [0.0, 0.0]];
        let recon = array![[0.0, 2.0], [1.0, -1.0]];

        let scores = score(&ModelOutput::Reconstruction(recon), &scaled).unwrap();
        assert_eq!(scores, vec![0.5, 1.0]);
    }

    #[test]
    fn test_perfect_reconstruction_scores_zero() {
        let scaled = array![[0.3, -0.7, 1.1]];
        let scores = score(&ModelOutput::Reconstruction(scaled.clone()), &scaled).unwrap();
        assert_eq!(scores, vec![0.0]);
    }

    #[test]
    fn test_decision_scores_are_clamped() {
        let scaled = Array2::zeros((5, 2));
        let raw = array![-3.0, -1.0, 0.0, 0.5, 2.0];

        let scores = score(&ModelOutput::Decision(raw), &scaled).unwrap();
        assert_eq!(scores, vec![1.0, 1.0, 0.5, 0.25, 0.0]);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_lower_decision_scores_higher() {
        assert!(decision_to_score(-0.2) > decision_to_score(0.1));
    }

    #[test]
    fn test_shape_mismatch() {
        let scaled = Array2::zeros((2, 2));
        assert!(score(&ModelOutput::Decision(array![0.1]), &scaled).is_err());
        assert!(score(&ModelOutput::Reconstruction(Array2::zeros((2, 3))), &scaled).is_err());
    }

    #[test]
    fn test_non_finite_scores_are_errors() {
        let scaled = array![[1.0, 2.0], [f64::MAX, 0.0]];
        let err = score(&ModelOutput::Reconstruction(Array2::zeros((2, 2))), &scaled).unwrap_err();
        assert!(matches!(err, ServingError::Inference(ref msg) if msg.contains("row 1")));

        let scaled = Array2::zeros((1, 2));
        assert!(score(&ModelOutput::Decision(array![f64::NAN]), &scaled).is_err());
    }

    #[test]
    fn test_empty_input() {
        let scaled = Array2::zeros((0, 4));
        assert!(score(&ModelOutput::Reconstruction(scaled.clone()), &scaled).unwrap().is_empty());
        assert!(score(&ModelOutput::Decision(Array1::zeros(0)), &scaled).unwrap().is_empty());
    }
}
