//! Isolation Forest implementation
//!
//! Anomalies are easier to isolate and thus have shorter path lengths in the
//! trees. `decision_function` follows the usual convention: negative values
//! are outliers, positive values inliers, with the boundary placed at the
//! `contamination` quantile of the training scores.

use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::FitError;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Hyperparameters for fitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Rows per tree; `None` means `min(256, n_samples)`
    pub max_samples: Option<usize>,
    /// Expected share of outliers in the training data
    pub contamination: f64,
    pub random_state: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: None,
            contamination: 0.01,
            random_state: 42,
        }
    }
}

/// Isolation Forest model for anomaly detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Individual isolation trees
    trees: Vec<IsolationTree>,
    /// Width of the input rows
    n_features: usize,
    /// Sample size for each tree
    max_samples: usize,
    /// Subtracted from `score_samples` to centre the decision boundary
    offset: f64,
    contamination: f64,
}

impl IsolationForest {
    pub fn fit(data: &Array2<f64>, params: &IsolationForestParams) -> Result<Self, FitError> {
        let n_samples = data.nrows();
        if n_samples == 0 {
            return Err(FitError::EmptyDataset);
        }
        if params.n_estimators == 0 {
            return Err(FitError::InvalidParameter("n_estimators must be positive".to_string()));
        }
        if !(0.0..=0.5).contains(&params.contamination) || params.contamination == 0.0 {
            return Err(FitError::InvalidParameter(format!(
                "contamination must be in (0, 0.5], got {}",
                params.contamination
            )));
        }

        let max_samples = params.max_samples.unwrap_or(256).clamp(1, n_samples);
        let max_depth = (max_samples.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(params.random_state);

        let trees = (0..params.n_estimators)
            .map(|_| {
                // Subsample without replacement
                let indices = rand::seq::index::sample(&mut rng, n_samples, max_samples).into_vec();
                IsolationTree::build(data, indices, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            n_features: data.ncols(),
            max_samples,
            offset: 0.0,
            contamination: params.contamination,
        };

        let mut train_scores = forest.score_samples(data).to_vec();
        train_scores.sort_by(|a, b| a.total_cmp(b));
        forest.offset = percentile(&train_scores, 100.0 * params.contamination);

        Ok(forest)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Opposite of the anomaly score: `-2^(-E[h(x)] / c(max_samples))`.
    /// Lower means more abnormal.
    pub fn score_samples(&self, data: &Array2<f64>) -> Array1<f64> {
        let norm = average_path_length(self.max_samples);

        data.outer_iter()
            .map(|row| {
                if self.trees.is_empty() || norm == 0.0 {
                    return -0.5;
                }
                let total: f64 = self.trees.iter().map(|tree| tree.path_length(row)).sum();
                let mean_depth = total / self.trees.len() as f64;
                -(2.0_f64).powf(-mean_depth / norm)
            })
            .collect()
    }

    /// `score_samples - offset`; negative for outliers.
    pub fn decision_function(&self, data: &Array2<f64>) -> Array1<f64> {
        self.score_samples(data) - self.offset
    }
}

/// Expected path length of an unsuccessful BST search over `n` points, c(n)
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile over an ascending slice
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// A single isolation tree
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    root: IsolationNode,
}

/// Node in an isolation tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsolationNode {
    /// Rows with `x[feature] <= split` go left
    Internal {
        feature: usize,
        split: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf { size: usize },
}

impl IsolationTree {
    fn build<R: Rng>(data: &Array2<f64>, indices: Vec<usize>, max_depth: usize, rng: &mut R) -> Self {
        Self {
            root: Self::build_node(data, indices, 0, max_depth, rng),
        }
    }

    fn build_node<R: Rng>(
        data: &Array2<f64>,
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> IsolationNode {
        if depth >= max_depth || indices.len() <= 1 {
            return IsolationNode::Leaf { size: indices.len() };
        }

        // Only features that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|feature| {
                let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    let v = data[[i, feature]];
                    (lo.min(v), hi.max(v))
                });
                (max > min).then_some((feature, min, max))
            })
            .collect();

        let Some(&(feature, min, max)) = candidates.choose(rng) else {
            return IsolationNode::Leaf { size: indices.len() };
        };

        let split = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&i| data[[i, feature]] <= split);

        IsolationNode::Internal {
            feature,
            split,
            left: Box::new(Self::build_node(data, left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(data, right, depth + 1, max_depth, rng)),
        }
    }

    /// Depth reached by `row`, plus c(size) for the leaf it lands in
    fn path_length(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;

        loop {
            match node {
                IsolationNode::Leaf { size } => return depth as f64 + average_path_length(*size),
                IsolationNode::Internal { feature, split, left, right } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    node = if value <= *split { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// 20 x 10 grid of normal points around the origin
    fn cluster() -> Array2<f64> {
        Array2::from_shape_fn((200, 2), |(i, j)| match j {
            0 => ((i % 20) as f64 - 10.0) / 10.0,
            _ => ((i / 20) as f64 - 5.0) / 5.0,
        })
    }

    fn small_params() -> IsolationForestParams {
        IsolationForestParams {
            n_estimators: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);

        let c_10 = average_path_length(10);
        let c_256 = average_path_length(256);
        assert!(c_256 > c_10, "c(256)={} should be > c(10)={}", c_256, c_10);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert!((percentile(&values, 10.0) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_fit_builds_requested_trees() {
        let forest = IsolationForest::fit(&cluster(), &small_params()).unwrap();
        assert_eq!(forest.n_estimators(), 50);
        assert_eq!(forest.n_features(), 2);
        assert_eq!(forest.max_samples, 200);
    }

    #[test]
    fn test_outlier_scores_lower() {
        let forest = IsolationForest::fit(&cluster(), &small_params()).unwrap();
        let scores = forest.decision_function(&array![[0.0, 0.0], [25.0, -25.0]]);

        assert!(scores[1] < scores[0], "outlier {} vs inlier {}", scores[1], scores[0]);
        assert!(scores[0] >= 0.0, "centre of the cluster is an outlier: {}", scores[0]);
    }

    #[test]
    fn test_score_samples_range() {
        let forest = IsolationForest::fit(&cluster(), &small_params()).unwrap();
        for s in forest.score_samples(&cluster()).iter() {
            assert!(*s < 0.0 && *s >= -1.0, "score {} out of range", s);
        }
    }

    #[test]
    fn test_contamination_share_below_offset() {
        let params = IsolationForestParams {
            contamination: 0.1,
            ..small_params()
        };
        let forest = IsolationForest::fit(&cluster(), &params).unwrap();
        let outliers = forest
            .decision_function(&cluster())
            .iter()
            .filter(|d| **d < 0.0)
            .count();
        // At most ~10% of the training rows fall below the boundary
        assert!(outliers <= 20, "{} outliers", outliers);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let a = IsolationForest::fit(&cluster(), &small_params()).unwrap();
        let b = IsolationForest::fit(&cluster(), &small_params()).unwrap();
        let probe = array![[0.3, -0.2], [4.0, 4.0]];
        assert_eq!(a.decision_function(&probe), b.decision_function(&probe));
    }

    #[test]
    fn test_rejects_empty_and_bad_params() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            IsolationForest::fit(&empty, &IsolationForestParams::default()),
            Err(FitError::EmptyDataset)
        ));

        let bad = IsolationForestParams {
            contamination: 0.9,
            ..Default::default()
        };
        assert!(IsolationForest::fit(&cluster(), &bad).is_err());
    }

    #[test]
    fn test_constant_data_gives_leaf_trees() {
        let data = Array2::from_elem((20, 3), 1.5);
        let forest = IsolationForest::fit(&data, &small_params()).unwrap();
        let scores = forest.decision_function(&data);
        assert!(scores.iter().all(|s| s.is_finite()));
    }
}
