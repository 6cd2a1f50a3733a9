//! Autoencoder Training
//!
//! Minibatch Adam on mean squared reconstruction error, with a held-out
//! validation split evaluated after every epoch.

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, Axis, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::dataset::{DatasetSpec, LabeledDataset};
use super::save_artifacts;
use crate::artifacts::ArtifactPaths;
use crate::engine::{DenseAutoencoder, DenseLayer, ModelKind, StandardScaler};
use crate::error::FitError;

/// Autoencoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoencoderConfig {
    /// Hidden layer dimensions (encoder path)
    pub hidden_dims: Vec<usize>,
    /// Latent space dimension
    pub latent_dim: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Share of rows held out for validation
    pub validation_split: f64,
    pub seed: u64,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self {
            hidden_dims: vec![20],
            latent_dim: 14,
            epochs: 10,
            batch_size: 256,
            learning_rate: 0.001,
            validation_split: 0.2,
            seed: 42,
        }
    }
}

/// Per-epoch losses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    /// Empty when there was no validation split
    pub val_loss: Vec<f64>,
}

impl TrainingHistory {
    pub fn final_loss(&self) -> Option<f64> {
        self.loss.last().copied()
    }

    pub fn final_val_loss(&self) -> Option<f64> {
        self.val_loss.last().copied()
    }
}

struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    m_w: Vec<Array2<f64>>,
    v_w: Vec<Array2<f64>>,
    m_b: Vec<Array1<f64>>,
    v_b: Vec<Array1<f64>>,
}

impl Adam {
    fn new(layers: &[DenseLayer], learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            m_w: layers.iter().map(|l| Array2::zeros(l.weights.raw_dim())).collect(),
            v_w: layers.iter().map(|l| Array2::zeros(l.weights.raw_dim())).collect(),
            m_b: layers.iter().map(|l| Array1::zeros(l.bias.raw_dim())).collect(),
            v_b: layers.iter().map(|l| Array1::zeros(l.bias.raw_dim())).collect(),
        }
    }

    fn apply(&mut self, layers: &mut [DenseLayer], grads: &[(Array2<f64>, Array1<f64>)]) {
        self.step += 1;
        let (lr, b1, b2, eps) = (self.learning_rate, self.beta1, self.beta2, self.epsilon);
        let bc1 = 1.0 - b1.powi(self.step);
        let bc2 = 1.0 - b2.powi(self.step);

        let update = move |p: &mut f64, m: &mut f64, v: &mut f64, g: &f64| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            *p -= lr * (*m / bc1) / ((*v / bc2).sqrt() + eps);
        };

        for (i, (layer, (gw, gb))) in layers.iter_mut().zip(grads).enumerate() {
            Zip::from(&mut layer.weights)
                .and(&mut self.m_w[i])
                .and(&mut self.v_w[i])
                .and(gw)
                .for_each(update);
            Zip::from(&mut layer.bias)
                .and(&mut self.m_b[i])
                .and(&mut self.v_b[i])
                .and(gb)
                .for_each(update);
        }
    }
}

/// Mean of squared differences over every element
pub fn reconstruction_loss(model: &DenseAutoencoder, data: &Array2<f64>) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let diff = model.reconstruct(data) - data;
    diff.mapv(|d| d * d).sum() / data.len() as f64
}

/// Shuffled `(train, test)` split; the test side gets `ceil(n * test_size)` rows.
pub fn train_test_split(data: &Array2<f64>, test_size: f64, seed: u64) -> (Array2<f64>, Array2<f64>) {
    let n = data.nrows();
    let n_test = ((n as f64) * test_size).ceil() as usize;
    let n_test = n_test.min(n.saturating_sub(1));

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let (test_idx, train_idx) = indices.split_at(n_test);

    (data.select(Axis(0), train_idx), data.select(Axis(0), test_idx))
}

/// One optimizer step on `batch`; returns the batch loss before the update.
fn train_batch(model: &mut DenseAutoencoder, adam: &mut Adam, batch: &Array2<f64>) -> f64 {
    let layers = &mut model.layers;
    let n = layers.len();

    let mut activations = vec![batch.to_owned()];
    let mut pre_activations = Vec::with_capacity(n);
    for (i, layer) in layers.iter().enumerate() {
        let z = layer.pre_activation(&activations[i]);
        activations.push(layer.activation.apply(z.clone()));
        pre_activations.push(z);
    }

    let count = batch.len() as f64;
    let diff = &activations[n] - batch;
    let loss = diff.mapv(|d| d * d).sum() / count;

    // dL/da for the output layer, then walk back
    let mut grad = diff * (2.0 / count);
    let mut grads = Vec::with_capacity(n);
    for i in (0..n).rev() {
        let delta = grad * &layers[i].activation.derivative(&pre_activations[i]);
        let gw = activations[i].t().dot(&delta);
        let gb = delta.sum_axis(Axis(0));
        grad = delta.dot(&layers[i].weights.t());
        grads.push((gw, gb));
    }
    grads.reverse();

    adam.apply(layers, &grads);
    loss
}

/// Fit a fresh symmetric autoencoder on already-scaled rows.
pub fn fit(data: &Array2<f64>, config: &AutoencoderConfig) -> Result<(DenseAutoencoder, TrainingHistory), FitError> {
    if config.batch_size == 0 {
        return Err(FitError::InvalidParameter("batch_size must be positive".to_string()));
    }
    if !(0.0..1.0).contains(&config.validation_split) {
        return Err(FitError::InvalidParameter(format!(
            "validation_split must be in [0, 1), got {}",
            config.validation_split
        )));
    }

    let (train, val) = train_test_split(data, config.validation_split, config.seed);
    if train.nrows() == 0 {
        return Err(FitError::EmptyDataset);
    }
    tracing::info!("Train set: {}, Validation set: {}", train.nrows(), val.nrows());

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut model = DenseAutoencoder::symmetric(data.ncols(), &config.hidden_dims, config.latent_dim, &mut rng);
    let mut adam = Adam::new(&model.layers, config.learning_rate);
    let mut history = TrainingHistory::default();

    let mut order: Vec<usize> = (0..train.nrows()).collect();
    for epoch in 1..=config.epochs {
        order.shuffle(&mut rng);

        let mut weighted = 0.0;
        for chunk in order.chunks(config.batch_size) {
            let batch = train.select(Axis(0), chunk);
            weighted += train_batch(&mut model, &mut adam, &batch) * chunk.len() as f64;
        }
        let loss = weighted / train.nrows() as f64;
        history.loss.push(loss);

        if val.nrows() > 0 {
            let val_loss = reconstruction_loss(&model, &val);
            history.val_loss.push(val_loss);
            tracing::info!("Epoch {}/{} - loss: {:.6} - val_loss: {:.6}", epoch, config.epochs, loss, val_loss);
        } else {
            tracing::info!("Epoch {}/{} - loss: {:.6}", epoch, config.epochs, loss);
        }
    }

    Ok((model, history))
}

/// Summary of a training run
#[derive(Debug, Clone)]
pub struct AutoencoderReport {
    pub total_rows: usize,
    pub normal_rows: usize,
    pub history: TrainingHistory,
}

/// CSV -> normal rows -> scaler -> autoencoder -> artifact triple
pub fn run(csv_path: &Path, paths: &ArtifactPaths, spec: &DatasetSpec, config: &AutoencoderConfig) -> Result<AutoencoderReport> {
    tracing::info!("Loading: {}", csv_path.display());
    let dataset = LabeledDataset::from_csv(csv_path, spec)?;
    tracing::info!("Loaded {} rows", dataset.len());

    let normal = dataset.normal_rows(&spec.normal_label);
    tracing::info!("Normal transactions: {}", normal.nrows());
    tracing::info!("Features: {}", dataset.schema.len());

    let (scaler, scaled) = StandardScaler::fit_transform(&normal);
    let (model, history) = fit(&scaled, config).context("autoencoder training failed")?;

    save_artifacts(paths, ModelKind::Autoencoder, &dataset.schema, &scaler, &model)?;

    Ok(AutoencoderReport {
        total_rows: dataset.len(),
        normal_rows: normal.nrows(),
        history,
    })
}
