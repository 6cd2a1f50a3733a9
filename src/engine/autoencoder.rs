//! Dense autoencoder
//!
//! Symmetric feed-forward network used for reconstruction-error scoring.
//! Default shape for the 29-column card dataset:
//!
//! ```text
//! Input (29) -> 20 -> 14 (latent) -> 20 -> Output (29)
//! ```

use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    pub fn apply(self, z: Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv_into(|v| v.max(0.0)),
            Activation::Linear => z,
        }
    }

    /// Derivative evaluated at the pre-activation `z`
    pub fn derivative(self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(z.raw_dim()),
        }
    }
}

/// Fully connected layer: `activation(x · W + b)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Glorot-uniform weights, zero bias
    pub fn glorot<R: Rng>(inputs: usize, outputs: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        let weights = Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-limit..limit));

        Self {
            weights,
            bias: Array1::zeros(outputs),
            activation,
        }
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.weights.ncols()
    }

    pub fn pre_activation(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        self.activation.apply(self.pre_activation(x))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseAutoencoder {
    pub layers: Vec<DenseLayer>,
}

impl DenseAutoencoder {
    /// Encoder `input -> hidden.. -> latent`, decoder mirrored, linear output.
    pub fn symmetric<R: Rng>(input_dim: usize, hidden_dims: &[usize], latent_dim: usize, rng: &mut R) -> Self {
        let mut dims = vec![input_dim];
        dims.extend_from_slice(hidden_dims);
        dims.push(latent_dim);
        dims.extend(hidden_dims.iter().rev());
        dims.push(input_dim);

        let last = dims.len() - 2;
        let layers = dims
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let activation = if i == last { Activation::Linear } else { Activation::Relu };
                DenseLayer::glorot(pair[0], pair[1], activation, rng)
            })
            .collect();

        Self { layers }
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(DenseLayer::inputs).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(DenseLayer::outputs).unwrap_or(0)
    }

    /// Layer chain must be non-empty, connected, and end at the input width.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.layers.is_empty() {
            return Err(ArtifactError::Mismatch("autoencoder has no layers".to_string()));
        }

        for (i, layer) in self.layers.iter().enumerate() {
            if layer.bias.len() != layer.outputs() {
                return Err(ArtifactError::Mismatch(format!(
                    "layer {} has {} outputs but {} biases",
                    i,
                    layer.outputs(),
                    layer.bias.len()
                )));
            }
        }

        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].outputs() != pair[1].inputs() {
                return Err(ArtifactError::Mismatch(format!(
                    "layer {} emits {} values but layer {} takes {}",
                    i,
                    pair[0].outputs(),
                    i + 1,
                    pair[1].inputs()
                )));
            }
        }

        if self.output_dim() != self.input_dim() {
            return Err(ArtifactError::Mismatch(format!(
                "autoencoder maps {} inputs to {} outputs",
                self.input_dim(),
                self.output_dim()
            )));
        }

        Ok(())
    }

    pub fn reconstruct(&self, x: &Array2<f64>) -> Array2<f64> {
        self.layers
            .iter()
            .fold(x.to_owned(), |acc, layer| layer.forward(&acc))
    }
}
