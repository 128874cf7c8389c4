use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use ndarray_rand::rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{DdpgError, Result};
use super::initialization::WeightInit;

/// Gradients produced by a dense layer's backward pass.
#[derive(Debug, Clone)]
pub struct LayerGradients {
    /// Error propagated to the layer's inputs
    pub input_errors: Array2<f32>,
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

/// A fully connected (dense) layer in a neural network
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer, initialising weights with the scheme recommended
    /// for `activation` and biases with zeros.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        Self::with_init(input_size, output_size, activation, WeightInit::for_activation(&activation), rng)
    }

    /// Create a new dense layer with an explicit initialisation scheme.
    pub fn with_init<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        let weights = init.initialize_weights((input_size, output_size), rng)?;
        let biases = init.initialize_biases(output_size, rng)?;
        Ok(DenseLayer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        })
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Result<Self> {
        if weights.dim() != self.weights.dim() {
            return Err(DdpgError::dimension_mismatch(
                format!("{:?}", self.weights.dim()),
                format!("{:?}", weights.dim()),
            ));
        }
        self.weights = weights;
        Ok(self)
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Result<Self> {
        if biases.dim() != self.biases.dim() {
            return Err(DdpgError::dimension_mismatch(
                format!("{}", self.biases.len()),
                format!("{}", biases.len()),
            ));
        }
        self.biases = biases;
        Ok(self)
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    /// Forward pass without touching the backward-pass cache.
    pub fn predict(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Forward pass for a batch, remembering inputs and pre-activations for
    /// `backward_batch`.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Backpropagate `output_errors` (dL/d output, one row per sample) through
    /// the last cached forward pass.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<LayerGradients> {
        let (pre_activation_output, inputs) = match (&self.pre_activation_output, &self.inputs) {
            (Some(pre), Some(inputs)) => (pre, inputs),
            _ => {
                return Err(DdpgError::TrainingError(
                    "forward_batch() must be called before backward_batch()".to_string(),
                ))
            }
        };
        if output_errors.dim() != pre_activation_output.dim() {
            return Err(DdpgError::dimension_mismatch(
                format!("{:?}", pre_activation_output.dim()),
                format!("{:?}", output_errors.dim()),
            ));
        }

        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = &output_errors * &activation_deriv;

        Ok(LayerGradients {
            input_errors: adjusted_error.dot(&self.weights.t()),
            weights: inputs.t().dot(&adjusted_error),
            biases: adjusted_error.sum_axis(Axis(0)),
        })
    }

    /// Blend this layer's parameters toward `source`:
    /// `self = tau * source + (1 - tau) * self`.
    pub fn soft_update_from(&mut self, source: &DenseLayer, tau: f32) -> Result<()> {
        if self.weights.dim() != source.weights.dim() || self.biases.dim() != source.biases.dim() {
            return Err(DdpgError::dimension_mismatch(
                format!("{:?}", self.weights.dim()),
                format!("{:?}", source.weights.dim()),
            ));
        }
        Zip::from(&mut self.weights)
            .and(&source.weights)
            .for_each(|t, &s| *t = tau * s + (1.0 - tau) * *t);
        Zip::from(&mut self.biases)
            .and(&source.biases)
            .for_each(|t, &s| *t = tau * s + (1.0 - tau) * *t);
        Ok(())
    }

    pub fn is_finite(&self) -> bool {
        self.weights.iter().chain(self.biases.iter()).all(|v| v.is_finite())
    }
}
