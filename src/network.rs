use ndarray::{Array1, Array2, ArrayView2};
use ndarray_rand::rand::Rng;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;

use crate::activations::Activation;
use crate::debug::ensure_finite;
use crate::error::{DdpgError, Result};
use crate::layers::{DenseLayer, WeightInit};
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// Gradients of a whole network: one `(weights, biases)` pair per layer, plus the
/// error with respect to the network inputs.
#[derive(Debug, Clone)]
pub struct NetworkGradients {
    pub layers: Vec<(Array2<f32>, Array1<f32>)>,
    pub inputs: Array2<f32>,
}

/// A feed-forward neural network made of dense layers and the optimizer that
/// updates them.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
    pub optimizer: OptimizerWrapper,
}

impl NeuralNetwork {
    /// Create a new network with the given layer sizes and activations. Weights
    /// use the initialisation recommended for each layer's activation.
    pub fn new<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        activations: &[Activation],
        optimizer: OptimizerWrapper,
        rng: &mut R,
    ) -> Result<Self> {
        let inits = activations.iter().map(WeightInit::for_activation).collect::<Vec<_>>();
        Self::with_inits(layer_sizes, activations, &inits, optimizer, rng)
    }

    /// Create a new network with an explicit initialisation per layer.
    pub fn with_inits<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        activations: &[Activation],
        inits: &[WeightInit],
        optimizer: OptimizerWrapper,
        rng: &mut R,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(DdpgError::invalid_parameter(
                "layer_sizes".to_string(),
                format!("need at least an input and an output size, got {:?}", layer_sizes),
            ));
        }
        let layer_count = layer_sizes.len() - 1;
        if activations.len() != layer_count || inits.len() != layer_count {
            return Err(DdpgError::dimension_mismatch(
                format!("{} activations and initialisers", layer_count),
                format!("{} activations, {} initialisers", activations.len(), inits.len()),
            ));
        }

        let layers = layer_sizes
            .windows(2)
            .zip(activations.iter().zip(inits))
            .map(|(window, (&activation, &init))| {
                DenseLayer::with_init(window[0], window[1], activation, init, &mut *rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(NeuralNetwork { layers, optimizer })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_size)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.weights.len() + l.biases.len()).sum()
    }

    /// Forward pass for a batch without recording anything for backprop.
    pub fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_inputs(inputs)?;
        let mut layers = self.layers.iter();
        let mut current = match layers.next() {
            Some(first) => first.predict(inputs),
            None => return Ok(inputs.to_owned()),
        };
        for layer in layers {
            current = layer.predict(current.view());
        }
        Ok(current)
    }

    /// Forward pass for a batch that caches what `backward_batch` needs.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_inputs(inputs)?;
        let mut current = inputs.to_owned();
        for layer in &mut self.layers {
            current = layer.forward_batch(current.view());
        }
        Ok(current)
    }

    /// Backpropagate `output_errors` (dL/d output) through the last cached
    /// forward pass.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<NetworkGradients> {
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors.to_owned();

        for layer in self.layers.iter().rev() {
            let layer_gradients = layer.backward_batch(current_error.view())?;
            gradients.push((layer_gradients.weights, layer_gradients.biases));
            current_error = layer_gradients.input_errors;
        }

        gradients.reverse();
        Ok(NetworkGradients { layers: gradients, inputs: current_error })
    }

    /// Apply per-layer gradients with the network's optimizer.
    ///
    /// Gradients must be finite. If the update would still leave a parameter
    /// non-finite, parameters and optimizer state are restored and the step is
    /// rejected with `NumericalError`.
    pub fn apply_gradients(&mut self, gradients: &[(Array2<f32>, Array1<f32>)], learning_rate: f32) -> Result<()> {
        if gradients.len() != self.layers.len() {
            return Err(DdpgError::dimension_mismatch(
                format!("{} layer gradients", self.layers.len()),
                format!("{}", gradients.len()),
            ));
        }
        for (index, (layer, (weight_gradients, bias_gradients))) in self.layers.iter().zip(gradients).enumerate() {
            if layer.weights.dim() != weight_gradients.dim() {
                return Err(DdpgError::dimension_mismatch(
                    format!("layer {} weights {:?}", index, layer.weights.dim()),
                    format!("{:?}", weight_gradients.dim()),
                ));
            }
            if layer.biases.dim() != bias_gradients.dim() {
                return Err(DdpgError::dimension_mismatch(
                    format!("layer {} biases {:?}", index, layer.biases.dim()),
                    format!("{:?}", bias_gradients.dim()),
                ));
            }
            ensure_finite(&format!("layer {} weight gradients", index), weight_gradients)?;
            ensure_finite(&format!("layer {} bias gradients", index), bias_gradients)?;
        }

        let snapshot = self
            .layers
            .iter()
            .map(|layer| (layer.weights.clone(), layer.biases.clone()))
            .collect::<Vec<_>>();
        let optimizer_before = self.optimizer.clone();

        for (index, (layer, (weight_gradients, bias_gradients))) in
            self.layers.iter_mut().zip(gradients).enumerate()
        {
            self.optimizer.update_weights(index, &mut layer.weights, weight_gradients, learning_rate);
            self.optimizer.update_biases(index, &mut layer.biases, bias_gradients, learning_rate);
        }

        if !self.is_finite() {
            for (layer, (weights, biases)) in self.layers.iter_mut().zip(snapshot) {
                layer.weights = weights;
                layer.biases = biases;
            }
            self.optimizer = optimizer_before;
            log::warn!("Rejected an update that left network parameters non-finite");
            return Err(DdpgError::NumericalError(
                "update would make network parameters non-finite".to_string(),
            ));
        }

        self.optimizer.step();
        Ok(())
    }

    /// One regression step on mean squared error. Returns the loss measured
    /// before the update.
    pub fn train_minibatch(
        &mut self,
        inputs: ArrayView2<f32>,
        targets: ArrayView2<f32>,
        learning_rate: f32,
    ) -> Result<f32> {
        let outputs = self.forward_batch(inputs)?;
        if outputs.dim() != targets.dim() {
            return Err(DdpgError::dimension_mismatch(
                format!("{:?}", outputs.dim()),
                format!("{:?}", targets.dim()),
            ));
        }
        let count = outputs.len() as f32;
        let diff = &outputs - &targets;
        let loss = diff.mapv(|d| d * d).sum() / count;
        if !loss.is_finite() {
            log::warn!("Regression loss is {}", loss);
            return Err(DdpgError::NumericalError(format!("loss is {}", loss)));
        }
        let output_errors = diff * (2.0 / count);

        let gradients = self.backward_batch(output_errors.view())?;
        self.apply_gradients(&gradients.layers, learning_rate)?;
        Ok(loss)
    }

    /// Move every parameter toward `source`: `self = tau * source + (1 - tau) * self`.
    pub fn soft_update_from(&mut self, source: &NeuralNetwork, tau: f32) -> Result<()> {
        if self.layers.len() != source.layers.len() {
            return Err(DdpgError::dimension_mismatch(
                format!("{} layers", self.layers.len()),
                format!("{} layers", source.layers.len()),
            ));
        }
        for (target, online) in self.layers.iter_mut().zip(&source.layers) {
            target.soft_update_from(online, tau)?;
        }
        Ok(())
    }

    pub fn is_finite(&self) -> bool {
        self.layers.iter().all(DenseLayer::is_finite)
    }

    /// Save the network to a bincode file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load a network saved with [`NeuralNetwork::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(bincode::deserialize(&data)?)
    }

    fn check_inputs(&self, inputs: ArrayView2<f32>) -> Result<()> {
        if inputs.ncols() != self.input_size() {
            return Err(DdpgError::dimension_mismatch(
                format!("{} input columns", self.input_size()),
                format!("{}", inputs.ncols()),
            ));
        }
        Ok(())
    }
}
