use ndarray::{Array1, Array2, Dimension, Zip};
use serde::{Serialize, Deserialize};

use crate::error::{DdpgError, Result};

/// Gradient-descent update rule. Implementations keep per-layer state keyed by
/// the layer's index in its network.
pub trait Optimizer {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);

    /// Called once after every layer of a network has been updated.
    fn step(&mut self) {}
}

/// Serializable choice of optimizer, used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Sgd,
    Adam { beta1: f32, beta2: f32, epsilon: f32 },
}

impl Default for OptimizerKind {
    fn default() -> Self {
        OptimizerKind::Adam { beta1: 0.9, beta2: 0.999, epsilon: 1e-8 }
    }
}

impl OptimizerKind {
    pub fn validate(&self) -> Result<()> {
        if let OptimizerKind::Adam { beta1, beta2, epsilon } = *self {
            for (name, beta) in [("beta1", beta1), ("beta2", beta2)] {
                if !(0.0..1.0).contains(&beta) {
                    return Err(DdpgError::invalid_parameter(
                        name.to_string(),
                        format!("must lie in [0, 1), got {}", beta),
                    ));
                }
            }
            if !(epsilon > 0.0 && epsilon.is_finite()) {
                return Err(DdpgError::invalid_parameter(
                    "epsilon".to_string(),
                    format!("must be positive and finite, got {}", epsilon),
                ));
            }
        }
        Ok(())
    }

    pub fn build(&self) -> OptimizerWrapper {
        match *self {
            OptimizerKind::Sgd => OptimizerWrapper::SGD(SGD::new()),
            OptimizerKind::Adam { beta1, beta2, epsilon } => {
                OptimizerWrapper::Adam(Adam::new(beta1, beta2, epsilon))
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
        }
    }

    fn step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Default for SGD {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

/// Adam with first/second moment estimates per layer. Moment buffers are
/// allocated lazily the first time a layer index is seen.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    /// Timestep used for bias correction, starting at 1
    pub t: usize,
}

impl Adam {
    pub fn new(beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: Vec::new(),
            v_weights: Vec::new(),
            m_biases: Vec::new(),
            v_biases: Vec::new(),
            t: 1,
        }
    }

    fn corrections(&self) -> (f32, f32) {
        (
            1.0 - self.beta1.powi(self.t as i32),
            1.0 - self.beta2.powi(self.t as i32),
        )
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.9, 0.999, 1e-8)
    }
}

fn ensure_slot<D: Dimension>(slots: &mut Vec<ndarray::Array<f32, D>>, layer: usize, dim: D) {
    while slots.len() <= layer {
        slots.push(ndarray::Array::zeros(dim.clone()));
    }
    if slots[layer].raw_dim() != dim {
        slots[layer] = ndarray::Array::zeros(dim);
    }
}

fn adam_update<D: Dimension>(
    params: &mut ndarray::Array<f32, D>,
    gradients: &ndarray::Array<f32, D>,
    m: &mut ndarray::Array<f32, D>,
    v: &mut ndarray::Array<f32, D>,
    (beta1, beta2, epsilon): (f32, f32, f32),
    (bc1, bc2): (f32, f32),
    learning_rate: f32,
) {
    Zip::from(params)
        .and(gradients)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            let m_hat = *m / bc1;
            let v_hat = *v / bc2;
            *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        });
}

impl Optimizer for Adam {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        ensure_slot(&mut self.m_weights, layer, weights.raw_dim());
        ensure_slot(&mut self.v_weights, layer, weights.raw_dim());
        let corrections = self.corrections();
        let hyper = (self.beta1, self.beta2, self.epsilon);
        adam_update(
            weights,
            gradients,
            &mut self.m_weights[layer],
            &mut self.v_weights[layer],
            hyper,
            corrections,
            learning_rate,
        );
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        ensure_slot(&mut self.m_biases, layer, biases.raw_dim());
        ensure_slot(&mut self.v_biases, layer, biases.raw_dim());
        let corrections = self.corrections();
        let hyper = (self.beta1, self.beta2, self.epsilon);
        adam_update(
            biases,
            gradients,
            &mut self.m_biases[layer],
            &mut self.v_biases[layer],
            hyper,
            corrections,
            learning_rate,
        );
    }

    fn step(&mut self) {
        self.t += 1;
    }
}
