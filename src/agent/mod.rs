//! # Actor and Critic
//!
//! The two function approximators DDPG coordinates, each owning an online
//! network and a target network of identical shape. The coordinator only talks
//! to them through [`PolicyModel`] and [`ValueModel`], so any implementation of
//! those traits can stand in for the dense-network versions provided here.

pub mod actor;
pub mod critic;
pub mod traits;

pub use actor::Actor;
pub use critic::Critic;
pub use traits::{PolicyModel, ValueModel};

use ndarray::ArrayView2;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{DdpgError, Result};
use crate::layers::WeightInit;
use crate::optimizer::OptimizerKind;

/// Architecture and optimizer shared by actor and critic networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkOptions {
    pub hidden_sizes: Vec<usize>,
    pub hidden_activation: Activation,
    pub optimizer: OptimizerKind,
    /// Output layer weights and biases start in `[-limit, limit)`
    pub final_layer_limit: f32,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        NetworkOptions {
            hidden_sizes: vec![256, 128],
            hidden_activation: Activation::Relu,
            optimizer: OptimizerKind::default(),
            final_layer_limit: 3e-3,
        }
    }
}

impl NetworkOptions {
    pub fn validate(&self) -> Result<()> {
        if let Some(position) = self.hidden_sizes.iter().position(|&size| size == 0) {
            return Err(DdpgError::invalid_parameter(
                "hidden_sizes".to_string(),
                format!("hidden layer {} has zero width", position),
            ));
        }
        if !(self.final_layer_limit > 0.0 && self.final_layer_limit.is_finite()) {
            return Err(DdpgError::invalid_parameter(
                "final_layer_limit".to_string(),
                format!("must be positive and finite, got {}", self.final_layer_limit),
            ));
        }
        self.optimizer.validate()
    }

    /// Layer sizes, activations and initialisers for a network mapping
    /// `input` features to `output` values through the hidden layers.
    pub(crate) fn layout(&self, input: usize, output: usize, output_activation: Activation) -> (Vec<usize>, Vec<Activation>, Vec<WeightInit>) {
        let mut sizes = vec![input];
        sizes.extend_from_slice(&self.hidden_sizes);
        sizes.push(output);

        let mut activations = vec![self.hidden_activation; self.hidden_sizes.len()];
        activations.push(output_activation);

        let mut inits = vec![WeightInit::for_activation(&self.hidden_activation); self.hidden_sizes.len()];
        inits.push(WeightInit::Uniform {
            min: -self.final_layer_limit,
            max: self.final_layer_limit,
        });

        (sizes, activations, inits)
    }
}

pub(crate) fn validate_dim(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(DdpgError::invalid_parameter(name, "must be greater than 0"));
    }
    Ok(())
}

pub(crate) fn validate_tau(tau: f32) -> Result<()> {
    if !(tau > 0.0 && tau <= 1.0) {
        return Err(DdpgError::invalid_parameter(
            "tau".to_string(),
            format!("must lie in (0, 1], got {}", tau),
        ));
    }
    Ok(())
}

pub(crate) fn validate_learning_rate(learning_rate: f32) -> Result<()> {
    if !(learning_rate > 0.0 && learning_rate.is_finite()) {
        return Err(DdpgError::invalid_parameter(
            "learning_rate".to_string(),
            format!("must be positive and finite, got {}", learning_rate),
        ));
    }
    Ok(())
}

/// Check a batch has `cols` columns and, when given, `rows` rows.
pub(crate) fn check_batch(what: &str, batch: ArrayView2<f32>, rows: Option<usize>, cols: usize) -> Result<()> {
    if batch.ncols() != cols || rows.map_or(false, |rows| batch.nrows() != rows) {
        let expected_rows = rows.map_or_else(|| "N".to_string(), |rows| rows.to_string());
        return Err(DdpgError::dimension_mismatch(
            format!("{} of shape ({}, {})", what, expected_rows, cols),
            format!("{:?}", batch.dim()),
        ));
    }
    Ok(())
}
