//! # Neural Network Layers
//!
//! Fully connected layers and their weight initialisation schemes. Each layer
//! keeps the inputs and pre-activations of its last training forward pass so the
//! backward pass can produce both parameter gradients and the error with respect
//! to its inputs. The latter is what lets the critic report dQ/da.

pub mod dense;
pub mod initialization;

pub use dense::{DenseLayer, LayerGradients};
pub use initialization::WeightInit;
