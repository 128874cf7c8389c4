//! # DDPG - Deep Deterministic Policy Gradient
//!
//! An actor-critic agent for continuous control. A deterministic actor proposes
//! actions, a critic estimates their value, a replay buffer stores experience,
//! and target copies of both networks track the online ones through soft
//! updates (`target = tau * online + (1 - tau) * target`).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ddpg::algorithms::DdpgBuilder;
//! use ddpg::noise::{OrnsteinUhlenbeck, OrnsteinUhlenbeckConfig};
//! use ndarray::array;
//!
//! # fn main() -> ddpg::error::Result<()> {
//! let mut agent = DdpgBuilder::new(1, 3)
//!     .action_range(2.0)
//!     .hidden_sizes(vec![64, 64])
//!     .build()?;
//! let mut noise = OrnsteinUhlenbeck::new(1, OrnsteinUhlenbeckConfig::default())?;
//!
//! let state = array![1.0, 0.0, 0.0];
//! let action = agent.get_action(state.view())? + noise.sample();
//! // ... step the environment with `action` ...
//! agent.memorize(state.clone(), action, -0.5, false, array![0.9, 0.1, 0.0]);
//!
//! if agent.buffer_len() >= 64 {
//!     agent.update(64)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions
//! - [`agent`] - Actor and critic networks and the traits the coordinator uses
//! - [`algorithms`] - The DDPG coordinator, its configuration and builder
//! - [`debug`] - Finite-value and gradient checks
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense layers and weight initialisation
//! - [`network`] - Feed-forward network with input gradients and soft updates
//! - [`noise`] - Ornstein-Uhlenbeck exploration noise
//! - [`optimizer`] - SGD and Adam
//! - [`replay_buffer`] - FIFO experience replay

pub mod activations;
pub mod agent;
pub mod algorithms;
pub mod debug;
pub mod error;
pub mod layers;
pub mod network;
pub mod noise;
pub mod optimizer;
pub mod replay_buffer;

#[cfg(test)]
mod tests;
