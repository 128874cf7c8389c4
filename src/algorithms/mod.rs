//! Reinforcement learning algorithms.
//!
//! ## Available Algorithms
//!
//! - **DDPG**: Deep Deterministic Policy Gradient for continuous control

pub mod ddpg;

pub use ddpg::{DdpgBuilder, DdpgConfig, DDPG};
