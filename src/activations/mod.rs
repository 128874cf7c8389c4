//! # Activation Functions Module
//!
//! Element-wise non-linearities applied by dense layers.
//!
//! ## Available Activations
//!
//! - **ReLU**: `max(0, x)` - default for hidden layers of both actor and critic
//! - **LeakyReLU**: ReLU with a small negative slope
//! - **Tanh**: outputs in (-1, 1); the actor's output layer uses it before range scaling
//! - **Sigmoid**: outputs in (0, 1)
//! - **Linear**: identity; the critic's output layer uses it
//!
//! ## Usage Example
//!
//! ```rust
//! use ddpg::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![[1.0, -0.5, 0.0, 2.0]];
//! Activation::Relu.apply_batch(&mut data);
//! assert_eq!(data, array![[1.0, 0.0, 0.0, 2.0]]);
//! ```

pub mod functions;

pub use functions::Activation;
