use ndarray::{Array1, Array2};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{DdpgError, Result};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Xavier/Glorot uniform initialization
    XavierUniform,

    /// He/Kaiming uniform initialization (for ReLU)
    HeUniform,

    /// Uniform distribution with custom range, used for output layers
    Uniform { min: f32, max: f32 },

    /// All zeros
    Zeros,
}

impl WeightInit {
    /// Initialize a `(fan_in, fan_out)` weight matrix
    pub fn initialize_weights<R: Rng + ?Sized>(
        &self,
        shape: (usize, usize),
        rng: &mut R,
    ) -> Result<Array2<f32>> {
        let (fan_in, fan_out) = shape;
        if fan_in == 0 || fan_out == 0 {
            return Err(DdpgError::invalid_parameter(
                "shape".to_string(),
                format!("layer dimensions must be positive, got {:?}", shape),
            ));
        }

        let weights = match self {
            WeightInit::XavierUniform => {
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                Array2::random_using(shape, Uniform::new(-limit, limit), rng)
            }

            WeightInit::HeUniform => {
                let limit = (6.0 / fan_in as f32).sqrt();
                Array2::random_using(shape, Uniform::new(-limit, limit), rng)
            }

            WeightInit::Uniform { min, max } => {
                check_range(*min, *max)?;
                Array2::random_using(shape, Uniform::new(*min, *max), rng)
            }

            WeightInit::Zeros => Array2::zeros(shape),
        };

        Ok(weights)
    }

    /// Initialize biases for a layer
    pub fn initialize_biases<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Result<Array1<f32>> {
        match self {
            WeightInit::Uniform { min, max } => {
                check_range(*min, *max)?;
                Ok(Array1::random_using(size, Uniform::new(*min, *max), rng))
            }
            WeightInit::XavierUniform | WeightInit::HeUniform | WeightInit::Zeros => {
                Ok(Array1::zeros(size))
            }
        }
    }

    /// Get the recommended initialization for an activation function
    pub fn for_activation(activation: &Activation) -> Self {
        match activation {
            Activation::Relu | Activation::LeakyRelu { .. } => WeightInit::HeUniform,
            Activation::Sigmoid | Activation::Tanh | Activation::Linear => WeightInit::XavierUniform,
        }
    }
}

fn check_range(min: f32, max: f32) -> Result<()> {
    if !(min.is_finite() && max.is_finite() && min < max) {
        return Err(DdpgError::invalid_parameter(
            "init_range".to_string(),
            format!("expected finite min < max, got [{}, {}]", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let init = WeightInit::Uniform { min: -3e-3, max: 3e-3 };
        let w = init.initialize_weights((16, 4), &mut rng).unwrap();
        assert!(w.iter().all(|&v| v >= -3e-3 && v < 3e-3));
        let b = init.initialize_biases(4, &mut rng).unwrap();
        assert!(b.iter().all(|&v| v >= -3e-3 && v < 3e-3));
    }

    #[test]
    fn test_he_uniform_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        let w = WeightInit::HeUniform.initialize_weights((24, 8), &mut rng).unwrap();
        let limit = (6.0f32 / 24.0).sqrt();
        assert!(w.iter().all(|&v| v.abs() <= limit));
    }

    #[test]
    fn test_invalid_range_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        let init = WeightInit::Uniform { min: 1.0, max: -1.0 };
        assert!(init.initialize_weights((2, 2), &mut rng).is_err());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(WeightInit::Zeros.initialize_weights((0, 3), &mut rng).is_err());
    }
}
