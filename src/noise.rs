//! Exploration noise for continuous actions.
//!
//! The coordinator's policy is deterministic; a training driver adds temporally
//! correlated noise to [`crate::algorithms::DDPG::get_action`] outputs while
//! collecting experience.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Serialize, Deserialize};

use crate::error::{DdpgError, Result};

/// Parameters of an Ornstein-Uhlenbeck process with linear sigma annealing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrnsteinUhlenbeckConfig {
    pub theta: f32,
    pub mu: f32,
    pub sigma: f32,
    pub sigma_min: f32,
    pub dt: f32,
    pub x0: f32,
    pub n_steps_annealing: usize,
}

impl Default for OrnsteinUhlenbeckConfig {
    fn default() -> Self {
        OrnsteinUhlenbeckConfig {
            theta: 0.15,
            mu: 0.0,
            sigma: 1.0,
            sigma_min: 0.0,
            dt: 1e-2,
            x0: 0.0,
            n_steps_annealing: 100,
        }
    }
}

impl OrnsteinUhlenbeckConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [self.theta, self.mu, self.sigma, self.sigma_min, self.dt, self.x0]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(DdpgError::invalid_parameter("ornstein_uhlenbeck", "parameters must be finite"));
        }
        if self.dt <= 0.0 {
            return Err(DdpgError::invalid_parameter("dt".to_string(), format!("must be positive, got {}", self.dt)));
        }
        if self.theta < 0.0 {
            return Err(DdpgError::invalid_parameter("theta".to_string(), format!("must be non-negative, got {}", self.theta)));
        }
        if !(0.0 <= self.sigma_min && self.sigma_min <= self.sigma) {
            return Err(DdpgError::invalid_parameter(
                "sigma".to_string(),
                format!("need 0 <= sigma_min <= sigma, got sigma_min {} and sigma {}", self.sigma_min, self.sigma),
            ));
        }
        if self.n_steps_annealing == 0 {
            return Err(DdpgError::invalid_parameter("n_steps_annealing", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Ornstein-Uhlenbeck noise:
/// `x <- x + theta (mu - x) dt + sigma_t sqrt(dt) N(0, 1)`, per action component.
#[derive(Debug, Clone)]
pub struct OrnsteinUhlenbeck {
    config: OrnsteinUhlenbeckConfig,
    state: Array1<f32>,
    n_steps: usize,
    rng: StdRng,
}

impl OrnsteinUhlenbeck {
    pub fn new(size: usize, config: OrnsteinUhlenbeckConfig) -> Result<Self> {
        Self::with_rng(size, config, StdRng::from_entropy())
    }

    pub fn with_seed(size: usize, config: OrnsteinUhlenbeckConfig, seed: u64) -> Result<Self> {
        Self::with_rng(size, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(size: usize, config: OrnsteinUhlenbeckConfig, rng: StdRng) -> Result<Self> {
        if size == 0 {
            return Err(DdpgError::invalid_parameter("size", "must be greater than 0"));
        }
        config.validate()?;
        Ok(OrnsteinUhlenbeck {
            config,
            state: Array1::from_elem(size, config.x0),
            n_steps: 0,
            rng,
        })
    }

    /// Sigma after the current number of annealing steps.
    pub fn current_sigma(&self) -> f32 {
        let c = &self.config;
        let sigma_step = (c.sigma - c.sigma_min) / c.n_steps_annealing as f32;
        (c.sigma - sigma_step * self.n_steps as f32).max(c.sigma_min)
    }

    /// Advance the process one step and return the new noise vector.
    pub fn sample(&mut self) -> Array1<f32> {
        let sigma = self.current_sigma();
        let OrnsteinUhlenbeckConfig { theta, mu, dt, .. } = self.config;
        let diffusion = sigma * dt.sqrt();
        let rng = &mut self.rng;
        self.state.mapv_inplace(|x| {
            let z: f32 = rng.sample(StandardNormal);
            x + theta * (mu - x) * dt + diffusion * z
        });
        self.n_steps += 1;
        self.state.clone()
    }

    /// Return to `x0` and restart annealing.
    pub fn reset(&mut self) {
        self.state.fill(self.config.x0);
        self.n_steps = 0;
    }

    pub fn steps(&self) -> usize {
        self.n_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigma_anneals_to_minimum() {
        let config = OrnsteinUhlenbeckConfig {
            sigma: 1.0,
            sigma_min: 0.2,
            n_steps_annealing: 4,
            ..OrnsteinUhlenbeckConfig::default()
        };
        let mut noise = OrnsteinUhlenbeck::with_seed(2, config, 0).unwrap();
        assert!((noise.current_sigma() - 1.0).abs() < 1e-6);
        noise.sample();
        noise.sample();
        assert!((noise.current_sigma() - 0.6).abs() < 1e-6);
        for _ in 0..10 {
            noise.sample();
        }
        assert!((noise.current_sigma() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_zero_sigma_decays_toward_mu() {
        let config = OrnsteinUhlenbeckConfig {
            sigma: 0.0,
            mu: 1.0,
            x0: 0.0,
            theta: 0.5,
            dt: 0.1,
            ..OrnsteinUhlenbeckConfig::default()
        };
        let mut noise = OrnsteinUhlenbeck::with_seed(1, config, 0).unwrap();
        let first = noise.sample()[0];
        assert!((first - 0.05).abs() < 1e-6);
        let mut last = first;
        for _ in 0..100 {
            last = noise.sample()[0];
        }
        assert!(last > first && last < 1.0);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut noise = OrnsteinUhlenbeck::with_seed(3, OrnsteinUhlenbeckConfig::default(), 9).unwrap();
        noise.sample();
        noise.reset();
        assert_eq!(noise.steps(), 0);
        assert!((noise.current_sigma() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_seeded_processes_agree() {
        let config = OrnsteinUhlenbeckConfig::default();
        let mut a = OrnsteinUhlenbeck::with_seed(3, config, 42).unwrap();
        let mut b = OrnsteinUhlenbeck::with_seed(3, config, 42).unwrap();
        for _ in 0..5 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_invalid_config() {
        let config = OrnsteinUhlenbeckConfig { dt: 0.0, ..OrnsteinUhlenbeckConfig::default() };
        assert!(OrnsteinUhlenbeck::new(1, config).is_err());
        assert!(OrnsteinUhlenbeck::new(0, OrnsteinUhlenbeckConfig::default()).is_err());
    }
}
