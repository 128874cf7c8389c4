use ndarray::{Array2, ArrayView2};
use ndarray_rand::rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::debug::ensure_finite;
use crate::error::{DdpgError, Result};
use crate::network::NeuralNetwork;
use super::traits::PolicyModel;
use super::{check_batch, validate_dim, validate_learning_rate, validate_tau, NetworkOptions};

/// Deterministic policy network: state -> tanh output scaled by `act_range`,
/// so every action component lies in `(-act_range, act_range)`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Actor {
    /// Parameters being trained
    pub online: NeuralNetwork,
    /// Slowly tracking copy used for Bellman targets
    pub target: NeuralNetwork,
    env_dim: usize,
    act_dim: usize,
    act_range: f32,
    learning_rate: f32,
    tau: f32,
}

impl Actor {
    /// Create an actor with the default architecture and fresh random weights.
    pub fn new(env_dim: usize, act_dim: usize, act_range: f32, learning_rate: f32, tau: f32) -> Result<Self> {
        Self::with_options(
            env_dim,
            act_dim,
            act_range,
            learning_rate,
            tau,
            &NetworkOptions::default(),
            &mut StdRng::from_entropy(),
        )
    }

    pub fn with_options<R: Rng + ?Sized>(
        env_dim: usize,
        act_dim: usize,
        act_range: f32,
        learning_rate: f32,
        tau: f32,
        options: &NetworkOptions,
        rng: &mut R,
    ) -> Result<Self> {
        validate_dim("env_dim", env_dim)?;
        validate_dim("act_dim", act_dim)?;
        validate_learning_rate(learning_rate)?;
        validate_tau(tau)?;
        if !(act_range > 0.0 && act_range.is_finite()) {
            return Err(DdpgError::invalid_parameter(
                "act_range".to_string(),
                format!("must be positive and finite, got {}", act_range),
            ));
        }
        options.validate()?;

        let (sizes, activations, inits) = options.layout(env_dim, act_dim, Activation::Tanh);
        let online = NeuralNetwork::with_inits(&sizes, &activations, &inits, options.optimizer.build(), rng)?;
        let target = online.clone();

        Ok(Actor {
            online,
            target,
            env_dim,
            act_dim,
            act_range,
            learning_rate,
            tau,
        })
    }

    pub fn act_range(&self) -> f32 {
        self.act_range
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn tau(&self) -> f32 {
        self.tau
    }

    fn scaled(&self, network: &NeuralNetwork, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_batch("states", states, None, self.env_dim)?;
        Ok(network.predict(states)? * self.act_range)
    }
}

impl PolicyModel for Actor {
    fn env_dim(&self) -> usize {
        self.env_dim
    }

    fn act_dim(&self) -> usize {
        self.act_dim
    }

    fn predict(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.scaled(&self.online, states)
    }

    fn target_predict(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.scaled(&self.target, states)
    }

    fn train(&mut self, states: ArrayView2<f32>, action_gradients: ArrayView2<f32>) -> Result<()> {
        if states.nrows() == 0 {
            return Err(DdpgError::EmptyBatch("actor training needs at least one state".to_string()));
        }
        check_batch("states", states, None, self.env_dim)?;
        check_batch("action_gradients", action_gradients, Some(states.nrows()), self.act_dim)?;
        ensure_finite("action gradients", &action_gradients)?;

        // Loss is -mean(Q); chain through the act_range scaling of the tanh output.
        let scale = -self.act_range / states.nrows() as f32;
        self.online.forward_batch(states)?;
        let output_errors = action_gradients.mapv(|g| g * scale);
        let gradients = self.online.backward_batch(output_errors.view())?;
        self.online.apply_gradients(&gradients.layers, self.learning_rate)
    }

    fn transfer_weights(&mut self) -> Result<()> {
        self.target.soft_update_from(&self.online, self.tau)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OptimizerKind;
    use ndarray::array;

    fn small_actor(seed: u64) -> Actor {
        actor_with_dims(3, 2, seed)
    }

    fn actor_with_dims(env_dim: usize, act_dim: usize, seed: u64) -> Actor {
        let options = NetworkOptions {
            hidden_sizes: vec![8],
            optimizer: OptimizerKind::Sgd,
            final_layer_limit: 0.5,
            ..NetworkOptions::default()
        };
        Actor::with_options(env_dim, act_dim, 2.0, 0.05, 0.1, &options, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_actions_within_range() {
        let actor = small_actor(1);
        let states = array![[100.0, -100.0, 50.0], [0.1, 0.2, 0.3]];
        let actions = actor.predict(states.view()).unwrap();
        assert_eq!(actions.dim(), (2, 2));
        assert!(actions.iter().all(|a| a.abs() <= 2.0));
    }

    #[test]
    fn test_target_starts_as_copy() {
        let actor = small_actor(2);
        let states = array![[0.3, -0.1, 0.7]];
        assert_eq!(
            actor.predict(states.view()).unwrap(),
            actor.target_predict(states.view()).unwrap()
        );
    }

    #[test]
    fn test_train_follows_gradient_uphill() {
        let mut actor = actor_with_dims(3, 1, 3);
        let states = array![[0.2, 0.4, -0.3]];
        let before = actor.predict(states.view()).unwrap()[[0, 0]];
        for _ in 0..10 {
            actor.train(states.view(), array![[1.0]].view()).unwrap();
        }
        let raised = actor.predict(states.view()).unwrap()[[0, 0]];
        assert!(raised > before);

        for _ in 0..10 {
            actor.train(states.view(), array![[-1.0]].view()).unwrap();
        }
        let lowered = actor.predict(states.view()).unwrap()[[0, 0]];
        assert!(lowered < raised);
    }

    #[test]
    fn test_train_rejects_bad_shapes() {
        let mut actor = small_actor(4);
        let states = array![[0.2, 0.4, -0.3]];
        assert!(actor.train(states.view(), array![[1.0]].view()).is_err());
        let empty = Array2::<f32>::zeros((0, 3));
        assert!(matches!(
            actor.train(empty.view(), Array2::zeros((0, 2)).view()),
            Err(DdpgError::EmptyBatch(_))
        ));
    }

    #[test]
    fn test_invalid_construction() {
        let mut rng = StdRng::seed_from_u64(0);
        let options = NetworkOptions::default();
        assert!(Actor::with_options(0, 1, 1.0, 0.001, 0.001, &options, &mut rng).is_err());
        assert!(Actor::with_options(3, 1, 0.0, 0.001, 0.001, &options, &mut rng).is_err());
        assert!(Actor::with_options(3, 1, 1.0, 0.001, 1.5, &options, &mut rng).is_err());
        assert!(Actor::with_options(3, 1, 1.0, -0.1, 0.5, &options, &mut rng).is_err());
    }
}
