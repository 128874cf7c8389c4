use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::debug::ensure_finite;
use crate::error::{DdpgError, Result};
use crate::network::NeuralNetwork;
use super::traits::ValueModel;
use super::{check_batch, validate_dim, validate_learning_rate, validate_tau, NetworkOptions};

/// Action-value network Q(s, a). The state and action are concatenated into a
/// single input row `[s | a]`, and the output layer is a single linear unit.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Critic {
    pub online: NeuralNetwork,
    pub target: NeuralNetwork,
    env_dim: usize,
    act_dim: usize,
    learning_rate: f32,
    tau: f32,
}

impl Critic {
    pub fn new(env_dim: usize, act_dim: usize, learning_rate: f32, tau: f32) -> Result<Self> {
        Self::with_options(
            env_dim,
            act_dim,
            learning_rate,
            tau,
            &NetworkOptions::default(),
            &mut StdRng::from_entropy(),
        )
    }

    pub fn with_options<R: Rng + ?Sized>(
        env_dim: usize,
        act_dim: usize,
        learning_rate: f32,
        tau: f32,
        options: &NetworkOptions,
        rng: &mut R,
    ) -> Result<Self> {
        validate_dim("env_dim", env_dim)?;
        validate_dim("act_dim", act_dim)?;
        validate_learning_rate(learning_rate)?;
        validate_tau(tau)?;
        options.validate()?;

        let (sizes, activations, inits) = options.layout(env_dim + act_dim, 1, Activation::Linear);
        let online = NeuralNetwork::with_inits(&sizes, &activations, &inits, options.optimizer.build(), rng)?;
        let target = online.clone();

        Ok(Critic {
            online,
            target,
            env_dim,
            act_dim,
            learning_rate,
            tau,
        })
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn tau(&self) -> f32 {
        self.tau
    }

    fn inputs(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_batch("states", states, None, self.env_dim)?;
        check_batch("actions", actions, Some(states.nrows()), self.act_dim)?;
        concatenate(Axis(1), &[states.view(), actions.view()])
            .map_err(|e| DdpgError::dimension_mismatch("concatenable state/action batches".to_string(), e.to_string()))
    }

    fn evaluate(&self, network: &NeuralNetwork, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array1<f32>> {
        let inputs = self.inputs(states, actions)?;
        Ok(network.predict(inputs.view())?.index_axis_move(Axis(1), 0))
    }
}

impl ValueModel for Critic {
    fn env_dim(&self) -> usize {
        self.env_dim
    }

    fn act_dim(&self) -> usize {
        self.act_dim
    }

    fn predict(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array1<f32>> {
        self.evaluate(&self.online, states, actions)
    }

    fn target_predict(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array1<f32>> {
        self.evaluate(&self.target, states, actions)
    }

    fn train_on_batch(
        &mut self,
        states: ArrayView2<f32>,
        actions: ArrayView2<f32>,
        critic_targets: ArrayView1<f32>,
    ) -> Result<f32> {
        if states.nrows() == 0 {
            return Err(DdpgError::EmptyBatch("critic training needs at least one sample".to_string()));
        }
        if critic_targets.len() != states.nrows() {
            return Err(DdpgError::dimension_mismatch(
                format!("{} critic targets", states.nrows()),
                format!("{}", critic_targets.len()),
            ));
        }
        ensure_finite("critic targets", &critic_targets)?;

        let inputs = self.inputs(states, actions)?;
        let targets = critic_targets.insert_axis(Axis(1));
        self.online.train_minibatch(inputs.view(), targets, self.learning_rate)
    }

    fn gradients(&mut self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array2<f32>> {
        let inputs = self.inputs(states, actions)?;
        let outputs = self.online.forward_batch(inputs.view())?;
        // Each row's Q depends only on its own input row, so unit output errors
        // give dQ_i/d(input_i) row by row.
        let input_gradients = self.online.backward_batch(Array2::ones(outputs.dim()).view())?.inputs;
        Ok(input_gradients.slice(s![.., self.env_dim..]).to_owned())
    }

    fn transfer_weights(&mut self) -> Result<()> {
        self.target.soft_update_from(&self.online, self.tau)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::numerical_input_gradient;
    use crate::optimizer::OptimizerKind;
    use ndarray::array;

    fn small_critic(seed: u64) -> Critic {
        let options = NetworkOptions {
            hidden_sizes: vec![16, 8],
            hidden_activation: Activation::Tanh,
            optimizer: OptimizerKind::Sgd,
            final_layer_limit: 0.5,
        };
        Critic::with_options(3, 2, 0.05, 0.1, &options, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_predict_shapes() {
        let critic = small_critic(1);
        let states = array![[0.1, 0.2, 0.3], [0.0, -1.0, 1.0]];
        let actions = array![[0.5, -0.5], [1.0, 0.0]];
        let q = critic.predict(states.view(), actions.view()).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q, critic.target_predict(states.view(), actions.view()).unwrap());
    }

    #[test]
    fn test_action_gradients_match_finite_differences() {
        let mut critic = small_critic(2);
        let states = array![[0.1, 0.2, 0.3], [0.0, -1.0, 1.0]];
        let actions = array![[0.5, -0.5], [1.0, 0.0]];
        let analytical = critic.gradients(states.view(), actions.view()).unwrap();

        let inputs = concatenate(Axis(1), &[states.view(), actions.view()]).unwrap();
        let numerical = numerical_input_gradient(&critic.online, inputs.view(), 1e-2).unwrap();
        let numerical = numerical.slice(s![.., 3..]).to_owned();

        assert_eq!(analytical.dim(), (2, 2));
        for (a, n) in analytical.iter().zip(numerical.iter()) {
            assert!((a - n).abs() < 1e-2, "analytical {} vs numerical {}", a, n);
        }
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut critic = small_critic(3);
        let states = array![[0.1, 0.2, 0.3], [0.0, -1.0, 1.0]];
        let actions = array![[0.5, -0.5], [1.0, 0.0]];
        let targets = array![1.0, -1.0];
        let first = critic.train_on_batch(states.view(), actions.view(), targets.view()).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = critic.train_on_batch(states.view(), actions.view(), targets.view()).unwrap();
        }
        assert!(last < first);
    }

    #[test]
    fn test_training_leaves_target_untouched() {
        let mut critic = small_critic(4);
        let states = array![[0.1, 0.2, 0.3]];
        let actions = array![[0.5, -0.5]];
        let before = critic.target_predict(states.view(), actions.view()).unwrap();
        critic.train_on_batch(states.view(), actions.view(), array![3.0].view()).unwrap();
        assert_eq!(before, critic.target_predict(states.view(), actions.view()).unwrap());
    }

    #[test]
    fn test_rejects_non_finite_targets() {
        let mut critic = small_critic(5);
        let states = array![[0.1, 0.2, 0.3]];
        let actions = array![[0.5, -0.5]];
        let result = critic.train_on_batch(states.view(), actions.view(), array![f32::NAN].view());
        assert!(matches!(result, Err(DdpgError::NumericalError(_))));
    }

    #[test]
    fn test_rejects_mismatched_rows() {
        let critic = small_critic(6);
        let states = array![[0.1, 0.2, 0.3]];
        let actions = array![[0.5, -0.5], [0.1, 0.1]];
        assert!(matches!(
            critic.predict(states.view(), actions.view()),
            Err(DdpgError::DimensionMismatch { .. })
        ));
    }
}
