use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;

use crate::agent::{check_batch, validate_dim, Actor, Critic, NetworkOptions, PolicyModel, ValueModel};
use crate::debug::{ensure_binary_mask, ensure_finite, ensure_network_finite};
use crate::error::{DdpgError, Result};
use crate::optimizer::OptimizerKind;
use crate::replay_buffer::{Batch, ExperienceBuffer, ReplayBuffer, Transition};

/// Hyperparameters of a [`DDPG`] agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdpgConfig {
    /// Number of action components
    pub act_dim: usize,
    /// Number of state components
    pub env_dim: usize,
    /// Actions are bounded to `(-act_range, act_range)`
    pub act_range: f32,
    pub buffer_size: usize,
    /// Discount factor in [0, 1]
    pub gamma: f32,
    /// Learning rate of both actor and critic
    pub lr: f32,
    /// Target smoothing constant in (0, 1]
    pub tau: f32,
    pub actor: NetworkOptions,
    pub critic: NetworkOptions,
    /// Makes weight initialisation and batch sampling reproducible
    pub seed: Option<u64>,
}

impl Default for DdpgConfig {
    fn default() -> Self {
        DdpgConfig {
            act_dim: 0,
            env_dim: 0,
            act_range: 1.0,
            buffer_size: 100_000,
            gamma: 0.99,
            lr: 0.001,
            tau: 0.001,
            actor: NetworkOptions::default(),
            critic: NetworkOptions::default(),
            seed: None,
        }
    }
}

impl DdpgConfig {
    pub fn new(act_dim: usize, env_dim: usize, act_range: f32) -> Self {
        DdpgConfig {
            act_dim,
            env_dim,
            act_range,
            ..DdpgConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_dim("act_dim", self.act_dim)?;
        validate_dim("env_dim", self.env_dim)?;
        validate_dim("buffer_size", self.buffer_size)?;
        validate_gamma(self.gamma)?;
        crate::agent::validate_tau(self.tau)?;
        crate::agent::validate_learning_rate(self.lr)?;
        if !(self.act_range > 0.0 && self.act_range.is_finite()) {
            return Err(DdpgError::invalid_parameter(
                "act_range".to_string(),
                format!("must be positive and finite, got {}", self.act_range),
            ));
        }
        self.actor.validate()?;
        self.critic.validate()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: DdpgConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn validate_gamma(gamma: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&gamma) {
        return Err(DdpgError::invalid_parameter(
            "gamma".to_string(),
            format!("must lie in [0, 1], got {}", gamma),
        ));
    }
    Ok(())
}

/// Deep Deterministic Policy Gradient coordinator.
///
/// Owns an actor, a critic and a replay buffer, and sequences them: action
/// selection, experience storage, Bellman targets from the target networks, and
/// the train step that updates the critic, then the actor, then both targets.
///
/// The collaborators are generic so that any [`PolicyModel`], [`ValueModel`]
/// and [`ExperienceBuffer`] can be plugged in; the defaults are the dense
/// network [`Actor`], [`Critic`] and the FIFO [`ReplayBuffer`].
#[derive(Clone, Debug)]
pub struct DDPG<A = Actor, C = Critic, B = ReplayBuffer> {
    pub actor: A,
    pub critic: C,
    pub buffer: B,
    act_dim: usize,
    env_dim: usize,
    gamma: f32,
    train_steps: u64,
    last_critic_loss: Option<f32>,
}

#[derive(Serialize)]
struct CheckpointRef<'a> {
    actor: &'a Actor,
    critic: &'a Critic,
}

#[derive(Deserialize)]
struct Checkpoint {
    actor: Actor,
    critic: Critic,
}

impl DDPG {
    /// Agent with default hyperparameters (buffer 100000, gamma 0.99, lr 0.001,
    /// tau 0.001).
    pub fn new(act_dim: usize, env_dim: usize, act_range: f32) -> Result<Self> {
        Self::from_config(DdpgConfig::new(act_dim, env_dim, act_range))
    }

    pub fn from_config(config: DdpgConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let actor = Actor::with_options(
            config.env_dim,
            config.act_dim,
            config.act_range,
            config.lr,
            config.tau,
            &config.actor,
            &mut rng,
        )?;
        let critic = Critic::with_options(config.env_dim, config.act_dim, config.lr, config.tau, &config.critic, &mut rng)?;
        let buffer = match config.seed {
            Some(seed) => ReplayBuffer::with_seed(config.buffer_size, seed.wrapping_add(1))?,
            None => ReplayBuffer::new(config.buffer_size)?,
        };

        log::info!(
            "Created DDPG agent: env_dim={}, act_dim={}, gamma={}, tau={}, lr={}, buffer_size={}, actor_params={}, critic_params={}",
            config.env_dim,
            config.act_dim,
            config.gamma,
            config.tau,
            config.lr,
            config.buffer_size,
            actor.online.parameter_count(),
            critic.online.parameter_count()
        );

        Self::from_parts(config.act_dim, config.env_dim, config.gamma, actor, critic, buffer)
    }

    /// Write actor and critic (online and target networks) to one bincode file.
    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let checkpoint = CheckpointRef { actor: &self.actor, critic: &self.critic };
        fs::write(path.as_ref(), bincode::serialize(&checkpoint)?)?;
        log::info!("Saved DDPG weights to {:?}", path.as_ref());
        Ok(())
    }

    /// Replace actor and critic with the ones stored by [`DDPG::save_weights`].
    /// The stored dimensionalities must match this agent's.
    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let data = fs::read(path.as_ref())?;
        let checkpoint: Checkpoint = bincode::deserialize(&data)?;
        for (what, expected, actual) in [
            ("actor env_dim", self.env_dim, checkpoint.actor.env_dim()),
            ("actor act_dim", self.act_dim, checkpoint.actor.act_dim()),
            ("critic env_dim", self.env_dim, checkpoint.critic.env_dim()),
            ("critic act_dim", self.act_dim, checkpoint.critic.act_dim()),
        ] {
            if expected != actual {
                return Err(DdpgError::dimension_mismatch(
                    format!("{} {}", what, expected),
                    format!("{}", actual),
                ));
            }
        }
        ensure_network_finite("stored actor", &checkpoint.actor.online)?;
        ensure_network_finite("stored actor target", &checkpoint.actor.target)?;
        ensure_network_finite("stored critic", &checkpoint.critic.online)?;
        ensure_network_finite("stored critic target", &checkpoint.critic.target)?;
        self.actor = checkpoint.actor;
        self.critic = checkpoint.critic;
        log::info!("Loaded DDPG weights from {:?}", path.as_ref());
        Ok(())
    }
}

impl<A: PolicyModel, C: ValueModel, B: ExperienceBuffer> DDPG<A, C, B> {
    /// Assemble a coordinator from existing collaborators.
    pub fn from_parts(act_dim: usize, env_dim: usize, gamma: f32, actor: A, critic: C, buffer: B) -> Result<Self> {
        validate_dim("act_dim", act_dim)?;
        validate_dim("env_dim", env_dim)?;
        validate_gamma(gamma)?;
        for (what, expected, actual) in [
            ("actor env_dim", env_dim, actor.env_dim()),
            ("actor act_dim", act_dim, actor.act_dim()),
            ("critic env_dim", env_dim, critic.env_dim()),
            ("critic act_dim", act_dim, critic.act_dim()),
        ] {
            if expected != actual {
                return Err(DdpgError::dimension_mismatch(
                    format!("{} {}", what, expected),
                    format!("{}", actual),
                ));
            }
        }

        Ok(DDPG {
            actor,
            critic,
            buffer,
            act_dim,
            env_dim,
            gamma,
            train_steps: 0,
            last_critic_loss: None,
        })
    }

    pub fn act_dim(&self) -> usize {
        self.act_dim
    }

    pub fn env_dim(&self) -> usize {
        self.env_dim
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    /// Number of completed `train_and_update` calls.
    pub fn train_steps(&self) -> u64 {
        self.train_steps
    }

    /// Number of transitions currently stored.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Critic loss measured by the most recent train step.
    pub fn last_critic_loss(&self) -> Option<f32> {
        self.last_critic_loss
    }

    /// Action of the online policy for a single state. Exploration noise is
    /// the caller's business.
    pub fn get_action(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        if state.len() != self.env_dim {
            return Err(DdpgError::dimension_mismatch(
                format!("state of length {}", self.env_dim),
                format!("{}", state.len()),
            ));
        }
        let actions = self.actor.predict(state.insert_axis(Axis(0)))?;
        Ok(actions.index_axis_move(Axis(0), 0))
    }

    /// Q-values of the target critic, one per row of `(states, actions)`.
    pub fn target_critic_predict(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array1<f32>> {
        check_batch("states", states, None, self.env_dim)?;
        check_batch("actions", actions, Some(states.nrows()), self.act_dim)?;
        self.critic.target_predict(states, actions)
    }

    /// Actions of the target actor, one row per state.
    pub fn target_actor_predict(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_batch("states", states, None, self.env_dim)?;
        self.actor.target_predict(states)
    }

    /// Bellman targets `rewards[i] + gamma * q_values[i] * dones[i]`.
    ///
    /// `dones` is a continuation mask, not a termination flag: it must be `0.0`
    /// where the episode ended at transition `i` and `1.0` where it goes on.
    /// [`Batch::continuation_mask`] produces it from stored flags.
    pub fn bellman(
        &self,
        states: ArrayView2<f32>,
        rewards: ArrayView1<f32>,
        q_values: ArrayView1<f32>,
        dones: ArrayView1<f32>,
    ) -> Result<Array1<f32>> {
        let n = states.nrows();
        for (what, len) in [("rewards", rewards.len()), ("q_values", q_values.len()), ("dones", dones.len())] {
            if len != n {
                return Err(DdpgError::dimension_mismatch(
                    format!("{} {} (one per state)", n, what),
                    format!("{}", len),
                ));
            }
        }
        ensure_finite("rewards", &rewards)?;
        ensure_finite("q_values", &q_values)?;
        ensure_binary_mask("dones", &dones)?;

        let gamma = self.gamma;
        let targets = Zip::from(&rewards)
            .and(&q_values)
            .and(&dones)
            .map_collect(|&r, &q, &d| r + gamma * q * d);
        ensure_finite("critic targets", &targets)?;
        Ok(targets)
    }

    /// Store one transition in the replay buffer.
    ///
    /// Lengths are not checked here. A transition whose state or action length
    /// differs from `env_dim`/`act_dim` makes every batch that samples it fail
    /// with `DimensionMismatch` until it is evicted.
    pub fn memorize(
        &mut self,
        state: Array1<f32>,
        action: Array1<f32>,
        reward: f32,
        done: bool,
        next_state: Array1<f32>,
    ) {
        self.buffer.memorize(Transition::new(state, action, reward, done, next_state));
    }

    pub fn sample_batch(&mut self, batch_size: usize) -> Result<Batch> {
        self.buffer.sample_batch(batch_size)
    }

    /// One DDPG training step on a batch with precomputed critic targets.
    ///
    /// Order: critic regression, actor re-prediction of the batch's actions,
    /// dQ/da from the updated critic at those actions, actor ascent, then soft
    /// updates of both targets.
    pub fn train_and_update(
        &mut self,
        states: ArrayView2<f32>,
        actions: ArrayView2<f32>,
        critic_target: ArrayView1<f32>,
    ) -> Result<()> {
        self.train_step(states, actions, critic_target).map(|_| ())
    }

    /// Sample a batch, build its Bellman targets from the target networks and
    /// run [`DDPG::train_and_update`]. Returns the critic loss.
    pub fn update(&mut self, batch_size: usize) -> Result<f32> {
        let batch = self.sample_batch(batch_size)?;
        let next_actions = self.target_actor_predict(batch.next_states.view())?;
        let q_values = self.target_critic_predict(batch.next_states.view(), next_actions.view())?;
        let critic_target = self.bellman(
            batch.states.view(),
            batch.rewards.view(),
            q_values.view(),
            batch.continuation_mask().view(),
        )?;
        self.train_step(batch.states.view(), batch.actions.view(), critic_target.view())
    }

    fn train_step(
        &mut self,
        states: ArrayView2<f32>,
        actions: ArrayView2<f32>,
        critic_target: ArrayView1<f32>,
    ) -> Result<f32> {
        let n = states.nrows();
        if n == 0 {
            return Err(DdpgError::EmptyBatch("train_and_update needs at least one transition".to_string()));
        }
        check_batch("states", states, None, self.env_dim)?;
        check_batch("actions", actions, Some(n), self.act_dim)?;
        if critic_target.len() != n {
            return Err(DdpgError::dimension_mismatch(
                format!("{} critic targets", n),
                format!("{}", critic_target.len()),
            ));
        }
        ensure_finite("critic targets", &critic_target)?;

        let critic_loss = self.critic.train_on_batch(states, actions, critic_target)?;
        if !critic_loss.is_finite() {
            log::warn!("Critic loss became {} at step {}", critic_loss, self.train_steps);
            return Err(DdpgError::NumericalError(format!("critic loss is {}", critic_loss)));
        }

        let a_for_grad = self.actor.predict(states)?;
        let action_gradients = self.critic.gradients(states, a_for_grad.view())?;
        ensure_finite("critic action gradients", &action_gradients)?;
        self.actor.train(states, action_gradients.view())?;

        self.actor.transfer_weights()?;
        self.critic.transfer_weights()?;

        self.train_steps += 1;
        self.last_critic_loss = Some(critic_loss);
        log::debug!("DDPG step {}: batch={}, critic_loss={:.6}", self.train_steps, n, critic_loss);
        Ok(critic_loss)
    }
}

/// Builder for [`DDPG`]
pub struct DdpgBuilder {
    config: DdpgConfig,
}

impl DdpgBuilder {
    pub fn new(act_dim: usize, env_dim: usize) -> Self {
        DdpgBuilder {
            config: DdpgConfig::new(act_dim, env_dim, 1.0),
        }
    }

    pub fn action_range(mut self, act_range: f32) -> Self {
        self.config.act_range = act_range;
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size;
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.config.gamma = gamma;
        self
    }

    pub fn learning_rate(mut self, lr: f32) -> Self {
        self.config.lr = lr;
        self
    }

    pub fn tau(mut self, tau: f32) -> Self {
        self.config.tau = tau;
        self
    }

    /// Hidden layer widths of both actor and critic
    pub fn hidden_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.config.actor.hidden_sizes = sizes.clone();
        self.config.critic.hidden_sizes = sizes;
        self
    }

    /// Optimizer of both actor and critic
    pub fn optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.config.actor.optimizer = optimizer;
        self.config.critic.optimizer = optimizer;
        self
    }

    pub fn actor_options(mut self, options: NetworkOptions) -> Self {
        self.config.actor = options;
        self
    }

    pub fn critic_options(mut self, options: NetworkOptions) -> Self {
        self.config.critic = options;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &DdpgConfig {
        &self.config
    }

    pub fn build(self) -> Result<DDPG> {
        DDPG::from_config(self.config)
    }
}
