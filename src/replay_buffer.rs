use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use std::collections::VecDeque;

use crate::error::{DdpgError, Result};

/// One environment step: `(s, a, r, done, s')`.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: Array1<f32>,
    pub reward: f32,
    pub done: bool,
    pub next_state: Array1<f32>,
}

impl Transition {
    pub fn new(state: Array1<f32>, action: Array1<f32>, reward: f32, done: bool, next_state: Array1<f32>) -> Self {
        Transition { state, action, reward, done, next_state }
    }
}

/// A sampled minibatch laid out column-wise, one row per transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub states: Array2<f32>,
    pub actions: Array2<f32>,
    pub rewards: Array1<f32>,
    pub dones: Vec<bool>,
    pub next_states: Array2<f32>,
}

impl Batch {
    /// Stack transitions into a batch. All transitions must share state and
    /// action lengths.
    pub fn from_transitions(transitions: &[&Transition]) -> Result<Self> {
        let first = transitions
            .first()
            .ok_or_else(|| DdpgError::EmptyBatch("cannot build a batch from no transitions".to_string()))?;
        let state_dim = first.state.len();
        let action_dim = first.action.len();

        let mut states = Array2::zeros((transitions.len(), state_dim));
        let mut actions = Array2::zeros((transitions.len(), action_dim));
        let mut next_states = Array2::zeros((transitions.len(), state_dim));
        let mut rewards = Array1::zeros(transitions.len());
        let mut dones = Vec::with_capacity(transitions.len());

        for (i, t) in transitions.iter().enumerate() {
            if t.state.len() != state_dim || t.next_state.len() != state_dim || t.action.len() != action_dim {
                return Err(DdpgError::dimension_mismatch(
                    format!("state {}, action {}", state_dim, action_dim),
                    format!(
                        "state {}, next state {}, action {}",
                        t.state.len(),
                        t.next_state.len(),
                        t.action.len()
                    ),
                ));
            }
            states.row_mut(i).assign(&t.state);
            actions.row_mut(i).assign(&t.action);
            next_states.row_mut(i).assign(&t.next_state);
            rewards[i] = t.reward;
            dones.push(t.done);
        }

        Ok(Batch { states, actions, rewards, dones, next_states })
    }

    pub fn len(&self) -> usize {
        self.dones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dones.is_empty()
    }

    /// The numeric mask the Bellman backup multiplies by: `1.0` where the
    /// episode continues after the transition, `0.0` where it terminated.
    pub fn continuation_mask(&self) -> Array1<f32> {
        self.dones.iter().map(|&done| if done { 0.0 } else { 1.0 }).collect()
    }
}

/// Storage of past transitions with uniform sampling.
pub trait ExperienceBuffer {
    /// Store a transition, evicting the oldest one when full.
    fn memorize(&mut self, transition: Transition);

    /// Sample `batch_size` distinct stored transitions uniformly at random.
    fn sample_batch(&mut self, batch_size: usize) -> Result<Batch>;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed-capacity FIFO replay buffer.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// A buffer whose sampling sequence is reproducible.
    pub fn with_seed(capacity: usize, seed: u64) -> Result<Self> {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Result<Self> {
        if capacity == 0 {
            return Err(DdpgError::invalid_parameter("buffer_size", "capacity must be greater than 0"));
        }
        Ok(ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity.min(1 << 16)),
            capacity,
            rng,
        })
    }

    /// Iterate over stored transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}

impl ExperienceBuffer for ReplayBuffer {
    fn memorize(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    fn sample_batch(&mut self, batch_size: usize) -> Result<Batch> {
        if batch_size == 0 {
            return Err(DdpgError::invalid_parameter("batch_size", "must be greater than 0"));
        }
        if batch_size > self.buffer.len() {
            return Err(DdpgError::InsufficientData {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }

        let picked = index::sample(&mut self.rng, self.buffer.len(), batch_size)
            .into_iter()
            .map(|i| &self.buffer[i])
            .collect::<Vec<_>>();
        Batch::from_transitions(&picked)
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
