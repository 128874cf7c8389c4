use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::Result;

/// A deterministic policy with an online and a slowly tracking target copy.
///
/// States and actions are passed as batches, one row per sample.
pub trait PolicyModel {
    fn env_dim(&self) -> usize;

    fn act_dim(&self) -> usize;

    /// Actions proposed by the online parameters.
    fn predict(&self, states: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Actions proposed by the target parameters.
    fn target_predict(&self, states: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// One policy-gradient step on the online parameters. `action_gradients`
    /// holds dQ/da per sample and is followed uphill.
    fn train(&mut self, states: ArrayView2<f32>, action_gradients: ArrayView2<f32>) -> Result<()>;

    /// Soft-update the target parameters toward the online ones.
    fn transfer_weights(&mut self) -> Result<()>;
}

/// An action-value function Q(s, a) with an online and a target copy.
pub trait ValueModel {
    fn env_dim(&self) -> usize;

    fn act_dim(&self) -> usize;

    /// Online estimates, one per row.
    fn predict(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array1<f32>>;

    /// Target estimates, one per row.
    fn target_predict(&self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array1<f32>>;

    /// Regress the online estimate for `(states, actions)` toward
    /// `critic_targets`. Returns the loss before the update.
    fn train_on_batch(
        &mut self,
        states: ArrayView2<f32>,
        actions: ArrayView2<f32>,
        critic_targets: ArrayView1<f32>,
    ) -> Result<f32>;

    /// dQ/da of the online estimate at `(states, actions)`, one row per sample.
    fn gradients(&mut self, states: ArrayView2<f32>, actions: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Soft-update the target parameters toward the online ones.
    fn transfer_weights(&mut self) -> Result<()>;
}
