//! The seam between the generic model scaffolding and a concrete
//! reinforcement learning algorithm.
use crate::{base::TensorBatch, registry::ParamRegistry};
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::VarBuilder;
use serde::{de::DeserializeOwned, Serialize};
use tandem_core::ModelSpec;

/// A reinforcement learning algorithm plugged into
/// [`ModelBase`](crate::ModelBase).
///
/// Implementations define the networks, the action selection and the loss;
/// the model base wraps them with the shared lifecycle: parameter
/// bookkeeping, optimization, synchronization, checkpointing and summary
/// emission.
pub trait Algorithm: Sized + Send {
    /// Algorithm-specific configuration.
    type Config: Clone + DeserializeOwned + Serialize;

    /// Whether the algorithm can emit discrete actions.
    const SUPPORTS_DISCRETE: bool;

    /// Whether the algorithm can emit continuous actions.
    const SUPPORTS_CONTINUOUS: bool;

    /// Builds the algorithm's networks, creating every trainable variable
    /// through `vb` so the model base can collect them into its registry.
    fn build(
        vb: VarBuilder,
        spec: &ModelSpec,
        config: &Self::Config,
        discount: f64,
    ) -> Result<Self>;

    /// One forward pass over a batch of states.
    ///
    /// `states` holds one batched tensor per declared state input, in
    /// declaration order; `internals` one batched tensor per declared
    /// internal slot. Returns the selected actions by name and the updated
    /// internal state, both batched. With `deterministic` set, the mode
    /// action must be returned instead of a sample.
    fn actions(
        &mut self,
        states: &[(String, Tensor)],
        internals: &[Tensor],
        deterministic: bool,
    ) -> Result<(Vec<(String, Tensor)>, Vec<Tensor>)>;

    /// Per-instance loss over a batch of experience.
    fn loss_per_instance(&self, batch: &TensorBatch) -> Result<Tensor>;

    /// Hook invoked once after construction, with the freshly collected
    /// parameter registry. Algorithms align derived parameters here, e.g.
    /// copying the online network into a target network.
    #[allow(unused_variables)]
    fn on_build(&mut self, params: &ParamRegistry) -> Result<()> {
        Ok(())
    }

    /// Hook invoked with the model's parameter registry after every
    /// completed update step. Algorithms maintaining derived parameters
    /// (e.g. a periodically tracked target network) do so here.
    #[allow(unused_variables)]
    fn on_update(&mut self, params: &ParamRegistry, local_step: u64) -> Result<()> {
        Ok(())
    }
}
