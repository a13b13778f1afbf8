//! The global parameter holder.
use crate::worker::WorkerReplica;
use anyhow::Result;
use log::info;
use std::{path::Path, sync::Arc};
use tandem_candle_model::{Algorithm, ModelBase, ModelConfig};
use tandem_core::{error::TandemError, TrainCounter};

/// The single instance owning the canonical parameters in distributed
/// training, together with the shared timestep/episode counters.
///
/// The global model never optimizes anything itself: it is built with the
/// optimizer stripped from the worker configuration, and its parameters are
/// written exclusively by the replicas' gradient pushes. It remains a full
/// model, so it can be checkpointed and can act for evaluation.
pub struct GlobalModel<A: Algorithm> {
    model: ModelBase<A>,
    counter: Arc<TrainCounter>,
}

impl<A: Algorithm> GlobalModel<A> {
    /// Builds the global parameter holder. The optimizer, if any, is
    /// removed from the configuration.
    pub fn build(config: ModelConfig<A::Config>) -> Result<Self> {
        let model = ModelBase::build_without_optimizer(config)?;
        info!(
            "Built global parameter holder with {} parameters",
            model.params().len()
        );
        Ok(Self {
            model,
            counter: Arc::new(TrainCounter::new()),
        })
    }

    /// Builds a worker replica attached to this global model.
    ///
    /// The configuration must carry an optimizer; the replica owns it and
    /// applies it to the global parameters. The replica's parameters start
    /// as a copy of the current global values, which also validates that
    /// both registries pair positionally.
    pub fn replica(&self, config: ModelConfig<A::Config>) -> Result<WorkerReplica<A>> {
        let opt_config = config
            .opt_config
            .clone()
            .ok_or(TandemError::MissingOptimizer("worker"))?;
        let model = ModelBase::build_without_optimizer(config)?;
        model.params().copy_from(self.model.params())?;

        Ok(WorkerReplica::new(
            model,
            opt_config.build(),
            self.model.params().clone(),
            self.counter.clone(),
        ))
    }

    /// The shared training counters.
    pub fn counter(&self) -> &Arc<TrainCounter> {
        &self.counter
    }

    /// Current global timestep count.
    pub fn timestep(&self) -> u64 {
        self.counter.timestep()
    }

    /// Current global episode count.
    pub fn episode(&self) -> u64 {
        self.counter.episode()
    }

    /// The wrapped model.
    pub fn model(&self) -> &ModelBase<A> {
        &self.model
    }

    /// The wrapped model, mutably.
    pub fn model_mut(&mut self) -> &mut ModelBase<A> {
        &mut self.model
    }

    /// Saves the global parameters; see
    /// [`ModelBase::save`](tandem_candle_model::ModelBase::save).
    pub fn save<T: AsRef<Path>>(&mut self, path: T, use_global_step: bool) -> Result<()> {
        self.model.save(path, use_global_step)
    }

    /// Restores the global parameters from a checkpoint.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.model.load(path)
    }
}
