//! Worker replicas.
use anyhow::Result;
use candle_core::Tensor;
use log::debug;
use ndarray::ArrayD;
use std::{path::Path, sync::Arc};
use tandem_candle_model::{Algorithm, ModelBase, Optimizer, ParamRegistry};
use tandem_core::{record::Recorder, Action, ExperienceBatch, TrainCounter};

/// A worker replica: its own parameter copy, its own optimizer, and shared
/// access to the global parameters and counters.
///
/// A replica is `Send` and is meant to be moved onto its own thread. It
/// drives its `action`/`update` cycle sequentially; concurrency exists only
/// across replicas, which share nothing but the global registry and the
/// counters.
pub struct WorkerReplica<A: Algorithm> {
    model: ModelBase<A>,
    optimizer: Optimizer,
    global_params: ParamRegistry,
    counter: Arc<TrainCounter>,
}

impl<A: Algorithm> WorkerReplica<A> {
    pub(crate) fn new(
        model: ModelBase<A>,
        optimizer: Optimizer,
        global_params: ParamRegistry,
        counter: Arc<TrainCounter>,
    ) -> Self {
        Self {
            model,
            optimizer,
            global_params,
            counter,
        }
    }

    /// Selects an action using the replica's own parameters; see
    /// [`ModelBase::action`].
    pub fn action(
        &mut self,
        state: &[(String, ArrayD<f32>)],
        internals: &[Tensor],
        deterministic: bool,
    ) -> Result<(Vec<(String, Action)>, Vec<Tensor>)> {
        self.model.action(state, internals, deterministic)
    }

    /// Initial internal state; see [`ModelBase::reset`].
    pub fn reset(&self) -> Vec<Tensor> {
        self.model.reset()
    }

    /// Performs one asynchronous update step from a batch of experience.
    ///
    /// In order: gradients of the replica's loss are computed against the
    /// replica's own (possibly stale) parameters; the optimizer applies
    /// them to the positionally paired global parameters; the replica's
    /// parameters are overwritten with the current global values; the
    /// global timestep counter advances by the batch length and the episode
    /// counter by its terminal count.
    ///
    /// The pull is ordered after this replica's own push: the backend
    /// executes eagerly on the calling thread, so that order is program
    /// order. Nothing orders the step against other replicas: between push
    /// and pull another replica may have pushed too, and the pulled values
    /// may be further advanced than this replica's own contribution. No
    /// lock is taken anywhere; each parameter write is atomic at the
    /// storage level and last-write-wins.
    ///
    /// Returns the total loss and the per-instance losses.
    pub fn update(&mut self, batch: &ExperienceBatch) -> Result<(f32, Vec<f32>)> {
        let feed = self.model.feed(batch)?;
        let per_instance = self.model.algorithm().loss_per_instance(&feed)?;
        let loss = per_instance.mean_all()?;

        let grads = self
            .optimizer
            .compute_gradients(&loss, self.model.params())?;
        let pairs = self.model.params().pair_grads(grads, &self.global_params)?;
        self.optimizer.apply_gradients(&pairs)?;
        self.model.params().copy_from(&self.global_params)?;
        self.counter
            .advance(batch.len() as u64, batch.terminal_count() as u64);

        self.model.run_update_hook()?;

        let loss = loss.to_scalar::<f32>()?;
        let per_instance: Vec<f32> = per_instance.to_vec1()?;
        self.model.write_update_summaries(loss, &per_instance)?;
        debug!("Computed update with loss = {}", loss);

        Ok((loss, per_instance))
    }

    /// The replica's model.
    pub fn model(&self) -> &ModelBase<A> {
        &self.model
    }

    /// The shared training counters.
    pub fn counter(&self) -> &Arc<TrainCounter> {
        &self.counter
    }

    /// Current global timestep count, as seen by this replica.
    pub fn timestep(&self) -> u64 {
        self.counter.timestep()
    }

    /// Current global episode count, as seen by this replica.
    pub fn episode(&self) -> u64 {
        self.counter.episode()
    }

    /// Attaches a recorder receiving this replica's periodic summaries.
    pub fn set_recorder(&mut self, recorder: Box<dyn Recorder>) {
        self.model.set_recorder(recorder);
    }

    /// Writes a single episode reward value; see
    /// [`ModelBase::write_episode_reward_summary`].
    pub fn write_episode_reward_summary(&mut self, episode_reward: f32) {
        self.model.write_episode_reward_summary(episode_reward);
    }

    /// Saves the replica's parameters; see [`ModelBase::save`].
    pub fn save<T: AsRef<Path>>(&mut self, path: T, use_global_step: bool) -> Result<()> {
        self.model.save(path, use_global_step)
    }

    /// Restores the replica's parameters from a checkpoint.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.model.load(path)
    }
}
