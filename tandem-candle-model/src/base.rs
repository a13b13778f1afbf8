//! Base reinforcement learning model.
use crate::{
    algorithm::Algorithm,
    checkpoint::Checkpointer,
    config::ModelConfig,
    opt::Optimizer,
    registry::ParamRegistry,
    util,
};
use anyhow::{bail, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::{debug, info};
use ndarray::ArrayD;
use std::path::Path;
use tandem_core::{
    error::TandemError,
    record::{Record, RecordValue, Recorder},
    Action, ActionSpec, ExperienceBatch, ModelSpec,
};

/// Device-resident view of an [`ExperienceBatch`].
///
/// Rewards and terminals are `f32` vectors of the batch length; a terminal
/// row carries 1.0. Fields follow the declaration order of the model spec.
pub struct TensorBatch {
    /// Batched state tensor per declared state input.
    pub states: Vec<(String, Tensor)>,
    /// Batched action tensor per declared action output; discrete actions
    /// are `i64`, continuous actions `f32`.
    pub actions: Vec<(String, Tensor)>,
    /// Reward per row.
    pub rewards: Tensor,
    /// Terminal flag per row, 1.0 for terminal rows.
    pub terminals: Tensor,
    /// Batched internal state tensor per declared slot.
    pub internals: Vec<Tensor>,
    /// Batched successor states, if the batch carries them.
    pub next_states: Option<Vec<(String, Tensor)>>,
}

impl TensorBatch {
    /// Number of rows.
    pub fn len(&self) -> Result<usize> {
        Ok(self.rewards.dims1()?)
    }
}

/// Base reinforcement learning model: an [`Algorithm`] wrapped with the
/// generic lifecycle every algorithm shares.
///
/// The model owns an isolated `VarMap`; several models coexist in one
/// process without touching each other. A model built with an optimizer
/// minimizes its own loss in [`update`](ModelBase::update). A model built
/// without one never updates itself: that is the shape used for global
/// parameter holders, whose parameters are written by worker replicas, and
/// for the replicas' own models, whose optimizer lives with the replica.
pub struct ModelBase<A: Algorithm> {
    spec: ModelSpec,
    algorithm: A,
    device: Device,
    varmap: VarMap,
    params: ParamRegistry,
    optimizer: Option<Optimizer>,
    checkpointer: Checkpointer,
    recorder: Option<Box<dyn Recorder>>,
    summary_interval: u64,
    summary_level: u8,
    record_episode_rewards: bool,
    last_summary_step: Option<u64>,
    local_step: u64,
    internal_inits: Vec<Tensor>,
}

impl<A: Algorithm> ModelBase<A> {
    /// Builds a standalone model. The configuration must carry an
    /// optimizer.
    pub fn build(config: ModelConfig<A::Config>) -> Result<Self> {
        Self::build_inner(config, true)
    }

    /// Builds a model without an optimizer; its [`update`](ModelBase::update)
    /// is a no-op. Used by the distributed factory for global parameter
    /// holders and for the models inside worker replicas.
    pub fn build_without_optimizer(config: ModelConfig<A::Config>) -> Result<Self> {
        Self::build_inner(config.strip_optimizer(), false)
    }

    fn build_inner(config: ModelConfig<A::Config>, require_optimizer: bool) -> Result<Self> {
        if !A::SUPPORTS_DISCRETE && !A::SUPPORTS_CONTINUOUS {
            return Err(TandemError::NoActionKind.into());
        }
        config
            .spec
            .validate_action_support(A::SUPPORTS_DISCRETE, A::SUPPORTS_CONTINUOUS)?;

        let device: Device = config.device.into();
        let varmap = VarMap::new();
        let mut algorithm = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            A::build(vb, &config.spec, &config.algorithm, config.discount)?
        };
        let params = ParamRegistry::from_varmap(&varmap);
        algorithm.on_build(&params)?;

        let optimizer = match &config.opt_config {
            Some(opt_config) => Some(opt_config.build()),
            None if require_optimizer => {
                return Err(TandemError::MissingOptimizer("standalone").into())
            }
            None => None,
        };

        let internal_inits = config
            .spec
            .internals
            .iter()
            .map(|slot| Tensor::from_slice(&slot.init, slot.shape.as_slice(), &device))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            spec: config.spec,
            algorithm,
            device,
            varmap,
            params,
            optimizer,
            checkpointer: Checkpointer::new(1000),
            recorder: None,
            summary_interval: config.summary_interval,
            summary_level: config.summary_level,
            record_episode_rewards: config.record_episode_rewards,
            last_summary_step: None,
            local_step: 0,
            internal_inits,
        })
    }

    /// Declared inputs and outputs of the model.
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// The model's parameter registry.
    pub fn params(&self) -> &ParamRegistry {
        &self.params
    }

    /// The device variables live on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The wrapped algorithm.
    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// Number of action selections performed so far.
    pub fn local_step(&self) -> u64 {
        self.local_step
    }

    /// Attaches a recorder receiving periodic summaries.
    pub fn set_recorder(&mut self, recorder: Box<dyn Recorder>) {
        self.recorder = Some(recorder);
    }

    /// Initial internal state: one tensor per declared slot, holding the
    /// declared initial value.
    pub fn reset(&self) -> Vec<Tensor> {
        self.internal_inits.clone()
    }

    /// Selects an action for a single observation.
    ///
    /// `state` must supply every declared state input with its declared
    /// shape; `internals` must have exactly as many entries as declared
    /// internal slots. Inputs are fed as length-one batches and the batch
    /// dimension is stripped from the results. With `deterministic` set,
    /// the algorithm returns its mode action instead of sampling.
    pub fn action(
        &mut self,
        state: &[(String, ArrayD<f32>)],
        internals: &[Tensor],
        deterministic: bool,
    ) -> Result<(Vec<(String, Action)>, Vec<Tensor>)> {
        self.local_step += 1;

        if internals.len() != self.internal_inits.len() {
            return Err(TandemError::InternalArityMismatch {
                expected: self.internal_inits.len(),
                got: internals.len(),
            }
            .into());
        }

        let mut states = Vec::with_capacity(self.spec.states.len());
        for (name, state_spec) in &self.spec.states {
            let value = state
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .ok_or_else(|| TandemError::MissingInput(name.clone()))?;
            if value.shape() != state_spec.shape.as_slice() {
                return Err(TandemError::ShapeMismatch {
                    name: name.clone(),
                    expected: state_spec.shape.clone(),
                    got: value.shape().to_vec(),
                }
                .into());
            }
            states.push((
                name.clone(),
                util::arrayd_to_tensor::<f32, f32>(value, &self.device, true)?,
            ));
        }
        let internals = internals
            .iter()
            .map(|t| t.unsqueeze(0))
            .collect::<Result<Vec<_>, _>>()?;

        let (actions, new_internals) = self.algorithm.actions(&states, &internals, deterministic)?;

        let mut out = Vec::with_capacity(self.spec.actions.len());
        for (name, action_spec) in &self.spec.actions {
            let batched = actions
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, t)| t);
            let batched = match batched {
                Some(t) => t,
                None => bail!("algorithm returned no value for action '{}'", name),
            };
            let value = batched.get(0)?;
            let value = match action_spec {
                ActionSpec::Discrete { .. } => {
                    Action::Discrete(util::tensor_to_arrayd(&value.to_dtype(DType::I64)?)?)
                }
                ActionSpec::Continuous { .. } => {
                    Action::Continuous(util::tensor_to_arrayd(&value)?)
                }
            };
            out.push((name.clone(), value));
        }
        let new_internals = new_internals
            .iter()
            .map(|t| t.get(0))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((out, new_internals))
    }

    /// Moves an experience batch onto the device, bound to the model's
    /// declared inputs.
    pub fn feed(&self, batch: &ExperienceBatch) -> Result<TensorBatch> {
        batch.validate(&self.spec)?;
        let n = batch.len();

        let states = self.feed_states(&batch.states)?;
        let next_states = match &batch.next_states {
            Some(next) => Some(self.feed_states(next)?),
            None => None,
        };

        let mut actions = Vec::with_capacity(self.spec.actions.len());
        for (name, _) in &self.spec.actions {
            // validate() established presence and kind
            let value = batch
                .actions
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v);
            let value = match value {
                Some(v) => v,
                None => bail!("batch carries no value for action '{}'", name),
            };
            let tensor = match value {
                Action::Discrete(a) => util::arrayd_to_tensor::<i64, i64>(a, &self.device, false)?,
                Action::Continuous(a) => {
                    util::arrayd_to_tensor::<f32, f32>(a, &self.device, false)?
                }
            };
            actions.push((name.clone(), tensor));
        }

        let rewards = Tensor::from_slice(&batch.rewards, (n,), &self.device)?;
        let terminals = {
            let flags = batch
                .terminals
                .iter()
                .map(|t| if *t { 1f32 } else { 0f32 })
                .collect::<Vec<_>>();
            Tensor::from_slice(&flags, (n,), &self.device)?
        };
        let internals = batch
            .internals
            .iter()
            .map(|a| util::arrayd_to_tensor::<f32, f32>(a, &self.device, false))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TensorBatch {
            states,
            actions,
            rewards,
            terminals,
            internals,
            next_states,
        })
    }

    fn feed_states(&self, values: &[(String, ArrayD<f32>)]) -> Result<Vec<(String, Tensor)>> {
        self.spec
            .states
            .iter()
            .map(|(name, _)| {
                let value = values
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| TandemError::MissingInput(name.clone()))?;
                Ok((
                    name.clone(),
                    util::arrayd_to_tensor::<f32, f32>(value, &self.device, false)?,
                ))
            })
            .collect()
    }

    /// Performs one update step from a batch of experience.
    ///
    /// Returns the total loss and the per-instance losses, with the total
    /// equal to the mean of the per-instance values. Returns `None` when
    /// the model holds no optimizer.
    pub fn update(&mut self, batch: &ExperienceBatch) -> Result<Option<(f32, Vec<f32>)>> {
        if self.optimizer.is_none() {
            return Ok(None);
        }

        let feed = self.feed(batch)?;
        let per_instance = self.algorithm.loss_per_instance(&feed)?;
        let loss = per_instance.mean_all()?;

        if let Some(optimizer) = self.optimizer.as_mut() {
            optimizer.backward_step(&loss, &self.params)?;
        }
        self.run_update_hook()?;

        let loss = loss.to_scalar::<f32>()?;
        let per_instance: Vec<f32> = per_instance.to_vec1()?;
        self.write_update_summaries(loss, &per_instance)?;
        debug!("Computed update with loss = {}", loss);

        Ok(Some((loss, per_instance)))
    }

    /// Invokes the algorithm's per-update hook with the model's registry.
    pub fn run_update_hook(&mut self) -> Result<()> {
        self.algorithm.on_update(&self.params, self.local_step)
    }

    /// Returns `true` if a recorder is attached and enough action
    /// selections have passed since the last summary write.
    pub fn summaries_due(&self) -> bool {
        match (&self.recorder, self.last_summary_step) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(last)) => self.local_step > last + self.summary_interval,
        }
    }

    /// Writes the periodic training summaries if they are due: the total
    /// loss, the per-instance losses, and at summary level 2 and above the
    /// per-parameter statistics.
    pub fn write_update_summaries(&mut self, loss: f32, per_instance: &[f32]) -> Result<()> {
        if !self.summaries_due() {
            return Ok(());
        }

        let mut record = Record::from_scalar("loss/total", loss);
        record.insert(
            "loss/per_instance",
            RecordValue::Array1(per_instance.to_vec()),
        );
        if self.summary_level >= 2 {
            record.merge_inplace(util::param_stats(&self.params)?);
        }

        let step = self.local_step;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.write(step, record);
        }
        self.last_summary_step = Some(step);
        Ok(())
    }

    /// Writes a single episode reward value, tagged with the current step,
    /// if a recorder is attached and per-episode recording is enabled.
    pub fn write_episode_reward_summary(&mut self, episode_reward: f32) {
        if !self.record_episode_rewards {
            return;
        }
        let step = self.local_step;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.write(step, Record::from_scalar("episode_reward", episode_reward));
        }
    }

    /// Saves the model parameters.
    ///
    /// With `use_global_step` set, the current step is appended to the file
    /// name so successive saves do not overwrite each other; otherwise the
    /// exact path is written, which allows resuming from a fixed location.
    pub fn save<T: AsRef<Path>>(&mut self, path: T, use_global_step: bool) -> Result<()> {
        let step = if use_global_step {
            Some(self.local_step)
        } else {
            None
        };
        self.checkpointer.save(&self.varmap, path.as_ref(), step)?;
        Ok(())
    }

    /// Restores the model parameters from a checkpoint written by
    /// [`save`](ModelBase::save). Shape compatibility is the caller's
    /// responsibility.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(path.as_ref())?;
        info!("Loaded model parameters from {:?}", path.as_ref());
        Ok(())
    }
}
