//! Tandem: asynchronous parameter-server training scaffolding for
//! reinforcement learning models.
//!
//! This umbrella crate re-exports the pieces of the workspace:
//!
//! * [`tandem_core`] - model declarations, experience batches, counters and
//!   the record system;
//! * [`tandem_candle_model`] - the candle-backed model base and the
//!   algorithms plugged into it;
//! * [`tandem_param_server`] - the global parameter holder and worker
//!   replicas of distributed training;
//! * [`tandem_tensorboard`] - the tensorboard record sink.
pub use tandem_core::{
    record, Action, ActionSpec, ExperienceBatch, InternalSpec, ModelSpec, StateSpec,
    TrainCounter,
};

pub use tandem_candle_model::{
    mlp::{Mlp, MlpConfig},
    q::{QAlgorithm, QConfig},
    Algorithm, Checkpointer, Device, ModelBase, ModelConfig, Optimizer, OptimizerConfig,
    ParamRegistry, SubNet, TensorBatch,
};

pub use tandem_param_server::{build_pair, GlobalModel, WorkerReplica};

pub use tandem_tensorboard::TensorboardRecorder;
