//! Model base implemented with [candle](https://crates.io/crates/candle-core).
//!
//! [`ModelBase`] wraps an [`Algorithm`] with the generic scaffolding every
//! reinforcement learning model shares: input/output declarations, parameter
//! bookkeeping, optimization, checkpointing and summary emission. The
//! distributed half (global parameter holder and worker replicas) lives in
//! the `tandem-param-server` crate and is built from the same pieces.
pub mod mlp;
pub mod q;
pub mod util;

mod algorithm;
pub use algorithm::Algorithm;

mod base;
pub use base::{ModelBase, TensorBatch};

mod checkpoint;
pub use checkpoint::Checkpointer;

mod config;
pub use config::{Device, ModelConfig};

mod model;
pub use model::SubNet;

mod opt;
pub use opt::{Optimizer, OptimizerConfig};

mod registry;
pub use registry::ParamRegistry;
