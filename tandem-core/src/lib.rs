#![warn(missing_docs)]
//! Core abstractions of the tandem reinforcement learning library.
//!
//! This crate is backend-agnostic: it defines what a model declares
//! ([`ModelSpec`]), what a model consumes ([`ExperienceBatch`]), the shared
//! counters advanced during training ([`TrainCounter`]) and the record
//! system through which models emit metrics ([`record`]).
pub mod error;
pub mod record;

mod counter;
pub use counter::TrainCounter;

mod spec;
pub use spec::{ActionSpec, InternalSpec, ModelSpec, StateSpec};

mod experience;
pub use experience::{Action, ExperienceBatch};
