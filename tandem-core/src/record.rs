//! Records of training metrics and the sinks they are written to.
//!
//! Models collect scalar and array metrics into a [`Record`] and hand it to
//! a [`Recorder`] together with the step it belongs to. Sinks decide what to
//! do with it: discard it ([`NullRecorder`]), keep it in memory
//! ([`BufferedRecorder`]) or persist it (e.g. the tensorboard sink crate).
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
