//! Errors reported by the tandem crates.
use thiserror::Error;

/// Errors raised while validating specifications, batches and records.
#[derive(Debug, Error)]
pub enum TandemError {
    /// The key was not found in a record.
    #[error("Key not found in the record: {0}")]
    RecordKeyError(String),

    /// A record value had a different type than requested.
    #[error("Record value type mismatch, expected {0}")]
    RecordValueTypeError(String),

    /// The algorithm declares support for no action kind at all.
    #[error("Model supports neither discrete nor continuous actions")]
    NoActionKind,

    /// An action kind was requested that the algorithm does not support.
    #[error("Model does not support {0} actions")]
    UnsupportedActionKind(&'static str),

    /// An optimizer is required but the configuration carries none.
    #[error("An optimizer is required for {0} models")]
    MissingOptimizer(&'static str),

    /// A declared input was not supplied.
    #[error("No value given for input '{0}'")]
    MissingInput(String),

    /// A supplied value does not match the declared shape.
    #[error("Shape mismatch for '{name}': expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Name of the input or parameter.
        name: String,
        /// Declared shape.
        expected: Vec<usize>,
        /// Supplied shape.
        got: Vec<usize>,
    },

    /// The number of internal state entries differs from the declaration.
    #[error("Expected {expected} internal state entries, got {got}")]
    InternalArityMismatch {
        /// Declared number of internal slots.
        expected: usize,
        /// Supplied number of entries.
        got: usize,
    },

    /// A batch field has a different number of rows than the batch itself.
    #[error("Batch field '{name}' has {got} rows, expected {expected}")]
    BatchLenMismatch {
        /// Name of the batch field.
        name: String,
        /// Expected number of rows.
        expected: usize,
        /// Supplied number of rows.
        got: usize,
    },

    /// A batch without any experience rows.
    #[error("Empty experience batch")]
    EmptyBatch,

    /// Two parameter registries cannot be paired positionally.
    #[error("Parameter registries cannot be paired: {0}")]
    RegistryMismatch(String),
}
