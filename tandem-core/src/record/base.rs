//! Key-value records of training metrics.
use crate::error::TandemError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{Iter, Keys},
    HashMap,
};

/// A value stored in a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// A single floating-point value, typically a loss or a reward.
    Scalar(f32),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array, rendered as a histogram by sinks that can.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// A container of named metric values emitted in one step.
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair, replacing an existing entry.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns the value stored under `k`, if any.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Iterates over the keys of the record.
    pub fn keys(&self) -> Keys<'_, String, RecordValue> {
        self.0.keys()
    }

    /// Iterates over the key-value pairs of the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Moves all entries of `record` into this record, overwriting
    /// duplicate keys.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    /// Returns `true` if the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the scalar stored under `k`.
    pub fn get_scalar(&self, k: &str) -> Result<f32, TandemError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(TandemError::RecordValueTypeError("Scalar".to_string())),
            None => Err(TandemError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the 1-dimensional array stored under `k`.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, TandemError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(TandemError::RecordValueTypeError("Array1".to_string())),
            None => Err(TandemError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the string stored under `k`.
    pub fn get_string(&self, k: &str) -> Result<String, TandemError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(TandemError::RecordValueTypeError("String".to_string())),
            None => Err(TandemError::RecordKeyError(k.to_string())),
        }
    }
}
