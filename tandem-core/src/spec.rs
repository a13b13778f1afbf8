//! Declarations of model inputs and outputs.
//!
//! A [`ModelSpec`] fixes the named state inputs, the named action outputs
//! and the recurrent internal slots of a model. Declaration order matters:
//! it determines feed order and the arity of the internal state threaded
//! through successive action requests.
use crate::error::TandemError;
use serde::{Deserialize, Serialize};

/// A named state input of a model.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StateSpec {
    /// Shape of a single (unbatched) observation.
    pub shape: Vec<usize>,
}

impl StateSpec {
    /// Creates a state declaration with the given shape.
    pub fn new(shape: Vec<usize>) -> Self {
        Self { shape }
    }
}

/// A named action output of a model.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub enum ActionSpec {
    /// An integer-valued action drawn from `0..num_actions`.
    Discrete {
        /// Shape of a single (unbatched) action value.
        shape: Vec<usize>,
        /// Number of admissible choices per entry.
        num_actions: i64,
    },

    /// A real-valued action bounded to `[min, max]`.
    Continuous {
        /// Shape of a single (unbatched) action value.
        shape: Vec<usize>,
        /// Lower bound of each entry.
        min: f32,
        /// Upper bound of each entry.
        max: f32,
    },
}

impl ActionSpec {
    /// Shape of a single action value.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Discrete { shape, .. } => shape,
            Self::Continuous { shape, .. } => shape,
        }
    }

    /// Returns `true` for discrete actions.
    pub fn is_discrete(&self) -> bool {
        matches!(self, Self::Discrete { .. })
    }
}

/// A recurrent internal slot of a model.
///
/// The initial value is carried as data so that `reset()` can hand it back
/// to the caller without touching the numerical backend.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct InternalSpec {
    /// Shape of the slot value.
    pub shape: Vec<usize>,
    /// Initial value, flattened in row-major order.
    pub init: Vec<f32>,
}

impl InternalSpec {
    /// Creates an internal slot initialized to zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let numel = shape.iter().product();
        Self {
            shape,
            init: vec![0.0; numel],
        }
    }

    /// Creates an internal slot with an explicit initial value.
    pub fn new(shape: Vec<usize>, init: Vec<f32>) -> Self {
        Self { shape, init }
    }
}

/// Ordered declaration of the inputs and outputs of a model.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ModelSpec {
    /// Named state inputs, in declaration order.
    pub states: Vec<(String, StateSpec)>,
    /// Named action outputs, in declaration order.
    pub actions: Vec<(String, ActionSpec)>,
    /// Recurrent internal slots, in declaration order.
    pub internals: Vec<InternalSpec>,
}

impl ModelSpec {
    /// Creates an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named state input.
    pub fn state(mut self, name: impl Into<String>, shape: Vec<usize>) -> Self {
        self.states.push((name.into(), StateSpec::new(shape)));
        self
    }

    /// Adds a named discrete action output.
    pub fn discrete_action(
        mut self,
        name: impl Into<String>,
        shape: Vec<usize>,
        num_actions: i64,
    ) -> Self {
        self.actions
            .push((name.into(), ActionSpec::Discrete { shape, num_actions }));
        self
    }

    /// Adds a named continuous action output.
    pub fn continuous_action(
        mut self,
        name: impl Into<String>,
        shape: Vec<usize>,
        min: f32,
        max: f32,
    ) -> Self {
        self.actions
            .push((name.into(), ActionSpec::Continuous { shape, min, max }));
        self
    }

    /// Adds a recurrent internal slot.
    pub fn internal(mut self, spec: InternalSpec) -> Self {
        self.internals.push(spec);
        self
    }

    /// Looks up a state declaration by name.
    pub fn state_spec(&self, name: &str) -> Option<&StateSpec> {
        self.states
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    /// Checks every declared action against the action kinds a model
    /// supports. Fails fast at construction rather than at the first
    /// forward pass.
    pub fn validate_action_support(
        &self,
        discrete: bool,
        continuous: bool,
    ) -> Result<(), TandemError> {
        for (_, action) in &self.actions {
            if action.is_discrete() && !discrete {
                return Err(TandemError::UnsupportedActionKind("discrete"));
            }
            if !action.is_discrete() && !continuous {
                return Err(TandemError::UnsupportedActionKind("continuous"));
            }
        }
        Ok(())
    }
}
