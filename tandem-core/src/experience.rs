//! Batches of experience consumed by the update step.
use crate::{error::TandemError, spec::ActionSpec, spec::ModelSpec};
use ndarray::ArrayD;

/// An action value, either a single step's or a batch of them.
#[derive(Clone, Debug)]
pub enum Action {
    /// Integer choices for a discrete action.
    Discrete(ArrayD<i64>),
    /// Real values for a continuous action.
    Continuous(ArrayD<f32>),
}

impl Action {
    /// Returns the integer array of a discrete action.
    pub fn as_discrete(&self) -> Option<&ArrayD<i64>> {
        match self {
            Self::Discrete(a) => Some(a),
            Self::Continuous(_) => None,
        }
    }

    /// Returns the float array of a continuous action.
    pub fn as_continuous(&self) -> Option<&ArrayD<f32>> {
        match self {
            Self::Discrete(_) => None,
            Self::Continuous(a) => Some(a),
        }
    }

    fn shape(&self) -> &[usize] {
        match self {
            Self::Discrete(a) => a.shape(),
            Self::Continuous(a) => a.shape(),
        }
    }
}

/// A batch of experience rows.
///
/// Every array carries the batch dimension first; all fields must agree on
/// the number of rows. `next_states` is optional: when absent, consumers
/// that need successor states treat the rows as a temporally consistent
/// sequence.
#[derive(Clone, Debug)]
pub struct ExperienceBatch {
    /// Batched state values per declared state input.
    pub states: Vec<(String, ArrayD<f32>)>,
    /// Batched action values per declared action output.
    pub actions: Vec<(String, Action)>,
    /// One reward per row.
    pub rewards: Vec<f32>,
    /// One terminal flag per row.
    pub terminals: Vec<bool>,
    /// Batched internal state values per declared slot.
    pub internals: Vec<ArrayD<f32>>,
    /// Batched successor states per declared state input, if recorded.
    pub next_states: Option<Vec<(String, ArrayD<f32>)>>,
}

impl ExperienceBatch {
    /// Number of experience rows.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Number of rows flagged as terminal.
    pub fn terminal_count(&self) -> usize {
        self.terminals.iter().filter(|t| **t).count()
    }

    /// Validates the batch against a model declaration: row counts agree,
    /// every declared state and action is present with the declared shape,
    /// and the internal slots match in arity and shape.
    pub fn validate(&self, spec: &ModelSpec) -> Result<(), TandemError> {
        let n = self.len();
        if n == 0 {
            return Err(TandemError::EmptyBatch);
        }
        if self.terminals.len() != n {
            return Err(TandemError::BatchLenMismatch {
                name: "terminals".into(),
                expected: n,
                got: self.terminals.len(),
            });
        }

        for (name, state) in &spec.states {
            Self::check_batched(name, &state.shape, n, Self::lookup_state(&self.states, name)?)?;
            if let Some(next_states) = &self.next_states {
                Self::check_batched(name, &state.shape, n, Self::lookup_state(next_states, name)?)?;
            }
        }

        for (name, action) in &spec.actions {
            let value = self
                .actions
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .ok_or_else(|| TandemError::MissingInput(name.clone()))?;
            match (action, value) {
                (ActionSpec::Discrete { .. }, Action::Continuous(_)) => {
                    return Err(TandemError::UnsupportedActionKind("continuous"))
                }
                (ActionSpec::Continuous { .. }, Action::Discrete(_)) => {
                    return Err(TandemError::UnsupportedActionKind("discrete"))
                }
                _ => {}
            }
            Self::check_batched(name, action.shape(), n, value.shape())?;
        }

        if self.internals.len() != spec.internals.len() {
            return Err(TandemError::InternalArityMismatch {
                expected: spec.internals.len(),
                got: self.internals.len(),
            });
        }
        for (i, (slot, value)) in spec.internals.iter().zip(self.internals.iter()).enumerate() {
            Self::check_batched(&format!("internal[{}]", i), &slot.shape, n, value.shape())?;
        }

        Ok(())
    }

    fn lookup_state<'a>(
        states: &'a [(String, ArrayD<f32>)],
        name: &str,
    ) -> Result<&'a [usize], TandemError> {
        states
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.shape())
            .ok_or_else(|| TandemError::MissingInput(name.to_string()))
    }

    fn check_batched(
        name: &str,
        declared: &[usize],
        n: usize,
        got: &[usize],
    ) -> Result<(), TandemError> {
        let mut expected = Vec::with_capacity(declared.len() + 1);
        expected.push(n);
        expected.extend_from_slice(declared);
        if got != expected.as_slice() {
            return Err(TandemError::ShapeMismatch {
                name: name.to_string(),
                expected,
                got: got.to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn spec() -> ModelSpec {
        ModelSpec::new()
            .state("obs", vec![2])
            .discrete_action("act", vec![1], 3)
    }

    fn batch(n: usize) -> ExperienceBatch {
        ExperienceBatch {
            states: vec![(
                "obs".into(),
                ArrayD::zeros(IxDyn(&[n, 2])),
            )],
            actions: vec![(
                "act".into(),
                Action::Discrete(ArrayD::zeros(IxDyn(&[n, 1]))),
            )],
            rewards: vec![0.0; n],
            terminals: vec![false; n],
            internals: vec![],
            next_states: None,
        }
    }

    #[test]
    fn test_valid_batch() {
        assert!(batch(4).validate(&spec()).is_ok());
        assert_eq!(batch(4).len(), 4);
    }

    #[test]
    fn test_terminal_count() {
        let mut b = batch(4);
        b.terminals = vec![true, false, true, false];
        assert_eq!(b.terminal_count(), 2);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut b = batch(4);
        b.states[0].1 = ArrayD::zeros(IxDyn(&[4, 3]));
        assert!(matches!(
            b.validate(&spec()),
            Err(TandemError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_state() {
        let mut b = batch(2);
        b.states.clear();
        assert!(matches!(
            b.validate(&spec()),
            Err(TandemError::MissingInput(_))
        ));
    }

    #[test]
    fn test_empty_batch() {
        assert!(matches!(
            batch(0).validate(&spec()),
            Err(TandemError::EmptyBatch)
        ));
    }
}
