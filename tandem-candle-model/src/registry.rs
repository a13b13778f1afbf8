//! Ordered registry of trainable parameters.
use anyhow::Result;
use candle_core::{Tensor, Var};
use candle_nn::VarMap;
use tandem_core::error::TandemError;

/// The ordered set of trainable parameters of one model instance.
///
/// Entries are ordered by variable name (the `VarMap` path). Two instances
/// built from the same algorithm produce the same name set, so positions
/// line up between a worker's registry and the global one; pairing methods
/// still validate length and per-slot shapes and refuse to pair registries
/// that diverged.
///
/// A `Var` is a handle onto shared storage: cloning a registry clones the
/// handles, not the values. A worker replica therefore reaches the global
/// parameters through a plain clone of the global registry, and every
/// `Var::set` is visible to all holders. Writes to a single parameter are
/// atomic at the storage level (the backend takes a write lock per op);
/// no ordering across parameters is guaranteed or required here.
#[derive(Clone)]
pub struct ParamRegistry {
    entries: Vec<(String, Var)>,
}

impl ParamRegistry {
    /// Collects all variables of `varmap`, ordered by name.
    pub fn from_varmap(varmap: &VarMap) -> Self {
        let data = varmap.data().lock().unwrap();
        let mut entries: Vec<_> = data
            .iter()
            .map(|(name, var)| (name.clone(), var.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the registry holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates name/variable pairs in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, Var)> {
        self.entries.iter()
    }

    /// Sub-registry of the entries whose name starts with `prefix`,
    /// preserving order.
    pub fn filter_prefix(&self, prefix: &str) -> ParamRegistry {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(name, _)| name.starts_with(prefix))
                .cloned()
                .collect(),
        }
    }

    fn check_paired(&self, other: &ParamRegistry) -> Result<(), TandemError> {
        if self.len() != other.len() {
            return Err(TandemError::RegistryMismatch(format!(
                "{} vs {} parameters",
                self.len(),
                other.len()
            )));
        }
        for ((name, var), (other_name, other_var)) in
            self.entries.iter().zip(other.entries.iter())
        {
            if var.dims() != other_var.dims() {
                return Err(TandemError::ShapeMismatch {
                    name: format!("{} / {}", name, other_name),
                    expected: var.dims().to_vec(),
                    got: other_var.dims().to_vec(),
                });
            }
        }
        Ok(())
    }

    /// Pairs per-slot gradients with the parameters of `other`, by position.
    ///
    /// `grads` must contain one gradient per slot of this registry, in
    /// registry order; shapes are validated against both registries.
    pub fn pair_grads<'a>(
        &self,
        grads: Vec<Tensor>,
        other: &'a ParamRegistry,
    ) -> Result<Vec<(Tensor, &'a Var)>, TandemError> {
        self.check_paired(other)?;
        if grads.len() != self.len() {
            return Err(TandemError::RegistryMismatch(format!(
                "{} gradients for {} parameters",
                grads.len(),
                self.len()
            )));
        }
        let mut pairs = Vec::with_capacity(grads.len());
        for (grad, (name, var)) in grads.into_iter().zip(other.entries.iter()) {
            if grad.dims() != var.dims() {
                return Err(TandemError::ShapeMismatch {
                    name: name.clone(),
                    expected: var.dims().to_vec(),
                    got: grad.dims().to_vec(),
                });
            }
            pairs.push((grad, var));
        }
        Ok(pairs)
    }

    /// Overwrites every parameter with the value of the positionally paired
    /// parameter of `other`.
    pub fn copy_from(&self, other: &ParamRegistry) -> Result<()> {
        self.check_paired(other)?;
        for ((_, dst), (_, src)) in self.entries.iter().zip(other.entries.iter()) {
            dst.set(src.as_tensor())?;
        }
        Ok(())
    }

    /// Moves every parameter towards the paired parameter of `other`:
    /// `dst = weight * src + (1 - weight) * dst`. A weight of 1.0 is a
    /// hard copy.
    pub fn track_from(&self, other: &ParamRegistry, weight: f64) -> Result<()> {
        self.check_paired(other)?;
        for ((_, dst), (_, src)) in self.entries.iter().zip(other.entries.iter()) {
            let blended =
                ((weight * src.as_tensor())? + ((1.0 - weight) * dst.as_tensor())?)?;
            dst.set(&blended)?;
        }
        Ok(())
    }

    /// Flattened values of every parameter, in registry order. Intended for
    /// tests and diagnostics.
    pub fn flat_values(&self) -> Result<Vec<Vec<f32>>> {
        self.entries
            .iter()
            .map(|(_, var)| Ok(var.as_tensor().flatten_all()?.to_vec1()?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ParamRegistry;
    use candle_core::{DType, Device, Tensor};
    use candle_nn::{Init, VarMap};

    fn varmap_with(names: &[(&str, &[usize])]) -> VarMap {
        let varmap = VarMap::new();
        for (name, shape) in names {
            varmap
                .get(*shape, name, Init::Const(1.0), DType::F32, &Device::Cpu)
                .unwrap();
        }
        varmap
    }

    #[test]
    fn test_name_order() {
        let varmap = varmap_with(&[("b", &[2]), ("a", &[3])]);
        let registry = ParamRegistry::from_varmap(&varmap);
        let names: Vec<_> = registry.iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_copy_from() {
        let src = ParamRegistry::from_varmap(&varmap_with(&[("w", &[4])]));
        let dst = ParamRegistry::from_varmap(&varmap_with(&[("w", &[4])]));
        let t = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], (4,), &Device::Cpu).unwrap();
        src.iter().next().unwrap().1.set(&t).unwrap();

        dst.copy_from(&src).unwrap();
        assert_eq!(dst.flat_values().unwrap(), src.flat_values().unwrap());
    }

    #[test]
    fn test_pairing_rejects_shape_mismatch() {
        let a = ParamRegistry::from_varmap(&varmap_with(&[("w", &[4])]));
        let b = ParamRegistry::from_varmap(&varmap_with(&[("w", &[5])]));
        assert!(a.copy_from(&b).is_err());
    }

    #[test]
    fn test_pairing_rejects_arity_mismatch() {
        let a = ParamRegistry::from_varmap(&varmap_with(&[("w", &[4])]));
        let b = ParamRegistry::from_varmap(&varmap_with(&[("w", &[4]), ("v", &[4])]));
        assert!(a.copy_from(&b).is_err());
    }

    #[test]
    fn test_track_with_full_weight_is_copy() {
        let src = ParamRegistry::from_varmap(&varmap_with(&[("w", &[2])]));
        let dst = ParamRegistry::from_varmap(&varmap_with(&[("w", &[2])]));
        let t = Tensor::from_slice(&[5.0f32, -1.0], (2,), &Device::Cpu).unwrap();
        src.iter().next().unwrap().1.set(&t).unwrap();

        dst.track_from(&src, 1.0).unwrap();
        assert_eq!(dst.flat_values().unwrap(), src.flat_values().unwrap());
    }

    #[test]
    fn test_filter_prefix() {
        let varmap = varmap_with(&[("q.w", &[2]), ("tgt.w", &[2]), ("q.b", &[1])]);
        let registry = ParamRegistry::from_varmap(&varmap);
        assert_eq!(registry.filter_prefix("q.").len(), 2);
        assert_eq!(registry.filter_prefix("tgt.").len(), 1);
    }
}
