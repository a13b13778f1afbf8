//! Optimizers.
//!
//! Unlike the usual backward-step interface, these optimizers expose the
//! two halves separately: gradients are computed against one parameter set
//! and may be applied to another of the same layout. That split is what the
//! asynchronous update protocol needs, where a worker's gradients are
//! written into the global parameters.
use crate::registry::ParamRegistry;
use anyhow::Result;
use candle_core::{Tensor, Var};
use serde::{Deserialize, Serialize};

/// Configuration of an optimizer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Plain stochastic gradient descent.
    Sgd {
        /// Learning rate.
        lr: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
        /// Exponential decay rate of the first moment.
        #[serde(default = "default_beta1")]
        beta1: f64,
        /// Exponential decay rate of the second moment.
        #[serde(default = "default_beta2")]
        beta2: f64,
        /// Denominator fuzz term.
        #[serde(default = "default_eps")]
        eps: f64,
    },
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_eps() -> f64 {
    1e-8
}

impl OptimizerConfig {
    /// Constructs the optimizer.
    pub fn build(&self) -> Optimizer {
        match self {
            OptimizerConfig::Sgd { lr } => Optimizer::Sgd { lr: *lr },
            OptimizerConfig::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => Optimizer::Adam {
                lr: *lr,
                beta1: *beta1,
                beta2: *beta2,
                eps: *eps,
                step: 0,
                moments: Vec::new(),
            },
        }
    }

    /// Overrides the learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::Sgd { lr: _ } => Self::Sgd { lr },
            Self::Adam {
                lr: _,
                beta1,
                beta2,
                eps,
            } => Self::Adam {
                lr,
                beta1,
                beta2,
                eps,
            },
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam {
            lr: 1e-4,
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_eps(),
        }
    }
}

/// An optimizer operating on explicit gradient/parameter pairs.
pub enum Optimizer {
    /// Plain stochastic gradient descent.
    Sgd {
        /// Learning rate.
        lr: f64,
    },

    /// Adam optimizer. The first and second moments are kept per registry
    /// slot, keyed by position; the pairing handed to
    /// [`apply_gradients`](Optimizer::apply_gradients) must therefore stay
    /// stable across calls.
    Adam {
        /// Learning rate.
        lr: f64,
        /// Exponential decay rate of the first moment.
        beta1: f64,
        /// Exponential decay rate of the second moment.
        beta2: f64,
        /// Denominator fuzz term.
        eps: f64,
        /// Number of apply steps taken so far.
        step: i32,
        /// First/second moment per slot, allocated lazily.
        moments: Vec<Option<(Tensor, Tensor)>>,
    },
}

impl Optimizer {
    /// Computes the gradient of `loss` for every slot of `params`, in
    /// registry order. Parameters the loss does not reach get a zero
    /// gradient so positions stay aligned.
    pub fn compute_gradients(&self, loss: &Tensor, params: &ParamRegistry) -> Result<Vec<Tensor>> {
        let grads = loss.backward()?;
        params
            .iter()
            .map(|(_, var)| match grads.get(var) {
                Some(grad) => Ok(grad.clone()),
                None => Ok(var.zeros_like()?),
            })
            .collect()
    }

    /// Applies the update rule to every gradient/parameter pair.
    pub fn apply_gradients(&mut self, pairs: &[(Tensor, &Var)]) -> Result<()> {
        match self {
            Self::Sgd { lr } => {
                for (grad, var) in pairs {
                    let updated = (var.as_tensor() - (*lr * grad)?)?;
                    var.set(&updated)?;
                }
            }
            Self::Adam {
                lr,
                beta1,
                beta2,
                eps,
                step,
                moments,
            } => {
                *step += 1;
                if moments.len() < pairs.len() {
                    moments.resize(pairs.len(), None);
                }
                let corr1 = 1.0 / (1.0 - beta1.powi(*step));
                let corr2 = 1.0 / (1.0 - beta2.powi(*step));
                for (slot, (grad, var)) in pairs.iter().enumerate() {
                    let (m, v) = match &moments[slot] {
                        Some((m, v)) => (
                            ((*beta1 * m)? + ((1.0 - *beta1) * grad)?)?,
                            ((*beta2 * v)? + ((1.0 - *beta2) * grad.sqr()?)?)?,
                        ),
                        None => (
                            ((1.0 - *beta1) * grad)?,
                            ((1.0 - *beta2) * grad.sqr()?)?,
                        ),
                    };
                    let m_hat = (&m * corr1)?;
                    let v_hat = (&v * corr2)?;
                    let update = ((*lr * m_hat)? / (v_hat.sqrt()? + *eps)?)?;
                    var.set(&(var.as_tensor() - update)?)?;
                    moments[slot] = Some((m, v));
                }
            }
        }
        Ok(())
    }

    /// Minimizes `loss` over `params`: gradients are computed against and
    /// applied to the same parameter set.
    pub fn backward_step(&mut self, loss: &Tensor, params: &ParamRegistry) -> Result<()> {
        let grads = self.compute_gradients(loss, params)?;
        let pairs = params.pair_grads(grads, params)?;
        self.apply_gradients(&pairs)
    }
}
