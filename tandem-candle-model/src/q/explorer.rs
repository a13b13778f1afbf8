//! Exploration strategy of the Q algorithm.
use anyhow::Result;
use candle_core::{shape::D, DType, Tensor};
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Epsilon-greedy action selection over a batch of action values.
pub struct EpsilonGreedy {
    epsilon: f64,
    rng: SmallRng,
}

impl EpsilonGreedy {
    /// Constructs the explorer with a fixed exploration probability.
    pub fn new(epsilon: f64, seed: u64) -> Self {
        Self {
            epsilon,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Picks one action per batch row: a uniformly random one with
    /// probability epsilon, the greedy one otherwise. Returns an `i64`
    /// tensor of shape `(batch, 1)`.
    pub fn pick(&mut self, action_values: &Tensor) -> Result<Tensor> {
        let (batch, n_actions) = action_values.dims2()?;
        let greedy: Vec<i64> = action_values
            .argmax_keepdim(D::Minus1)?
            .to_dtype(DType::I64)?
            .flatten_all()?
            .to_vec1()?;

        let picks = greedy
            .into_iter()
            .map(|greedy| {
                if self.rng.gen::<f64>() < self.epsilon {
                    self.rng.gen_range(0..n_actions as i64)
                } else {
                    greedy
                }
            })
            .collect::<Vec<_>>();
        Ok(Tensor::from_vec(picks, (batch, 1), action_values.device())?)
    }
}

#[cfg(test)]
mod tests {
    use super::EpsilonGreedy;
    use candle_core::{Device, Tensor};

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let mut explorer = EpsilonGreedy::new(0.0, 7);
        let values =
            Tensor::from_slice(&[0.1f32, 0.9, 0.0, 2.0, -1.0, 0.5], (2, 3), &Device::Cpu)
                .unwrap();
        let picks: Vec<i64> = explorer
            .pick(&values)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_eq!(picks, vec![1, 0]);
    }

    #[test]
    fn test_full_epsilon_stays_in_range() {
        let mut explorer = EpsilonGreedy::new(1.0, 7);
        let values = Tensor::zeros((8, 4), candle_core::DType::F32, &Device::Cpu).unwrap();
        let picks: Vec<i64> = explorer
            .pick(&values)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert!(picks.iter().all(|a| (0..4).contains(a)));
    }
}
