use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
/// Configuration of [`QAlgorithm`](super::QAlgorithm).
pub struct QConfig<NC> {
    /// Configuration of the action-value network.
    pub net_config: NC,

    /// Number of action selections between two target network updates.
    pub target_update_interval: u64,

    /// Weight of the online network when updating the target network;
    /// 1.0 replaces the target parameters outright.
    pub update_target_weight: f64,

    /// Threshold beyond which the squared loss switches to its linear
    /// (Huber) branch; 0.0 disables clipping.
    pub clip_loss: f64,

    /// Probability of taking a random action while sampling.
    pub epsilon: f64,

    /// Seed of the exploration RNG.
    pub seed: u64,
}

impl<NC> QConfig<NC> {
    /// Creates a configuration with default hyperparameters.
    pub fn new(net_config: NC) -> Self {
        Self {
            net_config,
            target_update_interval: 10_000,
            update_target_weight: 1.0,
            clip_loss: 0.0,
            epsilon: 0.1,
            seed: 42,
        }
    }

    /// Sets the target network update interval.
    pub fn target_update_interval(mut self, interval: u64) -> Self {
        self.target_update_interval = interval;
        self
    }

    /// Sets the target network update weight.
    pub fn update_target_weight(mut self, weight: f64) -> Self {
        self.update_target_weight = weight;
        self
    }

    /// Sets the loss clipping threshold.
    pub fn clip_loss(mut self, clip_loss: f64) -> Self {
        self.clip_loss = clip_loss;
        self
    }

    /// Sets the exploration probability.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}
