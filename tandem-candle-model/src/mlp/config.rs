use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    /// Input dimension.
    pub in_dim: usize,
    /// Hidden layer widths.
    pub units: Vec<usize>,
    /// Output dimension.
    pub out_dim: usize,
}

impl MlpConfig {
    /// Creates the configuration of an MLP.
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
        }
    }
}
