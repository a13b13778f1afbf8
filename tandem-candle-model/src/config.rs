//! Model configuration.
use crate::opt::OptimizerConfig;
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use tandem_core::ModelSpec;

/// Device on which variables are created.
///
/// This enum is added because [`candle_core::Device`] does not support
/// serialization.
#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The n-th GPU device.
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl From<Device> for candle_core::Device {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => candle_core::Device::Cpu,
            Device::Cuda(n) => candle_core::Device::new_cuda(n).unwrap(),
        }
    }
}

/// Configuration of [`ModelBase`](crate::ModelBase).
///
/// `AC` is the configuration type of the algorithm plugged into the model.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ModelConfig<AC> {
    /// Declared inputs and outputs of the model.
    pub spec: ModelSpec,

    /// Algorithm configuration.
    pub algorithm: AC,

    /// Optimizer configuration. Standalone models and worker replicas
    /// require one; global parameter holders are built without.
    pub opt_config: Option<OptimizerConfig>,

    /// Discount factor.
    pub discount: f64,

    /// Device on which variables are created.
    pub device: Device,

    /// Minimum number of action selections between two summary writes.
    pub summary_interval: u64,

    /// Summary verbosity: at level 2 and above, per-parameter statistics
    /// are written along with the losses.
    pub summary_level: u8,

    /// Whether per-episode reward summaries are written.
    pub record_episode_rewards: bool,
}

impl<AC> ModelConfig<AC> {
    /// Creates a configuration with default hyperparameters.
    pub fn new(spec: ModelSpec, algorithm: AC) -> Self {
        Self {
            spec,
            algorithm,
            opt_config: Some(OptimizerConfig::default()),
            discount: 0.97,
            device: Device::default(),
            summary_interval: 1000,
            summary_level: 0,
            record_episode_rewards: true,
        }
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, opt_config: OptimizerConfig) -> Self {
        self.opt_config = Some(opt_config);
        self
    }

    /// Sets the discount factor.
    pub fn discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    /// Sets the device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Sets the summary interval.
    pub fn summary_interval(mut self, summary_interval: u64) -> Self {
        self.summary_interval = summary_interval;
        self
    }

    /// Sets the summary verbosity level.
    pub fn summary_level(mut self, summary_level: u8) -> Self {
        self.summary_level = summary_level;
        self
    }

    /// Removes the optimizer. This is how the configuration of a global
    /// parameter holder is derived from a worker's.
    pub fn strip_optimizer(mut self) -> Self {
        self.opt_config = None;
        self
    }
}

impl<AC: DeserializeOwned + Serialize> ModelConfig<AC> {
    /// Constructs [`ModelConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(config)
    }

    /// Saves [`ModelConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
