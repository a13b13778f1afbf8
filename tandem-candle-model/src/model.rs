//! Interface of neural networks used inside algorithms.
use anyhow::Result;
use candle_nn::VarBuilder;

/// A neural network building block not owning its variables.
///
/// Variables are created through the given [`VarBuilder`], so several
/// subnets can live in one `VarMap` under distinct prefixes. This is what
/// lets an algorithm keep e.g. an online and a target network whose
/// parameters are tracked and synchronized through the registry.
pub trait SubNet: Sized {
    /// Configuration from which the subnet is constructed.
    type Config;

    /// Input of the subnet.
    type Input;

    /// Output of the subnet.
    type Output;

    /// Builds the subnet, creating its variables through `vb`.
    fn build(vb: VarBuilder, config: &Self::Config) -> Result<Self>;

    /// A generalized forward function.
    fn forward(&self, input: &Self::Input) -> Result<Self::Output>;
}
