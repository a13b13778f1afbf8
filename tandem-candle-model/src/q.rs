//! Action-value learning with a target network.
mod base;
mod config;
mod explorer;

pub use base::QAlgorithm;
pub use config::QConfig;
pub use explorer::EpsilonGreedy;
