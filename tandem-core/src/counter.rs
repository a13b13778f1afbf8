//! Shared training counters.
use std::sync::atomic::{AtomicU64, Ordering};

/// Global timestep and episode counters shared by all worker replicas.
///
/// Both counters are plain atomics incremented with `Relaxed` ordering:
/// a reader may observe a value that lags concurrent increments. The update
/// protocol accepts this staleness; what it relies on is that no increment
/// is ever lost, which `fetch_add` guarantees without any lock.
///
/// The timestep counter advances by the number of experience rows of each
/// processed batch, not by one per call; the episode counter advances by
/// the number of terminal rows in the batch.
#[derive(Debug, Default)]
pub struct TrainCounter {
    timestep: AtomicU64,
    episode: AtomicU64,
}

impl TrainCounter {
    /// Creates counters starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the timestep counter by `timesteps` and the episode counter
    /// by `episodes` as two independent relaxed increments.
    pub fn advance(&self, timesteps: u64, episodes: u64) {
        self.timestep.fetch_add(timesteps, Ordering::Relaxed);
        self.episode.fetch_add(episodes, Ordering::Relaxed);
    }

    /// Current timestep count.
    pub fn timestep(&self) -> u64 {
        self.timestep.load(Ordering::Relaxed)
    }

    /// Current episode count.
    pub fn episode(&self) -> u64 {
        self.episode.load(Ordering::Relaxed)
    }
}
