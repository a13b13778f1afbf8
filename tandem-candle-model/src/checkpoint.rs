//! Checkpoint retention.
use anyhow::Result;
use candle_nn::VarMap;
use log::info;
use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

/// Writes checkpoints and keeps the most recent ones on disk.
///
/// When a step is given, it is appended to the file name so successive
/// saves do not overwrite each other; without one, the exact path is used,
/// which allows resuming from a fixed location.
pub struct Checkpointer {
    max_to_keep: usize,
    saved: VecDeque<PathBuf>,
}

impl Checkpointer {
    /// Creates a checkpointer retaining up to `max_to_keep` files.
    pub fn new(max_to_keep: usize) -> Self {
        Self {
            max_to_keep,
            saved: VecDeque::new(),
        }
    }

    /// Saves `varmap` to `path`, suffixed with `step` when given, and
    /// prunes the oldest checkpoints beyond capacity.
    pub fn save(&mut self, varmap: &VarMap, path: &Path, step: Option<u64>) -> Result<PathBuf> {
        let target = match step {
            Some(step) => PathBuf::from(format!("{}-{}", path.display(), step)),
            None => path.to_path_buf(),
        };
        if let Some(dir) = target.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        varmap.save(&target)?;
        info!("Saved model parameters to {:?}", &target);

        if !self.saved.contains(&target) {
            self.saved.push_back(target.clone());
        }
        while self.saved.len() > self.max_to_keep {
            if let Some(old) = self.saved.pop_front() {
                let _ = fs::remove_file(&old);
            }
        }

        Ok(target)
    }
}
