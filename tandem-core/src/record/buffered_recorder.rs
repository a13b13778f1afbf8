use super::{Record, Recorder};
use std::sync::{Arc, Mutex};

/// A recorder keeping every written record in memory.
///
/// Clones share the same buffer, so a test can hand one clone to a model
/// and inspect the records through another after training.
#[derive(Clone, Default)]
pub struct BufferedRecorder {
    buf: Arc<Mutex<Vec<(u64, Record)>>>,
}

impl BufferedRecorder {
    /// Constructs the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the records written so far.
    pub fn records(&self) -> Vec<(u64, Record)> {
        self.buf.lock().unwrap().clone()
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.buf.lock().unwrap().len()
    }

    /// Returns `true` if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Recorder for BufferedRecorder {
    fn write(&mut self, step: u64, record: Record) {
        self.buf.lock().unwrap().push((step, record));
    }
}
