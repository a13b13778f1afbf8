//! Tensorboard sink for tandem records.
use std::path::Path;
use tandem_core::record::{Record, RecordValue, Recorder};
use tensorboard_rs::summary_writer::SummaryWriter;

/// Writes records as TFRecord summaries.
///
/// Scalar values become scalar summaries; 1-dimensional arrays become
/// histograms. Other value types are ignored.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
}

impl TensorboardRecorder {
    /// Constructs a [`TensorboardRecorder`] writing into `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
        }
    }

    fn add_histogram(&mut self, tag: &str, values: &[f32], step: usize) {
        if values.is_empty() {
            return;
        }
        let min = values.iter().fold(f32::MAX, |m, v| v.min(m)) as f64;
        let max = values.iter().fold(-f32::MAX, |m, v| v.max(m)) as f64;
        let sum: f64 = values.iter().map(|v| *v as f64).sum();
        let sum_squares: f64 = values.iter().map(|v| (*v as f64) * (*v as f64)).sum();

        // Equal-width buckets; a single-valued distribution gets one bucket.
        const N_BUCKETS: usize = 30;
        let width = (max - min) / N_BUCKETS as f64;
        let (limits, counts) = if width == 0.0 {
            (vec![max], vec![values.len() as f64])
        } else {
            let limits: Vec<f64> = (1..=N_BUCKETS)
                .map(|i| min + width * i as f64)
                .collect();
            let mut counts = vec![0f64; N_BUCKETS];
            for v in values {
                let mut idx = ((*v as f64 - min) / width) as usize;
                if idx >= N_BUCKETS {
                    idx = N_BUCKETS - 1;
                }
                counts[idx] += 1.0;
            }
            (limits, counts)
        };

        self.writer.add_histogram_raw(
            tag,
            min,
            max,
            values.len() as f64,
            sum,
            sum_squares,
            &limits,
            &counts,
            step,
        );
    }
}

impl Recorder for TensorboardRecorder {
    /// Writes a given [`Record`] into a TFRecord, tagged with `step`.
    fn write(&mut self, step: u64, record: Record) {
        for (k, v) in record.iter() {
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step as usize),
                RecordValue::Array1(values) => self.add_histogram(k, values, step as usize),
                RecordValue::DateTime(_) => {} // discard value
                RecordValue::String(_) => {}   // discard value
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TensorboardRecorder;
    use tandem_core::record::{Record, RecordValue, Recorder};
    use tempdir::TempDir;

    #[test]
    fn test_write_creates_event_file() {
        let dir = TempDir::new("tb").unwrap();
        let mut recorder = TensorboardRecorder::new(dir.path());

        let mut record = Record::from_scalar("loss/total", 0.5);
        record.insert("loss/per_instance", RecordValue::Array1(vec![0.2, 0.8]));
        recorder.write(1, record);

        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(entries > 0);
    }
}
