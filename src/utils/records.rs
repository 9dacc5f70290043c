//! Experiment Record Sink
//!
//! Durable per-run outputs: one accuracy line per cycle appended to a
//! trial-indexed `record_<trial>.txt`, and optional per-cycle selection dumps
//! (`data_<cycle>.json`) used for proxy-vs-oracle selection bias analysis.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// Per-cycle bookkeeping payload: which samples were selected and how the
/// newly acquired labels distribute over classes. The oracle fields are only
/// present when true-loss scoring ran alongside the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionDump {
    /// Cycle this dump belongs to (0-indexed)
    pub cycle: usize,
    /// Sample indices selected by the active policy
    pub samples: Vec<usize>,
    /// Per-class count of the selected samples' true labels
    pub label_cnt: Vec<usize>,
    /// Top samples ranked by true per-sample loss, if oracle scoring ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_samples: Option<Vec<usize>>,
    /// Per-class counts of the oracle top samples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_label_cnt: Option<Vec<usize>>,
}

/// End-of-run summary: the accuracy trajectory of every trial plus when the
/// run finished. Written once, after the last trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub finished_at: DateTime<Utc>,
    /// One accuracy-per-cycle series per trial
    pub trials: Vec<Vec<f32>>,
}

/// Writes experiment artifacts under a fixed output directory.
#[derive(Debug, Clone)]
pub struct RecordSink {
    dir: PathBuf,
}

impl RecordSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn record_path(&self, trial: usize) -> PathBuf {
        self.dir.join(format!("record_{}.txt", trial + 1))
    }

    /// Truncate the accuracy record for a trial. Called once at trial start so
    /// a rerun does not append to stale results.
    pub fn start_trial(&self, trial: usize) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        File::create(self.record_path(trial))?;
        Ok(())
    }

    /// Append one accuracy value (percent) for the cycle just finished.
    pub fn append_accuracy(&self, trial: usize, accuracy: f64) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.record_path(trial))?;
        writeln!(file, "{}", accuracy)?;
        Ok(())
    }

    /// Write the end-of-run summary as `summary.json`.
    pub fn write_summary(&self, trials: Vec<Vec<f32>>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let summary = RunSummary {
            finished_at: Utc::now(),
            trials,
        };
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(self.dir.join("summary.json"), json)?;
        Ok(())
    }

    /// Serialize the per-cycle selection dump as `data_<cycle>.json`.
    pub fn write_selection(&self, dump: &SelectionDump) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("data_{}.json", dump.cycle));
        let json = serde_json::to_string_pretty(dump)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cifar_al_records_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_accuracy_record_lines() {
        let dir = temp_dir("acc");
        let sink = RecordSink::new(&dir);

        sink.start_trial(0).unwrap();
        sink.append_accuracy(0, 41.5).unwrap();
        sink.append_accuracy(0, 55.25).unwrap();

        let content = std::fs::read_to_string(dir.join("record_1.txt")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["41.5", "55.25"]);

        // Restarting the trial truncates the record.
        sink.start_trial(0).unwrap();
        let content = std::fs::read_to_string(dir.join("record_1.txt")).unwrap();
        assert!(content.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_summary_written_once() {
        let dir = temp_dir("summary");
        let sink = RecordSink::new(&dir);

        sink.write_summary(vec![vec![40.0, 52.5], vec![41.0, 53.0]])
            .unwrap();

        let json = std::fs::read_to_string(dir.join("summary.json")).unwrap();
        let summary: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary.trials.len(), 2);
        assert_eq!(summary.trials[0], vec![40.0, 52.5]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_selection_dump_roundtrip() {
        let dir = temp_dir("dump");
        let sink = RecordSink::new(&dir);

        let dump = SelectionDump {
            cycle: 3,
            samples: vec![10, 4, 7],
            label_cnt: vec![1, 0, 2],
            real_samples: None,
            real_label_cnt: None,
        };
        sink.write_selection(&dump).unwrap();

        let json = std::fs::read_to_string(dir.join("data_3.json")).unwrap();
        let loaded: SelectionDump = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.samples, vec![10, 4, 7]);
        assert_eq!(loaded.label_cnt, vec![1, 0, 2]);
        assert!(loaded.real_samples.is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
