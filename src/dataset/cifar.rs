//! CIFAR Dataset Provider
//!
//! Loads the standard CIFAR-10 / CIFAR-100 binary files from a local directory
//! and exposes them through Burn's `Dataset` trait. Dataset selection is a
//! capability registry (`DatasetKind`) resolved once at startup; downstream code
//! never branches on a dataset-name string.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::utils::error::{ExperimentError, Result};
use crate::{CHANNELS, IMAGE_SIZE};

/// Bytes per image in the CIFAR binary layout (3 x 32 x 32, channel-major).
pub const IMAGE_BYTES: usize = CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

/// CIFAR-10 class names
pub const CIFAR10_CLASS_NAMES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Supported dataset variants. Each variant knows its own binary layout,
/// file list, and class count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Cifar10,
    Cifar100,
}

impl DatasetKind {
    /// Number of (fine) classes
    pub fn num_classes(&self) -> usize {
        match self {
            Self::Cifar10 => 10,
            Self::Cifar100 => 100,
        }
    }

    /// Subdirectory the standard binary distribution unpacks to
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Cifar10 => "cifar-10-batches-bin",
            Self::Cifar100 => "cifar-100-binary",
        }
    }

    /// Training split file names
    pub fn train_files(&self) -> &'static [&'static str] {
        match self {
            Self::Cifar10 => &[
                "data_batch_1.bin",
                "data_batch_2.bin",
                "data_batch_3.bin",
                "data_batch_4.bin",
                "data_batch_5.bin",
            ],
            Self::Cifar100 => &["train.bin"],
        }
    }

    /// Test split file names
    pub fn test_files(&self) -> &'static [&'static str] {
        match self {
            Self::Cifar10 => &["test_batch.bin"],
            Self::Cifar100 => &["test.bin"],
        }
    }

    /// Label bytes preceding each image record. CIFAR-100 stores a coarse and
    /// a fine label; the fine label is the last byte.
    fn label_width(&self) -> usize {
        match self {
            Self::Cifar10 => 1,
            Self::Cifar100 => 2,
        }
    }

    fn record_len(&self) -> usize {
        self.label_width() + IMAGE_BYTES
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cifar10 => write!(f, "cifar10"),
            Self::Cifar100 => write!(f, "cifar100"),
        }
    }
}

impl FromStr for DatasetKind {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cifar10" | "cifar-10" => Ok(Self::Cifar10),
            "cifar100" | "cifar-100" => Ok(Self::Cifar100),
            other => Err(ExperimentError::Config(format!(
                "unsupported dataset '{}', expected cifar10 or cifar100",
                other
            ))),
        }
    }
}

/// A single CIFAR sample: raw CHW pixel bytes plus the true class label.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CifarItem {
    /// Pixel data, channel-major, 3 x 32 x 32 bytes
    pub image: Vec<u8>,
    /// Fine class label
    pub label: usize,
}

/// In-memory CIFAR split. All images are held as raw bytes (~180 MB for a full
/// CIFAR train split), normalized to floats only at batch time.
#[derive(Clone, Debug)]
pub struct CifarDataset {
    items: Vec<CifarItem>,
    kind: DatasetKind,
}

impl CifarDataset {
    /// Parse one binary file's worth of records.
    pub fn from_bytes(kind: DatasetKind, bytes: &[u8]) -> Result<Self> {
        let record_len = kind.record_len();
        if bytes.is_empty() || bytes.len() % record_len != 0 {
            return Err(ExperimentError::Dataset(format!(
                "{} byte stream of length {} is not a multiple of the {}-byte record",
                kind,
                bytes.len(),
                record_len
            )));
        }

        let label_width = kind.label_width();
        let num_classes = kind.num_classes();
        let mut items = Vec::with_capacity(bytes.len() / record_len);

        for record in bytes.chunks_exact(record_len) {
            let label = record[label_width - 1] as usize;
            if label >= num_classes {
                return Err(ExperimentError::Dataset(format!(
                    "{} record carries label {} outside 0..{}",
                    kind, label, num_classes
                )));
            }
            items.push(CifarItem {
                image: record[label_width..].to_vec(),
                label,
            });
        }

        Ok(Self { items, kind })
    }

    /// Load a full split from the unpacked binary distribution under `root`.
    pub fn load(root: &Path, kind: DatasetKind, train: bool) -> Result<Self> {
        let dir = root.join(kind.dir_name());
        let files = if train {
            kind.train_files()
        } else {
            kind.test_files()
        };

        let mut items = Vec::new();
        for name in files {
            let path = dir.join(name);
            let bytes = std::fs::read(&path).map_err(|e| {
                ExperimentError::Dataset(format!("failed to read {:?}: {}", path, e))
            })?;
            items.extend(Self::from_bytes(kind, &bytes)?.items);
        }

        Ok(Self { items, kind })
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn num_classes(&self) -> usize {
        self.kind.num_classes()
    }

    /// Per-class sample counts over the whole split
    pub fn class_distribution(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_classes()];
        for item in &self.items {
            counts[item.label] += 1;
        }
        counts
    }

    /// True label of a sample, bypassing item materialization
    pub fn label_of(&self, index: usize) -> Option<usize> {
        self.items.get(index).map(|item| item.label)
    }

    /// Construct directly from items (used by tests and synthetic experiments)
    pub fn from_items(kind: DatasetKind, items: Vec<CifarItem>) -> Self {
        Self { items, kind }
    }
}

impl Dataset<CifarItem> for CifarDataset {
    fn get(&self, index: usize) -> Option<CifarItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_records(kind: DatasetKind, labels: &[usize]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (i, &label) in labels.iter().enumerate() {
            if kind.label_width() == 2 {
                bytes.push(0); // coarse label, unused
            }
            bytes.push(label as u8);
            bytes.extend(std::iter::repeat(i as u8).take(IMAGE_BYTES));
        }
        bytes
    }

    #[test]
    fn test_parse_cifar10_records() {
        let bytes = synthetic_records(DatasetKind::Cifar10, &[3, 7, 0]);
        let dataset = CifarDataset::from_bytes(DatasetKind::Cifar10, &bytes).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.label_of(0), Some(3));
        assert_eq!(dataset.label_of(1), Some(7));
        assert_eq!(dataset.get(2).unwrap().image.len(), IMAGE_BYTES);
    }

    #[test]
    fn test_parse_cifar100_uses_fine_label() {
        let bytes = synthetic_records(DatasetKind::Cifar100, &[42, 99]);
        let dataset = CifarDataset::from_bytes(DatasetKind::Cifar100, &bytes).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.label_of(0), Some(42));
        assert_eq!(dataset.label_of(1), Some(99));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let mut bytes = synthetic_records(DatasetKind::Cifar10, &[1]);
        bytes.pop();
        assert!(CifarDataset::from_bytes(DatasetKind::Cifar10, &bytes).is_err());
    }

    #[test]
    fn test_out_of_range_label_rejected() {
        let bytes = synthetic_records(DatasetKind::Cifar10, &[10]);
        assert!(CifarDataset::from_bytes(DatasetKind::Cifar10, &bytes).is_err());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("cifar10".parse::<DatasetKind>().unwrap(), DatasetKind::Cifar10);
        assert_eq!("CIFAR-100".parse::<DatasetKind>().unwrap(), DatasetKind::Cifar100);
        assert!("mnist".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn test_class_distribution() {
        let bytes = synthetic_records(DatasetKind::Cifar10, &[1, 1, 4]);
        let dataset = CifarDataset::from_bytes(DatasetKind::Cifar10, &bytes).unwrap();
        let dist = dataset.class_distribution();
        assert_eq!(dist[1], 2);
        assert_eq!(dist[4], 1);
        assert_eq!(dist.iter().sum::<usize>(), 3);
    }
}
