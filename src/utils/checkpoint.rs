//! Checkpoint Store
//!
//! Persists best model snapshots using Burn's record API. Artifacts follow the
//! `<checkpoint_dir>/<artifact>_<dataset>.mpk` naming convention so a run for one
//! dataset never clobbers another.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use tracing::info;

use crate::dataset::cifar::DatasetKind;
use crate::utils::error::{ExperimentError, Result};

/// Stores model snapshots under a fixed directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path for a named artifact, without extension (Burn appends `.mpk`).
    pub fn artifact_path(&self, artifact: &str, dataset: DatasetKind) -> PathBuf {
        self.dir.join(format!("{}_{}", artifact, dataset))
    }

    /// Save a model snapshot, creating the checkpoint directory if needed.
    pub fn save<B: Backend, M: Module<B>>(
        &self,
        model: M,
        artifact: &str,
        dataset: DatasetKind,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.artifact_path(artifact, dataset);
        let recorder = CompactRecorder::new();
        model
            .save_file(&path, &recorder)
            .map_err(|e| ExperimentError::Training(format!("failed to save checkpoint: {:?}", e)))?;

        info!("Checkpoint saved to {:?}", path);
        Ok(path)
    }

    /// Load a previously saved snapshot into the given model.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        model: M,
        artifact: &str,
        dataset: DatasetKind,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.artifact_path(artifact, dataset);
        self.load_from::<B, M>(model, &path, device)
    }

    fn load_from<B: Backend, M: Module<B>>(
        &self,
        model: M,
        path: &Path,
        device: &B::Device,
    ) -> Result<M> {
        let recorder = CompactRecorder::new();
        model
            .load_file(path, &recorder, device)
            .map_err(|e| ExperimentError::Training(format!("failed to load checkpoint: {:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_convention() {
        let store = CheckpointStore::new("trained/weights");
        let path = store.artifact_path("vae", DatasetKind::Cifar10);
        assert_eq!(path, PathBuf::from("trained/weights/vae_cifar10"));
    }
}
