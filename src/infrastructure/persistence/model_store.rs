//! On-disk storage for the trained price model.
//!
//! The model directory holds two JSON files: the serialized regressor
//! (`model.json`) and its metadata (`metadata.json`). The metadata is written
//! last, so a directory with a model but no metadata is treated as absent.

use crate::domain::pricing::ModelMetadata;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MODEL_FILE: &str = "model.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Handles persistence of the model artifact and its metadata.
#[derive(Debug, Clone)]
pub struct ModelStore {
    model_dir: PathBuf,
}

impl ModelStore {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.model_dir.join(METADATA_FILE)
    }

    /// True when both files are present.
    pub fn exists(&self) -> bool {
        self.model_path().exists() && self.metadata_path().exists()
    }

    /// Loads the artifact and metadata. `Ok(None)` when either file is missing.
    pub fn load<M: DeserializeOwned>(&self) -> Result<Option<(M, ModelMetadata)>> {
        if !self.exists() {
            return Ok(None);
        }

        let metadata_path = self.metadata_path();
        let content = fs::read_to_string(&metadata_path)
            .with_context(|| format!("Failed to read model metadata {:?}", metadata_path))?;
        let metadata: ModelMetadata =
            serde_json::from_str(&content).context("Failed to parse model metadata JSON")?;

        let model_path = self.model_path();
        let content = fs::read_to_string(&model_path)
            .with_context(|| format!("Failed to read model artifact {:?}", model_path))?;
        let model: M =
            serde_json::from_str(&content).context("Failed to deserialize model artifact")?;

        info!("Loaded price model from {:?}", self.model_dir);
        Ok(Some((model, metadata)))
    }

    /// Saves both files, artifact first.
    pub fn save<M: Serialize>(&self, model: &M, metadata: &ModelMetadata) -> Result<()> {
        fs::create_dir_all(&self.model_dir)
            .with_context(|| format!("Failed to create model directory {:?}", self.model_dir))?;

        let artifact = serde_json::to_string(model).context("Failed to serialize model artifact")?;
        write_atomic(&self.model_path(), &artifact)?;

        let meta = serde_json::to_string_pretty(metadata)
            .context("Failed to serialize model metadata")?;
        write_atomic(&self.metadata_path(), &meta)?;

        info!("Saved price model to {:?}", self.model_dir);
        Ok(())
    }
}

// Atomic write: write to temp file then rename
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp file {:?}", temp_path))?;
    fs::rename(&temp_path, path).with_context(|| format!("Failed to rename temp file to {:?}", path))?;
    Ok(())
}
