use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::forest::RandomForest;
use crate::ratings::RatingBook;

pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub generated_at: String,
    pub trained_rows: usize,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    pub ratings: RatingBook,
    pub forest: RandomForest,
}

impl ModelArtifact {
    pub fn new(ratings: RatingBook, forest: RandomForest, trained_rows: usize) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            trained_rows,
            data_dir: None,
            ratings,
            forest,
        }
    }

    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.data_dir = Some(source_key(dir));
        self
    }

    pub fn is_from(&self, dir: &Path) -> bool {
        self.data_dir.as_deref() == Some(source_key(dir).as_path())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string(self)
            .map_err(|e| PipelineError::Artifact(format!("serialize: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| PipelineError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "saved model artifact");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = serde_json::from_str::<Self>(&raw)
            .map_err(|e| PipelineError::Artifact(format!("parse {}: {e}", path.display())))?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(PipelineError::Artifact(format!(
                "unsupported artifact version {} (expected {ARTIFACT_VERSION})",
                artifact.version
            )));
        }
        Ok(artifact)
    }

    /// `Ok(None)` when the artifact was trained from another data directory.
    pub fn load_for(path: &Path, data_dir: &Path) -> Result<Option<Self>> {
        let artifact = Self::load(path)?;
        if artifact.is_from(data_dir) {
            return Ok(Some(artifact));
        }
        info!(
            path = %path.display(),
            trained_from = ?artifact.data_dir,
            data_dir = %data_dir.display(),
            "artifact was trained from other data"
        );
        Ok(None)
    }
}

// Canonical form when the directory exists, so `data` and `./data` compare equal.
fn source_key(dir: &Path) -> PathBuf {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}
