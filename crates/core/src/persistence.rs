//! Lead Persistence
//!
//! Flushes a finished conversation's lead record to disk. Persistence never
//! fails the caller: problems are logged and reported as a [`SaveOutcome`].

use crate::lead::LeadRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// What happened when a lead record was handed to a [`LeadSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record was empty, nothing was written.
    Skipped,
    /// The record was written to the given path.
    Saved(PathBuf),
    /// Writing failed; the cause has already been logged.
    Failed,
}

/// Destination for finalized lead records.
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn save(&self, lead: &LeadRecord) -> SaveOutcome;
}

#[derive(Debug, thiserror::Error)]
enum PersistError {
    #[error("failed to serialize lead record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Writes each lead as pretty-printed JSON into a directory.
///
/// The file name is derived from the captured name, so saving the same lead
/// twice overwrites the earlier file.
#[derive(Debug, Clone)]
pub struct JsonFileLeadSink {
    dir: PathBuf,
}

impl JsonFileLeadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, path: &Path, lead: &LeadRecord) -> Result<(), PersistError> {
        let body = serde_json::to_string_pretty(lead)?;
        tokio::fs::write(path, body)
            .await
            .map_err(|source| PersistError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl LeadSink for JsonFileLeadSink {
    async fn save(&self, lead: &LeadRecord) -> SaveOutcome {
        if lead.is_empty() {
            warn!("No lead data to save");
            return SaveOutcome::Skipped;
        }

        let path = self.dir.join(lead.file_name());
        match self.write(&path, lead).await {
            Ok(()) => {
                info!(path = %path.display(), "Lead data saved");
                SaveOutcome::Saved(path)
            }
            Err(e) => {
                error!(error = %e, "Failed to save lead data");
                SaveOutcome::Failed
            }
        }
    }
}
