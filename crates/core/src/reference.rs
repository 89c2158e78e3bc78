//! Reference Data
//!
//! The static FAQ / pricing document the SDR agent answers from. It is read
//! once per worker process and embedded verbatim into the agent's
//! instructions.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Default location of the reference document, relative to the working directory.
pub const DEFAULT_REFERENCE_PATH: &str = "razorpay_data.json";

#[derive(Debug, thiserror::Error)]
pub enum ReferenceDataError {
    #[error("failed to read reference data from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("reference data in {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("reference data in {0} must be a JSON object")]
    NotAnObject(PathBuf),
}

/// An immutable JSON object loaded at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData(Map<String, Value>);

impl ReferenceData {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Loads the document at `path`.
    ///
    /// A missing file is logged and yields an empty mapping. Unreadable files,
    /// malformed JSON and non-object documents are errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReferenceDataError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(path = %path.display(), "Reference data file not found, continuing without it");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ReferenceDataError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let value: Value =
            serde_json::from_str(&raw).map_err(|source| ReferenceDataError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        match value {
            Value::Object(map) => {
                info!(path = %path.display(), entries = map.len(), "Reference data loaded");
                Ok(Self(map))
            }
            _ => Err(ReferenceDataError::NotAnObject(path.to_path_buf())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Renders the mapping as 2-space indented JSON.
    pub fn to_pretty_json(&self) -> String {
        // A map of JSON values always serializes.
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}
