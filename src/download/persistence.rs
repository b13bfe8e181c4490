//! Where downloaded bytes end up.
//!
//! The orchestration hands finished payloads to a [`PersistenceSink`] and
//! reports whatever handle the sink returns. [`FileSystemSink`] writes into
//! a directory without ever overwriting an existing file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::filename::resolve_unique_path;

/// Errors raised while persisting a payload.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File system error (create directory, create file, write).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A sink-specific failure that is not an IO error.
    #[error("persistence failed for {file_name}: {reason}")]
    Rejected {
        /// The file name that could not be stored.
        file_name: String,
        /// Why the sink refused it.
        reason: String,
    },
}

impl PersistenceError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a rejection error.
    pub fn rejected(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            file_name: file_name.into(),
            reason: reason.into(),
        }
    }
}

/// Opaque result of a successful persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedFile {
    /// Sink-specific identifier: a path for the filesystem sink.
    pub handle: String,
    /// The file name actually used, which may carry a de-duplication suffix.
    pub file_name: String,
}

/// Consumes a finished payload.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Stores `bytes` under (a variant of) `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the payload cannot be stored.
    async fn persist(&self, bytes: &[u8], file_name: &str)
    -> Result<PersistedFile, PersistenceError>;
}

/// Writes payloads into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct FileSystemSink {
    output_dir: PathBuf,
}

impl FileSystemSink {
    /// Creates a sink writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// The directory files are written into.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl PersistenceSink for FileSystemSink {
    #[instrument(skip(self, bytes), fields(bytes = bytes.len(), dir = %self.output_dir.display()))]
    async fn persist(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<PersistedFile, PersistenceError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| PersistenceError::io(self.output_dir.clone(), e))?;

        let path = resolve_unique_path(&self.output_dir, file_name);
        debug!(path = %path.display(), "resolved output path");

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| PersistenceError::io(path.clone(), e))?;

        let write_result = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = write_result {
            debug!(path = %path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&path).await;
            return Err(PersistenceError::io(path, e));
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        info!(path = %path.display(), bytes = bytes.len(), "file written");

        Ok(PersistedFile {
            handle: path.display().to_string(),
            file_name,
        })
    }
}
