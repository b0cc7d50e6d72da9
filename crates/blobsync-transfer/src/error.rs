//! Errors of manifest-tree retrieval.

use std::path::PathBuf;

use blobsync_core::{ConfigError, TransferError};
use thiserror::Error;

/// Why a tree could not be retrieved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetrieveError {
    /// A manifest is invalid. Raised before any file transfer is scheduled.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A manifest could not be fetched.
    #[error("Manifest {digest} could not be retrieved: {source}")]
    ManifestUnavailable {
        digest: String,
        source: TransferError,
    },

    /// Some blobs could not be fetched; the tree is incomplete.
    #[error("Failed to retrieve {} file(s): {}", .digests.len(), .digests.join(", "))]
    MissingFiles {
        /// Digests that did not arrive, sorted.
        digests: Vec<String>,
    },

    /// Writing the output tree failed.
    #[error("Failed to write {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The coordinator refused work (e.g. it is shut down).
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl RetrieveError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
