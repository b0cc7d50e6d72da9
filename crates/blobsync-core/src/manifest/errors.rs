//! Manifest configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// A manifest that must not be acted upon.
///
/// Raised before any transfer is scheduled; never silently ignored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Not valid JSON, wrong value types or unknown keys.
    #[error("Malformed manifest: {0}")]
    Malformed(String),

    /// A `files` entry violates the symlink xor digest+size rule.
    #[error("Invalid file entry '{path}': {reason}")]
    InvalidFileEntry {
        /// Relative path of the offending entry.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A digest is not lowercase hex of a supported length.
    #[error("Invalid content digest '{value}'")]
    InvalidDigest {
        /// The rejected digest.
        value: String,
    },

    /// `command` is present but empty.
    #[error("Manifest command must not be empty")]
    EmptyCommand,

    /// `os` is not a known platform flavor.
    #[error("Unknown platform flavor '{value}'")]
    UnknownFlavor {
        /// The rejected flavor.
        value: String,
    },

    /// `os` names a different platform than the one asked for.
    #[error("Expected 'os' to be '{expected}' but got '{actual}'")]
    FlavorMismatch {
        /// Flavor of the running platform.
        expected: String,
        /// Flavor recorded in the manifest.
        actual: String,
    },

    /// The manifest file could not be read.
    #[error("Failed to read manifest {path}: {message}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
