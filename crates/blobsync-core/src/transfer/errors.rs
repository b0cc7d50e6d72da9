//! Transfer error types.
//!
//! These errors are designed to be serializable and not depend on external
//! error types like `std::io::Error`. For I/O errors, we capture the kind
//! and message as strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for a single item's transfer.
///
/// The channel collapses every HTTP failure into `Unavailable`; status
/// detail only shows up in the logs.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransferError {
    /// The remote store could not deliver (retries exhausted or a terminal
    /// HTTP failure).
    #[error("Remote store unavailable for {name}")]
    Unavailable {
        /// Item name that could not be transferred.
        name: String,
    },

    /// Payload failed to decompress.
    #[error("Corrupt payload for {name}: {message}")]
    Corrupt {
        /// Item name.
        name: String,
        /// Decoder error message.
        message: String,
    },

    /// Payload size does not match the declared size.
    #[error("Size mismatch for {name}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Item name.
        name: String,
        /// Declared size.
        expected: u64,
        /// Size actually received or read.
        actual: u64,
    },

    /// I/O error during file operations.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "NotFound", "PermissionDenied").
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// The item was rejected at enqueue time.
    #[error("Invalid item: {message}")]
    InvalidItem {
        /// Why the item was rejected.
        message: String,
    },

    /// The coordinator no longer accepts work.
    #[error("Coordinator is shut down")]
    Closed,

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl TransferError {
    /// Create an unavailable error for an item.
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self::Unavailable { name: name.into() }
    }

    /// Create a corrupt payload error.
    pub fn corrupt(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a size mismatch error.
    pub fn size_mismatch(name: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::SizeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Create an I/O error from kind and message strings.
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Create an invalid item error.
    pub fn invalid_item(message: impl Into<String>) -> Self {
        Self::InvalidItem {
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether the payload itself was bad (as opposed to the transport).
    pub const fn is_payload_error(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::SizeMismatch { .. })
    }
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_message() {
        let err = TransferError::size_mismatch("abc", 5, 3);
        let msg = err.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
        assert!(err.is_payload_error());
    }

    #[test]
    fn test_from_io_error_captures_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = TransferError::from(io);
        assert_eq!(
            err,
            TransferError::Io {
                kind: "NotFound".to_string(),
                message: "gone".to_string(),
            }
        );
        assert!(!err.is_payload_error());
    }

    #[test]
    fn test_serde_round_trip() {
        let err = TransferError::corrupt("obj", "invalid zlib header");
        let json = serde_json::to_string(&err).unwrap();
        let back: TransferError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
