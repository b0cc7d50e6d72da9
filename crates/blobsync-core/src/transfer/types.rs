//! Transfer domain types.
//!
//! An [`Item`] is one named blob to move between the local side and the
//! remote content store. Every enqueued item produces exactly one
//! [`TransferResult`].

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::errors::TransferError;

/// Dispatch priority of a transfer item.
///
/// Ordering follows dispatch order: `High` sorts before `Med`, which sorts
/// before `Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Dispatched first (manifests, small files needed to start work).
    High,
    /// Default priority for regular blobs.
    #[default]
    Med,
    /// Dispatched after everything else.
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Med => write!(f, "med"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Local end of a transfer.
///
/// For fetches this is where the payload lands; for pushes it is where the
/// payload is read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Keep the payload in memory and hand it back in the result.
    Memory,
    /// A file on the local filesystem.
    File(PathBuf),
}

impl Destination {
    /// Convenience constructor for a file destination.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// The file path, if this is a file destination.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Memory => None,
            Self::File(path) => Some(path),
        }
    }
}

/// A named unit of transfer work.
///
/// Immutable once constructed; owned by the coordinator from enqueue until
/// its result is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    name: String,
    priority: Priority,
    destination: Destination,
    expected_size: Option<u64>,
}

impl Item {
    /// Create a new item, rejecting empty names.
    pub fn new(
        priority: Priority,
        name: impl Into<String>,
        destination: Destination,
        expected_size: Option<u64>,
    ) -> Result<Self, TransferError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TransferError::invalid_item("item name must not be empty"));
        }
        Ok(Self {
            name,
            priority,
            destination,
            expected_size,
        })
    }

    /// Content digest or path key identifying the blob.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn priority(&self) -> Priority {
        self.priority
    }

    pub const fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Declared payload size, `None` when unknown.
    pub const fn expected_size(&self) -> Option<u64> {
        self.expected_size
    }
}

/// What a successful transfer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPayload {
    /// Payload held in memory (`Destination::Memory` fetches).
    Bytes(Bytes),
    /// Payload written to disk.
    Stored {
        /// Final location of the file.
        path: PathBuf,
        /// Number of bytes written.
        size: u64,
    },
    /// Payload pushed to the remote store.
    Uploaded {
        /// Uncompressed size of the uploaded blob.
        size: u64,
    },
}

impl TransferPayload {
    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        match self {
            Self::Bytes(data) => data.len() as u64,
            Self::Stored { size, .. } | Self::Uploaded { size } => *size,
        }
    }
}

/// Terminal outcome of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success(TransferPayload),
    Failure(TransferError),
}

/// One completed-or-failed item, delivered exactly once to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Name of the item this result belongs to.
    pub item_name: String,
    /// What happened.
    pub outcome: TransferOutcome,
}

impl TransferResult {
    /// Build a result from a handler return value.
    pub fn from_result(
        item_name: impl Into<String>,
        result: Result<TransferPayload, TransferError>,
    ) -> Self {
        let outcome = match result {
            Ok(payload) => TransferOutcome::Success(payload),
            Err(err) => TransferOutcome::Failure(err),
        };
        Self {
            item_name: item_name.into(),
            outcome,
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Success(_))
    }

    /// The failure, if this result is one.
    pub const fn error(&self) -> Option<&TransferError> {
        match &self.outcome {
            TransferOutcome::Failure(err) => Some(err),
            TransferOutcome::Success(_) => None,
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<TransferPayload, TransferError> {
        match self.outcome {
            TransferOutcome::Success(payload) => Ok(payload),
            TransferOutcome::Failure(err) => Err(err),
        }
    }
}
