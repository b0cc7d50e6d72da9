//! `files` entries of a manifest.
//!
//! On the wire an entry is a mapping with the short keys `l` (symlink
//! target), `h` (content digest), `s` (size) and `m` (file mode). An entry
//! carries exactly one of `l` or the `h`+`s` pair.

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;

/// Wire form of a file entry, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawFileEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<u32>,
}

/// A validated file entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
    /// A symbolic link to `target`.
    Symlink {
        target: String,
        mode: Option<u32>,
    },
    /// A blob stored remotely under `digest`.
    Blob {
        digest: String,
        size: u64,
        mode: Option<u32>,
    },
}

impl FileEntry {
    /// Create a blob entry.
    pub fn blob(digest: impl Into<String>, size: u64) -> Self {
        Self::Blob {
            digest: digest.into(),
            size,
            mode: None,
        }
    }

    /// Create a symlink entry.
    pub fn symlink(target: impl Into<String>) -> Self {
        Self::Symlink {
            target: target.into(),
            mode: None,
        }
    }

    /// Set the file mode.
    #[must_use]
    pub fn with_mode(self, mode: u32) -> Self {
        match self {
            Self::Symlink { target, .. } => Self::Symlink {
                target,
                mode: Some(mode),
            },
            Self::Blob { digest, size, .. } => Self::Blob {
                digest,
                size,
                mode: Some(mode),
            },
        }
    }

    pub const fn mode(&self) -> Option<u32> {
        match self {
            Self::Symlink { mode, .. } | Self::Blob { mode, .. } => *mode,
        }
    }

    /// Digest of the blob, `None` for symlinks.
    pub fn digest(&self) -> Option<&str> {
        match self {
            Self::Blob { digest, .. } => Some(digest),
            Self::Symlink { .. } => None,
        }
    }

    /// Validate a wire entry found at `path`.
    pub(crate) fn from_raw(path: &str, raw: RawFileEntry) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidFileEntry {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        match (raw.l, raw.h, raw.s) {
            (Some(target), None, None) => Ok(Self::Symlink {
                target,
                mode: raw.m,
            }),
            (None, Some(digest), Some(size)) => {
                if !is_valid_digest(&digest) {
                    return Err(ConfigError::InvalidDigest { value: digest });
                }
                Ok(Self::Blob {
                    digest,
                    size,
                    mode: raw.m,
                })
            }
            (Some(_), _, _) => Err(invalid("has both a symlink target and a content digest")),
            (None, Some(_), None) => Err(invalid("content digest without size")),
            (None, None, Some(_)) => Err(invalid("size without content digest")),
            (None, None, None) => Err(invalid("needs either 'l' or both 'h' and 's'")),
        }
    }

    pub(crate) fn to_raw(&self) -> RawFileEntry {
        match self {
            Self::Symlink { target, mode } => RawFileEntry {
                l: Some(target.clone()),
                m: *mode,
                ..RawFileEntry::default()
            },
            Self::Blob { digest, size, mode } => RawFileEntry {
                h: Some(digest.clone()),
                s: Some(*size),
                m: *mode,
                ..RawFileEntry::default()
            },
        }
    }
}

/// Whether `value` looks like a content digest: lowercase hex of SHA-1 (40)
/// or SHA-256 (64) length.
pub fn is_valid_digest(value: &str) -> bool {
    matches!(value.len(), 40 | 64)
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
