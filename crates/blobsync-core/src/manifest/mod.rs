//! Manifest schema and validation.
//!
//! A manifest describes a tree of files by content digest, optionally with
//! the command to run inside it and nested manifests to merge in. It is
//! consumed, never produced, by the transfer engine: validation happens
//! before any transfer is scheduled so a malformed manifest aborts without
//! network activity.
//!
//! ```
//! use blobsync_core::manifest::Manifest;
//!
//! let manifest = Manifest::load(r#"{"files": {"a": {"l": "b"}}}"#).unwrap();
//! assert_eq!(manifest.files.len(), 1);
//! assert!(Manifest::load(r#"{"files": {"a": {}}}"#).is_err());
//! ```

mod entry;
mod errors;
mod flavor;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use entry::{FileEntry, is_valid_digest};
pub use errors::ConfigError;
pub use flavor::{KNOWN_FLAVORS, current_flavor, is_known_flavor};

use entry::RawFileEntry;

/// Wire form of a manifest, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    files: Option<BTreeMap<String, RawFileEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    includes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relative_cwd: Option<String>,
}

/// A validated manifest.
///
/// `files` and `includes` are empty when the corresponding key is absent;
/// an empty `files` mapping is not written back out by [`Manifest::dump`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawManifest", into = "RawManifest")]
pub struct Manifest {
    /// Command line to run, if any.
    pub command: Option<Vec<String>>,
    /// Relative path to entry.
    pub files: BTreeMap<String, FileEntry>,
    /// Digests of nested manifests.
    pub includes: Vec<String>,
    /// Platform flavor the manifest was generated for.
    pub os: Option<String>,
    pub read_only: Option<bool>,
    /// Working directory relative to the tree root.
    pub relative_cwd: Option<String>,
    /// Keys that were present but empty when loaded.
    pub empty_keys: EmptyKeys,
}

/// Which collection keys were given explicitly empty (`"files": {}`,
/// `"includes": []`). [`Manifest::dump`] writes them back so that loading
/// and dumping preserves the text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyKeys {
    pub files: bool,
    pub includes: bool,
}

impl Manifest {
    /// Parse and validate manifest JSON.
    pub fn load(data: &str) -> Result<Self, ConfigError> {
        let raw: RawManifest = serde_json::from_str(data)?;
        Self::try_from(raw)
    }

    /// Parse and validate manifest JSON from raw bytes.
    pub fn load_bytes(data: &[u8]) -> Result<Self, ConfigError> {
        let raw: RawManifest = serde_json::from_slice(data)?;
        Self::try_from(raw)
    }

    /// Read, parse and validate a manifest file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading manifest");
        let data = std::fs::read(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::load_bytes(&data)
    }

    /// Serialize to JSON. Fails if the manifest was mutated into an invalid
    /// state.
    pub fn dump(&self) -> Result<String, ConfigError> {
        self.validate()?;
        Ok(serde_json::to_string(&RawManifest::from(self.clone()))?)
    }

    /// Check the rules that `FileEntry` cannot enforce by construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.as_ref().is_some_and(Vec::is_empty) {
            return Err(ConfigError::EmptyCommand);
        }
        if let Some(invalid) = self.includes.iter().find(|d| !is_valid_digest(d)) {
            return Err(ConfigError::InvalidDigest {
                value: invalid.clone(),
            });
        }
        if let Some(invalid) = self
            .files
            .values()
            .filter_map(FileEntry::digest)
            .find(|d| !is_valid_digest(d))
        {
            return Err(ConfigError::InvalidDigest {
                value: invalid.to_string(),
            });
        }
        if let Some(os) = &self.os {
            if !is_known_flavor(os) {
                return Err(ConfigError::UnknownFlavor { value: os.clone() });
            }
        }
        Ok(())
    }

    /// Fail unless the manifest is for `flavor` (or names no flavor).
    pub fn check_flavor(&self, flavor: &str) -> Result<(), ConfigError> {
        match &self.os {
            Some(os) if os != flavor => Err(ConfigError::FlavorMismatch {
                expected: flavor.to_string(),
                actual: os.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Iterate over `(path, digest, size)` for every blob entry.
    pub fn blobs(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.files.iter().filter_map(|(path, entry)| match entry {
            FileEntry::Blob { digest, size, .. } => Some((path.as_str(), digest.as_str(), *size)),
            FileEntry::Symlink { .. } => None,
        })
    }
}

impl TryFrom<RawManifest> for Manifest {
    type Error = ConfigError;

    fn try_from(raw: RawManifest) -> Result<Self, Self::Error> {
        let empty_keys = EmptyKeys {
            files: raw.files.as_ref().is_some_and(BTreeMap::is_empty),
            includes: raw.includes.as_ref().is_some_and(Vec::is_empty),
        };
        let files = raw
            .files
            .unwrap_or_default()
            .into_iter()
            .map(|(path, entry)| {
                let entry = FileEntry::from_raw(&path, entry)?;
                Ok((path, entry))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        let manifest = Self {
            command: raw.command,
            files,
            includes: raw.includes.unwrap_or_default(),
            os: raw.os,
            read_only: raw.read_only,
            relative_cwd: raw.relative_cwd,
            empty_keys,
        };
        manifest.validate()?;
        Ok(manifest)
    }
}

impl From<Manifest> for RawManifest {
    fn from(manifest: Manifest) -> Self {
        let keep_files = manifest.empty_keys.files || !manifest.files.is_empty();
        let keep_includes = manifest.empty_keys.includes || !manifest.includes.is_empty();
        let files = keep_files.then(|| {
            manifest
                .files
                .iter()
                .map(|(path, entry)| (path.clone(), entry.to_raw()))
                .collect()
        });
        Self {
            command: manifest.command,
            files,
            includes: keep_includes.then_some(manifest.includes),
            os: manifest.os,
            read_only: manifest.read_only,
            relative_cwd: manifest.relative_cwd,
        }
    }
}
