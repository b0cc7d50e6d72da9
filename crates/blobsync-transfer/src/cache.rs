//! Content-addressed local cache.
//!
//! Blobs live flat under the cache root, named by digest. Recency is the
//! file modification time: a cache hit touches the file, and trimming
//! removes the least recently used blobs first.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use blobsync_core::TransferError;
use tracing::{debug, info, warn};

/// Limits enforced by [`DiskCache::trim`]. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicies {
    /// Maximum number of blobs kept.
    pub max_items: Option<usize>,
    /// Maximum total size of the blobs kept, in bytes.
    pub max_size: Option<u64>,
}

impl CachePolicies {
    #[must_use]
    pub const fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    #[must_use]
    pub const fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    const fn exceeded(&self, items: usize, size: u64) -> bool {
        let too_many = match self.max_items {
            Some(max) => items > max,
            None => false,
        };
        let too_big = match self.max_size {
            Some(max) => size > max,
            None => false,
        };
        too_many || too_big
    }
}

struct CachedBlob {
    path: PathBuf,
    size: u64,
    used: SystemTime,
}

/// Local blob cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    policies: CachePolicies,
}

impl DiskCache {
    /// Open (and create if needed) the cache at `root`.
    pub fn open(root: impl Into<PathBuf>, policies: CachePolicies) -> Result<Self, TransferError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "Opened cache");
        Ok(Self { root, policies })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn policies(&self) -> CachePolicies {
        self.policies
    }

    /// Where blob `digest` is (or will be) stored.
    pub fn path_for(&self, digest: &str) -> PathBuf {
        self.root.join(digest)
    }

    /// Whether `digest` is cached with the expected size. Hits are marked as
    /// recently used.
    pub fn contains(&self, digest: &str, expected_size: Option<u64>) -> bool {
        let path = self.path_for(digest);
        let Ok(metadata) = fs::metadata(&path) else {
            return false;
        };
        if !metadata.is_file() || expected_size.is_some_and(|size| size != metadata.len()) {
            return false;
        }
        if let Err(e) = touch(&path) {
            debug!(path = %path.display(), error = %e, "Failed to touch cached blob");
        }
        true
    }

    /// Remove `digest` from the cache, if present.
    pub fn evict(&self, digest: &str) -> Result<(), TransferError> {
        match fs::remove_file(self.path_for(digest)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete least recently used blobs until the policies hold, plus any
    /// leftover partial writes. Returns the number of blobs removed.
    pub fn trim(&self) -> Result<usize, TransferError> {
        let mut blobs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            if path.extension().is_some_and(|ext| ext == "partial") {
                remove_logged(&path);
                continue;
            }
            blobs.push(CachedBlob {
                path,
                size: metadata.len(),
                used: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        blobs.sort_by_key(|blob| blob.used);
        let mut items = blobs.len();
        let mut size: u64 = blobs.iter().map(|blob| blob.size).sum();
        let mut removed = 0;
        for blob in &blobs {
            if !self.policies.exceeded(items, size) {
                break;
            }
            fs::remove_file(&blob.path)?;
            items -= 1;
            size -= blob.size;
            removed += 1;
        }

        if removed > 0 {
            info!(removed, remaining = items, size, "Trimmed cache");
        }
        Ok(removed)
    }
}

fn touch(path: &Path) -> std::io::Result<()> {
    fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())
}

fn remove_logged(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove partial file");
    }
}
