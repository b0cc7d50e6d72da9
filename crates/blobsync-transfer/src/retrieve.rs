//! Retrieve a whole manifest tree into a directory.
//!
//! 1. Fetch the root manifest and, level by level, its includes (`High`
//!    priority, in memory). Every manifest is validated as it arrives; a
//!    `ConfigError` aborts before any file transfer is scheduled.
//! 2. Merge: entries from manifests loaded earlier win.
//! 3. Schedule every distinct blob missing from the cache (`Med` priority)
//!    and wait for those blobs.
//!
//! Only results of items scheduled here are consumed; results of other
//! items sharing the coordinator stay collectable by their owner.
//! 4. Materialize files and symlinks under the output directory.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use blobsync_core::manifest::is_valid_digest;
use blobsync_core::{
    ConfigError, Destination, FileEntry, Manifest, Priority, TransferError, TransferOutcome,
    TransferPayload,
};
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::cache::DiskCache;
use crate::coordinator::TransferCoordinator;
use crate::error::RetrieveError;

/// The merged result of a retrieved tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievedTree {
    /// Command to run, from the first manifest that has one.
    pub command: Option<Vec<String>>,
    /// Working directory relative to the output directory.
    pub relative_cwd: Option<String>,
    pub read_only: bool,
    /// Every file entry after merging, by relative path.
    pub files: BTreeMap<String, FileEntry>,
    /// Digests of the manifests that were loaded, in load order.
    pub manifests: Vec<String>,
}

impl RetrievedTree {
    fn merge(&mut self, digest: &str, manifest: Manifest) {
        self.manifests.push(digest.to_string());
        if self.command.is_none() {
            self.command = manifest.command;
        }
        if self.relative_cwd.is_none() {
            self.relative_cwd = manifest.relative_cwd;
        }
        self.read_only |= manifest.read_only.unwrap_or(false);
        for (path, entry) in manifest.files {
            self.files.entry(path).or_insert(entry);
        }
    }

    /// Distinct blobs to fetch, by digest.
    fn blobs(&self) -> BTreeMap<&str, u64> {
        self.files
            .values()
            .filter_map(|entry| match entry {
                FileEntry::Blob { digest, size, .. } => Some((digest.as_str(), *size)),
                FileEntry::Symlink { .. } => None,
            })
            .collect()
    }
}

/// Retrieve the tree rooted at manifest `root_digest` into `outdir`.
///
/// `coordinator` must fetch from the content store (e.g. with a
/// `FetchHandler`); blobs land in `cache` first and are then copied out.
/// Every manifest must match `flavor` (or name no flavor).
pub async fn retrieve_tree(
    coordinator: &TransferCoordinator,
    cache: &DiskCache,
    root_digest: &str,
    outdir: &Path,
    flavor: &str,
) -> Result<RetrievedTree, RetrieveError> {
    if !is_valid_digest(root_digest) {
        return Err(ConfigError::InvalidDigest {
            value: root_digest.to_string(),
        }
        .into());
    }

    let tree = load_manifests(coordinator, root_digest, flavor).await?;
    for path in tree.files.keys() {
        check_relative_path(path)?;
    }
    info!(
        manifests = tree.manifests.len(),
        files = tree.files.len(),
        "Loaded manifest tree"
    );

    fetch_blobs(coordinator, cache, &tree).await?;
    materialize(cache, &tree, outdir).await?;

    if let Err(e) = cache.trim() {
        warn!(error = %e, "Failed to trim cache");
    }
    Ok(tree)
}

async fn load_manifests(
    coordinator: &TransferCoordinator,
    root_digest: &str,
    flavor: &str,
) -> Result<RetrievedTree, RetrieveError> {
    let mut tree = RetrievedTree::default();
    let mut seen = HashSet::from([root_digest.to_string()]);
    let mut level = vec![root_digest.to_string()];

    while !level.is_empty() {
        let mut fetched = fetch_manifests(coordinator, &level).await?;
        let mut next = Vec::new();
        for digest in &level {
            let data = fetched
                .remove(digest)
                .ok_or_else(|| RetrieveError::ManifestUnavailable {
                    digest: digest.clone(),
                    source: TransferError::unavailable(digest),
                })?;
            let manifest = Manifest::load_bytes(&data)?;
            manifest.check_flavor(flavor)?;
            debug!(manifest = %digest, includes = manifest.includes.len(), "Loaded manifest");
            next.extend(
                manifest
                    .includes
                    .iter()
                    .filter(|include| seen.insert((*include).clone()))
                    .cloned(),
            );
            tree.merge(digest, manifest);
        }
        level = next;
    }
    Ok(tree)
}

/// Fetch one level of manifests concurrently, by digest.
async fn fetch_manifests(
    coordinator: &TransferCoordinator,
    digests: &[String],
) -> Result<HashMap<String, Bytes>, RetrieveError> {
    for digest in digests {
        coordinator.add_item(Priority::High, digest.clone(), Destination::Memory, None)?;
    }

    let mut fetched = HashMap::new();
    let mut failure = None;
    for result in coordinator.wait_for(digests).await {
        match result.outcome {
            TransferOutcome::Success(TransferPayload::Bytes(data)) => {
                fetched.insert(result.item_name, data);
            }
            TransferOutcome::Success(other) => {
                warn!(manifest = %result.item_name, payload = ?other, "Unexpected manifest payload");
                failure.get_or_insert(RetrieveError::ManifestUnavailable {
                    digest: result.item_name,
                    source: TransferError::other("manifest was not fetched into memory"),
                });
            }
            TransferOutcome::Failure(source) => {
                failure.get_or_insert(RetrieveError::ManifestUnavailable {
                    digest: result.item_name,
                    source,
                });
            }
        }
    }

    failure.map_or(Ok(fetched), Err)
}

async fn fetch_blobs(
    coordinator: &TransferCoordinator,
    cache: &DiskCache,
    tree: &RetrievedTree,
) -> Result<(), RetrieveError> {
    let mut scheduled = HashSet::new();
    for (digest, size) in tree.blobs() {
        if cache.contains(digest, Some(size)) {
            continue;
        }
        coordinator.add_item(
            Priority::Med,
            digest,
            Destination::file(cache.path_for(digest)),
            Some(size),
        )?;
        scheduled.insert(digest.to_string());
    }
    debug!(scheduled = scheduled.len(), "Fetching missing blobs");

    let names: Vec<String> = scheduled.iter().cloned().collect();
    for result in coordinator.wait_for(&names).await {
        match result.outcome {
            TransferOutcome::Success(_) => {
                scheduled.remove(&result.item_name);
            }
            TransferOutcome::Failure(err) => {
                warn!(blob = %result.item_name, error = %err, "Blob transfer failed");
            }
        }
    }
    if scheduled.is_empty() {
        return Ok(());
    }
    let mut digests: Vec<String> = scheduled.into_iter().collect();
    digests.sort();
    Err(RetrieveError::MissingFiles { digests })
}

async fn materialize(
    cache: &DiskCache,
    tree: &RetrievedTree,
    outdir: &Path,
) -> Result<(), RetrieveError> {
    for (relative, entry) in &tree.files {
        let target = outdir.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RetrieveError::io(parent, &e))?;
        }
        match entry {
            FileEntry::Blob { digest, mode, .. } => {
                tokio::fs::copy(cache.path_for(digest), &target)
                    .await
                    .map_err(|e| RetrieveError::io(&target, &e))?;
                apply_mode(&target, *mode, tree.read_only).await?;
            }
            FileEntry::Symlink { target: link, .. } => {
                create_symlink(link, &target).await?;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn apply_mode(path: &Path, mode: Option<u32>, read_only: bool) -> Result<(), RetrieveError> {
    use std::os::unix::fs::PermissionsExt;

    if mode.is_none() && !read_only {
        return Ok(());
    }
    let current = tokio::fs::metadata(path)
        .await
        .map_err(|e| RetrieveError::io(path, &e))?
        .permissions()
        .mode();
    let mut mode = mode.unwrap_or(current) & 0o7777;
    if read_only {
        mode &= !0o222;
    }
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| RetrieveError::io(path, &e))
}

#[cfg(not(unix))]
async fn apply_mode(path: &Path, _mode: Option<u32>, read_only: bool) -> Result<(), RetrieveError> {
    if !read_only {
        return Ok(());
    }
    let mut permissions = tokio::fs::metadata(path)
        .await
        .map_err(|e| RetrieveError::io(path, &e))?
        .permissions();
    permissions.set_readonly(true);
    tokio::fs::set_permissions(path, permissions)
        .await
        .map_err(|e| RetrieveError::io(path, &e))
}

#[cfg(unix)]
async fn create_symlink(link: &str, path: &Path) -> Result<(), RetrieveError> {
    tokio::fs::symlink(link, path)
        .await
        .map_err(|e| RetrieveError::io(path, &e))
}

#[cfg(not(unix))]
async fn create_symlink(link: &str, path: &Path) -> Result<(), RetrieveError> {
    tokio::fs::symlink_file(link, path)
        .await
        .map_err(|e| RetrieveError::io(path, &e))
}

/// Reject entry paths that would land outside the output directory.
fn check_relative_path(path: &str) -> Result<(), ConfigError> {
    let escapes = Path::new(path)
        .components()
        .any(|component| !matches!(component, Component::Normal(_)));
    if path.is_empty() || escapes {
        return Err(ConfigError::InvalidFileEntry {
            path: path.to_string(),
            reason: "path must stay inside the output directory".to_string(),
        });
    }
    Ok(())
}

/// Working directory of a retrieved tree.
pub fn working_dir(tree: &RetrievedTree, outdir: &Path) -> PathBuf {
    tree.relative_cwd
        .as_deref()
        .map_or_else(|| outdir.to_path_buf(), |cwd| outdir.join(cwd))
}
