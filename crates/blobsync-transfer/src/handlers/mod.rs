//! Transfer handlers: the per-item work executed by coordinator workers.

mod codec;
mod fetch;
mod local;
mod push;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use blobsync_core::TransferError;

pub use codec::{decode, deflate, encode, inflate, verify_size};
pub use fetch::FetchHandler;
pub use local::LocalStoreHandler;
pub use push::PushHandler;

/// Remote path of blob `name` for `action` (`retrieve` or `store`).
fn content_path(action: &str, namespace: &str, name: &str) -> String {
    format!("content/{action}/{namespace}/{name}")
}

/// Sibling of `path` used while a write is in progress.
fn partial_path(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    file_name.push(".partial");
    path.with_file_name(file_name)
}

/// Write `data` to `path` through a `.partial` sibling so a crash never
/// leaves a truncated file under the final name.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), TransferError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let partial = partial_path(path);
    tokio::fs::write(&partial, data).await?;
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}

/// Run CPU-bound codec work off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, TransferError>
where
    F: FnOnce() -> Result<T, TransferError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TransferError::other(format!("codec task failed: {e}")))?
}
