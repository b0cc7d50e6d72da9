//! A content store that is a plain local directory.

use std::path::PathBuf;

use async_trait::async_trait;
use blobsync_core::{Destination, Item, TransferError, TransferHandler, TransferPayload};
use bytes::Bytes;
use tracing::debug;

use super::{codec, write_atomic};

/// Serves items from `root/<name>`, uncompressed.
///
/// Used when the store location is a filesystem path rather than a URL.
#[derive(Debug, Clone)]
pub struct LocalStoreHandler {
    root: PathBuf,
}

impl LocalStoreHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TransferHandler for LocalStoreHandler {
    async fn transfer(&self, item: &Item) -> Result<TransferPayload, TransferError> {
        let source = self.root.join(item.name());
        let data = match tokio::fs::read(&source).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::unavailable(item.name()));
            }
            Err(e) => return Err(e.into()),
        };

        let size = data.len() as u64;
        codec::verify_size(item.name(), item.expected_size(), size)?;
        debug!(item = %item.name(), source = %source.display(), size, "Copied from local store");

        match item.destination() {
            Destination::Memory => Ok(TransferPayload::Bytes(Bytes::from(data))),
            Destination::File(path) => {
                write_atomic(path, &data).await?;
                Ok(TransferPayload::Stored {
                    path: path.clone(),
                    size,
                })
            }
        }
    }
}
