//! Fetch blobs from the remote content store.

use std::sync::Arc;

use async_trait::async_trait;
use blobsync_core::{
    ChannelPort, ChannelRequest, Destination, Item, TransferError, TransferHandler,
    TransferPayload,
};
use bytes::Bytes;
use tracing::debug;

use super::{codec, content_path, run_blocking, write_atomic};
use crate::config::StoreConfig;

/// Downloads each item with a GET through the channel.
///
/// The store is eventually consistent, so 404 is retried. The payload is
/// decoded and size-checked before it is handed back or written; a corrupt
/// payload fails the item once and is not re-enqueued.
pub struct FetchHandler {
    channel: Arc<dyn ChannelPort>,
    config: StoreConfig,
}

impl FetchHandler {
    pub fn new(channel: Arc<dyn ChannelPort>, config: StoreConfig) -> Self {
        Self { channel, config }
    }

    fn request_for(&self, item: &Item) -> ChannelRequest {
        ChannelRequest::get(content_path("retrieve", &self.config.namespace, item.name()))
            .with_max_attempts(self.config.max_attempts)
            .with_timeout(self.config.timeout_for(item.expected_size()))
            .with_retry_404(true)
    }
}

#[async_trait]
impl TransferHandler for FetchHandler {
    async fn transfer(&self, item: &Item) -> Result<TransferPayload, TransferError> {
        let response = self
            .channel
            .request(self.request_for(item))
            .await
            .ok_or_else(|| TransferError::unavailable(item.name()))?;

        let name = item.name().to_string();
        let expected_size = item.expected_size();
        let compression = self.config.compression;
        let body = response.into_body();
        let data =
            run_blocking(move || codec::decode(&name, compression, &body, expected_size)).await?;

        let size = data.len() as u64;
        codec::verify_size(item.name(), item.expected_size(), size)?;
        debug!(item = %item.name(), size, "Fetched");

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
