//! Push local files to the remote content store.

use std::sync::Arc;

use async_trait::async_trait;
use blobsync_core::{
    ChannelPort, ChannelRequest, Destination, Item, TransferError, TransferHandler,
    TransferPayload,
};
use bytes::Bytes;
use tracing::debug;

use super::{codec, content_path, run_blocking};
use crate::config::StoreConfig;

const CONTENT_TYPE: &str = "application/octet-stream";

/// Uploads each item's file with a raw-bytes POST through the channel.
///
/// The item's destination is the file to read; memory destinations are
/// rejected.
pub struct PushHandler {
    channel: Arc<dyn ChannelPort>,
    config: StoreConfig,
}

impl PushHandler {
    pub fn new(channel: Arc<dyn ChannelPort>, config: StoreConfig) -> Self {
        Self { channel, config }
    }
}

#[async_trait]
impl TransferHandler for PushHandler {
    async fn transfer(&self, item: &Item) -> Result<TransferPayload, TransferError> {
        let Destination::File(source) = item.destination() else {
            return Err(TransferError::invalid_item(format!(
                "{}: push needs a file source",
                item.name()
            )));
        };

        let data = tokio::fs::read(source).await?;
        let size = data.len() as u64;
        codec::verify_size(item.name(), item.expected_size(), size)?;

        let compression = self.config.compression;
        let encoded = run_blocking(move || codec::encode(compression, &data)).await?;
        debug!(item = %item.name(), size, encoded = encoded.len(), "Pushing");

        let request = ChannelRequest::post_bytes(
            content_path("store", &self.config.namespace, item.name()),
            CONTENT_TYPE,
            Bytes::from(encoded),
        )
        .with_max_attempts(self.config.max_attempts)
        .with_timeout(self.config.timeout_for(Some(size)));

        self.channel
            .request(request)
            .await
            .ok_or_else(|| TransferError::unavailable(item.name()))?;
        Ok(TransferPayload::Uploaded { size })
    }
}
