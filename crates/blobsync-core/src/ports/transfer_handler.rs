//! Transfer handler port.
//!
//! A handler executes one item end to end (request, validation, local I/O).
//! The coordinator's workers call it once per item and never retry at their
//! level; transport retries belong to the channel.

use async_trait::async_trait;

use crate::transfer::{Item, TransferError, TransferPayload};

/// Executes a single transfer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransferHandler: Send + Sync {
    /// Move `item` and report what was produced.
    async fn transfer(&self, item: &Item) -> Result<TransferPayload, TransferError>;
}
