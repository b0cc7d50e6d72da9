//! Port definitions (trait seams between the crates).
//!
//! - [`ChannelPort`] is implemented by `blobsync-http`.
//! - [`TransferHandler`] is implemented by `blobsync-transfer` and consumed by
//!   its coordinator.

mod channel;
mod transfer_handler;

pub use channel::{
    ChannelPort, ChannelRequest, ChannelResponse, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT,
    RequestBody,
};
pub use transfer_handler::TransferHandler;
