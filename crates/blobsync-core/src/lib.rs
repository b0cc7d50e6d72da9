#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod manifest;
pub mod ports;
pub mod transfer;

// Re-export commonly used types for convenience
pub use manifest::{ConfigError, FileEntry, Manifest};
pub use ports::{ChannelPort, ChannelRequest, ChannelResponse, RequestBody, TransferHandler};
pub use transfer::{
    Destination, Item, Priority, TransferError, TransferOutcome, TransferPayload, TransferResult,
};
