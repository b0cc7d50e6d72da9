#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

// Re-export core types for convenience
pub use blobsync_core::{
    Destination, Item, Priority, TransferError, TransferHandler, TransferOutcome, TransferPayload,
    TransferResult,
};

// Internal modules
mod cache;
mod config;
mod coordinator;
mod error;
mod handlers;
pub(crate) mod queue;
mod retrieve;

pub use cache::{CachePolicies, DiskCache};
pub use config::{
    Compression, CoordinatorConfig, DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_CONCURRENT, StoreConfig,
};
pub use coordinator::TransferCoordinator;
pub use error::RetrieveError;
pub use handlers::{
    FetchHandler, LocalStoreHandler, PushHandler, decode, deflate, encode, inflate, verify_size,
};
pub use retrieve::{RetrievedTree, retrieve_tree, working_dir};
