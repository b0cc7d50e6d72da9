//! Transfer domain: items, priorities, results and errors.

mod errors;
mod types;

pub use errors::TransferError;
pub use types::{Destination, Item, Priority, TransferOutcome, TransferPayload, TransferResult};
