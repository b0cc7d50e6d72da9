//! Worker loop.
//!
//! A worker is a pure consumer: pop item, run the handler, publish the
//! result, repeat. It never holds state across items and only talks to the
//! rest of the coordinator through the work and result queues.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use blobsync_core::{Item, TransferError, TransferResult};
use futures_util::FutureExt;
use tracing::{debug, error};

use super::Shared;

/// Run one worker until the coordinator is shut down.
pub(super) async fn run_worker(shared: Arc<Shared>, worker_id: usize) {
    debug!(worker_id, "Transfer worker started");
    loop {
        if shared.cancel.is_cancelled() {
            break;
        }

        let Some(item) = shared.pop() else {
            tokio::select! {
                () = shared.cancel.cancelled() => break,
                () = shared.work_ready.notified() => continue,
            }
        };

        let result = run_item(&shared, &item).await;
        shared.publish(result);
    }
    debug!(worker_id, "Transfer worker stopped");
}

/// Execute one item. Handler panics become failures so the item still
/// yields exactly one result.
async fn run_item(shared: &Shared, item: &Item) -> TransferResult {
    debug!(item = %item.name(), priority = %item.priority(), "Transferring");
    let outcome = AssertUnwindSafe(shared.handler.transfer(item))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(item = %item.name(), panic = %message, "Transfer handler panicked");
            Err(TransferError::other(format!("handler panicked: {message}")))
        });
    TransferResult::from_result(item.name(), outcome)
}
