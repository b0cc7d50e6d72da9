//! Transfer coordinator.
//!
//! # Concurrency Model
//!
//! - Fixed pool of tokio worker tasks, started on construction
//! - One shared priority work queue and one shared result queue; these are
//!   the only synchronization points between workers and the caller
//! - `Notify` for wake-on-work
//! - `CancellationToken` to stop idle workers on shutdown
//!
//! Every enqueued item yields exactly one [`TransferResult`]: handler
//! failures and panics become `Failure` results, and items still queued at
//! shutdown fail with [`TransferError::Closed`]. Results received while
//! waiting for specific items ([`TransferCoordinator::wait_for`]) are parked
//! and handed out later, never dropped.

mod worker;

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blobsync_core::{
    Destination, Item, Priority, TransferError, TransferHandler, TransferOutcome, TransferResult,
};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::CoordinatorConfig;
use crate::queue::WorkQueue;

/// State shared between the coordinator and its workers.
pub(crate) struct Shared {
    handler: Arc<dyn TransferHandler>,
    queue: Mutex<WorkQueue>,
    work_ready: Notify,
    results: mpsc::UnboundedSender<TransferResult>,
    cancel: CancellationToken,
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, WorkQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the next item, waking another worker if more remain.
    fn pop(&self) -> Option<Item> {
        let mut queue = self.lock_queue();
        let item = queue.pop();
        if item.is_some() && !queue.is_empty() {
            self.work_ready.notify_one();
        }
        item
    }

    fn publish(&self, result: TransferResult) {
        if self.results.send(result).is_err() {
            debug!("Result queue closed, dropping result");
        }
    }
}

/// Caller side of the result queue.
struct ResultQueue {
    receiver: mpsc::UnboundedReceiver<TransferResult>,
    /// Received but not yet handed out, in completion order.
    parked: VecDeque<TransferResult>,
}

/// Schedules items over a bounded worker pool and collects their results.
///
/// Must be created inside a tokio runtime.
pub struct TransferCoordinator {
    shared: Arc<Shared>,
    results: tokio::sync::Mutex<ResultQueue>,
    /// Items accepted by `add_item`. Only changes under the queue lock.
    enqueued: AtomicUsize,
    /// Results handed to the caller. Only changes under the results lock.
    delivered: AtomicUsize,
    closed: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TransferCoordinator {
    /// Start `config.max_concurrent` workers executing `handler`.
    pub fn new(handler: Arc<dyn TransferHandler>, config: &CoordinatorConfig) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            handler,
            queue: Mutex::new(WorkQueue::new()),
            work_ready: Notify::new(),
            results: results_tx,
            cancel: CancellationToken::new(),
        });

        let max_concurrent = config.max_concurrent.max(1);
        debug!(max_concurrent, "Starting transfer coordinator");
        let workers = (0..max_concurrent)
            .map(|worker_id| tokio::spawn(worker::run_worker(Arc::clone(&shared), worker_id)))
            .collect();

        Self {
            shared,
            results: tokio::sync::Mutex::new(ResultQueue {
                receiver: results_rx,
                parked: VecDeque::new(),
            }),
            enqueued: AtomicUsize::new(0),
            delivered: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            workers: Mutex::new(workers),
        }
    }

    /// Enqueue a transfer. Never blocks.
    ///
    /// Fails on an empty name or after [`shutdown`](Self::shutdown).
    pub fn add_item(
        &self,
        priority: Priority,
        name: impl Into<String>,
        destination: Destination,
        expected_size: Option<u64>,
    ) -> Result<(), TransferError> {
        let item = Item::new(priority, name, destination, expected_size)?;
        self.add(item)
    }

    /// Enqueue an already built item.
    pub fn add(&self, item: Item) -> Result<(), TransferError> {
        {
            let mut queue = self.shared.lock_queue();
            if self.closed.load(Ordering::Acquire) {
                return Err(TransferError::Closed);
            }
            debug!(item = %item.name(), priority = %item.priority(), "Enqueued");
            queue.push(item);
            self.enqueued.fetch_add(1, Ordering::AcqRel);
        }
        self.shared.work_ready.notify_one();
        Ok(())
    }

    /// Convenience for fetching into a file.
    pub fn add_fetch(
        &self,
        priority: Priority,
        digest: impl Into<String>,
        path: impl Into<PathBuf>,
        expected_size: Option<u64>,
    ) -> Result<(), TransferError> {
        self.add_item(priority, digest, Destination::file(path), expected_size)
    }

    /// Items enqueued but not yet handed back to the caller.
    pub fn outstanding(&self) -> usize {
        self.enqueued
            .load(Ordering::Acquire)
            .saturating_sub(self.delivered.load(Ordering::Acquire))
    }

    /// Items still waiting for a worker.
    pub fn pending(&self) -> usize {
        self.shared.lock_queue().len()
    }

    /// Items of `priority` still waiting for a worker.
    pub fn pending_in(&self, priority: Priority) -> usize {
        self.shared.lock_queue().pending_in(priority)
    }

    /// Wait for the next completed item.
    ///
    /// Returns results in completion order and never returns the same item
    /// twice. Returns `None` immediately when nothing is outstanding.
    pub async fn get_one_result(&self) -> Option<TransferResult> {
        let mut results = self.results.lock().await;
        if self.outstanding() == 0 {
            return None;
        }
        let result = match results.parked.pop_front() {
            Some(result) => result,
            None => results.receiver.recv().await?,
        };
        self.delivered.fetch_add(1, Ordering::AcqRel);
        Some(result)
    }

    /// Wait for the results of the named items only.
    ///
    /// A name listed `n` times collects `n` results. Results of other items
    /// that complete meanwhile are kept for later [`get_one_result`] and
    /// [`join`] calls. Stops early if no listed item can still complete.
    ///
    /// [`get_one_result`]: Self::get_one_result
    /// [`join`]: Self::join
    pub async fn wait_for(&self, names: &[String]) -> Vec<TransferResult> {
        let mut wanted: HashMap<&str, usize> = HashMap::new();
        for name in names {
            *wanted.entry(name.as_str()).or_default() += 1;
        }

        let mut results = self.results.lock().await;
        let mut collected = Vec::new();
        let parked = std::mem::take(&mut results.parked);
        for result in parked {
            if take_wanted(&mut wanted, &result.item_name) {
                collected.push(result);
            } else {
                results.parked.push_back(result);
            }
        }

        while !wanted.is_empty() {
            let in_flight = self
                .outstanding()
                .saturating_sub(results.parked.len() + collected.len());
            if in_flight == 0 {
                debug!(missing = wanted.len(), "Waited-for items were never enqueued");
                break;
            }
            let Some(result) = results.receiver.recv().await else {
                break;
            };
            if take_wanted(&mut wanted, &result.item_name) {
                collected.push(result);
            } else {
                debug!(item = %result.item_name, "Parking result for a later caller");
                results.parked.push_back(result);
            }
        }

        self.delivered.fetch_add(collected.len(), Ordering::AcqRel);
        collected
    }

    /// Wait for every outstanding item and return the names that succeeded.
    ///
    /// Failures are logged and omitted; they never abort the batch.
    pub async fn join(&self) -> Vec<String> {
        let mut succeeded = Vec::new();
        while let Some(result) = self.get_one_result().await {
            match result.outcome {
                TransferOutcome::Success(_) => succeeded.push(result.item_name),
                TransferOutcome::Failure(err) => {
                    warn!(item = %result.item_name, error = %err, "Transfer failed");
                }
            }
        }
        succeeded
    }

    /// Stop accepting items and stop the workers.
    ///
    /// In-flight transfers run to completion; items still queued fail with
    /// [`TransferError::Closed`]. Their results remain collectable.
    pub fn shutdown(&self) {
        let drained = {
            let mut queue = self.shared.lock_queue();
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            queue.drain()
        };
        debug!(dropped = drained.len(), "Shutting down transfer coordinator");
        for item in drained {
            self.shared
                .publish(TransferResult::from_result(item.name(), Err(TransferError::Closed)));
        }
        self.shared.cancel.cancel();
    }

    /// Shut down and wait for every worker to exit.
    pub async fn close(&self) {
        self.shutdown();
        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "Transfer worker ended abnormally");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Count one arrival of `name` against `wanted`.
fn take_wanted(wanted: &mut HashMap<&str, usize>, name: &str) -> bool {
    let Some(count) = wanted.get_mut(name) else {
        return false;
    };
    *count -= 1;
    if *count == 0 {
        wanted.remove(name);
    }
    true
}

impl Drop for TransferCoordinator {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use blobsync_core::TransferPayload;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Echoes the item name as payload; names starting with `fail` fail and
    /// `panic` panics.
    struct EchoHandler;

    #[async_trait]
    impl TransferHandler for EchoHandler {
        async fn transfer(&self, item: &Item) -> Result<TransferPayload, TransferError> {
            if item.name().starts_with("fail") {
                return Err(TransferError::unavailable(item.name()));
            }
            assert!(!item.name().starts_with("panic"), "boom");
            Ok(TransferPayload::Bytes(Bytes::from(item.name().to_string())))
        }
    }

    /// Blocks every transfer until a permit is released.
    struct GatedHandler {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl TransferHandler for GatedHandler {
        async fn transfer(&self, item: &Item) -> Result<TransferPayload, TransferError> {
            let permit = self.gate.acquire().await.map_err(|e| TransferError::other(e.to_string()))?;
            permit.forget();
            Ok(TransferPayload::Uploaded {
                size: item.name().len() as u64,
            })
        }
    }

    /// Tracks how many transfers run at once; each holds for a short while.
    #[derive(Default)]
    struct InFlightHandler {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TransferHandler for InFlightHandler {
        async fn transfer(&self, _item: &Item) -> Result<TransferPayload, TransferError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(TransferPayload::Uploaded { size: 0 })
        }
    }

    fn coordinator(handler: impl TransferHandler + 'static, workers: usize) -> TransferCoordinator {
        TransferCoordinator::new(
            Arc::new(handler),
            &CoordinatorConfig::new().with_max_concurrent(workers),
        )
    }

    #[tokio::test]
    async fn test_get_one_result_with_nothing_outstanding() {
        let coordinator = coordinator(EchoHandler, 2);
        assert!(coordinator.get_one_result().await.is_none());
        assert!(coordinator.join().await.is_empty());
    }

    #[tokio::test]
    async fn test_single_item_round_trip() {
        let coordinator = coordinator(EchoHandler, 2);
        coordinator
            .add_item(Priority::High, "abc", Destination::Memory, None)
            .unwrap();

        let result = coordinator.get_one_result().await.unwrap();
        assert_eq!(result.item_name, "abc");
        assert_eq!(
            result.into_result().unwrap(),
            TransferPayload::Bytes(Bytes::from_static(b"abc"))
        );
        assert_eq!(coordinator.outstanding(), 0);
        assert!(coordinator.get_one_result().await.is_none());
    }

    #[tokio::test]
    async fn test_add_item_rejects_empty_name() {
        let coordinator = coordinator(EchoHandler, 1);
        let err = coordinator
            .add_item(Priority::Med, "", Destination::Memory, None)
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidItem { .. }));
        assert_eq!(coordinator.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_siblings() {
        let coordinator = coordinator(EchoHandler, 4);
        for name in ["ok1", "fail1", "ok2", "fail2", "ok3"] {
            coordinator
                .add_item(Priority::Med, name, Destination::Memory, None)
                .unwrap();
        }

        let mut succeeded = coordinator.join().await;
        succeeded.sort();
        assert_eq!(succeeded, vec!["ok1", "ok2", "ok3"]);
        assert!(coordinator.join().await.is_empty());
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let coordinator = coordinator(EchoHandler, 1);
        coordinator
            .add_item(Priority::Med, "panic-now", Destination::Memory, None)
            .unwrap();
        coordinator
            .add_item(Priority::Med, "after", Destination::Memory, None)
            .unwrap();

        let first = coordinator.get_one_result().await.unwrap();
        assert_eq!(first.item_name, "panic-now");
        assert!(matches!(first.error(), Some(TransferError::Other { .. })));

        // The worker survives the panic.
        let second = coordinator.get_one_result().await.unwrap();
        assert!(second.is_success());
    }

    #[tokio::test]
    async fn test_priority_dispatch_order() {
        let gate = Arc::new(Semaphore::new(0));
        let coordinator = coordinator(GatedHandler { gate: Arc::clone(&gate) }, 1);

        // The single worker picks this up and blocks on the gate.
        coordinator
            .add_item(Priority::Low, "first", Destination::Memory, None)
            .unwrap();
        while coordinator.pending() > 0 {
            tokio::task::yield_now().await;
        }

        for (priority, name) in [
            (Priority::Low, "low1"),
            (Priority::Med, "med1"),
            (Priority::High, "high1"),
            (Priority::Low, "low2"),
            (Priority::High, "high2"),
            (Priority::Med, "med2"),
        ] {
            coordinator
                .add_item(priority, name, Destination::Memory, None)
                .unwrap();
        }

        let mut order = Vec::new();
        for _ in 0..7 {
            gate.add_permits(1);
            order.push(coordinator.get_one_result().await.unwrap().item_name);
        }
        assert_eq!(
            order,
            vec!["first", "high1", "high2", "med1", "med2", "low1", "low2"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bounded_by_max_concurrent() {
        const WORKERS: usize = 4;
        let handler = Arc::new(InFlightHandler::default());
        let coordinator = TransferCoordinator::new(
            Arc::clone(&handler) as Arc<dyn TransferHandler>,
            &CoordinatorConfig::new().with_max_concurrent(WORKERS),
        );
        for i in 0..WORKERS * 3 {
            coordinator
                .add_item(Priority::Med, format!("obj{i}"), Destination::Memory, None)
                .unwrap();
        }

        assert_eq!(coordinator.join().await.len(), WORKERS * 3);
        let peak = handler.peak.load(Ordering::SeqCst);
        assert!(peak > 1, "transfers never overlapped");
        assert!(peak <= WORKERS, "{peak} transfers ran at once");
        assert_eq!(handler.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wait_for_parks_other_results() {
        let coordinator = coordinator(EchoHandler, 1);
        for name in ["theirs1", "mine", "theirs2"] {
            coordinator
                .add_item(Priority::Med, name, Destination::Memory, None)
                .unwrap();
        }

        let mine = coordinator.wait_for(&["mine".to_string()]).await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].item_name, "mine");
        assert_eq!(coordinator.outstanding(), 2);

        let mut rest = coordinator.join().await;
        rest.sort();
        assert_eq!(rest, vec!["theirs1", "theirs2"]);
    }

    #[tokio::test]
    async fn test_wait_for_takes_parked_results_and_stops_on_unknown_names() {
        let coordinator = coordinator(EchoHandler, 2);
        for name in ["a", "b"] {
            coordinator
                .add_item(Priority::Med, name, Destination::Memory, None)
                .unwrap();
        }

        // "a" may complete first and get parked here.
        let b = coordinator.wait_for(&["b".to_string()]).await;
        assert_eq!(b[0].item_name, "b");

        let found = coordinator
            .wait_for(&["a".to_string(), "never-added".to_string()])
            .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].item_name, "a");
        assert_eq!(coordinator.outstanding(), 0);
        assert!(coordinator.get_one_result().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_fails_queued_items() {
        let gate = Arc::new(Semaphore::new(0));
        let coordinator = coordinator(GatedHandler { gate: Arc::clone(&gate) }, 1);

        coordinator
            .add_item(Priority::Med, "inflight", Destination::Memory, None)
            .unwrap();
        while coordinator.pending() > 0 {
            tokio::task::yield_now().await;
        }
        coordinator
            .add_item(Priority::Med, "queued", Destination::Memory, None)
            .unwrap();

        coordinator.shutdown();
        assert!(coordinator.is_closed());
        assert_eq!(
            coordinator.add_item(Priority::Med, "late", Destination::Memory, None),
            Err(TransferError::Closed)
        );

        let queued = coordinator.get_one_result().await.unwrap();
        assert_eq!(queued.item_name, "queued");
        assert_eq!(queued.error(), Some(&TransferError::Closed));

        // The in-flight item still completes.
        gate.add_permits(1);
        let inflight = tokio::time::timeout(Duration::from_secs(5), coordinator.get_one_result())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inflight.item_name, "inflight");
        assert!(inflight.is_success());

        coordinator.close().await;
        assert_eq!(coordinator.outstanding(), 0);
    }
}
