//! Queue item types (internal implementation).

use std::cmp::Ordering;

use blobsync_core::{Item, Priority};

/// An item waiting in the work queue.
#[derive(Clone, Debug)]
pub struct QueuedItem {
    /// The item to transfer.
    pub item: Item,
    /// Enqueue order, used to keep FIFO within a priority bucket.
    pub seq: u64,
}

impl QueuedItem {
    pub const fn new(item: Item, seq: u64) -> Self {
        Self { item, seq }
    }

    const fn key(&self) -> (Priority, u64) {
        (self.item.priority(), self.seq)
    }
}

impl PartialEq for QueuedItem {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueuedItem {}

impl PartialOrd for QueuedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedItem {
    /// Reversed so that `BinaryHeap` (a max-heap) pops the highest priority,
    /// oldest item first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}
