//! Work queue.
//!
//! A pure synchronous state machine: no async, no I/O, no tracing. The
//! coordinator owns the locking.
//!
//! # Dispatch order
//!
//! Priority bucket first (`High`, then `Med`, then `Low`), FIFO within a
//! bucket by enqueue order.

mod types;

use std::collections::BinaryHeap;

use blobsync_core::{Item, Priority};

pub use types::QueuedItem;

/// Priority-ordered queue of pending items.
#[derive(Debug, Default)]
pub struct WorkQueue {
    heap: BinaryHeap<QueuedItem>,
    next_seq: u64,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item. Returns its enqueue sequence number.
    pub fn push(&mut self, item: Item) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedItem::new(item, seq));
        seq
    }

    /// Take the next item in dispatch order.
    pub fn pop(&mut self) -> Option<Item> {
        self.heap.pop().map(|queued| queued.item)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of pending items in `priority`'s bucket.
    pub fn pending_in(&self, priority: Priority) -> usize {
        self.heap
            .iter()
            .filter(|queued| queued.item.priority() == priority)
            .count()
    }

    /// Remove every pending item, in dispatch order.
    pub fn drain(&mut self) -> Vec<Item> {
        std::iter::from_fn(|| self.pop()).collect()
    }
}
