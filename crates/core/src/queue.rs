//! FIFO of pending sync items.

use std::collections::VecDeque;

use notesync_domain::SyncItem;

/// Ordered pending items. Append at the tail, take from the head, and put
/// retried items back at the head.
#[derive(Debug, Default)]
pub struct SyncQueue {
    items: VecDeque<SyncItem>,
}

impl SyncQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `items` at the tail in order.
    pub fn append(&mut self, items: impl IntoIterator<Item = SyncItem>) {
        self.items.extend(items);
    }

    /// Remove up to `limit` items from the head, oldest first.
    pub fn take_batch(&mut self, limit: usize) -> Vec<SyncItem> {
        let count = limit.min(self.items.len());
        self.items.drain(..count).collect()
    }

    /// Put `items` back at the head, keeping their relative order.
    pub fn prepend(&mut self, items: Vec<SyncItem>) {
        for item in items.into_iter().rev() {
            self.items.push_front(item);
        }
    }

    /// Empty the queue and return how many items were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pending items, head first.
    pub fn iter(&self) -> impl Iterator<Item = &SyncItem> {
        self.items.iter()
    }
}
