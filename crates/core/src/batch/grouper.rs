//! Batch grouper

use std::collections::HashMap;
use std::hash::Hash;

use notesync_domain::{
    BatchRequest, EntityPayload, EntityRef, Mutation, NoteRecord, PageNoteRecord, SyncItem,
};

use super::merge::LastWriteWins;
use crate::queue::SyncQueue;

/// A batch ready for submission plus the exact items it was built from.
#[derive(Debug, Clone)]
pub struct GroupedBatch {
    pub request: BatchRequest,
    pub items: Vec<SyncItem>,
}

impl GroupedBatch {
    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }
}

/// Take up to `batch_size` items from the head of `queue` and group them.
///
/// Returns `None` when the queue is empty.
pub fn next_batch(queue: &mut SyncQueue, batch_size: usize) -> Option<GroupedBatch> {
    let items = queue.take_batch(batch_size);
    if items.is_empty() {
        return None;
    }
    let request = group(&items);
    Some(GroupedBatch { request, items })
}

/// Group `items`, in arrival order, into one request.
///
/// Every list is ordered by the first time its key was seen.
pub fn group(items: &[SyncItem]) -> BatchRequest {
    let mut notes = KeyedList::default();
    let mut page_notes = KeyedList::default();
    let mut deletions: KeyedList<EntityRef, EntityRef> = KeyedList::default();
    let mut files = Vec::new();

    for item in items {
        match &item.mutation {
            Mutation::Delete(target) => {
                deletions.upsert(target.clone(), target.clone(), |existing, incoming| {
                    *existing = incoming;
                });
            }
            Mutation::Create(payload) | Mutation::Update(payload) => match payload {
                EntityPayload::Note(note) => {
                    notes.upsert(note.identity_key(), note.clone(), NoteRecord::merge_from);
                }
                EntityPayload::PageNote(page) => {
                    page_notes.upsert(
                        page.identity_key(),
                        page.clone(),
                        PageNoteRecord::merge_from,
                    );
                }
                EntityPayload::File(file) => files.push(file.clone()),
            },
        }
    }

    BatchRequest {
        notes: notes.into_entries(),
        page_notes: page_notes.into_entries(),
        files,
        deletions: deletions.into_entries(),
    }
}

/// Insertion-ordered map that merges entries sharing a key.
struct KeyedList<K, T> {
    positions: HashMap<K, usize>,
    entries: Vec<T>,
}

impl<K, T> Default for KeyedList<K, T> {
    fn default() -> Self {
        Self { positions: HashMap::new(), entries: Vec::new() }
    }
}

impl<K: Eq + Hash, T> KeyedList<K, T> {
    fn upsert(&mut self, key: K, incoming: T, merge: impl FnOnce(&mut T, T)) {
        if let Some(existing) = self.positions.get(&key).and_then(|&at| self.entries.get_mut(at)) {
            merge(existing, incoming);
            return;
        }
        self.positions.insert(key, self.entries.len());
        self.entries.push(incoming);
    }

    fn into_entries(self) -> Vec<T> {
        self.entries
    }
}
