//! Whole-record last-write-wins merge.

use notesync_domain::{NoteRecord, PageNoteRecord};

/// A record that can absorb a later version of itself.
pub trait LastWriteWins {
    /// Key under which versions of the same entity are merged.
    fn identity_key(&self) -> String;

    fn updated_at(&self) -> i64;

    /// Shallow overwrite: every field present in `incoming` replaces ours,
    /// and `updated_at` becomes the larger of the two timestamps.
    fn merge_from(&mut self, incoming: Self);
}

impl LastWriteWins for NoteRecord {
    fn identity_key(&self) -> String {
        self.id.clone()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn merge_from(&mut self, incoming: Self) {
        let updated_at = self.updated_at.max(incoming.updated_at);
        self.fields.extend(incoming.fields);
        self.updated_at = updated_at;
    }
}

impl LastWriteWins for PageNoteRecord {
    fn identity_key(&self) -> String {
        self.page_key()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn merge_from(&mut self, incoming: Self) {
        let updated_at = self.updated_at.max(incoming.updated_at);
        if incoming.id.is_some() {
            self.id = incoming.id;
        }
        self.fields.extend(incoming.fields);
        self.updated_at = updated_at;
    }
}

/// Side that won a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSource {
    Local,
    Remote,
}

/// Pick between a local and a remote version of one record.
///
/// Local wins only when strictly newer; ties go to the server.
pub fn resolve_conflict<T: LastWriteWins>(local: T, remote: T) -> (ConflictSource, T) {
    if local.updated_at() > remote.updated_at() {
        (ConflictSource::Local, local)
    } else {
        (ConflictSource::Remote, remote)
    }
}
