//! Request body of the batch ingestion endpoint.

use serde::{Deserialize, Serialize};

use super::entity::{EntityRef, FileRecord, NoteRecord, PageNoteRecord};

/// One grouped, merged batch as sent to the server.
///
/// Notes and page notes hold at most one record per identity key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub notes: Vec<NoteRecord>,
    pub page_notes: Vec<PageNoteRecord>,
    pub files: Vec<FileRecord>,
    pub deletions: Vec<EntityRef>,
}

impl BatchRequest {
    /// Total number of records across all lists.
    pub fn record_count(&self) -> usize {
        self.notes.len() + self.page_notes.len() + self.files.len() + self.deletions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::entity::EntityType;

    #[test]
    fn serializes_all_lists_even_when_empty() {
        let batch = BatchRequest {
            deletions: vec![EntityRef::new(EntityType::File, "f1")],
            ..BatchRequest::default()
        };

        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({
                "notes": [],
                "pageNotes": [],
                "files": [],
                "deletions": [{"type": "file", "id": "f1"}]
            })
        );
        assert_eq!(batch.record_count(), 1);
        assert!(!batch.is_empty());
    }
}
