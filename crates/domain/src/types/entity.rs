//! Entity records carried by sync items.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, SyncError};

/// Kind of entity a mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Note,
    PageNote,
    File,
}

impl EntityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::PageNote => "pageNote",
            Self::File => "file",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A note. Merged per `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub id: String,
    /// Last modification time in epoch milliseconds
    pub updated_at: i64,
    /// Remaining note fields, passed through untouched
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NoteRecord {
    pub fn new(id: impl Into<String>, updated_at: i64) -> Self {
        Self { id: id.into(), updated_at, fields: Map::new() }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// Notes attached to one page of one file of a note.
///
/// Identity is the `(noteId, fileId, pageNumber)` triple; `id` is optional
/// because page notes are often created before the server assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNoteRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub note_id: String,
    pub file_id: String,
    pub page_number: i64,
    pub updated_at: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PageNoteRecord {
    pub fn new(
        note_id: impl Into<String>,
        file_id: impl Into<String>,
        page_number: i64,
        updated_at: i64,
    ) -> Self {
        Self {
            id: None,
            note_id: note_id.into(),
            file_id: file_id.into(),
            page_number,
            updated_at,
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// `"{noteId}-{fileId}-{pageNumber}"`
    pub fn page_key(&self) -> String {
        format!("{}-{}-{}", self.note_id, self.file_id, self.page_number)
    }
}

/// An uploaded file's metadata. Never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl FileRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), fields: Map::new() }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// Record carried by a create or update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityPayload {
    Note(NoteRecord),
    PageNote(PageNoteRecord),
    File(FileRecord),
}

impl EntityPayload {
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::Note(_) => EntityType::Note,
            Self::PageNote(_) => EntityType::PageNote,
            Self::File(_) => EntityType::File,
        }
    }

    /// Decode `data` against the schema of `entity_type`.
    ///
    /// # Errors
    /// Returns `SyncError::InvalidPayload` when a required field is missing,
    /// has the wrong type, or an identity component is empty.
    pub fn decode(entity_type: EntityType, data: Value) -> Result<Self> {
        let invalid = |err: serde_json::Error| {
            SyncError::InvalidPayload(format!("{entity_type} payload: {err}"))
        };

        match entity_type {
            EntityType::Note => {
                let note: NoteRecord = serde_json::from_value(data).map_err(invalid)?;
                require_non_empty(entity_type, "id", &note.id)?;
                Ok(Self::Note(note))
            }
            EntityType::PageNote => {
                let page: PageNoteRecord = serde_json::from_value(data).map_err(invalid)?;
                require_non_empty(entity_type, "noteId", &page.note_id)?;
                require_non_empty(entity_type, "fileId", &page.file_id)?;
                Ok(Self::PageNote(page))
            }
            EntityType::File => {
                if !data.is_object() {
                    return Err(SyncError::InvalidPayload(format!(
                        "{entity_type} payload must be an object"
                    )));
                }
                let file: FileRecord = serde_json::from_value(data).map_err(invalid)?;
                Ok(Self::File(file))
            }
        }
    }
}

/// Deletion target; also the element type of the batch `deletions` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self { entity_type, id: id.into() }
    }
}

fn require_non_empty(entity_type: EntityType, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SyncError::InvalidPayload(format!(
            "{entity_type} payload: `{field}` must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn note_keeps_unknown_fields() {
        let payload = EntityPayload::decode(
            EntityType::Note,
            json!({"id": "n1", "updatedAt": 100, "title": "Lecture 3", "tags": ["exam"]}),
        )
        .unwrap();

        let EntityPayload::Note(note) = payload else { panic!("expected note") };
        assert_eq!(note.id, "n1");
        assert_eq!(note.updated_at, 100);
        assert_eq!(note.fields["title"], json!("Lecture 3"));
        assert_eq!(
            serde_json::to_value(&note).unwrap(),
            json!({"id": "n1", "updatedAt": 100, "title": "Lecture 3", "tags": ["exam"]})
        );
    }

    #[test]
    fn note_without_updated_at_is_rejected() {
        let err = EntityPayload::decode(EntityType::Note, json!({"id": "n1"})).unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload(msg) if msg.contains("updatedAt")));
    }

    #[test]
    fn note_with_string_timestamp_is_rejected() {
        let err = EntityPayload::decode(
            EntityType::Note,
            json!({"id": "n1", "updatedAt": "2024-01-01"}),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload(_)));
    }

    #[test]
    fn page_note_requires_key_parts() {
        let err = EntityPayload::decode(
            EntityType::PageNote,
            json!({"noteId": "n1", "pageNumber": 2, "updatedAt": 5}),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload(msg) if msg.contains("fileId")));

        let err = EntityPayload::decode(
            EntityType::PageNote,
            json!({"noteId": "", "fileId": "f1", "pageNumber": 2, "updatedAt": 5}),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload(msg) if msg.contains("noteId")));
    }

    #[test]
    fn page_key_joins_identity_triple() {
        let page = PageNoteRecord::new("n1", "f9", 4, 0);
        assert_eq!(page.page_key(), "n1-f9-4");
    }

    #[test]
    fn file_must_be_an_object() {
        assert!(EntityPayload::decode(EntityType::File, json!("blob")).is_err());
        let payload =
            EntityPayload::decode(EntityType::File, json!({"name": "slides.pdf"})).unwrap();
        assert_eq!(payload.entity_type(), EntityType::File);
    }

    #[test]
    fn entity_ref_uses_wire_names() {
        let deletion = EntityRef::new(EntityType::PageNote, "p1");
        assert_eq!(serde_json::to_value(deletion).unwrap(), json!({"type": "pageNote", "id": "p1"}));
    }
}
