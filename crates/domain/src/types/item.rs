//! Pending mutations and their host wire shape.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use super::entity::{EntityPayload, EntityRef, EntityType};
use crate::errors::{Result, SyncError};

/// Mutation kind as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// What a sync item does to its entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(EntityPayload),
    Update(EntityPayload),
    /// Deletions only carry the target; they are never merged.
    Delete(EntityRef),
}

impl Mutation {
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::Create(payload) | Self::Update(payload) => payload.entity_type(),
            Self::Delete(target) => target.entity_type,
        }
    }

    pub const fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::Update(_) => Operation::Update,
            Self::Delete(_) => Operation::Delete,
        }
    }

    /// Build a mutation from the untyped `(type, operation, data)` triple.
    ///
    /// # Errors
    /// Returns `SyncError::InvalidPayload` if `data` does not match the
    /// schema of `entity_type`, or a deletion lacks a non-empty `id`.
    pub fn decode(entity_type: EntityType, operation: Operation, data: Value) -> Result<Self> {
        match operation {
            Operation::Delete => {
                let id = data
                    .get("id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| {
                        SyncError::InvalidPayload(format!(
                            "{entity_type} deletion requires a non-empty string `id`"
                        ))
                    })?;
                Ok(Self::Delete(EntityRef::new(entity_type, id)))
            }
            Operation::Create => EntityPayload::decode(entity_type, data).map(Self::Create),
            Operation::Update => EntityPayload::decode(entity_type, data).map(Self::Update),
        }
    }
}

/// A pending mutation owned by the sync queue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "SyncItemWire")]
pub struct SyncItem {
    /// Opaque id, assigned by the producer or at decode time
    pub id: String,
    pub mutation: Mutation,
    pub enqueued_at: DateTime<Utc>,
    /// Failed submissions this item took part in
    pub retry_count: u32,
}

impl SyncItem {
    /// New item with a fresh UUID v4 id.
    pub fn new(mutation: Mutation) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), mutation)
    }

    pub fn with_id(id: impl Into<String>, mutation: Mutation) -> Self {
        Self { id: id.into(), mutation, enqueued_at: Utc::now(), retry_count: 0 }
    }

    pub const fn entity_type(&self) -> EntityType {
        self.mutation.entity_type()
    }

    pub const fn operation(&self) -> Operation {
        self.mutation.operation()
    }

    pub const fn is_deletion(&self) -> bool {
        matches!(self.mutation, Mutation::Delete(_))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncItemWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    entity_type: EntityType,
    operation: Operation,
    data: Value,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    retry_count: u32,
}

impl TryFrom<SyncItemWire> for SyncItem {
    type Error = SyncError;

    fn try_from(wire: SyncItemWire) -> Result<Self> {
        let mutation = Mutation::decode(wire.entity_type, wire.operation, wire.data)?;

        let id = match wire.id {
            Some(id) if id.trim().is_empty() => {
                return Err(SyncError::InvalidPayload("item id must not be empty".into()));
            }
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };

        let enqueued_at = match wire.timestamp {
            Some(millis) => Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                SyncError::InvalidPayload(format!("timestamp {millis} is out of range"))
            })?,
            None => Utc::now(),
        };

        Ok(Self { id, mutation, enqueued_at, retry_count: wire.retry_count })
    }
}

#[derive(Serialize)]
struct DeletionData<'a> {
    id: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireData<'a> {
    Record(&'a EntityPayload),
    Deletion(DeletionData<'a>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncItemWireRef<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    entity_type: EntityType,
    operation: Operation,
    data: WireData<'a>,
    timestamp: i64,
    retry_count: u32,
}

impl Serialize for SyncItem {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = match &self.mutation {
            Mutation::Create(payload) | Mutation::Update(payload) => WireData::Record(payload),
            Mutation::Delete(target) => WireData::Deletion(DeletionData { id: &target.id }),
        };

        SyncItemWireRef {
            id: &self.id,
            entity_type: self.entity_type(),
            operation: self.operation(),
            data,
            timestamp: self.enqueued_at.timestamp_millis(),
            retry_count: self.retry_count,
        }
        .serialize(serializer)
    }
}
