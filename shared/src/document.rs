//! Document store wire model
//!
//! Types exchanged between the sync server and its clients:
//!
//! - [`Collection`] - the two entity collections and their order fields
//! - [`Document`] - one stored document (id + JSON fields)
//! - [`WriteBatch`] / [`DocumentWrite`] / [`FieldValue`] - atomic merge writes
//! - [`Snapshot`] - full ordered document set of one collection
//! - [`FeedEvent`] - what a realtime listener delivers
//!
//! Writes use merge semantics: only the named fields are written, all other
//! fields of the document are preserved, and a missing document is created.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::models::StatusColor;

/// SSE event name carrying a [`Snapshot`]
pub const SSE_EVENT_SNAPSHOT: &str = "snapshot";
/// SSE event name carrying an error message
pub const SSE_EVENT_ERROR: &str = "error";

/// Document field map
pub type Fields = serde_json::Map<String, Value>;

/// Entity collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Checks,
    Tables,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Checks, Collection::Tables];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Checks => "checks",
            Collection::Tables => "tables",
        }
    }

    /// Numeric field snapshots are ordered by (ascending)
    pub const fn order_field(&self) -> &'static str {
        match self {
            Collection::Checks => "checkNumber",
            Collection::Tables => "tableNumber",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown collection name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown collection: {0}")]
pub struct UnknownCollection(pub String);

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checks" => Ok(Collection::Checks),
            "tables" => Ok(Collection::Tables),
            other => Err(UnknownCollection(other.to_string())),
        }
    }
}

/// Stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Numeric order key of this document within `collection`
    pub fn order_key(&self, collection: Collection) -> Option<u64> {
        self.fields
            .get(collection.order_field())
            .and_then(Value::as_u64)
    }

    /// Decode into an entity, with the document id injected as `id`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let mut object = self.fields.clone();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(object))
    }
}

/// Value of one field in a merge write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Literal value; `null` clears the field
    Set(Value),
    /// Replaced by the commit time on the server
    ServerTimestamp,
}

impl FieldValue {
    pub fn set(value: impl Into<Value>) -> Self {
        FieldValue::Set(value.into())
    }

    pub fn null() -> Self {
        FieldValue::Set(Value::Null)
    }

    /// Resolve to the stored JSON value
    pub fn resolve(&self, commit_time: DateTime<Utc>) -> Value {
        match self {
            FieldValue::Set(value) => value.clone(),
            FieldValue::ServerTimestamp => Value::String(commit_time.to_rfc3339()),
        }
    }
}

impl From<StatusColor> for Value {
    fn from(color: StatusColor) -> Self {
        Value::String(color.as_str().to_string())
    }
}

/// Merge write of a single document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWrite {
    pub collection: Collection,
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
}

/// Ordered set of writes committed atomically
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    pub writes: Vec<DocumentWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a merge write (`set(..., {merge: true})`)
    pub fn set_merge<'a>(
        &mut self,
        collection: Collection,
        id: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, FieldValue)>,
    ) -> &mut Self {
        self.writes.push(DocumentWrite {
            collection,
            id: id.into(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Collections touched by this batch
    pub fn collections(&self) -> BTreeSet<Collection> {
        self.writes.iter().map(|w| w.collection).collect()
    }
}

/// Outcome of a committed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitResult {
    /// Server-assigned commit time (value of every server timestamp in the batch)
    pub commit_time: DateTime<Utc>,
    /// New version of each touched collection
    pub versions: BTreeMap<Collection, u64>,
}

/// Full ordered document set of one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub collection: Collection,
    /// Collection version (incremented by each commit touching it)
    pub version: u64,
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Event delivered by a realtime listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Current full document set (initial or after a change)
    Snapshot(Snapshot),
    /// The listener failed and will deliver nothing further
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Check;
    use serde_json::json;

    #[test]
    fn test_collection_names() {
        assert_eq!("checks".parse::<Collection>().unwrap(), Collection::Checks);
        assert_eq!(Collection::Tables.order_field(), "tableNumber");
        assert!("orders".parse::<Collection>().is_err());
    }

    #[test]
    fn test_document_decode_injects_id() {
        let fields = json!({"checkNumber": 4, "tableId": "table-5", "color": "green"});
        let doc = Document::new("check-4", fields.as_object().cloned().unwrap());
        let check: Check = doc.decode().unwrap();
        assert_eq!(check.id, "check-4");
        assert_eq!(check.table_id.as_deref(), Some("table-5"));
        assert_eq!(check.color, Some(StatusColor::Green));
        assert_eq!(doc.order_key(Collection::Checks), Some(4));
        assert_eq!(doc.order_key(Collection::Tables), None);
    }

    #[test]
    fn test_field_value_wire_format() {
        let mut batch = WriteBatch::new();
        batch.set_merge(
            Collection::Checks,
            "check-1",
            [
                ("tableId", FieldValue::null()),
                ("updatedAt", FieldValue::ServerTimestamp),
                ("color", FieldValue::set(StatusColor::Blue)),
            ],
        );
        let value = serde_json::to_value(&batch).unwrap();
        let fields = &value["writes"][0]["fields"];
        assert_eq!(fields["tableId"], json!({"set": null}));
        assert_eq!(fields["updatedAt"], json!("server_timestamp"));
        assert_eq!(fields["color"], json!({"set": "blue"}));

        let back: WriteBatch = serde_json::from_value(value).unwrap();
        assert_eq!(back, batch);
        assert_eq!(back.collections().len(), 1);
    }

    #[test]
    fn test_feed_event_tagging() {
        let event = FeedEvent::Error("permission denied".into());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"type": "error", "data": "permission denied"}));
    }
}
