//! Document traits: identifiers and lifecycle timestamps
//!
//! Timestamps follow two lifecycle events:
//! - persist (first insert): `created_at` and `updated_at` are set when absent
//! - update: `updated_at` is refreshed
//!
//! The [`impl_document!`](crate::impl_document) macro generates a document
//! struct with all three fields and wires the hooks. Timestamps are stored as
//! BSON dates through [`bson_datetime`].

use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Produces identifiers for documents persisted without one
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random (v4) UUIDs in their hyphenated string form
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// A document carrying a string identifier
pub trait HasId {
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    /// Assign a generated identifier unless one is already set
    fn ensure_id(&mut self, generator: &dyn IdGenerator) {
        if self.id().is_none() {
            self.set_id(generator.generate());
        }
    }
}

pub trait CreatedAt {
    fn created_at(&self) -> Option<DateTime<Utc>>;

    fn set_created_at(&mut self, at: DateTime<Utc>);

    fn pre_persist_created_at(&mut self, now: DateTime<Utc>) {
        if self.created_at().is_none() {
            self.set_created_at(now);
        }
    }
}

pub trait UpdatedAt {
    fn updated_at(&self) -> Option<DateTime<Utc>>;

    fn set_updated_at(&mut self, at: DateTime<Utc>);

    fn pre_persist_updated_at(&mut self, now: DateTime<Utc>) {
        if self.updated_at().is_none() {
            self.set_updated_at(now);
        }
    }

    fn pre_update_updated_at(&mut self, now: DateTime<Utc>) {
        self.set_updated_at(now);
    }
}

/// A document stored in its own collection
pub trait OdmDocument: HasId + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection the document type lives in (e.g., "orders")
    fn collection_name() -> &'static str;

    /// Hook run before the first insert
    fn pre_persist(&mut self, _now: DateTime<Utc>) {}

    /// Hook run before a replace
    fn pre_update(&mut self, _now: DateTime<Utc>) {}
}

/// Field MongoDB keeps identifiers under
pub const STORED_ID: &str = "_id";

/// Field document types declare their identifier as
pub const DOCUMENT_ID: &str = "id";

/// Move a stored `_id` to the `id` field document types read
pub fn with_document_id(mut doc: Document) -> Document {
    if let Some(id) = doc.remove(STORED_ID) {
        doc.insert(DOCUMENT_ID, id);
    }
    doc
}

/// Move a document's `id` to `_id` before storing it
pub fn with_stored_id(mut doc: Document) -> Document {
    if let Some(id) = doc.remove(DOCUMENT_ID) {
        doc.insert(STORED_ID, id);
    }
    doc
}

/// Serde adapter for optional timestamps stored as BSON dates
///
/// Writes a BSON date (millisecond precision). Reads a BSON date, its
/// extended JSON form, or an RFC 3339 string.
///
/// ```rust,ignore
/// #[serde(default, with = "odm::core::document::bson_datetime")]
/// pub shipped_at: Option<DateTime<Utc>>,
/// ```
pub mod bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson::{self, Bson};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => {
                serializer.serialize_some(&bson::DateTime::from_millis(at.timestamp_millis()))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<Bson>::deserialize(deserializer)? {
            None | Some(Bson::Null) => Ok(None),
            Some(Bson::DateTime(at)) => DateTime::from_timestamp_millis(at.timestamp_millis())
                .map(Some)
                .ok_or_else(|| D::Error::custom("timestamp out of range")),
            Some(Bson::String(text)) => DateTime::parse_from_rfc3339(&text)
                .map(|at| Some(at.with_timezone(&Utc)))
                .map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("expected a date, got {}", other))),
        }
    }
}
