//! Identity and timestamp bookkeeping shared by every persisted entity.
//!
//! Each concrete entity embeds a [`Base`] and implements [`Entity`], which
//! supplies key rendering, the document serialization pair, and the
//! `save`/`delete` operations delegating to a storage handle.

use chrono::{NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::models::registry::{AnyEntity, EntityKind};
use crate::storage::db_storage::DbStorage;

/// Document key carrying the concrete type name.
pub const CLASS_KEY: &str = "__class__";

/// Timestamp layout used in documents and database columns: ISO-8601
/// without timezone, fractional seconds only when non-zero.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Common persisted fields: primary identity plus audit timestamps.
///
/// When a document is deserialized, any missing field is generated, so a
/// partial document still yields a fully populated instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Base {
    #[serde(default = "fresh_id")]
    pub id: String,
    #[serde(default = "timestamp_now")]
    pub created_at: NaiveDateTime,
    #[serde(default = "timestamp_now")]
    pub updated_at: NaiveDateTime,
}

impl Base {
    /// Fresh identity: a new UUID, both timestamps set to the same instant.
    pub fn new() -> Self {
        let now = timestamp_now();
        Base {
            id: fresh_id(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`; invoked on every successful save.
    pub fn touch(&mut self) {
        self.updated_at = timestamp_now();
    }
}

impl Default for Base {
    fn default() -> Self {
        Base::new()
    }
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn timestamp_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Render a timestamp in the document and column layout.
pub(crate) fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp previously rendered by [`format_timestamp`].
pub(crate) fn parse_timestamp(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
}

/// Behavior shared by every concrete entity type.
pub trait Entity: Clone + Serialize + DeserializeOwned + Into<AnyEntity> {
    /// The registry variant for this concrete type.
    const KIND: EntityKind;

    fn base(&self) -> &Base;

    fn base_mut(&mut self) -> &mut Base;

    /// Storage key, `"<TypeName>.<id>"`.
    fn key(&self) -> String {
        format!("{}.{}", Self::KIND.type_name(), self.base().id)
    }

    /// Flat document of every field plus a [`CLASS_KEY`] marker; timestamps
    /// are rendered as ISO-8601 text. Repeatable and side-effect free.
    fn to_document(&self) -> Map<String, Value> {
        let mut doc = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        doc.insert(
            CLASS_KEY.to_owned(),
            Value::String(Self::KIND.type_name().to_owned()),
        );
        doc
    }

    /// Rebuild an instance from a document. A [`CLASS_KEY`] entry is
    /// ignored; missing identity or timestamp fields are generated.
    fn from_document(document: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut doc = document.clone();
        doc.remove(CLASS_KEY);
        serde_json::from_value(Value::Object(doc))
    }

    /// `[<TypeName>] (<id>) <document>` diagnostic rendering.
    fn render(&self) -> String {
        let mut doc = self.to_document();
        doc.remove(CLASS_KEY);
        format!(
            "[{}] ({}) {}",
            Self::KIND.type_name(),
            self.base().id,
            Value::Object(doc)
        )
    }

    /// Stamp `updated_at`, stage this instance through `storage` and commit.
    fn save(&mut self, storage: &mut DbStorage) -> Result<(), StorageError> {
        self.base_mut().touch();
        storage.add(self.clone().into())?;
        storage.save()
    }

    /// Stage removal of this instance through `storage` and commit. Fails
    /// if the instance was never persisted.
    fn delete(&self, storage: &mut DbStorage) -> Result<(), StorageError> {
        let staged: AnyEntity = self.clone().into();
        storage.delete(Some(&staged))?;
        storage.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::collections::HashSet;

    #[test]
    fn test_ids_unique_across_many_constructions() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let base = Base::new();
            assert!(!base.id.is_empty());
            assert!(seen.insert(base.id));
        }
    }

    #[test]
    fn test_fresh_timestamps_match() {
        let base = Base::new();
        assert_eq!(base.created_at, base.updated_at);
    }

    #[test]
    fn test_touch_advances_updated_at() {
        let mut base = Base::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        base.touch();
        assert!(base.updated_at > base.created_at);
    }

    #[test]
    fn test_timestamp_text_round_trip() {
        let midnight = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_timestamp(midnight), "2023-01-01T00:00:00");
        assert_eq!(parse_timestamp("2023-01-01T00:00:00").unwrap(), midnight);

        let with_fraction = midnight + Duration::microseconds(123_456);
        let text = format_timestamp(with_fraction);
        assert_eq!(parse_timestamp(&text).unwrap(), with_fraction);
    }
}
