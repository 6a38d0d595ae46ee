//! Normalized read results.
//!
//! Every document read through the resolver comes back as a [`Record`]: the stored fields
//! with one synthetic identifier field merged in. The identifier always wins over a stored
//! field of the same name.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client::DocumentSnapshot,
    error::DocumentStoreResult,
    fields::{Fields, from_fields},
};

/// Name of the flag [`list_all_documents`](crate::resolver::list_all_documents) adds to each
/// record. `true` means the reference exists but holds no stored content.
pub const HIDDEN_FIELD: &str = "_hidden";

/// A document's fields merged with its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Document,
}

impl Record {
    /// Builds a record from an identifier and stored fields.
    ///
    /// The identifier is placed first; a stored field named `id_field` is dropped in its favour.
    pub fn new(id_field: &str, id: &str, data: Fields) -> Self {
        let mut fields = Document::new();
        fields.insert(id_field, id);
        for (key, value) in data {
            if key != id_field {
                fields.insert(key, value);
            }
        }

        Self { fields }
    }

    /// Builds a record from a client snapshot. A missing document yields only the identifier.
    pub fn from_snapshot(id_field: &str, snapshot: DocumentSnapshot) -> Self {
        let (id, data) = snapshot.into_parts();
        Self::new(id_field, &id, data.unwrap_or_default())
    }

    /// Builds a record for a listing, adding the [`HIDDEN_FIELD`] flag.
    ///
    /// The flag is true exactly when the snapshot reports no stored content. It takes
    /// precedence over a stored field with the same name, but never over the identifier:
    /// when `id_field` is itself [`HIDDEN_FIELD`] the record carries no flag.
    pub fn listed(id_field: &str, snapshot: DocumentSnapshot) -> Self {
        let hidden = !snapshot.exists();
        let mut record = Self::from_snapshot(id_field, snapshot);
        if id_field != HIDDEN_FIELD {
            record.fields.insert(HIDDEN_FIELD, hidden);
        }
        record
    }

    /// The identifier value stored under `id_field`.
    pub fn id<'a>(&'a self, id_field: &str) -> Option<&'a str> {
        self.fields.get_str(id_field).ok()
    }

    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn into_fields(self) -> Document {
        self.fields
    }

    /// Whether the record carries a true [`HIDDEN_FIELD`] flag.
    pub fn is_hidden(&self) -> bool {
        self.fields.get_bool(HIDDEN_FIELD).unwrap_or(false)
    }

    /// Deserializes the record (identifier included) into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields do not match the shape of `T`.
    pub fn deserialize<T>(self) -> DocumentStoreResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        from_fields(self.fields)
    }

    /// Renders the record as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if a field value cannot be represented in JSON.
    pub fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(serde_json::to_value(&self.fields)?)
    }
}

impl From<Record> for Document {
    fn from(record: Record) -> Self {
        record.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn identifier_is_merged_first() {
        let record = Record::new("id", "abc", doc! { "name": "Ada", "age": 36 });

        assert_eq!(record.fields(), &doc! { "id": "abc", "name": "Ada", "age": 36 });
        assert_eq!(record.id("id"), Some("abc"));
    }

    #[test]
    fn identifier_wins_on_collision() {
        let record = Record::new("id", "abc", doc! { "id": "stored", "name": "Ada" });

        assert_eq!(record.fields(), &doc! { "id": "abc", "name": "Ada" });
    }

    #[test]
    fn custom_identifier_field_leaves_stored_id_alone() {
        let record = Record::new("uid", "abc", doc! { "id": 7 });

        assert_eq!(record.fields(), &doc! { "uid": "abc", "id": 7 });
        assert_eq!(record.id("uid"), Some("abc"));
    }

    #[test]
    fn missing_snapshot_yields_identifier_only() {
        let record = Record::from_snapshot("id", DocumentSnapshot::missing("ghost"));

        assert_eq!(record.fields(), &doc! { "id": "ghost" });
    }

    #[test]
    fn listed_records_carry_hidden_flag() {
        let present = Record::listed("id", DocumentSnapshot::found("a", doc! { "_hidden": "x" }, None));
        let missing = Record::listed("id", DocumentSnapshot::missing("b"));

        assert!(!present.is_hidden());
        assert_eq!(present.get(HIDDEN_FIELD), Some(&Bson::Boolean(false)));
        assert!(missing.is_hidden());
        assert_eq!(missing.fields(), &doc! { "id": "b", "_hidden": true });
    }

    #[test]
    fn hidden_flag_never_replaces_identifier() {
        let record = Record::listed("_hidden", DocumentSnapshot::missing("ghost"));

        assert_eq!(record.id("_hidden"), Some("ghost"));
        assert_eq!(record.fields(), &doc! { "_hidden": "ghost" });
    }

    #[test]
    fn records_render_as_json() {
        let record = Record::new("id", "abc", doc! { "tags": ["a", "b"], "active": true });

        assert_eq!(
            record.to_json().unwrap(),
            serde_json::json!({ "id": "abc", "tags": ["a", "b"], "active": true })
        );
    }
}
