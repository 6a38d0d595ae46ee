//! Field maps, field paths, and conversions between field maps and Rust types.
//!
//! A document's stored content is a [`Fields`] value: an ordered map from field name to a
//! tagged [`Bson`] value (string, number, boolean, timestamp, null, nested map, array).
//! Any `serde` type can be turned into a field map with [`to_fields`] and read back with
//! [`from_fields`].

use bson::{Bson, Document, de::deserialize_from_document, ser::serialize_to_document};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DocumentStoreResult;

/// The stored content of a single document.
pub type Fields = Document;

/// Serializes a value into a field map.
///
/// # Errors
///
/// Returns an error if the value does not serialize to a map.
pub fn to_fields<T: Serialize + ?Sized>(value: &T) -> DocumentStoreResult<Fields> {
    Ok(serialize_to_document(value)?)
}

/// Deserializes a field map into a value.
///
/// # Errors
///
/// Returns an error if the fields do not match the shape of `T`.
pub fn from_fields<T>(fields: Fields) -> DocumentStoreResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    Ok(deserialize_from_document(fields)?)
}

/// Extension trait providing field-map conversions for any serde type.
pub trait FieldsExt: Serialize + for<'de> Deserialize<'de> + Sized {
    /// Converts this value to a field map.
    fn to_fields(&self) -> DocumentStoreResult<Fields>;

    /// Creates a value from a field map.
    fn from_fields(fields: Fields) -> DocumentStoreResult<Self>;
}

impl<T> FieldsExt for T
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    fn to_fields(&self) -> DocumentStoreResult<Fields> {
        to_fields(self)
    }

    fn from_fields(fields: Fields) -> DocumentStoreResult<Self> {
        from_fields(fields)
    }
}

/// A reference to a (possibly nested) field of a document.
///
/// Parsed from dotted notation: `"address.city"` addresses the `city` key inside the
/// `address` map. The special [`FieldPath::document_id`] path refers to the document's
/// identifier rather than a stored field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Reserved segment naming the document identifier.
    pub const DOCUMENT_ID: &'static str = "__name__";

    /// Creates a field path from its individual segments.
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self { segments: segments.into_iter().map(Into::into).collect() }
    }

    /// Parses a dotted field reference.
    pub fn parse(dotted: &str) -> Self {
        Self::new(dotted.split('.'))
    }

    /// The path that sorts and filters on the document identifier.
    pub fn document_id() -> Self {
        Self::new([Self::DOCUMENT_ID])
    }

    pub fn is_document_id(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == Self::DOCUMENT_ID
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Looks up the value at this path inside `fields`.
    ///
    /// Returns `None` when any segment is missing or an intermediate value is not a map.
    pub fn get<'a>(&self, fields: &'a Fields) -> Option<&'a Bson> {
        let (last, parents) = self.segments.split_last()?;
        let mut current = fields;

        for segment in parents {
            current = current.get(segment)?.as_document()?;
        }

        current.get(last)
    }

    /// Writes `value` at this path, creating (or replacing) intermediate maps as needed.
    pub fn set(&self, fields: &mut Fields, value: Bson) {
        let Some((last, parents)) = self.segments.split_last() else {
            return;
        };
        let mut current = fields;

        for segment in parents {
            if !matches!(current.get(segment), Some(Bson::Document(_))) {
                current.insert(segment.clone(), Document::new());
            }
            current = match current.get_mut(segment) {
                Some(Bson::Document(inner)) => inner,
                _ => return,
            };
        }

        current.insert(last.clone(), value);
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for FieldPath {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Recursively merges `source` into `target`.
///
/// Nested maps present on both sides are merged key by key; any other value in `source`
/// replaces the one in `target`.
pub fn deep_merge(target: &mut Fields, source: Fields) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Bson::Document(existing)), Bson::Document(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

/// Flattens nested maps into `(path, leaf)` pairs.
///
/// Empty maps are kept as leaves so that merging them still creates the field.
pub fn flatten(fields: &Fields) -> Vec<(FieldPath, Bson)> {
    let mut leaves = Vec::new();
    flatten_into(&mut Vec::new(), fields, &mut leaves);
    leaves
}

fn flatten_into(prefix: &mut Vec<String>, fields: &Fields, leaves: &mut Vec<(FieldPath, Bson)>) {
    for (key, value) in fields {
        prefix.push(key.clone());
        match value {
            Bson::Document(inner) if !inner.is_empty() => flatten_into(prefix, inner, leaves),
            _ => leaves.push((FieldPath::new(prefix.iter().cloned()), value.clone())),
        }
        prefix.pop();
    }
}
