//! Options forwarded unmodified to the client on writes.
//!
//! The resolver never interprets these; they exist so that callers can express
//! merge-vs-overwrite and optimistic-concurrency intent to the client. [`Precondition::check`]
//! is provided for client implementations that evaluate preconditions themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    fields::FieldPath,
};

/// How a set-style write combines with an existing document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOptions {
    /// Replace the stored document entirely.
    #[default]
    Overwrite,
    /// Deep-merge the written fields into the stored document.
    Merge,
    /// Write only the listed field paths, leaving every other stored field untouched.
    MergeFields(Vec<FieldPath>),
}

/// Conditions a stored document must satisfy for an update or delete to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precondition {
    /// Require the document to exist (`Some(true)`) or to be absent (`Some(false)`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    /// Require the document's last update time to equal this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,
}

impl Precondition {
    pub fn exists(exists: bool) -> Self {
        Self { exists: Some(exists), last_update_time: None }
    }

    pub fn last_update_time(time: DateTime<Utc>) -> Self {
        Self { exists: None, last_update_time: Some(time) }
    }

    /// Evaluates the precondition against the current state of a document.
    ///
    /// `update_time` is `None` when the document does not exist.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::DocumentNotFound`] when existence was required.
    /// - [`DocumentStoreError::DocumentAlreadyExists`] when absence was required.
    /// - [`DocumentStoreError::PreconditionFailed`] when the update time differs.
    pub fn check(
        &self,
        update_time: Option<DateTime<Utc>>,
        collection: &str,
        id: &str,
    ) -> DocumentStoreResult<()> {
        match (self.exists, update_time) {
            (Some(true), None) => {
                return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
            }
            (Some(false), Some(_)) => {
                return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
            }
            _ => {}
        }

        if let Some(expected) = self.last_update_time {
            if update_time != Some(expected) {
                return Err(DocumentStoreError::PreconditionFailed(format!(
                    "document {collection}/{id} was not last updated at {expected}"
                )));
            }
        }

        Ok(())
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    /// When the client applied the write.
    pub write_time: DateTime<Utc>,
}

impl WriteResult {
    pub fn new(write_time: DateTime<Utc>) -> Self {
        Self { write_time }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn empty_precondition_always_holds() {
        let precondition = Precondition::default();

        assert!(precondition.check(None, "users", "a").is_ok());
        assert!(precondition.check(Some(at(1)), "users", "a").is_ok());
    }

    #[test]
    fn existence_preconditions() {
        assert!(matches!(
            Precondition::exists(true).check(None, "users", "a"),
            Err(DocumentStoreError::DocumentNotFound(id, col)) if id == "a" && col == "users"
        ));
        assert!(matches!(
            Precondition::exists(false).check(Some(at(1)), "users", "a"),
            Err(DocumentStoreError::DocumentAlreadyExists(_, _))
        ));
        assert!(Precondition::exists(true).check(Some(at(1)), "users", "a").is_ok());
        assert!(Precondition::exists(false).check(None, "users", "a").is_ok());
    }

    #[test]
    fn update_time_precondition_requires_exact_match() {
        let precondition = Precondition::last_update_time(at(10));

        assert!(precondition.check(Some(at(10)), "users", "a").is_ok());
        assert!(matches!(
            precondition.check(Some(at(11)), "users", "a"),
            Err(DocumentStoreError::PreconditionFailed(_))
        ));
        assert!(matches!(
            precondition.check(None, "users", "a"),
            Err(DocumentStoreError::PreconditionFailed(_))
        ));
    }
}
