//! Error types and result types for document client operations.
//!
//! Every failure a [`DocumentClient`](crate::client::DocumentClient) reports is surfaced to the
//! caller unchanged. The resolver layer never retries, validates locally, or translates one
//! variant into another. Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to a document client.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between field maps and Rust types.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during client initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The addressed document does not exist.
    /// The first argument is the document ID, the second is the collection path.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// A document already exists where the write required it not to.
    /// The first argument is the document ID, the second is the collection path.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// A write precondition (such as a last-update-time match) did not hold.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
    /// The client rejected an argument (malformed path, unsupported operator/value pair, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// An error occurred in the underlying client or its transport.
    #[error("Backend error: {0}")]
    Backend(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A specialized `Result` type for document client operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
