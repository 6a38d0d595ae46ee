//! The document-database client abstraction.
//!
//! docpath owns no transport, storage, or consistency logic. Everything it does is expressed
//! as calls against a [`DocumentClient`], which implementations map onto a real database
//! (see `docpath-mongodb`) or onto process memory (see `docpath-memory`).
//!
//! # Error Handling
//!
//! Clients report failures as [`DocumentStoreError`](crate::error::DocumentStoreError)s. The
//! resolver forwards them to its callers unchanged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::DocumentStoreResult,
    fields::Fields,
    options::{Precondition, SetOptions, WriteResult},
    path::DocumentRef,
    query::Query,
};

/// The state of one document as read by a client.
///
/// A snapshot of a missing document still carries the requested id. Existence is tracked
/// separately from content: a document that exists with no fields has `exists() == true`
/// and an empty field map.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    id: String,
    data: Option<Fields>,
    update_time: Option<DateTime<Utc>>,
}

impl DocumentSnapshot {
    /// A snapshot of an existing document.
    pub fn found(id: impl Into<String>, data: Fields, update_time: Option<DateTime<Utc>>) -> Self {
        Self { id: id.into(), data: Some(data), update_time }
    }

    /// A snapshot of an address that holds no document.
    pub fn missing(id: impl Into<String>) -> Self {
        Self { id: id.into(), data: None, update_time: None }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// The stored fields, or `None` if the document does not exist.
    pub fn data(&self) -> Option<&Fields> {
        self.data.as_ref()
    }

    /// When the document was last written, if the client tracks it.
    pub fn update_time(&self) -> Option<DateTime<Utc>> {
        self.update_time
    }

    pub fn into_parts(self) -> (String, Option<Fields>) {
        (self.id, self.data)
    }
}

/// Abstract interface over a document-database client.
///
/// Collections are addressed by `/`-delimited collection paths (odd segment count), so
/// nested collections such as `users/abc/posts` are ordinary collection arguments.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; callers may share one client between tasks.
#[async_trait]
pub trait DocumentClient: Send + Sync + Debug {
    /// Reads one document. A missing document is a [`DocumentSnapshot::missing`], not an error.
    async fn get_document(&self, collection: &str, id: &str) -> DocumentStoreResult<DocumentSnapshot>;

    /// Executes the constraints of `query` against a collection, in order.
    ///
    /// Only documents with stored content are returned, in the order the client produces
    /// (the query's sort keys, or the client's stable default order).
    async fn run_query(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<DocumentSnapshot>>;

    /// Writes a document at an exact address, creating it if needed.
    ///
    /// `options` selects overwrite or merge behaviour; `None` means overwrite.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        options: Option<&SetOptions>,
    ) -> DocumentStoreResult<WriteResult>;

    /// Creates a document under a client-generated id and returns that id.
    async fn add_document(&self, collection: &str, data: Fields) -> DocumentStoreResult<String>;

    /// Applies a partial update to an existing document.
    ///
    /// Only the keys present in `data` change; dotted keys address nested fields. Updating a
    /// missing document fails with [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound).
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<WriteResult>;

    /// Deletes a document. Deleting a missing document succeeds unless a precondition says otherwise.
    async fn delete_document(
        &self,
        collection: &str,
        id: &str,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<WriteResult>;

    /// Lists every document address in a collection, including addresses that hold no content
    /// but have nested collections beneath them.
    async fn list_documents(&self, collection: &str) -> DocumentStoreResult<Vec<DocumentRef>>;

    /// Reads many documents in one round trip. Results follow the order of `refs`.
    async fn get_all(&self, refs: &[DocumentRef]) -> DocumentStoreResult<Vec<DocumentSnapshot>>;

    /// Counts the documents matching `query` without fetching them.
    async fn count(&self, collection: &str, query: &Query) -> DocumentStoreResult<u64>;

    /// Releases client resources. The default implementation does nothing.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

macro_rules! forward_document_client {
    ($($wrapper:ty),+ $(,)?) => {$(
        #[async_trait]
        impl<C> DocumentClient for $wrapper
        where
            C: DocumentClient + ?Sized,
        {
            async fn get_document(&self, collection: &str, id: &str) -> DocumentStoreResult<DocumentSnapshot> {
                (**self).get_document(collection, id).await
            }

            async fn run_query(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
                (**self).run_query(collection, query).await
            }

            async fn set_document(
                &self,
                collection: &str,
                id: &str,
                data: Fields,
                options: Option<&SetOptions>,
            ) -> DocumentStoreResult<WriteResult> {
                (**self).set_document(collection, id, data, options).await
            }

            async fn add_document(&self, collection: &str, data: Fields) -> DocumentStoreResult<String> {
                (**self).add_document(collection, data).await
            }

            async fn update_document(
                &self,
                collection: &str,
                id: &str,
                data: Fields,
                precondition: Option<&Precondition>,
            ) -> DocumentStoreResult<WriteResult> {
                (**self).update_document(collection, id, data, precondition).await
            }

            async fn delete_document(
                &self,
                collection: &str,
                id: &str,
                precondition: Option<&Precondition>,
            ) -> DocumentStoreResult<WriteResult> {
                (**self).delete_document(collection, id, precondition).await
            }

            async fn list_documents(&self, collection: &str) -> DocumentStoreResult<Vec<DocumentRef>> {
                (**self).list_documents(collection).await
            }

            async fn get_all(&self, refs: &[DocumentRef]) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
                (**self).get_all(refs).await
            }

            async fn count(&self, collection: &str, query: &Query) -> DocumentStoreResult<u64> {
                (**self).count(collection, query).await
            }

            async fn shutdown(&self) -> DocumentStoreResult<()> {
                (**self).shutdown().await
            }
        }
    )+};
}

forward_document_client!(&C, Box<C>, Arc<C>);

/// Factory trait for clients that need asynchronous setup (connecting, authenticating).
#[async_trait]
pub trait ClientBuilder {
    type Client: DocumentClient;

    async fn build(self) -> DocumentStoreResult<Self::Client>;
}
