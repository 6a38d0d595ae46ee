//! The method-style interface over a captured client.
//!
//! [`DocumentStore`] owns a client handle and a [`ResolverConfig`] and exposes every
//! shorthand operation as a method. [`Collection`] is a borrowed view scoped to one
//! collection path.
//!
//! # Example
//!
//! ```ignore
//! use docpath::{prelude::*, memory::InMemoryClient};
//!
//! let store = DocumentStore::new(InMemoryClient::new());
//!
//! store.add("users", doc! { "name": "Ada", "active": true }, Some("ada"), None).await?;
//!
//! let ada = store.get("users/ada", &Descriptor::new()).await?.into_one();
//! let active = store
//!     .get("users", &Descriptor::builder().filter(Filter::eq("active", true)).build())
//!     .await?
//!     .into_many();
//! ```

use std::sync::Arc;

use crate::{
    client::DocumentClient,
    config::ResolverConfig,
    error::DocumentStoreResult,
    fields::Fields,
    options::{Precondition, SetOptions, WriteResult},
    path::DocumentRef,
    query::Descriptor,
    record::Record,
    resolver::{self, Fetched},
};

/// A client handle plus resolver settings, with the shorthand operations as methods.
///
/// # Type Parameters
///
/// * `C` - The client type. Use [`DynDocumentStore`] when the client is chosen at runtime.
#[derive(Debug)]
pub struct DocumentStore<C: DocumentClient> {
    client: C,
    config: ResolverConfig,
}

/// A document store whose client is selected at runtime.
pub type DynDocumentStore = DocumentStore<Arc<dyn DocumentClient>>;

impl<C: DocumentClient> DocumentStore<C> {
    /// Creates a store with the default configuration (identifier field `"id"`).
    pub fn new(client: C) -> Self {
        Self::with_config(client, ResolverConfig::default())
    }

    /// Creates a store with explicit settings.
    pub fn with_config(client: C, config: ResolverConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Gets a view scoped to one collection path.
    pub fn collection<'a>(&'a self, path: &str) -> Collection<'a, C> {
        Collection::new(path.to_string(), self)
    }

    /// Reads one document or a filtered collection, depending on the path.
    ///
    /// See [`resolver::fetch_by_path`].
    pub async fn get(&self, path: &str, descriptor: &Descriptor) -> DocumentStoreResult<Fetched> {
        resolver::fetch_by_path(&self.client, path, descriptor, &self.config).await
    }

    /// Reads one document when `doc_id` is set, otherwise scans the collection.
    ///
    /// See [`resolver::fetch_by_identifiers`].
    pub async fn get_by_identifiers(
        &self,
        collection: &str,
        doc_id: Option<&str>,
        descriptor: &Descriptor,
    ) -> DocumentStoreResult<Fetched> {
        resolver::fetch_by_identifiers(&self.client, collection, doc_id, descriptor, &self.config).await
    }

    /// Whether the document exists.
    pub async fn exists(&self, collection: &str, id: &str) -> DocumentStoreResult<bool> {
        resolver::document_exists(&self.client, collection, id).await
    }

    /// Sets a document at `collection/id`, or adds one under a generated id when `id` is `None`.
    pub async fn add(
        &self,
        collection: &str,
        data: Fields,
        id: Option<&str>,
        options: Option<&SetOptions>,
    ) -> DocumentStoreResult<DocumentRef> {
        resolver::add_document(&self.client, collection, data, id, options).await
    }

    /// Applies a partial update to an existing document.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<WriteResult> {
        resolver::update_document(&self.client, collection, id, data, precondition).await
    }

    /// Deletes a document.
    pub async fn delete(
        &self,
        collection: &str,
        id: &str,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<WriteResult> {
        resolver::delete_document(&self.client, collection, id, precondition).await
    }

    /// Counts documents matching the descriptor's filters.
    pub async fn count(&self, collection: &str, descriptor: &Descriptor) -> DocumentStoreResult<u64> {
        resolver::count_documents(&self.client, collection, descriptor).await
    }

    /// Counts documents matching the descriptor's filters, up to its limit.
    pub async fn count_capped(&self, collection: &str, descriptor: &Descriptor) -> DocumentStoreResult<u64> {
        resolver::count_documents_capped(&self.client, collection, descriptor).await
    }

    /// Lists every document reference in a collection with its `_hidden` flag.
    pub async fn list_all(&self, collection: &str) -> DocumentStoreResult<Vec<Record>> {
        resolver::list_all_documents(&self.client, collection, &self.config).await
    }

    /// Shuts down the client and consumes the store.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await
    }
}

impl<C: DocumentClient + 'static> DocumentStore<C> {
    /// Erases the client type so stores over different clients share one type.
    pub fn into_dyn(self) -> DynDocumentStore {
        DocumentStore {
            client: Arc::new(self.client),
            config: self.config,
        }
    }
}

/// A view of a [`DocumentStore`] scoped to one collection path.
#[derive(Debug)]
pub struct Collection<'a, C: DocumentClient> {
    path: String,
    store: &'a DocumentStore<C>,
}

impl<'a, C: DocumentClient> Collection<'a, C> {
    pub(crate) fn new(path: String, store: &'a DocumentStore<C>) -> Self {
        Self { path, store }
    }

    /// Returns the collection path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The address of a document in this collection.
    pub fn doc(&self, id: &str) -> DocumentRef {
        DocumentRef::new(self.path.as_str(), id)
    }

    /// Reads a single document. A missing document yields an identifier-only record.
    pub async fn get(&self, id: &str) -> DocumentStoreResult<Record> {
        resolver::fetch_document(&self.store.client, &self.path, id, &self.store.config).await
    }

    /// Scans the collection with the descriptor's filters, order, and limit.
    ///
    /// The descriptor's `doc` is ignored; use [`Collection::get`] for single documents.
    pub async fn query(&self, descriptor: &Descriptor) -> DocumentStoreResult<Vec<Record>> {
        resolver::fetch_collection(&self.store.client, &self.path, descriptor, &self.store.config).await
    }

    pub async fn exists(&self, id: &str) -> DocumentStoreResult<bool> {
        self.store.exists(&self.path, id).await
    }

    pub async fn add(
        &self,
        data: Fields,
        id: Option<&str>,
        options: Option<&SetOptions>,
    ) -> DocumentStoreResult<DocumentRef> {
        self.store.add(&self.path, data, id, options).await
    }

    pub async fn update(
        &self,
        id: &str,
        data: Fields,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<WriteResult> {
        self.store.update(&self.path, id, data, precondition).await
    }

    pub async fn delete(&self, id: &str, precondition: Option<&Precondition>) -> DocumentStoreResult<WriteResult> {
        self.store.delete(&self.path, id, precondition).await
    }

    pub async fn count(&self, descriptor: &Descriptor) -> DocumentStoreResult<u64> {
        self.store.count(&self.path, descriptor).await
    }

    pub async fn list_all(&self) -> DocumentStoreResult<Vec<Record>> {
        self.store.list_all(&self.path).await
    }
}
