//! Path/query resolution and the shorthand operations, as free functions.
//!
//! Each function takes the client handle explicitly and issues exactly one client call
//! (two for [`list_all_documents`]: the reference listing and one batched read). Client
//! errors are returned unchanged.
//!
//! # Resolution
//!
//! [`fetch_by_path`] classifies its path by segment parity:
//!
//! | path | descriptor `doc` | result |
//! |---|---|---|
//! | `users` | none | scan of `users` with the descriptor's constraints |
//! | `users` | `"abc"` | single fetch of `users/abc` |
//! | `users/abc` | ignored | single fetch of `users/abc` |
//!
//! and then delegates to [`fetch_by_identifiers`].

use tracing::debug;

use crate::{
    client::DocumentClient,
    config::ResolverConfig,
    error::DocumentStoreResult,
    fields::Fields,
    options::{Precondition, SetOptions, WriteResult},
    path::{DocumentRef, ResolvedPath},
    query::{Descriptor, Query},
    record::Record,
};

/// The outcome of a resolved read: one document or an ordered sequence of documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// A single-document fetch. The record holds only the identifier if the document is missing.
    One(Record),
    /// A collection scan, in the client's result order.
    Many(Vec<Record>),
}

impl Fetched {
    pub fn is_one(&self) -> bool {
        matches!(self, Fetched::One(_))
    }

    pub fn into_one(self) -> Option<Record> {
        match self {
            Fetched::One(record) => Some(record),
            Fetched::Many(_) => None,
        }
    }

    pub fn into_many(self) -> Option<Vec<Record>> {
        match self {
            Fetched::One(_) => None,
            Fetched::Many(records) => Some(records),
        }
    }

    /// All returned records; a single fetch becomes a one-element vector.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Fetched::One(record) => vec![record],
            Fetched::Many(records) => records,
        }
    }
}

/// Resolves `path` and reads either one document or a filtered collection.
///
/// An even-segment path names a document: its last segment is the id and the descriptor's
/// `doc` is ignored. An odd-segment path names a collection, and the descriptor's `doc`
/// (if set) selects a document within it.
///
/// # Errors
///
/// Returns any error reported by the client.
pub async fn fetch_by_path<C>(
    client: &C,
    path: &str,
    descriptor: &Descriptor,
    config: &ResolverConfig,
) -> DocumentStoreResult<Fetched>
where
    C: DocumentClient + ?Sized,
{
    match ResolvedPath::classify(path) {
        ResolvedPath::Document(doc) => {
            fetch_by_identifiers(client, doc.collection(), Some(doc.id()), descriptor, config).await
        }
        ResolvedPath::Collection(collection) => {
            fetch_by_identifiers(client, &collection, descriptor.doc_id(), descriptor, config).await
        }
    }
}

/// Reads one document when `doc_id` is set (and non-empty), otherwise scans `collection`
/// with the descriptor's filters, sort keys, and limit.
///
/// # Errors
///
/// Returns any error reported by the client.
pub async fn fetch_by_identifiers<C>(
    client: &C,
    collection: &str,
    doc_id: Option<&str>,
    descriptor: &Descriptor,
    config: &ResolverConfig,
) -> DocumentStoreResult<Fetched>
where
    C: DocumentClient + ?Sized,
{
    match doc_id.filter(|id| !id.is_empty()) {
        Some(id) => Ok(Fetched::One(fetch_document(client, collection, id, config).await?)),
        None => Ok(Fetched::Many(fetch_collection(client, collection, descriptor, config).await?)),
    }
}

/// Reads a single document into a record. A missing document yields an identifier-only record.
pub async fn fetch_document<C>(
    client: &C,
    collection: &str,
    id: &str,
    config: &ResolverConfig,
) -> DocumentStoreResult<Record>
where
    C: DocumentClient + ?Sized,
{
    debug!(collection, id, "fetching single document");

    let snapshot = client.get_document(collection, id).await?;

    Ok(Record::from_snapshot(&config.id_field, snapshot))
}

/// Scans a collection with the descriptor's constraints, preserving the client's order.
pub async fn fetch_collection<C>(
    client: &C,
    collection: &str,
    descriptor: &Descriptor,
    config: &ResolverConfig,
) -> DocumentStoreResult<Vec<Record>>
where
    C: DocumentClient + ?Sized,
{
    let query = Query::scan(descriptor);
    debug!(
        collection,
        constraints = query.constraints().len(),
        limit = query.limit(),
        "scanning collection"
    );

    Ok(client
        .run_query(collection, &query)
        .await?
        .into_iter()
        .map(|snapshot| Record::from_snapshot(&config.id_field, snapshot))
        .collect())
}

/// Whether a document currently exists, regardless of how many fields it holds.
pub async fn document_exists<C>(client: &C, collection: &str, id: &str) -> DocumentStoreResult<bool>
where
    C: DocumentClient + ?Sized,
{
    Ok(client.get_document(collection, id).await?.exists())
}

/// Writes a document.
///
/// With an `id`, the data is set at `collection/id` (overwriting unless `options` says
/// otherwise). Without one, the client generates an id. Either way the written address is
/// returned.
pub async fn add_document<C>(
    client: &C,
    collection: &str,
    data: Fields,
    id: Option<&str>,
    options: Option<&SetOptions>,
) -> DocumentStoreResult<DocumentRef>
where
    C: DocumentClient + ?Sized,
{
    match id.filter(|id| !id.is_empty()) {
        Some(id) => {
            debug!(collection, id, "setting document");
            client.set_document(collection, id, data, options).await?;
            Ok(DocumentRef::new(collection, id))
        }
        None => {
            let id = client.add_document(collection, data).await?;
            debug!(collection, id = %id, "added document with generated id");
            Ok(DocumentRef::new(collection, id))
        }
    }
}

/// Applies a partial update; fields absent from `data` are left untouched.
pub async fn update_document<C>(
    client: &C,
    collection: &str,
    id: &str,
    data: Fields,
    precondition: Option<&Precondition>,
) -> DocumentStoreResult<WriteResult>
where
    C: DocumentClient + ?Sized,
{
    debug!(collection, id, fields = data.len(), "updating document");

    client.update_document(collection, id, data, precondition).await
}

/// Deletes a document. Missing documents are the client's concern (normally a no-op).
pub async fn delete_document<C>(
    client: &C,
    collection: &str,
    id: &str,
    precondition: Option<&Precondition>,
) -> DocumentStoreResult<WriteResult>
where
    C: DocumentClient + ?Sized,
{
    debug!(collection, id, "deleting document");

    client.delete_document(collection, id, precondition).await
}

/// Counts the documents matching the descriptor's filters. Order and limit are ignored.
pub async fn count_documents<C>(
    client: &C,
    collection: &str,
    descriptor: &Descriptor,
) -> DocumentStoreResult<u64>
where
    C: DocumentClient + ?Sized,
{
    client.count(collection, &Query::count(descriptor)).await
}

/// Counts the documents matching the descriptor's filters, stopping at its limit.
///
/// The result never exceeds a positive `limit`; use [`count_documents`] for a true total.
pub async fn count_documents_capped<C>(
    client: &C,
    collection: &str,
    descriptor: &Descriptor,
) -> DocumentStoreResult<u64>
where
    C: DocumentClient + ?Sized,
{
    client.count(collection, &Query::count_capped(descriptor)).await
}

/// Lists every document reference in a collection, including ones without content.
///
/// Each record carries a [`HIDDEN_FIELD`](crate::record::HIDDEN_FIELD) flag that is true
/// when the reference holds no stored content (it only parents nested collections).
pub async fn list_all_documents<C>(
    client: &C,
    collection: &str,
    config: &ResolverConfig,
) -> DocumentStoreResult<Vec<Record>>
where
    C: DocumentClient + ?Sized,
{
    let refs = client.list_documents(collection).await?;
    debug!(collection, references = refs.len(), "listing all documents");

    if refs.is_empty() {
        return Ok(Vec::new());
    }

    Ok(client
        .get_all(&refs)
        .await?
        .into_iter()
        .map(|snapshot| Record::listed(&config.id_field, snapshot))
        .collect())
}
