//! In-memory client implementation.
//!
//! This module provides a document client that keeps every collection in process memory,
//! keyed by collection path, with async-safe read-write locks around the whole state.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mea::rwlock::RwLock;
use tracing::trace;
use uuid::Uuid;

use docpath_core::{
    client::{ClientBuilder, DocumentClient, DocumentSnapshot},
    error::{DocumentStoreError, DocumentStoreResult},
    fields::{Fields, FieldPath, deep_merge},
    options::{Precondition, SetOptions, WriteResult},
    path::DocumentRef,
    query::Query,
};

use crate::evaluator::QueryPlan;

/// Length of generated document ids.
const AUTO_ID_LENGTH: usize = 20;

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Fields,
    update_time: DateTime<Utc>,
}

/// Documents of one collection, in id order.
type CollectionMap = BTreeMap<String, StoredDocument>;
type StoreMap = HashMap<String, CollectionMap>;

#[derive(Debug, Default)]
struct State {
    collections: StoreMap,
    last_write: Option<DateTime<Utc>>,
}

impl State {
    /// Returns a write time strictly later than every previous one.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let time = match self.last_write {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };

        self.last_write = Some(time);
        time
    }

    fn document(&self, collection: &str, id: &str) -> Option<&StoredDocument> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id))
    }

    fn update_time(&self, collection: &str, id: &str) -> Option<DateTime<Utc>> {
        self.document(collection, id).map(|doc| doc.update_time)
    }

    fn put(&mut self, collection: &str, id: &str, data: Fields) -> DateTime<Utc> {
        let update_time = self.tick();

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), StoredDocument { data, update_time });

        update_time
    }
}

/// Thread-safe in-memory document client.
///
/// Collections are addressed by path, so `users` and `users/abc/posts` are independent
/// collections. A query without sort keys returns documents in ascending id order.
///
/// # Thread Safety
///
/// `InMemoryClient` is cloneable and uses an `Arc`-wrapped internal state. Clones share
/// the same underlying data.
///
/// # Example
///
/// ```ignore
/// use docpath_memory::InMemoryClient;
/// use docpath::client::DocumentClient;
/// use bson::doc;
///
/// let client = InMemoryClient::new();
///
/// client.set_document("users", "ada", doc! { "name": "Ada" }, None).await?;
///
/// let snapshot = client.get_document("users", "ada").await?;
/// assert!(snapshot.exists());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryClient {
    state: Arc<RwLock<State>>,
}

impl InMemoryClient {
    /// Creates a new empty client.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Creates a builder, optionally seeded with documents.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = InMemoryClient::builder()
    ///     .with_document("users", "ada", doc! { "name": "Ada" })
    ///     .build()
    ///     .await?;
    /// ```
    pub fn builder() -> InMemoryClientBuilder {
        InMemoryClientBuilder::default()
    }

    fn generate_id() -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(AUTO_ID_LENGTH);
        id
    }
}

#[async_trait]
impl DocumentClient for InMemoryClient {
    async fn get_document(&self, collection: &str, id: &str) -> DocumentStoreResult<DocumentSnapshot> {
        let state = self.state.read().await;

        Ok(
            match state.document(collection, id) {
                Some(doc) => DocumentSnapshot::found(id, doc.data.clone(), Some(doc.update_time)),
                None => DocumentSnapshot::missing(id),
            }
        )
    }

    async fn run_query(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
        let plan = QueryPlan::new(query)?;
        let state = self.state.read().await;
        let Some(docs) = state.collections.get(collection) else {
            return Ok(vec![]);
        };

        let snapshots = plan.execute(
            docs
                .iter()
                .map(|(id, doc)| (id.as_str(), &doc.data, (id, doc)))
        )
            .into_iter()
            .map(|(id, doc)| DocumentSnapshot::found(id.as_str(), doc.data.clone(), Some(doc.update_time)))
            .collect::<Vec<_>>();

        trace!(collection, matched = snapshots.len(), "ran in-memory query");

        Ok(snapshots)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        options: Option<&SetOptions>,
    ) -> DocumentStoreResult<WriteResult> {
        let mut state = self.state.write().await;
        let existing = state
            .document(collection, id)
            .map(|doc| doc.data.clone());

        let merged = match (options, existing) {
            (None | Some(SetOptions::Overwrite), _) | (Some(SetOptions::Merge), None) => data,
            (Some(SetOptions::Merge), Some(mut stored)) => {
                deep_merge(&mut stored, data);
                stored
            },
            (Some(SetOptions::MergeFields(paths)), existing) => {
                let mut stored = existing.unwrap_or_default();

                for path in paths {
                    let value = path
                        .get(&data)
                        .cloned()
                        .ok_or_else(|| DocumentStoreError::InvalidArgument(format!(
                            "merge field `{path}` is missing from the written data"
                        )))?;
                    path.set(&mut stored, value);
                }

                stored
            },
        };

        trace!(collection, id, "set in-memory document");

        Ok(WriteResult::new(state.put(collection, id, merged)))
    }

    async fn add_document(&self, collection: &str, data: Fields) -> DocumentStoreResult<String> {
        let mut state = self.state.write().await;

        let mut id = Self::generate_id();
        while state.document(collection, &id).is_some() {
            id = Self::generate_id();
        }

        state.put(collection, &id, data);

        trace!(collection, id = %id, "added in-memory document");

        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<WriteResult> {
        let mut state = self.state.write().await;

        if let Some(precondition) = precondition {
            precondition.check(state.update_time(collection, id), collection, id)?;
        }

        let mut stored = match state.document(collection, id) {
            Some(doc) => doc.data.clone(),
            None => return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string())),
        };

        for (key, value) in data {
            FieldPath::parse(&key).set(&mut stored, value);
        }

        trace!(collection, id, "updated in-memory document");

        Ok(WriteResult::new(state.put(collection, id, stored)))
    }

    async fn delete_document(
        &self,
        collection: &str,
        id: &str,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<WriteResult> {
        let mut state = self.state.write().await;

        if let Some(precondition) = precondition {
            precondition.check(state.update_time(collection, id), collection, id)?;
        }

        if let Some(docs) = state.collections.get_mut(collection) {
            docs.remove(id);

            if docs.is_empty() {
                state.collections.remove(collection);
            }
        }

        trace!(collection, id, "deleted in-memory document");

        Ok(WriteResult::new(state.tick()))
    }

    async fn list_documents(&self, collection: &str) -> DocumentStoreResult<Vec<DocumentRef>> {
        let state = self.state.read().await;
        let prefix = format!("{collection}/");

        let mut ids = state.collections
            .get(collection)
            .map(|docs| docs.keys().cloned().collect::<BTreeSet<_>>())
            .unwrap_or_default();

        // Addresses with nested collections beneath them, whether or not they hold content.
        for (path, docs) in &state.collections {
            if docs.is_empty() {
                continue;
            }

            if let Some((id, _)) = path
                .strip_prefix(&prefix)
                .and_then(|rest| rest.split_once('/'))
            {
                ids.insert(id.to_string());
            }
        }

        Ok(
            ids
                .into_iter()
                .map(|id| DocumentRef::new(collection, id))
                .collect()
        )
    }

    async fn get_all(&self, refs: &[DocumentRef]) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
        let state = self.state.read().await;

        Ok(
            refs
                .iter()
                .map(|doc_ref| match state.document(doc_ref.collection(), doc_ref.id()) {
                    Some(doc) => DocumentSnapshot::found(doc_ref.id(), doc.data.clone(), Some(doc.update_time)),
                    None => DocumentSnapshot::missing(doc_ref.id()),
                })
                .collect()
        )
    }

    async fn count(&self, collection: &str, query: &Query) -> DocumentStoreResult<u64> {
        let plan = QueryPlan::new(query)?;
        let state = self.state.read().await;
        let Some(docs) = state.collections.get(collection) else {
            return Ok(0);
        };

        let matched = plan.execute(
            docs
                .iter()
                .map(|(id, doc)| (id.as_str(), &doc.data, ()))
        );

        Ok(matched.len() as u64)
    }
}


/// Builder for constructing [`InMemoryClient`] instances.
///
/// # Example
///
/// ```ignore
/// use docpath_memory::InMemoryClient;
/// use docpath::client::ClientBuilder;
///
/// let client = InMemoryClient::builder()
///     .with_document("users/ada/posts", "p1", doc! { "title": "Notes" })
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryClientBuilder {
    seed: Vec<(String, String, Fields)>,
}

impl InMemoryClientBuilder {
    /// Stores `data` at `collection/id` when the client is built.
    pub fn with_document(mut self, collection: impl Into<String>, id: impl Into<String>, data: Fields) -> Self {
        self.seed.push((collection.into(), id.into(), data));
        self
    }
}

#[async_trait]
impl ClientBuilder for InMemoryClientBuilder {
    type Client = InMemoryClient;

    /// Builds a client holding the seeded documents. This always succeeds.
    async fn build(self) -> DocumentStoreResult<Self::Client> {
        let client = InMemoryClient::new();

        {
            let mut state = client.state.write().await;

            for (collection, id, data) in self.seed {
                state.put(&collection, &id, data);
            }
        }

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Bson, doc};
    use docpath_core::query::{Descriptor, Filter, SortDirection};

    async fn seeded() -> InMemoryClient {
        InMemoryClient::builder()
            .with_document("users", "b", doc! { "name": "Bob", "age": 17 })
            .with_document("users", "a", doc! { "name": "Ada", "age": 36 })
            .with_document("users", "c", doc! { "name": "Cy", "age": 52 })
            .build()
            .await
            .unwrap()
    }

    fn ids(snapshots: &[DocumentSnapshot]) -> Vec<&str> {
        snapshots.iter().map(|s| s.id()).collect()
    }

    #[tokio::test]
    async fn get_document_reports_missing_documents() {
        let client = seeded().await;

        let found = client.get_document("users", "a").await.unwrap();
        assert!(found.exists());
        assert_eq!(found.data().unwrap().get_str("name").unwrap(), "Ada");
        assert!(found.update_time().is_some());

        let missing = client.get_document("users", "zz").await.unwrap();
        assert!(!missing.exists());
        assert_eq!(missing.id(), "zz");
    }

    #[tokio::test]
    async fn queries_default_to_id_order() {
        let client = seeded().await;

        let all = client.run_query("users", &Query::new()).await.unwrap();
        assert_eq!(ids(&all), vec!["a", "b", "c"]);

        let empty = client.run_query("nobody", &Query::new()).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn queries_filter_sort_and_limit() {
        let client = seeded().await;
        let descriptor = Descriptor::builder()
            .filter(Filter::gt("age", 20))
            .order_by("age", SortDirection::Desc)
            .limit(1)
            .build();

        let top = client.run_query("users", &Query::scan(&descriptor)).await.unwrap();
        assert_eq!(ids(&top), vec!["c"]);

        assert_eq!(client.count("users", &Query::count(&descriptor)).await.unwrap(), 2);
        assert_eq!(client.count("users", &Query::count_capped(&descriptor)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn set_overwrites_and_merges() {
        let client = InMemoryClient::new();

        client.set_document("users", "a", doc! { "name": "Ada", "address": { "city": "Oslo", "zip": "0150" } }, None).await.unwrap();
        client.set_document("users", "a", doc! { "address": { "city": "Bergen" } }, Some(&SetOptions::Merge)).await.unwrap();

        let merged = client.get_document("users", "a").await.unwrap();
        assert_eq!(
            merged.data().unwrap(),
            &doc! { "name": "Ada", "address": { "city": "Bergen", "zip": "0150" } }
        );

        client.set_document("users", "a", doc! { "name": "Ada L." }, Some(&SetOptions::Overwrite)).await.unwrap();

        let replaced = client.get_document("users", "a").await.unwrap();
        assert_eq!(replaced.data().unwrap(), &doc! { "name": "Ada L." });
    }

    #[tokio::test]
    async fn set_with_merge_fields_writes_only_listed_paths() {
        let client = InMemoryClient::new();
        client.set_document("users", "a", doc! { "name": "Ada", "age": 36 }, None).await.unwrap();

        let options = SetOptions::MergeFields(vec!["age".into()]);
        client.set_document("users", "a", doc! { "name": "ignored", "age": 37 }, Some(&options)).await.unwrap();

        let stored = client.get_document("users", "a").await.unwrap();
        assert_eq!(stored.data().unwrap(), &doc! { "name": "Ada", "age": 37 });

        let options = SetOptions::MergeFields(vec!["email".into()]);
        let result = client.set_document("users", "a", doc! { "age": 38 }, Some(&options)).await;
        assert!(matches!(result, Err(DocumentStoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn add_generates_distinct_ids() {
        let client = InMemoryClient::new();

        let first = client.add_document("users", doc! { "name": "Ada" }).await.unwrap();
        let second = client.add_document("users", doc! { "name": "Ada" }).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(first.len(), AUTO_ID_LENGTH);
        assert_eq!(client.count("users", &Query::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn update_changes_only_given_keys() {
        let client = InMemoryClient::new();
        client.set_document("users", "a", doc! { "name": "Ada", "address": { "city": "Oslo", "zip": "0150" } }, None).await.unwrap();

        client.update_document("users", "a", doc! { "address.city": "Bergen", "age": 36 }, None).await.unwrap();

        let stored = client.get_document("users", "a").await.unwrap();
        assert_eq!(
            stored.data().unwrap(),
            &doc! { "name": "Ada", "address": { "city": "Bergen", "zip": "0150" }, "age": 36 }
        );
    }

    #[tokio::test]
    async fn update_requires_an_existing_document() {
        let client = InMemoryClient::new();

        let result = client.update_document("users", "ghost", doc! { "name": "Boo" }, None).await;

        assert!(matches!(result, Err(DocumentStoreError::DocumentNotFound(id, collection)) if id == "ghost" && collection == "users"));
    }

    #[tokio::test]
    async fn preconditions_guard_updates_and_deletes() {
        let client = InMemoryClient::new();
        let first = client.set_document("users", "a", doc! { "n": 1 }, None).await.unwrap();
        let second = client.update_document("users", "a", doc! { "n": 2 }, None).await.unwrap();
        assert!(second.write_time > first.write_time);

        let stale = Precondition::last_update_time(first.write_time);
        let result = client.update_document("users", "a", doc! { "n": 3 }, Some(&stale)).await;
        assert!(matches!(result, Err(DocumentStoreError::PreconditionFailed(_))));

        let current = Precondition::last_update_time(second.write_time);
        client.delete_document("users", "a", Some(&current)).await.unwrap();
        assert!(!client.get_document("users", "a").await.unwrap().exists());

        let result = client.delete_document("users", "a", Some(&Precondition::exists(true))).await;
        assert!(matches!(result, Err(DocumentStoreError::DocumentNotFound(_, _))));
    }

    #[tokio::test]
    async fn delete_of_missing_document_succeeds() {
        let client = InMemoryClient::new();

        assert!(client.delete_document("users", "ghost", None).await.is_ok());
    }

    #[tokio::test]
    async fn list_documents_includes_parents_of_nested_collections() {
        let client = InMemoryClient::builder()
            .with_document("users", "a", doc! { "name": "Ada" })
            .with_document("users/ghost/posts", "p1", doc! { "title": "Hello" })
            .with_document("users/b/posts/p9/comments", "c1", doc! { "text": "Hi" })
            .build()
            .await
            .unwrap();

        let refs = client.list_documents("users").await.unwrap();
        let listed = refs.iter().map(|r| r.id()).collect::<Vec<_>>();
        assert_eq!(listed, vec!["a", "b", "ghost"]);

        let snapshots = client.get_all(&refs).await.unwrap();
        assert_eq!(
            snapshots.iter().map(DocumentSnapshot::exists).collect::<Vec<_>>(),
            vec![true, false, false]
        );

        let nested = client.list_documents("users/ghost/posts").await.unwrap();
        assert_eq!(nested, vec![DocumentRef::new("users/ghost/posts", "p1")]);
    }

    #[tokio::test]
    async fn deleting_the_last_nested_document_unlists_its_parent() {
        let client = InMemoryClient::builder()
            .with_document("users/ghost/posts", "p1", doc! { "title": "Hello" })
            .build()
            .await
            .unwrap();

        client.delete_document("users/ghost/posts", "p1", None).await.unwrap();

        assert!(client.list_documents("users").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_all_follows_request_order() {
        let client = seeded().await;
        let refs = vec![
            DocumentRef::new("users", "c"),
            DocumentRef::new("users", "x"),
            DocumentRef::new("users", "a"),
        ];

        let snapshots = client.get_all(&refs).await.unwrap();

        assert_eq!(ids(&snapshots), vec!["c", "x", "a"]);
        assert_eq!(snapshots[0].data().unwrap().get("age"), Some(&Bson::Int32(52)));
        assert!(!snapshots[1].exists());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let client = InMemoryClient::new();
        let other = client.clone();

        client.set_document("users", "a", doc! {}, None).await.unwrap();

        let snapshot = other.get_document("users", "a").await.unwrap();
        assert!(snapshot.exists());
        assert!(snapshot.data().unwrap().is_empty());
    }
}
