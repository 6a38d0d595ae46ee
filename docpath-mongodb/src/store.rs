use std::collections::{BTreeSet, HashMap};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream::iter, StreamExt, TryStreamExt};
use bson::{Bson, Document, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, CountOptions, FindOptions},
};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use docpath_core::{
    client::{ClientBuilder, DocumentClient, DocumentSnapshot},
    error::{DocumentStoreError, DocumentStoreResult},
    fields::{Fields, FieldPath, flatten},
    options::{Precondition, SetOptions, WriteResult},
    path::DocumentRef,
    query::Query,
};

use crate::{sanitizer::KeySanitizer, query::MongoQueryTranslator};

const ID_KEY: &str = "_id";
const UPDATED_AT_KEY: &str = "_updated_at";
const AUTO_ID_LENGTH: usize = 20;
const DUPLICATE_KEY_CODE: i32 = 11000;

fn backend_error(error: MongoError) -> DocumentStoreError {
    DocumentStoreError::Backend(error.to_string())
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == DUPLICATE_KEY_CODE
    )
}

/// A document client backed by a MongoDB database.
///
/// Every collection path maps to one MongoDB collection of the same (sanitized) name, so
/// `users/abc/posts` is stored apart from `users`. Documents keep their id in `_id` and
/// their last write time in `_updated_at`; both are stripped when reading.
#[derive(Debug)]
pub struct MongoDbClient {
    client: Client,
    database: String,
}

impl MongoDbClient {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbClientBuilder {
        MongoDbClientBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&KeySanitizer::sanitize_string(collection))
    }

    fn prepare_document(id: &str, data: &Fields, written_at: bson::DateTime) -> Document {
        let mut document = doc! { ID_KEY: id };
        for (key, value) in KeySanitizer::sanitize_document(data) {
            document.insert(key, value);
        }
        document.insert(UPDATED_AT_KEY, written_at);
        document
    }

    fn restore_document(document: &Document) -> DocumentSnapshot {
        let id = match document.get(ID_KEY) {
            Some(Bson::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let update_time = match document.get(UPDATED_AT_KEY) {
            Some(Bson::DateTime(time)) => Some(time.to_chrono()),
            Some(other) => {
                warn!(id = %id, value = %other, "ignoring unparsable update time");
                None
            },
            None => None,
        };
        let data = Document::from_iter(
            document
                .iter()
                .filter(|(k, _)| ![ID_KEY, UPDATED_AT_KEY].contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
        );

        DocumentSnapshot::found(id, KeySanitizer::restore_document(&data), update_time)
    }

    /// A write time MongoDB can store exactly.
    fn write_time() -> (bson::DateTime, DateTime<Utc>) {
        let now = bson::DateTime::now();
        (now, now.to_chrono())
    }

    /// Evaluates `precondition` and returns the filter the guarded write must match.
    async fn guarded_filter(
        &self,
        collection: &str,
        id: &str,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<Document> {
        let mut filter = doc! { ID_KEY: id };

        if let Some(precondition) = precondition {
            let current = self.get_document(collection, id).await?;
            precondition.check(current.update_time(), collection, id)?;

            if let Some(time) = current.update_time() {
                filter.insert(UPDATED_AT_KEY, bson::DateTime::from_chrono(time));
            }
        }

        Ok(filter)
    }

    async fn find(&self, collection: &str, filter: Document, options: FindOptions) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(options)
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .iter()
                .map(Self::restore_document)
                .collect()
        )
    }
}

#[async_trait]
impl DocumentClient for MongoDbClient {
    async fn get_document(&self, collection: &str, id: &str) -> DocumentStoreResult<DocumentSnapshot> {
        Ok(
            self.get_collection(collection)
                .find_one(doc! { ID_KEY: id })
                .await
                .map_err(backend_error)?
                .map(|document| Self::restore_document(&document))
                .unwrap_or_else(|| DocumentSnapshot::missing(id))
        )
    }

    async fn run_query(&self, collection: &str, query: &Query) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
        let translated = MongoQueryTranslator::translate(query)?;
        let mut options = FindOptions::default();

        options.sort = Some(translated.sort());
        if let Some(limit) = translated.limit() {
            options.limit = Some(limit as i64);
        }

        trace!(collection, filter = %translated.filter(), "running MongoDB query");

        self.find(collection, translated.filter(), options).await
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        options: Option<&SetOptions>,
    ) -> DocumentStoreResult<WriteResult> {
        let (written_at, write_time) = Self::write_time();
        let target = self.get_collection(collection);

        match options {
            None | Some(SetOptions::Overwrite) => {
                target
                    .replace_one(doc! { ID_KEY: id }, Self::prepare_document(id, &data, written_at))
                    .upsert(true)
                    .await
                    .map_err(backend_error)?;
            },
            Some(options) => {
                let leaves = match options {
                    SetOptions::MergeFields(paths) => paths
                        .iter()
                        .map(|path| {
                            path.get(&data)
                                .map(|value| (path.clone(), value.clone()))
                                .ok_or_else(|| DocumentStoreError::InvalidArgument(format!(
                                    "merge field `{path}` is missing from the written data"
                                )))
                        })
                        .collect::<DocumentStoreResult<Vec<_>>>()?,
                    _ => flatten(&data),
                };

                let mut assignments = Document::from_iter(
                    leaves
                        .iter()
                        .map(|(path, value)| (KeySanitizer::sanitize_path(path), KeySanitizer::sanitize_value(value)))
                );
                assignments.insert(UPDATED_AT_KEY, written_at);

                target
                    .update_one(doc! { ID_KEY: id }, doc! { "$set": assignments })
                    .upsert(true)
                    .await
                    .map_err(backend_error)?;
            },
        }

        trace!(collection, id, "set MongoDB document");

        Ok(WriteResult::new(write_time))
    }

    async fn add_document(&self, collection: &str, data: Fields) -> DocumentStoreResult<String> {
        let target = self.get_collection(collection);

        loop {
            let mut id = Uuid::new_v4().simple().to_string();
            id.truncate(AUTO_ID_LENGTH);

            let (written_at, _) = Self::write_time();

            match target.insert_one(Self::prepare_document(&id, &data, written_at)).await {
                Ok(_) => {
                    trace!(collection, id = %id, "added MongoDB document");
                    return Ok(id);
                },
                Err(error) if is_duplicate_key(&error) => {
                    debug!(collection, id = %id, "generated id already taken, retrying");
                },
                Err(error) => return Err(backend_error(error)),
            }
        }
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<WriteResult> {
        let filter = self.guarded_filter(collection, id, precondition).await?;
        let (written_at, write_time) = Self::write_time();

        let mut assignments = Document::from_iter(
            data
                .iter()
                .map(|(key, value)| (KeySanitizer::sanitize_path(&FieldPath::parse(key)), KeySanitizer::sanitize_value(value)))
        );
        assignments.insert(UPDATED_AT_KEY, written_at);

        let result = self.get_collection(collection)
            .update_one(filter, doc! { "$set": assignments })
            .await
            .map_err(backend_error)?;

        if result.matched_count == 0 {
            return Err(match precondition {
                Some(_) => DocumentStoreError::PreconditionFailed(format!(
                    "document {collection}/{id} changed while being updated"
                )),
                None => DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()),
            });
        }

        trace!(collection, id, "updated MongoDB document");

        Ok(WriteResult::new(write_time))
    }

    async fn delete_document(
        &self,
        collection: &str,
        id: &str,
        precondition: Option<&Precondition>,
    ) -> DocumentStoreResult<WriteResult> {
        let filter = self.guarded_filter(collection, id, precondition).await?;

        self.get_collection(collection)
            .delete_one(filter)
            .await
            .map_err(backend_error)?;

        trace!(collection, id, "deleted MongoDB document");

        Ok(WriteResult::new(Self::write_time().1))
    }

    async fn list_documents(&self, collection: &str) -> DocumentStoreResult<Vec<DocumentRef>> {
        let mut options = FindOptions::default();
        options.projection = Some(doc! { ID_KEY: 1 });

        let mut ids = self.find(collection, doc! {}, options)
            .await?
            .into_iter()
            .map(|snapshot| snapshot.id().to_string())
            .collect::<BTreeSet<_>>();

        // Addresses with nested collections beneath them, whether or not they hold content.
        let prefix = format!("{}/", KeySanitizer::sanitize_string(collection));
        let nested = self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)?
            .into_iter()
            .filter_map(|name| {
                name.strip_prefix(&prefix)
                    .and_then(|rest| rest.split_once('/'))
                    .map(|(id, _)| (name.clone(), KeySanitizer::restore_string(id)))
            })
            .collect::<Vec<_>>();

        for (name, id) in nested {
            let populated = self.client
                .database(&self.database)
                .collection::<Document>(&name)
                .estimated_document_count()
                .await
                .map_err(backend_error)?
                > 0;

            if populated {
                ids.insert(id);
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
        let mut requested = HashMap::<&str, Vec<&str>>::new();
        for doc_ref in refs {
            requested
                .entry(doc_ref.collection())
                .or_default()
                .push(doc_ref.id());
        }

        let found = iter(requested)
            .then(|(collection, ids)| async move {
                self.find(collection, doc! { ID_KEY: { "$in": ids } }, FindOptions::default())
                    .await
                    .map(|snapshots| (collection, snapshots))
            })
            .try_collect::<Vec<_>>()
            .await?
            .into_iter()
            .flat_map(|(collection, snapshots)| {
                snapshots
                    .into_iter()
                    .map(move |snapshot| ((collection, snapshot.id().to_string()), snapshot))
            })
            .collect::<HashMap<_, _>>();

        Ok(
            refs
                .iter()
                .map(|doc_ref| {
                    found
                        .get(&(doc_ref.collection(), doc_ref.id().to_string()))
                        .cloned()
                        .unwrap_or_else(|| DocumentSnapshot::missing(doc_ref.id()))
                })
                .collect()
        )
    }

    async fn count(&self, collection: &str, query: &Query) -> DocumentStoreResult<u64> {
        let translated = MongoQueryTranslator::translate(query)?;
        let mut options = CountOptions::default();

        if let Some(limit) = translated.limit() {
            options.limit = Some(limit as u64);
        }

        self.get_collection(collection)
            .count_documents(translated.filter())
            .with_options(options)
            .await
            .map_err(backend_error)
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Builder for [`MongoDbClient`], connecting from a DSN.
///
/// # Example
///
/// ```ignore
/// use docpath::{client::ClientBuilder, mongodb::MongoDbClient};
///
/// let client = MongoDbClient::builder("mongodb://localhost:27017", "app")
///     .build()
///     .await?;
/// ```
pub struct MongoDbClientBuilder {
    dsn: String,
    database: String,
}

impl MongoDbClientBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl ClientBuilder for MongoDbClientBuilder {
    type Client = MongoDbClient;

    async fn build(self) -> DocumentStoreResult<Self::Client> {
        Ok(MongoDbClient::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_documents_round_trip_through_metadata() {
        let (written_at, write_time) = MongoDbClient::write_time();
        let data = doc! { "name": "Ada", "site.url": "ada.dev", "nested": { "$ref": 1 } };

        let stored = MongoDbClient::prepare_document("ada", &data, written_at);
        assert_eq!(stored.get_str(ID_KEY).unwrap(), "ada");
        assert!(stored.contains_key("site__dot__url"));

        let snapshot = MongoDbClient::restore_document(&stored);
        assert_eq!(snapshot.id(), "ada");
        assert_eq!(snapshot.data(), Some(&data));
        assert_eq!(snapshot.update_time(), Some(write_time));
    }
}
