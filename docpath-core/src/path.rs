//! Classification of `/`-delimited store paths.
//!
//! A path with an odd number of segments names a collection (`"users"`,
//! `"users/abc/posts"`); an even number names a document inside a collection
//! (`"users/abc"`). Segment parity is the only rule applied here. Empty segments and
//! illegal characters are passed through for the client to accept or reject.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a path string addresses after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPath {
    /// The whole path is a collection path.
    Collection(String),
    /// The final segment is a document id, the rest its collection path.
    Document(DocumentRef),
}

impl ResolvedPath {
    /// Classifies `path` by its segment count.
    pub fn classify(path: &str) -> Self {
        if is_collection(path) {
            return ResolvedPath::Collection(path.to_string());
        }

        // Even segment count guarantees at least one '/'.
        match path.rsplit_once('/') {
            Some((collection, id)) => ResolvedPath::Document(DocumentRef::new(collection, id)),
            None => ResolvedPath::Collection(path.to_string()),
        }
    }

    /// The collection path this resolution targets.
    pub fn collection(&self) -> &str {
        match self {
            ResolvedPath::Collection(collection) => collection,
            ResolvedPath::Document(doc) => doc.collection(),
        }
    }
}

/// Returns `true` when `path` has an odd number of segments.
pub fn is_collection(path: &str) -> bool {
    path.split('/').count() % 2 == 1
}

/// The address of a single document: a collection path plus a document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentRef {
    collection: String,
    id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self { collection: collection.into(), id: id.into() }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The full document path, `collection/id`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }

    /// Path of a collection nested under this document.
    pub fn child_collection(&self, name: &str) -> String {
        format!("{}/{}/{}", self.collection, self.id, name)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
