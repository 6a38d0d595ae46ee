//! Main docpath crate providing path-addressed shorthand operations over document databases.
//!
//! This crate is the primary entry point for users of docpath. It re-exports the core types
//! and functionality from the sub-crates and provides access to the bundled clients.
//!
//! # Features
//!
//! - **Path-addressed reads** - One call reads a document or a filtered collection, chosen by the path's shape
//! - **Normalized records** - Every read result carries its document id under a configurable field
//! - **Shorthand writes** - Add, update, and delete by collection path and id
//! - **Listings with hidden references** - Enumerate every reference in a collection, including content-less ones
//! - **Pluggable clients** - In-memory and MongoDB clients behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docpath::{prelude::*, memory::InMemoryClient};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: String,
//!     pub name: String,
//!     pub active: bool,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryClient::builder().build().await?);
//!
//!     // Write under an explicit id, then under a generated one.
//!     store.add("users", doc! { "name": "Alice", "active": true }, Some("alice"), None).await?;
//!     let bob = store.add("users", doc! { "name": "Bob", "active": false }, None, None).await?;
//!
//!     // A document path reads one record.
//!     let alice: User = store
//!         .get("users/alice", &Descriptor::new())
//!         .await?
//!         .into_one()
//!         .expect("document path")
//!         .deserialize()?;
//!
//!     // A collection path scans with filters, ordering, and a limit.
//!     let active = store
//!         .get(
//!             "users",
//!             &Descriptor::builder()
//!                 .filter(Filter::eq("active", true))
//!                 .order_by("name", SortDirection::Asc)
//!                 .limit(10)
//!                 .build(),
//!         )
//!         .await?
//!         .into_records();
//!
//!     store.delete("users", bob.id(), None).await?;
//!     store.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! When the client is chosen at runtime, erase its type with `into_dyn`. Stores over
//! different clients then share the [`DynDocumentStore`](store::DynDocumentStore) type.
//!
//! ```ignore
//! use docpath::{prelude::*, memory::InMemoryClient};
//!
//! let store: DynDocumentStore = DocumentStore::new(InMemoryClient::new()).into_dyn();
//!
//! let count = store.count("users", &Descriptor::new()).await?;
//! ```
//!
//! # Free Functions
//!
//! Every operation is also available as a function over an explicit client in [`resolver`],
//! for callers that manage the client themselves.
//!
//! ```ignore
//! use docpath::{prelude::*, memory::InMemoryClient, resolver};
//!
//! let client = InMemoryClient::new();
//! let config = ResolverConfig::default();
//!
//! let listing = resolver::list_all_documents(&client, "users", &config).await?;
//! ```
//!
//! # Clients
//!
//! - [`memory`] - In-memory client for development and testing
//! - `mongodb` - MongoDB client (requires the `mongodb` feature)

pub mod prelude;

pub use docpath_core::{client, config, error, fields, options, path, query, record, resolver, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory client implementation.
pub mod memory {
    pub use docpath_memory::{InMemoryClient, InMemoryClientBuilder};
}

/// MongoDB client implementation.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docpath_mongodb::{MongoDbClient, MongoDbClientBuilder};
}
