//! In-memory document client for docpath.
//!
//! This crate provides a thread-safe, in-memory implementation of the `DocumentClient` trait.
//! It uses async-aware read-write locks for concurrent access and is the reference client for
//! development and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Path-addressed collections** - Nested collections are independent collection paths
//! - **Full query support** - Every filter operator, multi-key ordering, and limits
//! - **Write options** - Merge modes, preconditions, and strictly increasing write times
//! - **Content-less parents** - Addresses with only nested collections still show up in listings
//!
//! # Quick Start
//!
//! ```ignore
//! use docpath::{prelude::*, memory::InMemoryClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = InMemoryClient::builder().build().await?;
//!     let store = DocumentStore::new(client);
//!
//!     store.add("users", doc! { "name": "Alice" }, Some("alice"), None).await?;
//!
//!     let alice = store.get("users/alice", &Descriptor::new()).await?.into_one();
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docpath_memory;

pub mod store;
pub mod evaluator;

pub use store::{InMemoryClient, InMemoryClientBuilder};
