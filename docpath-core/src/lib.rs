//! Path-addressed shorthand operations over document-database clients.
//!
//! This crate is the core of the docpath project and provides:
//!
//! - **Client abstraction** ([`client`]) - The [`DocumentClient`](client::DocumentClient) trait every backend implements
//! - **Path classification** ([`path`]) - Collection vs document paths by segment parity
//! - **Descriptors and constraints** ([`query`]) - Filters, sort keys, limits, and their assembly into queries
//! - **Resolver** ([`resolver`]) - The shorthand operations as free functions over an explicit client
//! - **Document store** ([`store`]) - The same operations as methods on a captured client
//! - **Records** ([`record`]) - Normalized read results with a synthetic identifier field
//! - **Fields** ([`fields`]) - Field maps, field paths, and serde conversions
//! - **Write options** ([`options`]) - Merge options, preconditions, write results
//! - **Configuration** ([`config`]) - Resolver settings
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docpath::{prelude::*, memory::InMemoryClient};
//!
//! let store = DocumentStore::new(InMemoryClient::new());
//!
//! // "users" is a collection path: scan it.
//! let users = store.get("users", &Descriptor::new()).await?;
//!
//! // "users/abc123" is a document path: fetch one document.
//! let user = store.get("users/abc123", &Descriptor::new()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docpath_core;

pub mod client;
pub mod config;
pub mod error;
pub mod fields;
pub mod options;
pub mod path;
pub mod query;
pub mod record;
pub mod resolver;
pub mod store;
