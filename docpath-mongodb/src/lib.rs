//! MongoDB client implementation for docpath.
//!
//! This crate provides a MongoDB-based implementation of the `DocumentClient` trait, so the
//! path-addressed shorthand operations can run against a real database.
//!
//! To use this client, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docpath = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Path-addressed collections** - Each collection path, nested or not, is its own MongoDB collection
//! - **Query translation** - Filters, sort keys, and limits run on MongoDB's query engine
//! - **Preconditions** - Update-time preconditions guard writes against concurrent changes
//!
//! # Connection
//!
//! To use this client, you need a MongoDB connection string. This can be provided
//! through the builder pattern.
//!
//! # Example
//!
//! ```ignore
//! use docpath::{client::ClientBuilder, mongodb::MongoDbClient, store::DocumentStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MongoDbClient::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(client);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docpath_mongodb;

pub mod store;
pub(crate) mod query;
pub(crate) mod sanitizer;

pub use store::{MongoDbClient, MongoDbClientBuilder};
