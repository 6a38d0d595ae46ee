//! Convenient re-exports of commonly used types from docpath.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docpath::prelude::*;
//! ```

pub use bson::{Bson, doc};
pub use docpath_core::{
    client::{ClientBuilder, DocumentClient, DocumentSnapshot},
    config::ResolverConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    fields::{FieldPath, Fields, FieldsExt, to_fields, from_fields},
    options::{Precondition, SetOptions, WriteResult},
    path::{DocumentRef, ResolvedPath},
    query::{Constraint, ConstraintVisitor, Descriptor, DescriptorBuilder, FieldOp, Filter, OrderBy, Query, SortDirection, Where},
    record::{HIDDEN_FIELD, Record},
    resolver::Fetched,
    store::{Collection, DocumentStore, DynDocumentStore},
};
