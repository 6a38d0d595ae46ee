//! Query descriptors and constraint assembly.
//!
//! A [`Descriptor`] is what callers hand to the resolver: an optional explicit document
//! id plus ordered `where` filters, ordered sort keys, and an optional limit. The resolver
//! turns it into a [`Query`], an ordered list of [`Constraint`]s that clients execute.
//!
//! # Building descriptors
//!
//! ```ignore
//! use docpath::query::{Descriptor, Filter, SortDirection};
//!
//! let descriptor = Descriptor::builder()
//!     .filter(Filter::eq("active", true))
//!     .order_by("joined_at", SortDirection::Desc)
//!     .limit(2)
//!     .build();
//! ```
//!
//! Descriptors also deserialize from the JSON shape
//! `{ "doc": "...", "where": [{ "field": "...", "op": "==", "val": ... }], "order": [{ "field": "...", "dir": "desc" }], "limit": 2 }`.
//!
//! # Constraint order
//!
//! [`Query::scan`] appends filters first, then sort keys, then the limit, each in the order
//! the descriptor supplied them. Nothing is reordered or deduplicated: clients may use that
//! order for index selection.

use bson::Bson;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{error::DocumentStoreError, fields::FieldPath};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Comparison operators accepted in `where` filters.
///
/// The set is fixed. Operator/value compatibility is not checked here; clients reject
/// combinations they cannot execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldOp {
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Lte,
    /// `==`
    #[serde(rename = "==")]
    Eq,
    /// `!=`
    #[serde(rename = "!=")]
    Ne,
    /// `>=`
    #[serde(rename = ">=")]
    Gte,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// Array field contains the value.
    #[serde(rename = "array-contains")]
    ArrayContains,
    /// Field equals one of the values in an array.
    #[serde(rename = "in")]
    In,
    /// Field equals none of the values in an array.
    #[serde(rename = "not-in")]
    NotIn,
    /// Array field contains at least one of the values in an array.
    #[serde(rename = "array-contains-any")]
    ArrayContainsAny,
}

impl FieldOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOp::Lt => "<",
            FieldOp::Lte => "<=",
            FieldOp::Eq => "==",
            FieldOp::Ne => "!=",
            FieldOp::Gte => ">=",
            FieldOp::Gt => ">",
            FieldOp::ArrayContains => "array-contains",
            FieldOp::In => "in",
            FieldOp::NotIn => "not-in",
            FieldOp::ArrayContainsAny => "array-contains-any",
        }
    }
}

impl FromStr for FieldOp {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "<" => FieldOp::Lt,
            "<=" => FieldOp::Lte,
            "==" => FieldOp::Eq,
            "!=" => FieldOp::Ne,
            ">=" => FieldOp::Gte,
            ">" => FieldOp::Gt,
            "array-contains" => FieldOp::ArrayContains,
            "in" => FieldOp::In,
            "not-in" => FieldOp::NotIn,
            "array-contains-any" => FieldOp::ArrayContainsAny,
            other => {
                return Err(DocumentStoreError::InvalidArgument(format!("unknown operator `{other}`")));
            }
        })
    }
}

impl fmt::Display for FieldOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filter triple: field reference, operator, comparison value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Where {
    /// The field to compare.
    pub field: FieldPath,
    /// The comparison operator.
    pub op: FieldOp,
    /// The value to compare against.
    #[serde(rename = "val")]
    pub value: Bson,
}

impl Where {
    pub fn new(field: impl Into<FieldPath>, op: FieldOp, value: impl Into<Bson>) -> Self {
        Self { field: field.into(), op, value: value.into() }
    }
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// The field to sort by.
    pub field: FieldPath,
    /// The sort direction.
    #[serde(rename = "dir", default)]
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<FieldPath>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }
}

/// Helper for constructing [`Where`] filters.
///
/// # Example
///
/// ```ignore
/// use docpath::query::Filter;
///
/// let active = Filter::eq("active", true);
/// let adults = Filter::gte("age", 18);
/// let tagged = Filter::array_contains_any("tags", vec!["rust", "go"]);
/// ```
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the value.
    pub fn eq(field: impl Into<FieldPath>, value: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::Eq, value)
    }

    /// Matches documents where the field exists and differs from the value.
    pub fn ne(field: impl Into<FieldPath>, value: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::Ne, value)
    }

    pub fn lt(field: impl Into<FieldPath>, value: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::Lt, value)
    }

    pub fn lte(field: impl Into<FieldPath>, value: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::Lte, value)
    }

    pub fn gt(field: impl Into<FieldPath>, value: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::Gt, value)
    }

    pub fn gte(field: impl Into<FieldPath>, value: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::Gte, value)
    }

    /// Matches documents whose array field contains the value.
    pub fn array_contains(field: impl Into<FieldPath>, value: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::ArrayContains, value)
    }

    /// Matches documents whose field equals one of `values`.
    pub fn is_in(field: impl Into<FieldPath>, values: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::In, values)
    }

    /// Matches documents whose field exists and equals none of `values`.
    pub fn not_in(field: impl Into<FieldPath>, values: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::NotIn, values)
    }

    /// Matches documents whose array field shares at least one element with `values`.
    pub fn array_contains_any(field: impl Into<FieldPath>, values: impl Into<Bson>) -> Where {
        Where::new(field, FieldOp::ArrayContainsAny, values)
    }
}

/// The caller-facing description of a read.
///
/// All parts are optional. `doc` is only consulted when the resolved path names a
/// collection; a `limit` of `None` or `Some(0)` means no limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Descriptor {
    /// Explicit document id within the collection path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Filters, applied in order.
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Where>,
    /// Sort keys, applied in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderBy>,
    /// Maximum number of documents to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Descriptor {
    /// Creates an empty descriptor (unfiltered, unordered, unlimited).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new descriptor builder for fluent construction.
    pub fn builder() -> DescriptorBuilder {
        DescriptorBuilder::new()
    }

    /// The explicit document id, if one is set and non-empty.
    pub fn doc_id(&self) -> Option<&str> {
        self.doc.as_deref().filter(|id| !id.is_empty())
    }

    /// The limit to apply, treating zero as "no limit".
    pub fn effective_limit(&self) -> Option<u32> {
        self.limit.filter(|limit| *limit > 0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder {
    descriptor: Descriptor,
}

impl DescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the explicit document id.
    pub fn doc(mut self, id: impl Into<String>) -> Self {
        self.descriptor.doc = Some(id.into());
        self
    }

    /// Appends a filter after the ones already added.
    pub fn filter(mut self, filter: Where) -> Self {
        self.descriptor.filters.push(filter);
        self
    }

    /// Appends a `(field, op, value)` filter.
    pub fn where_(mut self, field: impl Into<FieldPath>, op: FieldOp, value: impl Into<Bson>) -> Self {
        self.descriptor.filters.push(Where::new(field, op, value));
        self
    }

    /// Appends a sort key after the ones already added.
    pub fn order_by(mut self, field: impl Into<FieldPath>, direction: SortDirection) -> Self {
        self.descriptor.order.push(OrderBy::new(field, direction));
        self
    }

    /// Sets the maximum number of documents to return. Zero means no limit.
    pub fn limit(mut self, limit: u32) -> Self {
        self.descriptor.limit = Some(limit);
        self
    }

    pub fn build(self) -> Descriptor {
        self.descriptor
    }
}

/// One step of an assembled query.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Where(Where),
    OrderBy(OrderBy),
    Limit(u32),
}

/// An ordered list of constraints, executed by a client against one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    constraints: Vec<Constraint>,
}

impl Query {
    /// Creates a query with no constraints (a full, unordered scan).
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a collection scan: filters, then sort keys, then a positive limit.
    pub fn scan(descriptor: &Descriptor) -> Self {
        let mut query = Self::filtered(descriptor);
        query.constraints.extend(descriptor.order.iter().cloned().map(Constraint::OrderBy));
        if let Some(limit) = descriptor.effective_limit() {
            query.constraints.push(Constraint::Limit(limit));
        }
        query
    }

    /// Assembles the constraints of a plain count: filters only.
    pub fn count(descriptor: &Descriptor) -> Self {
        Self::filtered(descriptor)
    }

    /// Assembles the constraints of a capped count: filters, then a positive limit.
    pub fn count_capped(descriptor: &Descriptor) -> Self {
        let mut query = Self::filtered(descriptor);
        if let Some(limit) = descriptor.effective_limit() {
            query.constraints.push(Constraint::Limit(limit));
        }
        query
    }

    fn filtered(descriptor: &Descriptor) -> Self {
        Self {
            constraints: descriptor.filters.iter().cloned().map(Constraint::Where).collect(),
        }
    }

    /// Appends a constraint.
    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Appends a constraint, builder style.
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.push(constraint);
        self
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// The filter constraints, in application order.
    pub fn filters(&self) -> impl Iterator<Item = &Where> {
        self.constraints.iter().filter_map(|constraint| match constraint {
            Constraint::Where(filter) => Some(filter),
            _ => None,
        })
    }

    /// The sort constraints, in priority order.
    pub fn order(&self) -> impl Iterator<Item = &OrderBy> {
        self.constraints.iter().filter_map(|constraint| match constraint {
            Constraint::OrderBy(order) => Some(order),
            _ => None,
        })
    }

    /// The last limit constraint, if any.
    pub fn limit(&self) -> Option<u32> {
        self.constraints.iter().rev().find_map(|constraint| match constraint {
            Constraint::Limit(limit) => Some(*limit),
            _ => None,
        })
    }
}

/// Walks the constraints of a [`Query`] in order.
///
/// Clients implement this to translate a query into their native form, or to evaluate it
/// directly.
pub trait ConstraintVisitor {
    type Error: Into<DocumentStoreError>;

    fn visit_where(&mut self, filter: &Where) -> Result<(), Self::Error>;
    fn visit_order_by(&mut self, order: &OrderBy) -> Result<(), Self::Error>;
    fn visit_limit(&mut self, limit: u32) -> Result<(), Self::Error>;

    fn visit_constraint(&mut self, constraint: &Constraint) -> Result<(), Self::Error> {
        match constraint {
            Constraint::Where(filter) => self.visit_where(filter),
            Constraint::OrderBy(order) => self.visit_order_by(order),
            Constraint::Limit(limit) => self.visit_limit(*limit),
        }
    }

    fn visit_query(&mut self, query: &Query) -> Result<(), Self::Error> {
        for constraint in query.constraints() {
            self.visit_constraint(constraint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> Descriptor {
        Descriptor::builder()
            .filter(Filter::eq("active", true))
            .order_by("age", SortDirection::Desc)
            .filter(Filter::gt("age", 18))
            .order_by("name", SortDirection::Asc)
            .limit(5)
            .build()
    }

    #[test]
    fn scan_places_filters_then_order_then_limit() {
        let query = Query::scan(&descriptor());

        assert_eq!(
            query.constraints(),
            &[
                Constraint::Where(Filter::eq("active", true)),
                Constraint::Where(Filter::gt("age", 18)),
                Constraint::OrderBy(OrderBy::new("age", SortDirection::Desc)),
                Constraint::OrderBy(OrderBy::new("name", SortDirection::Asc)),
                Constraint::Limit(5),
            ]
        );
    }

    #[test]
    fn duplicate_filters_are_kept() {
        let descriptor = Descriptor::builder()
            .filter(Filter::eq("a", 1))
            .filter(Filter::eq("a", 1))
            .build();

        assert_eq!(Query::scan(&descriptor).filters().count(), 2);
    }

    #[test]
    fn zero_and_missing_limits_are_unbounded() {
        let zero = Descriptor::builder().limit(0).build();

        assert_eq!(Query::scan(&zero), Query::scan(&Descriptor::new()));
        assert_eq!(Query::scan(&zero).limit(), None);
        assert!(Query::scan(&Descriptor::new()).is_empty());
    }

    #[test]
    fn count_ignores_order_and_limit() {
        let query = Query::count(&descriptor());

        assert_eq!(query.filters().count(), 2);
        assert_eq!(query.order().count(), 0);
        assert_eq!(query.limit(), None);
    }

    #[test]
    fn capped_count_keeps_limit_but_not_order() {
        let query = Query::count_capped(&descriptor());

        assert_eq!(query.order().count(), 0);
        assert_eq!(query.limit(), Some(5));
    }

    #[test]
    fn operators_parse_from_their_symbols() {
        for op in [
            FieldOp::Lt,
            FieldOp::Lte,
            FieldOp::Eq,
            FieldOp::Ne,
            FieldOp::Gte,
            FieldOp::Gt,
            FieldOp::ArrayContains,
            FieldOp::In,
            FieldOp::NotIn,
            FieldOp::ArrayContainsAny,
        ] {
            assert_eq!(op.as_str().parse::<FieldOp>().unwrap(), op);
        }
        assert!(matches!("~=".parse::<FieldOp>(), Err(DocumentStoreError::InvalidArgument(_))));
    }

    #[test]
    fn descriptor_deserializes_from_json_shape() {
        let descriptor: Descriptor = serde_json::from_value(serde_json::json!({
            "where": [{ "field": "active", "op": "==", "val": true }],
            "order": [{ "field": "profile.age", "dir": "desc" }],
            "limit": 2
        }))
        .unwrap();

        assert_eq!(descriptor.doc, None);
        assert_eq!(descriptor.filters, vec![Filter::eq("active", true)]);
        assert_eq!(descriptor.order, vec![OrderBy::new(FieldPath::new(["profile", "age"]), SortDirection::Desc)]);
        assert_eq!(descriptor.effective_limit(), Some(2));
    }

    #[test]
    fn empty_doc_id_is_not_an_explicit_id() {
        assert_eq!(Descriptor::builder().doc("").build().doc_id(), None);
        assert_eq!(Descriptor::builder().doc("abc").build().doc_id(), Some("abc"));
    }

    struct Recorder(Vec<String>);

    impl ConstraintVisitor for Recorder {
        type Error = DocumentStoreError;

        fn visit_where(&mut self, filter: &Where) -> Result<(), Self::Error> {
            self.0.push(format!("where {} {}", filter.field, filter.op));
            Ok(())
        }

        fn visit_order_by(&mut self, order: &OrderBy) -> Result<(), Self::Error> {
            self.0.push(format!("order {}", order.field));
            Ok(())
        }

        fn visit_limit(&mut self, limit: u32) -> Result<(), Self::Error> {
            self.0.push(format!("limit {limit}"));
            Ok(())
        }
    }

    #[test]
    fn visitor_walks_constraints_in_order() {
        let mut recorder = Recorder(Vec::new());
        recorder.visit_query(&Query::scan(&descriptor())).unwrap();

        assert_eq!(
            recorder.0,
            vec!["where active ==", "where age >", "order age", "order name", "limit 5"]
        );
    }
}
