//! Query evaluation for in-memory document filtering and ordering.
//!
//! A [`QueryPlan`] collects the constraints of a query by visiting it, then filters, sorts,
//! and truncates a collection's documents the way a document database would.

use std::{cmp::Ordering, collections::BTreeMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docpath_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    fields::FieldPath,
    query::{ConstraintVisitor, FieldOp, OrderBy, Query, SortDirection, Where},
};


/// Type-erased, comparable representation of BSON values.
///
/// Integers keep their exact value; comparisons against floats happen numerically.
/// Values of different kinds never compare as ordered in filters; for sorting they
/// fall back to [`Comparable::rank`].
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (Int32 and Int64)
    Int(i64),
    /// Floating point value (Double and Decimal128)
    Float(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map of comparable values, ordered by key
    Map(BTreeMap<&'a str, Comparable<'a>>),
    /// Byte string, ordered by content
    Binary(&'a [u8]),
    /// ObjectId, ordered by its bytes
    ObjectId(ObjectId),
    /// Any other BSON kind; supports equality only
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Float(*value),
            Bson::Decimal128(value) => value
                .to_string()
                .parse::<f64>()
                .map(Comparable::Float)
                .unwrap_or(Comparable::Other(bson)),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<BTreeMap<_, _>>()
            ),
            Bson::Binary(binary) => Comparable::Binary(&binary.bytes),
            Bson::ObjectId(oid) => Comparable::ObjectId(*oid),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> Comparable<'a> {
    /// Cross-type ordering: null < bool < number < timestamp < string < array < map,
    /// followed by the kinds without a document-database counterpart.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Int(_) | Comparable::Float(_) => 2,
            Comparable::DateTime(_) => 3,
            Comparable::String(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Map(_) => 6,
            Comparable::Binary(_) => 7,
            Comparable::ObjectId(_) => 8,
            Comparable::Other(_) => 9,
        }
    }

    /// Total ordering used for sorting.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.sort_cmp(y))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Map(a), Comparable::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.sort_cmp(vb)))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self
                .partial_cmp(other)
                .unwrap_or_else(|| self.rank().cmp(&other.rank())),
        }
    }
}

/// Compares an integer with a float without rounding the integer.
fn cmp_int_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63, the first float above every i64
    const BOUND: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return None;
    }
    if float >= BOUND {
        return Some(Ordering::Less);
    }
    if float < -BOUND {
        return Some(Ordering::Greater);
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(float - whole)),
        ordering => Some(ordering),
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Float(a), Comparable::Float(b)) => a == b,
            (Comparable::Int(a), Comparable::Float(b)) | (Comparable::Float(b), Comparable::Int(a)) => {
                cmp_int_float(*a, *b) == Some(Ordering::Equal)
            },
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Binary(a), Comparable::Binary(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Float(a), Comparable::Float(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Float(b)) => cmp_int_float(*a, *b),
            (Comparable::Float(a), Comparable::Int(b)) => cmp_int_float(*b, *a).map(Ordering::reverse),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Binary(a), Comparable::Binary(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().partial_cmp(&b.bytes()),
            (Comparable::Other(a), Comparable::Other(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }
}

/// Resolves a field reference against a document, treating `__name__` as the document id.
fn resolve<'a>(field: &FieldPath, id: &'a str, data: &'a Document) -> Option<Comparable<'a>> {
    if field.is_document_id() {
        return Some(Comparable::String(id));
    }
    field.get(data).map(Comparable::from)
}

/// The constraints of a query, collected in application order.
#[derive(Debug, Default)]
pub(crate) struct QueryPlan {
    filters: Vec<Where>,
    order: Vec<OrderBy>,
    limit: Option<u32>,
}

impl QueryPlan {
    pub(crate) fn new(query: &Query) -> DocumentStoreResult<Self> {
        let mut plan = Self::default();
        plan.visit_query(query)?;
        Ok(plan)
    }

    /// Whether a document satisfies every filter.
    pub(crate) fn matches(&self, id: &str, data: &Document) -> bool {
        self.filters
            .iter()
            .all(|filter| evaluate(filter, id, data))
    }

    /// Filters, sorts, and limits `documents`, which must arrive in default (id) order.
    pub(crate) fn execute<'a, T>(&self, documents: impl IntoIterator<Item = (&'a str, &'a Document, T)>) -> Vec<T> {
        let mut matched = documents
            .into_iter()
            .filter(|(id, data, _)| self.matches(id, data))
            .collect::<Vec<_>>();

        if !self.order.is_empty() {
            // Stable sort keeps id order among ties.
            matched.sort_by(|(left_id, left, _), (right_id, right, _)| {
                self.order
                    .iter()
                    .map(|order| {
                        let left = resolve(&order.field, left_id, left).unwrap_or(Comparable::Null);
                        let right = resolve(&order.field, right_id, right).unwrap_or(Comparable::Null);

                        match order.direction {
                            SortDirection::Asc => left.sort_cmp(&right),
                            SortDirection::Desc => right.sort_cmp(&left),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        matched
            .into_iter()
            .take(self.limit.map(|limit| limit as usize).unwrap_or(usize::MAX))
            .map(|(_, _, item)| item)
            .collect()
    }
}

impl ConstraintVisitor for QueryPlan {
    type Error = DocumentStoreError;

    fn visit_where(&mut self, filter: &Where) -> Result<(), Self::Error> {
        let needs_array = matches!(filter.op, FieldOp::In | FieldOp::NotIn | FieldOp::ArrayContainsAny);
        if needs_array && !matches!(filter.value, Bson::Array(_)) {
            return Err(DocumentStoreError::InvalidArgument(format!(
                "operator `{}` on `{}` requires an array value",
                filter.op, filter.field
            )));
        }

        self.filters.push(filter.clone());
        Ok(())
    }

    fn visit_order_by(&mut self, order: &OrderBy) -> Result<(), Self::Error> {
        self.order.push(order.clone());
        Ok(())
    }

    fn visit_limit(&mut self, limit: u32) -> Result<(), Self::Error> {
        self.limit = Some(limit);
        Ok(())
    }
}

/// Evaluates one filter. A missing field never matches, whatever the operator.
fn evaluate(filter: &Where, id: &str, data: &Document) -> bool {
    let Some(field_value) = resolve(&filter.field, id, data) else {
        return false;
    };
    let value = Comparable::from(&filter.value);

    match filter.op {
        FieldOp::Eq => field_value == value,
        FieldOp::Ne => field_value != Comparable::Null && field_value != value,
        FieldOp::Gt => matches!(field_value.partial_cmp(&value), Some(Ordering::Greater)),
        FieldOp::Gte => matches!(field_value.partial_cmp(&value), Some(Ordering::Greater | Ordering::Equal)),
        FieldOp::Lt => matches!(field_value.partial_cmp(&value), Some(Ordering::Less)),
        FieldOp::Lte => matches!(field_value.partial_cmp(&value), Some(Ordering::Less | Ordering::Equal)),
        FieldOp::ArrayContains => match field_value {
            Comparable::Array(array) => array.iter().any(|item| item == &value),
            _ => false,
        },
        FieldOp::In => match value {
            Comparable::Array(values) => values.iter().any(|candidate| candidate == &field_value),
            _ => false,
        },
        FieldOp::NotIn => match value {
            Comparable::Array(values) => {
                field_value != Comparable::Null
                    && !values.iter().any(|candidate| candidate == &field_value)
            },
            _ => false,
        },
        FieldOp::ArrayContainsAny => match (field_value, value) {
            (Comparable::Array(array), Comparable::Array(values)) => {
                values.iter().any(|candidate| array.contains(candidate))
            },
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docpath_core::query::{Constraint, Descriptor, Filter};

    fn users() -> Vec<(String, Document)> {
        vec![
            ("a".into(), doc! { "name": "Ada", "age": 36, "active": true, "tags": ["math", "code"] }),
            ("b".into(), doc! { "name": "Bob", "age": 17, "active": false, "tags": ["art"] }),
            ("c".into(), doc! { "name": "Cy", "age": 52.5, "active": true, "address": { "city": "Oslo" } }),
            ("d".into(), doc! { "name": "Dee", "age": Bson::Null, "active": true }),
        ]
    }

    fn run(descriptor: Descriptor) -> Vec<String> {
        let docs = users();
        let plan = QueryPlan::new(&Query::scan(&descriptor)).unwrap();

        plan.execute(docs.iter().map(|(id, data)| (id.as_str(), data, id.clone())))
    }

    fn filtered(filter: Where) -> Vec<String> {
        run(Descriptor::builder().filter(filter).build())
    }

    #[test]
    fn equality_and_inequality() {
        assert_eq!(filtered(Filter::eq("active", true)), vec!["a", "c", "d"]);
        // `!=` skips documents where the field is missing or null.
        assert_eq!(filtered(Filter::ne("age", 36)), vec!["b", "c"]);
        assert_eq!(filtered(Filter::eq("address.city", "Oslo")), vec!["c"]);
    }

    #[test]
    fn range_filters_only_match_same_kind() {
        assert_eq!(filtered(Filter::gte("age", 36)), vec!["a", "c"]);
        assert_eq!(filtered(Filter::lt("age", 36)), vec!["b"]);
        assert_eq!(filtered(Filter::gt("name", 1)), Vec::<String>::new());
    }

    #[test]
    fn array_operators() {
        assert_eq!(filtered(Filter::array_contains("tags", "code")), vec!["a"]);
        assert_eq!(filtered(Filter::array_contains_any("tags", vec!["art", "code"])), vec!["a", "b"]);
        assert_eq!(filtered(Filter::is_in("name", vec!["Bob", "Cy"])), vec!["b", "c"]);
        assert_eq!(filtered(Filter::not_in("name", vec!["Bob", "Cy"])), vec!["a", "d"]);
    }

    #[test]
    fn document_id_field_filters_on_ids() {
        assert_eq!(filtered(Filter::gt(FieldPath::document_id(), "b")), vec!["c", "d"]);
    }

    #[test]
    fn list_operators_reject_scalar_values() {
        let query = Query::new().with(Constraint::Where(Filter::is_in("name", "Bob")));

        assert!(matches!(QueryPlan::new(&query), Err(DocumentStoreError::InvalidArgument(_))));
    }

    #[test]
    fn ordering_applies_keys_in_priority() {
        let ordered = run(
            Descriptor::builder()
                .order_by("active", SortDirection::Desc)
                .order_by("name", SortDirection::Desc)
                .build(),
        );

        assert_eq!(ordered, vec!["d", "c", "a", "b"]);
    }

    #[test]
    fn ordering_across_kinds_uses_type_rank() {
        // null < numbers
        assert_eq!(run(Descriptor::builder().order_by("age", SortDirection::Asc).build()), vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn limit_applies_after_filter_and_order() {
        let limited = run(
            Descriptor::builder()
                .filter(Filter::eq("active", true))
                .order_by("name", SortDirection::Desc)
                .limit(2)
                .build(),
        );

        assert_eq!(limited, vec!["d", "c"]);
    }

    #[test]
    fn unsupported_kinds_keep_their_identity() {
        let first = ObjectId::new();
        let second = ObjectId::new();
        let blob = Bson::Binary(bson::Binary { subtype: bson::spec::BinarySubtype::Generic, bytes: vec![1] });
        let docs = vec![
            ("x".to_string(), doc! { "ref": first }),
            ("y".to_string(), doc! { "ref": second }),
            ("z".to_string(), doc! { "ref": Bson::Null }),
            ("w".to_string(), doc! { "ref": blob }),
        ];
        let matching = |filter: Where| {
            let plan = QueryPlan::new(&Query::new().with(Constraint::Where(filter))).unwrap();
            plan.execute(docs.iter().map(|(id, data)| (id.as_str(), data, id.clone())))
        };

        assert_eq!(matching(Filter::eq("ref", first)), vec!["x"]);
        assert_eq!(matching(Filter::eq("ref", Bson::Null)), vec!["z"]);
        assert_eq!(matching(Filter::ne("ref", first)), vec!["y", "w"]);
        assert_eq!(matching(Filter::is_in("ref", vec![Bson::ObjectId(second)])), vec!["y"]);
    }

    #[test]
    fn large_integers_compare_exactly() {
        let docs = vec![
            ("low".to_string(), doc! { "n": 9_007_199_254_740_992_i64 }),
            ("high".to_string(), doc! { "n": 9_007_199_254_740_993_i64 }),
            ("half".to_string(), doc! { "n": 2.5 }),
        ];
        let matching = |filter: Where| {
            let plan = QueryPlan::new(&Query::new().with(Constraint::Where(filter))).unwrap();
            plan.execute(docs.iter().map(|(id, data)| (id.as_str(), data, id.clone())))
        };

        assert_eq!(matching(Filter::eq("n", 9_007_199_254_740_993_i64)), vec!["high"]);
        assert_eq!(matching(Filter::gt("n", 9_007_199_254_740_992_i64)), vec!["high"]);
        assert_eq!(matching(Filter::lt("n", 3)), vec!["half"]);
        assert_eq!(matching(Filter::gt("n", 2)), vec!["low", "high", "half"]);
        assert_eq!(matching(Filter::eq("n", 2.5)), vec!["half"]);
    }
}
