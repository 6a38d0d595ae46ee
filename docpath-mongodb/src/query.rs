//! Query translation from docpath constraints to MongoDB query syntax.
//!
//! This module translates a [`Query`]'s ordered constraints into a MongoDB filter
//! document, a sort document, and a limit.

use bson::{Bson, Document, doc};

use docpath_core::{
    error::DocumentStoreError,
    query::{ConstraintVisitor, FieldOp, OrderBy, Query, SortDirection, Where},
};

use crate::sanitizer::KeySanitizer;


/// Collects a query's constraints as MongoDB documents.
///
/// This struct implements the [`ConstraintVisitor`] trait. Every filter becomes one clause
/// of an `$and`; sort keys keep their order and `_id` is appended as the final tie-breaker,
/// so results without explicit ordering come back in ascending id order.
#[derive(Debug, Default)]
pub(crate) struct MongoQueryTranslator {
    clauses: Vec<Document>,
    sort: Document,
    limit: Option<u32>,
}

impl MongoQueryTranslator {
    pub(crate) fn translate(query: &Query) -> Result<Self, DocumentStoreError> {
        let mut translator = Self::default();
        translator.visit_query(query)?;
        Ok(translator)
    }

    pub(crate) fn filter(&self) -> Document {
        match self.clauses.as_slice() {
            [] => doc! {},
            [clause] => clause.clone(),
            clauses => doc! { "$and": clauses.to_vec() },
        }
    }

    pub(crate) fn sort(&self) -> Document {
        let mut sort = self.sort.clone();
        if !sort.contains_key("_id") {
            sort.insert("_id", 1);
        }
        sort
    }

    pub(crate) fn limit(&self) -> Option<u32> {
        self.limit
    }
}

fn array_operand(filter: &Where) -> Result<Vec<Bson>, DocumentStoreError> {
    match &filter.value {
        Bson::Array(values) => Ok(values.clone()),
        _ => Err(DocumentStoreError::InvalidArgument(format!(
            "operator `{}` on `{}` requires an array value",
            filter.op, filter.field
        ))),
    }
}

/// Whether `filter` compares the field's whole value against scalar operands.
///
/// MongoDB also matches such comparisons against the elements of an array field, which
/// the field-level guard in [`MongoQueryTranslator::visit_where`] rules out.
fn compares_scalar(filter: &Where) -> bool {
    if filter.field.is_document_id() {
        return false;
    }

    match (&filter.op, &filter.value) {
        (FieldOp::ArrayContains | FieldOp::ArrayContainsAny, _) => false,
        (FieldOp::In | FieldOp::NotIn, Bson::Array(values)) => {
            !values.iter().any(|value| matches!(value, Bson::Array(_)))
        },
        (_, value) => !matches!(value, Bson::Array(_)),
    }
}

impl ConstraintVisitor for MongoQueryTranslator {
    type Error = DocumentStoreError;

    fn visit_where(&mut self, filter: &Where) -> Result<(), Self::Error> {
        let value = KeySanitizer::sanitize_value(&filter.value);

        let mut condition = match filter.op {
            FieldOp::Eq => doc! { "$eq": value },
            // Missing and null fields never satisfy an inequality.
            FieldOp::Ne => doc! { "$nin": [value, Bson::Null] },
            FieldOp::Gt => doc! { "$gt": value },
            FieldOp::Gte => doc! { "$gte": value },
            FieldOp::Lt => doc! { "$lt": value },
            FieldOp::Lte => doc! { "$lte": value },
            FieldOp::ArrayContains => doc! { "$elemMatch": { "$eq": value } },
            FieldOp::In => {
                let candidates = array_operand(filter)?;
                doc! { "$in": candidates }
            },
            FieldOp::NotIn => {
                let mut excluded = array_operand(filter)?;
                excluded.push(Bson::Null);
                doc! { "$nin": excluded }
            },
            FieldOp::ArrayContainsAny => {
                let candidates = array_operand(filter)?;
                doc! { "$elemMatch": { "$in": candidates } }
            },
        };

        let field = KeySanitizer::sanitize_path(&filter.field);
        let mut clause = Document::new();

        if !compares_scalar(filter) {
            clause.insert(field, condition);
        } else if matches!(filter.op, FieldOp::Ne | FieldOp::NotIn) {
            // An array field never equals a scalar, so it always passes an exclusion.
            let mut is_array = Document::new();
            is_array.insert(field.clone(), doc! { "$type": "array" });
            let mut excluded = Document::new();
            excluded.insert(field, condition);
            clause.insert("$or", vec![is_array, excluded]);
        } else {
            condition.insert("$not", doc! { "$type": "array" });
            clause.insert(field, condition);
        }

        self.clauses.push(clause);
        Ok(())
    }

    fn visit_order_by(&mut self, order: &OrderBy) -> Result<(), Self::Error> {
        self.sort.insert(
            KeySanitizer::sanitize_path(&order.field),
            match order.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            },
        );
        Ok(())
    }

    fn visit_limit(&mut self, limit: u32) -> Result<(), Self::Error> {
        self.limit = Some(limit);
        Ok(())
    }
}
