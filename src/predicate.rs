//! Typed comparison and null-check predicates, evaluated tri-valued
//! (true/false/null) against a store and a row index. See spec §4.C.

use crate::error::Result;
use crate::record::RecordValue;
use crate::store::FrozenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    fn apply<T: PartialOrd>(&self, a: T, b: T) -> bool {
        match self {
            ComparisonOp::Eq => a == b,
            ComparisonOp::Ne => a != b,
            ComparisonOp::Lt => a < b,
            ComparisonOp::Le => a <= b,
            ComparisonOp::Gt => a > b,
            ComparisonOp::Ge => a >= b,
        }
    }
}

/// A tri-valued evaluation outcome. A null result never selects the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriBool {
    True,
    False,
    Null,
}

impl TriBool {
    pub fn selects(&self) -> bool {
        matches!(self, TriBool::True)
    }

    fn and(self, other: TriBool) -> TriBool {
        match (self, other) {
            (TriBool::False, _) | (_, TriBool::False) => TriBool::False,
            (TriBool::Null, _) | (_, TriBool::Null) => TriBool::Null,
            (TriBool::True, TriBool::True) => TriBool::True,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Predicate {
    Comparison { field: String, op: ComparisonOp, literal: RecordValue },
    IsNull { field: String },
    IsNotNull { field: String },
    /// Conjunction (AND) over a list of predicates — the only user-exposed
    /// combinator; no OR surface in scope (spec §4.C).
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, literal: impl Into<RecordValue>) -> Self {
        Predicate::Comparison { field: field.into(), op: ComparisonOp::Eq, literal: literal.into() }
    }

    pub fn gt(field: impl Into<String>, literal: impl Into<RecordValue>) -> Self {
        Predicate::Comparison { field: field.into(), op: ComparisonOp::Gt, literal: literal.into() }
    }

    pub fn cmp(field: impl Into<String>, op: ComparisonOp, literal: impl Into<RecordValue>) -> Self {
        Predicate::Comparison { field: field.into(), op, literal: literal.into() }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull { field: field.into() }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Predicate::IsNotNull { field: field.into() }
    }

    /// Referenced field names, walked by `adaptive::hash_predicate_shape` so
    /// fingerprinting doesn't duplicate this per-variant traversal.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Predicate::Comparison { field, .. } => vec![field.as_str()],
            Predicate::IsNull { field } | Predicate::IsNotNull { field } => vec![field.as_str()],
            Predicate::And(preds) => preds.iter().flat_map(|p| p.fields()).collect(),
        }
    }

    pub fn eval(&self, store: &FrozenStore, row: usize) -> Result<TriBool> {
        match self {
            Predicate::Comparison { field, op, literal } => eval_comparison(store, field, *op, literal, row),
            Predicate::IsNull { field } => Ok(if store.is_valid(field, row)? { TriBool::False } else { TriBool::True }),
            Predicate::IsNotNull { field } => Ok(if store.is_valid(field, row)? { TriBool::True } else { TriBool::False }),
            Predicate::And(preds) => {
                let mut acc = TriBool::True;
                for p in preds {
                    acc = acc.and(p.eval(store, row)?);
                    if acc == TriBool::False {
                        break;
                    }
                }
                Ok(acc)
            }
        }
    }
}

fn eval_comparison(store: &FrozenStore, field: &str, op: ComparisonOp, literal: &RecordValue, row: usize) -> Result<TriBool> {
    Ok(match literal {
        RecordValue::Int32(lit) => match store.get_i32(field, row)? {
            Some(v) => bool_to_tri(op.apply(v, *lit)),
            None => TriBool::Null,
        },
        RecordValue::Float64(lit) => match store.get_f64(field, row)? {
            Some(v) => bool_to_tri(op.apply(v, *lit)),
            None => TriBool::Null,
        },
        RecordValue::Utf8(lit) => match store.get_str(field, row)? {
            Some(v) => bool_to_tri(op.apply(v, lit.as_str())),
            None => TriBool::Null,
        },
        RecordValue::Null => TriBool::Null,
    })
}

fn bool_to_tri(b: bool) -> TriBool {
    if b { TriBool::True } else { TriBool::False }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, LogicalType, Schema};
    use crate::store::StoreBuilder;
    use crate::record::Record;

    fn sample_store() -> FrozenStore {
        let schema = Schema::new(vec![
            Field::new("name", LogicalType::Utf8, true),
            Field::new("score", LogicalType::Float64, true),
        ]);
        let mut builder = StoreBuilder::new(schema);
        builder
            .push_all(&[
                Record::new(vec![RecordValue::Utf8("Alice".into()), RecordValue::Float64(95.5)]),
                Record::new(vec![RecordValue::Utf8("Bob".into()), RecordValue::Null]),
                Record::new(vec![RecordValue::Null, RecordValue::Float64(87.0)]),
            ])
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn null_comparisons_never_select() {
        let store = sample_store();
        let pred = Predicate::gt("score", 10.0);
        assert_eq!(pred.eval(&store, 1).unwrap(), TriBool::Null);
        assert!(!pred.eval(&store, 1).unwrap().selects());
    }

    #[test]
    fn is_null_is_concrete() {
        let store = sample_store();
        assert_eq!(Predicate::is_null("name").eval(&store, 2).unwrap(), TriBool::True);
        assert_eq!(Predicate::is_not_null("name").eval(&store, 0).unwrap(), TriBool::True);
    }

    #[test]
    fn conjunction_short_circuits_on_false() {
        let store = sample_store();
        let pred = Predicate::And(vec![Predicate::eq("name", "Alice"), Predicate::gt("score", 10.0)]);
        assert!(pred.eval(&store, 0).unwrap().selects());
        assert!(!pred.eval(&store, 1).unwrap().selects());
    }
}
