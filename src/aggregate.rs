//! Aggregate folds over a selection bitmap. All in-scope aggregates
//! (sum/count/avg/min/max) are associative/commutative and fold in any
//! order (spec §5); `group_by` and `distinct` are supplemented execution
//! paths for the logical `Distinct`/grouping nodes.

use std::collections::HashMap;

use crate::error::{QueryError, Result};
use crate::record::RecordValue;
use crate::store::bitmap::SelectionBitmap;
use crate::store::FrozenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Sum => "sum",
            AggregateKind::Count => "count",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateResult {
    Int(i64),
    Float(f64),
}

impl AggregateResult {
    pub fn as_f64(&self) -> f64 {
        match self {
            AggregateResult::Int(v) => *v as f64,
            AggregateResult::Float(v) => *v,
        }
    }
}

/// Fold `kind` over the rows selected by `selection`. `field` is required
/// for every kind except `Count` without a field (row count).
pub fn aggregate(store: &FrozenStore, selection: &SelectionBitmap, kind: AggregateKind, field: Option<&str>) -> Result<AggregateResult> {
    if kind == AggregateKind::Count && field.is_none() {
        return Ok(AggregateResult::Int(selection.count_selected() as i64));
    }

    let field = field.ok_or_else(|| QueryError::UnsupportedOperation(format!("{} requires a field", kind.name())))?;
    let values = collect_non_null_f64(store, field, selection)?;

    Ok(match kind {
        AggregateKind::Count => AggregateResult::Int(values.len() as i64),
        AggregateKind::Sum => AggregateResult::Float(values.iter().sum()),
        AggregateKind::Avg => {
            if values.is_empty() {
                AggregateResult::Float(0.0)
            } else {
                AggregateResult::Float(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        AggregateKind::Min => AggregateResult::Float(values.into_iter().fold(f64::INFINITY, f64::min)),
        AggregateKind::Max => AggregateResult::Float(values.into_iter().fold(f64::NEG_INFINITY, f64::max)),
    })
}

fn collect_non_null_f64(store: &FrozenStore, field: &str, selection: &SelectionBitmap) -> Result<Vec<f64>> {
    let column = store.column(field)?;
    let mut out = Vec::new();
    for row in selection.iter_set_rows() {
        if !column.is_valid(row) {
            continue;
        }
        let value = match column.get_i32(row) {
            Ok(Some(v)) => v as f64,
            Ok(None) => continue,
            Err(_) => match column.get_f64(row)? {
                Some(v) => v,
                None => continue,
            },
        };
        out.push(value);
    }
    Ok(out)
}

/// Distinct values of `field` among selected rows, first-occurrence order.
pub fn distinct(store: &FrozenStore, selection: &SelectionBitmap, field: &str) -> Result<Vec<RecordValue>> {
    let _ = store.column(field)?; // validates the field exists
    let mut seen: HashMap<String, ()> = HashMap::new();
    let mut out = Vec::new();
    for row in selection.iter_set_rows() {
        let value = read_record_value(store, field, row)?;
        let key = distinct_key(&value);
        if seen.insert(key, ()).is_none() {
            out.push(value);
        }
    }
    Ok(out)
}

/// Group selected rows by `field`, returning each group key alongside the
/// selection bitmap (over the full store) of rows in that group.
pub fn group_by(store: &FrozenStore, selection: &SelectionBitmap, field: &str) -> Result<Vec<(RecordValue, SelectionBitmap)>> {
    let mut groups: Vec<(RecordValue, SelectionBitmap)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let row_count = store.row_count();
    for row in selection.iter_set_rows() {
        let value = read_record_value(store, field, row)?;
        let key = distinct_key(&value);
        let group_idx = match index.get(&key) {
            Some(&i) => i,
            None => {
                let i = groups.len();
                index.insert(key, i);
                groups.push((value, SelectionBitmap::new_empty(row_count)));
                i
            }
        };
        groups[group_idx].1.set(row);
    }
    Ok(groups)
}

fn read_record_value(store: &FrozenStore, field: &str, row: usize) -> Result<RecordValue> {
    let column = store.column(field)?;
    if !column.is_valid(row) {
        return Ok(RecordValue::Null);
    }
    if let Some(v) = column.get_i32(row).unwrap_or(None) {
        return Ok(RecordValue::Int32(v));
    }
    if let Some(v) = column.get_f64(row).unwrap_or(None) {
        return Ok(RecordValue::Float64(v));
    }
    if let Some(v) = column.get_str(row)? {
        return Ok(RecordValue::Utf8(v.to_string()));
    }
    Ok(RecordValue::Null)
}

fn distinct_key(value: &RecordValue) -> String {
    match value {
        RecordValue::Int32(v) => format!("i:{v}"),
        RecordValue::Float64(v) => format!("f:{v}"),
        RecordValue::Utf8(v) => format!("s:{v}"),
        RecordValue::Null => "n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;
    use crate::record::Record;
    use crate::schema::{Field, LogicalType, Schema};
    use crate::store::StoreBuilder;

    fn age_salary_store(n: i32) -> FrozenStore {
        let schema = Schema::new(vec![
            Field::new("age", LogicalType::Int32, false),
            Field::new("salary", LogicalType::Float64, false),
        ]);
        let mut builder = StoreBuilder::new(schema);
        let records: Vec<Record> = (0..n)
            .map(|i| {
                let age = 20 + (i % 45);
                Record::new(vec![RecordValue::Int32(age), RecordValue::Float64((i as f64) * 1.5)])
            })
            .collect();
        builder.push_all(&records).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn sum_over_sparse_filter_matches_manual_sum() {
        let store = age_salary_store(1_000_000);
        let preds = vec![Predicate::gt("age", 63)];
        let selection = crate::filter::sequential::filter_sequential(&store, &preds, 0..store.row_count()).unwrap();
        let result = aggregate(&store, &selection, AggregateKind::Sum, Some("salary")).unwrap();

        let mut expected = 0.0f64;
        for row in 0..store.row_count() {
            if store.get_i32("age", row).unwrap().unwrap() > 63 {
                expected += store.get_f64("salary", row).unwrap().unwrap();
            }
        }
        assert_eq!(result, AggregateResult::Float(expected));
    }

    #[test]
    fn count_of_null_scores() {
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
        let store = builder.build().unwrap();

        let preds = vec![Predicate::is_null("score")];
        let selection = crate::filter::sequential::filter_sequential(&store, &preds, 0..store.row_count()).unwrap();
        assert_eq!(selection.count_selected(), 1);

        let name_null_preds = vec![Predicate::is_null("name")];
        let name_selection = crate::filter::sequential::filter_sequential(&store, &name_null_preds, 0..store.row_count()).unwrap();
        let rows: Vec<usize> = name_selection.iter_set_rows().collect();
        assert_eq!(rows, vec![2]);
    }

    #[test]
    fn group_by_splits_rows_by_key() {
        let store = age_salary_store(100);
        let selection = SelectionBitmap::new_all_selected(store.row_count());
        let groups = group_by(&store, &selection, "age").unwrap();
        let total: usize = groups.iter().map(|(_, bm)| bm.count_selected()).sum();
        assert_eq!(total, 100);
        assert_eq!(groups.len(), 45);
    }
}
