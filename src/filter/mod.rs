//! Row filtering: three interchangeable strategies over the same predicate
//! conjunction, guaranteed to produce identical selection bitmaps (spec §8
//! "Strategy equivalence"). The planner picks one per query shape; the
//! adaptive executor can override it at runtime based on observed timings.

pub mod parallel;
pub mod sequential;
pub mod simd;

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::predicate::Predicate;
use crate::store::bitmap::SelectionBitmap;
use crate::store::FrozenStore;

pub use parallel::{InnerStrategy, DEFAULT_CHUNK_ROWS};

/// A filter execution strategy, as named in the cost model and recorded by
/// the adaptive executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Sequential,
    Simd,
    Parallel,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Simd => "simd",
            Strategy::Parallel => "parallel",
        }
    }
}

/// Evaluate `predicates` (conjunction) over the full row range of `store`
/// using the given strategy.
pub fn filter(store: &FrozenStore, predicates: &[Predicate], strategy: Strategy, parallel_chunk_rows: usize) -> Result<SelectionBitmap> {
    let range: Range<usize> = 0..store.row_count();
    match strategy {
        Strategy::Sequential => sequential::filter_sequential(store, predicates, range),
        Strategy::Simd => simd::filter_simd(store, predicates, range),
        Strategy::Parallel => parallel::filter_parallel(store, predicates, parallel_chunk_rows, InnerStrategy::Simd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, RecordValue};
    use crate::schema::{Field, LogicalType, Schema};
    use crate::store::StoreBuilder;

    fn int_store(n: i32) -> FrozenStore {
        let schema = Schema::new(vec![Field::new("v", LogicalType::Int32, false)]);
        let mut builder = StoreBuilder::new(schema);
        let records: Vec<Record> = (0..n).map(|i| Record::new(vec![RecordValue::Int32(i)])).collect();
        builder.push_all(&records).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn all_three_strategies_agree_on_a_sparse_predicate() {
        let store = int_store(1_000_000);
        let preds = vec![Predicate::eq("v", 999_999)];
        let seq = filter(&store, &preds, Strategy::Sequential, DEFAULT_CHUNK_ROWS).unwrap();
        let simd = filter(&store, &preds, Strategy::Simd, DEFAULT_CHUNK_ROWS).unwrap();
        let par = filter(&store, &preds, Strategy::Parallel, DEFAULT_CHUNK_ROWS).unwrap();
        assert_eq!(seq, simd);
        assert_eq!(seq, par);
        assert_eq!(seq.count_selected(), 1);
    }
}
