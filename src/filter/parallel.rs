//! Parallel filter strategy: partition the row range into chunks (default
//! 65536 rows, 64-aligned), evaluate each chunk with Sequential or SIMD, and
//! concatenate the resulting blocks. No synchronization beyond partition
//! assignment and rayon's join at chunk boundaries.

use rayon::prelude::*;

use crate::error::Result;
use crate::filter::sequential::filter_sequential;
use crate::filter::simd::filter_simd;
use crate::predicate::Predicate;
use crate::store::bitmap::SelectionBitmap;
use crate::store::FrozenStore;

/// Inner strategy used to evaluate each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerStrategy {
    Sequential,
    Simd,
}

pub const DEFAULT_CHUNK_ROWS: usize = 65_536;

fn align_down_64(n: usize) -> usize {
    (n / 64) * 64
}

pub fn chunk_ranges(row_count: usize, chunk_rows: usize) -> Vec<std::ops::Range<usize>> {
    let aligned_chunk = align_down_64(chunk_rows).max(64);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < row_count {
        let end = (start + aligned_chunk).min(row_count);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

pub fn filter_parallel(
    store: &FrozenStore,
    predicates: &[Predicate],
    chunk_rows: usize,
    inner: InnerStrategy,
) -> Result<SelectionBitmap> {
    let row_count = store.row_count();
    if predicates.is_empty() {
        return Ok(SelectionBitmap::new_all_selected(row_count));
    }
    let ranges = chunk_ranges(row_count, chunk_rows);

    let parts: Result<Vec<(SelectionBitmap, usize)>> = ranges
        .into_par_iter()
        .map(|range| {
            let start = range.start;
            let bitmap = match inner {
                InnerStrategy::Sequential => filter_sequential(store, predicates, range.clone())?,
                InnerStrategy::Simd => filter_simd(store, predicates, range.clone())?,
            };
            Ok((bitmap, start))
        })
        .collect();

    Ok(SelectionBitmap::concat(parts?, row_count))
}
