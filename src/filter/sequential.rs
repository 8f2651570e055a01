//! Sequential filter strategy: iterate rows 0..N, apply the predicate
//! conjunction, set the bit.

use crate::error::Result;
use crate::predicate::Predicate;
use crate::store::bitmap::SelectionBitmap;
use crate::store::FrozenStore;

pub fn filter_sequential(store: &FrozenStore, predicates: &[Predicate], range: std::ops::Range<usize>) -> Result<SelectionBitmap> {
    let len = range.end - range.start;
    let mut bitmap = SelectionBitmap::new_empty(len);
    if predicates.is_empty() {
        return Ok(SelectionBitmap::new_all_selected(len));
    }
    for row in range.clone() {
        let mut selected = true;
        for pred in predicates {
            if !pred.eval(store, row)?.selects() {
                selected = false;
                break;
            }
        }
        if selected {
            bitmap.set(row - range.start);
        }
    }
    Ok(bitmap)
}
