//! Typed column representations: primitive (fixed-width), string-primitive
//! (offsets + bytes), and dictionary-encoded (distinct-values table + narrow
//! index buffer).

use crate::error::{QueryError, Result};
use crate::store::bitmap::ValidityBitmap;

/// Index buffer width, chosen by distinct count at build time: ≤256 → 8
/// bits, ≤65536 → 16 bits, else 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    pub fn for_distinct_count(distinct_count: usize) -> Self {
        if distinct_count <= 256 {
            IndexWidth::U8
        } else if distinct_count <= 65_536 {
            IndexWidth::U16
        } else {
            IndexWidth::U32
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            IndexWidth::U8 => 1,
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// Narrow index buffer, one of three widths, storing `0..distinct_count`.
#[derive(Debug, Clone)]
pub enum IndexBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    pub fn with_capacity(width: IndexWidth, capacity: usize) -> Self {
        match width {
            IndexWidth::U8 => IndexBuffer::U8(Vec::with_capacity(capacity)),
            IndexWidth::U16 => IndexBuffer::U16(Vec::with_capacity(capacity)),
            IndexWidth::U32 => IndexBuffer::U32(Vec::with_capacity(capacity)),
        }
    }

    pub fn push(&mut self, index: usize) {
        match self {
            IndexBuffer::U8(v) => v.push(index as u8),
            IndexBuffer::U16(v) => v.push(index as u16),
            IndexBuffer::U32(v) => v.push(index as u32),
        }
    }

    pub fn get(&self, row: usize) -> usize {
        match self {
            IndexBuffer::U8(v) => v[row] as usize,
            IndexBuffer::U16(v) => v[row] as usize,
            IndexBuffer::U32(v) => v[row] as usize,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U8(v) => v.len(),
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn bytes_len(&self) -> usize {
        match self {
            IndexBuffer::U8(v) => v.len(),
            IndexBuffer::U16(v) => v.len() * 2,
            IndexBuffer::U32(v) => v.len() * 4,
        }
    }
}

/// The distinct-values table backing a dictionary column.
#[derive(Debug, Clone)]
pub enum DistinctValues {
    Int32(Vec<i32>),
    Float64(Vec<f64>),
    Utf8(Vec<String>),
}

impl DistinctValues {
    pub fn len(&self) -> usize {
        match self {
            DistinctValues::Int32(v) => v.len(),
            DistinctValues::Float64(v) => v.len(),
            DistinctValues::Utf8(v) => v.len(),
        }
    }

    pub fn bytes_len(&self) -> usize {
        match self {
            DistinctValues::Int32(v) => v.len() * 4,
            DistinctValues::Float64(v) => v.len() * 8,
            DistinctValues::Utf8(v) => v.iter().map(|s| s.len()).sum(),
        }
    }
}

/// A single column's storage, plus the validity bitmap that travels with it
/// when the field is nullable. Absent bitmap ⇔ the column has no nulls.
pub struct Column {
    pub validity: Option<ValidityBitmap>,
    pub repr: ColumnRepr,
}

pub enum ColumnRepr {
    /// Contiguous fixed-width buffer.
    PrimitiveInt32(Vec<i32>),
    PrimitiveFloat64(Vec<f64>),
    /// Offsets (N+1, monotonic) + byte buffer.
    PrimitiveString { offsets: Vec<u32>, bytes: Vec<u8> },
    /// Distinct-values table + narrow index buffer. Null rows carry index 0
    /// and a cleared validity bit.
    Dictionary { distinct: DistinctValues, indices: IndexBuffer },
}

impl Column {
    pub fn row_count(&self) -> usize {
        match &self.repr {
            ColumnRepr::PrimitiveInt32(v) => v.len(),
            ColumnRepr::PrimitiveFloat64(v) => v.len(),
            ColumnRepr::PrimitiveString { offsets, .. } => offsets.len().saturating_sub(1),
            ColumnRepr::Dictionary { indices, .. } => indices.len(),
        }
    }

    pub fn is_valid(&self, row: usize) -> bool {
        match &self.validity {
            Some(bm) => bm.is_valid(row),
            None => true,
        }
    }

    pub fn get_i32(&self, row: usize) -> Result<Option<i32>> {
        if !self.is_valid(row) {
            return Ok(None);
        }
        match &self.repr {
            ColumnRepr::PrimitiveInt32(v) => Ok(Some(v[row])),
            ColumnRepr::Dictionary { distinct: DistinctValues::Int32(d), indices } => {
                Ok(Some(d[indices.get(row)]))
            }
            _ => Err(QueryError::TypeMismatch("column is not i32".into())),
        }
    }

    pub fn get_f64(&self, row: usize) -> Result<Option<f64>> {
        if !self.is_valid(row) {
            return Ok(None);
        }
        match &self.repr {
            ColumnRepr::PrimitiveFloat64(v) => Ok(Some(v[row])),
            ColumnRepr::Dictionary { distinct: DistinctValues::Float64(d), indices } => {
                Ok(Some(d[indices.get(row)]))
            }
            _ => Err(QueryError::TypeMismatch("column is not f64".into())),
        }
    }

    pub fn get_str(&self, row: usize) -> Result<Option<&str>> {
        if !self.is_valid(row) {
            return Ok(None);
        }
        match &self.repr {
            ColumnRepr::PrimitiveString { offsets, bytes } => {
                let start = offsets[row] as usize;
                let end = offsets[row + 1] as usize;
                std::str::from_utf8(&bytes[start..end])
                    .map(Some)
                    .map_err(|e| QueryError::BuildFailed(e.to_string()))
            }
            ColumnRepr::Dictionary { distinct: DistinctValues::Utf8(d), indices } => {
                Ok(Some(d[indices.get(row)].as_str()))
            }
            _ => Err(QueryError::TypeMismatch("column is not a string".into())),
        }
    }

    /// Raw bytes of the primitive buffer, for SIMD/sequential filter kernels
    /// that want a contiguous `&[i32]`/`&[f64]` slice. `None` for
    /// string/dictionary columns, which the kernel evaluates via typed
    /// accessors instead.
    pub fn as_i32_slice(&self) -> Option<&[i32]> {
        match &self.repr {
            ColumnRepr::PrimitiveInt32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        match &self.repr {
            ColumnRepr::PrimitiveFloat64(v) => Some(v),
            _ => None,
        }
    }

    pub fn memory_bytes(&self) -> usize {
        let body = match &self.repr {
            ColumnRepr::PrimitiveInt32(v) => v.len() * 4,
            ColumnRepr::PrimitiveFloat64(v) => v.len() * 8,
            ColumnRepr::PrimitiveString { offsets, bytes } => offsets.len() * 4 + bytes.len(),
            ColumnRepr::Dictionary { distinct, indices } => distinct.bytes_len() + indices.bytes_len(),
        };
        body + self.validity.as_ref().map(|b| (b.len() + 7) / 8).unwrap_or(0)
    }
}
