//! Store builder: buffers incoming records, recommends an encoding per
//! column, and seals a `FrozenStore`. See spec §4.A/§4.B.

use std::collections::HashMap;

use crate::error::{QueryError, Result};
use crate::record::{Record, RecordValue};
use crate::schema::{LogicalType, Schema};
use crate::store::bitmap::ValidityBitmap;
use crate::store::column::{Column, ColumnRepr, DistinctValues, IndexBuffer, IndexWidth};
use crate::store::FrozenStore;

/// Encoding recommendation for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendedEncoding {
    Primitive,
    Dictionary,
}

/// Per-column build-time statistics (spec §4.B). Written once during build,
/// read-only thereafter.
#[derive(Debug, Clone)]
pub struct ColumnBuildStats {
    pub total_count: usize,
    pub distinct_count: usize,
    pub null_count: usize,
    pub recommended_encoding: RecommendedEncoding,
    pub estimated_bytes_saved: i64,
}

#[derive(Debug, Clone, Default)]
pub struct BuildStatistics {
    pub per_column: HashMap<String, ColumnBuildStats>,
}

impl BuildStatistics {
    /// Sum of every column's (non-negative) estimated savings. Non-string
    /// columns contribute only when dictionary-encoded and the estimate is
    /// non-negative; a column kept Primitive contributes zero.
    pub fn estimate_memory_savings(&self) -> i64 {
        self.per_column
            .values()
            .filter(|s| s.recommended_encoding == RecommendedEncoding::Dictionary)
            .map(|s| s.estimated_bytes_saved.max(0))
            .sum()
    }
}

/// Recommend Dictionary iff `distinct_count <= max(16, total_count / 10)`
/// and `total_count >= 100`.
pub fn recommend_encoding(distinct_count: usize, total_count: usize) -> RecommendedEncoding {
    let threshold = (total_count / 10).max(16);
    if total_count >= 100 && distinct_count <= threshold {
        RecommendedEncoding::Dictionary
    } else {
        RecommendedEncoding::Primitive
    }
}

struct ColumnIntake {
    field_type: LogicalType,
    nullable: bool,
    values: Vec<RecordValue>,
    // Insertion-ordered, deterministic distinct set.
    distinct_order: Vec<RecordValue>,
    seen: HashMap<DistinctKey, usize>,
    null_count: usize,
}

/// `RecordValue` isn't `Hash`/`Eq` (floats), so distinct tracking uses a
/// string-keyed map — acceptable at build time, off the hot query path.
#[derive(Hash, PartialEq, Eq, Clone)]
struct DistinctKey(String);

fn distinct_key(v: &RecordValue) -> DistinctKey {
    DistinctKey(match v {
        RecordValue::Int32(i) => format!("i{i}"),
        RecordValue::Float64(f) => format!("f{}", f.to_bits()),
        RecordValue::Utf8(s) => format!("s{s}"),
        RecordValue::Null => "n".to_string(),
    })
}

impl ColumnIntake {
    fn new(field_type: LogicalType, nullable: bool) -> Self {
        Self {
            field_type,
            nullable,
            values: Vec::new(),
            distinct_order: Vec::new(),
            seen: HashMap::new(),
            null_count: 0,
        }
    }

    fn push(&mut self, value: RecordValue) -> Result<()> {
        match (&value, self.field_type) {
            (RecordValue::Null, _) => self.null_count += 1,
            (RecordValue::Int32(_), LogicalType::Int32) => {}
            (RecordValue::Float64(_), LogicalType::Float64) => {}
            (RecordValue::Utf8(_), LogicalType::Utf8) => {}
            _ => return Err(QueryError::SchemaMismatch(format!("value {value:?} does not match field type"))),
        }
        if !value.is_null() {
            let key = distinct_key(&value);
            if !self.seen.contains_key(&key) {
                self.seen.insert(key, self.distinct_order.len());
                self.distinct_order.push(value.clone());
            }
        }
        self.values.push(value);
        Ok(())
    }

    fn distinct_count(&self) -> usize {
        self.distinct_order.len()
    }
}

pub struct StoreBuilder {
    schema: Schema,
    intakes: Vec<ColumnIntake>,
    row_count: usize,
}

impl StoreBuilder {
    pub fn new(schema: Schema) -> Self {
        let intakes = schema
            .fields()
            .iter()
            .map(|f| ColumnIntake::new(f.logical_type, f.nullable))
            .collect();
        Self { schema, intakes, row_count: 0 }
    }

    /// Buffer one record. The record's values must positionally match the
    /// schema; mismatches and overflow are fatal `BuildFailed`/`SchemaMismatch`
    /// errors, never partial ingestion.
    pub fn push(&mut self, record: &Record) -> Result<()> {
        if record.values.len() != self.schema.len() {
            return Err(QueryError::SchemaMismatch(format!(
                "record has {} values, schema has {} fields",
                record.values.len(),
                self.schema.len()
            )));
        }
        for (intake, value) in self.intakes.iter_mut().zip(record.values.iter()) {
            if value.is_null() && !intake.nullable {
                return Err(QueryError::SchemaMismatch("null value in non-nullable field".into()));
            }
            intake.push(value.clone())?;
        }
        self.row_count += 1;
        Ok(())
    }

    pub fn push_all<'a>(&mut self, records: impl IntoIterator<Item = &'a Record>) -> Result<()> {
        for r in records {
            self.push(r)?;
        }
        Ok(())
    }

    /// Decide encoding per column, emit contiguous buffers, and seal.
    /// Dictionary order reflects first-occurrence order; build is
    /// deterministic for a given input order.
    pub fn build(self) -> Result<FrozenStore> {
        let row_count = self.row_count;
        let mut columns = Vec::with_capacity(self.intakes.len());
        let mut stats = BuildStatistics::default();

        for (field, intake) in self.schema.fields().iter().zip(self.intakes.into_iter()) {
            let distinct_count = intake.distinct_count();
            let encoding = recommend_encoding(distinct_count, row_count);

            let validity = if field.nullable && intake.null_count > 0 {
                let mut bm = ValidityBitmap::new_all_valid(row_count);
                for (row, v) in intake.values.iter().enumerate() {
                    if v.is_null() {
                        bm.set_valid(row, false);
                    }
                }
                Some(bm)
            } else {
                None
            };

            let primitive_bytes = field
                .logical_type
                .fixed_width()
                .map(|w| row_count * w)
                .unwrap_or_else(|| {
                    intake
                        .values
                        .iter()
                        .map(|v| v.as_str().map(|s| s.len()).unwrap_or(0))
                        .sum::<usize>()
                        + (row_count + 1) * 4
                });

            let repr = if encoding == RecommendedEncoding::Dictionary {
                build_dictionary_repr(field.logical_type, &intake)
            } else {
                build_primitive_repr(field.logical_type, &intake)
            }?;

            let dict_bytes = match &repr {
                ColumnRepr::Dictionary { distinct, indices } => distinct.bytes_len() + indices.bytes_len(),
                _ => primitive_bytes,
            };
            let estimated_bytes_saved = primitive_bytes as i64 - dict_bytes as i64;

            stats.per_column.insert(
                field.name.clone(),
                ColumnBuildStats {
                    total_count: row_count,
                    distinct_count,
                    null_count: intake.null_count,
                    recommended_encoding: encoding,
                    estimated_bytes_saved,
                },
            );

            columns.push(Column { validity, repr });
        }

        Ok(FrozenStore::new(self.schema, columns, row_count, stats))
    }
}

fn build_primitive_repr(logical_type: LogicalType, intake: &ColumnIntake) -> Result<ColumnRepr> {
    match logical_type {
        LogicalType::Int32 => {
            let v = intake.values.iter().map(|x| x.as_i32().unwrap_or(0)).collect();
            Ok(ColumnRepr::PrimitiveInt32(v))
        }
        LogicalType::Float64 => {
            let v = intake.values.iter().map(|x| x.as_f64().unwrap_or(0.0)).collect();
            Ok(ColumnRepr::PrimitiveFloat64(v))
        }
        LogicalType::Utf8 => {
            let mut offsets = Vec::with_capacity(intake.values.len() + 1);
            let mut bytes = Vec::new();
            offsets.push(0u32);
            for v in &intake.values {
                let s = v.as_str().unwrap_or("");
                bytes.extend_from_slice(s.as_bytes());
                let offset = u32::try_from(bytes.len())
                    .map_err(|_| QueryError::BuildFailed("string offset overflow".into()))?;
                offsets.push(offset);
            }
            Ok(ColumnRepr::PrimitiveString { offsets, bytes })
        }
    }
}

fn build_dictionary_repr(logical_type: LogicalType, intake: &ColumnIntake) -> Result<ColumnRepr> {
    let width = IndexWidth::for_distinct_count(intake.distinct_count());
    let mut indices = IndexBuffer::with_capacity(width, intake.values.len());

    let (distinct, position_of): (DistinctValues, HashMap<DistinctKey, usize>) = match logical_type {
        LogicalType::Int32 => {
            let mut values = Vec::with_capacity(intake.distinct_order.len());
            let mut pos = HashMap::new();
            for v in &intake.distinct_order {
                pos.insert(distinct_key(v), values.len());
                values.push(v.as_i32().unwrap());
            }
            (DistinctValues::Int32(values), pos)
        }
        LogicalType::Float64 => {
            let mut values = Vec::with_capacity(intake.distinct_order.len());
            let mut pos = HashMap::new();
            for v in &intake.distinct_order {
                pos.insert(distinct_key(v), values.len());
                values.push(v.as_f64().unwrap());
            }
            (DistinctValues::Float64(values), pos)
        }
        LogicalType::Utf8 => {
            let mut values = Vec::with_capacity(intake.distinct_order.len());
            let mut pos = HashMap::new();
            for v in &intake.distinct_order {
                pos.insert(distinct_key(v), values.len());
                values.push(v.as_str().unwrap().to_string());
            }
            (DistinctValues::Utf8(values), pos)
        }
    };

    for v in &intake.values {
        if v.is_null() {
            indices.push(0);
        } else {
            let idx = position_of[&distinct_key(v)];
            indices.push(idx);
        }
    }

    Ok(ColumnRepr::Dictionary { distinct, indices })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_threshold_contract() {
        assert_eq!(recommend_encoding(3, 10_000), RecommendedEncoding::Dictionary);
        assert_eq!(recommend_encoding(1000, 1000), RecommendedEncoding::Primitive);
        assert_eq!(recommend_encoding(16, 99), RecommendedEncoding::Primitive); // total_count < 100
        assert_eq!(recommend_encoding(16, 100), RecommendedEncoding::Dictionary);
        assert_eq!(recommend_encoding(17, 100), RecommendedEncoding::Primitive);
    }
}
