//! Frozen columnar store: immutable, sealed after build, exclusively owning
//! its column buffers. See spec §3/§4.A.

pub mod bitmap;
pub mod builder;
pub mod column;

use crate::error::{QueryError, Result};
use crate::record::{Record, RecordValue};
use crate::schema::{LogicalType, Schema};

pub use builder::{BuildStatistics, RecommendedEncoding, StoreBuilder};
pub use column::Column;

/// A sealed, immutable columnar dataset. Query operators borrow it
/// read-only and may execute concurrently against it.
pub struct FrozenStore {
    schema: Schema,
    columns: Vec<Column>,
    row_count: usize,
    build_stats: BuildStatistics,
}

impl FrozenStore {
    pub(crate) fn new(schema: Schema, columns: Vec<Column>, row_count: usize, build_stats: BuildStatistics) -> Self {
        Self { schema, columns, row_count, build_stats }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn build_statistics(&self) -> &BuildStatistics {
        &self.build_stats
    }

    /// Whole-column read view, by field name.
    pub fn column(&self, field: &str) -> Result<&Column> {
        let idx = self
            .schema
            .index_of(field)
            .ok_or_else(|| QueryError::SchemaMismatch(format!("no such field: {field}")))?;
        Ok(&self.columns[idx])
    }

    pub fn column_at(&self, index: usize) -> Result<&Column> {
        self.columns
            .get(index)
            .ok_or_else(|| QueryError::IndexOutOfRange(format!("column index {index} out of range")))
    }

    pub fn is_valid(&self, field: &str, row: usize) -> Result<bool> {
        if row >= self.row_count {
            return Err(QueryError::IndexOutOfRange(format!("row {row} out of range")));
        }
        Ok(self.column(field)?.is_valid(row))
    }

    pub fn get_i32(&self, field: &str, row: usize) -> Result<Option<i32>> {
        self.column(field)?.get_i32(row)
    }

    pub fn get_f64(&self, field: &str, row: usize) -> Result<Option<f64>> {
        self.column(field)?.get_f64(row)
    }

    pub fn get_str(&self, field: &str, row: usize) -> Result<Option<&str>> {
        self.column(field)?.get_str(row)
    }

    /// Reconstruct rows element-wise, matching `StoreBuilder::build`'s input
    /// order (round-trip guarantee, spec §4.A).
    pub fn to_records(&self) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(self.row_count);
        for row in 0..self.row_count {
            let mut values = Vec::with_capacity(self.schema.len());
            for field in self.schema.fields() {
                let value = match field.logical_type {
                    LogicalType::Int32 => match self.get_i32(&field.name, row)? {
                        Some(v) => RecordValue::Int32(v),
                        None => RecordValue::Null,
                    },
                    LogicalType::Float64 => match self.get_f64(&field.name, row)? {
                        Some(v) => RecordValue::Float64(v),
                        None => RecordValue::Null,
                    },
                    LogicalType::Utf8 => match self.get_str(&field.name, row)? {
                        Some(v) => RecordValue::Utf8(v.to_string()),
                        None => RecordValue::Null,
                    },
                };
                values.push(value);
            }
            records.push(Record::new(values));
        }
        Ok(records)
    }

    pub fn memory_bytes(&self) -> usize {
        self.columns.iter().map(|c| c.memory_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, LogicalType};

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("id", LogicalType::Int32, false),
            Field::new("name", LogicalType::Utf8, true),
            Field::new("score", LogicalType::Float64, true),
        ])
    }

    #[test]
    fn round_trip_low_cardinality_strings() {
        let mut builder = StoreBuilder::new(schema());
        let records: Vec<Record> = (0..10_000)
            .map(|i| {
                let name = match i % 3 {
                    0 => "A",
                    1 => "B",
                    _ => "C",
                };
                Record::new(vec![RecordValue::Int32(i), RecordValue::Utf8(name.into()), RecordValue::Float64(i as f64)])
            })
            .collect();
        builder.push_all(&records).unwrap();
        let store = builder.build().unwrap();

        let stats = &store.build_statistics().per_column["name"];
        assert_eq!(stats.distinct_count, 3);
        assert_eq!(stats.recommended_encoding, RecommendedEncoding::Dictionary);

        let round_tripped = store.to_records().unwrap();
        assert_eq!(round_tripped, records);
    }

    #[test]
    fn round_trip_high_cardinality_strings() {
        let mut builder = StoreBuilder::new(schema());
        let records: Vec<Record> = (0..1000)
            .map(|i| {
                Record::new(vec![
                    RecordValue::Int32(i),
                    RecordValue::Utf8(format!("UniqueValue_{i}")),
                    RecordValue::Float64(i as f64),
                ])
            })
            .collect();
        builder.push_all(&records).unwrap();
        let store = builder.build().unwrap();

        let stats = &store.build_statistics().per_column["name"];
        assert_eq!(stats.distinct_count, 1000);
        assert_eq!(stats.recommended_encoding, RecommendedEncoding::Primitive);
        assert_eq!(store.get_str("name", 500).unwrap(), Some("UniqueValue_500"));
    }

    #[test]
    fn null_predicates_round_trip() {
        let mut builder = StoreBuilder::new(schema());
        builder
            .push_all(&[
                Record::new(vec![RecordValue::Int32(1), RecordValue::Utf8("Alice".into()), RecordValue::Float64(95.5)]),
                Record::new(vec![RecordValue::Int32(2), RecordValue::Utf8("Bob".into()), RecordValue::Null]),
                Record::new(vec![RecordValue::Int32(3), RecordValue::Null, RecordValue::Float64(87.0)]),
            ])
            .unwrap();
        let store = builder.build().unwrap();
        assert!(store.is_valid("score", 0).unwrap());
        assert!(!store.is_valid("score", 1).unwrap());
        assert!(!store.is_valid("name", 2).unwrap());
    }

    #[test]
    fn schema_mismatch_is_fatal() {
        let mut builder = StoreBuilder::new(schema());
        let bad = Record::new(vec![RecordValue::Int32(1)]);
        assert!(builder.push(&bad).is_err());
    }
}
