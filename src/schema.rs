//! Record schema: the fixed, ordered list of typed fields a store is built
//! against.

use serde::{Deserialize, Serialize};

/// Logical types in scope: signed 32-bit integer, 64-bit float, UTF-8 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalType {
    Int32,
    Float64,
    Utf8,
}

impl LogicalType {
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            LogicalType::Int32 => Some(4),
            LogicalType::Float64 => Some(8),
            LogicalType::Utf8 => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, logical_type: LogicalType, nullable: bool) -> Self {
        Self { name: name.into(), logical_type, nullable }
    }
}

/// A schema is an ordered list of fields, fixed at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Project this schema down to the named fields, in the order given.
    /// Used by `Project` plan nodes to compute their output schema.
    pub fn project(&self, names: &[String]) -> crate::error::Result<Schema> {
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let field = self
                .field(name)
                .ok_or_else(|| crate::error::QueryError::SchemaMismatch(format!("no such field: {name}")))?;
            fields.push(field.clone());
        }
        Ok(Schema::new(fields))
    }
}
