use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum QueryError {
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("query cancelled")]
    Cancelled,

    #[error("build failed: {0}")]
    BuildFailed(String),
}

impl QueryError {
    /// Build an `UnsupportedOperation` naming the rejected operator, as
    /// required of the adapter boundary for `Join`/`GroupJoin`.
    pub fn not_supported(operator: &str) -> Self {
        QueryError::UnsupportedOperation(format!("{operator} is not supported"))
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::BuildFailed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
