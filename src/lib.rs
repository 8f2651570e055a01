//! In-memory columnar query engine over frozen record batches: typed
//! column store with optional dictionary encoding, a tri-valued predicate
//! evaluator, three interchangeable filter strategies, a cost-based
//! logical/physical planner, and an adaptive executor that learns the
//! fastest strategy per recurring query shape.

pub mod adaptive;
pub mod aggregate;
pub mod error;
pub mod executor;
pub mod filter;
pub mod plan;
pub mod predicate;
pub mod record;
pub mod schema;
pub mod store;

pub use adaptive::AdaptiveTracker;
pub use error::{QueryError, Result};
pub use executor::{execute, CancellationToken, QueryExecutionContext, QueryOptions, QueryResult};
pub use filter::Strategy;
pub use plan::LogicalPlan;
pub use predicate::Predicate;
pub use record::{Record, RecordValue};
pub use schema::{Field, LogicalType, Schema};
pub use store::{FrozenStore, StoreBuilder};

/// Installs a process-wide `tracing` subscriber from `RUST_LOG` (or `info`
/// if unset). Idempotent; safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
