//! Ties the planner, adaptive tracker, filter kernel, and aggregates
//! together into a single `execute` entry point (spec §6 configuration,
//! §4.G adaptive integration, §5 cancellation).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::adaptive::{fingerprint, AdaptiveTracker, Execution};
use crate::aggregate::{self, AggregateResult};
use crate::error::{QueryError, Result};
use crate::filter::{self, Strategy, DEFAULT_CHUNK_ROWS};
use crate::plan::logical::LogicalPlan;
use crate::plan::{choose_better_plan, cost, to_physical};
use crate::store::bitmap::SelectionBitmap;
use crate::store::FrozenStore;

/// Per-query options (spec §6). All fields are exhaustively enumerated by
/// the external configuration surface; nothing is read from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub enable_parallel: bool,
    #[serde(default = "default_chunk_rows")]
    pub parallel_chunk_rows: usize,
    #[serde(default)]
    pub strategy_override: Option<Strategy>,
    #[serde(default = "default_true")]
    pub use_logical_plan_execution: bool,
    #[serde(default)]
    pub use_adaptive_execution: bool,
}

fn default_chunk_rows() -> usize {
    DEFAULT_CHUNK_ROWS
}

fn default_true() -> bool {
    true
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enable_parallel: false,
            parallel_chunk_rows: DEFAULT_CHUNK_ROWS,
            strategy_override: None,
            use_logical_plan_execution: true,
            use_adaptive_execution: false,
        }
    }
}

/// Cooperative cancellation token, consulted between partition boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Telemetry returned with every query result (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct QueryExecutionContext {
    pub strategy: Strategy,
    pub elapsed_ms: f64,
    pub row_count: usize,
    pub predicate_count: usize,
}

pub struct QueryResult {
    pub selection: SelectionBitmap,
    pub aggregate: Option<AggregateResult>,
    pub distinct_values: Option<Vec<crate::record::RecordValue>>,
    pub group_aggregates: Option<Vec<(crate::record::RecordValue, AggregateResult)>>,
    /// Populated only when the plan's outermost node is `Limit` (first `k`
    /// selected rows, ascending) or `Sort` (selected rows in sort-key
    /// order). `None` otherwise — the selection bitmap carries the row set
    /// for every other terminal operator.
    pub ordered_rows: Option<Vec<usize>>,
    pub telemetry: QueryExecutionContext,
}

/// Execute `plan` against `store`. When `use_logical_plan_execution` is set
/// (the default), lowers the plan through the cost-based planner (spec
/// §4.F) — overridden by the adaptive tracker's suggestion when
/// `use_adaptive_execution` is set, or by `strategy_override` unconditionally
/// — then runs the filter kernel and folds the terminal operator. When it is
/// unset, bypasses the planner and adaptive tracker entirely and runs the
/// naive row-wise `Sequential` interpreter (spec §6: "retained for parity
/// testing"). Records the outcome unconditionally once the query completes
/// without cancellation, whenever `use_adaptive_execution` is set (spec §9
/// open question: the rewrite wires `record_execution` unconditionally
/// rather than leaving the integration point unspecified).
pub fn execute(
    store: &FrozenStore,
    plan: &LogicalPlan,
    options: &QueryOptions,
    tracker: &AdaptiveTracker,
    cancellation: &CancellationToken,
) -> Result<QueryResult> {
    let start = Instant::now();
    let predicates = collect_predicates(plan);
    let predicate_count = predicates.len();
    let row_count = store.row_count();

    if cancellation.is_cancelled() {
        return Err(QueryError::Cancelled);
    }

    let (strategy, selection, fp) = if options.use_logical_plan_execution {
        let fp = fingerprint(plan);
        let strategy = choose_strategy(plan, options, tracker, fp, row_count, predicate_count);
        tracing::debug!(fingerprint = fp, ?strategy, row_count, predicate_count, "executing query");
        let chunk_rows = if options.enable_parallel { options.parallel_chunk_rows } else { DEFAULT_CHUNK_ROWS };
        let selection = filter::filter(store, &predicates, strategy, chunk_rows)?;
        (strategy, selection, Some(fp))
    } else {
        tracing::debug!(row_count, predicate_count, "executing query via naive row-wise interpreter");
        let selection = filter::filter(store, &predicates, Strategy::Sequential, DEFAULT_CHUNK_ROWS)?;
        (Strategy::Sequential, selection, None)
    };

    if cancellation.is_cancelled() {
        return Err(QueryError::Cancelled);
    }

    let (aggregate_result, distinct_values, group_aggregates, ordered_rows) = apply_terminal_operator(store, plan, &selection)?;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let telemetry = QueryExecutionContext { strategy, elapsed_ms, row_count, predicate_count };
    log::debug!("query finished in {elapsed_ms:.3}ms, selected {} rows", selection.count_selected());

    if options.use_adaptive_execution {
        if let Some(fp) = fp {
            tracker.record_execution(fp, Execution { strategy, elapsed_ms, row_count, predicate_count });
        }
    }

    Ok(QueryResult { selection, aggregate: aggregate_result, distinct_values, group_aggregates, ordered_rows, telemetry })
}

/// Non-adaptive strategy choice: `strategy_override` wins outright;
/// otherwise the adaptive tracker's suggestion when enabled; otherwise the
/// cost-based planner default (spec §4.F) — lower the plan via `to_physical`
/// under each candidate strategy and keep the lowest-cost one, ties favoring
/// SIMD over Parallel over Sequential.
fn choose_strategy(plan: &LogicalPlan, options: &QueryOptions, tracker: &AdaptiveTracker, fp: u64, row_count: usize, predicate_count: usize) -> Strategy {
    if let Some(strategy) = options.strategy_override {
        return strategy;
    }
    if options.use_adaptive_execution {
        return tracker.suggest_strategy(fp, row_count, predicate_count);
    }
    cost_based_strategy(plan, options.enable_parallel)
}

fn cost_based_strategy(plan: &LogicalPlan, enable_parallel: bool) -> Strategy {
    let cores = cost::available_cores();

    let mut ranked = vec![Strategy::Simd];
    if enable_parallel {
        ranked.push(Strategy::Parallel);
    }
    ranked.push(Strategy::Sequential);

    let mut best_strategy = ranked[0];
    let mut best_plan = to_physical(plan, best_strategy, best_strategy);
    for &candidate in &ranked[1..] {
        let candidate_plan = to_physical(plan, candidate, candidate);
        if candidate_plan.total_cost(cores) < best_plan.total_cost(cores) {
            best_plan = choose_better_plan(best_plan, candidate_plan, cores);
            best_strategy = candidate;
        }
    }
    best_strategy
}

fn collect_predicates(plan: &LogicalPlan) -> Vec<crate::predicate::Predicate> {
    match plan {
        LogicalPlan::Filter { input, predicates, .. } => {
            let mut all = collect_predicates(input);
            all.extend(predicates.clone());
            all
        }
        LogicalPlan::Scan { .. } => Vec::new(),
        LogicalPlan::Project { input, .. }
        | LogicalPlan::Aggregate { input, .. }
        | LogicalPlan::Distinct { input, .. }
        | LogicalPlan::GroupBy { input, .. }
        | LogicalPlan::Limit { input, .. }
        | LogicalPlan::Sort { input, .. } => collect_predicates(input),
    }
}

type TerminalOutput = (
    Option<AggregateResult>,
    Option<Vec<crate::record::RecordValue>>,
    Option<Vec<(crate::record::RecordValue, AggregateResult)>>,
    Option<Vec<usize>>,
);

fn apply_terminal_operator(store: &FrozenStore, plan: &LogicalPlan, selection: &SelectionBitmap) -> Result<TerminalOutput> {
    match plan {
        LogicalPlan::Aggregate { kind, field, .. } => {
            let result = aggregate::aggregate(store, selection, *kind, field.as_deref())?;
            Ok((Some(result), None, None, None))
        }
        LogicalPlan::Distinct { field, .. } => {
            let values = aggregate::distinct(store, selection, field)?;
            Ok((None, Some(values), None, None))
        }
        LogicalPlan::GroupBy { group_field, kind, agg_field, .. } => {
            let groups = aggregate::group_by(store, selection, group_field)?;
            let mut results = Vec::with_capacity(groups.len());
            for (key, group_selection) in groups {
                let result = aggregate::aggregate(store, &group_selection, *kind, agg_field.as_deref())?;
                results.push((key, result));
            }
            Ok((None, None, Some(results), None))
        }
        LogicalPlan::Limit { k, .. } => {
            let rows: Vec<usize> = selection.iter_set_rows().take(*k).collect();
            Ok((None, None, None, Some(rows)))
        }
        LogicalPlan::Sort { keys, .. } => {
            let rows = sort_selected_rows(store, selection, keys)?;
            Ok((None, None, None, Some(rows)))
        }
        _ => Ok((None, None, None, None)),
    }
}

/// Stable sort of the selected rows by `keys`, primary key first, over the
/// in-scope logical types (Int32/Float64/Utf8). Nulls sort first within
/// each key, matching `RecordValue`'s natural ordering.
fn sort_selected_rows(store: &FrozenStore, selection: &SelectionBitmap, keys: &[String]) -> Result<Vec<usize>> {
    let mut rows: Vec<usize> = selection.iter_set_rows().collect();
    let schema = store.schema();
    for key in keys.iter().rev() {
        let field = schema
            .field(key)
            .ok_or_else(|| QueryError::SchemaMismatch(format!("no such field: {key}")))?;
        match field.logical_type {
            crate::schema::LogicalType::Int32 => {
                rows.sort_by_key(|&row| store.get_i32(key, row).unwrap_or(None));
            }
            crate::schema::LogicalType::Float64 => {
                rows.sort_by(|&a, &b| {
                    let va = store.get_f64(key, a).unwrap_or(None);
                    let vb = store.get_f64(key, b).unwrap_or(None);
                    va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            crate::schema::LogicalType::Utf8 => {
                rows.sort_by(|&a, &b| {
                    let va = store.get_str(key, a).unwrap_or(None);
                    let vb = store.get_str(key, b).unwrap_or(None);
                    va.cmp(&vb)
                });
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;
    use crate::record::{Record, RecordValue};
    use crate::schema::{Field, LogicalType, Schema};
    use crate::store::StoreBuilder;

    fn age_store(n: i32) -> FrozenStore {
        let schema = Schema::new(vec![Field::new("age", LogicalType::Int32, false)]);
        let mut builder = StoreBuilder::new(schema);
        let records: Vec<Record> = (0..n).map(|i| Record::new(vec![RecordValue::Int32(i)])).collect();
        builder.push_all(&records).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn strategy_override_bypasses_adaptive_suggestion() {
        let store = age_store(1000);
        let schema = store.schema().clone();
        let plan = LogicalPlan::scan(schema, store.row_count()).filter(vec![Predicate::gt("age", 500)], 0.5);
        let options = QueryOptions { strategy_override: Some(Strategy::Parallel), ..Default::default() };
        let tracker = AdaptiveTracker::new(false);
        let result = execute(&store, &plan, &options, &tracker, &CancellationToken::new()).unwrap();
        assert_eq!(result.telemetry.strategy, Strategy::Parallel);
    }

    #[test]
    fn cancelled_token_short_circuits_before_filtering() {
        let store = age_store(1000);
        let schema = store.schema().clone();
        let plan = LogicalPlan::scan(schema, store.row_count()).filter(vec![Predicate::gt("age", 500)], 0.5);
        let options = QueryOptions::default();
        let tracker = AdaptiveTracker::new(false);
        let token = CancellationToken::new();
        token.cancel();
        let err = execute(&store, &plan, &options, &tracker, &token).unwrap_err();
        assert!(matches!(err, QueryError::Cancelled));
    }

    #[test]
    fn adaptive_execution_records_outcome_unconditionally() {
        let store = age_store(1000);
        let schema = store.schema().clone();
        let plan = LogicalPlan::scan(schema, store.row_count()).filter(vec![Predicate::gt("age", 500)], 0.5);
        let options = QueryOptions { use_adaptive_execution: true, ..Default::default() };
        let tracker = AdaptiveTracker::new(true);
        let fp = fingerprint(&plan);
        assert_eq!(tracker.execution_count(fp), 0);
        execute(&store, &plan, &options, &tracker, &CancellationToken::new()).unwrap();
        assert_eq!(tracker.execution_count(fp), 1);
    }

    fn age_bucket_store(n: i32) -> FrozenStore {
        let schema = Schema::new(vec![Field::new("bucket", LogicalType::Int32, false), Field::new("age", LogicalType::Int32, false)]);
        let mut builder = StoreBuilder::new(schema);
        let records: Vec<Record> = (0..n)
            .map(|i| Record::new(vec![RecordValue::Int32(i % 3), RecordValue::Int32(i)]))
            .collect();
        builder.push_all(&records).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn group_by_produces_one_aggregate_per_distinct_bucket() {
        let store = age_bucket_store(30);
        let schema = store.schema().clone();
        let plan = LogicalPlan::scan(schema, store.row_count()).group_by("bucket", crate::aggregate::AggregateKind::Count, None);
        let options = QueryOptions::default();
        let tracker = AdaptiveTracker::new(false);
        let result = execute(&store, &plan, &options, &tracker, &CancellationToken::new()).unwrap();
        let groups = result.group_aggregates.unwrap();
        assert_eq!(groups.len(), 3);
        for (_, agg) in &groups {
            assert_eq!(agg.as_f64(), 10.0);
        }
    }

    #[test]
    fn limit_trims_selection_to_the_first_k_rows() {
        let store = age_store(1000);
        let schema = store.schema().clone();
        let plan = LogicalPlan::scan(schema, store.row_count()).limit(5);
        let options = QueryOptions::default();
        let tracker = AdaptiveTracker::new(false);
        let result = execute(&store, &plan, &options, &tracker, &CancellationToken::new()).unwrap();
        assert_eq!(result.ordered_rows, Some(vec![0, 1, 2, 3, 4]));
    }

    #[test]
    fn sort_orders_rows_by_the_named_key() {
        let schema = Schema::new(vec![Field::new("age", LogicalType::Int32, false)]);
        let mut builder = StoreBuilder::new(schema.clone());
        let records: Vec<Record> =
            vec![3, 1, 2].into_iter().map(|v| Record::new(vec![RecordValue::Int32(v)])).collect();
        builder.push_all(&records).unwrap();
        let store = builder.build().unwrap();
        let plan = LogicalPlan::scan(schema, store.row_count()).sort(vec!["age".to_string()]);
        let options = QueryOptions::default();
        let tracker = AdaptiveTracker::new(false);
        let result = execute(&store, &plan, &options, &tracker, &CancellationToken::new()).unwrap();
        let sorted = result.ordered_rows.unwrap();
        let values: Vec<i32> = sorted.iter().map(|&row| store.get_i32("age", row).unwrap().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
