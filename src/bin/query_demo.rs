//! Demo CLI: build a small in-memory store from a generated dataset and run
//! one scan→filter→aggregate query against it, printing the chosen strategy
//! and the result. Not a server — a standalone adapter-boundary example
//! showing how a host would drive the library (spec §6).

use std::env;

use columnar_engine::predicate::Predicate;
use columnar_engine::record::{Record, RecordValue};
use columnar_engine::schema::{Field, LogicalType, Schema};
use columnar_engine::{
    execute, AdaptiveTracker, CancellationToken, LogicalPlan, QueryOptions, Strategy, StoreBuilder,
};

fn main() {
    columnar_engine::init_tracing();

    let args: Vec<String> = env::args().collect();
    let rows: usize = arg_value(&args, "--rows").and_then(|v| v.parse().ok()).unwrap_or(100_000);
    let threshold: i32 = arg_value(&args, "--age-gt").and_then(|v| v.parse().ok()).unwrap_or(40);
    let strategy = match arg_value(&args, "--strategy").as_deref() {
        Some("simd") => Some(Strategy::Simd),
        Some("parallel") => Some(Strategy::Parallel),
        Some("sequential") => Some(Strategy::Sequential),
        _ => None,
    };

    let schema = Schema::new(vec![
        Field::new("age", LogicalType::Int32, false),
        Field::new("salary", LogicalType::Float64, false),
    ]);

    let mut builder = StoreBuilder::new(schema.clone());
    let records: Vec<Record> = (0..rows)
        .map(|i| {
            let age = 18 + (i % 60) as i32;
            let salary = 30_000.0 + (i % 100_000) as f64;
            Record::new(vec![RecordValue::Int32(age), RecordValue::Float64(salary)])
        })
        .collect();
    builder.push_all(&records).expect("build input matches schema");
    let store = builder.build().expect("store build succeeds");

    let plan = LogicalPlan::scan(schema, store.row_count())
        .filter(vec![Predicate::gt("age", threshold)], 0.5)
        .aggregate(columnar_engine::aggregate::AggregateKind::Avg, Some("salary".to_string()));

    let options = QueryOptions { strategy_override: strategy, enable_parallel: true, use_adaptive_execution: true, ..Default::default() };
    let tracker = AdaptiveTracker::new(true);
    let result = execute(&store, &plan, &options, &tracker, &CancellationToken::new()).expect("query succeeds");

    println!("rows:            {}", store.row_count());
    println!("strategy:        {}", result.telemetry.strategy.name());
    println!("elapsed_ms:      {:.3}", result.telemetry.elapsed_ms);
    println!("selected_rows:   {}", result.selection.count_selected());
    if let Some(agg) = result.aggregate {
        println!("avg(salary):     {:.2}", agg.as_f64());
    }

    let recommendations = tracker.recommendations();
    if recommendations.is_empty() {
        println!("recommendations: none yet (first execution for this query shape)");
    } else {
        for rec in recommendations {
            println!("recommendation:  [{:?}] {}", rec.impact, rec.description);
        }
    }
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter().position(|a| a == name).and_then(|i| args.get(i + 1)).cloned()
}
