// Integration tests covering the cross-module scenarios that unit tests
// inside each module don't exercise end to end.

use columnar_engine::adaptive::{AdaptiveTracker, Execution};
use columnar_engine::aggregate::AggregateKind;
use columnar_engine::filter::{self, Strategy};
use columnar_engine::predicate::Predicate;
use columnar_engine::record::{Record, RecordValue};
use columnar_engine::schema::{Field, LogicalType, Schema};
use columnar_engine::{execute, CancellationToken, LogicalPlan, QueryOptions, StoreBuilder};

fn age_salary_schema() -> Schema {
    Schema::new(vec![
        Field::new("age", LogicalType::Int32, false),
        Field::new("salary", LogicalType::Float64, false),
    ])
}

fn age_salary_store(rows: usize) -> columnar_engine::FrozenStore {
    let mut builder = StoreBuilder::new(age_salary_schema());
    let records: Vec<Record> = (0..rows)
        .map(|i| {
            let age = 20 + (i % 45) as i32;
            let salary = (i % 200_000) as f64;
            Record::new(vec![RecordValue::Int32(age), RecordValue::Float64(salary)])
        })
        .collect();
    builder.push_all(&records).unwrap();
    builder.build().unwrap()
}

// Scenario 3: sparse filter sum over 1,000,000 rows; Sequential/SIMD/Parallel
// must agree bit-for-bit and the aggregate must match a manual fold.
#[test]
fn scenario_3_sparse_filter_sum_matches_across_strategies() {
    let store = age_salary_store(1_000_000);
    let predicates = vec![Predicate::gt("age", 63)];

    let sequential = filter::filter(&store, &predicates, Strategy::Sequential, 65_536).unwrap();
    let simd = filter::filter(&store, &predicates, Strategy::Simd, 65_536).unwrap();
    let parallel = filter::filter(&store, &predicates, Strategy::Parallel, 65_536).unwrap();
    assert_eq!(sequential, simd);
    assert_eq!(sequential, parallel);

    let expected_sum: f64 = (0..store.row_count())
        .filter(|&row| store.get_i32("age", row).unwrap().unwrap() > 63)
        .map(|row| store.get_f64("salary", row).unwrap().unwrap())
        .sum();

    let result = columnar_engine::aggregate::aggregate(&store, &sequential, AggregateKind::Sum, Some("salary")).unwrap();
    assert_eq!(result.as_f64(), expected_sum);
}

// Scenario 4: three rows with mixed nulls; count(Score is null) = 1 and
// where(Name is null) returns exactly row index 2.
#[test]
fn scenario_4_null_predicates() {
    let schema = Schema::new(vec![
        Field::new("name", LogicalType::Utf8, true),
        Field::new("score", LogicalType::Float64, true),
    ]);
    let mut builder = StoreBuilder::new(schema);
    builder
        .push_all(&[
            Record::new(vec![RecordValue::Utf8("Alice".into()), RecordValue::Float64(95.5)]),
            Record::new(vec![RecordValue::Utf8("Bob".into()), RecordValue::Null]),
            Record::new(vec![RecordValue::Null, RecordValue::Float64(87.0)]),
        ])
        .unwrap();
    let store = builder.build().unwrap();

    let score_null = filter::filter(&store, &[Predicate::is_null("score")], Strategy::Sequential, 65_536).unwrap();
    assert_eq!(score_null.count_selected(), 1);

    let name_null = filter::filter(&store, &[Predicate::is_null("name")], Strategy::Sequential, 65_536).unwrap();
    assert_eq!(name_null.iter_set_rows().collect::<Vec<_>>(), vec![2]);
}

// Scenario 5: adaptive learning — 5 Sequential @ 10ms, 5 Parallel @ 50ms ⇒
// optimal_strategy == Sequential, and suggest_strategy agrees.
#[test]
fn scenario_5_adaptive_learning_picks_the_faster_strategy() {
    let tracker = AdaptiveTracker::new(true);
    let fingerprint = 0xF1;
    for _ in 0..5 {
        tracker.record_execution(fingerprint, Execution { strategy: Strategy::Sequential, elapsed_ms: 10.0, row_count: 1000, predicate_count: 1 });
    }
    for _ in 0..5 {
        tracker.record_execution(fingerprint, Execution { strategy: Strategy::Parallel, elapsed_ms: 50.0, row_count: 1000, predicate_count: 1 });
    }
    assert_eq!(tracker.optimal_strategy(fingerprint), Some(Strategy::Sequential));
    assert_eq!(tracker.suggest_strategy(fingerprint, 1000, 1), Strategy::Sequential);
}

// Scenario 6: heuristic fallback for an unseen fingerprint.
#[test]
fn scenario_6_heuristic_fallback_for_large_multi_predicate_query() {
    let tracker = AdaptiveTracker::new(true);
    let strategy = tracker.suggest_strategy(0xDEADBEEF, 100_000, 3);
    assert_eq!(strategy, Strategy::Parallel);
}

// Scenario 7: ring overflow — 150 executions collapse to the last 100.
#[test]
fn scenario_7_ring_overflow_caps_execution_count() {
    let tracker = AdaptiveTracker::new(true);
    let fingerprint = 77;
    for i in 0..150 {
        let elapsed = if i < 50 { 1000.0 } else { 5.0 };
        tracker.record_execution(fingerprint, Execution { strategy: Strategy::Sequential, elapsed_ms: elapsed, row_count: 1000, predicate_count: 1 });
    }
    assert_eq!(tracker.execution_count(fingerprint), 100);
    // The first 50 high-latency executions fell off the ring.
    assert!(tracker.average_elapsed_ms(fingerprint) < 100.0);
}

// Scenario 8: `use_logical_plan_execution = false` takes the naive row-wise
// interpreter path instead of the cost-based planner, but must still select
// the same rows and produce the same aggregate as the planner path.
#[test]
fn end_to_end_query_through_the_executor_respects_use_logical_plan_execution() {
    let store = age_salary_store(10_000);
    let plan = LogicalPlan::scan(store.schema().clone(), store.row_count())
        .filter(vec![Predicate::gt("age", 40)], 0.3)
        .aggregate(AggregateKind::Count, None);
    let tracker = AdaptiveTracker::new(false);

    let planned = QueryOptions::default();
    assert!(planned.use_logical_plan_execution);
    let planned_result = execute(&store, &plan, &planned, &tracker, &CancellationToken::new()).unwrap();

    let naive = QueryOptions { use_logical_plan_execution: false, ..QueryOptions::default() };
    let naive_result = execute(&store, &plan, &naive, &tracker, &CancellationToken::new()).unwrap();

    let expected_count = (0..store.row_count()).filter(|&row| store.get_i32("age", row).unwrap().unwrap() > 40).count() as f64;

    assert_eq!(planned_result.selection, naive_result.selection);
    assert_eq!(naive_result.aggregate.unwrap().as_f64(), expected_count);
    assert_eq!(planned_result.aggregate.unwrap().as_f64(), expected_count);
}
