//! Adaptive executor: overrides the static cost-based strategy using
//! measured outcomes for recurring query shapes (spec §4.G).
//!
//! A fingerprint is a stable hash over the physical plan's *shape* — node
//! kinds, field names, operator codes — deliberately excluding literal
//! constants and row counts, so queries differing only in a literal collapse
//! onto the same tracked entry.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::filter::Strategy;
use crate::plan::logical::LogicalPlan;

const RING_CAPACITY: usize = 100;

pub type Fingerprint = u64;

#[derive(Debug, Clone, Copy)]
pub struct Execution {
    pub strategy: Strategy,
    pub elapsed_ms: f64,
    pub row_count: usize,
    pub predicate_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub fingerprint: Fingerprint,
    pub description: String,
    pub impact: Impact,
}

/// Per-fingerprint bounded ring of the most recent executions.
struct FingerprintStats {
    ring: Mutex<VecDeque<Execution>>,
    first_seen_strategy: Strategy,
}

impl FingerprintStats {
    fn new(first: Execution) -> Self {
        Self { ring: Mutex::new(VecDeque::from([first])), first_seen_strategy: first.strategy }
    }

    fn push(&self, exec: Execution) {
        let mut ring = self.ring.lock();
        if ring.len() == RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(exec);
    }

    fn execution_count(&self) -> usize {
        self.ring.lock().len()
    }

    fn average_elapsed_ms(&self) -> f64 {
        let ring = self.ring.lock();
        if ring.is_empty() {
            return 0.0;
        }
        ring.iter().map(|e| e.elapsed_ms).sum::<f64>() / ring.len() as f64
    }

    fn stddev_elapsed_ms(&self) -> f64 {
        let ring = self.ring.lock();
        if ring.len() < 2 {
            return 0.0;
        }
        let mean = ring.iter().map(|e| e.elapsed_ms).sum::<f64>() / ring.len() as f64;
        let variance = ring.iter().map(|e| (e.elapsed_ms - mean).powi(2)).sum::<f64>() / ring.len() as f64;
        variance.sqrt()
    }

    /// Strategy with the lowest mean `elapsed_ms` among those with at least
    /// 3 observations. `None` if no strategy qualifies.
    fn optimal_strategy(&self) -> Option<Strategy> {
        let ring = self.ring.lock();
        let mut sums: [(f64, usize); 3] = [(0.0, 0); 3];
        for exec in ring.iter() {
            let idx = strategy_index(exec.strategy);
            sums[idx].0 += exec.elapsed_ms;
            sums[idx].1 += 1;
        }
        sums.iter()
            .enumerate()
            .filter(|(_, (_, count))| *count >= 3)
            .map(|(idx, (sum, count))| (idx, sum / *count as f64))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(idx, _)| strategy_from_index(idx))
    }

    fn has_improved(&self) -> bool {
        match self.optimal_strategy() {
            Some(s) => s != self.first_seen_strategy,
            None => false,
        }
    }
}

fn strategy_index(s: Strategy) -> usize {
    match s {
        Strategy::Sequential => 0,
        Strategy::Simd => 1,
        Strategy::Parallel => 2,
    }
}

fn strategy_from_index(i: usize) -> Strategy {
    match i {
        0 => Strategy::Sequential,
        1 => Strategy::Simd,
        _ => Strategy::Parallel,
    }
}

/// Process-lifetime tracker, shared across threads. The outer map is
/// read-mostly (dashmap shards internally); each entry's ring has its own
/// lock, so concurrent queries on different fingerprints never contend.
pub struct AdaptiveTracker {
    enabled: bool,
    entries: DashMap<Fingerprint, FingerprintStats>,
}

impl AdaptiveTracker {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, entries: DashMap::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record an execution outcome for `fingerprint`. No-op when the tracker
    /// is disabled (spec §4.G: "off by default; when off, no state is
    /// accumulated").
    pub fn record_execution(&self, fingerprint: Fingerprint, exec: Execution) {
        if !self.enabled {
            return;
        }
        match self.entries.get(&fingerprint) {
            Some(stats) => stats.push(exec),
            None => {
                self.entries.insert(fingerprint, FingerprintStats::new(exec));
            }
        }
    }

    pub fn execution_count(&self, fingerprint: Fingerprint) -> usize {
        self.entries.get(&fingerprint).map(|s| s.execution_count()).unwrap_or(0)
    }

    pub fn average_elapsed_ms(&self, fingerprint: Fingerprint) -> f64 {
        self.entries.get(&fingerprint).map(|s| s.average_elapsed_ms()).unwrap_or(0.0)
    }

    pub fn optimal_strategy(&self, fingerprint: Fingerprint) -> Option<Strategy> {
        self.entries.get(&fingerprint).and_then(|s| s.optimal_strategy())
    }

    pub fn has_improved(&self, fingerprint: Fingerprint) -> bool {
        self.entries.get(&fingerprint).map(|s| s.has_improved()).unwrap_or(false)
    }

    /// 1. Learned optimum if one exists. 2. Heuristic fallback (spec §4.G).
    /// Always falls back to heuristics when the tracker is disabled.
    pub fn suggest_strategy(&self, fingerprint: Fingerprint, row_count: usize, predicate_count: usize) -> Strategy {
        if self.enabled {
            if let Some(strategy) = self.optimal_strategy(fingerprint) {
                return strategy;
            }
        }
        heuristic_strategy(row_count, predicate_count)
    }

    /// Scan all tracked fingerprints and emit advisory records.
    pub fn recommendations(&self) -> Vec<Recommendation> {
        let mut out = Vec::new();
        for entry in self.entries.iter() {
            let fingerprint = *entry.key();
            let stats = entry.value();
            let avg = stats.average_elapsed_ms();
            if avg > 100.0 {
                out.push(Recommendation {
                    fingerprint,
                    description: "consider Parallel/SIMD".to_string(),
                    impact: Impact::High,
                });
            }
            let stddev = stats.stddev_elapsed_ms();
            if avg > 0.0 && stddev / avg > 0.5 {
                out.push(Recommendation {
                    fingerprint,
                    description: "unstable strategy".to_string(),
                    impact: Impact::Medium,
                });
            }
            if stats.has_improved() {
                out.push(Recommendation {
                    fingerprint,
                    description: "current choice is learned-optimal".to_string(),
                    impact: Impact::Low,
                });
            }
        }
        out
    }
}

fn heuristic_strategy(row_count: usize, predicate_count: usize) -> Strategy {
    if row_count >= 50_000 {
        Strategy::Parallel
    } else if predicate_count >= 2 && row_count >= 1_000 {
        Strategy::Simd
    } else {
        Strategy::Sequential
    }
}

/// Hash the plan's structural shape: node kind, field names, operator
/// codes. Deliberately skips literal values and row-count estimates so
/// queries differing only in a literal land on the same fingerprint.
pub fn fingerprint(plan: &LogicalPlan) -> Fingerprint {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    hash_plan_shape(plan, &mut hasher);
    hasher.finish()
}

fn hash_plan_shape(plan: &LogicalPlan, hasher: &mut impl Hasher) {
    match plan {
        LogicalPlan::Scan { schema, .. } => {
            "scan".hash(hasher);
            for field in schema.fields() {
                field.name.hash(hasher);
            }
        }
        LogicalPlan::Filter { input, predicates, .. } => {
            hash_plan_shape(input, hasher);
            "filter".hash(hasher);
            for p in predicates {
                hash_predicate_shape(p, hasher);
            }
        }
        LogicalPlan::Project { input, fields } => {
            hash_plan_shape(input, hasher);
            "project".hash(hasher);
            fields.hash(hasher);
        }
        LogicalPlan::Aggregate { input, kind, field } => {
            hash_plan_shape(input, hasher);
            "aggregate".hash(hasher);
            kind.name().hash(hasher);
            field.hash(hasher);
        }
        LogicalPlan::Distinct { input, field } => {
            hash_plan_shape(input, hasher);
            "distinct".hash(hasher);
            field.hash(hasher);
        }
        LogicalPlan::GroupBy { input, group_field, kind, agg_field } => {
            hash_plan_shape(input, hasher);
            "group_by".hash(hasher);
            group_field.hash(hasher);
            kind.name().hash(hasher);
            agg_field.hash(hasher);
        }
        LogicalPlan::Limit { input, .. } => {
            hash_plan_shape(input, hasher);
            "limit".hash(hasher);
        }
        LogicalPlan::Sort { input, keys } => {
            hash_plan_shape(input, hasher);
            "sort".hash(hasher);
            keys.hash(hasher);
        }
    }
}

fn hash_predicate_shape(predicate: &crate::predicate::Predicate, hasher: &mut impl Hasher) {
    use crate::predicate::Predicate;
    match predicate {
        Predicate::Comparison { op, .. } => {
            "cmp".hash(hasher);
            (*op as u8).hash(hasher);
            predicate.fields().hash(hasher);
        }
        Predicate::IsNull { .. } => {
            "is_null".hash(hasher);
            predicate.fields().hash(hasher);
        }
        Predicate::IsNotNull { .. } => {
            "is_not_null".hash(hasher);
            predicate.fields().hash(hasher);
        }
        Predicate::And(preds) => {
            "and".hash(hasher);
            for p in preds {
                hash_predicate_shape(p, hasher);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, LogicalType, Schema};

    fn schema() -> Schema {
        Schema::new(vec![Field::new("age", LogicalType::Int32, false)])
    }

    fn exec(strategy: Strategy, elapsed_ms: f64) -> Execution {
        Execution { strategy, elapsed_ms, row_count: 1000, predicate_count: 1 }
    }

    #[test]
    fn adaptive_learning_prefers_the_faster_strategy() {
        let tracker = AdaptiveTracker::new(true);
        let fp = 42;
        for _ in 0..5 {
            tracker.record_execution(fp, exec(Strategy::Sequential, 10.0));
        }
        for _ in 0..5 {
            tracker.record_execution(fp, exec(Strategy::Parallel, 50.0));
        }
        assert_eq!(tracker.optimal_strategy(fp), Some(Strategy::Sequential));
        assert_eq!(tracker.suggest_strategy(fp, 1000, 1), Strategy::Sequential);
    }

    #[test]
    fn heuristic_fallback_for_an_unseen_fingerprint() {
        let tracker = AdaptiveTracker::new(true);
        assert_eq!(tracker.suggest_strategy(999, 100_000, 3), Strategy::Parallel);
    }

    #[test]
    fn ring_overflow_caps_execution_count_at_100() {
        let tracker = AdaptiveTracker::new(true);
        let fp = 7;
        for _ in 0..150 {
            tracker.record_execution(fp, exec(Strategy::Sequential, 5.0));
        }
        assert_eq!(tracker.execution_count(fp), 100);
    }

    #[test]
    fn fingerprint_is_stable_across_literals() {
        let plan_a = LogicalPlan::scan(schema(), 1000).filter(vec![crate::predicate::Predicate::gt("age", 10)], 0.5);
        let plan_b = LogicalPlan::scan(schema(), 1000).filter(vec![crate::predicate::Predicate::gt("age", 9999)], 0.5);
        assert_eq!(fingerprint(&plan_a), fingerprint(&plan_b));
    }

    #[test]
    fn disabled_tracker_never_accumulates_state() {
        let tracker = AdaptiveTracker::new(false);
        let fp = 1;
        tracker.record_execution(fp, exec(Strategy::Sequential, 10.0));
        assert_eq!(tracker.execution_count(fp), 0);
        assert_eq!(tracker.suggest_strategy(fp, 100_000, 1), Strategy::Parallel);
    }
}
