//! Dimensionless cost model (spec §4.F). Only relative order matters; the
//! planner materializes the lowest-cost tagged tree.

use crate::filter::Strategy;

/// Core count the cost model uses for `factor(Parallel)` when the caller
/// has no more specific figure (e.g. from a pinned thread pool size).
pub fn available_cores() -> usize {
    num_cpus::get()
}

pub fn factor(strategy: Strategy, cores: usize) -> f64 {
    match strategy {
        Strategy::Sequential => 1.0,
        Strategy::Simd => 0.35,
        Strategy::Parallel => (1.0 / cores as f64).max(0.15),
    }
}

pub fn cost_scan(rows: usize) -> f64 {
    rows as f64 / 1000.0
}

pub fn cost_filter(rows: usize, selectivity: f64, strategy: Strategy, cores: usize) -> f64 {
    (rows as f64 / 1000.0) * factor(strategy, cores) * (0.5 + 0.5 * selectivity)
}

pub fn cost_aggregate(rows: usize, strategy: Strategy, cores: usize) -> f64 {
    (rows as f64 / 5000.0) * factor(strategy, cores)
}
