//! Physical plan: mirrors the logical tree but carries an explicit strategy
//! tag per operator and a computed cost (spec §4.F).

use crate::aggregate::AggregateKind;
use crate::filter::Strategy;
use crate::plan::cost;
use crate::plan::logical::LogicalPlan;
use crate::predicate::Predicate;

#[derive(Debug, Clone)]
pub enum PhysicalPlan {
    Scan { rows: usize },
    Filter { input: Box<PhysicalPlan>, predicates: Vec<Predicate>, selectivity: f64, strategy: Strategy },
    Project { input: Box<PhysicalPlan>, fields: Vec<String> },
    Aggregate { input: Box<PhysicalPlan>, kind: AggregateKind, field: Option<String>, strategy: Strategy },
    Distinct { input: Box<PhysicalPlan>, field: String },
    GroupBy { input: Box<PhysicalPlan>, group_field: String, kind: AggregateKind, agg_field: Option<String>, strategy: Strategy },
    Limit { input: Box<PhysicalPlan>, k: usize },
    Sort { input: Box<PhysicalPlan>, keys: Vec<String> },
}

impl PhysicalPlan {
    /// Total cost of this subtree, per spec §4.F: `cost(node) = cost(self) +
    /// Σ cost(children)`.
    pub fn total_cost(&self, cores: usize) -> f64 {
        match self {
            PhysicalPlan::Scan { rows } => cost::cost_scan(*rows),
            PhysicalPlan::Filter { input, selectivity, strategy, .. } => {
                let rows = input.output_rows();
                cost::cost_filter(rows, *selectivity, *strategy, cores) + input.total_cost(cores)
            }
            PhysicalPlan::Aggregate { input, strategy, .. } => {
                let rows = input.output_rows();
                cost::cost_aggregate(rows, *strategy, cores) + input.total_cost(cores)
            }
            PhysicalPlan::GroupBy { input, strategy, .. } => {
                let rows = input.output_rows();
                cost::cost_aggregate(rows, *strategy, cores) + input.total_cost(cores)
            }
            PhysicalPlan::Project { input, .. }
            | PhysicalPlan::Distinct { input, .. }
            | PhysicalPlan::Limit { input, .. }
            | PhysicalPlan::Sort { input, .. } => input.total_cost(cores),
        }
    }

    fn output_rows(&self) -> usize {
        match self {
            PhysicalPlan::Scan { rows } => *rows,
            PhysicalPlan::Filter { input, selectivity, .. } => {
                ((input.output_rows() as f64) * selectivity).round() as usize
            }
            PhysicalPlan::Project { input, .. } => input.output_rows(),
            PhysicalPlan::Aggregate { .. } => 1,
            PhysicalPlan::Distinct { input, .. } => ((input.output_rows() as f64) * 0.3).round() as usize,
            PhysicalPlan::GroupBy { input, .. } => ((input.output_rows() as f64) * 0.3).round() as usize,
            PhysicalPlan::Limit { input, k } => input.output_rows().min(*k),
            PhysicalPlan::Sort { input, .. } => input.output_rows(),
        }
    }
}

/// Lower a logical tree into a physical one, tagging each Filter/Aggregate
/// node with the given strategy (the planner or adaptive executor decides
/// which strategy to pass in per node kind before calling this).
pub fn to_physical(plan: &LogicalPlan, filter_strategy: Strategy, aggregate_strategy: Strategy) -> PhysicalPlan {
    match plan {
        LogicalPlan::Scan { est_rows, .. } => PhysicalPlan::Scan { rows: *est_rows },
        LogicalPlan::Filter { input, predicates, est_selectivity } => PhysicalPlan::Filter {
            input: Box::new(to_physical(input, filter_strategy, aggregate_strategy)),
            predicates: predicates.clone(),
            selectivity: *est_selectivity,
            strategy: filter_strategy,
        },
        LogicalPlan::Project { input, fields } => PhysicalPlan::Project {
            input: Box::new(to_physical(input, filter_strategy, aggregate_strategy)),
            fields: fields.clone(),
        },
        LogicalPlan::Aggregate { input, kind, field } => PhysicalPlan::Aggregate {
            input: Box::new(to_physical(input, filter_strategy, aggregate_strategy)),
            kind: *kind,
            field: field.clone(),
            strategy: aggregate_strategy,
        },
        LogicalPlan::Distinct { input, field } => PhysicalPlan::Distinct {
            input: Box::new(to_physical(input, filter_strategy, aggregate_strategy)),
            field: field.clone(),
        },
        LogicalPlan::GroupBy { input, group_field, kind, agg_field } => PhysicalPlan::GroupBy {
            input: Box::new(to_physical(input, filter_strategy, aggregate_strategy)),
            group_field: group_field.clone(),
            kind: *kind,
            agg_field: agg_field.clone(),
            strategy: aggregate_strategy,
        },
        LogicalPlan::Limit { input, k } => PhysicalPlan::Limit {
            input: Box::new(to_physical(input, filter_strategy, aggregate_strategy)),
            k: *k,
        },
        LogicalPlan::Sort { input, keys } => PhysicalPlan::Sort {
            input: Box::new(to_physical(input, filter_strategy, aggregate_strategy)),
            keys: keys.clone(),
        },
    }
}

/// Returns the lower-cost plan; ties favor SIMD over Parallel over
/// Sequential (spec §4.F).
pub fn choose_better_plan(a: PhysicalPlan, b: PhysicalPlan, cores: usize) -> PhysicalPlan {
    let cost_a = a.total_cost(cores);
    let cost_b = b.total_cost(cores);
    if (cost_a - cost_b).abs() < f64::EPSILON {
        return if strategy_rank(&a) >= strategy_rank(&b) { a } else { b };
    }
    if cost_a < cost_b {
        a
    } else {
        b
    }
}

fn strategy_rank(plan: &PhysicalPlan) -> u8 {
    let strategy = match plan {
        PhysicalPlan::Filter { strategy, .. } => Some(*strategy),
        PhysicalPlan::Aggregate { strategy, .. } => Some(*strategy),
        _ => None,
    };
    match strategy {
        Some(Strategy::Simd) => 2,
        Some(Strategy::Parallel) => 1,
        Some(Strategy::Sequential) | None => 0,
    }
}
