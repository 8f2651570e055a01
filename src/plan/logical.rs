//! Logical plan tree: Scan/Filter/Project/Aggregate/Distinct/Limit/Sort. No
//! dispatch tables — each consumer matches exhaustively over the sum type
//! (spec §9 design note on visitor dispatch).

use crate::aggregate::AggregateKind;
use crate::predicate::Predicate;
use crate::schema::Schema;

#[derive(Debug, Clone)]
pub enum LogicalPlan {
    Scan { schema: Schema, est_rows: usize },
    Filter { input: Box<LogicalPlan>, predicates: Vec<Predicate>, est_selectivity: f64 },
    Project { input: Box<LogicalPlan>, fields: Vec<String> },
    Aggregate { input: Box<LogicalPlan>, kind: AggregateKind, field: Option<String> },
    Distinct { input: Box<LogicalPlan>, field: String },
    /// Grouped aggregation: one `kind` fold per distinct value of
    /// `group_field` (supplemented execution of the grouping named in
    /// spec.md §1/§4.E, beyond the row-estimate-only `Distinct` node).
    GroupBy { input: Box<LogicalPlan>, group_field: String, kind: AggregateKind, agg_field: Option<String> },
    Limit { input: Box<LogicalPlan>, k: usize },
    Sort { input: Box<LogicalPlan>, keys: Vec<String> },
}

impl LogicalPlan {
    pub fn scan(schema: Schema, est_rows: usize) -> Self {
        LogicalPlan::Scan { schema, est_rows }
    }

    pub fn filter(self, predicates: Vec<Predicate>, est_selectivity: f64) -> Self {
        LogicalPlan::Filter { input: Box::new(self), predicates, est_selectivity }
    }

    pub fn project(self, fields: Vec<String>) -> Self {
        LogicalPlan::Project { input: Box::new(self), fields }
    }

    pub fn aggregate(self, kind: AggregateKind, field: Option<String>) -> Self {
        LogicalPlan::Aggregate { input: Box::new(self), kind, field }
    }

    pub fn distinct(self, field: impl Into<String>) -> Self {
        LogicalPlan::Distinct { input: Box::new(self), field: field.into() }
    }

    pub fn group_by(self, group_field: impl Into<String>, kind: AggregateKind, agg_field: Option<String>) -> Self {
        LogicalPlan::GroupBy { input: Box::new(self), group_field: group_field.into(), kind, agg_field }
    }

    pub fn limit(self, k: usize) -> Self {
        LogicalPlan::Limit { input: Box::new(self), k }
    }

    pub fn sort(self, keys: Vec<String>) -> Self {
        LogicalPlan::Sort { input: Box::new(self), keys }
    }

    /// Row estimate per spec §4.E: Scan = source; Filter = input ×
    /// selectivity; Distinct = 0.3 × input; Limit = min(input, k); Project,
    /// Aggregate, Sort pass the input estimate through unchanged.
    pub fn estimated_row_count(&self) -> usize {
        match self {
            LogicalPlan::Scan { est_rows, .. } => *est_rows,
            LogicalPlan::Filter { input, est_selectivity, .. } => {
                ((input.estimated_row_count() as f64) * est_selectivity).round() as usize
            }
            LogicalPlan::Project { input, .. } => input.estimated_row_count(),
            LogicalPlan::Aggregate { .. } => 1,
            LogicalPlan::Distinct { input, .. } => {
                ((input.estimated_row_count() as f64) * 0.3).round() as usize
            }
            LogicalPlan::GroupBy { input, .. } => {
                ((input.estimated_row_count() as f64) * 0.3).round() as usize
            }
            LogicalPlan::Limit { input, k } => input.estimated_row_count().min(*k),
            LogicalPlan::Sort { input, .. } => input.estimated_row_count(),
        }
    }

    pub fn output_schema(&self) -> Schema {
        match self {
            LogicalPlan::Scan { schema, .. } => schema.clone(),
            LogicalPlan::Filter { input, .. } => input.output_schema(),
            LogicalPlan::Project { input, fields } => input.output_schema().project(fields).unwrap_or_else(|_| input.output_schema()),
            LogicalPlan::Aggregate { input, .. } => input.output_schema(),
            LogicalPlan::Distinct { input, .. } => input.output_schema(),
            LogicalPlan::GroupBy { input, .. } => input.output_schema(),
            LogicalPlan::Limit { input, .. } => input.output_schema(),
            LogicalPlan::Sort { input, .. } => input.output_schema(),
        }
    }

    /// Number of Comparison/IsNull/IsNotNull predicates reachable in this
    /// plan, used by the adaptive heuristic fallback and by fingerprinting.
    pub fn predicate_count(&self) -> usize {
        match self {
            LogicalPlan::Filter { input, predicates, .. } => predicates.len() + input.predicate_count(),
            LogicalPlan::Scan { .. } => 0,
            LogicalPlan::Project { input, .. }
            | LogicalPlan::Aggregate { input, .. }
            | LogicalPlan::Distinct { input, .. }
            | LogicalPlan::GroupBy { input, .. }
            | LogicalPlan::Limit { input, .. }
            | LogicalPlan::Sort { input, .. } => input.predicate_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, LogicalType};

    fn schema() -> Schema {
        Schema::new(vec![Field::new("age", LogicalType::Int32, false)])
    }

    #[test]
    fn filter_row_estimate_scales_by_selectivity() {
        let plan = LogicalPlan::scan(schema(), 1000).filter(vec![Predicate::gt("age", 30)], 0.4);
        assert_eq!(plan.estimated_row_count(), 400);
    }

    #[test]
    fn distinct_row_estimate_is_0_3x_input() {
        let plan = LogicalPlan::scan(schema(), 1000).distinct("age");
        assert_eq!(plan.estimated_row_count(), 300);
    }

    #[test]
    fn limit_caps_at_k() {
        let plan = LogicalPlan::scan(schema(), 1000).limit(10);
        assert_eq!(plan.estimated_row_count(), 10);
    }
}
