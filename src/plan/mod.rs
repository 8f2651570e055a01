//! Two-tier query planner: logical tree → physical tree with strategy tags
//! and a cost. See spec §4.E/§4.F.

pub mod cost;
pub mod logical;
pub mod physical;

pub use logical::LogicalPlan;
pub use physical::{choose_better_plan, to_physical, PhysicalPlan};
