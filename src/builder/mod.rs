//! Settings merge and build planning.
//!
//! This module turns a validated dependency graph into effective settings per
//! module and then into an ordered, per-target build plan.

pub mod merger;
pub mod plan;

pub use merger::{EffectiveSettings, EffectiveValue, MergeError, MergedSettings, SettingsMerger};
pub use plan::{BuildPlan, BuildPlanner, PlanError, PlannedModule, TargetPlan};
