//! The resolution pipeline.
//!
//! Runs declaration store -> dependency graph -> settings merge -> build plan
//! and either returns the plan or a single report with every fatal problem
//! found, so callers see all of them in one pass.

use crate::builder::merger::SettingsMerger;
use crate::builder::plan::{BuildPlan, BuildPlanner, PlanError};
use crate::core::{DeclarationStore, PolicyTable};
use crate::resolver::DependencyGraph;
use crate::util::config::Config;
use crate::util::diagnostic::DiagnosticsReport;

/// Options for a resolution run.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Merge policy table for setting keys
    pub policies: PolicyTable,

    /// Compute effective settings on the rayon pool
    pub parallel_merge: bool,

    /// Treat advisory diagnostics as fatal
    pub warnings_as_errors: bool,

    /// Warn about modules no target requires
    pub report_unreachable: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            policies: PolicyTable::builtin(),
            parallel_merge: true,
            warnings_as_errors: false,
            report_unreachable: true,
        }
    }
}

impl ResolveOptions {
    /// Build options from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut policies = PolicyTable::builtin();
        policies.extend(config.policy.iter().map(|(k, v)| (k.clone(), *v)));

        ResolveOptions {
            policies,
            parallel_merge: config.resolve.parallel_merge,
            warnings_as_errors: config.resolve.warnings_as_errors,
            report_unreachable: config.resolve.report_unreachable,
        }
    }
}

/// Resolve a store with default options.
pub fn resolve(store: &DeclarationStore) -> Result<BuildPlan, DiagnosticsReport> {
    resolve_with(store, &ResolveOptions::default())
}

/// Resolve a store into a build plan.
///
/// Fatal problems from every stage that can run are collected into the
/// returned report; a fatal report never comes with a plan. Advisory
/// diagnostics travel inside the plan.
pub fn resolve_with(
    store: &DeclarationStore,
    opts: &ResolveOptions,
) -> Result<BuildPlan, DiagnosticsReport> {
    tracing::info!(
        "Resolving {} module(s), {} target(s)",
        store.module_count(),
        store.target_count()
    );

    let mut report = DiagnosticsReport::new();

    // These checks only need the store, so they run even when the graph is broken.
    let graph = DependencyGraph::build(store);
    if let Err(errors) = &graph {
        report.collect(
            errors
                .iter()
                .cloned()
                .map(|e| PlanError::from(e).to_diagnostic()),
        );
    }
    if let Err(errors) = SettingsMerger::validate(store, &opts.policies) {
        report.collect(errors.into_iter().map(|e| PlanError::from(e).to_diagnostic()));
    }
    report.collect(
        BuildPlanner::check_target_roots(store)
            .iter()
            .map(PlanError::to_diagnostic),
    );

    let graph = match graph {
        Ok(graph) if !report.has_fatal() => graph,
        _ => {
            tracing::debug!("resolution failed with {} diagnostic(s)", report.len());
            return Err(report);
        }
    };

    let merger = match SettingsMerger::new(&graph, &opts.policies) {
        Ok(merger) => merger,
        Err(errors) => {
            report.collect(errors.into_iter().map(|e| PlanError::from(e).to_diagnostic()));
            return Err(report);
        }
    };
    let merged = merger.merge_all(opts.parallel_merge);
    report.collect(merged.shadowed().iter().map(|s| s.to_diagnostic()));

    let mut plan = match BuildPlanner::new(&graph, &merged)
        .report_unreachable(opts.report_unreachable)
        .plan()
    {
        Ok(plan) => plan,
        Err(errors) => {
            report.collect(errors.iter().map(PlanError::to_diagnostic));
            return Err(report);
        }
    };

    report.collect(std::mem::take(&mut plan.diagnostics).iter().cloned());

    if opts.warnings_as_errors {
        report.promote_warnings();
    }
    if report.has_fatal() {
        return Err(report);
    }

    tracing::info!(
        "Planned {} module(s) with {} warning(s)",
        plan.modules.len(),
        report.warnings().count()
    );

    plan.diagnostics = report;
    Ok(plan)
}
