//! Build plan generation.
//!
//! A BuildPlan is the hand-off artifact for a compiler/linker layer: the
//! global module compile order, each module's effective settings, and per
//! target the link order of its transitive module closure.

use std::collections::BTreeSet;

use miette::Diagnostic as MietteDiagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::builder::merger::{EffectiveSettings, MergeError, MergedSettings};
use crate::core::settings::Settings;
use crate::core::{DeclarationStore, ModuleKind, PchMode, TargetKind};
use crate::resolver::{DependencyGraph, GraphError};
use crate::util::diagnostic::{Component, Diagnostic, DiagnosticsReport};
use crate::util::hash::Fingerprint;

/// A failure from a stage that runs before planning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Error during build planning.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum PlanError {
    #[error("target `{target}` requires module `{missing}`, which is not declared")]
    #[diagnostic(
        code(gantry::plan::unresolved),
        help("declare a module named `{missing}` or remove it from target `{target}`")
    )]
    UnresolvedDependency { target: String, missing: String },

    #[error("planning failed: {0}")]
    #[diagnostic(code(gantry::plan::upstream))]
    Planning(#[from] UpstreamError),
}

impl From<GraphError> for PlanError {
    fn from(err: GraphError) -> Self {
        PlanError::Planning(UpstreamError::Graph(err))
    }
}

impl From<MergeError> for PlanError {
    fn from(err: MergeError) -> Self {
        PlanError::Planning(UpstreamError::Merge(err))
    }
}

impl PlanError {
    /// Convert to a user-friendly diagnostic.
    ///
    /// Wrapped upstream errors keep the code and component of the stage
    /// that raised them.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PlanError::Planning(UpstreamError::Graph(err)) => err.to_diagnostic(),
            PlanError::Planning(UpstreamError::Merge(err)) => err.to_diagnostic(),
            PlanError::UnresolvedDependency { target, missing } => {
                let mut diag =
                    Diagnostic::error(Component::Planner, "gantry::plan::unresolved", self.to_string())
                        .with_entity(target.clone())
                        .with_entity(missing.clone());
                if let Some(help) = MietteDiagnostic::help(self) {
                    diag = diag.with_suggestion(help.to_string());
                }
                diag
            }
        }
    }
}

/// A module scheduled for compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedModule {
    pub name: String,
    pub kind: ModuleKind,
    pub pch: PchMode,
    /// Declared dependencies, in declared order
    pub dependencies: Vec<String>,
    /// Effective settings after propagation
    pub settings: EffectiveSettings,
}

/// The per-target slice of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetPlan {
    pub name: String,
    pub kind: TargetKind,
    /// Root modules as declared
    pub roots: Vec<String>,
    /// Transitive module closure, dependencies before dependents
    pub link_order: Vec<String>,
    /// Target-level settings applied on top of each module's record
    pub overrides: Settings,
}

/// A complete build plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    /// Modules in compile order
    pub modules: Vec<PlannedModule>,

    /// Targets in declaration order
    pub targets: Vec<TargetPlan>,

    /// Advisory diagnostics produced by the run
    pub diagnostics: DiagnosticsReport,
}

impl BuildPlan {
    /// Module names in compile order.
    pub fn build_order(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// Look up a planned module.
    pub fn module(&self, name: &str) -> Option<&PlannedModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Look up a planned target.
    pub fn target(&self, name: &str) -> Option<&TargetPlan> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Effective settings of `module` when compiled for `target`.
    ///
    /// Returns `None` if the target is unknown or the module is not in its
    /// closure.
    pub fn settings_for(&self, target: &str, module: &str) -> Option<EffectiveSettings> {
        let target = self.target(target)?;
        if !target.link_order.iter().any(|m| m == module) {
            return None;
        }
        let planned = self.module(module)?;
        Some(planned.settings.overlay(&target.name, &target.overrides))
    }

    /// Serialize the plan as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// A stable hash of everything a downstream compiler layer consumes.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();

        for module in &self.modules {
            fp.update_str(&module.name)
                .update_str(&module.kind.to_string())
                .update_str(&module.pch.to_string())
                .update_strs(module.dependencies.iter().map(String::as_str));
            for (key, value) in module.settings.iter() {
                fp.update_str(key)
                    .update_str(&value.policy().to_string())
                    .update_strs(value.entries().iter().map(|e| e.value.as_str()));
            }
        }

        for target in &self.targets {
            fp.update_str(&target.name)
                .update_str(&target.kind.to_string())
                .update_strs(target.link_order.iter().map(String::as_str));
            for (key, value) in target.overrides.iter() {
                fp.update_str(key).update_strs(value.entries());
            }
        }

        fp.finish()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.targets.is_empty()
    }
}

/// Orders modules and assembles the build plan.
pub struct BuildPlanner<'a, 's> {
    graph: &'a DependencyGraph<'s>,
    merged: &'a MergedSettings,
    report_unreachable: bool,
}

impl<'a, 's> BuildPlanner<'a, 's> {
    /// Create a planner over a validated graph and its merged settings.
    pub fn new(graph: &'a DependencyGraph<'s>, merged: &'a MergedSettings) -> Self {
        BuildPlanner {
            graph,
            merged,
            report_unreachable: true,
        }
    }

    /// Enable or disable warnings for modules no target requires.
    pub fn report_unreachable(mut self, enabled: bool) -> Self {
        self.report_unreachable = enabled;
        self
    }

    /// Check that every target root names a declared module.
    pub fn check_target_roots(store: &DeclarationStore) -> Vec<PlanError> {
        store
            .targets()
            .iter()
            .flat_map(|target| {
                target
                    .modules()
                    .iter()
                    .filter(|root| store.module_position(root).is_none())
                    .map(move |root| PlanError::UnresolvedDependency {
                        target: target.name().to_string(),
                        missing: root.clone(),
                    })
            })
            .collect()
    }

    /// Produce the build plan.
    pub fn plan(&self) -> Result<BuildPlan, Vec<PlanError>> {
        let store = self.graph.store();

        let errors = Self::check_target_roots(store);
        if !errors.is_empty() {
            return Err(errors);
        }

        let reachable = self.graph.reachable_from(
            store
                .targets()
                .iter()
                .flat_map(|t| self.root_indices(t.modules())),
        );
        let order = self.topological_order(&reachable);

        let mut modules = Vec::with_capacity(order.len());
        let mut errors = Vec::new();
        for &index in &order {
            let module = self.graph.module(index);
            match self.merged.get(module.name()) {
                Some(settings) => modules.push(PlannedModule {
                    name: module.name().to_string(),
                    kind: module.kind(),
                    pch: module.pch(),
                    dependencies: module.dependencies().to_vec(),
                    settings: settings.clone(),
                }),
                None => errors.push(PlanError::from(MergeError::UnknownModule {
                    module: module.name().to_string(),
                })),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let targets = store
            .targets()
            .iter()
            .map(|target| {
                let closure = self.graph.reachable_from(self.root_indices(target.modules()));
                TargetPlan {
                    name: target.name().to_string(),
                    kind: target.kind(),
                    roots: target.modules().to_vec(),
                    link_order: order
                        .iter()
                        .filter(|&&index| closure.contains(&index))
                        .map(|&index| self.graph.module(index).name().to_string())
                        .collect(),
                    overrides: target.settings().clone(),
                }
            })
            .collect();

        let mut diagnostics = DiagnosticsReport::new();
        if self.report_unreachable {
            diagnostics.collect(
                store
                    .modules()
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| !reachable.contains(index))
                    .map(|(_, module)| {
                        Diagnostic::warning(
                            Component::Planner,
                            "gantry::plan::unreachable",
                            format!("module `{}` is not required by any target", module.name()),
                        )
                        .with_entity(module.name())
                        .with_suggestion(format!(
                            "add `{}` to a target's modules or remove its declaration",
                            module.name()
                        ))
                    }),
            );
        }

        tracing::debug!(
            "planned {} module(s) across {} target(s)",
            modules.len(),
            store.target_count()
        );

        Ok(BuildPlan {
            modules,
            targets,
            diagnostics,
        })
    }

    fn root_indices(&self, modules: &[String]) -> Vec<usize> {
        modules
            .iter()
            .filter_map(|name| self.graph.index_of(name))
            .collect()
    }

    /// Kahn's algorithm restricted to `include`.
    ///
    /// Among modules whose dependencies are all scheduled, the one declared
    /// first goes next, so the order is reproducible.
    fn topological_order(&self, include: &BTreeSet<usize>) -> Vec<usize> {
        let mut pending = vec![0usize; self.graph.len()];
        let mut ready = BTreeSet::new();

        for &index in include {
            pending[index] = self.graph.dependencies(index).len();
            if pending[index] == 0 {
                ready.insert(index);
            }
        }

        let mut order = Vec::with_capacity(include.len());
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for dependent in self.graph.dependents(next) {
                if !include.contains(&dependent) {
                    continue;
                }
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        order
    }
}
