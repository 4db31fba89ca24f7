//! Settings propagation.
//!
//! This module computes the effective settings of a module by folding the
//! declared settings of its transitive dependency closure, dependencies
//! first and the module itself last:
//!
//! - scalar: the nearest non-empty value wins
//! - set: union of every contribution
//! - ordered-list: concatenation in merge order, first occurrence keeps its slot
//!
//! When two contributors that are not ancestor/descendant of each other
//! supply different scalar values, the later one wins and a
//! `ShadowedSetting` is recorded.

use std::collections::{BTreeMap, BTreeSet};

use miette::Diagnostic as MietteDiagnostic;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::core::settings::{MergePolicy, PolicyTable, SettingValue, Settings};
use crate::core::{DeclarationStore, ModuleKind, Namespace, PchMode};
use crate::resolver::DependencyGraph;
use crate::util::diagnostic::{Component, Diagnostic};

/// Errors found while validating settings for merge.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum MergeError {
    #[error("setting `{key}` of {namespace} `{owner}` is declared as {found}, but `{key}` merges as {expected}")]
    #[diagnostic(
        code(gantry::merge::kind_mismatch),
        help("declare `{key}` as {expected} everywhere, or pin its kind in the [policy] table")
    )]
    KindMismatch {
        namespace: Namespace,
        owner: String,
        key: String,
        expected: MergePolicy,
        found: MergePolicy,
    },

    #[error("header-only module `{module}` cannot use precompiled headers (pch = {mode})")]
    #[diagnostic(
        code(gantry::merge::incompatible_pch),
        help("set `pch = \"none\"` on `{module}` or change its kind")
    )]
    IncompatiblePch { module: String, mode: PchMode },

    #[error("module `{module}` is not part of the dependency graph")]
    #[diagnostic(code(gantry::merge::unknown_module))]
    UnknownModule { module: String },
}

impl MergeError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = MietteDiagnostic::code(self)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "gantry::merge".to_string());

        let entity = match self {
            MergeError::KindMismatch { owner, .. } => owner,
            MergeError::IncompatiblePch { module, .. } => module,
            MergeError::UnknownModule { module } => module,
        };

        let mut diag =
            Diagnostic::error(Component::Merger, code, self.to_string()).with_entity(entity.clone());
        if let Some(help) = MietteDiagnostic::help(self) {
            diag = diag.with_suggestion(help.to_string());
        }
        diag
    }
}

/// A value paired with the module (or target) that contributed it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WithProvenance<T> {
    pub value: T,
    pub from: String,
}

impl<T> WithProvenance<T> {
    pub fn new(value: T, from: impl Into<String>) -> Self {
        WithProvenance {
            value,
            from: from.into(),
        }
    }
}

/// A merged setting value with per-entry provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", content = "entries", rename_all = "kebab-case")]
pub enum EffectiveValue {
    Scalar(WithProvenance<String>),
    /// Kept sorted by value.
    Set(Vec<WithProvenance<String>>),
    OrderedList(Vec<WithProvenance<String>>),
}

impl EffectiveValue {
    pub fn policy(&self) -> MergePolicy {
        match self {
            EffectiveValue::Scalar(_) => MergePolicy::Scalar,
            EffectiveValue::Set(_) => MergePolicy::Set,
            EffectiveValue::OrderedList(_) => MergePolicy::OrderedList,
        }
    }

    /// Entries with provenance, in effective order.
    pub fn entries(&self) -> &[WithProvenance<String>] {
        match self {
            EffectiveValue::Scalar(entry) => std::slice::from_ref(entry),
            EffectiveValue::Set(entries) | EffectiveValue::OrderedList(entries) => entries,
        }
    }

    /// Drop provenance.
    pub fn to_setting(&self) -> SettingValue {
        match self {
            EffectiveValue::Scalar(entry) => SettingValue::Scalar(entry.value.clone()),
            EffectiveValue::Set(entries) => {
                SettingValue::Set(entries.iter().map(|e| e.value.clone()).collect())
            }
            EffectiveValue::OrderedList(entries) => {
                SettingValue::List(entries.iter().map(|e| e.value.clone()).collect())
            }
        }
    }
}

/// A scalar that was replaced while applying a contributor's settings.
#[derive(Debug, Clone)]
struct Overwrite {
    key: String,
    previous: WithProvenance<String>,
    replacement: WithProvenance<String>,
}

/// The fully merged settings for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSettings {
    module: String,
    values: BTreeMap<String, EffectiveValue>,
}

impl EffectiveSettings {
    /// An empty record for a module.
    pub fn new(module: impl Into<String>) -> Self {
        EffectiveSettings {
            module: module.into(),
            values: BTreeMap::new(),
        }
    }

    /// The module this record belongs to.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The merged value for a key, with provenance.
    pub fn value(&self, key: &str) -> Option<&EffectiveValue> {
        self.values.get(key)
    }

    /// The merged value for a key.
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).map(EffectiveValue::to_setting)
    }

    /// The merged scalar for a key.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(EffectiveValue::Scalar(entry)) => Some(&entry.value),
            _ => None,
        }
    }

    /// The merged entries for a key, in effective order.
    pub fn entries(&self, key: &str) -> Vec<&str> {
        self.values
            .get(key)
            .map(|v| v.entries().iter().map(|e| e.value.as_str()).collect())
            .unwrap_or_default()
    }

    /// Iterate merged values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EffectiveValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Plain settings without provenance.
    pub fn to_settings(&self) -> Settings {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_setting()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A copy with `settings` applied last, as a target override.
    pub fn overlay(&self, contributor: &str, settings: &Settings) -> EffectiveSettings {
        let mut record = self.clone();
        record.apply(contributor, settings);
        record
    }

    /// Fold one contributor's declared settings into this record.
    ///
    /// Kinds are validated before merging; a value whose kind disagrees with
    /// the value already recorded for its key is skipped.
    fn apply(&mut self, contributor: &str, settings: &Settings) -> Vec<Overwrite> {
        let mut overwrites = Vec::new();

        for (key, value) in settings.iter() {
            match value {
                SettingValue::Scalar(v) => {
                    if v.is_empty() {
                        continue;
                    }
                    let replacement = WithProvenance::new(v.clone(), contributor);
                    match self.values.get_mut(key) {
                        Some(EffectiveValue::Scalar(previous)) => {
                            if previous.value != *v {
                                overwrites.push(Overwrite {
                                    key: key.to_string(),
                                    previous: previous.clone(),
                                    replacement: replacement.clone(),
                                });
                            }
                            *previous = replacement;
                        }
                        Some(_) => {}
                        None => {
                            self.values
                                .insert(key.to_string(), EffectiveValue::Scalar(replacement));
                        }
                    }
                }
                SettingValue::Set(values) => {
                    let entry = self
                        .values
                        .entry(key.to_string())
                        .or_insert_with(|| EffectiveValue::Set(Vec::new()));
                    if let EffectiveValue::Set(entries) = entry {
                        for v in values {
                            if let Err(pos) = entries.binary_search_by(|e| e.value.cmp(v)) {
                                entries.insert(pos, WithProvenance::new(v.clone(), contributor));
                            }
                        }
                    }
                }
                SettingValue::List(values) => {
                    let entry = self
                        .values
                        .entry(key.to_string())
                        .or_insert_with(|| EffectiveValue::OrderedList(Vec::new()));
                    if let EffectiveValue::OrderedList(entries) = entry {
                        for v in values {
                            if !entries.iter().any(|e| e.value == *v) {
                                entries.push(WithProvenance::new(v.clone(), contributor));
                            }
                        }
                    }
                }
            }
        }

        overwrites
    }
}

/// A sibling conflict on a scalar setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowedSetting {
    /// The module whose merge exposed the conflict.
    pub module: String,
    pub key: String,
    pub winner: WithProvenance<String>,
    pub shadowed: WithProvenance<String>,
}

impl ShadowedSetting {
    /// Convert to an advisory diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::warning(
            Component::Merger,
            "gantry::merge::shadowed",
            format!(
                "setting `{}` from `{}` ({:?}) is shadowed by `{}` ({:?})",
                self.key, self.shadowed.from, self.shadowed.value, self.winner.from, self.winner.value
            ),
        )
        .with_entity(self.module.clone())
        .with_entity(self.winner.from.clone())
        .with_entity(self.shadowed.from.clone())
        .with_context(format!(
            "observed while merging `{}`; `{}` is merged later and wins",
            self.module, self.winner.from
        ))
        .with_suggestion(format!(
            "set `{}` on `{}` to make the choice explicit",
            self.key, self.module
        ))
    }
}

/// The result of merging one module.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub settings: EffectiveSettings,
    pub shadowed: Vec<ShadowedSetting>,
}

/// Effective settings for every module in a graph.
#[derive(Debug, Clone, Default)]
pub struct MergedSettings {
    records: BTreeMap<String, EffectiveSettings>,
    shadowed: Vec<ShadowedSetting>,
}

impl MergedSettings {
    /// The effective record for a module.
    pub fn get(&self, module: &str) -> Option<&EffectiveSettings> {
        self.records.get(module)
    }

    /// Sibling conflicts, each reported once, in declaration order.
    pub fn shadowed(&self) -> &[ShadowedSetting] {
        &self.shadowed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Computes effective settings over a validated dependency graph.
pub struct SettingsMerger<'g, 's> {
    graph: &'g DependencyGraph<'s>,
    /// Transitive dependencies of every module, by declaration index.
    requirements: Vec<BTreeSet<usize>>,
}

impl<'g, 's> SettingsMerger<'g, 's> {
    /// Create a merger, validating every declared setting against `table`.
    pub fn new(graph: &'g DependencyGraph<'s>, table: &PolicyTable) -> Result<Self, Vec<MergeError>> {
        Self::validate(graph.store(), table)?;
        let requirements = (0..graph.len()).map(|index| graph.requirements(index)).collect();
        Ok(SettingsMerger {
            graph,
            requirements,
        })
    }

    /// Check setting kinds and option combinations for a whole store.
    ///
    /// Keys absent from `table` take the kind of their first declaration,
    /// modules before targets, in declaration order.
    pub fn validate(store: &DeclarationStore, table: &PolicyTable) -> Result<(), Vec<MergeError>> {
        let mut policies: BTreeMap<String, MergePolicy> = table
            .iter()
            .map(|(key, policy)| (key.to_string(), policy))
            .collect();
        let mut errors = Vec::new();

        let owners = store
            .modules()
            .iter()
            .map(|m| (Namespace::Module, m.name(), m.settings()))
            .chain(
                store
                    .targets()
                    .iter()
                    .map(|t| (Namespace::Target, t.name(), t.settings())),
            );

        for (namespace, owner, settings) in owners {
            for (key, value) in settings.iter() {
                let found = value.policy();
                let expected = *policies.entry(key.to_string()).or_insert(found);
                if expected != found {
                    errors.push(MergeError::KindMismatch {
                        namespace,
                        owner: owner.to_string(),
                        key: key.to_string(),
                        expected,
                        found,
                    });
                }
            }
        }

        for module in store.modules() {
            if module.kind() == ModuleKind::HeaderOnly && module.pch() != PchMode::None {
                errors.push(MergeError::IncompatiblePch {
                    module: module.name().to_string(),
                    mode: module.pch(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Compute the effective settings for one module.
    pub fn merge(&self, module: &str) -> Result<MergeOutcome, MergeError> {
        let index = self
            .graph
            .index_of(module)
            .ok_or_else(|| MergeError::UnknownModule {
                module: module.to_string(),
            })?;
        Ok(self.merge_index(index))
    }

    fn merge_index(&self, index: usize) -> MergeOutcome {
        let name = self.graph.module(index).name();
        let mut record = EffectiveSettings::new(name);
        let mut shadowed = Vec::new();

        for contributor in self.graph.closure_order(index) {
            let module = self.graph.module(contributor);
            for overwrite in record.apply(module.name(), module.settings()) {
                // A dependent overriding its own dependency is deliberate.
                let deliberate = self
                    .graph
                    .index_of(&overwrite.previous.from)
                    .is_some_and(|previous| self.requirements[contributor].contains(&previous));
                if !deliberate {
                    shadowed.push(ShadowedSetting {
                        module: name.to_string(),
                        key: overwrite.key,
                        winner: overwrite.replacement,
                        shadowed: overwrite.previous,
                    });
                }
            }
        }

        tracing::debug!(
            "merged `{}`: {} setting(s), {} shadowed",
            name,
            record.values.len(),
            shadowed.len()
        );

        MergeOutcome {
            settings: record,
            shadowed,
        }
    }

    /// Compute effective settings for every module.
    ///
    /// Each module's merge only reads the graph and writes its own record,
    /// so with `parallel` the records are computed on the rayon pool.
    pub fn merge_all(&self, parallel: bool) -> MergedSettings {
        let outcomes: Vec<MergeOutcome> = if parallel {
            (0..self.graph.len())
                .into_par_iter()
                .map(|index| self.merge_index(index))
                .collect()
        } else {
            (0..self.graph.len())
                .map(|index| self.merge_index(index))
                .collect()
        };

        let mut merged = MergedSettings::default();
        let mut seen = BTreeSet::new();

        for outcome in outcomes {
            for shadow in outcome.shadowed {
                let identity = (
                    shadow.key.clone(),
                    shadow.winner.clone(),
                    shadow.shadowed.clone(),
                );
                if seen.insert(identity) {
                    merged.shadowed.push(shadow);
                }
            }
            merged
                .records
                .insert(outcome.settings.module.clone(), outcome.settings);
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::keys;
    use crate::core::{ModuleDecl, TargetDecl, TargetKind};

    fn merge_all(store: &DeclarationStore) -> MergedSettings {
        let graph = DependencyGraph::build(store).unwrap();
        let merger = SettingsMerger::new(&graph, &PolicyTable::builtin()).unwrap();
        merger.merge_all(false)
    }

    #[test]
    fn test_module_without_dependencies_keeps_own_settings() {
        let mut store = DeclarationStore::new();
        store
            .register_module(
                ModuleDecl::library("Core")
                    .with_setting(keys::OPTIMIZATION_LEVEL, SettingValue::scalar("O2"))
                    .with_setting(keys::DEFINES, SettingValue::set(["CORE_API"])),
            )
            .unwrap();

        let merged = merge_all(&store);
        let core = merged.get("Core").unwrap();
        assert_eq!(core.scalar(keys::OPTIMIZATION_LEVEL), Some("O2"));
        assert_eq!(core.entries(keys::DEFINES), vec!["CORE_API"]);
        assert_eq!(
            core.to_settings(),
            store.lookup_module("Core").unwrap().settings().clone()
        );
    }

    #[test]
    fn test_ordered_list_first_occurrence_wins() {
        let mut store = DeclarationStore::new();
        store
            .register_module(
                ModuleDecl::library("A")
                    .depends_on("B")
                    .with_setting(keys::INCLUDE_PATHS, SettingValue::list(["x"])),
            )
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("B")
                    .depends_on("D")
                    .with_setting(keys::INCLUDE_PATHS, SettingValue::list(["y"])),
            )
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("D").with_setting(keys::INCLUDE_PATHS, SettingValue::list(["x"])),
            )
            .unwrap();

        let merged = merge_all(&store);
        let a = merged.get("A").unwrap();
        assert_eq!(a.entries(keys::INCLUDE_PATHS), vec!["x", "y"]);

        // The retained "x" is D's, the first occurrence in merge order.
        let entries = a.value(keys::INCLUDE_PATHS).unwrap().entries();
        assert_eq!(entries[0].from, "D");
    }

    #[test]
    fn test_diamond_merges_shared_dependency_once() {
        let mut store = DeclarationStore::new();
        store
            .register_module(ModuleDecl::library("A").with_dependencies(["B", "C"]))
            .unwrap();
        store
            .register_module(ModuleDecl::library("B").depends_on("D"))
            .unwrap();
        store
            .register_module(ModuleDecl::library("C").depends_on("D"))
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("D")
                    .with_setting(keys::INCLUDE_PATHS, SettingValue::list(["d/include", "d/public"]))
                    .with_setting(keys::LINK_LIBRARIES, SettingValue::list(["d"])),
            )
            .unwrap();

        let merged = merge_all(&store);
        let a = merged.get("A").unwrap();
        assert_eq!(a.entries(keys::INCLUDE_PATHS), vec!["d/include", "d/public"]);
        assert_eq!(a.entries(keys::LINK_LIBRARIES), vec!["d"]);
    }

    #[test]
    fn test_set_union_across_closure() {
        let mut store = DeclarationStore::new();
        store
            .register_module(
                ModuleDecl::library("Game")
                    .with_dependencies(["Engine", "Core"])
                    .with_setting(keys::DEFINES, SettingValue::set(["WITH_GAME", "WITH_CORE"])),
            )
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("Engine")
                    .depends_on("Core")
                    .with_setting(keys::DEFINES, SettingValue::set(["WITH_ENGINE"])),
            )
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("Core").with_setting(keys::DEFINES, SettingValue::set(["WITH_CORE"])),
            )
            .unwrap();

        let merged = merge_all(&store);
        assert_eq!(
            merged.get("Game").unwrap().entries(keys::DEFINES),
            vec!["WITH_CORE", "WITH_ENGINE", "WITH_GAME"]
        );
    }

    #[test]
    fn test_sibling_scalar_conflict_is_shadowed() {
        let mut store = DeclarationStore::new();
        store
            .register_module(ModuleDecl::library("A").with_dependencies(["B", "C"]))
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("B").with_setting(keys::OPTIMIZATION_LEVEL, SettingValue::scalar("O2")),
            )
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("C").with_setting(keys::OPTIMIZATION_LEVEL, SettingValue::scalar("O3")),
            )
            .unwrap();

        let merged = merge_all(&store);
        let a = merged.get("A").unwrap();
        assert_eq!(a.scalar(keys::OPTIMIZATION_LEVEL), Some("O3"));

        let shadowed = merged.shadowed();
        assert_eq!(shadowed.len(), 1);
        assert_eq!(shadowed[0].module, "A");
        assert_eq!(shadowed[0].winner, WithProvenance::new("O3".to_string(), "C"));
        assert_eq!(shadowed[0].shadowed, WithProvenance::new("O2".to_string(), "B"));
        assert_eq!(shadowed[0].to_diagnostic().code, "gantry::merge::shadowed");
    }

    #[test]
    fn test_same_conflict_from_several_dependents_reported_once() {
        let mut store = DeclarationStore::new();
        store
            .register_module(ModuleDecl::library("Game").with_dependencies(["B", "C"]))
            .unwrap();
        store
            .register_module(ModuleDecl::library("Editor").with_dependencies(["B", "C"]))
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("B").with_setting(keys::OPTIMIZATION_LEVEL, SettingValue::scalar("O2")),
            )
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("C").with_setting(keys::OPTIMIZATION_LEVEL, SettingValue::scalar("O3")),
            )
            .unwrap();

        for parallel in [false, true] {
            let graph = DependencyGraph::build(&store).unwrap();
            let merged = SettingsMerger::new(&graph, &PolicyTable::builtin())
                .unwrap()
                .merge_all(parallel);

            assert_eq!(merged.get("Game").unwrap().scalar(keys::OPTIMIZATION_LEVEL), Some("O3"));
            assert_eq!(merged.get("Editor").unwrap().scalar(keys::OPTIMIZATION_LEVEL), Some("O3"));

            let codes: Vec<_> = merged
                .shadowed()
                .iter()
                .map(|s| s.to_diagnostic().code)
                .collect();
            assert_eq!(codes, vec!["gantry::merge::shadowed"]);
            // First dependent in declaration order.
            assert_eq!(merged.shadowed()[0].module, "Game");
        }
    }

    #[test]
    fn test_shadow_check_on_long_chain() {
        // Each link overrides its dependency, so nothing is shadowed.
        let mut store = DeclarationStore::new();
        for i in 0..64 {
            let mut decl = ModuleDecl::library(format!("M{}", i))
                .with_setting(keys::OPTIMIZATION_LEVEL, SettingValue::scalar(format!("O{}", i)));
            if i > 0 {
                decl = decl.depends_on(format!("M{}", i - 1));
            }
            store.register_module(decl).unwrap();
        }

        let merged = merge_all(&store);
        assert_eq!(merged.get("M63").unwrap().scalar(keys::OPTIMIZATION_LEVEL), Some("O63"));
        assert!(merged.shadowed().is_empty());
    }

    #[test]
    fn test_dependent_override_is_silent() {
        let mut store = DeclarationStore::new();
        store
            .register_module(
                ModuleDecl::library("A")
                    .depends_on("B")
                    .with_setting(keys::CPP_STANDARD, SettingValue::scalar("c++20")),
            )
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("B").with_setting(keys::CPP_STANDARD, SettingValue::scalar("c++17")),
            )
            .unwrap();

        let merged = merge_all(&store);
        assert_eq!(merged.get("A").unwrap().scalar(keys::CPP_STANDARD), Some("c++20"));
        assert_eq!(merged.get("B").unwrap().scalar(keys::CPP_STANDARD), Some("c++17"));
        assert!(merged.shadowed().is_empty());
    }

    #[test]
    fn test_empty_scalar_never_overrides() {
        let mut store = DeclarationStore::new();
        store
            .register_module(
                ModuleDecl::library("A")
                    .depends_on("B")
                    .with_setting(keys::OPTIMIZATION_LEVEL, SettingValue::scalar("")),
            )
            .unwrap();
        store
            .register_module(
                ModuleDecl::library("B").with_setting(keys::OPTIMIZATION_LEVEL, SettingValue::scalar("O1")),
            )
            .unwrap();

        let merged = merge_all(&store);
        assert_eq!(merged.get("A").unwrap().scalar(keys::OPTIMIZATION_LEVEL), Some("O1"));
    }

    #[test]
    fn test_parallel_merge_matches_sequential() {
        let mut store = DeclarationStore::new();
        for i in 0..16 {
            let mut decl = ModuleDecl::library(format!("M{}", i))
                .with_setting(keys::INCLUDE_PATHS, SettingValue::list([format!("m{}", i)]));
            if i > 0 {
                decl = decl.depends_on(format!("M{}", i - 1));
            }
            if i > 2 {
                decl = decl.depends_on(format!("M{}", i / 2));
            }
            store.register_module(decl).unwrap();
        }

        let graph = DependencyGraph::build(&store).unwrap();
        let merger = SettingsMerger::new(&graph, &PolicyTable::builtin()).unwrap();
        let sequential = merger.merge_all(false);
        let parallel = merger.merge_all(true);

        for module in store.modules() {
            assert_eq!(sequential.get(module.name()), parallel.get(module.name()));
        }
    }

    #[test]
    fn test_kind_mismatch_against_policy_table() {
        let mut store = DeclarationStore::new();
        store
            .register_module(
                ModuleDecl::library("A").with_setting(keys::DEFINES, SettingValue::scalar("DEBUG")),
            )
            .unwrap();

        let errors = SettingsMerger::validate(&store, &PolicyTable::builtin()).unwrap_err();
        assert_eq!(
            errors,
            vec![MergeError::KindMismatch {
                namespace: Namespace::Module,
                owner: "A".into(),
                key: keys::DEFINES.into(),
                expected: MergePolicy::Set,
                found: MergePolicy::Scalar,
            }]
        );
    }

    #[test]
    fn test_unlisted_key_takes_first_declared_kind() {
        let mut store = DeclarationStore::new();
        store
            .register_module(ModuleDecl::library("A").with_setting("warnings", SettingValue::list(["all"])))
            .unwrap();
        store
            .register_target(
                TargetDecl::new("App", TargetKind::Application)
                    .with_setting("warnings", SettingValue::scalar("none")),
            )
            .unwrap();

        let errors = SettingsMerger::validate(&store, &PolicyTable::empty()).unwrap_err();
        assert!(matches!(
            &errors[0],
            MergeError::KindMismatch { namespace: Namespace::Target, expected: MergePolicy::OrderedList, .. }
        ));
    }

    #[test]
    fn test_header_only_with_pch_is_incompatible() {
        let mut store = DeclarationStore::new();
        store
            .register_module(ModuleDecl::new("Math", ModuleKind::HeaderOnly).with_pch(PchMode::UseShared))
            .unwrap();

        let errors = SettingsMerger::validate(&store, &PolicyTable::builtin()).unwrap_err();
        assert_eq!(
            errors,
            vec![MergeError::IncompatiblePch {
                module: "Math".into(),
                mode: PchMode::UseShared
            }]
        );
        assert!(errors[0].to_diagnostic().suggestions[0].contains("pch = \"none\""));
    }

    #[test]
    fn test_merge_unknown_module() {
        let store = DeclarationStore::new();
        let graph = DependencyGraph::build(&store).unwrap();
        let merger = SettingsMerger::new(&graph, &PolicyTable::builtin()).unwrap();
        assert!(matches!(
            merger.merge("Ghost"),
            Err(MergeError::UnknownModule { .. })
        ));
    }

    #[test]
    fn test_overlay_applies_target_overrides() {
        let record = EffectiveSettings::new("Game");
        let overrides = Settings::new()
            .with(keys::INCLUDE_ORDER_VERSION, SettingValue::scalar("Unreal5_5"))
            .with(keys::DEFINES, SettingValue::set(["UE_EDITOR"]));

        let overlaid = record.overlay("GameEditor", &overrides);
        assert_eq!(overlaid.scalar(keys::INCLUDE_ORDER_VERSION), Some("Unreal5_5"));
        assert_eq!(overlaid.value(keys::DEFINES).unwrap().entries()[0].from, "GameEditor");
        assert!(record.is_empty());
    }
}
