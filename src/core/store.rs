//! The declaration store.
//!
//! Holds the modules and targets submitted by a configuration loader for a
//! single resolution run. Modules and targets live in separate namespaces.
//! The store is append-only: a rejected registration leaves it untouched.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::core::module::{Module, ModuleDecl};
use crate::core::target::{Target, TargetDecl};
use crate::util::diagnostic::{Component, Diagnostic};

/// The namespace a declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Module,
    Target,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Module => write!(f, "module"),
            Namespace::Target => write!(f, "target"),
        }
    }
}

/// Errors raised at registration or lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{namespace} `{name}` is already declared")]
    DuplicateName { namespace: Namespace, name: String },

    #[error("invalid {namespace} declaration{}: {reason}", name.as_ref().map(|n| format!(" `{}`", n)).unwrap_or_default())]
    InvalidDeclaration {
        namespace: Namespace,
        name: Option<String>,
        reason: String,
    },

    #[error("{namespace} `{name}` not found")]
    NotFound { namespace: Namespace, name: String },
}

impl StoreError {
    /// Convert to a structured diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            StoreError::DuplicateName { namespace, name } => {
                Diagnostic::error(Component::Store, "gantry::store::duplicate", self.to_string())
                    .with_entity(name.clone())
                    .with_suggestion(format!("Rename one of the {}s named `{}`", namespace, name))
            }
            StoreError::InvalidDeclaration { name, .. } => {
                let mut diag =
                    Diagnostic::error(Component::Store, "gantry::store::invalid", self.to_string());
                if let Some(name) = name {
                    diag = diag.with_entity(name.clone());
                }
                diag
            }
            StoreError::NotFound { namespace, name } => {
                Diagnostic::error(Component::Store, "gantry::store::not_found", self.to_string())
                    .with_entity(name.clone())
                    .with_suggestion(format!("Run `gantry plan` to list declared {}s", namespace))
            }
        }
    }
}

/// Per-run store of module and target declarations.
#[derive(Debug, Clone, Default)]
pub struct DeclarationStore {
    modules: Vec<Module>,
    module_index: HashMap<String, usize>,
    targets: Vec<Target>,
    target_index: HashMap<String, usize>,
}

impl DeclarationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        DeclarationStore::default()
    }

    /// Admit a module declaration.
    pub fn register_module(&mut self, decl: ModuleDecl) -> Result<&Module, StoreError> {
        let module = Module::from_decl(decl)?;

        if self.module_index.contains_key(module.name()) {
            return Err(StoreError::DuplicateName {
                namespace: Namespace::Module,
                name: module.name().to_string(),
            });
        }

        tracing::debug!(
            "registered module `{}` ({}, {} deps)",
            module.name(),
            module.kind(),
            module.dependencies().len()
        );

        let index = self.modules.len();
        self.module_index.insert(module.name().to_string(), index);
        self.modules.push(module);
        Ok(&self.modules[index])
    }

    /// Admit a target declaration.
    pub fn register_target(&mut self, decl: TargetDecl) -> Result<&Target, StoreError> {
        let target = Target::from_decl(decl)?;

        if self.target_index.contains_key(target.name()) {
            return Err(StoreError::DuplicateName {
                namespace: Namespace::Target,
                name: target.name().to_string(),
            });
        }

        tracing::debug!(
            "registered target `{}` ({}, {} root modules)",
            target.name(),
            target.kind(),
            target.modules().len()
        );

        let index = self.targets.len();
        self.target_index.insert(target.name().to_string(), index);
        self.targets.push(target);
        Ok(&self.targets[index])
    }

    /// Look up a module by name.
    pub fn lookup_module(&self, name: &str) -> Result<&Module, StoreError> {
        self.module_position(name)
            .map(|i| &self.modules[i])
            .ok_or_else(|| StoreError::NotFound {
                namespace: Namespace::Module,
                name: name.to_string(),
            })
    }

    /// Look up a target by name.
    pub fn lookup_target(&self, name: &str) -> Result<&Target, StoreError> {
        self.target_index
            .get(name)
            .map(|&i| &self.targets[i])
            .ok_or_else(|| StoreError::NotFound {
                namespace: Namespace::Target,
                name: name.to_string(),
            })
    }

    /// Declaration index of a module.
    pub fn module_position(&self, name: &str) -> Option<usize> {
        self.module_index.get(name).copied()
    }

    /// Module at a declaration index.
    pub fn module_at(&self, index: usize) -> &Module {
        &self.modules[index]
    }

    /// Modules in declaration order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Targets in declaration order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.targets.is_empty()
    }
}
