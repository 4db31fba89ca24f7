//! Module declarations - the compilation units of a project.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::settings::{SettingValue, Settings};
use crate::core::store::{Namespace, StoreError};

/// The kind of compilation unit a module produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleKind {
    /// Static library linked into its dependents
    #[serde(alias = "lib", alias = "static")]
    Library,

    /// Shared object (.so / .dylib / .dll)
    #[serde(alias = "shared", alias = "dylib")]
    SharedObject,

    /// Headers only, no translation units
    #[serde(alias = "header", alias = "interface")]
    HeaderOnly,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Library => write!(f, "library"),
            ModuleKind::SharedObject => write!(f, "shared-object"),
            ModuleKind::HeaderOnly => write!(f, "header-only"),
        }
    }
}

/// Precompiled-header strategy for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PchMode {
    /// No precompiled header
    #[default]
    None,

    /// Use a PCH shared between modules
    #[serde(alias = "shared")]
    UseShared,

    /// Use the module's own explicit PCH, falling back to a shared one
    #[serde(alias = "explicit", alias = "use-explicit-or-shared")]
    UseExplicit,
}

impl fmt::Display for PchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PchMode::None => write!(f, "none"),
            PchMode::UseShared => write!(f, "use-shared"),
            PchMode::UseExplicit => write!(f, "use-explicit"),
        }
    }
}

/// A raw module declaration as submitted by a configuration loader.
///
/// Required fields are optional here so that loaders can hand over whatever
/// they parsed; the store rejects incomplete declarations.
#[derive(Debug, Clone, Default)]
pub struct ModuleDecl {
    pub name: Option<String>,
    pub kind: Option<ModuleKind>,
    pub dependencies: Vec<String>,
    pub settings: Settings,
    pub pch: PchMode,
}

impl ModuleDecl {
    /// Create a declaration with the required fields filled in.
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        ModuleDecl {
            name: Some(name.into()),
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Shorthand for a library module.
    pub fn library(name: impl Into<String>) -> Self {
        Self::new(name, ModuleKind::Library)
    }

    /// Append a dependency.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Append several dependencies in order.
    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare a setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: SettingValue) -> Self {
        self.settings.insert(key, value);
        self
    }

    /// Set the precompiled-header mode.
    pub fn with_pch(mut self, pch: PchMode) -> Self {
        self.pch = pch;
        self
    }
}

/// An admitted module. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    name: String,
    kind: ModuleKind,
    dependencies: Vec<String>,
    settings: Settings,
    pch: PchMode,
}

impl Module {
    /// Validate a raw declaration.
    pub(crate) fn from_decl(decl: ModuleDecl) -> Result<Module, StoreError> {
        let name = validate_name(Namespace::Module, decl.name)?;

        let kind = decl.kind.ok_or_else(|| StoreError::InvalidDeclaration {
            namespace: Namespace::Module,
            name: Some(name.clone()),
            reason: "missing required field `kind`".to_string(),
        })?;

        check_name_list(Namespace::Module, &name, "dependency", &decl.dependencies)?;

        Ok(Module {
            name,
            kind,
            dependencies: decl.dependencies,
            settings: decl.settings,
            pch: decl.pch,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// Declared dependency names, in declaration order.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pch(&self) -> PchMode {
        self.pch
    }
}

/// Check that a declaration carries a usable name.
pub(crate) fn validate_name(
    namespace: Namespace,
    name: Option<String>,
) -> Result<String, StoreError> {
    match name {
        Some(name) if !name.trim().is_empty() => Ok(name),
        Some(_) => Err(StoreError::InvalidDeclaration {
            namespace,
            name: None,
            reason: "`name` must not be empty".to_string(),
        }),
        None => Err(StoreError::InvalidDeclaration {
            namespace,
            name: None,
            reason: "missing required field `name`".to_string(),
        }),
    }
}

/// Reject empty or repeated entries in a list of referenced names.
pub(crate) fn check_name_list(
    namespace: Namespace,
    owner: &str,
    what: &str,
    names: &[String],
) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidDeclaration {
                namespace,
                name: Some(owner.to_string()),
                reason: format!("empty {} name", what),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(StoreError::InvalidDeclaration {
                namespace,
                name: Some(owner.to_string()),
                reason: format!("{} `{}` is listed more than once", what, name),
            });
        }
    }
    Ok(())
}
