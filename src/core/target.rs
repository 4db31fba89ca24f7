//! Target declarations - what gets deployed.
//!
//! A Target names a deployable artifact (application, editor host or
//! service) and the root modules it directly requires. Its settings are
//! overrides applied on top of each module's effective settings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::module::{check_name_list, validate_name};
use crate::core::settings::{SettingValue, Settings};
use crate::core::store::{Namespace, StoreError};

/// The kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// Standalone application
    #[serde(alias = "game", alias = "exe")]
    Application,

    /// Editor or tooling host that loads the modules
    #[serde(alias = "editor")]
    EditorHost,

    /// Headless service
    #[serde(alias = "server")]
    Service,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Application => write!(f, "application"),
            TargetKind::EditorHost => write!(f, "editor-host"),
            TargetKind::Service => write!(f, "service"),
        }
    }
}

/// A raw target declaration as submitted by a configuration loader.
#[derive(Debug, Clone, Default)]
pub struct TargetDecl {
    pub name: Option<String>,
    pub kind: Option<TargetKind>,
    pub modules: Vec<String>,
    pub settings: Settings,
}

impl TargetDecl {
    /// Create a declaration with the required fields filled in.
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        TargetDecl {
            name: Some(name.into()),
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Append a root module.
    pub fn requires(mut self, module: impl Into<String>) -> Self {
        self.modules.push(module.into());
        self
    }

    /// Append several root modules in order.
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Declare a target-level override.
    pub fn with_setting(mut self, key: impl Into<String>, value: SettingValue) -> Self {
        self.settings.insert(key, value);
        self
    }
}

/// An admitted target. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: String,
    kind: TargetKind,
    modules: Vec<String>,
    settings: Settings,
}

impl Target {
    /// Validate a raw declaration.
    pub(crate) fn from_decl(decl: TargetDecl) -> Result<Target, StoreError> {
        let name = validate_name(Namespace::Target, decl.name)?;

        let kind = decl.kind.ok_or_else(|| StoreError::InvalidDeclaration {
            namespace: Namespace::Target,
            name: Some(name.clone()),
            reason: "missing required field `kind`".to_string(),
        })?;

        check_name_list(Namespace::Target, &name, "root module", &decl.modules)?;

        Ok(Target {
            name,
            kind,
            modules: decl.modules,
            settings: decl.settings,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Root modules, in declaration order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Target-level setting overrides.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
