//! Gantry - module and target build configuration for C++ projects
//!
//! This crate provides the core library functionality for Gantry:
//! declaration intake, dependency graph validation, settings merge, and
//! build planning with structured diagnostics.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

pub use crate::core::{
    manifest::load_manifest, DeclarationStore, Manifest, ModuleDecl, ModuleKind, PchMode,
    TargetDecl, TargetKind,
};

pub use builder::{BuildPlan, SettingsMerger};
pub use ops::{resolve, resolve_with, ResolveOptions};
pub use resolver::DependencyGraph;
pub use util::context::GlobalContext;
pub use util::diagnostic::DiagnosticsReport;
