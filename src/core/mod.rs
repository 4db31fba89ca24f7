//! Core data structures for Gantry.
//!
//! This module contains the declarations a configuration loader submits:
//! - Modules (compilation units) and targets (deployable artifacts)
//! - Settings and their merge policies
//! - The per-run declaration store
//! - The `Gantry.toml` manifest loader

pub mod manifest;
pub mod module;
pub mod settings;
pub mod store;
pub mod target;

pub use manifest::{find_manifest, Manifest, MANIFEST_NAME};
pub use module::{Module, ModuleDecl, ModuleKind, PchMode};
pub use settings::{MergePolicy, PolicyTable, SettingValue, Settings};
pub use store::{DeclarationStore, Namespace, StoreError};
pub use target::{Target, TargetDecl, TargetKind};
