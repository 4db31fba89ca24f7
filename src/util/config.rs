//! Configuration file support for Gantry.
//!
//! Gantry supports two configuration file locations:
//! - Global: `~/.gantry/config.toml` - User-wide defaults
//! - Project: `.gantry/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::settings::MergePolicy;

/// Gantry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolution settings
    pub resolve: ResolveConfig,

    /// Extra merge policy entries (`key = "scalar" | "set" | "ordered-list"`)
    pub policy: BTreeMap<String, MergePolicy>,
}

/// Resolution-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Merge independent modules concurrently
    pub parallel_merge: bool,

    /// Promote advisory diagnostics to errors
    pub warnings_as_errors: bool,

    /// Warn about modules no target requires
    pub report_unreachable: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        ResolveConfig {
            parallel_merge: true,
            warnings_as_errors: false,
            report_unreachable: true,
        }
    }
}

/// The same sections with every field optional, so a file only overrides
/// what it actually sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PartialConfig {
    resolve: PartialResolveConfig,
    policy: BTreeMap<String, MergePolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PartialResolveConfig {
    parallel_merge: Option<bool>,
    warnings_as_errors: Option<bool>,
    report_unreachable: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.merge_file(path)?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Apply the settings present in a file on top of this config.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let partial: PartialConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        self.merge(partial);
        Ok(())
    }

    fn merge(&mut self, other: PartialConfig) {
        if let Some(parallel) = other.resolve.parallel_merge {
            self.resolve.parallel_merge = parallel;
        }
        if let Some(strict) = other.resolve.warnings_as_errors {
            self.resolve.warnings_as_errors = strict;
        }
        if let Some(report) = other.resolve.report_unreachable {
            self.resolve.report_unreachable = report;
        }
        self.policy.extend(other.policy);
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.gantry/config.toml)
/// 2. Global config (~/.gantry/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    for path in [global_path, project_path] {
        if path.exists() {
            if let Err(e) = config.merge_file(path) {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
            }
        }
    }

    config
}

/// Get the global gantry config directory (~/.gantry).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".gantry"))
}

/// Get the global config path (~/.gantry/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.gantry/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".gantry").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.resolve.parallel_merge);
        assert!(!config.resolve.warnings_as_errors);
        assert!(config.resolve.report_unreachable);
        assert!(config.policy.is_empty());
    }

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");

        std::fs::write(
            &global,
            "[resolve]\nwarnings_as_errors = true\nparallel_merge = false\n\n[policy]\nwarnings = \"set\"\n",
        )
        .unwrap();
        std::fs::write(
            &project,
            "[resolve]\nparallel_merge = true\n\n[policy]\nwarnings = \"ordered-list\"\n",
        )
        .unwrap();

        let config = load_config(&global, &project);
        // Set globally, untouched by the project file.
        assert!(config.resolve.warnings_as_errors);
        assert!(config.resolve.parallel_merge);
        assert_eq!(config.policy.get("warnings"), Some(&MergePolicy::OrderedList));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[policy]\nwarnings = \"bogus\"\n").unwrap();

        assert!(Config::load(&path).is_err());
        let config = Config::load_or_default(&path);
        assert!(config.policy.is_empty());
    }

    #[test]
    fn test_missing_files_use_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("a.toml"), &tmp.path().join("b.toml"));
        assert!(config.resolve.parallel_merge);
    }
}
