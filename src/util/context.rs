//! Global context for Gantry operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::manifest::{find_manifest, MANIFEST_NAME};
use crate::util::config::{self, Config};

/// Global context passed to every command.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,
    home: Option<PathBuf>,
    manifest_path: Option<PathBuf>,
    color: bool,
}

impl GlobalContext {
    /// Create a context rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            home: config::global_config_dir(),
            manifest_path: None,
            color: true,
        }
    }

    /// Use an explicit manifest instead of searching for one.
    pub fn set_manifest_path(&mut self, path: Option<PathBuf>) {
        self.manifest_path = path.map(|p| if p.is_absolute() { p } else { self.cwd.join(p) });
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Locate the manifest: the explicit path if one was given, otherwise
    /// the nearest `Gantry.toml` at or above the working directory.
    pub fn find_manifest(&self) -> Result<PathBuf> {
        if let Some(path) = &self.manifest_path {
            if !path.is_file() {
                bail!("manifest not found: {}", path.display());
            }
            return Ok(path.clone());
        }

        match find_manifest(&self.cwd) {
            Some(path) => Ok(path),
            None => bail!(
                "could not find `{}` in `{}` or any parent directory",
                MANIFEST_NAME,
                self.cwd.display()
            ),
        }
    }

    /// Load global and project configuration for a project rooted at `root`.
    pub fn load_config(&self, root: &Path) -> Config {
        let project = config::project_config_path(root);
        match &self.home {
            Some(home) => config::load_config(&home.join("config.toml"), &project),
            None => Config::load_or_default(&project),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_manifest_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join(MANIFEST_NAME);
        std::fs::write(&manifest, "").unwrap();
        let sub = tmp.path().join("Source");
        std::fs::create_dir(&sub).unwrap();

        let ctx = GlobalContext::with_cwd(sub);
        assert_eq!(ctx.find_manifest().unwrap(), manifest);
    }

    #[test]
    fn test_explicit_manifest_path() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join("Other.toml");
        std::fs::write(&manifest, "").unwrap();

        let mut ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        ctx.set_manifest_path(Some(PathBuf::from("Other.toml")));
        assert_eq!(ctx.find_manifest().unwrap(), manifest);

        ctx.set_manifest_path(Some(PathBuf::from("Missing.toml")));
        assert!(ctx.find_manifest().is_err());
    }

    #[test]
    fn test_project_config_is_read() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".gantry");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[resolve]\nreport_unreachable = false\n").unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        let config = ctx.load_config(tmp.path());
        assert!(!config.resolve.report_unreachable);
    }
}
