//! Gantry.toml manifest parsing.
//!
//! The manifest is one way to feed declarations into a [`DeclarationStore`]:
//!
//! ```toml
//! [policy]
//! warnings = "set"
//!
//! [[module]]
//! name = "Core"
//! kind = "library"
//! settings = { cpp_standard = "cpp20", defines = ["CORE_API"] }
//!
//! # `kind` may be omitted for modules and defaults to "library"
//! [[module]]
//! name = "Game"
//! dependencies = ["Core"]
//! pch = "use-explicit-or-shared"
//!
//! [[target]]
//! name = "Game"
//! kind = "game"
//! modules = ["Game"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::core::module::{ModuleDecl, ModuleKind, PchMode};
use crate::core::settings::{MergePolicy, PolicyTable, SettingValue, Settings};
use crate::core::store::DeclarationStore;
use crate::core::target::{TargetDecl, TargetKind};

/// Manifest file name.
pub const MANIFEST_NAME: &str = "Gantry.toml";

/// A parsed manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Per-key merge policies, added on top of the built-in table
    #[serde(default)]
    pub policy: BTreeMap<String, MergePolicy>,

    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleManifest>,

    #[serde(default, rename = "target")]
    pub targets: Vec<TargetManifest>,
}

/// A `[[module]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleManifest {
    pub name: Option<String>,
    /// Defaults to `library` when absent.
    #[serde(default = "default_module_kind")]
    pub kind: Option<ModuleKind>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub pch: PchMode,
    #[serde(default)]
    pub settings: BTreeMap<String, RawSetting>,
}

/// A `[[target]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetManifest {
    pub name: Option<String>,
    pub kind: Option<TargetKind>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, RawSetting>,
}

/// A setting as written in TOML, before its merge policy is known.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawSetting {
    One(String),
    Many(Vec<String>),
}

fn default_module_kind() -> Option<ModuleKind> {
    Some(ModuleKind::Library)
}

impl Manifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    /// Parse manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// The built-in policy table extended with this manifest's `[policy]` entries.
    pub fn policy_table(&self) -> PolicyTable {
        let mut table = PolicyTable::builtin();
        table.extend(self.policy.iter().map(|(k, v)| (k.clone(), *v)));
        table
    }

    /// Register every declaration into a fresh store, typing array settings
    /// with this manifest's own policy table.
    pub fn into_store(self) -> Result<DeclarationStore> {
        let table = self.policy_table();
        self.into_store_with(&table)
    }

    /// Register every declaration into a fresh store.
    ///
    /// `table` decides whether an array setting is a set or an ordered list
    /// and must be the same table the store is later resolved with.
    /// Declarations are submitted in file order, so duplicate and malformed
    /// entries are rejected by the store exactly as for any other loader.
    pub fn into_store_with(self, table: &PolicyTable) -> Result<DeclarationStore> {
        let mut store = DeclarationStore::new();

        for module in self.modules {
            let settings = convert_settings(table, module.name.as_deref(), module.settings)?;
            let decl = ModuleDecl {
                name: module.name,
                kind: module.kind,
                dependencies: module.dependencies,
                settings,
                pch: module.pch,
            };
            store.register_module(decl)?;
        }

        for target in self.targets {
            let settings = convert_settings(table, target.name.as_deref(), target.settings)?;
            let decl = TargetDecl {
                name: target.name,
                kind: target.kind,
                modules: target.modules,
                settings,
            };
            store.register_target(decl)?;
        }

        Ok(store)
    }
}

/// Turn raw TOML values into typed settings.
///
/// A string is always a scalar. An array takes the key's policy, defaulting
/// to an ordered list for keys the table does not know.
fn convert_settings(
    table: &PolicyTable,
    owner: Option<&str>,
    raw: BTreeMap<String, RawSetting>,
) -> Result<Settings> {
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                RawSetting::One(s) => SettingValue::Scalar(s),
                RawSetting::Many(items) => match table.get(&key) {
                    Some(MergePolicy::Scalar) => bail!(
                        "setting `{}` on `{}` is a scalar and cannot be an array",
                        key,
                        owner.unwrap_or("<unnamed>")
                    ),
                    Some(MergePolicy::Set) => SettingValue::set(items),
                    Some(MergePolicy::OrderedList) | None => SettingValue::list(items),
                },
            };
            Ok((key, value))
        })
        .collect()
}

/// Load a manifest file straight into a declaration store.
pub fn load_manifest(path: &Path) -> Result<DeclarationStore> {
    Manifest::load(path)?.into_store()
}

/// Find `Gantry.toml` in `start` or any of its ancestors.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_NAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::keys;
    use tempfile::TempDir;

    const GAME: &str = r#"
[[module]]
name = "Core"
settings = { include_order_version = "Unreal5_5", defines = ["CORE_API", "WITH_EDITOR"], include_paths = ["Core/Public"] }

[[module]]
name = "PCG_Game"
dependencies = ["Core"]
pch = "use-explicit-or-shared"
settings = { default_build_settings = "V5" }

[[target]]
name = "PCG_Game"
kind = "game"
modules = ["PCG_Game"]

[[target]]
name = "PCG_GameEditor"
kind = "editor"
modules = ["PCG_Game"]
settings = { optimization_level = "O0" }
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(GAME).unwrap();
        assert_eq!(manifest.modules.len(), 2);
        assert_eq!(manifest.targets.len(), 2);
        assert_eq!(manifest.modules[0].kind, Some(ModuleKind::Library));
        assert_eq!(manifest.modules[1].pch, PchMode::UseExplicit);
        assert_eq!(manifest.targets[1].kind, Some(TargetKind::EditorHost));
    }

    #[test]
    fn test_into_store_converts_settings() {
        let store = Manifest::parse(GAME).unwrap().into_store().unwrap();
        let core = store.lookup_module("Core").unwrap();

        assert_eq!(
            core.settings().get(keys::INCLUDE_ORDER_VERSION),
            Some(&SettingValue::scalar("Unreal5_5"))
        );
        assert_eq!(
            core.settings().get(keys::DEFINES),
            Some(&SettingValue::set(["CORE_API", "WITH_EDITOR"]))
        );
        assert_eq!(
            core.settings().get(keys::INCLUDE_PATHS),
            Some(&SettingValue::list(["Core/Public"]))
        );

        let game = store.lookup_module("PCG_Game").unwrap();
        assert_eq!(game.dependencies(), ["Core".to_string()]);
        assert_eq!(store.target_count(), 2);
    }

    #[test]
    fn test_unknown_array_key_is_ordered_list() {
        let manifest = Manifest::parse(
            "[[module]]\nname = \"A\"\nsettings = { extra_flags = [\"-b\", \"-a\"] }\n",
        )
        .unwrap();
        let store = manifest.into_store().unwrap();
        let a = store.lookup_module("A").unwrap();
        assert_eq!(a.settings().get("extra_flags"), Some(&SettingValue::list(["-b", "-a"])));
    }

    #[test]
    fn test_manifest_policy_applies() {
        let manifest = Manifest::parse(
            "[policy]\nwarnings = \"set\"\n\n[[module]]\nname = \"A\"\nsettings = { warnings = [\"b\", \"a\"] }\n",
        )
        .unwrap();
        let store = manifest.into_store().unwrap();
        let a = store.lookup_module("A").unwrap();
        assert_eq!(a.settings().get("warnings"), Some(&SettingValue::set(["a", "b"])));
    }

    #[test]
    fn test_into_store_with_external_policy() {
        let manifest =
            Manifest::parse("[[module]]\nname = \"A\"\nsettings = { warnings = [\"b\", \"a\"] }\n")
                .unwrap();

        let mut table = PolicyTable::builtin();
        table.insert("warnings", MergePolicy::Set);
        let store = manifest.into_store_with(&table).unwrap();

        let a = store.lookup_module("A").unwrap();
        assert_eq!(a.settings().get("warnings"), Some(&SettingValue::set(["a", "b"])));
    }

    #[test]
    fn test_module_kind_defaults_to_library() {
        let store = Manifest::parse("[[module]]\nname = \"A\"\n")
            .unwrap()
            .into_store()
            .unwrap();
        assert_eq!(store.lookup_module("A").unwrap().kind(), ModuleKind::Library);
    }

    #[test]
    fn test_missing_required_fields_rejected_by_store() {
        let manifest = Manifest::parse("[[module]]\nkind = \"library\"\n").unwrap();
        let err = manifest.into_store().unwrap_err();
        assert!(err.to_string().contains("missing required field `name`"));

        let manifest = Manifest::parse("[[target]]\nname = \"App\"\nmodules = []\n").unwrap();
        let err = manifest.into_store().unwrap_err();
        assert!(err.to_string().contains("kind"));
    }

    #[test]
    fn test_array_for_scalar_key_rejected() {
        let manifest = Manifest::parse(
            "[[module]]\nname = \"A\"\nsettings = { cpp_standard = [\"cpp17\", \"cpp20\"] }\n",
        )
        .unwrap();
        let err = manifest.into_store().unwrap_err();
        assert!(err.to_string().contains("cpp_standard"));
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let manifest =
            Manifest::parse("[[module]]\nname = \"A\"\n\n[[module]]\nname = \"A\"\n").unwrap();
        assert!(manifest.into_store().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Manifest::parse("[[module]]\nname = \"A\"\nversion = \"1.0\"\n").is_err());
    }

    #[test]
    fn test_find_manifest_walks_upward() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join(MANIFEST_NAME);
        std::fs::write(&manifest, GAME).unwrap();
        let nested = tmp.path().join("Source").join("PCG_Game");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_manifest(&nested), Some(manifest.clone()));
        let store = load_manifest(&manifest).unwrap();
        assert_eq!(store.module_count(), 2);
    }
}
