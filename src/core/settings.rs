//! Build settings and the per-kind merge policy table.
//!
//! A setting is a key plus a value of one of three kinds. The kind decides how
//! values combine when they propagate through the dependency closure:
//!
//! - scalar: last writer wins (the module itself, then its nearest dependency)
//! - set: union, duplicates collapse
//! - ordered-list: dependency-then-self concatenation, first occurrence wins

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Well-known setting keys.
pub mod keys {
    /// Engine include-order version a target or module is written against.
    pub const INCLUDE_ORDER_VERSION: &str = "include_order_version";
    /// Default build-settings version (e.g. `V5`).
    pub const DEFAULT_BUILD_SETTINGS: &str = "default_build_settings";
    /// Optimization level.
    pub const OPTIMIZATION_LEVEL: &str = "optimization_level";
    /// C++ standard.
    pub const CPP_STANDARD: &str = "cpp_standard";
    /// Preprocessor defines.
    pub const DEFINES: &str = "defines";
    /// Include search paths.
    pub const INCLUDE_PATHS: &str = "include_paths";
    /// Libraries to link.
    pub const LINK_LIBRARIES: &str = "link_libraries";
    /// Extra compiler flags.
    pub const COMPILE_FLAGS: &str = "compile_flags";
}

/// How values for a setting key combine under merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Last writer wins.
    Scalar,
    /// Union of all contributed values.
    Set,
    /// Concatenation in merge order with later duplicates removed.
    #[serde(alias = "list")]
    OrderedList,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::Scalar => write!(f, "scalar"),
            MergePolicy::Set => write!(f, "set"),
            MergePolicy::OrderedList => write!(f, "ordered-list"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scalar" => Ok(MergePolicy::Scalar),
            "set" => Ok(MergePolicy::Set),
            "ordered-list" | "list" => Ok(MergePolicy::OrderedList),
            other => Err(format!(
                "unknown merge policy `{}` (expected scalar, set or ordered-list)",
                other
            )),
        }
    }
}

/// A declared setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Scalar(String),
    Set(BTreeSet<String>),
    List(Vec<String>),
}

impl SettingValue {
    /// Create a scalar value.
    pub fn scalar(value: impl Into<String>) -> Self {
        SettingValue::Scalar(value.into())
    }

    /// Create a set value.
    pub fn set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SettingValue::Set(values.into_iter().map(Into::into).collect())
    }

    /// Create an ordered-list value.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SettingValue::List(values.into_iter().map(Into::into).collect())
    }

    /// The merge policy this value's shape implies.
    pub fn policy(&self) -> MergePolicy {
        match self {
            SettingValue::Scalar(_) => MergePolicy::Scalar,
            SettingValue::Set(_) => MergePolicy::Set,
            SettingValue::List(_) => MergePolicy::OrderedList,
        }
    }

    /// Whether this value contributes nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            SettingValue::Scalar(s) => s.is_empty(),
            SettingValue::Set(s) => s.is_empty(),
            SettingValue::List(l) => l.is_empty(),
        }
    }

    /// Iterate the individual entries of this value.
    pub fn entries(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            SettingValue::Scalar(s) => Box::new(std::iter::once(s.as_str())),
            SettingValue::Set(s) => Box::new(s.iter().map(String::as_str)),
            SettingValue::List(l) => Box::new(l.iter().map(String::as_str)),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Scalar(s) => write!(f, "{:?}", s),
            _ => {
                let items: Vec<String> = self.entries().map(|e| format!("{:?}", e)).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

/// The settings declared by a single module or target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
}

impl Settings {
    /// Create an empty settings map.
    pub fn new() -> Self {
        Settings::default()
    }

    /// Insert a setting, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: SettingValue) -> Option<SettingValue> {
        self.values.insert(key.into(), value)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: SettingValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Get the value for a key.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    /// Iterate settings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, SettingValue)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, SettingValue)>>(iter: I) -> Self {
        Settings {
            values: iter.into_iter().collect(),
        }
    }
}

/// Maps setting keys to their merge policy.
///
/// Keys absent from the table take the kind of their first declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    entries: BTreeMap<String, MergePolicy>,
}

impl PolicyTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        PolicyTable {
            entries: BTreeMap::new(),
        }
    }

    /// The built-in table for the well-known keys.
    pub fn builtin() -> Self {
        let mut table = PolicyTable::empty();
        for key in [
            keys::INCLUDE_ORDER_VERSION,
            keys::DEFAULT_BUILD_SETTINGS,
            keys::OPTIMIZATION_LEVEL,
            keys::CPP_STANDARD,
        ] {
            table.insert(key, MergePolicy::Scalar);
        }
        table.insert(keys::DEFINES, MergePolicy::Set);
        for key in [keys::INCLUDE_PATHS, keys::LINK_LIBRARIES, keys::COMPILE_FLAGS] {
            table.insert(key, MergePolicy::OrderedList);
        }
        table
    }

    /// Set the policy for a key, replacing any existing entry.
    pub fn insert(&mut self, key: impl Into<String>, policy: MergePolicy) {
        self.entries.insert(key.into(), policy);
    }

    /// Add every entry of `other`, replacing existing ones.
    pub fn extend<I, K>(&mut self, other: I)
    where
        I: IntoIterator<Item = (K, MergePolicy)>,
        K: Into<String>,
    {
        for (key, policy) in other {
            self.insert(key, policy);
        }
    }

    /// Look up the policy for a key.
    pub fn get(&self, key: &str) -> Option<MergePolicy> {
        self.entries.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MergePolicy)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        PolicyTable::builtin()
    }
}
