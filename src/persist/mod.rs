//! Persistence layer for group declarations.
//!
//! Groups can be declared in a RON file instead of (or in addition to) a
//! `Startup` system:
//!
//! ```ron
//! (
//!     groups: [
//!         (
//!             name: "moderator",
//!             priority: 150,
//!             permissions: { "CanExecuteScripts": true },
//!             bindings: [GroupRole(group_id: 5774246, role: "Moderator"), UserIds([83348])],
//!         ),
//!     ],
//! )
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Binding, ConsoleRegistry, GroupDef, RegistryError};

/// Default groups file name.
pub const DEFAULT_GROUPS_FILE: &str = "groups.ron";

/// Serializable group declarations.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GroupsFile {
    #[serde(default)]
    pub groups: Vec<GroupDecl>,
}

/// One group as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupDecl {
    pub name: String,
    pub priority: i32,
    /// Explicit capability values; absent capabilities stay unset.
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
    #[serde(default)]
    pub bindings: Vec<BindingDecl>,
}

/// File form of [`Binding`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BindingDecl {
    Everyone,
    Creator,
    UserIds(Vec<u64>),
    GroupRole { group_id: u64, role: String },
    GroupRank { group_id: u64, min_rank: u8 },
}

impl From<&BindingDecl> for Binding {
    fn from(decl: &BindingDecl) -> Self {
        match decl {
            BindingDecl::Everyone => Binding::Everyone,
            BindingDecl::Creator => Binding::Creator,
            BindingDecl::UserIds(ids) => Binding::UserIds(ids.clone()),
            BindingDecl::GroupRole { group_id, role } => Binding::GroupRole {
                group_id: *group_id,
                role: role.as_str().into(),
            },
            BindingDecl::GroupRank { group_id, min_rank } => Binding::GroupRank {
                group_id: *group_id,
                min_rank: *min_rank,
            },
        }
    }
}

impl From<&Binding> for BindingDecl {
    fn from(binding: &Binding) -> Self {
        match binding {
            Binding::Everyone => BindingDecl::Everyone,
            Binding::Creator => BindingDecl::Creator,
            Binding::UserIds(ids) => BindingDecl::UserIds(ids.clone()),
            Binding::GroupRole { group_id, role } => BindingDecl::GroupRole {
                group_id: *group_id,
                role: role.to_string(),
            },
            Binding::GroupRank { group_id, min_rank } => BindingDecl::GroupRank {
                group_id: *group_id,
                min_rank: *min_rank,
            },
        }
    }
}

impl GroupDecl {
    /// Build the registrable declaration.
    pub fn to_def(&self) -> GroupDef {
        let def = GroupDef::new(self.name.as_str(), self.priority)
            .permissions(self.permissions.iter().map(|(name, value)| (name.as_str(), *value)));
        self.bindings
            .iter()
            .fold(def, |def, binding| def.bind(binding.into()))
    }
}

impl GroupsFile {
    /// Create a new empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every group registered so far.
    pub fn from_registry(registry: &ConsoleRegistry) -> Self {
        let groups = registry
            .group_entries()
            .map(|(group, bindings)| GroupDecl {
                name: group.name().to_string(),
                priority: group.priority(),
                permissions: group
                    .permissions()
                    .iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
                bindings: bindings.iter().map(BindingDecl::from).collect(),
            })
            .collect();
        Self { groups }
    }

    /// Load declarations from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        ron::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save declarations to a RON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .enumerate_arrays(false);

        let contents = ron::ser::to_string_pretty(self, pretty)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Register every declared group, in file order.
    ///
    /// Stops at the first group the registry rejects.
    pub fn apply(&self, registry: &mut ConsoleRegistry) -> Result<usize, ConfigError> {
        for decl in &self.groups {
            registry.register_group(decl.to_def())?;
            debug!("Loaded group: {} (priority {})", decl.name, decl.priority);
        }
        Ok(self.groups.len())
    }
}

/// Errors that can occur while loading or saving group files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error for '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid group declaration: {0}")]
    Registry(#[from] RegistryError),
}

/// Resource tracking the groups file path.
#[derive(Resource, Debug, Clone)]
pub struct GroupsPath(pub String);

impl Default for GroupsPath {
    fn default() -> Self {
        Self(DEFAULT_GROUPS_FILE.to_string())
    }
}

/// System to load group declarations on startup.
///
/// A missing file is not an error. A malformed file or a rejected group
/// aborts startup.
pub fn load_groups_on_startup(
    mut registry: ResMut<ConsoleRegistry>,
    groups_path: Res<GroupsPath>,
) -> Result {
    let path = &groups_path.0;

    if !Path::new(path).exists() {
        info!("No groups file found at '{}', skipping", path);
        return Ok(());
    }

    let file = GroupsFile::load(path)?;
    let count = file.apply(&mut registry)?;
    info!("Loaded {} groups from '{}'", count, path);
    Ok(())
}
