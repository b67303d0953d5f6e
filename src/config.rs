use crate::error::TreeSyncError;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

/// Which addressing scheme expresses parent/child relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingMode {
    NestedChildren,
    DataPath,
    ParentId,
}

/// Field names used to address `serde_json::Value` records (see [crate::json]).
///
/// Exactly one of `children_field`, `path_field` and `parent_id_field` may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressingConfig {
    pub id_field: Option<String>,
    pub children_field: Option<String>,
    pub path_field: Option<String>,
    pub parent_id_field: Option<String>,
}

impl AddressingConfig {
    pub fn mode(&self) -> Result<AddressingMode, TreeSyncError> {
        let modes = [
            (AddressingMode::NestedChildren, &self.children_field),
            (AddressingMode::DataPath, &self.path_field),
            (AddressingMode::ParentId, &self.parent_id_field),
        ]
        .into_iter()
        .filter(|(_, field)| field.is_some())
        .map(|(mode, _)| mode)
        .collect::<Vec<_>>();
        match modes[..] {
            [mode] => Ok(mode),
            [] => Err(TreeSyncError::Config(
                "one of children_field, path_field or parent_id_field is required".to_string(),
            )),
            _ => Err(TreeSyncError::Config(format!(
                "only one addressing scheme may be configured, found {modes:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// `-1` expands every level, `0` none, `n` expands groups whose level is below `n`.
    pub default_expanded: i32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        ExpansionConfig {
            default_expanded: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Deselect rows that become hidden under a collapsed group.
    pub deselect_hidden: bool,
    /// Selecting a group selects its descendants; groups show tri-state selection.
    pub group_selects_children: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            deselect_hidden: true,
            group_selects_children: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Reorder hint used by full loads that do not pass one explicitly.
    pub reorder_on_full_load: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub addressing: AddressingConfig,
    pub expansion: ExpansionConfig,
    pub selection: SelectionConfig,
    pub sync: SyncOptions,
}

impl TreeConfig {
    pub fn from_toml_str(content: &str) -> Result<TreeConfig, TreeSyncError> {
        let config: TreeConfig = toml::from_str(content)?;
        if config.addressing != AddressingConfig::default() {
            config.addressing.mode()?;
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, TreeSyncError> {
        Ok(toml::to_string(self)?)
    }
}

pub trait ConfigProvider {
    fn get_config(&self) -> Result<TreeConfig, TreeSyncError>;
    fn set_config(&self, config: &TreeConfig) -> Result<(), TreeSyncError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        TomlConfigProvider {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<TreeConfig, TreeSyncError> {
        tracing::debug!("Attempting to read tree config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(TreeConfig::default());
        }
        let content = read_to_string(&self.path)?;
        TreeConfig::from_toml_str(&content)
    }

    fn set_config(&self, config: &TreeConfig) -> Result<(), TreeSyncError> {
        tracing::debug!("Attempting to write tree config to: {:?}", &self.path);
        write(&self.path, config.to_toml_string()?)?;
        Ok(())
    }
}
