//! Configuration handling for the planner
//!
//! Configuration is stored in `.pert/config.toml` (workspace) and
//! `~/.config/pert/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::workspace::PERT_DIR;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Workspace-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Project used when `--project` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,

    /// Directory `project export` writes to (relative to the workspace root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_export_dir: Option<PathBuf>,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Output format used when `--format` is not given
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + workspace)
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub global: GlobalConfig,
    pub workspace_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let workspace_root = Self::find_workspace_root();
        let workspace = match &workspace_root {
            Some(root) => Self::load_workspace_config(root)?,
            None => WorkspaceConfig::default(),
        };

        Ok(Self {
            workspace,
            global,
            workspace_root,
        })
    }

    /// Loads configuration for a specific workspace
    pub fn for_workspace(workspace_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let workspace = Self::load_workspace_config(workspace_root)?;

        Ok(Self {
            workspace,
            global,
            workspace_root: Some(workspace_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "pert", "pert-cli").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    fn load_workspace_config(workspace_root: &Path) -> Result<WorkspaceConfig> {
        let config_path = workspace_root.join(PERT_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(WorkspaceConfig::default());
        }

        let content = fs::read_to_string(&config_path).with_context(|| {
            format!("Failed to read workspace config: {}", config_path.display())
        })?;

        let config: WorkspaceConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse workspace config")?;

        if config
            .default_project
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ConfigError::Invalid("default_project cannot be empty".to_string()).into());
        }

        Ok(config)
    }

    /// Finds the workspace root by looking for a `.pert/` directory
    pub fn find_workspace_root() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            if current.join(PERT_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Saves the workspace configuration
    pub fn save_workspace(&self) -> Result<()> {
        let root = self
            .workspace_root
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Not in a pert workspace. Run 'pert init' first."))?;
        let config_path = root.join(PERT_DIR).join("config.toml");

        let content = toml::to_string_pretty(&self.workspace)
            .context("Failed to serialize workspace config")?;

        fs::write(&config_path, content).with_context(|| {
            format!("Failed to write workspace config: {}", config_path.display())
        })
    }
}
