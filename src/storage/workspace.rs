//! Workspace management
//!
//! Handles workspace initialization and provides access to the project store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use super::{Config, ProjectStore};

/// Name of the directory marking a workspace root
pub const PERT_DIR: &str = ".pert";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Not in a pert workspace. Run 'pert init' first.")]
    NotInWorkspace,

    #[error("No project selected. Create one with 'pert project new <name>'.")]
    NoProject,
}

/// A directory holding planner projects
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Opens an existing workspace at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PERT_DIR).is_dir() {
            return Err(WorkspaceError::NotInWorkspace.into());
        }

        let config = Config::for_workspace(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the workspace at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_workspace_root().ok_or(WorkspaceError::NotInWorkspace)?;

        Self::open(root)
    }

    /// Initializes a workspace at the given path. Existing files are kept.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let pert_dir = root.join(PERT_DIR);

        let projects_dir = pert_dir.join("projects");
        fs::create_dir_all(&projects_dir).with_context(|| {
            format!(
                "Failed to create projects directory: {}",
                projects_dir.display()
            )
        })?;

        let config_path = pert_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# pert workspace configuration

# Project used when --project is not given
# default_project = "launch"

# Directory 'pert project export' writes to
# default_export_dir = "exports"
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        debug!(root = %root.display(), "initialized workspace");
        Self::open(root)
    }

    /// Returns the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .pert directory path
    pub fn pert_dir(&self) -> PathBuf {
        self.root.join(PERT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Returns the project store
    pub fn store(&self) -> ProjectStore {
        ProjectStore::new(self.pert_dir().join("projects"))
    }

    /// Directory exports go to when no explicit one is given
    pub fn export_dir(&self) -> PathBuf {
        match &self.config.workspace.default_export_dir {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }

    /// Picks the project to work on: the explicit name, else the configured
    /// default, else the most recently accessed project
    pub fn resolve_project(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(name) = explicit {
            return Ok(name.to_string());
        }
        if let Some(name) = &self.config.workspace.default_project {
            return Ok(name.clone());
        }

        self.store()
            .list()?
            .into_iter()
            .next()
            .map(|entry| entry.name)
            .ok_or_else(|| WorkspaceError::NoProject.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::init(dir.path()).unwrap();

        assert!(workspace.pert_dir().is_dir());
        assert!(workspace.pert_dir().join("projects").is_dir());
        assert!(workspace.pert_dir().join("config.toml").is_file());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();

        Workspace::init(dir.path()).unwrap();
        Workspace::init(dir.path()).unwrap();

        assert!(dir.path().join(PERT_DIR).is_dir());
    }

    #[test]
    fn open_non_workspace_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Workspace::open(dir.path()).is_err());
    }

    #[test]
    fn resolve_prefers_explicit_then_default_then_recent() {
        let dir = TempDir::new().unwrap();
        let mut workspace = Workspace::init(dir.path()).unwrap();

        assert!(workspace.resolve_project(None).is_err());

        let store = workspace.store();
        store.create("alpha").unwrap();
        store.create("beta").unwrap();
        store.open("alpha").unwrap();

        assert_eq!(workspace.resolve_project(None).unwrap(), "alpha");

        workspace.config_mut().workspace.default_project = Some("beta".to_string());
        assert_eq!(workspace.resolve_project(None).unwrap(), "beta");
        assert_eq!(workspace.resolve_project(Some("gamma")).unwrap(), "gamma");
    }

    #[test]
    fn export_dir_follows_config() {
        let dir = TempDir::new().unwrap();
        let mut workspace = Workspace::init(dir.path()).unwrap();
        assert_eq!(workspace.export_dir(), dir.path());

        workspace.config_mut().workspace.default_export_dir = Some(PathBuf::from("out"));
        assert_eq!(workspace.export_dir(), dir.path().join("out"));
    }
}
