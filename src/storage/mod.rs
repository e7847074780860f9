//! # Storage Layer
//!
//! Persistence for planner projects.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Projects | JSON, one record per file | `.pert/projects/{name}.json` |
//! | Exports | JSON | `{export dir}/{name}.pert` |
//! | Config | TOML | `.pert/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`ProjectStore`] uses file locking (`fs2`) for concurrent access
//! - All writes are atomic (temp file + rename)
//!
//! ## Workspace Structure
//!
//! ```text
//! .pert/
//! ├── projects/
//! │   └── launch.json       # One project record
//! └── config.toml           # Workspace configuration
//! ```
//!
//! ## Key Types
//!
//! - [`Workspace`] - Entry point for accessing a pert workspace
//! - [`ProjectStore`] - Read/write project records
//! - [`Config`] - Workspace and global configuration

mod config;
mod store;
mod workspace;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, WorkspaceConfig};
pub use store::{ProjectEntry, ProjectStore, StoreError};
pub use workspace::{Workspace, WorkspaceError, PERT_DIR};
