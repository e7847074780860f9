//! JSON file storage for projects
//!
//! Each project lives in `.pert/projects/{name}.json` as a single record.
//! Reads take a shared `fs2` lock, writes an exclusive one, and every write
//! goes through a temp file plus rename.

use std::cmp::Reverse;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Project, Stats};

const RECORD_EXTENSION: &str = "json";
const EXPORT_EXTENSION: &str = "pert";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Project already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid project name: {0:?}")]
    InvalidName(String),
}

/// One row of the project listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectEntry {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub started: bool,
}

/// Just enough of a record to list it
#[derive(Deserialize)]
struct RecordHeader {
    #[serde(default)]
    stats: Stats,
    #[serde(default)]
    original: Option<serde_json::Value>,
}

/// Store for project records, one JSON file each
pub struct ProjectStore {
    dir: PathBuf,
}

impl ProjectStore {
    /// Creates a store over the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the record path of a project
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{RECORD_EXTENSION}"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Lists projects, most recently accessed first
    pub fn list(&self) -> Result<Vec<ProjectEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let dir = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read project directory: {}", self.dir.display()))?;

        for dir_entry in dir {
            let path = dir_entry.context("Failed to read directory entry")?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let parsed = read_locked(&path).and_then(|content| {
                serde_json::from_str::<RecordHeader>(&content).map_err(anyhow::Error::from)
            });
            let header = match parsed {
                Ok(header) => header,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable project");
                    continue;
                }
            };

            entries.push(ProjectEntry {
                name: name.to_string(),
                created_at: header.stats.created_at,
                modified_at: header.stats.modified_at,
                accessed_at: header.stats.accessed_at,
                started: header.original.is_some(),
            });
        }

        // None sorts below Some, so Reverse puts never-accessed projects last
        entries.sort_by(|a, b| {
            Reverse(a.accessed_at)
                .cmp(&Reverse(b.accessed_at))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    /// Creates an empty project. Fails if the name is taken.
    pub fn create(&self, name: &str) -> Result<Project> {
        validate_name(name)?;
        if self.exists(name) {
            return Err(StoreError::AlreadyExists(name.to_string()).into());
        }

        let mut project = Project::new();
        project.stats_mut().accessed_at = Some(Utc::now());
        self.write(name, &project)?;
        Ok(project)
    }

    /// Reads a project without touching its stats
    pub fn load(&self, name: &str) -> Result<Project> {
        let path = self.path(name);
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()).into());
        }

        let content = read_locked(&path)?;
        let project: Project = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse project: {}", path.display()))?;

        debug!(project = name, "loaded project");
        Ok(project)
    }

    /// Reads a project and records the access
    pub fn open(&self, name: &str) -> Result<Project> {
        let mut project = self.load(name)?;
        project.stats_mut().accessed_at = Some(Utc::now());
        self.write(name, &project)?;
        Ok(project)
    }

    /// Saves a modified project.
    ///
    /// A started project missing any date is refused.
    pub fn save(&self, name: &str, project: &mut Project) -> Result<()> {
        project
            .check_saveable()
            .with_context(|| format!("Cannot save project '{name}'"))?;

        let now = Utc::now();
        let stats = project.stats_mut();
        stats.modified_at = Some(now);
        stats.accessed_at = Some(now);
        self.write(name, project)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        validate_name(to)?;
        let source = self.path(from);
        if !source.is_file() {
            return Err(StoreError::NotFound(from.to_string()).into());
        }
        if self.exists(to) {
            return Err(StoreError::AlreadyExists(to.to_string()).into());
        }

        let target = self.path(to);
        fs::rename(&source, &target).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                source.display(),
                target.display()
            )
        })?;
        debug!(from, to, "renamed project");
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()).into());
        }

        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete project: {}", path.display()))?;
        debug!(project = name, "deleted project");
        Ok(())
    }

    /// Writes `{name}.pert` into `dir` and returns its path
    pub fn export(&self, name: &str, dir: &Path) -> Result<PathBuf> {
        let project = self.load(name)?;

        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        let target = dir.join(format!("{name}.{EXPORT_EXTENSION}"));
        write_atomic(&target, &project)?;

        debug!(project = name, path = %target.display(), "exported project");
        Ok(target)
    }

    fn write(&self, name: &str, project: &Project) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;
        write_atomic(&self.path(name), project)?;
        debug!(project = name, "wrote project");
        Ok(())
    }
}

/// Project names become file names, so path separators and leading dots are
/// not allowed
fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.trim().is_empty()
        || name.trim() != name
        || name.starts_with('.')
        || name.contains(['/', '\\']);
    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn read_locked(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open project: {}", path.display()))?;

    // Lock is released when file is dropped
    file.lock_shared()
        .context("Failed to acquire read lock on project")?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("Failed to read project: {}", path.display()))?;
    Ok(content)
}

fn write_atomic(path: &Path, project: &Project) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on project")?;

        let mut writer = BufWriter::new(&file);
        serde_json::to_writer_pretty(&mut writer, project).context("Failed to serialize project")?;
        writeln!(writer).context("Failed to write project")?;
        writer.flush().context("Failed to flush project")?;
    }

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })
}
