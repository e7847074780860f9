//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Workspace setup and overview | `init`, `status` |
//! | Project | Project lifecycle | `project new`, `project start`, `project changes` |
//! | Plan | Milestones, dependencies, resources | `node add`, `edge add`, `resource add` |
//! | Query | Engine queries | `bounds`, `cost`, `conflicts`, `level`, `neighbours` |
//!
//! ## Project Selection
//!
//! Commands working on a project use `--project` (or `PERT_PROJECT`), else the
//! workspace default set with `project use`, else the most recently used one.
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Logs go to stderr. `--verbose` (or `-v`) enables debug logs; `PERT_LOG`
//! takes a full filter:
//! ```bash
//! PERT_LOG=pert_cli=debug pert status
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod edge;
mod node;
mod output;
mod project_cmd;
mod query;
mod resource;
mod session;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
