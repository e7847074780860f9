//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::edge::{self, EdgeCommands};
use super::node::{self, NodeCommands};
use super::output::{Output, OutputFormat};
use super::project_cmd::{self, ProjectCommands};
use super::query;
use super::resource::{self, ResourceCommands};
use crate::storage::{Config, Workspace};

/// Environment variable holding the log filter
const LOG_ENV: &str = "PERT_LOG";

#[derive(Parser)]
#[command(name = "pert")]
#[command(author, version, about = "Milestone planning with dependency graphs and resource conflict detection")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project to work on (defaults to the workspace default, then the most
    /// recently used project)
    #[arg(long, short = 'p', global = true, env = "PERT_PROJECT")]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a pert workspace
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Manage milestones
    #[command(subcommand)]
    Node(NodeCommands),

    /// Manage dependencies between milestones
    #[command(subcommand)]
    Edge(EdgeCommands),

    /// Manage shared resources
    #[command(subcommand)]
    Resource(ResourceCommands),

    /// Show allowed date windows
    Bounds {
        /// Milestone ID (omit for the project and every milestone)
        node: Option<String>,
    },

    /// Show resource consumption
    Cost {
        /// Milestone ID (omit for everything starting by the project end)
        node: Option<String>,

        /// Include everything the milestone depends on
        #[arg(long, short)]
        recursive: bool,

        /// Only milestones starting on or before this date
        #[arg(long)]
        until: Option<String>,
    },

    /// Show resource conflicts
    Conflicts {
        /// Milestone ID (omit for every deficient milestone)
        node: Option<String>,
    },

    /// Show a milestone's level in the graph
    Level {
        /// Milestone ID
        node: String,
    },

    /// List the milestones a milestone leads to (or depends on with --back)
    Neighbours {
        /// Milestone ID
        node: String,

        /// Follow dependencies backwards
        #[arg(long)]
        back: bool,

        /// Include indirect neighbours
        #[arg(long, short)]
        recursive: bool,
    },

    /// Show project status overview
    Status,
}

/// Installs the stderr log subscriber. `PERT_LOG` overrides the level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // A subscriber may already be installed when running under a test harness
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load()?.global.default_format.into(),
    };
    let output = Output::new(format);
    let project = cli.project.as_deref();

    tracing::debug!(?format, project, "pert starting");

    match cli.command {
        Commands::Init { path } => {
            let workspace = Workspace::init(&path)?;
            output.success(&format!(
                "Initialized pert workspace at {}",
                workspace.root().display()
            ));
        }

        Commands::Project(cmd) => project_cmd::run(cmd, &output, project)?,
        Commands::Node(cmd) => node::run(cmd, &output, project)?,
        Commands::Edge(cmd) => edge::run(cmd, &output, project)?,
        Commands::Resource(cmd) => resource::run(cmd, &output, project)?,

        Commands::Bounds { node } => query::bounds(&output, project, node.as_deref())?,
        Commands::Cost {
            node,
            recursive,
            until,
        } => query::cost(&output, project, node.as_deref(), recursive, until.as_deref())?,
        Commands::Conflicts { node } => query::conflicts(&output, project, node.as_deref())?,
        Commands::Level { node } => query::level(&output, project, &node)?,
        Commands::Neighbours {
            node,
            back,
            recursive,
        } => query::neighbours(&output, project, &node, back, recursive)?,
        Commands::Status => query::status(&output, project)?,
    }

    Ok(())
}
