//! `gtd` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments, load configuration, start logging and open storage.
//! - Dispatch to the core services and print their results.
//! - Report failures on stderr with a non-zero exit code.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gtd_core::{flush_logging, init_logging, open_db, AppConfig};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gtd")]
#[command(about = "Getting Things Done organizer", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Config file (default: <config dir>/gtd/config.toml)
    #[arg(long, global = true, env = "GTD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the database and logs
    #[arg(long, global = true, env = "GTD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage contexts (where or how an action can be done)
    #[command(subcommand)]
    Context(LabelCommands),

    /// Manage categories for projects and reference items
    #[command(subcommand)]
    Category(LabelCommands),

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Manage action items
    #[command(subcommand)]
    Action(ActionCommands),

    /// Manage reference items
    #[command(subcommand, name = "ref")]
    Reference(ReferenceCommands),

    /// Inspect and maintain the trash
    #[command(subcommand)]
    Trash(TrashCommands),

    /// List completed projects and action items
    Archive {
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Full-text search over every item
    Search {
        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,
        /// Restrict to one kind: context, category, project, action_item, reference_item
        #[arg(short, long, value_parser = commands::parse_kind)]
        kind: Option<gtd_core::ItemKind>,
        /// Maximum number of hits (default from config)
        #[arg(short, long)]
        limit: Option<u32>,
        /// Pass the query to FTS5 unescaped
        #[arg(long)]
        raw: bool,
    },

    /// Show open action items grouped by project or context
    Outline {
        /// Grouping: project (default) or context
        #[arg(long, default_value = "project", value_parser = ["project", "context"])]
        by: String,
    },

    /// Rebuild the full-text search index
    Reindex,
}

#[derive(Subcommand)]
enum LabelCommands {
    /// Add a label
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List labels
    List {
        /// Include trashed labels
        #[arg(long)]
        all: bool,
    },
    /// Rename a label (by id or name)
    Rename { label: String, name: String },
    /// Replace a label's description
    Describe { label: String, description: String },
    /// Move a label to the trash
    Trash { label: String },
    /// Restore a trashed label by id
    Restore { id: String },
}

#[derive(Args)]
struct ProjectFields {
    /// Description
    #[arg(short, long)]
    description: Option<String>,
    /// Category id or name
    #[arg(long, conflicts_with = "no_category")]
    category: Option<String>,
    /// Clear the category
    #[arg(long)]
    no_category: bool,
    /// Due date, YYYY-MM-DD
    #[arg(long, value_parser = commands::parse_due, conflicts_with = "no_due")]
    due: Option<i64>,
    /// Clear the due date
    #[arg(long)]
    no_due: bool,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Add a project
    Add {
        name: String,
        #[command(flatten)]
        fields: ProjectFields,
    },
    /// List projects
    List {
        /// Only completed projects
        #[arg(long)]
        done: bool,
        /// Open and completed projects
        #[arg(long, conflicts_with = "done")]
        all: bool,
        /// Category id or name
        #[arg(long)]
        category: Option<String>,
    },
    /// Show one project with its open action items
    Show { project: String },
    /// Edit a project
    Edit {
        project: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ProjectFields,
    },
    /// Complete a project and its open action items
    Done { project: String },
    /// Reopen a project and the items completed with it
    Reopen { project: String },
    /// Trash a project and its action items
    Trash { project: String },
    /// Restore a trashed project by id
    Restore { id: String },
}

#[derive(Args)]
struct ActionFields {
    /// Free-form notes
    #[arg(long)]
    notes: Option<String>,
    /// Project id or name
    #[arg(short, long)]
    project: Option<String>,
    /// Context id or name
    #[arg(short, long)]
    context: Option<String>,
    /// Due date, YYYY-MM-DD
    #[arg(long, value_parser = commands::parse_due, conflicts_with = "no_due")]
    due: Option<i64>,
    /// Clear the due date
    #[arg(long)]
    no_due: bool,
}

#[derive(Subcommand)]
enum ActionCommands {
    /// Capture an action item
    Add {
        description: String,
        #[command(flatten)]
        fields: ActionFields,
    },
    /// List action items (default: next actions)
    List {
        /// Only unfiled items
        #[arg(long, conflicts_with_all = ["project", "context"])]
        inbox: bool,
        /// Project id or name
        #[arg(short, long)]
        project: Option<String>,
        /// Context id or name
        #[arg(short, long)]
        context: Option<String>,
        /// Completed items instead of open ones
        #[arg(long)]
        done: bool,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show one action item
    Show { id: String },
    /// Edit an action item
    Edit {
        id: String,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        #[command(flatten)]
        fields: ActionFields,
    },
    /// File an item under a project and/or context; omitted links are cleared
    Move {
        id: String,
        #[arg(short, long)]
        project: Option<String>,
        #[arg(short, long)]
        context: Option<String>,
    },
    /// Mark an action item done
    Done { id: String },
    /// Reopen a completed action item
    Reopen { id: String },
    /// Move an action item to the trash
    Trash { id: String },
    /// Restore a trashed action item
    Restore { id: String },
}

#[derive(Subcommand)]
enum ReferenceCommands {
    /// File a reference item
    Add {
        title: String,
        /// Markdown body
        #[arg(short, long, default_value = "")]
        body: String,
        #[arg(short, long)]
        url: Option<String>,
        /// Category id or name
        #[arg(long)]
        category: Option<String>,
        /// Tag, repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// List reference items
    List {
        #[arg(short, long)]
        tag: Option<String>,
        /// Category id or name
        #[arg(long)]
        category: Option<String>,
        #[arg(short, long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Show one reference item
    Show { id: String },
    /// Edit a reference item
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        body: Option<String>,
        #[arg(short, long, conflicts_with = "no_url")]
        url: Option<String>,
        #[arg(long)]
        no_url: bool,
        #[arg(long, conflicts_with = "no_category")]
        category: Option<String>,
        #[arg(long)]
        no_category: bool,
    },
    /// Replace the tag set of a reference item
    Tag { id: String, tags: Vec<String> },
    /// List every known tag
    Tags,
    /// Move a reference item to the trash
    Trash { id: String },
    /// Restore a trashed reference item
    Restore { id: String },
}

#[derive(Subcommand)]
enum TrashCommands {
    /// List trashed items, newest first
    List,
    /// Restore one trashed item
    Restore {
        #[arg(value_parser = commands::parse_kind)]
        kind: gtd_core::ItemKind,
        id: String,
    },
    /// Permanently delete one trashed item
    Purge {
        #[arg(value_parser = commands::parse_kind)]
        kind: gtd_core::ItemKind,
        id: String,
    },
    /// Permanently delete everything in the trash
    Empty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = run(cli);
    if let Err(err) = &result {
        error!("event=cli_command module=cli status=error error={err:#}");
    }
    flush_logging();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    config
        .ensure_data_dir()
        .context("failed to create data directory")?;
    init_logging(&config.log_level, &config.resolved_log_dir())
        .context("failed to initialize logging")?;

    let db_path = config.db_path();
    let conn = open_db(&db_path)
        .with_context(|| format!("failed to open database `{}`", db_path.display()))?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        gtd_core::core_version()
    );

    match cli.command {
        Commands::Context(command) => commands::label(&conn, gtd_core::LabelKind::Context, command),
        Commands::Category(command) => {
            commands::label(&conn, gtd_core::LabelKind::Category, command)
        }
        Commands::Project(command) => commands::project(&conn, command),
        Commands::Action(command) => commands::action(&conn, command),
        Commands::Reference(command) => commands::reference(&conn, command),
        Commands::Trash(command) => commands::trash(&conn, command),
        Commands::Archive { limit } => commands::archive(&conn, limit),
        Commands::Search {
            terms,
            kind,
            limit,
            raw,
        } => commands::search(
            &db_path,
            terms.join(" "),
            kind,
            limit.unwrap_or(config.search_limit),
            raw,
        ),
        Commands::Outline { by } => commands::outline(&conn, &by),
        Commands::Reindex => commands::reindex(&conn),
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data_dir = data_dir;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }
    config.normalized().context("invalid configuration override")
}
