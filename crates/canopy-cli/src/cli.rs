use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl LogLevel {
    /// Parse a level name as found in config files and `CANOPY_LOG_LEVEL`
    pub fn parse(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true).ok()
    }
}

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "canopy - manage category groups and their nested category trees")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses config file value or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/canopy/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path (overrides config file and CANOPY_DB_PATH)
    #[arg(long = "db", global = true)]
    pub db_path: Option<PathBuf>,

    /// Site template root (overrides config file and CANOPY_TEMPLATES_PATH)
    #[arg(long, global = true)]
    pub templates: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database or apply pending migrations
    Init,

    /// Category group management
    #[command(subcommand)]
    Group(GroupCommands),

    /// Category management
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Tree utilities
    #[command(subcommand)]
    Tree(TreeCommands),
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// List every group
    List,

    /// Show one group with its locales
    Show {
        handle: String,
    },

    /// Create or update a group from a TOML or JSON file
    ///
    /// A file without an `id` updates the group with the same handle, if any.
    Save {
        #[arg(long)]
        file: PathBuf,
    },

    /// Delete a group with its categories, tree and field layout
    Delete {
        handle: String,
    },

    /// Groups a user may edit
    Editable {
        #[arg(long)]
        user: i64,
    },

    /// Check that the group's template exists under the template root
    CheckTemplate {
        handle: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a category
    Create {
        /// Handle of the owning group
        #[arg(long)]
        group: String,

        #[arg(long)]
        title: String,

        /// Locale (defaults to the group's first locale)
        #[arg(long)]
        locale: Option<String>,

        /// Parent category ID
        #[arg(long)]
        parent: Option<i64>,

        /// Slug (derived from the title when omitted)
        #[arg(long)]
        slug: Option<String>,
    },

    /// Move a category under another one or to the top level
    Move(MoveArgs),

    /// Show a category
    Show {
        id: i64,

        #[arg(long)]
        locale: Option<String>,
    },

    /// Delete categories with everything below them
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Print a group's tree
    Tree {
        #[arg(long)]
        group: String,
    },
}

#[derive(Args)]
pub struct MoveArgs {
    /// Category to move
    pub id: i64,

    /// New parent category ID
    #[arg(long, conflicts_with = "root", required_unless_present = "root")]
    pub parent: Option<i64>,

    /// Move to the top level
    #[arg(long)]
    pub root: bool,
}

#[derive(Subcommand)]
pub enum TreeCommands {
    /// Complete a selection of categories with their missing ancestors
    FillGaps {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}
