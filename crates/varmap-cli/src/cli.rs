//! CLI argument definitions for `varmap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "varmap",
    version,
    about = "Clinical variable mapping - merge uploads, pick variables, export",
    long_about = "Build a variable mapping session from the shipped base table.\n\n\
                  Uploads are merged on top of the base table without modifying it;\n\
                  selections refer to rows by content-derived key and survive\n\
                  re-uploads. Selected rows are exported as CSV."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the Organ System / Group / Variable tree.
    Tree(SessionArgs),

    /// Merge upload files and report what changed.
    Upload(SessionArgs),

    /// Export the selected rows as CSV.
    Export(ExportArgs),

    /// Talk to the optional mapping backend.
    #[command(subcommand)]
    Remote(RemoteCommand),
}

#[derive(Args, Clone)]
pub struct SessionArgs {
    /// Base mapping table (CSV).
    #[arg(long = "base", value_name = "CSV", env = "VARMAP_BASE_TABLE")]
    pub base: PathBuf,

    /// Upload file to merge; repeat to apply several in order.
    #[arg(long = "upload", value_name = "CSV")]
    pub uploads: Vec<PathBuf>,

    /// Selection reference (comma-separated row keys) to start from.
    #[arg(long = "select", value_name = "KEYS")]
    pub select: Option<String>,

    /// How uploaded rows are matched against existing rows.
    #[arg(long = "match-on", value_enum, default_value = "exact")]
    pub match_on: MatchOnArg,

    /// Column of the natural key; repeat for several (default: Variable, Organ System, Group).
    #[arg(long = "natural-key", value_name = "COLUMN")]
    pub natural_key: Vec<String>,

    /// Add a variable by hand, e.g. "Variable=Creatinine;Unit=mg/dL".
    #[arg(long = "add-variable", value_name = "FIELDS")]
    pub add_variable: Vec<String>,

    /// Project name used in export file names.
    #[arg(long = "project", value_name = "NAME")]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Select every row of the master table.
    #[arg(long = "select-all")]
    pub select_all: bool,

    /// Directory for the export file (default: current directory).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the export preview without writing a file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum RemoteCommand {
    /// Check that the backend is reachable.
    Health,

    /// List the rows stored for a project.
    Pull {
        #[arg(long = "project-id", value_name = "ID")]
        project_id: String,
    },

    /// Send the session's selected rows.
    Push {
        #[arg(long = "project-id", value_name = "ID")]
        project_id: String,

        #[command(flatten)]
        session: SessionArgs,

        /// Ask the backend what it would change without storing anything.
        #[arg(long = "dry-run")]
        dry_run: bool,
    },

    /// Delete rows by key.
    Delete {
        #[arg(long = "project-id", value_name = "ID")]
        project_id: String,

        #[arg(long = "row-key", value_name = "KEY", required = true)]
        row_keys: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MatchOnArg {
    Exact,
    NaturalKey,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
