//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "autoshift")]
#[command(about = "Scrape, merge and publish Borderlands SHiFT codes", long_about = None)]
#[command(version, args_override_self = true)]
pub(crate) struct Cli {
    /// Only show warnings and errors (suppress normal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (adds module:line to each message)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write log output to a file (ANSI codes stripped)
    #[arg(long, global = true)]
    pub logfile: Option<PathBuf>,

    // `scrape` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Location of the record file.
#[derive(Args, Clone, Default)]
pub(crate) struct FileArgs {
    /// Path of the shiftcodes.json file (default: data/shiftcodes.json)
    #[arg(short, long, env = "SHIFTCODESJSONPATH")]
    pub file: Option<PathBuf>,
}

/// GitHub repository the record file is published to.
#[derive(Args, Clone, Default)]
pub(crate) struct GithubArgs {
    /// Repository owner
    #[arg(long, env = "GITHUB_USER")]
    pub user: Option<String>,

    /// Repository name
    #[arg(long, env = "GITHUB_REPO")]
    pub repo: Option<String>,

    /// Personal access token with Contents: Read and write
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args, Clone, Default)]
pub(crate) struct ScrapeArgs {
    #[command(flatten)]
    pub file: FileArgs,

    #[command(flatten)]
    pub github: GithubArgs,

    /// Re-run every N minutes instead of exiting after one pass [env: SCHEDULE]
    #[arg(long, value_name = "MINUTES")]
    pub schedule: Option<u64>,

    /// Directory of extra source definitions (*.yaml), merged over the built-ins
    #[arg(long)]
    pub sources_dir: Option<PathBuf>,

    /// Only scrape these source ids (e.g., mentalmars-bl4,polygon-bl4)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Scrape and merge, but neither write the file nor publish it
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args, Clone, Default)]
pub(crate) struct MarkExpiredArgs {
    /// Codes to act on, comma-separated. Without codes every record whose
    /// expiry has passed is marked expired.
    pub codes: Vec<String>,

    /// Timestamp to use instead of now. In bulk mode it is the comparison
    /// time; with codes it is written to their expires field only.
    #[arg(long, value_name = "TIMESTAMP")]
    pub expires: Option<String>,

    #[command(flatten)]
    pub file: FileArgs,

    #[command(flatten)]
    pub github: GithubArgs,

    /// Show what would change without writing or publishing
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Scrape every configured source, merge into the record file and publish it
    Scrape(ScrapeArgs),

    /// Mark codes expired, by timestamp or by name
    MarkExpired(MarkExpiredArgs),

    /// List configured sources and their sections
    Sources {
        /// Directory of extra source definitions (*.yaml)
        #[arg(long)]
        sources_dir: Option<PathBuf>,
    },

    /// Show settings and where they come from
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show resolved settings and their sources
    Show,

    /// Print the settings file path
    Path,
}
