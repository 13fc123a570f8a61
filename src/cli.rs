use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI entry point for the schema compiler.
#[derive(Parser, Debug)]
#[command(
    name = "lrc",
    about = "Compile declarative schemas into file and directory trees",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// Name of the subcommand, used for the log file name.
    #[must_use]
    pub const fn command_name(&self) -> &'static str {
        match self.command {
            Command::Build(_) => "build",
            Command::Plan(_) => "plan",
            Command::Trust(_) => "trust",
            Command::Version => "version",
        }
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Settings file (default: $XDG_CONFIG_HOME/lrc/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a schema and build the tree it describes
    Build(BuildOpts),
    /// Compile a schema and print the build plan without touching storage
    Plan(PlanOpts),
    /// Show the effective template allow-list and where it came from
    Trust(TrustOpts),
    /// Print version information
    Version,
}

/// Options for the `build` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct BuildOpts {
    /// Schema file to compile
    pub schema: PathBuf,

    /// Output directory (default: derived from the project name)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Replace existing files whose content differs
    #[arg(long)]
    pub force: bool,

    /// Require a valid signature on every included schema
    #[arg(long)]
    pub require_signed: bool,

    /// Run the configured audit command after building
    #[arg(long)]
    pub audit: bool,

    /// Audit config file (default: from settings)
    #[arg(long, value_name = "PATH")]
    pub audit_config: Option<PathBuf>,
}

/// Output format for `plan`.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanFormat {
    /// Human-readable listing
    #[default]
    Text,
    /// Pretty JSON
    Json,
}

/// Options for the `plan` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct PlanOpts {
    /// Schema file to compile
    pub schema: PathBuf,

    /// Output directory the plan is resolved against
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = PlanFormat::Text)]
    pub format: PlanFormat,
}

/// Options for the `trust` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct TrustOpts {
    /// Schema directory whose policy files are consulted (default: current directory)
    pub dir: Option<PathBuf>,
}
