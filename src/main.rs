use anyhow::Result;
use clap::Parser;

use lrc_cli::cli::{Cli, Command};
use lrc_cli::commands;
use lrc_cli::logging::{Logger, init_subscriber, log_file_path};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let log_file = log_file_path(args.command_name());
    init_subscriber(args.verbose, args.command_name(), log_file.as_deref());
    let log = Logger::new(log_file);

    match &args.command {
        Command::Build(opts) => commands::build::run(&args.global, opts, &log),
        Command::Plan(opts) => commands::plan::run(&args.global, opts, &log),
        Command::Trust(opts) => commands::trust::run(&args.global, opts, &log),
        Command::Version => commands::version::run(),
    }
}
