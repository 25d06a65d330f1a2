//! `sshstat` CLI - agentless telemetry for remote Linux hosts
//!
//! Provides a live single-host report, a one-shot poll of every configured
//! target, and an HTTP endpoint exposing per-target gauges.

mod cli;
mod commands;
mod error;
mod format;
mod util;

use std::io::IsTerminal;

use clap::Parser;
use cli::{Cli, GlobalOpts};
use sshstat_core::tracing::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let opts = GlobalOpts {
        config: cli.config.as_deref(),
        quiet: cli.quiet,
        color: !cli.no_color && std::io::stdout().is_terminal(),
    };

    if let Err(e) = commands::dispatch(opts, cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        TracingLevel::Error
    } else {
        TracingLevel::from_verbosity(cli.verbose)
    };
    let mut config = TracingConfig::new()
        .with_level(level)
        .with_ansi(!cli.no_color && std::io::stderr().is_terminal());
    if let Some(filter) = &cli.log_filter {
        config = config.with_filter(filter.clone());
    }
    if let Err(e) = init_tracing(&config) {
        eprintln!("Warning: {e}");
    }
}
