//! CLI argument parsing types using `clap`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Agentless telemetry for remote Linux hosts over SSH
#[derive(Parser)]
#[command(name = "sshstat")]
#[command(author, version, about = "Agentless telemetry for remote Linux hosts over SSH")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log filter directives (e.g. `sshstat_core=debug`), overrides -v
    #[arg(long, global = true, env = "SSHSTAT_LOG", value_name = "FILTER")]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show a live report for one host
    #[command(about = "Poll one host repeatedly and redraw its report")]
    Show {
        /// Target as `[user@]host[:port]`
        target: String,

        /// Private key file (defaults to ~/.ssh/id_ed25519, id_ecdsa, id_rsa)
        #[arg(short, long, value_name = "KEY")]
        identity: Option<PathBuf>,

        /// Seconds between refreshes
        #[arg(
            short = 'n',
            long,
            default_value_t = 5,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval: u64,

        /// Print one report and exit
        #[arg(long)]
        once: bool,
    },

    /// Poll every configured target once
    #[command(about = "Poll every target in the target list once and print the results")]
    Poll {
        /// Target list file (TOML or plain `user host port` lines)
        #[arg(short, long, value_name = "FILE")]
        targets: Option<PathBuf>,

        /// Default private key for targets without their own
        #[arg(short, long, value_name = "KEY")]
        identity: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text", value_enum)]
        format: OutputFormat,
    },

    /// Serve metrics over HTTP
    #[command(about = "Serve per-target gauges for Prometheus scrapes")]
    Serve {
        /// Address to bind (defaults to the configured one, 0.0.0.0:8090)
        #[arg(short, long, value_name = "ADDR")]
        listen: Option<SocketAddr>,

        /// Target list file (TOML or plain `user host port` lines)
        #[arg(short, long, value_name = "FILE")]
        targets: Option<PathBuf>,

        /// Default private key for targets without their own
        #[arg(short, long, value_name = "KEY")]
        identity: Option<PathBuf>,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Output format for `poll`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable reports
    Text,
    /// One JSON document with every outcome
    Json,
}

/// Shared global options passed to command handlers
#[derive(Debug, Clone, Copy)]
pub struct GlobalOpts<'a> {
    /// Configuration directory override
    pub config: Option<&'a std::path::Path>,
    /// Suppress non-error output
    pub quiet: bool,
    /// Allow ANSI styling
    pub color: bool,
}
