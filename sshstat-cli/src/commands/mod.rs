//! Command handler modules for the CLI.

mod completions;
mod poll;
mod serve;
mod show;

use crate::cli::{Commands, GlobalOpts};
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(opts: GlobalOpts<'_>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Show {
            target,
            identity,
            interval,
            once,
        } => show::cmd_show(opts, &target, identity.as_deref(), interval, once),
        Commands::Poll {
            targets,
            identity,
            format,
        } => poll::cmd_poll(opts, targets.as_deref(), identity.as_deref(), format),
        Commands::Serve {
            listen,
            targets,
            identity,
        } => serve::cmd_serve(opts, listen, targets.as_deref(), identity.as_deref()),
        Commands::Completions { shell } => completions::cmd_completions(shell),
    }
}
