//! Live single-host report.

use std::io::Write as _;
use std::path::Path;
use std::time::Duration;

use sshstat_core::config::parse_target_spec;
use sshstat_core::models::TargetId;
use sshstat_core::monitoring::{PollOutcome, Poller};
use tokio::time::MissedTickBehavior;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::format::{Style, render_failure, render_report};
use crate::util::{build_poller, default_user, load_settings, require_identity, runtime};

/// Gap between the baseline and the reported reading for `--once`
const BASELINE_GAP: Duration = Duration::from_secs(1);

/// Show command handler
///
/// Configuration problems (bad target, missing key) are fatal before the
/// first poll. Poll failures are drawn in place of the report and the loop
/// continues until Ctrl-C.
pub fn cmd_show(
    opts: GlobalOpts<'_>,
    target: &str,
    identity: Option<&Path>,
    interval: u64,
    once: bool,
) -> Result<(), CliError> {
    let (_, settings) = load_settings(opts.config)?;
    let target = parse_target_spec(target, &default_user())?;
    let key = require_identity(identity, &settings.poll)?;
    let poller = build_poller(vec![target], &settings.poll, Some(key));
    let style = Style::new(opts.color);

    let runtime = runtime()?;
    if once {
        runtime.block_on(show_once(&poller, style))
    } else {
        runtime.block_on(show_loop(&poller, style, Duration::from_secs(interval)))
    }
}

/// Prints one report with a CPU breakdown over [`BASELINE_GAP`]
async fn show_once(poller: &Poller, style: Style) -> Result<(), CliError> {
    let id = TargetId(0);
    poller.poll(id).await.result?;
    tokio::time::sleep(BASELINE_GAP).await;
    let snapshot = poller.poll(id).await.result?;
    print!("{}", render_report(&snapshot, style));
    Ok(())
}

async fn show_loop(poller: &Poller, style: Style, interval: Duration) -> Result<(), CliError> {
    let id = TargetId(0);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
        let outcome = tokio::select! {
            outcome = poller.poll(id) => outcome,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };
        draw(&outcome, style)?;
    }
}

fn draw(outcome: &PollOutcome, style: Style) -> Result<(), CliError> {
    let body = match &outcome.result {
        Ok(snapshot) => render_report(snapshot, style),
        Err(e) => {
            tracing::debug!(target_name = %outcome.target, error = %e, "Poll failed");
            render_failure(&outcome.target, e, style)
        }
    };
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}{body}", style.clear())?;
    stdout.flush()?;
    Ok(())
}
