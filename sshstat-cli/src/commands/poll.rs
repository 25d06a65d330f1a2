//! One-shot poll of every configured target.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use sshstat_core::models::StatsSnapshot;
use sshstat_core::monitoring::{PollBatch, PollOutcome};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::format::{Style, render_failure, render_report};
use crate::util::{build_poller, load_settings, load_target_list, optional_identity, runtime};

/// JSON view of one outcome
#[derive(Debug, Serialize)]
struct OutcomeView<'a> {
    target: &'a str,
    ok: bool,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<&'a StatsSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a PollOutcome> for OutcomeView<'a> {
    fn from(outcome: &'a PollOutcome) -> Self {
        let error = outcome.error();
        Self {
            target: &outcome.target,
            ok: outcome.is_success(),
            elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            snapshot: outcome.snapshot(),
            error_kind: error.map(|e| e.kind().to_string()),
            error: error.map(ToString::to_string),
        }
    }
}

/// Poll command handler
///
/// Exits with a connection failure only when every target failed.
pub fn cmd_poll(
    opts: GlobalOpts<'_>,
    targets: Option<&Path>,
    identity: Option<&Path>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let (manager, settings) = load_settings(opts.config)?;
    let list = load_target_list(&manager, &settings, targets)?;
    let key = optional_identity(identity, &settings.poll)?;
    let poller = build_poller(list, &settings.poll, key);

    let batch = runtime()?.block_on(poller.poll_all());

    match format {
        OutputFormat::Text => print!("{}", render_batch_text(&batch, Style::new(opts.color))),
        OutputFormat::Json => println!("{}", render_batch_json(&batch)?),
    }

    if !opts.quiet && format == OutputFormat::Text {
        eprintln!(
            "{} of {} targets polled successfully in {:.1}s",
            batch.succeeded(),
            batch.total(),
            batch.elapsed.as_secs_f64()
        );
    }

    if batch.all_failed() {
        return Err(CliError::Connection(format!(
            "all {} targets failed",
            batch.total()
        )));
    }
    Ok(())
}

fn render_batch_text(batch: &PollBatch, style: Style) -> String {
    let mut out = String::new();
    for outcome in &batch.outcomes {
        match &outcome.result {
            Ok(snapshot) => {
                let _ = writeln!(out, "== {} ==", style.value(&outcome.target));
                out.push_str(&render_report(snapshot, style));
            }
            Err(e) => out.push_str(&render_failure(&outcome.target, e, style)),
        }
    }
    out
}

fn render_batch_json(batch: &PollBatch) -> Result<String, CliError> {
    let views: Vec<OutcomeView<'_>> = batch.outcomes.iter().map(OutcomeView::from).collect();
    serde_json::to_string_pretty(&views)
        .map_err(|e| CliError::Output(format!("Failed to serialize results: {e}")))
}
