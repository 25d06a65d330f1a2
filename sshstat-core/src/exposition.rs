//! Gauge samples for the metrics endpoint
//!
//! Every poll outcome becomes a handful of [`MetricSample`]s labelled with
//! the target's display name. [`render_text`] writes them in the text
//! exposition format scraped by Prometheus.

use std::fmt::Write as _;

use crate::monitoring::{PollBatch, PollOutcome};
use crate::models::StatsSnapshot;

/// A gauge family: name and help text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gauge {
    /// Metric name
    pub name: &'static str,
    /// `# HELP` text
    pub help: &'static str,
}

/// Idle CPU share since the previous poll
pub const CPU_IDLE: Gauge = Gauge {
    name: "sshstat_cpu_idle_percent",
    help: "CPU idle percentage since the previous poll",
};
/// User CPU share since the previous poll
pub const CPU_USER: Gauge = Gauge {
    name: "sshstat_cpu_user_percent",
    help: "CPU user percentage since the previous poll",
};
/// Free memory
pub const MEMORY_FREE: Gauge = Gauge {
    name: "sshstat_memory_free_bytes",
    help: "Free memory in bytes",
};
/// Memory not free, buffered or cached
pub const MEMORY_USED: Gauge = Gauge {
    name: "sshstat_memory_used_bytes",
    help: "Used memory in bytes (total minus free, buffers and cache)",
};
/// 1-minute load average
pub const LOAD1: Gauge = Gauge {
    name: "sshstat_load1",
    help: "1-minute load average",
};
/// Free swap
pub const SWAP_FREE: Gauge = Gauge {
    name: "sshstat_swap_free_bytes",
    help: "Free swap in bytes",
};
/// Seconds since boot
pub const UPTIME: Gauge = Gauge {
    name: "sshstat_uptime_seconds",
    help: "Seconds since the target booted",
};
/// Poll success flag
pub const UP: Gauge = Gauge {
    name: "sshstat_up",
    help: "Whether the last poll of the target succeeded",
};

/// Families in exposition order
pub const GAUGES: [Gauge; 8] = [
    UP, CPU_IDLE, CPU_USER, MEMORY_FREE, MEMORY_USED, LOAD1, SWAP_FREE, UPTIME,
];

/// One observation of one gauge for one target
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Gauge family
    pub gauge: Gauge,
    /// Target display name, used as the `target` label
    pub target: String,
    /// Observed value
    pub value: f64,
}

impl MetricSample {
    fn new(gauge: Gauge, target: &str, value: f64) -> Self {
        Self {
            gauge,
            target: target.to_string(),
            value,
        }
    }
}

/// Samples for a successful snapshot
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn snapshot_samples(snapshot: &StatsSnapshot) -> Vec<MetricSample> {
    let target = snapshot.target.as_str();
    vec![
        MetricSample::new(UP, target, 1.0),
        MetricSample::new(CPU_IDLE, target, snapshot.cpu.idle),
        MetricSample::new(CPU_USER, target, snapshot.cpu.user),
        MetricSample::new(MEMORY_FREE, target, snapshot.memory.free as f64),
        MetricSample::new(MEMORY_USED, target, snapshot.memory.used() as f64),
        MetricSample::new(LOAD1, target, snapshot.load.one),
        MetricSample::new(SWAP_FREE, target, snapshot.memory.swap_free as f64),
        MetricSample::new(UPTIME, target, snapshot.uptime_secs),
    ]
}

/// Samples for one outcome; a failed poll only reports `sshstat_up 0`
#[must_use]
pub fn outcome_samples(outcome: &PollOutcome) -> Vec<MetricSample> {
    match &outcome.result {
        Ok(snapshot) => snapshot_samples(snapshot),
        Err(_) => vec![MetricSample::new(UP, &outcome.target, 0.0)],
    }
}

/// Samples for a whole batch
#[must_use]
pub fn batch_samples(batch: &PollBatch) -> Vec<MetricSample> {
    batch.outcomes.iter().flat_map(outcome_samples).collect()
}

/// Renders samples in the text exposition format, grouped by gauge
#[must_use]
pub fn render_text(samples: &[MetricSample]) -> String {
    let mut out = String::new();
    for gauge in GAUGES {
        let mut family = samples.iter().filter(|s| s.gauge == gauge).peekable();
        if family.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "# HELP {} {}", gauge.name, gauge.help);
        let _ = writeln!(out, "# TYPE {} gauge", gauge.name);
        for sample in family {
            let _ = writeln!(
                out,
                "{}{{target=\"{}\"}} {}",
                gauge.name,
                escape_label(&sample.target),
                format_value(sample.value)
            );
        }
    }
    out
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value.is_sign_positive() { '+' } else { '-' };
        format!("{sign}Inf")
    } else {
        value.to_string()
    }
}
