//! Log lines and session summaries

use rangelink_protocol::{GapReport, MonitorSummary, Observation, Sample};
use std::time::Duration;

/// Format a millisecond delay in human-readable form
pub fn format_millis(ms: f64) -> String {
    let magnitude = ms.abs();
    if magnitude >= 1_000.0 {
        format!("{:.2}s", ms / 1_000.0)
    } else if magnitude >= 1.0 {
        format!("{:.2}ms", ms)
    } else {
        format!("{:.0}µs", ms * 1_000.0)
    }
}

/// Format an uptime as `H:MM:SS`
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    format!("{}:{:02}:{:02}", total / 3600, total / 60 % 60, total % 60)
}

/// Log what a monitor made of one sample
///
/// `path` names the hop the delay was measured over, e.g. `sender -> relay`.
pub fn log_observation(path: &str, sample: &Sample, observation: &Observation) {
    match observation {
        Observation::Corrupt { expected, actual } => {
            tracing::warn!(
                "Invalid sample on {}: integrity {:#010x} != {:#010x} ({})",
                path,
                actual,
                expected,
                sample
            );
        }
        Observation::Calibrating {
            delay_ms,
            collected,
            needed,
            gap,
            ..
        } => {
            tracing::debug!(
                "Calibrating {} {}/{}: {} delay {}",
                path,
                collected,
                needed,
                sample.kind,
                format_millis(*delay_ms)
            );
            if let Some(gap) = gap {
                log_gap(path, gap);
            }
        }
        Observation::Calibrated { offset, gap, .. } => {
            tracing::info!("Clock offset {}: {}", path, format_millis(*offset));
            if let Some(gap) = gap {
                log_gap(path, gap);
            }
        }
        Observation::Sync { delay_ms, offset } => {
            tracing::debug!(
                "Sync on {}: delay {} (offset {})",
                path,
                format_millis(*delay_ms),
                format_millis(*offset)
            );
        }
        Observation::Data {
            sequence,
            gap,
            delay,
        } => {
            if delay.anomaly {
                tracing::warn!(
                    "High delay {}: {} (raw {}), seq={}",
                    path,
                    format_millis(delay.adjusted),
                    format_millis(delay.raw),
                    sequence
                );
            } else {
                tracing::debug!(
                    "Data on {}: seq={} distance={} delay {}",
                    path,
                    sequence,
                    sample.distance,
                    format_millis(delay.adjusted)
                );
            }
            log_gap(path, gap);
        }
    }
}

fn log_gap(path: &str, gap: &GapReport) {
    match gap {
        GapReport::First | GapReport::InOrder => {}
        GapReport::Loss { from, to, missing } => {
            tracing::warn!(
                "Sequence number skipped on {}: {} -> {} ({} lost)",
                path,
                from,
                to,
                missing
            );
        }
        GapReport::Reordered { from, to, behind } => {
            tracing::warn!(
                "Sequence out of order on {}: {} -> {} ({} behind)",
                path,
                from,
                to,
                behind
            );
        }
        GapReport::Duplicate { sequence } => {
            tracing::warn!("Duplicate sequence on {}: {}", path, sequence);
        }
    }
}

/// Log a monitor's session summary
pub fn log_monitor_summary(role: &str, summary: &MonitorSummary, uptime: Duration) {
    let offset = summary
        .offset_ms
        .map_or_else(|| "uncalibrated".to_string(), format_millis);
    let max_delay = summary
        .max_adjusted_delay_ms
        .map_or_else(|| "N/A".to_string(), format_millis);

    tracing::info!(
        "{} summary after {}: {} data / {} sync samples, {} lost, {} reordered, {} duplicate, {} corrupt",
        role,
        format_uptime(uptime),
        summary.tracker.observed,
        summary.sync_samples,
        summary.tracker.lost,
        summary.tracker.reordered,
        summary.tracker.duplicates,
        summary.corrupt
    );
    tracing::info!(
        "{} delay: offset {}, {} of {} checks over threshold, max {}, {} recalibrations",
        role,
        offset,
        summary.delay_anomalies,
        summary.delay_checks,
        max_delay,
        summary.recalibrations
    );
}
