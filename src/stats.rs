//! Night statistics
//!
//! Reduces a night's segment sequence into the summary metrics written to CSV:
//! - Total sleep and per-stage durations
//! - Sleep onset latency
//! - Wake after sleep onset and awakening count
//! - Sleep efficiency
//! - Hypnogram

use crate::types::{Night, Segment, SleepStage, StageDurations, SummaryRecord};

/// Statistics engine for resampled nights
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Summarize a night from its segments.
    ///
    /// A night with no sleep segment still yields a record, with zeroed sleep
    /// metrics.
    pub fn summarize(night: &Night, segments: &[Segment]) -> SummaryRecord {
        let stage_seconds = compute_stage_durations(segments);
        let total_sleep_seconds = stage_seconds.light + stage_seconds.deep + stage_seconds.rem;

        let onset_idx = segments.iter().position(|s| s.stage.is_sleep());
        let offset_idx = segments.iter().rposition(|s| s.stage.is_sleep());

        let sleep_onset = onset_idx.map(|i| segments[i].start);
        let sleep_offset = offset_idx.map(|i| segments[i].end);
        let onset_latency_seconds = sleep_onset
            .map(|onset| (onset - night.window.start).num_seconds().max(0))
            .unwrap_or(0);

        let (waso_seconds, awakenings) = match (onset_idx, offset_idx) {
            (Some(onset), Some(offset)) => compute_wake_after_onset(&segments[onset..=offset]),
            _ => (0, 0),
        };

        let recorded = night.recorded_span();

        SummaryRecord {
            night: night.key,
            window_start: night.window.start,
            window_end: night.window.end,
            recorded_start: recorded.map(|(start, _)| start),
            recorded_end: recorded.map(|(_, end)| end),
            sleep_onset,
            sleep_offset,
            total_sleep_seconds,
            onset_latency_seconds,
            stage_seconds,
            waso_seconds,
            awakenings,
            sleep_efficiency: compute_sleep_efficiency(&stage_seconds),
            hypnogram: encode_hypnogram(segments),
        }
    }
}

/// Sum segment durations by stage
fn compute_stage_durations(segments: &[Segment]) -> StageDurations {
    let mut durations = StageDurations::default();
    for segment in segments {
        durations.add(segment.stage, segment.duration_seconds());
    }
    durations
}

/// Awake time and awake runs inside a span that starts and ends asleep
fn compute_wake_after_onset(span: &[Segment]) -> (i64, u32) {
    let mut waso_seconds = 0;
    let mut awakenings = 0;
    let mut in_awake_run = false;

    for segment in span {
        if segment.stage == SleepStage::Awake {
            waso_seconds += segment.duration_seconds();
            if !in_awake_run {
                awakenings += 1;
            }
            in_awake_run = true;
        } else {
            in_awake_run = false;
        }
    }

    (waso_seconds, awakenings)
}

/// Percentage of tracked (non-unknown) time spent asleep
fn compute_sleep_efficiency(durations: &StageDurations) -> u32 {
    let sleep = durations.light + durations.deep + durations.rem;
    let tracked = sleep + durations.awake;
    if tracked <= 0 {
        return 0;
    }
    ((sleep as f64 / tracked as f64) * 100.0).round() as u32
}

/// Bracketed, comma-separated stage labels, one per segment
pub fn encode_hypnogram(segments: &[Segment]) -> String {
    let labels: Vec<&str> = segments.iter().map(|s| s.stage.label()).collect();
    format!("[{}]", labels.join(","))
}
