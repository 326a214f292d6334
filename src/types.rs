//! Core types for the sleep2dreem pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw export records, parsed intervals, nights, resampled segments,
//! and the per-night summary written to CSV.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Timezone-aware instant in the configured zone
pub type Timestamp = DateTime<Tz>;

/// Calendar date of the evening that opens a night
pub type NightKey = NaiveDate;

/// Canonical sleep stage classification
///
/// Variant order is the precedence rank used when two intervals cover the exact
/// same span: later variants win.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    Unknown,
    Awake,
    Light,
    Deep,
    Rem,
}

impl SleepStage {
    pub const ALL: [SleepStage; 5] = [
        SleepStage::Unknown,
        SleepStage::Awake,
        SleepStage::Light,
        SleepStage::Deep,
        SleepStage::Rem,
    ];

    /// Label used by the Dreem hypnogram
    pub fn label(&self) -> &'static str {
        match self {
            SleepStage::Unknown => "Unknown",
            SleepStage::Awake => "WAKE",
            SleepStage::Light => "Light",
            SleepStage::Deep => "Deep",
            SleepStage::Rem => "REM",
        }
    }

    /// Light, deep and REM count as sleep
    pub fn is_sleep(&self) -> bool {
        matches!(self, SleepStage::Light | SleepStage::Deep | SleepStage::Rem)
    }
}

/// Sleep record as it appears in an export file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub start_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub end_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
    /// Recording app or device, when the exporter provides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
}

// Exporters write `null` for missing values; the parser warns about them per record
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawRecord {
    pub fn new(start_date: &str, end_date: &str, value: &str) -> Self {
        Self {
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            value: value.to_string(),
            source: None,
            qty: None,
        }
    }
}

/// A validated stage interval with `start < end`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    start: Timestamp,
    end: Timestamp,
    stage: SleepStage,
}

impl Interval {
    /// Returns `None` unless `start < end`
    pub fn new(start: Timestamp, end: Timestamp, stage: SleepStage) -> Option<Self> {
        (start < end).then_some(Self { start, end, stage })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn stage(&self) -> SleepStage {
        self.stage
    }

    /// Shift both ends by `delta`; `None` when either end leaves the
    /// representable range
    pub fn shifted(&self, delta: chrono::Duration) -> Option<Self> {
        Some(Self {
            start: self.start.checked_add_signed(delta)?,
            end: self.end.checked_add_signed(delta)?,
            stage: self.stage,
        })
    }

    /// Overlap precedence order: start, then end, then stage rank
    pub fn precedence_key(&self) -> (Timestamp, Timestamp, SleepStage) {
        (self.start, self.end, self.stage)
    }

    /// Portion of this interval inside `[lo, hi)`, if any
    pub fn clipped(&self, lo: Timestamp, hi: Timestamp) -> Option<Self> {
        Self::new(self.start.max(lo), self.end.min(hi), self.stage)
    }
}

/// Absolute half-open window `[start, end)` of a night
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl NightWindow {
    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    /// Whether the window overlaps the closed range `[from, to]`
    pub fn intersects(&self, from: Timestamp, to: Timestamp) -> bool {
        self.start <= to && from < self.end
    }
}

/// One logical sleep session and the intervals that belong to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Night {
    pub key: NightKey,
    pub window: NightWindow,
    pub intervals: Vec<Interval>,
}

impl Night {
    pub fn new(key: NightKey, window: NightWindow) -> Self {
        Self {
            key,
            window,
            intervals: Vec::new(),
        }
    }

    /// Earliest start and latest end across the night's intervals
    pub fn recorded_span(&self) -> Option<(Timestamp, Timestamp)> {
        let start = self.intervals.iter().map(Interval::start).min()?;
        let end = self.intervals.iter().map(Interval::end).max()?;
        Some((start, end))
    }
}

/// Fixed-duration slot carrying exactly one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: Timestamp,
    pub end: Timestamp,
    pub stage: SleepStage,
}

impl Segment {
    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

/// Seconds spent in each stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDurations {
    pub unknown: i64,
    pub awake: i64,
    pub light: i64,
    pub deep: i64,
    pub rem: i64,
}

impl StageDurations {
    pub fn add(&mut self, stage: SleepStage, seconds: i64) {
        *self.slot_mut(stage) += seconds;
    }

    pub fn get(&self, stage: SleepStage) -> i64 {
        match stage {
            SleepStage::Unknown => self.unknown,
            SleepStage::Awake => self.awake,
            SleepStage::Light => self.light,
            SleepStage::Deep => self.deep,
            SleepStage::Rem => self.rem,
        }
    }

    pub fn total(&self) -> i64 {
        SleepStage::ALL.iter().map(|s| self.get(*s)).sum()
    }

    fn slot_mut(&mut self, stage: SleepStage) -> &mut i64 {
        match stage {
            SleepStage::Unknown => &mut self.unknown,
            SleepStage::Awake => &mut self.awake,
            SleepStage::Light => &mut self.light,
            SleepStage::Deep => &mut self.deep,
            SleepStage::Rem => &mut self.rem,
        }
    }
}

/// Per-night summary, written as one CSV row
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    /// Night anchor date
    pub night: NightKey,
    /// Night window start
    pub window_start: Timestamp,
    /// Night window end (exclusive)
    pub window_end: Timestamp,
    /// Earliest recorded interval start within the night
    pub recorded_start: Option<Timestamp>,
    /// Latest recorded interval end within the night
    pub recorded_end: Option<Timestamp>,
    /// Start of the first sleep segment
    pub sleep_onset: Option<Timestamp>,
    /// End of the last sleep segment
    pub sleep_offset: Option<Timestamp>,
    /// Light + deep + REM (seconds)
    pub total_sleep_seconds: i64,
    /// Sleep onset minus window start (seconds)
    pub onset_latency_seconds: i64,
    /// Time spent per stage (seconds)
    pub stage_seconds: StageDurations,
    /// Wake after sleep onset (seconds)
    pub waso_seconds: i64,
    /// Awake runs between onset and offset
    pub awakenings: u32,
    /// Sleep time over tracked time, percent
    pub sleep_efficiency: u32,
    /// Chronological per-segment stage labels
    pub hypnogram: String,
}
