//! Interval parsing
//!
//! Turns raw export records into timezone-aware [`Interval`]s. Timestamps may
//! carry an offset or be naive; naive ones are read in the configured zone.
//! Records that cannot be turned into a valid interval are skipped with a
//! warning.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::diagnostics::{Diagnostics, Warning};
use crate::normalizer::StageNormalizer;
use crate::types::{Interval, RawRecord, Timestamp};

/// Formats that carry an explicit UTC offset
const OFFSET_FORMATS: &[&str] = &[
    // Health Auto Export: "2024-11-22 23:00:00 +0100"
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Formats without zone information
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Resolve a wall-clock time in `tz` to an instant.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// spring-forward gap move to the first valid instant after it.
pub fn resolve_local(tz: Tz, naive: NaiveDateTime) -> Timestamp {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

/// Parser for raw export records
#[derive(Debug, Clone, Copy)]
pub struct IntervalParser {
    tz: Tz,
}

impl IntervalParser {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse records into intervals, shifting each by `shift_seconds`.
    ///
    /// Output order follows input order, which is not sorted in general.
    pub fn parse(
        &self,
        records: &[RawRecord],
        shift_seconds: i64,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Interval> {
        let delta = Duration::try_seconds(shift_seconds);
        records
            .iter()
            .filter_map(|record| {
                let interval = self.parse_record(record, diagnostics)?;
                let shifted = delta.and_then(|delta| interval.shifted(delta));
                if shifted.is_none() {
                    diagnostics.warn(Warning::ShiftOutOfRange {
                        start: record.start_date.clone(),
                        shift_seconds,
                    });
                }
                shifted
            })
            .collect()
    }

    fn parse_record(&self, record: &RawRecord, diagnostics: &mut Diagnostics) -> Option<Interval> {
        let start = self.parse_or_warn(&record.start_date, diagnostics)?;
        let end = self.parse_or_warn(&record.end_date, diagnostics)?;
        let stage = StageNormalizer::normalize(&record.value, diagnostics);

        let interval = Interval::new(start, end, stage);
        if interval.is_none() {
            diagnostics.warn(Warning::NonPositiveInterval {
                start: record.start_date.clone(),
                end: record.end_date.clone(),
            });
        }
        interval
    }

    fn parse_or_warn(&self, value: &str, diagnostics: &mut Diagnostics) -> Option<Timestamp> {
        let parsed = self.parse_timestamp(value);
        if parsed.is_none() {
            diagnostics.warn(Warning::InvalidTimestamp {
                value: value.to_string(),
            });
        }
        parsed
    }

    /// Parse a timestamp string, converting to the configured zone.
    ///
    /// Returns `None` for empty strings or unrecognized formats.
    pub fn parse_timestamp(&self, value: &str) -> Option<Timestamp> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&self.tz));
        }

        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
                return Some(dt.with_timezone(&self.tz));
            }
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(|naive| resolve_local(self.tz, naive))
    }
}
