//! Conversion configuration
//!
//! Holds everything the pipeline needs besides the input files: time zone,
//! overnight window, segment length, time shift, date range and output
//! options. Default date bounds are computed from an injected "now" so callers
//! and tests never read the system clock implicitly.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use tracing::warn;

use crate::adapters::ExportFormat;
use crate::encoder::DurationFormat;
use crate::error::ConvertError;
use crate::grouper::OvernightWindow;
use crate::interval::resolve_local;
use crate::resampler::DEFAULT_SEGMENT_SECONDS;
use crate::types::Timestamp;

/// Bound formats with a time component
const BOUND_FORMATS: &[&str] = &[
    "%Y-%m-%d-%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Detect the IANA zone of the running system, falling back to UTC
pub fn system_timezone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            warn!("unrecognised system timezone \"{}\", falling back to UTC", name);
            Tz::UTC
        }),
        Err(e) => {
            warn!("could not detect system timezone ({}), falling back to UTC", e);
            Tz::UTC
        }
    }
}

/// Parse an IANA zone name; `auto` selects the system zone
pub fn parse_timezone(name: &str) -> Result<Tz, ConvertError> {
    if name.eq_ignore_ascii_case("auto") {
        return Ok(system_timezone());
    }
    name.parse::<Tz>()
        .map_err(|_| ConvertError::InvalidTimezone(name.to_string()))
}

/// Parse a date-range bound.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD-HH:MM`, `YYYY-MM-DD HH:MM[:SS]`,
/// `YYYY-MM-DDTHH:MM[:SS]` and RFC 3339. A bare date is placed at
/// `default_hour` on that day. Naive values are read in `tz`.
pub fn parse_bound(value: &str, tz: Tz, default_hour: u32) -> Result<Timestamp, ConvertError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&tz));
    }

    if let Some(naive) = BOUND_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Ok(resolve_local(tz, naive));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ConvertError::DateParseError(value.to_string()))?;
    let time = NaiveTime::from_hms_opt(default_hour, 0, 0)
        .ok_or_else(|| ConvertError::InvalidConfig(format!("invalid hour {default_hour}")))?;
    Ok(resolve_local(tz, date.and_time(time)))
}

/// Default range: yesterday's window start to today's window end
pub fn default_bounds(now: Timestamp, window: &OvernightWindow) -> (Timestamp, Timestamp) {
    let today = now.date_naive();
    let yesterday = today.pred_opt().unwrap_or(today);
    let last_night = window.window_for(yesterday, now.timezone());
    (last_night.start, last_night.end)
}

/// Full conversion configuration
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Zone for naive timestamps and night boundaries
    pub timezone: Tz,
    /// Overnight window hours
    pub window: OvernightWindow,
    /// Segment length in seconds
    pub segment_seconds: i64,
    /// Added to every record's start and end
    pub shift_seconds: i64,
    /// Range start; defaults from "now" when unset
    pub from: Option<Timestamp>,
    /// Range end; defaults from "now" when unset
    pub to: Option<Timestamp>,
    /// Input document layout
    pub input_format: ExportFormat,
    /// Output duration rendering
    pub duration_format: DurationFormat,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            window: OvernightWindow::default(),
            segment_seconds: DEFAULT_SEGMENT_SECONDS,
            shift_seconds: 0,
            from: None,
            to: None,
            input_format: ExportFormat::Auto,
            duration_format: DurationFormat::Seconds,
        }
    }
}

impl ConvertConfig {
    /// Default configuration in the given zone
    pub fn with_timezone(timezone: Tz) -> Self {
        Self {
            timezone,
            ..Default::default()
        }
    }

    /// Resolve the effective `[from, to]` range
    pub fn date_range(&self, now: Timestamp) -> Result<(Timestamp, Timestamp), ConvertError> {
        let (default_from, default_to) =
            default_bounds(now.with_timezone(&self.timezone), &self.window);
        let from = self.from.unwrap_or(default_from);
        let to = self.to.unwrap_or(default_to);

        if from > to {
            return Err(ConvertError::InvalidConfig(format!(
                "range start {from} is after range end {to}"
            )));
        }
        Ok((from, to))
    }
}
