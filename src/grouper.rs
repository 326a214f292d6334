//! Night grouping
//!
//! Partitions a flat interval list into per-night buckets. A night is anchored
//! to the calendar date of the evening that opens it and spans
//! `[anchor start_hour:00, anchor+1 end_hour:00)` in the configured zone.
//!
//! An interval belongs to exactly one night, chosen from its start time alone.
//! Intervals running past the window end are clipped, never split across nights.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConvertError;
use crate::interval::resolve_local;
use crate::types::{Interval, Night, NightKey, NightWindow, Timestamp};

/// Default evening hour that opens a night
pub const DEFAULT_WINDOW_START_HOUR: u32 = 19;

/// Default morning hour that closes a night
pub const DEFAULT_WINDOW_END_HOUR: u32 = 11;

/// Overnight window expressed as local hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvernightWindow {
    start_hour: u32,
    end_hour: u32,
}

impl Default for OvernightWindow {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_WINDOW_START_HOUR,
            end_hour: DEFAULT_WINDOW_END_HOUR,
        }
    }
}

impl OvernightWindow {
    /// The window must cross midnight: `end_hour < start_hour <= 23`
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self, ConvertError> {
        if start_hour > 23 || end_hour >= start_hour {
            return Err(ConvertError::InvalidConfig(format!(
                "overnight window {start_hour}:00-{end_hour}:00 must start in the evening \
                 and end on the next morning"
            )));
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    /// Night that an instant opens or continues, if any
    pub fn anchor_for(&self, instant: Timestamp) -> Option<NightKey> {
        let time = instant.time();
        let date = instant.date_naive();
        if time.hour() >= self.start_hour {
            Some(date)
        } else if time < hour(self.end_hour) {
            date.pred_opt()
        } else {
            None
        }
    }

    /// Absolute window of the night anchored at `key`
    pub fn window_for(&self, key: NightKey, tz: Tz) -> NightWindow {
        let start = resolve_local(tz, key.and_time(hour(self.start_hour)));
        let next_day = key.succ_opt().unwrap_or(key);
        let end = resolve_local(tz, next_day.and_time(hour(self.end_hour)));
        NightWindow { start, end }
    }
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Groups intervals into nights
#[derive(Debug, Clone, Copy)]
pub struct NightGrouper {
    window: OvernightWindow,
    tz: Tz,
}

impl NightGrouper {
    pub fn new(window: OvernightWindow, tz: Tz) -> Self {
        Self { window, tz }
    }

    /// Group intervals into nights whose window intersects `[from, to]`.
    ///
    /// Each interval is clipped to its night's window and to `[from, to]`;
    /// intervals left empty by clipping, or starting outside any window, are
    /// dropped. The result is independent of input order: every night's
    /// intervals are kept in precedence order.
    pub fn group(
        &self,
        intervals: Vec<Interval>,
        from: Timestamp,
        to: Timestamp,
    ) -> BTreeMap<NightKey, Night> {
        let mut nights: BTreeMap<NightKey, Night> = BTreeMap::new();

        for interval in intervals {
            let local_start = interval.start().with_timezone(&self.tz);
            let Some(key) = self.window.anchor_for(local_start) else {
                debug!(
                    "dropping interval starting {} outside the overnight window",
                    local_start
                );
                continue;
            };

            let window = self.window.window_for(key, self.tz);
            if !window.intersects(from, to) {
                debug!("dropping interval for night {} outside the date range", key);
                continue;
            }

            let lo = window.start.max(from);
            let hi = window.end.min(to);
            let Some(clipped) = interval.clipped(lo, hi) else {
                debug!(
                    "dropping interval starting {} after clipping to night {}",
                    local_start, key
                );
                continue;
            };

            nights
                .entry(key)
                .or_insert_with(|| Night::new(key, window))
                .intervals
                .push(clipped);
        }

        for night in nights.values_mut() {
            night.intervals.sort_by_key(Interval::precedence_key);
        }

        nights
    }
}
