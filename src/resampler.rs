//! Segment resampling
//!
//! Converts a night's intervals, which may overlap or leave gaps, into a
//! gap-free sequence of fixed-duration segments tiling the whole night window.
//!
//! A segment takes the stage of the interval covering its midpoint. Overlaps
//! are resolved by sorting intervals into precedence order and painting them
//! one after the other, so later paint wins:
//! - a later-starting interval overrides an earlier one;
//! - on equal starts, the later-ending interval wins;
//! - on identical spans, the higher-ranked stage wins.
//!
//! Slots no interval covers stay `Unknown`. A window that is not a whole
//! number of segments ends with one shorter segment so the tiling stays
//! complete.

use chrono::Duration;

use crate::error::ConvertError;
use crate::types::{Interval, Night, Segment, SleepStage};

/// Default segment length in seconds
pub const DEFAULT_SEGMENT_SECONDS: i64 = 30;

/// Resampler onto a fixed segment grid
#[derive(Debug, Clone, Copy)]
pub struct SegmentResampler {
    segment_seconds: i64,
}

impl Default for SegmentResampler {
    fn default() -> Self {
        Self {
            segment_seconds: DEFAULT_SEGMENT_SECONDS,
        }
    }
}

impl SegmentResampler {
    /// Segment length must be positive and divide half an hour evenly, so
    /// night windows stay a whole number of segments across DST changes of
    /// 30 minutes or more.
    pub fn new(segment_seconds: i64) -> Result<Self, ConvertError> {
        if segment_seconds <= 0 || 1800 % segment_seconds != 0 {
            return Err(ConvertError::InvalidConfig(format!(
                "segment duration {segment_seconds}s must be positive and divide 1800"
            )));
        }
        Ok(Self { segment_seconds })
    }

    pub fn segment_seconds(&self) -> i64 {
        self.segment_seconds
    }

    /// Resample a night onto the segment grid
    pub fn resample(&self, night: &Night) -> Vec<Segment> {
        let window = night.window;
        let segment_ms = self.segment_seconds * 1000;
        let half_ms = segment_ms / 2;

        let window_ms = (window.end - window.start).num_milliseconds().max(0);
        let full = window_ms / segment_ms;
        let tail_ms = window_ms % segment_ms;
        let count = (full + i64::from(tail_ms > 0)) as usize;
        let mut stages = vec![SleepStage::Unknown; count];

        let mut ordered: Vec<&Interval> = night.intervals.iter().collect();
        ordered.sort_by_key(|interval| interval.precedence_key());

        for interval in ordered {
            let start_ms = (interval.start() - window.start).num_milliseconds();
            let end_ms = (interval.end() - window.start).num_milliseconds();

            // Full slots whose midpoint falls in [start, end)
            let first = ceil_div(start_ms - half_ms, segment_ms).clamp(0, full) as usize;
            let last = ceil_div(end_ms - half_ms, segment_ms).clamp(0, full) as usize;
            if first < last {
                stages[first..last].fill(interval.stage());
            }

            if tail_ms > 0 {
                let tail_mid = full * segment_ms + tail_ms / 2;
                if start_ms <= tail_mid && tail_mid < end_ms {
                    stages[full as usize] = interval.stage();
                }
            }
        }

        let step = Duration::seconds(self.segment_seconds);
        stages
            .into_iter()
            .enumerate()
            .map(|(i, stage)| {
                let start = window.start + step * i as i32;
                Segment {
                    start,
                    end: (start + step).min(window.end),
                    stage,
                }
            })
            .collect()
    }
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    -((-numerator).div_euclid(denominator))
}
