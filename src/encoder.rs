//! Dreem CSV encoding
//!
//! This module encodes summary records into the semicolon-separated CSV layout
//! the Dreem analysis tool imports: one header row per file, one row per night.
//! Columns the source data cannot provide (position changes, heart rate,
//! respiration, stimulations) are written as `0`.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::types::{SummaryRecord, Timestamp};

/// Column headers, in output order
pub const DREEM_HEADER: [&str; 16] = [
    "Type",
    "Start Time",
    "Stop Time",
    "Sleep Duration",
    "Sleep Onset Duration",
    "Light Sleep Duration",
    "Deep Sleep Duration",
    "REM Duration",
    "Wake After Sleep Onset Duration",
    "Number of awakenings",
    "Position Changes",
    "Mean Heart Rate",
    "Mean Respiration CPM",
    "Number of Stimulations",
    "Sleep efficiency",
    "Hypnogram",
];

/// Record type written in the first column
pub const RECORD_TYPE: &str = "night";

const DELIMITER: u8 = b';';

/// How durations are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationFormat {
    /// Whole seconds, e.g. `25200`
    #[default]
    Seconds,
    /// `H:MM:SS`, e.g. `7:00:00`
    Clock,
}

impl DurationFormat {
    pub fn format(&self, seconds: i64) -> String {
        match self {
            DurationFormat::Seconds => seconds.to_string(),
            DurationFormat::Clock => {
                let seconds = seconds.max(0);
                format!(
                    "{}:{:02}:{:02}",
                    seconds / 3600,
                    (seconds % 3600) / 60,
                    seconds % 60
                )
            }
        }
    }
}

/// ISO 8601 with numeric offset
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Encoder for Dreem CSV rows
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvEncoder {
    duration_format: DurationFormat,
}

impl CsvEncoder {
    pub fn new(duration_format: DurationFormat) -> Self {
        Self { duration_format }
    }

    /// Fields of one data row, in header order
    pub fn encode(&self, record: &SummaryRecord) -> Vec<String> {
        let d = |seconds: i64| self.duration_format.format(seconds);
        vec![
            RECORD_TYPE.to_string(),
            format_timestamp(&record.window_start),
            format_timestamp(&record.window_end),
            d(record.total_sleep_seconds),
            d(record.onset_latency_seconds),
            d(record.stage_seconds.light),
            d(record.stage_seconds.deep),
            d(record.stage_seconds.rem),
            d(record.waso_seconds),
            record.awakenings.to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            record.sleep_efficiency.to_string(),
            record.hypnogram.clone(),
        ]
    }

    /// Write the header and one row per record
    pub fn write<W: Write>(&self, writer: W, records: &[SummaryRecord]) -> Result<(), ConvertError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(writer);

        csv_writer.write_record(DREEM_HEADER)?;
        for record in records {
            csv_writer.write_record(self.encode(record))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Encode to a CSV string
    pub fn encode_to_string(&self, records: &[SummaryRecord]) -> Result<String, ConvertError> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, records)?;
        String::from_utf8(buffer).map_err(|e| ConvertError::ParseError(e.to_string()))
    }
}
