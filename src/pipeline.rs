//! Pipeline orchestration
//!
//! This module provides the public API for sleep2dreem.
//! It runs the full pipeline from export JSON to per-night summaries.
//!
//! Pipeline stages:
//! 1. ExportAdapter - Parse export documents into raw records
//! 2. IntervalParser - Validate records into timezone-aware intervals
//! 3. NightGrouper - Bucket intervals into nights (after all files are read)
//! 4. SegmentResampler - Tile each night with fixed-length segments
//! 5. StatisticsEngine - Reduce segments into a summary record

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use tracing::{debug, info};

use crate::adapters::parse_export;
use crate::config::ConvertConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::ConvertError;
use crate::grouper::NightGrouper;
use crate::interval::IntervalParser;
use crate::resampler::SegmentResampler;
use crate::stats::StatisticsEngine;
use crate::types::{Interval, RawRecord, SummaryRecord, Timestamp};

/// Result of a finished conversion
#[derive(Debug)]
pub struct Conversion {
    /// One record per qualifying night, in date order
    pub records: Vec<SummaryRecord>,
    /// Every warning raised along the way
    pub diagnostics: Diagnostics,
}

/// Accumulating converter.
///
/// Intervals from every input are collected first; grouping only happens in
/// [`Converter::finish`] so nights spanning several files merge correctly.
pub struct Converter {
    config: ConvertConfig,
    parser: IntervalParser,
    grouper: NightGrouper,
    resampler: SegmentResampler,
    intervals: Vec<Interval>,
    diagnostics: Diagnostics,
}

impl Converter {
    /// Create a converter, validating the configuration
    pub fn new(config: ConvertConfig) -> Result<Self, ConvertError> {
        if Duration::try_seconds(config.shift_seconds).is_none() {
            return Err(ConvertError::InvalidConfig(format!(
                "time shift of {}s is out of range",
                config.shift_seconds
            )));
        }
        let resampler = SegmentResampler::new(config.segment_seconds)?;
        Ok(Self {
            parser: IntervalParser::new(config.timezone),
            grouper: NightGrouper::new(config.window, config.timezone),
            resampler,
            intervals: Vec::new(),
            diagnostics: Diagnostics::new(),
            config,
        })
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Number of intervals accumulated so far
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Add already-parsed records; returns how many became intervals
    pub fn add_records(&mut self, records: &[RawRecord]) -> usize {
        let intervals = self
            .parser
            .parse(records, self.config.shift_seconds, &mut self.diagnostics);
        let added = intervals.len();
        self.intervals.extend(intervals);
        added
    }

    /// Parse and add one export document
    pub fn add_json(&mut self, raw_json: &str) -> Result<usize, ConvertError> {
        let records = parse_export(self.config.input_format, raw_json)?;
        Ok(self.add_records(&records))
    }

    /// Read, parse and add one export file
    pub fn add_file(&mut self, path: &Path) -> Result<usize, ConvertError> {
        let raw_json = fs::read_to_string(path)?;
        let added = self.add_json(&raw_json)?;
        debug!("read {} intervals from {}", added, path.display());
        Ok(added)
    }

    /// Group, resample and summarize everything accumulated.
    ///
    /// `now` only matters when the configuration leaves a date bound unset.
    pub fn finish(self, now: Timestamp) -> Result<Conversion, ConvertError> {
        let (from, to) = self.config.date_range(now)?;
        info!("grouping {} intervals between {} and {}", self.intervals.len(), from, to);

        let nights = self.grouper.group(self.intervals, from, to);
        let records = nights
            .values()
            .map(|night| {
                let segments = self.resampler.resample(night);
                StatisticsEngine::summarize(night, &segments)
            })
            .collect();

        Ok(Conversion {
            records,
            diagnostics: self.diagnostics,
        })
    }
}

/// Outcome of converting a batch of files
#[derive(Debug)]
pub struct BatchReport {
    /// One record per qualifying night, in date order
    pub records: Vec<SummaryRecord>,
    /// Files that were read and parsed
    pub processed_files: Vec<PathBuf>,
    /// Files skipped as unreadable or malformed
    pub failed_files: Vec<PathBuf>,
    /// Every warning raised along the way
    pub diagnostics: Diagnostics,
}

/// Convert a batch of export files.
///
/// Files that cannot be read or parsed are skipped with a warning; only a
/// configuration problem fails the batch.
pub fn convert_files(
    paths: &[PathBuf],
    config: ConvertConfig,
    now: Timestamp,
) -> Result<BatchReport, ConvertError> {
    let mut converter = Converter::new(config)?;
    let mut processed_files = Vec::new();
    let mut failed_files = Vec::new();

    for path in paths {
        info!("processing file: {}", path.display());
        match converter.add_file(path) {
            Ok(_) => processed_files.push(path.clone()),
            Err(e) => {
                converter.diagnostics.warn(Warning::SkippedFile {
                    path: path.clone(),
                    reason: e.to_string(),
                });
                failed_files.push(path.clone());
            }
        }
    }

    let conversion = converter.finish(now)?;
    info!(
        "converted {} nights from {} files ({} failed)",
        conversion.records.len(),
        processed_files.len(),
        failed_files.len()
    );

    Ok(BatchReport {
        records: conversion.records,
        processed_files,
        failed_files,
        diagnostics: conversion.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::UTC;
    use pretty_assertions::assert_eq;

    fn scenario_config() -> ConvertConfig {
        ConvertConfig {
            from: Some(UTC.with_ymd_and_hms(2024, 11, 22, 19, 0, 0).unwrap()),
            to: Some(UTC.with_ymd_and_hms(2024, 11, 23, 11, 0, 0).unwrap()),
            ..ConvertConfig::with_timezone(UTC)
        }
    }

    fn now() -> Timestamp {
        UTC.with_ymd_and_hms(2024, 11, 23, 12, 0, 0).unwrap()
    }

    fn sample_export_json() -> &'static str {
        r#"{
            "data": {
                "metrics": [{
                    "name": "sleep_analysis",
                    "data": [
                        {"startDate": "2024-11-22 23:00:00 +0000", "endDate": "2024-11-22 23:30:00 +0000", "value": "REM"},
                        {"startDate": "2024-11-22 23:30:00 +0000", "endDate": "2024-11-23 06:00:00 +0000", "value": "Core"}
                    ]
                }]
            }
        }"#
    }

    #[test]
    fn test_reference_scenario() {
        let mut converter = Converter::new(scenario_config()).unwrap();
        assert_eq!(converter.add_json(sample_export_json()).unwrap(), 2);

        let conversion = converter.finish(now()).unwrap();

        assert_eq!(conversion.records.len(), 1);
        let record = &conversion.records[0];
        assert_eq!(record.night, NaiveDate::from_ymd_opt(2024, 11, 22).unwrap());
        assert_eq!(record.total_sleep_seconds, 7 * 3600);
        assert_eq!(record.onset_latency_seconds, 4 * 3600);
        assert_eq!(record.stage_seconds.rem, 30 * 60);
        assert_eq!(record.waso_seconds, 0);
        assert_eq!(record.awakenings, 0);
        assert!(conversion.diagnostics.is_empty());
    }

    #[test]
    fn test_nights_merge_across_documents() {
        let first = r#"[{"startDate": "2024-11-22T23:00:00Z", "endDate": "2024-11-23T02:00:00Z", "value": "Core"}]"#;
        let second = r#"[{"startDate": "2024-11-23T02:00:00Z", "endDate": "2024-11-23T05:00:00Z", "value": "Deep"}]"#;

        let mut converter = Converter::new(scenario_config()).unwrap();
        converter.add_json(first).unwrap();
        converter.add_json(second).unwrap();
        let merged = converter.finish(now()).unwrap();

        let mut reversed = Converter::new(scenario_config()).unwrap();
        reversed.add_json(second).unwrap();
        reversed.add_json(first).unwrap();
        let reversed = reversed.finish(now()).unwrap();

        assert_eq!(merged.records.len(), 1);
        assert_eq!(merged.records[0].total_sleep_seconds, 6 * 3600);
        assert_eq!(merged.records, reversed.records);
    }

    #[test]
    fn test_shift_invariance() {
        let records = vec![
            RawRecord::new("2024-11-22T23:00:00Z", "2024-11-23T01:00:00Z", "Core"),
            RawRecord::new("2024-11-23T01:00:00Z", "2024-11-23T01:20:00Z", "Awake"),
            RawRecord::new("2024-11-23T01:20:00Z", "2024-11-23T06:00:00Z", "REM"),
        ];
        let shift = 5400;

        let mut baseline = Converter::new(scenario_config()).unwrap();
        baseline.add_records(&records);
        let baseline = baseline.finish(now()).unwrap();

        // Shift forward, then feed the shifted timestamps back shifted by -S
        let mut forward = Converter::new(ConvertConfig {
            shift_seconds: shift,
            ..scenario_config()
        })
        .unwrap();
        forward.add_records(&records);
        let shifted: Vec<RawRecord> = forward
            .intervals
            .iter()
            .map(|i| {
                RawRecord::new(
                    &i.start().to_rfc3339(),
                    &i.end().to_rfc3339(),
                    i.stage().label(),
                )
            })
            .collect();

        let mut back = Converter::new(ConvertConfig {
            shift_seconds: -shift,
            ..scenario_config()
        })
        .unwrap();
        back.add_records(&shifted);
        let restored = back.finish(now()).unwrap();

        assert_eq!(baseline.records, restored.records);
    }

    #[test]
    fn test_no_qualifying_nights() {
        let mut converter = Converter::new(scenario_config()).unwrap();
        converter
            .add_json(r#"[{"startDate": "2024-11-22T13:00:00Z", "endDate": "2024-11-22T14:00:00Z", "value": "Core"}]"#)
            .unwrap();
        let conversion = converter.finish(now()).unwrap();
        assert!(conversion.records.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ConvertConfig {
            segment_seconds: 7,
            ..scenario_config()
        };
        assert!(matches!(
            Converter::new(config),
            Err(ConvertError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_null_field_skips_only_its_record() {
        let mut converter = Converter::new(scenario_config()).unwrap();
        let added = converter
            .add_json(
                r#"[{"startDate": null, "endDate": "2024-11-22T23:30:00Z", "value": "REM"},
                    {"startDate": "2024-11-22T23:30:00Z", "endDate": "2024-11-23T06:00:00Z", "value": "Core"}]"#,
            )
            .unwrap();

        assert_eq!(added, 1);
        assert!(matches!(
            converter.diagnostics().warnings()[0],
            Warning::InvalidTimestamp { .. }
        ));

        let conversion = converter.finish(now()).unwrap();
        assert_eq!(conversion.records[0].total_sleep_seconds, 6 * 3600 + 30 * 60);
    }

    #[test]
    fn test_unrepresentable_shift_is_rejected() {
        let config = ConvertConfig {
            shift_seconds: i64::MAX,
            ..scenario_config()
        };
        assert!(matches!(
            Converter::new(config),
            Err(ConvertError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let mut converter = Converter::new(scenario_config()).unwrap();
        assert!(converter.add_json("{ nope").is_err());
        assert_eq!(converter.interval_count(), 0);
    }
}
