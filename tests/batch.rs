//! Batch conversion over real files

use std::path::PathBuf;

use chrono::TimeZone;
use chrono_tz::UTC;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use sleep2dreem::files::{discover_inputs, DEFAULT_FILE_FILTER};
use sleep2dreem::{convert_files, ConvertConfig, CsvEncoder, Warning};

const REFERENCE_EXPORT: &str = r#"{
    "data": {
        "metrics": [
            {"name": "heart_rate", "units": "count/min", "data": []},
            {
                "name": "sleep_analysis",
                "units": "hr",
                "data": [
                    {"startDate": "2024-11-22 23:00:00 +0000", "endDate": "2024-11-22 23:30:00 +0000", "value": "REM", "source": "Watch", "qty": 0.5},
                    {"startDate": "2024-11-22 23:30:00 +0000", "endDate": "2024-11-23 06:00:00 +0000", "value": "Core", "source": "Watch", "qty": 6.5}
                ]
            }
        ]
    }
}"#;

fn reference_config() -> ConvertConfig {
    ConvertConfig {
        from: Some(UTC.with_ymd_and_hms(2024, 11, 22, 19, 0, 0).unwrap()),
        to: Some(UTC.with_ymd_and_hms(2024, 11, 23, 11, 0, 0).unwrap()),
        ..ConvertConfig::with_timezone(UTC)
    }
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn reference_night_end_to_end() {
    let dir = TempDir::new().unwrap();
    write(&dir, "HealthAutoExport-2024-11-23.json", REFERENCE_EXPORT);
    write(&dir, "HealthAutoExport-broken.json", "{ not json");
    write(&dir, "unrelated.json", "[]");

    let inputs = discover_inputs(dir.path(), DEFAULT_FILE_FILTER).unwrap();
    assert_eq!(inputs.len(), 2);

    let now = UTC.with_ymd_and_hms(2024, 11, 23, 12, 0, 0).unwrap();
    let report = convert_files(&inputs, reference_config(), now).unwrap();

    assert_eq!(report.processed_files.len(), 1);
    assert_eq!(report.failed_files, vec![dir.path().join("HealthAutoExport-broken.json")]);
    assert!(matches!(
        report.diagnostics.warnings()[0],
        Warning::SkippedFile { .. }
    ));

    let csv = CsvEncoder::default().encode_to_string(&report.records).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(
        "night;2024-11-22T19:00:00+00:00;2024-11-23T11:00:00+00:00;25200;14400;23400;0;1800;0;0;0;0;0;0;100;["
    ));

    // 16 hour window in 30 second segments
    let hypnogram = lines[1].rsplit(';').next().unwrap();
    assert_eq!(hypnogram.matches(',').count(), 1919);
}

#[test]
fn empty_input_set_yields_no_records() {
    let now = UTC.with_ymd_and_hms(2024, 11, 23, 12, 0, 0).unwrap();
    let report = convert_files(&[], reference_config(), now).unwrap();

    assert!(report.records.is_empty());
    assert!(report.diagnostics.is_empty());

    let csv = CsvEncoder::default().encode_to_string(&report.records).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[test]
fn night_split_across_files_is_merged() {
    let dir = TempDir::new().unwrap();
    let evening = write(
        &dir,
        "HealthAutoExport-a.json",
        r#"[{"startDate": "2024-11-22T22:00:00Z", "endDate": "2024-11-23T00:00:00Z", "value": "asleepCore"}]"#,
    );
    let morning = write(
        &dir,
        "HealthAutoExport-b.json",
        r#"[{"startDate": "2024-11-23T00:00:00Z", "endDate": "2024-11-23T00:20:00Z", "value": "Awake"},
            {"startDate": "2024-11-23T00:20:00Z", "endDate": "2024-11-23T04:00:00Z", "value": "Deep"}]"#,
    );

    let now = UTC.with_ymd_and_hms(2024, 11, 23, 12, 0, 0).unwrap();
    let report = convert_files(&[evening, morning], reference_config(), now).unwrap();

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.total_sleep_seconds, 2 * 3600 + 3 * 3600 + 40 * 60);
    assert_eq!(record.waso_seconds, 20 * 60);
    assert_eq!(record.awakenings, 1);
    assert_eq!(record.onset_latency_seconds, 3 * 3600);
}
