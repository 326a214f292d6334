//! Input discovery and output naming
//!
//! Finds export files in an input directory by wildcard filter, marks
//! processed inputs by renaming them with a `_` prefix, and picks
//! non-colliding output file names.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::ConvertError;
use crate::types::{SummaryRecord, Timestamp};

/// Default input filter for Health Auto Export files
pub const DEFAULT_FILE_FILTER: &str = "HealthAutoExport-*.json";

/// Prefix that marks an input as already processed
pub const PROCESSED_PREFIX: &str = "_";

/// Compile a `*`/`?` wildcard into an anchored regex
pub fn wildcard_regex(pattern: &str) -> Result<Regex, ConvertError> {
    let mut expr = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| ConvertError::InvalidConfig(format!("bad file filter: {e}")))
}

/// List files directly inside `dir` whose name matches `pattern`, sorted.
///
/// A missing or unreadable directory is an error.
pub fn discover_inputs(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ConvertError> {
    if !dir.is_dir() {
        return Err(ConvertError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input folder '{}' does not exist", dir.display()),
        )));
    }

    let matcher = wildcard_regex(pattern)?;
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            // Depth 0 is the folder itself: listing it failed
            Err(e) if e.depth() == 0 => return Err(ConvertError::Io(e.into())),
            Err(e) => {
                warn!("skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let matches = entry
            .file_name()
            .to_str()
            .map(|name| matcher.is_match(name))
            .unwrap_or(false);
        if entry.file_type().is_file() && matches {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!("found {} files matching {} in {}", files.len(), pattern, dir.display());
    Ok(files)
}

/// First of `path`, `stem_1.ext`, `stem_2.ext`, ... that does not exist
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| parent.join(format!("{stem}_{n}{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Rename a processed input to `_<name>`; failures become warnings
pub fn mark_processed(path: &Path, diagnostics: &mut Diagnostics) -> Option<PathBuf> {
    let Some(name) = path.file_name() else {
        diagnostics.warn(Warning::RenameFailed {
            path: path.to_path_buf(),
            reason: "path has no file name".to_string(),
        });
        return None;
    };

    let target = unique_path(&path.with_file_name(format!(
        "{PROCESSED_PREFIX}{}",
        name.to_string_lossy()
    )));

    match std::fs::rename(path, &target) {
        Ok(()) => {
            debug!("renamed {} to {}", path.display(), target.display());
            Some(target)
        }
        Err(e) => {
            diagnostics.warn(Warning::RenameFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
            None
        }
    }
}

/// Per-night output name: `Apple2Dreem_<date>_<HH-MM>_<HH-MM>.csv`
///
/// Times are the first and last recorded instants of the night, or the window
/// bounds when nothing was recorded.
pub fn night_file_name(record: &SummaryRecord) -> String {
    let start = record.recorded_start.unwrap_or(record.window_start);
    let end = record.recorded_end.unwrap_or(record.window_end);
    format!(
        "Apple2Dreem_{}_{}_{}.csv",
        record.night.format("%Y-%m-%d"),
        start.format("%H-%M"),
        end.format("%H-%M")
    )
}

/// Combined output name for a whole date range: `Apple2Dreem_<from>_<to>.csv`
pub fn batch_file_name(from: &Timestamp, to: &Timestamp) -> String {
    format!(
        "Apple2Dreem_{}_{}.csv",
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StageDurations;
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::UTC;
    use tempfile::TempDir;

    #[test]
    fn test_wildcard_regex() {
        let re = wildcard_regex("HealthAutoExport-*.json").unwrap();
        assert!(re.is_match("HealthAutoExport-2024-11-23.json"));
        assert!(!re.is_match("_HealthAutoExport-2024-11-23.json"));
        assert!(!re.is_match("HealthAutoExport-2024-11-23.jsonl"));
        assert!(!re.is_match("HealthAutoExportXjson"));

        let re = wildcard_regex("night?.json").unwrap();
        assert!(re.is_match("night1.json"));
        assert!(!re.is_match("night12.json"));
    }

    #[test]
    fn test_discover_inputs_filters_and_sorts() {
        let tmp = TempDir::new().expect("tempdir");
        for name in [
            "HealthAutoExport-b.json",
            "HealthAutoExport-a.json",
            "_HealthAutoExport-c.json",
            "notes.txt",
        ] {
            std::fs::write(tmp.path().join(name), "[]").unwrap();
        }
        std::fs::create_dir(tmp.path().join("HealthAutoExport-dir.json")).unwrap();

        let files = discover_inputs(tmp.path(), DEFAULT_FILE_FILTER).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["HealthAutoExport-a.json", "HealthAutoExport-b.json"]);
    }

    #[test]
    fn test_discover_inputs_missing_dir() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(discover_inputs(&tmp.path().join("nope"), "*").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_inputs_unreadable_dir() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("tempdir");
        let locked = tmp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("HealthAutoExport-a.json"), "[]").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind root
        let listable = std::fs::read_dir(&locked).is_ok();
        let result = discover_inputs(&locked, DEFAULT_FILE_FILTER);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if listable {
            assert_eq!(result.unwrap().len(), 1);
        } else {
            assert!(matches!(result, Err(ConvertError::Io(_))));
        }
    }

    #[test]
    fn test_unique_path_appends_counter() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("out.csv");
        assert_eq!(unique_path(&path), path);

        std::fs::write(&path, "").unwrap();
        assert_eq!(unique_path(&path), tmp.path().join("out_1.csv"));

        std::fs::write(tmp.path().join("out_1.csv"), "").unwrap();
        assert_eq!(unique_path(&path), tmp.path().join("out_2.csv"));
    }

    #[test]
    fn test_mark_processed_renames_with_prefix() {
        let tmp = TempDir::new().expect("tempdir");
        let input = tmp.path().join("HealthAutoExport-a.json");
        std::fs::write(&input, "[]").unwrap();
        std::fs::write(tmp.path().join("_HealthAutoExport-a.json"), "old").unwrap();

        let mut diagnostics = Diagnostics::new();
        let renamed = mark_processed(&input, &mut diagnostics).unwrap();

        assert_eq!(renamed, tmp.path().join("_HealthAutoExport-a_1.json"));
        assert!(!input.exists());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_mark_processed_missing_file_warns() {
        let tmp = TempDir::new().expect("tempdir");
        let mut diagnostics = Diagnostics::new();

        assert!(mark_processed(&tmp.path().join("gone.json"), &mut diagnostics).is_none());
        assert!(matches!(
            diagnostics.warnings()[0],
            Warning::RenameFailed { .. }
        ));
    }

    #[test]
    fn test_night_file_name() {
        let record = SummaryRecord {
            night: NaiveDate::from_ymd_opt(2024, 11, 22).unwrap(),
            window_start: UTC.with_ymd_and_hms(2024, 11, 22, 19, 0, 0).unwrap(),
            window_end: UTC.with_ymd_and_hms(2024, 11, 23, 11, 0, 0).unwrap(),
            recorded_start: Some(UTC.with_ymd_and_hms(2024, 11, 22, 23, 5, 0).unwrap()),
            recorded_end: Some(UTC.with_ymd_and_hms(2024, 11, 23, 6, 40, 0).unwrap()),
            sleep_onset: None,
            sleep_offset: None,
            total_sleep_seconds: 0,
            onset_latency_seconds: 0,
            stage_seconds: StageDurations::default(),
            waso_seconds: 0,
            awakenings: 0,
            sleep_efficiency: 0,
            hypnogram: "[]".to_string(),
        };

        assert_eq!(night_file_name(&record), "Apple2Dreem_2024-11-22_23-05_06-40.csv");
        assert_eq!(
            batch_file_name(&record.window_start, &record.window_end),
            "Apple2Dreem_2024-11-22_2024-11-23.csv"
        );
    }
}
