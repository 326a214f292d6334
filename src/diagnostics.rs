//! Non-fatal warning collection
//!
//! Record- and file-level problems never abort a run. Each one is logged via
//! `tracing` as it happens and kept so callers can report totals at the end.

use std::fmt;
use std::path::PathBuf;

use tracing::warn;

/// A recoverable problem encountered while converting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Stage label not in the mapping table; treated as unknown
    UnknownStage { label: String },
    /// Start or end timestamp could not be parsed; record skipped
    InvalidTimestamp { value: String },
    /// End not strictly after start; record skipped
    NonPositiveInterval { start: String, end: String },
    /// Shifted timestamps fall outside the supported date range; record skipped
    ShiftOutOfRange { start: String, shift_seconds: i64 },
    /// Whole file skipped (unreadable, malformed JSON, missing keys)
    SkippedFile { path: PathBuf, reason: String },
    /// Processed input could not be renamed
    RenameFailed { path: PathBuf, reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownStage { label } => {
                write!(f, "unrecognized sleep stage '{label}', using Unknown")
            }
            Warning::InvalidTimestamp { value } => {
                write!(f, "invalid timestamp '{value}', record skipped")
            }
            Warning::NonPositiveInterval { start, end } => {
                write!(f, "record ends ({end}) before it starts ({start}), skipped")
            }
            Warning::ShiftOutOfRange {
                start,
                shift_seconds,
            } => {
                write!(
                    f,
                    "shifting record at '{start}' by {shift_seconds}s leaves the supported date range, skipped"
                )
            }
            Warning::SkippedFile { path, reason } => {
                write!(f, "skipping file {}: {reason}", path.display())
            }
            Warning::RenameFailed { path, reason } => {
                write!(f, "unable to rename processed file {}: {reason}", path.display())
            }
        }
    }
}

/// Accumulates warnings for a run
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and keep a warning
    pub fn warn(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_accumulate_in_order() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());

        diagnostics.warn(Warning::UnknownStage {
            label: "Nap".to_string(),
        });
        diagnostics.warn(Warning::InvalidTimestamp {
            value: "yesterday".to_string(),
        });

        assert_eq!(diagnostics.len(), 2);
        assert!(matches!(
            diagnostics.warnings()[0],
            Warning::UnknownStage { .. }
        ));
        assert_eq!(
            diagnostics.warnings()[1].to_string(),
            "invalid timestamp 'yesterday', record skipped"
        );
    }
}
