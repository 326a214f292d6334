//! Stage normalization
//!
//! Maps heterogeneous source stage labels onto the canonical [`SleepStage`]
//! set. The mapping is total: unrecognized labels become `Unknown` and a
//! warning is recorded.

use crate::diagnostics::{Diagnostics, Warning};
use crate::types::SleepStage;

/// Lowercased source labels and their canonical stage
///
/// Apple Health exports use `Core`/`Deep`/`REM`/`Awake`/`InBed`; the raw
/// HealthKit identifiers (`asleepCore` etc.) show up in some exporters.
const STAGE_TABLE: &[(&str, SleepStage)] = &[
    ("core", SleepStage::Light),
    ("light", SleepStage::Light),
    ("asleep", SleepStage::Light),
    ("asleepcore", SleepStage::Light),
    ("deep", SleepStage::Deep),
    ("asleepdeep", SleepStage::Deep),
    ("rem", SleepStage::Rem),
    ("asleeprem", SleepStage::Rem),
    ("awake", SleepStage::Awake),
    ("wake", SleepStage::Awake),
    ("inbed", SleepStage::Unknown),
    ("asleepunspecified", SleepStage::Unknown),
    ("unknown", SleepStage::Unknown),
];

/// Normalizer for source stage labels
pub struct StageNormalizer;

impl StageNormalizer {
    /// Map a label to its canonical stage, case-insensitively
    pub fn normalize(label: &str, diagnostics: &mut Diagnostics) -> SleepStage {
        match Self::lookup(label) {
            Some(stage) => stage,
            None => {
                diagnostics.warn(Warning::UnknownStage {
                    label: label.to_string(),
                });
                SleepStage::Unknown
            }
        }
    }

    /// Table lookup without the fallback
    pub fn lookup(label: &str) -> Option<SleepStage> {
        let key = label.trim().to_lowercase();
        STAGE_TABLE
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, stage)| *stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            StageNormalizer::normalize("Core", &mut diagnostics),
            SleepStage::Light
        );
        assert_eq!(
            StageNormalizer::normalize("Deep", &mut diagnostics),
            SleepStage::Deep
        );
        assert_eq!(
            StageNormalizer::normalize("REM", &mut diagnostics),
            SleepStage::Rem
        );
        assert_eq!(
            StageNormalizer::normalize("Awake", &mut diagnostics),
            SleepStage::Awake
        );
        assert_eq!(
            StageNormalizer::normalize("InBed", &mut diagnostics),
            SleepStage::Unknown
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            StageNormalizer::normalize("  rEm \n", &mut diagnostics),
            SleepStage::Rem
        );
        assert_eq!(
            StageNormalizer::normalize("ASLEEPCORE", &mut diagnostics),
            SleepStage::Light
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unrecognized_label_falls_back_with_warning() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            StageNormalizer::normalize("Nap", &mut diagnostics),
            SleepStage::Unknown
        );
        assert_eq!(
            StageNormalizer::normalize("", &mut diagnostics),
            SleepStage::Unknown
        );
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics.warnings()[0],
            Warning::UnknownStage {
                label: "Nap".to_string()
            }
        );
    }
}
