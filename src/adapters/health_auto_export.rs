//! Health Auto Export adapter
//!
//! Parses the JSON envelope written by the Health Auto Export app:
//! `{"data": {"metrics": [{"name": "sleep_analysis", "units": "hr", "data": [...]}]}}`.
//! The `sleep_analysis` metric is used when present, otherwise the first
//! metric that carries data.

use serde::Deserialize;

use crate::error::ConvertError;
use crate::types::RawRecord;

use super::ExportAdapter;

/// Metric name Health Auto Export uses for sleep stages
const SLEEP_METRIC: &str = "sleep_analysis";

/// Health Auto Export adapter
pub struct HealthAutoExportAdapter;

impl HealthAutoExportAdapter {
    pub(crate) fn from_value(value: serde_json::Value) -> Result<Vec<RawRecord>, ConvertError> {
        let payload: ExportPayload = serde_json::from_value(value)?;
        extract_sleep_records(payload)
    }
}

impl ExportAdapter for HealthAutoExportAdapter {
    fn parse(&self, raw_json: &str) -> Result<Vec<RawRecord>, ConvertError> {
        let payload: ExportPayload = serde_json::from_str(raw_json)?;
        extract_sleep_records(payload)
    }
}

fn extract_sleep_records(payload: ExportPayload) -> Result<Vec<RawRecord>, ConvertError> {
    let data = payload
        .data
        .ok_or_else(|| ConvertError::MissingField("data".to_string()))?;
    let metrics = data
        .metrics
        .ok_or_else(|| ConvertError::MissingField("data.metrics".to_string()))?;

    let position = metrics
        .iter()
        .position(|m| m.name.as_deref() == Some(SLEEP_METRIC) && m.data.is_some())
        .or_else(|| metrics.iter().position(|m| m.data.is_some()));

    position
        .and_then(|i| metrics.into_iter().nth(i))
        .and_then(|metric| metric.data)
        .ok_or_else(|| ConvertError::MissingField("data.metrics[].data".to_string()))
}

// Health Auto Export document structures

#[derive(Debug, Deserialize)]
struct ExportPayload {
    data: Option<ExportData>,
}

#[derive(Debug, Deserialize)]
struct ExportData {
    metrics: Option<Vec<ExportMetric>>,
}

#[derive(Debug, Deserialize)]
struct ExportMetric {
    name: Option<String>,
    data: Option<Vec<RawRecord>>,
}
