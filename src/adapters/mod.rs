//! Export payload adapters
//!
//! This module provides adapters that parse raw export JSON documents into
//! [`RawRecord`] lists for the interval parser.

mod health_auto_export;
mod record_list;

pub use health_auto_export::HealthAutoExportAdapter;
pub use record_list::RecordListAdapter;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::types::RawRecord;

/// Trait for export payload adapters
pub trait ExportAdapter {
    /// Parse raw JSON into sleep records
    fn parse(&self, raw_json: &str) -> Result<Vec<RawRecord>, ConvertError>;
}

/// Supported input document layouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Detect the layout from the document shape
    #[default]
    Auto,
    /// `{"data": {"metrics": [{"name": ..., "data": [...]}]}}`
    HealthAutoExport,
    /// Top-level array of records
    RecordList,
}

/// Adapter that picks a layout per document
pub struct AutoDetectAdapter;

impl ExportAdapter for AutoDetectAdapter {
    fn parse(&self, raw_json: &str) -> Result<Vec<RawRecord>, ConvertError> {
        let value: serde_json::Value = serde_json::from_str(raw_json)?;
        match &value {
            serde_json::Value::Array(_) => RecordListAdapter::from_value(value),
            serde_json::Value::Object(map) if map.contains_key("data") => {
                HealthAutoExportAdapter::from_value(value)
            }
            _ => Err(ConvertError::MissingField(
                "expected a record array or a 'data' object".to_string(),
            )),
        }
    }
}

/// Parse a document with the adapter for `format`
pub fn parse_export(format: ExportFormat, raw_json: &str) -> Result<Vec<RawRecord>, ConvertError> {
    let adapter: &dyn ExportAdapter = match format {
        ExportFormat::Auto => &AutoDetectAdapter,
        ExportFormat::HealthAutoExport => &HealthAutoExportAdapter,
        ExportFormat::RecordList => &RecordListAdapter,
    };
    adapter.parse(raw_json)
}
