//! Bare record list adapter
//!
//! Parses a top-level JSON array of `{startDate, endDate, value}` objects.

use crate::error::ConvertError;
use crate::types::RawRecord;

use super::ExportAdapter;

/// Record list adapter
pub struct RecordListAdapter;

impl RecordListAdapter {
    pub(crate) fn from_value(value: serde_json::Value) -> Result<Vec<RawRecord>, ConvertError> {
        Ok(serde_json::from_value(value)?)
    }
}

impl ExportAdapter for RecordListAdapter {
    fn parse(&self, raw_json: &str) -> Result<Vec<RawRecord>, ConvertError> {
        let records: Vec<RawRecord> = serde_json::from_str(raw_json)?;
        Ok(records)
    }
}
