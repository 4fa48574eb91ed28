//! Core data structures for measurement ingestion.
//!
//! Defines raw decoded rows, canonical measurement records, ingested file
//! entries and the lightweight summaries handed to presentation code.

use crate::constants::BYTES_PER_KB;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw spreadsheet cell as produced by the decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Whether the cell carries anything a header lookup should accept
    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Text(text) => !text.trim().is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => true,
        }
    }
}

/// Render a number the way a spreadsheet shows it: integral values lose `.0`
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// One decoded row: header string to raw cell value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: HashMap<String, CellValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell, replacing any earlier value under the same header
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(header.into(), value.into());
    }

    /// Raw cell under an exact header
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells.get(header)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (header, value) in iter {
            row.insert(header, value);
        }
        row
    }
}

/// A canonical measurement record.
///
/// `index` is only meaningful inside a unified view; records held by a
/// [`FileEntry`] carry a placeholder. Fields are read through accessors so
/// the out-of-spec flag always matches the value and limits:
///
/// ```compile_fail
/// use measurement_insights::MeasurementRecord;
///
/// let mut record = MeasurementRecord::new("SN-1", 10.0, 12.0, 8.0);
/// record.value = 100.0;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    index: usize,
    serial_number: String,
    value: f64,
    usl: f64,
    lsl: f64,
    is_out_of_spec: bool,
}

impl MeasurementRecord {
    /// Build a record, deriving the out-of-spec flag from the value and limits
    pub fn new(serial_number: impl Into<String>, value: f64, usl: f64, lsl: f64) -> Self {
        Self {
            index: 0,
            serial_number: serial_number.into(),
            value,
            usl,
            lsl,
            is_out_of_spec: value > usl || value < lsl,
        }
    }

    /// Position in the unified view; `0` outside of one
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn usl(&self) -> f64 {
        self.usl
    }

    pub fn lsl(&self) -> f64 {
        self.lsl
    }

    /// True iff the value lies outside `[lsl, usl]`
    pub fn is_out_of_spec(&self) -> bool {
        self.is_out_of_spec
    }

    /// Copy of this record carrying a new position
    pub fn with_index(&self, index: usize) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }
}

/// Raw file content staged for ingestion
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Wrap in-memory content; the size is the byte length
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }
}

/// An ingested file and the records it produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub data: Vec<MeasurementRecord>,
}

impl FileEntry {
    pub fn record_count(&self) -> usize {
        self.data.len()
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            size: self.size,
            record_count: self.data.len(),
        }
    }
}

/// Repository listing row for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub record_count: usize,
}

impl FileSummary {
    /// Size in kilobytes, as shown in repository listings
    pub fn size_kb(&self) -> f64 {
        self.size as f64 / BYTES_PER_KB
    }
}
