//! Spreadsheet decoding into ordered row objects.
//!
//! The [`SheetDecoder`] trait is the boundary to whatever turns file bytes
//! into rows. [`SpreadsheetDecoder`] is the default implementation: workbook
//! formats go through `calamine`, delimited text through `csv`. Only the first
//! sheet of a workbook is read. The first row supplies the headers and every
//! following non-blank row becomes one [`RawRow`].

use crate::config::file_extension;
use crate::constants::DELIMITED_EXTENSIONS;
use crate::error::{InsightError, Result};
use crate::models::{CellValue, RawRow, format_number};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::collections::HashMap;
use std::io::Cursor;
use tracing::debug;

/// Turns one file's content into an ordered sequence of rows
pub trait SheetDecoder {
    /// Decode `bytes` of the file called `name`.
    ///
    /// An empty result is valid and means the file holds no data rows.
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Vec<RawRow>>;
}

/// Default decoder selecting a reader by file extension
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetDecoder;

impl SpreadsheetDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_workbook(&self, name: &str, bytes: &[u8]) -> Result<Vec<RawRow>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| InsightError::decode(name, e))?;

        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| InsightError::decode(name, e))?,
            None => {
                debug!("Workbook {} has no sheets", name);
                return Ok(Vec::new());
            }
        };

        let mut rows = range.rows();
        let Some(header_cells) = rows.next() else {
            return Ok(Vec::new());
        };
        let headers = HeaderRow::new(header_cells.iter().map(header_text));

        Ok(rows
            .filter_map(|cells| headers.build_row(cells.iter().map(workbook_cell)))
            .collect())
    }

    fn decode_delimited(&self, name: &str, bytes: &[u8]) -> Result<Vec<RawRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| InsightError::decode(name, e))?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();
        let headers = HeaderRow::new(headers);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| InsightError::decode(name, e))?;
            if let Some(row) = headers.build_row(record.iter().map(text_cell)) {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

impl SheetDecoder for SpreadsheetDecoder {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Vec<RawRow>> {
        let extension = file_extension(name);
        let rows = if DELIMITED_EXTENSIONS.contains(&extension.as_str()) {
            self.decode_delimited(name, bytes)?
        } else {
            self.decode_workbook(name, bytes)?
        };
        debug!("Decoded {} rows from {}", rows.len(), name);
        Ok(rows)
    }
}

/// Column headers of a sheet, de-duplicated the way sheet exports do it
struct HeaderRow {
    /// `None` marks a column with a blank header, which is dropped
    names: Vec<Option<String>>,
}

impl HeaderRow {
    fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let names = raw
            .into_iter()
            .map(|header| {
                let header = header.into();
                if header.trim().is_empty() {
                    return None;
                }
                // Repeated headers become "Name_1", "Name_2", ...
                let count = seen.entry(header.clone()).or_insert(0);
                let name = if *count == 0 {
                    header
                } else {
                    format!("{}_{}", header, count)
                };
                *count += 1;
                Some(name)
            })
            .collect();
        Self { names }
    }

    /// Pair cells with headers; blank rows yield `None`
    fn build_row<I>(&self, cells: I) -> Option<RawRow>
    where
        I: IntoIterator<Item = CellValue>,
    {
        let mut row = RawRow::new();
        for (header, cell) in self.names.iter().zip(cells) {
            if let Some(header) = header {
                if cell.is_present() {
                    row.insert(header.clone(), cell);
                }
            }
        }
        (!row.is_empty()).then_some(row)
    }
}

fn header_text(cell: &Data) -> String {
    match workbook_cell(cell) {
        CellValue::Text(text) => text,
        CellValue::Number(n) => format_number(n),
        CellValue::Bool(b) => b.to_string().to_uppercase(),
        CellValue::Empty => String::new(),
    }
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        // Dates are exposed as their spreadsheet serial number
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

fn text_cell(raw: &str) -> CellValue {
    if raw.trim().is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(raw.to_string())
    }
}
