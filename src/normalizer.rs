//! Row normalization into canonical measurement records.
//!
//! Column names vary between exports (Chinese and English headers, short
//! forms, lower case), so each canonical field is resolved through an ordered
//! candidate list held by [`ColumnResolver`]. Normalization never fails:
//! missing or malformed numeric cells coerce to `0` and a missing serial
//! number falls back to `<file name>-<row position>`.

use crate::config::ColumnSynonyms;
use crate::models::{CellValue, MeasurementRecord, RawRow, format_number};
use regex::Regex;
use std::sync::LazyLock;

/// Leading decimal number, as accepted by lenient float parsing
static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("numeric prefix pattern")
});

/// Canonical record fields resolved from raw headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Value,
    Usl,
    Lsl,
    SerialNumber,
}

/// Ordered header-to-field mapping table
#[derive(Debug, Clone)]
pub struct ColumnResolver {
    mappings: Vec<(CanonicalField, Vec<String>)>,
}

impl ColumnResolver {
    pub fn new(synonyms: &ColumnSynonyms) -> Self {
        Self {
            mappings: vec![
                (CanonicalField::Value, synonyms.value.clone()),
                (CanonicalField::Usl, synonyms.usl.clone()),
                (CanonicalField::Lsl, synonyms.lsl.clone()),
                (CanonicalField::SerialNumber, synonyms.serial_number.clone()),
            ],
        }
    }

    /// Header candidates for a field, in resolution order
    pub fn candidates(&self, field: CanonicalField) -> &[String] {
        self.mappings
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, candidates)| candidates.as_slice())
            .unwrap_or(&[])
    }

    /// First candidate header present in the row, with its cell
    pub fn resolve<'r>(&self, row: &'r RawRow, field: CanonicalField) -> Option<(&str, &'r CellValue)> {
        self.candidates(field).iter().find_map(|header| {
            row.get(header)
                .filter(|cell| cell.is_present())
                .map(|cell| (header.as_str(), cell))
        })
    }
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::new(&ColumnSynonyms::default())
    }
}

/// Converts raw rows into [`MeasurementRecord`]s
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    resolver: ColumnResolver,
}

impl RecordNormalizer {
    pub fn new(synonyms: &ColumnSynonyms) -> Self {
        Self {
            resolver: ColumnResolver::new(synonyms),
        }
    }

    pub fn resolver(&self) -> &ColumnResolver {
        &self.resolver
    }

    /// Normalize one row. `fallback_serial` is used when no serial header is present.
    pub fn normalize(&self, row: &RawRow, fallback_serial: &str) -> MeasurementRecord {
        let value = self.numeric(row, CanonicalField::Value);
        let usl = self.numeric(row, CanonicalField::Usl);
        let lsl = self.numeric(row, CanonicalField::Lsl);

        let serial_number = self
            .resolver
            .resolve(row, CanonicalField::SerialNumber)
            .and_then(|(_, cell)| serial_text(cell))
            .unwrap_or_else(|| fallback_serial.to_string());

        MeasurementRecord::new(serial_number, value, usl, lsl)
    }

    fn numeric(&self, row: &RawRow, field: CanonicalField) -> f64 {
        self.resolver
            .resolve(row, field)
            .map(|(_, cell)| coerce_number(cell))
            .unwrap_or(0.0)
    }
}

/// Serial seed for a row without a serial header; `position` is 1-based
pub fn fallback_serial(file_name: &str, position: usize) -> String {
    format!("{}-{}", file_name, position)
}

/// Lenient numeric coercion: anything unparseable or non-finite becomes `0`
pub fn coerce_number(cell: &CellValue) -> f64 {
    let parsed = match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(text) => parse_leading_float(text),
        CellValue::Bool(_) | CellValue::Empty => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Parse the longest numeric prefix of `text`, ignoring surrounding whitespace
fn parse_leading_float(text: &str) -> Option<f64> {
    let found = NUMERIC_PREFIX.find(text.trim())?;
    found.as_str().parse::<f64>().ok()
}

fn serial_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Text(text) => Some(text.clone()),
        CellValue::Number(n) => Some(format_number(*n)),
        CellValue::Bool(b) => Some(b.to_string()),
        CellValue::Empty => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row<const N: usize>(cells: [(&str, CellValue); N]) -> RawRow {
        cells.into_iter().collect()
    }

    #[test]
    fn test_english_headers() {
        let normalizer = RecordNormalizer::default();
        let record = normalizer.normalize(
            &row([
                ("Value", 15.0.into()),
                ("USL", 12.0.into()),
                ("LSL", 8.0.into()),
                ("Serial", "U-77".into()),
            ]),
            "f.xlsx-1",
        );

        assert_eq!(record.value(), 15.0);
        assert_eq!(record.usl(), 12.0);
        assert_eq!(record.lsl(), 8.0);
        assert_eq!(record.serial_number(), "U-77");
        assert!(record.is_out_of_spec());
    }

    #[test]
    fn test_chinese_headers_take_precedence() {
        let normalizer = RecordNormalizer::default();
        let record = normalizer.normalize(
            &row([
                ("测量值", "9.5".into()),
                ("Value", 100.0.into()),
                ("上限", "10".into()),
                ("下限", "9".into()),
                ("序列号", "序-1".into()),
                ("SN", "ignored".into()),
            ]),
            "f.xlsx-1",
        );

        assert_eq!(record.value(), 9.5);
        assert_eq!(record.usl(), 10.0);
        assert_eq!(record.lsl(), 9.0);
        assert_eq!(record.serial_number(), "序-1");
        assert!(!record.is_out_of_spec());
    }

    #[test]
    fn test_lowercase_and_short_synonyms() {
        let normalizer = RecordNormalizer::default();
        let record = normalizer.normalize(
            &row([
                ("value", 3.0.into()),
                ("upper", 5.0.into()),
                ("lower", 1.0.into()),
                ("No.", 42.0.into()),
            ]),
            "f.csv-1",
        );

        assert_eq!(record.value(), 3.0);
        assert_eq!(record.usl(), 5.0);
        assert_eq!(record.lsl(), 1.0);
        assert_eq!(record.serial_number(), "42");
    }

    #[test]
    fn test_header_match_is_case_sensitive() {
        let normalizer = RecordNormalizer::default();
        let record = normalizer.normalize(&row([("VALUE", 3.0.into()), ("Usl", 5.0.into())]), "x-1");
        assert_eq!(record.value(), 0.0);
        assert_eq!(record.usl(), 0.0);
    }

    #[test]
    fn test_missing_fields_default_to_zero_and_fallback_serial() {
        let normalizer = RecordNormalizer::default();
        let record = normalizer.normalize(&row([("Comment", "n/a".into())]), &fallback_serial("lot.xlsx", 3));

        assert_eq!(record.value(), 0.0);
        assert_eq!(record.usl(), 0.0);
        assert_eq!(record.lsl(), 0.0);
        assert_eq!(record.serial_number(), "lot.xlsx-3");
        assert!(!record.is_out_of_spec());
    }

    #[test]
    fn test_zero_default_lower_limit_flags_negative_values() {
        let normalizer = RecordNormalizer::default();
        let record = normalizer.normalize(&row([("Value", (-0.5).into()), ("USL", 1.0.into())]), "x-1");
        assert_eq!(record.lsl(), 0.0);
        assert!(record.is_out_of_spec());
    }

    #[test]
    fn test_blank_cell_falls_through_to_next_synonym() {
        let normalizer = RecordNormalizer::default();
        let record = normalizer.normalize(
            &row([("测量值", "  ".into()), ("Value", 7.0.into()), ("SN", CellValue::Empty)]),
            "x-9",
        );
        assert_eq!(record.value(), 7.0);
        assert_eq!(record.serial_number(), "x-9");
    }

    #[test]
    fn test_numeric_zero_stops_synonym_search() {
        let normalizer = RecordNormalizer::default();
        let record = normalizer.normalize(
            &row([("测量值", 0.0.into()), ("Value", 7.0.into()), ("上限", "0".into()), ("USL", 9.0.into())]),
            "x-1",
        );
        // A literal zero is a present cell, not a missing one
        assert_eq!(record.value(), 0.0);
        assert_eq!(record.usl(), 0.0);
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(coerce_number(&"12.5".into()), 12.5);
        assert_eq!(coerce_number(&" -3e2 ".into()), -300.0);
        assert_eq!(coerce_number(&"12.5mm".into()), 12.5);
        assert_eq!(coerce_number(&".5".into()), 0.5);
        assert_eq!(coerce_number(&"1e".into()), 1.0);
        assert_eq!(coerce_number(&"abc".into()), 0.0);
        assert_eq!(coerce_number(&"".into()), 0.0);
        assert_eq!(coerce_number(&true.into()), 0.0);
        assert_eq!(coerce_number(&f64::NAN.into()), 0.0);
        assert_eq!(coerce_number(&f64::INFINITY.into()), 0.0);
    }

    #[test]
    fn test_out_of_spec_matches_comparison_for_garbage_rows() {
        let normalizer = RecordNormalizer::default();
        let rows = [
            row([("Value", "x".into()), ("USL", "y".into()), ("LSL", "z".into())]),
            row([("Value", "5".into()), ("USL", "oops".into())]),
            row([("Value", 2.0.into()), ("USL", 1.0.into()), ("LSL", 3.0.into())]),
        ];
        for (i, raw) in rows.iter().enumerate() {
            let record = normalizer.normalize(raw, &fallback_serial("g.csv", i + 1));
            assert_eq!(
                record.is_out_of_spec(),
                record.value() > record.usl() || record.value() < record.lsl()
            );
        }
    }

    #[test]
    fn test_resolver_uses_configured_synonyms() {
        let synonyms = ColumnSynonyms::default().with_value_header("Messwert");
        let normalizer = RecordNormalizer::new(&synonyms);
        let raw = row([("Messwert", 4.0.into())]);

        let (header, _) = normalizer.resolver().resolve(&raw, CanonicalField::Value).unwrap();
        assert_eq!(header, "Messwert");
        assert_eq!(normalizer.normalize(&raw, "x-1").value(), 4.0);
    }
}
