//! Application constants for measurement ingestion
//!
//! Header synonym tables, accepted file types and display defaults used
//! throughout the crate. The synonym tables seed
//! [`crate::config::ColumnSynonyms::default`]; additional synonyms belong in a
//! configuration file rather than here.

// =============================================================================
// Column Header Synonyms
// =============================================================================

/// Header candidates for the measured value, in resolution order
pub const VALUE_HEADERS: &[&str] = &["测量值", "Value", "value"];

/// Header candidates for the upper specification limit, in resolution order
pub const USL_HEADERS: &[&str] = &["上限", "USL", "upper"];

/// Header candidates for the lower specification limit, in resolution order
pub const LSL_HEADERS: &[&str] = &["下限", "LSL", "lower"];

/// Header candidates for the unit serial number, in resolution order
pub const SERIAL_HEADERS: &[&str] = &["序列号", "Serial", "SN", "No."];

// =============================================================================
// File Handling
// =============================================================================

/// File extensions the default decoder understands
pub const ACCEPTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];

/// Extensions decoded as delimited text rather than workbooks
pub const DELIMITED_EXTENSIONS: &[&str] = &["csv"];

/// Separator between the parts of a generated file entry id
pub const ID_SEPARATOR: char = '-';

// =============================================================================
// Display
// =============================================================================

/// Bytes per kilobyte when reporting file sizes
pub const BYTES_PER_KB: f64 = 1024.0;

/// Number of out-of-spec records the CLI lists before truncating
pub const MAX_LISTED_VIOLATIONS: usize = 50;
