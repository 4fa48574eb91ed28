//! Measurement Insights Library
//!
//! Ingests quality-inspection measurement spreadsheets, normalizes their rows
//! into one canonical record schema and derives process-capability
//! statistics from the merged data.
//!
//! This library provides tools for:
//! - Decoding the first sheet of workbook (`.xlsx`, `.xls`, `.ods`, ...) and CSV files
//! - Resolving bilingual and synonymous column headers into canonical fields
//! - All-or-nothing batch ingestion into an in-memory repository
//! - Rebuilding a densely re-indexed unified view whenever files come or go
//! - Summary statistics, out-of-spec rates and Cp/Cpk capability indices
//!
//! ## Usage
//!
//! ```rust
//! use measurement_insights::{InsightSession, StagedFile};
//!
//! # async fn example() -> measurement_insights::Result<()> {
//! let mut session = InsightSession::default();
//! session.stage([StagedFile::from_bytes(
//!     "lot-1.csv",
//!     b"Value,USL,LSL\n10,12,8\n15,12,8\n".to_vec(),
//! )]);
//! session.process_staged().await?;
//!
//! let stats = session.stats().expect("records were ingested");
//! assert_eq!(stats.out_of_spec_count, 1);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalizer;
pub mod repository;
pub mod session;
pub mod stats;
pub mod unified;

// Re-export commonly used types
pub use config::{ColumnSynonyms, InsightConfig, LimitPolicy};
pub use decoder::{SheetDecoder, SpreadsheetDecoder};
pub use error::{InsightError, Result};
pub use ingest::FileIngestor;
pub use models::{CellValue, FileEntry, FileSummary, MeasurementRecord, RawRow, SourceFile};
pub use normalizer::{ColumnResolver, RecordNormalizer};
pub use repository::RepositoryStore;
pub use session::{AnalysisSnapshot, InsightSession, StagedFile};
pub use stats::{CapabilityIndices, SpecLimits, StatsSummary, compute_stats, compute_stats_with_policy};
pub use unified::build_unified_view;
