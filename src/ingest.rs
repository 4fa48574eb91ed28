//! File ingestion: decode, normalize and package files as [`FileEntry`]s.
//!
//! A batch is all-or-nothing. The first file that cannot be read or decoded
//! aborts the whole batch with a single [`InsightError::BatchAborted`], and
//! none of the batch's entries are returned. Files that decode to zero rows
//! are skipped without error.

use crate::config::{InsightConfig, file_extension};
use crate::constants::ID_SEPARATOR;
use crate::decoder::{SheetDecoder, SpreadsheetDecoder};
use crate::error::{InsightError, Result};
use crate::models::{FileEntry, SourceFile};
use crate::normalizer::{RecordNormalizer, fallback_serial};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Generates file entry ids that stay unique for the ingestor's lifetime
#[derive(Debug, Default)]
pub struct EntryIdGenerator {
    sequence: u64,
}

impl EntryIdGenerator {
    /// `<unix millis>-<sequence>-<file name>`
    pub fn next_id(&mut self, file_name: &str) -> String {
        let id = format!(
            "{}{sep}{}{sep}{}",
            Utc::now().timestamp_millis(),
            self.sequence,
            file_name,
            sep = ID_SEPARATOR
        );
        self.sequence += 1;
        id
    }
}

/// Applies decoding and normalization to files
pub struct FileIngestor {
    config: InsightConfig,
    normalizer: RecordNormalizer,
    decoder: Box<dyn SheetDecoder + Send + Sync>,
    ids: EntryIdGenerator,
}

impl std::fmt::Debug for FileIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIngestor")
            .field("config", &self.config)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl FileIngestor {
    /// Create an ingestor using the default spreadsheet decoder
    pub fn new(config: InsightConfig) -> Self {
        Self::with_decoder(config, SpreadsheetDecoder::new())
    }

    /// Create an ingestor with a custom decoding collaborator
    pub fn with_decoder(config: InsightConfig, decoder: impl SheetDecoder + Send + Sync + 'static) -> Self {
        Self {
            normalizer: RecordNormalizer::new(&config.synonyms),
            config,
            decoder: Box::new(decoder),
            ids: EntryIdGenerator::default(),
        }
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Ingest one file. `Ok(None)` means the file held no rows.
    pub fn ingest_file(&mut self, file: &SourceFile) -> Result<Option<FileEntry>> {
        if !self.config.accepts(&file.name) {
            return Err(InsightError::UnsupportedFormat {
                file: file.name.clone(),
                extension: file_extension(&file.name),
            });
        }

        let rows = self.decoder.decode(&file.name, &file.bytes)?;
        if rows.is_empty() {
            warn!("Skipped file (no data): {}", file.name);
            return Ok(None);
        }

        let data = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                self.normalizer
                    .normalize(row, &fallback_serial(&file.name, i + 1))
            })
            .collect::<Vec<_>>();

        let out_of_spec = data.iter().filter(|r| r.is_out_of_spec()).count();
        debug!(
            "Normalized {} records from {} ({} out of spec)",
            data.len(),
            file.name,
            out_of_spec
        );

        Ok(Some(FileEntry {
            id: self.ids.next_id(&file.name),
            name: file.name.clone(),
            size: file.size,
            data,
        }))
    }

    /// Ingest a batch atomically: every non-empty file becomes an entry, or
    /// the batch fails as a whole.
    pub fn ingest_batch(&mut self, files: &[SourceFile]) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::with_capacity(files.len());

        for (processed, file) in files.iter().enumerate() {
            match self.ingest_file(file) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    warn!("Batch aborted on {}: {}", file.name, e);
                    return Err(InsightError::batch_aborted(&file.name, processed, e));
                }
            }
        }

        debug!(
            "Batch of {} files produced {} entries",
            files.len(),
            entries.len()
        );
        Ok(entries)
    }

    /// Read files from disk and ingest them as one batch
    pub async fn ingest_paths(&mut self, paths: &[PathBuf]) -> Result<Vec<FileEntry>> {
        let mut files = Vec::with_capacity(paths.len());

        for (processed, path) in paths.iter().enumerate() {
            match read_source_file(path).await {
                Ok(file) => files.push(file),
                Err(e) => return Err(InsightError::batch_aborted(display_name(path), processed, e)),
            }
        }

        self.ingest_batch(&files)
    }
}

/// Read a file into memory, naming it after its final path component
pub async fn read_source_file(path: &Path) -> Result<SourceFile> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| InsightError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(SourceFile::new(display_name(path), bytes))
}

/// File name component of a path, or the whole path when there is none
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, RawRow};
    use std::collections::HashMap;

    /// Decoder returning canned rows per file name; unknown names fail
    struct CannedDecoder {
        sheets: HashMap<String, Vec<RawRow>>,
    }

    impl CannedDecoder {
        fn new(sheets: Vec<(&str, Vec<RawRow>)>) -> Self {
            Self {
                sheets: sheets
                    .into_iter()
                    .map(|(name, rows)| (name.to_string(), rows))
                    .collect(),
            }
        }
    }

    impl SheetDecoder for CannedDecoder {
        fn decode(&self, name: &str, _bytes: &[u8]) -> Result<Vec<RawRow>> {
            self.sheets
                .get(name)
                .cloned()
                .ok_or_else(|| InsightError::decode(name, "not a spreadsheet"))
        }
    }

    fn measurement(value: f64) -> RawRow {
        [
            ("Value", CellValue::from(value)),
            ("USL", CellValue::from(12.0)),
            ("LSL", CellValue::from(8.0)),
        ]
        .into_iter()
        .collect()
    }

    fn source(name: &str) -> SourceFile {
        SourceFile::new(name, vec![0u8; 128])
    }

    #[test]
    fn test_ingest_file_builds_entry() {
        let decoder = CannedDecoder::new(vec![("a.xlsx", vec![measurement(10.0), measurement(15.0)])]);
        let mut ingestor = FileIngestor::with_decoder(InsightConfig::default(), decoder);

        let entry = ingestor.ingest_file(&source("a.xlsx")).unwrap().unwrap();

        assert_eq!(entry.name, "a.xlsx");
        assert_eq!(entry.size, 128);
        assert_eq!(entry.data.len(), 2);
        assert_eq!(entry.data[0].serial_number(), "a.xlsx-1");
        assert_eq!(entry.data[1].serial_number(), "a.xlsx-2");
        assert!(!entry.data[0].is_out_of_spec());
        assert!(entry.data[1].is_out_of_spec());
        assert!(entry.id.ends_with("-a.xlsx"));
    }

    #[test]
    fn test_empty_file_is_skipped_not_failed() {
        let decoder = CannedDecoder::new(vec![("empty.xlsx", vec![]), ("b.xlsx", vec![measurement(9.0)])]);
        let mut ingestor = FileIngestor::with_decoder(InsightConfig::default(), decoder);

        let entries = ingestor
            .ingest_batch(&[source("empty.xlsx"), source("b.xlsx")])
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "b.xlsx");
    }

    #[test]
    fn test_decode_failure_aborts_batch() {
        let decoder = CannedDecoder::new(vec![("good.xlsx", vec![measurement(9.0)])]);
        let mut ingestor = FileIngestor::with_decoder(InsightConfig::default(), decoder);

        let err = ingestor
            .ingest_batch(&[source("good.xlsx"), source("bad.xlsx"), source("good.xlsx")])
            .unwrap_err();

        match err {
            InsightError::BatchAborted {
                ref file,
                processed,
                ..
            } => {
                assert_eq!(file, "bad.xlsx");
                assert_eq!(processed, 1);
            }
            other => panic!("Expected BatchAborted, got {:?}", other),
        }
        assert!(err.is_decode_failure());
        assert!(err.to_string().starts_with("Failed to process staged files"));
    }

    #[test]
    fn test_unaccepted_extension_aborts_batch() {
        let decoder = CannedDecoder::new(vec![("notes.txt", vec![measurement(1.0)])]);
        let mut ingestor = FileIngestor::with_decoder(InsightConfig::default(), decoder);

        let err = ingestor.ingest_batch(&[source("notes.txt")]).unwrap_err();
        match err {
            InsightError::BatchAborted { source, .. } => {
                assert!(matches!(*source, InsightError::UnsupportedFormat { .. }))
            }
            other => panic!("Expected BatchAborted, got {:?}", other),
        }
    }

    #[test]
    fn test_same_name_files_get_distinct_ids() {
        let decoder = CannedDecoder::new(vec![("lot.xlsx", vec![measurement(10.0)])]);
        let mut ingestor = FileIngestor::with_decoder(InsightConfig::default(), decoder);

        let entries = ingestor
            .ingest_batch(&[source("lot.xlsx"), source("lot.xlsx")])
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_ne!(entries[0].id, entries[1].id);
    }

    #[test]
    fn test_id_generator_sequence() {
        let mut ids = EntryIdGenerator::default();
        let first = ids.next_id("x.csv");
        let second = ids.next_id("x.csv");
        assert!(first.contains("-0-x.csv"));
        assert!(second.contains("-1-x.csv"));
    }

    #[tokio::test]
    async fn test_ingest_paths_missing_file_aborts() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let present = temp_dir.path().join("present.csv");
        std::fs::write(&present, "Value,USL,LSL\n1,2,0\n").unwrap();
        let missing = temp_dir.path().join("missing.csv");

        let mut ingestor = FileIngestor::new(InsightConfig::default());
        let err = ingestor.ingest_paths(&[present, missing]).await.unwrap_err();

        match err {
            InsightError::BatchAborted { file, source, .. } => {
                assert_eq!(file, "missing.csv");
                assert!(matches!(*source, InsightError::Io { .. }));
            }
            other => panic!("Expected BatchAborted, got {:?}", other),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/data/lots/a.xlsx")), "a.xlsx");
    }
}
