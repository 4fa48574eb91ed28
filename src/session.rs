//! Analysis session: staging area, repository and derived views.
//!
//! [`InsightSession`] is the explicit owner of all mutable state. Staged files
//! are read and ingested as one batch by [`InsightSession::process_staged`];
//! the unified view and statistics are rebuilt after every effective
//! repository mutation and cached against the repository version.
//!
//! Mutation goes through `&mut self`, so one batch at a time per session is
//! enforced by the borrow checker. Callers sharing a session across tasks
//! must wrap it in their own lock.

use crate::config::InsightConfig;
use crate::decoder::SheetDecoder;
use crate::error::{InsightError, Result};
use crate::ingest::{FileIngestor, display_name, read_source_file};
use crate::models::{FileEntry, FileSummary, MeasurementRecord, SourceFile};
use crate::repository::RepositoryStore;
use crate::stats::{StatsSummary, compute_stats_with_policy};
use crate::unified::build_unified_view;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where a staged file's content comes from
#[derive(Debug, Clone)]
pub enum StagedSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A file waiting to be processed
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub name: String,
    pub size: u64,
    pub source: StagedSource,
}

impl StagedFile {
    /// Stage a file on disk, reading only its metadata
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| InsightError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            name: display_name(path),
            size: metadata.len(),
            source: StagedSource::Path(path.to_path_buf()),
        })
    }

    /// Stage in-memory content
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: StagedSource::Memory(bytes),
        }
    }

    async fn load(&self) -> Result<SourceFile> {
        match &self.source {
            StagedSource::Path(path) => {
                let mut file = read_source_file(path).await?;
                file.name = self.name.clone();
                Ok(file)
            }
            StagedSource::Memory(bytes) => Ok(SourceFile::new(self.name.clone(), bytes.clone())),
        }
    }
}

/// Read-only values handed to the diagnostic-analysis collaborator
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSnapshot {
    pub records: Vec<MeasurementRecord>,
    pub stats: Option<StatsSummary>,
}

/// Derived values cached against a repository version
#[derive(Debug, Default)]
struct DerivedView {
    version: u64,
    records: Vec<MeasurementRecord>,
    stats: Option<StatsSummary>,
}

/// Owner of the staging area, repository and derived views
#[derive(Debug)]
pub struct InsightSession {
    ingestor: FileIngestor,
    store: RepositoryStore,
    staged: Vec<StagedFile>,
    derived: DerivedView,
}

impl InsightSession {
    pub fn new(config: InsightConfig) -> Self {
        Self::from_ingestor(FileIngestor::new(config))
    }

    /// Session whose files are decoded by a custom collaborator
    pub fn with_decoder(config: InsightConfig, decoder: impl SheetDecoder + Send + Sync + 'static) -> Self {
        Self::from_ingestor(FileIngestor::with_decoder(config, decoder))
    }

    fn from_ingestor(ingestor: FileIngestor) -> Self {
        Self {
            ingestor,
            store: RepositoryStore::new(),
            staged: Vec::new(),
            derived: DerivedView::default(),
        }
    }

    pub fn config(&self) -> &InsightConfig {
        self.ingestor.config()
    }

    // ---------------------------------------------------------------------
    // Staging
    // ---------------------------------------------------------------------

    /// Add files to the end of the staging area
    pub fn stage(&mut self, files: impl IntoIterator<Item = StagedFile>) {
        let before = self.staged.len();
        self.staged.extend(files);
        debug!("Staged {} file(s)", self.staged.len() - before);
    }

    /// Remove the staged file at `index`
    pub fn unstage(&mut self, index: usize) -> Result<StagedFile> {
        if index >= self.staged.len() {
            return Err(InsightError::StagedIndexOutOfRange {
                index,
                staged: self.staged.len(),
            });
        }
        Ok(self.staged.remove(index))
    }

    pub fn staged(&self) -> &[StagedFile] {
        &self.staged
    }

    /// Read and ingest every staged file as one batch.
    ///
    /// On success the new entries are committed, the staging area is cleared
    /// and the committed entries' summaries are returned. On failure neither
    /// the repository nor the staging area changes.
    pub async fn process_staged(&mut self) -> Result<Vec<FileSummary>> {
        if self.staged.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.ingest_staged().await?;
        let summaries = entries.iter().map(FileEntry::summary).collect();

        self.store.append_batch(entries);
        self.staged.clear();
        self.refresh();
        Ok(summaries)
    }

    async fn ingest_staged(&mut self) -> Result<Vec<FileEntry>> {
        let mut files = Vec::with_capacity(self.staged.len());
        for (processed, staged) in self.staged.iter().enumerate() {
            match staged.load().await {
                Ok(file) => files.push(file),
                Err(e) => return Err(InsightError::batch_aborted(&staged.name, processed, e)),
            }
        }

        info!("Processing {} staged file(s)", files.len());
        self.ingestor.ingest_batch(&files)
    }

    // ---------------------------------------------------------------------
    // Repository
    // ---------------------------------------------------------------------

    /// Delete an ingested file. Returns whether it existed.
    pub fn remove_file(&mut self, id: &str) -> bool {
        let removed = self.store.remove(id);
        if removed {
            self.refresh();
        }
        removed
    }

    /// Empty the repository and the staging area
    pub fn clear_system(&mut self) {
        self.store.clear();
        self.staged.clear();
        self.refresh();
    }

    pub fn repository(&self) -> &RepositoryStore {
        &self.store
    }

    pub fn files(&self) -> Vec<FileSummary> {
        self.store.summaries()
    }

    /// `(file count, record count)`
    pub fn overview(&self) -> (usize, usize) {
        (self.store.len(), self.derived.records.len())
    }

    // ---------------------------------------------------------------------
    // Derived views
    // ---------------------------------------------------------------------

    /// Merged, re-indexed records of every retained file
    pub fn unified_view(&self) -> &[MeasurementRecord] {
        &self.derived.records
    }

    /// Statistics over the unified view; `None` when there is no data
    pub fn stats(&self) -> Option<&StatsSummary> {
        self.derived.stats.as_ref()
    }

    /// Copy of the unified view and statistics for downstream analysis
    pub fn snapshot(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            records: self.derived.records.clone(),
            stats: self.derived.stats.clone(),
        }
    }

    fn refresh(&mut self) {
        let version = self.store.version();
        if version == self.derived.version {
            return;
        }

        let records = build_unified_view(self.store.list_all());
        let stats = compute_stats_with_policy(&records, self.config().limit_policy);
        debug!(
            "Rebuilt unified view at version {}: {} records",
            version,
            records.len()
        );
        self.derived = DerivedView {
            version,
            records,
            stats,
        };
    }
}

impl Default for InsightSession {
    fn default() -> Self {
        Self::new(InsightConfig::default())
    }
}
