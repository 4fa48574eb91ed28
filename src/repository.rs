//! Repository of ingested files.
//!
//! [`RepositoryStore`] is the single owner of every [`FileEntry`] and the
//! source of truth for which data currently exists. It holds no derived
//! data; the unified view and statistics are rebuilt from [`RepositoryStore::list_all`].

use crate::models::{FileEntry, FileSummary};
use tracing::info;

/// Ordered collection of ingested file entries
#[derive(Debug, Default)]
pub struct RepositoryStore {
    entries: Vec<FileEntry>,
    version: u64,
}

impl RepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append entries in order. Entries whose id is already stored are dropped.
    pub fn append_batch(&mut self, entries: Vec<FileEntry>) {
        let before = self.entries.len();
        for entry in entries {
            if self.contains(&entry.id) {
                continue;
            }
            self.entries.push(entry);
        }

        let added = self.entries.len() - before;
        if added > 0 {
            self.version += 1;
            info!(
                "Committed {} file(s) to repository ({} total)",
                added,
                self.entries.len()
            );
        }
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);

        let removed = self.entries.len() != before;
        if removed {
            self.version += 1;
            info!("Removed {} from repository", id);
        }
        removed
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.version += 1;
            info!("Repository cleared");
        }
    }

    /// Current entries in store order
    pub fn list_all(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records across all entries
    pub fn total_records(&self) -> usize {
        self.entries.iter().map(FileEntry::record_count).sum()
    }

    /// Counter bumped on every effective mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Listing rows for repository display
    pub fn summaries(&self) -> Vec<FileSummary> {
        self.entries.iter().map(FileEntry::summary).collect()
    }
}
