//! Error handling for measurement ingestion.
//!
//! Only batch-level failures surface to callers. Row-level anomalies
//! (malformed cells, missing headers) and empty files are absorbed during
//! normalization and never become errors.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown to users when a staged batch cannot be committed.
pub const BATCH_FAILURE_MESSAGE: &str = "Failed to process staged files. Check file formats.";

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode spreadsheet '{file}': {reason}")]
    Decode { file: String, reason: String },

    #[error("Unsupported file format for '{file}' (extension: {extension:?})")]
    UnsupportedFormat { file: String, extension: String },

    #[error("{} (failed on '{file}' after {processed} file(s))", BATCH_FAILURE_MESSAGE)]
    BatchAborted {
        file: String,
        processed: usize,
        #[source]
        source: Box<InsightError>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("No staged file at position {index} ({staged} staged)")]
    StagedIndexOutOfRange { index: usize, staged: usize },
}

impl InsightError {
    /// Create a decode failure for one file
    pub fn decode(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a per-file failure into the aggregate batch error
    pub fn batch_aborted(file: impl Into<String>, processed: usize, cause: InsightError) -> Self {
        Self::BatchAborted {
            file: file.into(),
            processed,
            source: Box::new(cause),
        }
    }

    /// True for failures caused by unreadable or undecodable file content
    pub fn is_decode_failure(&self) -> bool {
        match self {
            Self::Decode { .. } | Self::UnsupportedFormat { .. } | Self::Io { .. } => true,
            Self::BatchAborted { source, .. } => source.is_decode_failure(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
