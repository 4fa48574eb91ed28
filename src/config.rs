//! Configuration management and validation.
//!
//! Provides the column synonym tables used by the normalizer, the rule the
//! statistics engine uses to pick representative specification limits, and
//! the set of file extensions accepted for ingestion.

use crate::constants::{ACCEPTED_EXTENSIONS, LSL_HEADERS, SERIAL_HEADERS, USL_HEADERS, VALUE_HEADERS};
use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Ordered header candidates for each canonical record field.
///
/// The first candidate present in a row wins. Matching is exact and
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSynonyms {
    pub value: Vec<String>,
    pub usl: Vec<String>,
    pub lsl: Vec<String>,
    pub serial_number: Vec<String>,
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        fn owned(headers: &[&str]) -> Vec<String> {
            headers.iter().map(|h| h.to_string()).collect()
        }

        Self {
            value: owned(VALUE_HEADERS),
            usl: owned(USL_HEADERS),
            lsl: owned(LSL_HEADERS),
            serial_number: owned(SERIAL_HEADERS),
        }
    }
}

impl ColumnSynonyms {
    /// Append an extra candidate for the measured value
    pub fn with_value_header(mut self, header: impl Into<String>) -> Self {
        self.value.push(header.into());
        self
    }

    /// Append an extra candidate for the upper limit
    pub fn with_usl_header(mut self, header: impl Into<String>) -> Self {
        self.usl.push(header.into());
        self
    }

    /// Append an extra candidate for the lower limit
    pub fn with_lsl_header(mut self, header: impl Into<String>) -> Self {
        self.lsl.push(header.into());
        self
    }

    /// Append an extra candidate for the serial number
    pub fn with_serial_header(mut self, header: impl Into<String>) -> Self {
        self.serial_number.push(header.into());
        self
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("value", &self.value),
            ("usl", &self.usl),
            ("lsl", &self.lsl),
            ("serial_number", &self.serial_number),
        ];

        for (field, candidates) in fields {
            if candidates.is_empty() {
                return Err(InsightError::configuration(format!(
                    "no header candidates configured for field '{}'",
                    field
                )));
            }
            if candidates.iter().any(|c| c.is_empty()) {
                return Err(InsightError::configuration(format!(
                    "empty header candidate configured for field '{}'",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// How the statistics engine picks one (USL, LSL) pair for capability indices
/// when limits are stored per record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPolicy {
    /// Use the limits of the first record in the unified view
    #[default]
    FirstRecord,
    /// Withhold capability indices unless every record shares the same limits
    RequireUniform,
}

/// Global configuration for measurement ingestion and analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Header synonym tables for field resolution
    pub synonyms: ColumnSynonyms,

    /// Representative limit selection for capability indices
    pub limit_policy: LimitPolicy,

    /// Lower-case file extensions accepted for ingestion
    pub accepted_extensions: Vec<String>,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            synonyms: ColumnSynonyms::default(),
            limit_policy: LimitPolicy::default(),
            accepted_extensions: ACCEPTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl InsightConfig {
    /// Load configuration from a JSON file, filling omitted fields with defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| InsightError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(content)
            .map_err(|e| InsightError::configuration(format!("invalid JSON: {}", e)))?;
        config.accepted_extensions = config
            .accepted_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive ingestion
    pub fn validate(&self) -> Result<()> {
        self.synonyms.validate()?;
        if self.accepted_extensions.is_empty() {
            return Err(InsightError::configuration(
                "at least one accepted file extension is required",
            ));
        }
        Ok(())
    }

    /// Replace the synonym tables
    pub fn with_synonyms(mut self, synonyms: ColumnSynonyms) -> Self {
        self.synonyms = synonyms;
        self
    }

    /// Set the representative limit policy
    pub fn with_limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.limit_policy = policy;
        self
    }

    /// Replace the accepted extensions
    pub fn with_accepted_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_extensions = extensions
            .into_iter()
            .map(|e| {
                let extension: String = e.into();
                extension.trim_start_matches('.').to_ascii_lowercase()
            })
            .collect();
        self
    }

    /// Check whether a file name carries an accepted extension
    pub fn accepts(&self, file_name: &str) -> bool {
        let extension = file_extension(file_name);
        self.accepted_extensions.iter().any(|e| *e == extension)
    }
}

/// Lower-case extension of a file name, empty when there is none
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}
