//! Error types for ingestion, merging, rendering and configuration.
//!
//! None of these are fatal. The ingest engine and the render engine catch
//! them at the poll-cycle / per-signal boundary and degrade to skip-and-report.

use std::path::PathBuf;

/// Errors raised while reading one source.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Path missing, not a regular file, or zero length. Retried next cycle.
    #[error("source '{path}' unavailable: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Header, first data line and parsed table disagree on column count.
    #[error(
        "format mismatch in '{path}': header has {header_cols} columns, \
         first data line has {data_cols}, parsed table has {table_cols}"
    )]
    FormatMismatch {
        path: PathBuf,
        header_cols: usize,
        data_cols: usize,
        table_cols: usize,
    },

    /// The file parsed but yielded no data rows.
    #[error("source '{path}' contains no data rows")]
    EmptyTable { path: PathBuf },

    /// The header produced no first column to relabel as time.
    #[error("source '{path}' has no time column")]
    MissingTimeColumn { path: PathBuf },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl IngestError {
    /// Whether the next poll cycle should simply try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::SourceUnavailable { .. }
                | IngestError::EmptyTable { .. }
                | IngestError::Io { .. }
        )
    }
}

/// Errors from joining two signal tables on their time key.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    #[error("time key contains non-finite values")]
    TimeKeyNotFinite,

    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Errors resolving a single signal during a render pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("no source with index {0}")]
    UnknownSource(i32),

    #[error("signal '{name}' not found in source {index}")]
    UnknownSignal { index: i32, name: String },

    #[error("interpolation failed: {0}")]
    InterpolationFailed(String),
}

/// Errors addressing the assignment grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("slot ({tab}, {slot}) is outside the layout")]
    SlotOutOfRange { tab: usize, slot: usize },
}

/// Errors loading or saving the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HOME is not set")]
    NoHome,
}
