//! Error types for measurement aggregation.
//!
//! Discovery and ingestion failures are typed so the caller can tell the
//! benign "nothing to do" cases apart from schema violations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure raised while discovering, parsing, or aggregating measurement runs.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no files matching '{pattern}' found in {}", dir.display())]
    NoInputFiles { dir: PathBuf, pattern: String },
    #[error("input files contained no measurements")]
    EmptyInput,
    #[error("{}: key '{key}' is not a non-negative integer", path.display())]
    MalformedKey { path: PathBuf, key: String },
    #[error("{}: record for key '{key}' is malformed: {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        key: String,
        reason: String,
    },
    #[error("{}: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },
    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AnalysisError {
    /// Whether this error means "there was nothing to aggregate".
    ///
    /// Both cases are reported to the user and end the run cleanly.
    pub fn is_no_input(&self) -> bool {
        matches!(self, Self::NoInputFiles { .. } | Self::EmptyInput)
    }
}
