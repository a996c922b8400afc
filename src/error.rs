//! Errors raised while discovering and parsing charts.

use std::path::PathBuf;

use itertools::Itertools;
use thiserror::Error;

use crate::chart::Format;

/// An error occurred when loading charts from the disk.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ChartError {
    /// The folder looks like the format, but no chart could be read from it.
    #[error("no {format} charts found in {}", path.display())]
    NoChartsFound {
        /// The chart-set folder or file.
        path: PathBuf,
        /// The format which matched the folder.
        format: Format,
    },
    /// One or more lane indices have no entry in the active lane map.
    ///
    /// Every distinct offending index of the file is collected before this is raised.
    #[error("unknown lanes {} in {}", lanes.iter().join(", "), path.display())]
    UnknownLanes {
        /// The chart file.
        path: PathBuf,
        /// Sorted, distinct lane indices.
        lanes: Vec<i64>,
    },
    /// The source is syntactically readable but structurally unusable.
    #[error("malformed chart {}: {reason}", path.display())]
    Malformed {
        /// The chart file.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },
    /// JSON syntax or schema violation.
    #[error("invalid json in {}: {source}", path.display())]
    Json {
        /// The chart file.
        path: PathBuf,
        /// The underlying error, with the JSON path of the offending value.
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    /// Reading from the disk failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file or folder being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// No parser recognizes the folder.
    #[error("no parser recognizes {}", path.display())]
    UnknownFormat {
        /// The chart-set folder.
        path: PathBuf,
    },
    /// A chart set has no chart for the requested key.
    #[error("no chart for difficulty {difficulty:?} and instrument {instrument:?}")]
    UnknownDifficulty {
        /// Requested difficulty.
        difficulty: String,
        /// Requested instrument, if any.
        instrument: Option<String>,
    },
}

impl ChartError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unknown_lanes(
        path: impl Into<PathBuf>,
        lanes: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self::UnknownLanes {
            path: path.into(),
            lanes: lanes.into_iter().sorted().dedup().collect(),
        }
    }
}

/// A short for `std::result::Result<T, ChartError>`.
pub type Result<T> = std::result::Result<T, ChartError>;
