use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Everything that can stop a reshape.
///
/// Configuration errors are raised before any series file is opened and are
/// fully attributable to the caller's options or annotations. The remaining
/// variants come from the data itself (including a row without a file name)
/// and abort the whole invocation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("column idx={index} does not contain csv file names")]
    NotSeriesColumn { index: usize },

    #[error("no column contains csv file names")]
    NoSeriesColumn,

    #[error("column idx={index} declares no base uri")]
    MissingBaseUri { index: usize },

    #[error("base uri '{uri}' is not a local file location")]
    UnsupportedBaseUri { uri: String },

    #[error("row {row} of column idx={index} holds no file name")]
    MissingFileName { index: usize, row: usize },

    #[error("no main resource specified")]
    NoMainResource,

    #[error("resource '{0}' not found")]
    UnknownResource(String),

    #[error("column idx={index} references resource '{found}', expected '{expected}'")]
    ReferenceMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {reason}", path.display())]
    MalformedSeries { path: PathBuf, reason: String },

    #[error("{}: timestamps diverge from the first series at row {row}", path.display())]
    TimestampMismatch { path: PathBuf, row: usize },

    #[error("{}: {reason}", path.display())]
    MalformedTable { path: PathBuf, reason: String },

    #[error("column '{column}' has {found} values, expected {expected}")]
    RaggedTable {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("column '{column}' row {row}: cell does not fit {expected}")]
    CellType {
        column: String,
        row: usize,
        expected: arrow::datatypes::DataType,
    },

    #[error("invalid json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    /// True for errors caused by the configuration or annotations rather than
    /// by reading data.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::NotSeriesColumn { .. }
                | Error::NoSeriesColumn
                | Error::MissingBaseUri { .. }
                | Error::UnsupportedBaseUri { .. }
                | Error::NoMainResource
                | Error::UnknownResource(_)
                | Error::ReferenceMismatch { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Error::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
