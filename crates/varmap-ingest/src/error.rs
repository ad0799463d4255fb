#![deny(unsafe_code)]

use std::path::PathBuf;

/// Failure to turn input bytes into a table. Nothing is applied when this is returned.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },

    #[error("duplicate column {column:?} in header")]
    DuplicateColumn { column: String },

    #[error("record {record} has {found} values but the header has {expected} columns")]
    RecordTooWide {
        record: usize,
        found: usize,
        expected: usize,
    },
}

impl From<csv::Error> for IngestError {
    fn from(source: csv::Error) -> Self {
        Self::Csv { source }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
