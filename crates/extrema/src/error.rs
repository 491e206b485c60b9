use std::io::ErrorKind;
use thiserror::Error;

/// A row that cannot be folded into the aggregation.
///
/// Rejections are per-row and never abort a run: the aggregator leaves its
/// state untouched and the caller decides whether to collect, report or
/// escalate them.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidRecord {
    /// The row has no group key at all.
    #[error("row {source_index}: missing group key")]
    MissingKey { source_index: usize },

    /// The group key is present but empty or whitespace only.
    #[error("row {source_index}: empty group key")]
    EmptyKey { source_index: usize },

    /// The timestamp is absent or could not be resolved to an ordered value.
    #[error("row {source_index}: missing or unparsable timestamp")]
    MissingTimestamp { source_index: usize },

    /// The measurement is absent or could not be parsed.
    #[error("row {source_index}: missing or unparsable value")]
    MissingValue { source_index: usize },

    /// The measurement is NaN or infinite.
    #[error("row {source_index}: value {value} is not a finite number")]
    NonFiniteValue { source_index: usize, value: f64 },
}

impl InvalidRecord {
    /// Index of the offending row in its source.
    pub fn source_index(&self) -> usize {
        match self {
            InvalidRecord::MissingKey { source_index }
            | InvalidRecord::EmptyKey { source_index }
            | InvalidRecord::MissingTimestamp { source_index }
            | InvalidRecord::MissingValue { source_index }
            | InvalidRecord::NonFiniteValue { source_index, .. } => *source_index,
        }
    }
}

/// A failure reading rows from a source.  Unlike [`InvalidRecord`], these
/// end the read.
#[derive(Debug, Error)]
pub enum SourceError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV (unbalanced quotes, ragged rows, invalid UTF-8).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configured column is not present in the header row.
    #[error("column {0:?} not found in header")]
    MissingColumn(String),

    /// The column configuration itself is unusable.
    #[error("invalid column configuration: {0}")]
    InvalidConfig(String),
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Io(error) => error.kind(),
            SourceError::Csv(error) => match error.kind() {
                csv::ErrorKind::Io(error) => error.kind(),
                _ => ErrorKind::InvalidData,
            },
            SourceError::MissingColumn(_) => ErrorKind::NotFound,
            SourceError::InvalidConfig(_) => ErrorKind::InvalidInput,
        }
    }
}
