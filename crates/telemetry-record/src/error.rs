//! Record and schema error types.

use thiserror::Error;

/// Errors raised by record (de)serialization and schema loading.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record buffer has wrong size: expected {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },

    #[error("unknown channel name: {0}")]
    UnknownChannel(String),

    #[error("channel {0} appears more than once in the layout")]
    DuplicateChannel(String),

    #[error("layout is incomplete: {missing} of {total} channels missing")]
    IncompleteLayout { missing: usize, total: usize },

    #[error("failed to parse layout file: {0}")]
    Parse(#[from] serde_json::Error),
}
