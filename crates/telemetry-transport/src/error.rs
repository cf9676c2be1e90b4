//! Transport error type.

use thiserror::Error;

/// Errors raised by the shared-memory region and the UDP channels.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The named region or lock does not exist yet. Callers treat this as
    /// transient and retry with back-off.
    #[error("shared telemetry region not found: {name}")]
    NotFound { name: String },

    /// An OS call failed.
    #[error("{op} failed: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A read or write did not fit the region.
    #[error("buffer of {len} bytes exceeds region size {region}")]
    OutOfBounds { len: usize, region: usize },

    /// Socket-level failure.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub(crate) fn os(op: &'static str) -> TransportError {
        TransportError::Os {
            op,
            source: std::io::Error::last_os_error(),
        }
    }
}
