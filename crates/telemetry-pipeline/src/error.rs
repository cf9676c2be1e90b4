//! Pipeline error type.

use thiserror::Error;

/// Errors raised while attaching publish sinks. The per-frame path never
/// returns errors; publish failures are logged and absorbed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid UDP target {target}: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error(transparent)]
    Transport(#[from] simmotion_telemetry_transport::TransportError),
}
