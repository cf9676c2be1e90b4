//! Consumer error type.

use thiserror::Error;

/// Errors surfaced by the consumer service. Transient transport absence
/// is handled internally with back-off and never reaches the caller.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("consumer worker already started")]
    AlreadyStarted,

    #[error(transparent)]
    Transport(#[from] simmotion_telemetry_transport::TransportError),
}
