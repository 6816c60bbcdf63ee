use replica_serde::SerdeErr;
use thiserror::Error;

/// Errors that can occur while decoding a replication message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The leading byte does not name a known message kind
    #[error("Unknown message type id {id}")]
    UnknownMessageType { id: u8 },

    /// The payload ended early or held an invalid value
    #[error("Malformed message payload: {0}")]
    Malformed(#[from] SerdeErr),

    /// The payload decoded but bytes were left over
    #[error("Message has {count} trailing bytes")]
    TrailingBytes { count: usize },
}
