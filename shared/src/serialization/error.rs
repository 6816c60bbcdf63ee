use replica_serde::SerdeErr;
use thiserror::Error;

/// Errors that can occur when invoking a registered serializer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializerError {
    /// No serializer is registered for this type, the object cannot be replicated
    #[error("No serializer registered for type {type_key}")]
    NotRegistered { type_key: String },

    /// The serializer ran but failed, the stream was rolled back
    #[error("Serializer for type {type_key} failed: {source}")]
    Failed {
        type_key: String,
        #[source]
        source: SerdeErr,
    },
}
