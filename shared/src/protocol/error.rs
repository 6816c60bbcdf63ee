use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Protocol is locked and cannot be modified
    #[error("Protocol is already locked and cannot be modified. Protocol.lock() has been called and no further changes are allowed")]
    AlreadyLocked,

    /// An RPC that nobody is allowed to invoke can never run
    #[error("RPC {type_key}::{name} must be invocable by the server, the clients, or both")]
    UninvocableRpc { type_key: String, name: String },
}
