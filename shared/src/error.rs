use thiserror::Error;

use crate::{
    messages::error::MessageError, serialization::error::SerializerError, ClientId, ObjectId,
};

/// Errors produced by replication operations.
///
/// The plain (non-`try_`) operations on `Replicator` log these and carry on;
/// the `try_` variants hand them back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    /// There is no active session, the operation has nothing to act on
    #[error("No active network session for '{operation}'")]
    Offline { operation: &'static str },

    /// The object was never added, or was already removed
    #[error("Object {object_id} is not registered - operation '{operation}' requires registration")]
    ObjectNotRegistered {
        object_id: ObjectId,
        operation: &'static str,
    },

    /// A second AddObject for the same id
    #[error("Object {object_id} is already registered")]
    ObjectAlreadyRegistered { object_id: ObjectId },

    /// Registering `parent` would make the object its own ancestor
    #[error("Object {object_id} cannot use {parent} as parent: the hierarchy would contain a cycle")]
    ParentCycle { object_id: ObjectId, parent: ObjectId },

    /// Ownership was pointed at a participant that is not connected
    #[error("Client {client_id} is not a connected participant")]
    UnknownParticipant { client_id: ClientId },

    /// A participant attempted something only the owner (or server) may do
    #[error("Authority violation on object {object_id} by client {client_id}: {reason}")]
    AuthorityViolation {
        object_id: ObjectId,
        client_id: ClientId,
        reason: &'static str,
    },

    /// Ownership was pointed at a participant that has no mirror of a spawned object
    #[error("Client {client_id} holds no mirror of object {object_id} and could never author it")]
    OwnerWithoutMirror {
        object_id: ObjectId,
        client_id: ClientId,
    },

    /// The requested role is not valid for this operation
    #[error("Role {role} is not valid for '{operation}'")]
    InvalidRole {
        role: &'static str,
        operation: &'static str,
    },

    /// No RPC is registered under this type and method name
    #[error("RPC {type_key}::{name} is not registered")]
    RpcNotRegistered { type_key: String, name: String },

    /// The RPC permission flags do not allow this participant to invoke it
    #[error("RPC {type_key}::{name} may not be invoked by a {invoker}")]
    RpcPermissionDenied {
        type_key: String,
        name: String,
        invoker: &'static str,
    },

    /// The object is registered but the world holds no instance for it
    #[error("Object {object_id} is registered but has no instance in the world")]
    MissingInstance { object_id: ObjectId },

    /// The receiver does not know how to build or read this type
    #[error("Schema mismatch for object {object_id}: type {type_key} is unknown locally")]
    SchemaMismatch { object_id: ObjectId, type_key: String },

    #[error(transparent)]
    Serializer(#[from] SerializerError),

    #[error(transparent)]
    Message(#[from] MessageError),
}
