//! # Replica Shared
//! Object replication core: which objects exist on which participants, who
//! may author their state, and how spawns, despawns, ownership changes,
//! state and remote procedure calls travel between participants.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use replica_serde::{NetworkStream, Serde, SerdeErr, StreamCheckpoint, UnsignedVariableInteger};

mod config;
mod connection;
mod error;
mod messages;
mod protocol;
mod replicator;
mod rpc;
mod serialization;
mod transport;
mod types;
mod world;
mod wrapping_number;

pub use config::ReplicationConfig;
pub use connection::session::Session;
pub use error::ReplicationError;
pub use messages::{
    channel::ChannelType,
    error::MessageError,
    message_type::MessageType,
    replication_message::{
        DespawnMessage, OutgoingMessage, OwnershipChangeMessage, ReplicationMessage,
        RpcCallMessage, SpawnMessage, StateDeltaMessage,
    },
};
pub use protocol::{Protocol, ProtocolError, ProtocolPlugin};
pub use replicator::{ReplicationTick, Replicator};
pub use rpc::{
    rpc_dispatcher::RpcDispatcher,
    rpc_table::{RpcContext, RpcEntry, RpcExecuteFn, RpcTable},
    stream_pool::StreamPool,
};
pub use serialization::{
    error::SerializerError,
    network_serialize::NetworkSerialize,
    serializer_registry::{SerializeFn, SerializeMode, SerializerEntry, SerializerRegistry, SerializerTag},
    type_key::TypeKey,
};
pub use transport::Transport;
pub use types::{ClientId, Frame, HostType, NetworkObjectRole, SERVER_CLIENT_ID};
pub use world::{
    object_id::{ObjectId, ObjectIdGenerator},
    object_world::ObjectWorld,
    ownership_resolver::OwnershipResolver,
    recent_ids::RecentIds,
    replication_entry::ReplicationEntry,
    replication_registry::ReplicationRegistry,
    spawn_coordinator::SpawnCoordinator,
};
pub use wrapping_number::{sequence_greater_than, sequence_less_than};
