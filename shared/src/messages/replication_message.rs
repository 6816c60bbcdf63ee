use replica_serde::{NetworkStream, Serde};

use crate::{
    messages::{channel::ChannelType, error::MessageError, message_type::MessageType},
    ClientId, Frame, NetworkObjectRole, ObjectId, TypeKey,
};

/// Publishes an object to remote participants
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnMessage {
    pub object_id: ObjectId,
    pub type_key: TypeKey,
    pub owner_client_id: ClientId,
    /// Role adopted by receivers that are not the owner
    pub role: NetworkObjectRole,
    pub parent: Option<ObjectId>,
    /// Clients the server should forward a client spawn to, `None` for all
    pub targets: Option<Vec<ClientId>>,
    pub state: Vec<u8>,
}

/// Removes the mirrors of an object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DespawnMessage {
    pub object_id: ObjectId,
}

/// Hands authority over an object (and optionally its children) to a new owner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipChangeMessage {
    pub object_id: ObjectId,
    pub new_owner_client_id: ClientId,
    /// Role adopted by receivers that are not the new owner
    pub new_role: NetworkObjectRole,
    pub hierarchical: bool,
}

/// Latest authoritative state of an object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateDeltaMessage {
    pub object_id: ObjectId,
    /// Frame of the owner that produced the state
    pub frame: Frame,
    pub state: Vec<u8>,
}

/// One-way remote procedure call on an object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcCallMessage {
    pub object_id: ObjectId,
    pub type_key: TypeKey,
    pub name: String,
    pub args: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicationMessage {
    Spawn(SpawnMessage),
    Despawn(DespawnMessage),
    OwnershipChange(OwnershipChangeMessage),
    StateDelta(StateDeltaMessage),
    RpcCall(RpcCallMessage),
}

impl ReplicationMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ReplicationMessage::Spawn(_) => MessageType::Spawn,
            ReplicationMessage::Despawn(_) => MessageType::Despawn,
            ReplicationMessage::OwnershipChange(_) => MessageType::OwnershipChange,
            ReplicationMessage::StateDelta(_) => MessageType::StateDelta,
            ReplicationMessage::RpcCall(_) => MessageType::RpcCall,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        match self {
            ReplicationMessage::Spawn(message) => message.object_id,
            ReplicationMessage::Despawn(message) => message.object_id,
            ReplicationMessage::OwnershipChange(message) => message.object_id,
            ReplicationMessage::StateDelta(message) => message.object_id,
            ReplicationMessage::RpcCall(message) => message.object_id,
        }
    }

    pub fn write(&self, stream: &mut NetworkStream) {
        self.message_type().to_u8().ser(stream);
        match self {
            ReplicationMessage::Spawn(message) => {
                message.object_id.ser(stream);
                message.type_key.ser(stream);
                message.owner_client_id.ser(stream);
                message.role.ser(stream);
                message.parent.ser(stream);
                message.targets.ser(stream);
                stream.write_blob(&message.state);
            }
            ReplicationMessage::Despawn(message) => {
                message.object_id.ser(stream);
            }
            ReplicationMessage::OwnershipChange(message) => {
                message.object_id.ser(stream);
                message.new_owner_client_id.ser(stream);
                message.new_role.ser(stream);
                message.hierarchical.ser(stream);
            }
            ReplicationMessage::StateDelta(message) => {
                message.object_id.ser(stream);
                message.frame.ser(stream);
                stream.write_blob(&message.state);
            }
            ReplicationMessage::RpcCall(message) => {
                message.object_id.ser(stream);
                message.type_key.ser(stream);
                message.name.ser(stream);
                stream.write_blob(&message.args);
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut stream = NetworkStream::new();
        self.write(&mut stream);
        stream.into_bytes()
    }

    pub fn read(stream: &mut NetworkStream) -> Result<Self, MessageError> {
        let message_type = MessageType::from_u8(u8::de(stream)?)?;
        let message = match message_type {
            MessageType::Spawn => ReplicationMessage::Spawn(SpawnMessage {
                object_id: ObjectId::de(stream)?,
                type_key: TypeKey::de(stream)?,
                owner_client_id: ClientId::de(stream)?,
                role: NetworkObjectRole::de(stream)?,
                parent: Option::<ObjectId>::de(stream)?,
                targets: Option::<Vec<ClientId>>::de(stream)?,
                state: stream.read_blob()?,
            }),
            MessageType::Despawn => ReplicationMessage::Despawn(DespawnMessage {
                object_id: ObjectId::de(stream)?,
            }),
            MessageType::OwnershipChange => {
                ReplicationMessage::OwnershipChange(OwnershipChangeMessage {
                    object_id: ObjectId::de(stream)?,
                    new_owner_client_id: ClientId::de(stream)?,
                    new_role: NetworkObjectRole::de(stream)?,
                    hierarchical: bool::de(stream)?,
                })
            }
            MessageType::StateDelta => ReplicationMessage::StateDelta(StateDeltaMessage {
                object_id: ObjectId::de(stream)?,
                frame: Frame::de(stream)?,
                state: stream.read_blob()?,
            }),
            MessageType::RpcCall => ReplicationMessage::RpcCall(RpcCallMessage {
                object_id: ObjectId::de(stream)?,
                type_key: TypeKey::de(stream)?,
                name: String::de(stream)?,
                args: stream.read_blob()?,
            }),
        };
        Ok(message)
    }

    /// Decodes exactly one message from `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut stream = NetworkStream::from_bytes(bytes.to_vec());
        let message = Self::read(&mut stream)?;
        if stream.remaining() > 0 {
            return Err(MessageError::TrailingBytes {
                count: stream.remaining(),
            });
        }
        Ok(message)
    }
}

/// A message waiting to be handed to the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub targets: Vec<ClientId>,
    pub channel: ChannelType,
    pub message: ReplicationMessage,
}

impl OutgoingMessage {
    pub fn new(targets: Vec<ClientId>, channel: ChannelType, message: ReplicationMessage) -> Self {
        Self {
            targets,
            channel,
            message,
        }
    }
}
