use crate::messages::error::MessageError;

/// Leading byte of every replication message
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Spawn,
    Despawn,
    OwnershipChange,
    StateDelta,
    RpcCall,
}

impl MessageType {
    pub fn to_u8(self) -> u8 {
        match self {
            MessageType::Spawn => 1,
            MessageType::Despawn => 2,
            MessageType::OwnershipChange => 3,
            MessageType::StateDelta => 4,
            MessageType::RpcCall => 5,
        }
    }

    pub fn from_u8(id: u8) -> Result<Self, MessageError> {
        match id {
            1 => Ok(MessageType::Spawn),
            2 => Ok(MessageType::Despawn),
            3 => Ok(MessageType::OwnershipChange),
            4 => Ok(MessageType::StateDelta),
            5 => Ok(MessageType::RpcCall),
            _ => Err(MessageError::UnknownMessageType { id }),
        }
    }
}
