use std::fmt;

use replica_serde::{NetworkStream, Serde, SerdeErr};

use crate::ClientId;

/// Handle identifying a replicable object instance.
///
/// Ids produced by `ObjectIdGenerator` carry the creating participant in the
/// high 32 bits, so a mirror can reuse the sender's id without a remapping
/// table. Ids are not stable across process restarts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub const fn to_u64(self) -> u64 {
        self.0
    }

    /// Participant that generated this id
    pub const fn creator(self) -> ClientId {
        (self.0 >> 32) as ClientId
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.creator(), self.0 & 0xffff_ffff)
    }
}

impl Serde for ObjectId {
    fn ser(&self, stream: &mut NetworkStream) {
        self.0.ser(stream);
    }

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
        Ok(Self(u64::de(stream)?))
    }
}

/// Hands out network-unique `ObjectId`s for one participant
pub struct ObjectIdGenerator {
    client_id: ClientId,
    next: u32,
}

impl ObjectIdGenerator {
    pub fn new(client_id: ClientId) -> Self {
        Self { client_id, next: 1 }
    }

    pub fn generate(&mut self) -> ObjectId {
        let sequence = self.next;
        self.next = self.next.wrapping_add(1).max(1);
        ObjectId((u64::from(self.client_id) << 32) | u64::from(sequence))
    }
}
