use replica_serde::{NetworkStream, Serde, SerdeErr};

/// Globally meaningful identifier of a connected participant
pub type ClientId = u32;

/// Per-participant frame counter stamped on outbound state. Wraps around;
/// compare with `sequence_greater_than`.
pub type Frame = u32;

/// The server always uses this identifier
pub const SERVER_CLIENT_ID: ClientId = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostType {
    Server,
    Client,
}

impl HostType {
    pub fn invert(self) -> Self {
        match self {
            HostType::Server => HostType::Client,
            HostType::Client => HostType::Server,
        }
    }
}

/// Per-participant view of who owns a replicated object and what the local
/// participant may do with it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NetworkObjectRole {
    /// Not replicated
    #[default]
    None,
    /// This participant owns the object and is the sole source of truth
    OwnedAuthoritative,
    /// State arrives from the owner; local writes are overwritten
    Replicated,
    /// May simulate locally (prediction), but authoritative updates win
    ReplicatedSimulated,
}

impl NetworkObjectRole {
    pub fn is_replicated(self) -> bool {
        matches!(
            self,
            NetworkObjectRole::Replicated | NetworkObjectRole::ReplicatedSimulated
        )
    }

    /// Roles that accept dirty marks. Only `OwnedAuthoritative` state is ever
    /// sent; a simulated mirror's mark only records a local prediction.
    pub fn can_author_state(self) -> bool {
        matches!(
            self,
            NetworkObjectRole::OwnedAuthoritative | NetworkObjectRole::ReplicatedSimulated
        )
    }

    /// Role a participant that does not own the object adopts when told about `self`
    pub fn for_mirrors(self) -> Self {
        match self {
            NetworkObjectRole::ReplicatedSimulated => NetworkObjectRole::ReplicatedSimulated,
            _ => NetworkObjectRole::Replicated,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NetworkObjectRole::None => "None",
            NetworkObjectRole::OwnedAuthoritative => "OwnedAuthoritative",
            NetworkObjectRole::Replicated => "Replicated",
            NetworkObjectRole::ReplicatedSimulated => "ReplicatedSimulated",
        }
    }
}

impl Serde for NetworkObjectRole {
    fn ser(&self, stream: &mut NetworkStream) {
        let index: u8 = match self {
            NetworkObjectRole::None => 0,
            NetworkObjectRole::OwnedAuthoritative => 1,
            NetworkObjectRole::Replicated => 2,
            NetworkObjectRole::ReplicatedSimulated => 3,
        };
        index.ser(stream);
    }

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
        match u8::de(stream)? {
            0 => Ok(NetworkObjectRole::None),
            1 => Ok(NetworkObjectRole::OwnedAuthoritative),
            2 => Ok(NetworkObjectRole::Replicated),
            3 => Ok(NetworkObjectRole::ReplicatedSimulated),
            other => Err(SerdeErr::InvalidValue {
                type_name: "NetworkObjectRole",
                value: u64::from(other),
            }),
        }
    }
}
