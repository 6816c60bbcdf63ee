use replica_serde::{NetworkStream, Serde, SerdeErr};

/// Ordering/reliability class a message is sent on. The transport owns the
/// actual guarantees; the core only selects the class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelType {
    Unreliable,
    UnreliableOrdered,
    Reliable,
    ReliableOrdered,
}

impl ChannelType {
    pub fn is_reliable(self) -> bool {
        matches!(self, ChannelType::Reliable | ChannelType::ReliableOrdered)
    }

    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            ChannelType::UnreliableOrdered | ChannelType::ReliableOrdered
        )
    }
}

impl Serde for ChannelType {
    fn ser(&self, stream: &mut NetworkStream) {
        let index: u8 = match self {
            ChannelType::Unreliable => 0,
            ChannelType::UnreliableOrdered => 1,
            ChannelType::Reliable => 2,
            ChannelType::ReliableOrdered => 3,
        };
        index.ser(stream);
    }

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
        match u8::de(stream)? {
            0 => Ok(ChannelType::Unreliable),
            1 => Ok(ChannelType::UnreliableOrdered),
            2 => Ok(ChannelType::Reliable),
            3 => Ok(ChannelType::ReliableOrdered),
            other => Err(SerdeErr::InvalidValue {
                type_name: "ChannelType",
                value: u64::from(other),
            }),
        }
    }
}
