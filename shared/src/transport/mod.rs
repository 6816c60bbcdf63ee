use crate::{messages::channel::ChannelType, ClientId};

/// Packet delivery between participants.
///
/// Framing, reliability and ordering belong to the implementation. Sends are
/// fire-and-forget; received payloads are queued until drained by the tick.
pub trait Transport: Send {
    fn send(&mut self, targets: &[ClientId], channel: ChannelType, payload: &[u8]);

    /// Next queued `(sender, payload)`, if any
    fn receive(&mut self) -> Option<(ClientId, Vec<u8>)>;
}
