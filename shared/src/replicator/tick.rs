use log::{debug, trace, warn};

use crate::{
    connection::session::Session,
    error::ReplicationError,
    messages::{
        channel::ChannelType,
        replication_message::{OutgoingMessage, ReplicationMessage, StateDeltaMessage},
    },
    protocol::Protocol,
    world::{
        object_world::{read_state, write_state, ObjectWorld},
        replication_registry::ReplicationRegistry,
    },
    wrapping_number::sequence_greater_than,
    ClientId, Frame, NetworkObjectRole, SERVER_CLIENT_ID,
};

/// Frame counter plus the outbound state sweep and inbound state handling
pub struct ReplicationTick {
    state_channel: ChannelType,
    frame: Frame,
}

impl ReplicationTick {
    pub fn new(state_channel: ChannelType) -> Self {
        Self {
            state_channel,
            frame: 0,
        }
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn advance(&mut self) -> Frame {
        self.frame = self.frame.wrapping_add(1);
        self.frame
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }

    /// Serializes every dirty object this participant owns, plus (on the
    /// server) state received from client owners, and sends it to the
    /// object's mirrors. The owner never gets its own state back.
    ///
    /// Dirty `ReplicatedSimulated` entries are local prediction only; their
    /// flag is cleared without sending anything.
    pub fn send_dirty<W: ObjectWorld>(
        &mut self,
        protocol: &Protocol,
        registry: &mut ReplicationRegistry,
        session: &mut Session,
        world: &mut W,
    ) {
        let local_client_id = session.local_client_id();

        for object_id in registry.ids() {
            let Some(entry) = registry.get_mut(&object_id) else {
                continue;
            };
            let authored = entry.dirty && entry.role == NetworkObjectRole::OwnedAuthoritative;
            let relayed = entry.relay_pending && session.is_server();
            entry.dirty = false;
            entry.relay_pending = false;
            if !(authored || relayed) || !entry.spawned {
                continue;
            }

            let remote_owner = entry
                .owner_client_id
                .filter(|owner| *owner != local_client_id);
            let recipients = session.recipients(entry.audience(), remote_owner);
            if recipients.is_empty() {
                continue;
            }

            let type_key = entry.type_key.clone();
            let state = match write_state(protocol, world, object_id, &type_key) {
                Ok(state) => state,
                Err(err) => {
                    warn!("Cannot replicate object {}: {}", object_id, err);
                    continue;
                }
            };

            session.send(&OutgoingMessage::new(
                recipients,
                self.state_channel,
                ReplicationMessage::StateDelta(StateDeltaMessage {
                    object_id,
                    frame: self.frame,
                    state,
                }),
            ));
        }
    }

    /// Applies inbound state, overwriting the local instance.
    ///
    /// Only the owner or the server may send state, state is never applied
    /// to an object this participant owns, and frames not newer than the last
    /// applied one are dropped.
    pub fn receive_state<W: ObjectWorld>(
        &mut self,
        protocol: &Protocol,
        registry: &mut ReplicationRegistry,
        session: &Session,
        world: &mut W,
        sender: ClientId,
        message: StateDeltaMessage,
    ) -> Result<(), ReplicationError> {
        let object_id = message.object_id;
        let Some(entry) = registry.get(&object_id) else {
            debug!("Dropping state for unknown object {}", object_id);
            return Ok(());
        };

        if sender != SERVER_CLIENT_ID && !entry.is_owned_by(sender) {
            return Err(ReplicationError::AuthorityViolation {
                object_id,
                client_id: sender,
                reason: "state from a participant that does not own the object",
            });
        }
        match entry.role {
            NetworkObjectRole::OwnedAuthoritative => {
                return Err(ReplicationError::AuthorityViolation {
                    object_id,
                    client_id: sender,
                    reason: "state for an object owned by the receiver",
                });
            }
            NetworkObjectRole::None => {
                debug!("Dropping state for unreplicated object {}", object_id);
                return Ok(());
            }
            NetworkObjectRole::Replicated | NetworkObjectRole::ReplicatedSimulated => {}
        }
        if let Some(last_frame) = entry.last_owner_frame {
            if !sequence_greater_than(message.frame, last_frame) {
                trace!(
                    "Dropping stale state for {} (frame {} is not newer than {})",
                    object_id,
                    message.frame,
                    last_frame
                );
                return Ok(());
            }
        }

        let type_key = entry.type_key.clone();
        match read_state(protocol, world, object_id, &type_key, &message.state) {
            Ok(()) => {}
            Err(ReplicationError::MissingInstance { .. }) => {
                debug!("Object {} has no instance to apply state to", object_id);
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        if let Some(entry) = registry.get_mut(&object_id) {
            entry.last_owner_frame = Some(message.frame);
            if session.is_server() && sender != SERVER_CLIENT_ID {
                entry.relay_pending = true;
            }
        }
        Ok(())
    }
}
