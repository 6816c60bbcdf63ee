use log::{debug, info};

use crate::{
    connection::session::Session,
    error::ReplicationError,
    messages::{
        channel::ChannelType,
        replication_message::{OutgoingMessage, OwnershipChangeMessage, ReplicationMessage},
    },
    protocol::Protocol,
    world::{
        object_world::ObjectWorld,
        replication_registry::ReplicationRegistry,
        spawn_coordinator::{send_spawn, spawn_message},
    },
    ClientId, NetworkObjectRole, ObjectId, SERVER_CLIENT_ID,
};

/// Applies owner and role changes, locally requested or received, and keeps
/// attached children in step with their parent
pub struct OwnershipResolver {
    control_channel: ChannelType,
}

impl OwnershipResolver {
    pub fn new(control_channel: ChannelType) -> Self {
        Self { control_channel }
    }

    /// Local ownership change.
    ///
    /// The current owner or the server may hand an object to any connected
    /// participant. Anyone else may only relabel their own non-authoritative
    /// role. Spawned objects announce a new owner to everyone holding a mirror.
    /// The server refuses to hand a spawned object to a client holding no
    /// mirror of it; spawn it to that client first.
    pub fn set_local(
        &self,
        registry: &mut ReplicationRegistry,
        session: &mut Session,
        object_id: ObjectId,
        owner_client_id: ClientId,
        role: NetworkObjectRole,
        hierarchical: bool,
    ) -> Result<(), ReplicationError> {
        const OPERATION: &str = "set_object_ownership";

        if role == NetworkObjectRole::None {
            return Err(ReplicationError::InvalidRole {
                role: role.name(),
                operation: OPERATION,
            });
        }
        if !session.is_participant(owner_client_id) {
            return Err(ReplicationError::UnknownParticipant {
                client_id: owner_client_id,
            });
        }

        let local_client_id = session.local_client_id();
        if (owner_client_id == local_client_id) != (role == NetworkObjectRole::OwnedAuthoritative) {
            // the owner is authoritative, and only the owner
            return Err(ReplicationError::InvalidRole {
                role: role.name(),
                operation: OPERATION,
            });
        }

        let entry = registry
            .get(&object_id)
            .ok_or(ReplicationError::ObjectNotRegistered {
                object_id,
                operation: OPERATION,
            })?;
        let current_owner = entry.owner_client_id;
        let owner_changed = current_owner != Some(owner_client_id);
        let may_reassign =
            session.is_server() || current_owner.is_none() || current_owner == Some(local_client_id);
        if owner_changed && !may_reassign {
            return Err(ReplicationError::AuthorityViolation {
                object_id,
                client_id: local_client_id,
                reason: "only the owner or the server may hand over ownership",
            });
        }

        let spawned = entry.spawned;
        let mut audience = entry.audience();
        audience.push(owner_client_id);

        if owner_changed && session.is_server() {
            let unmirrored = Self::unmirrored(registry, object_id, owner_client_id, hierarchical);
            if let Some(&unmirrored_id) = unmirrored.first() {
                return Err(ReplicationError::OwnerWithoutMirror {
                    object_id: unmirrored_id,
                    client_id: owner_client_id,
                });
            }
        }

        Self::apply(registry, object_id, owner_client_id, role, hierarchical);
        info!(
            "Object {} now owned by client {} (local role {})",
            object_id,
            owner_client_id,
            role.name()
        );

        if owner_changed && spawned {
            let recipients = session.recipients(audience, None);
            session.send(&OutgoingMessage::new(
                recipients,
                self.control_channel,
                ReplicationMessage::OwnershipChange(OwnershipChangeMessage {
                    object_id,
                    new_owner_client_id: owner_client_id,
                    new_role: role.for_mirrors(),
                    hierarchical,
                }),
            ));
        }

        Ok(())
    }

    /// Inbound ownership change.
    ///
    /// Accepted from the recorded owner or from the server. The server passes
    /// an accepted change on to every other participant that knows the object,
    /// first spawning the object to a new owner that holds no mirror of it.
    pub fn apply_remote<W: ObjectWorld>(
        &self,
        protocol: &Protocol,
        registry: &mut ReplicationRegistry,
        session: &mut Session,
        world: &mut W,
        sender: ClientId,
        message: OwnershipChangeMessage,
    ) -> Result<(), ReplicationError> {
        let object_id = message.object_id;
        let Some(entry) = registry.get(&object_id) else {
            debug!("Ignoring ownership change for unknown object {}", object_id);
            return Ok(());
        };

        if sender != SERVER_CLIENT_ID && !entry.is_owned_by(sender) {
            return Err(ReplicationError::AuthorityViolation {
                object_id,
                client_id: sender,
                reason: "ownership change from a participant that does not own the object",
            });
        }

        let new_owner = message.new_owner_client_id;
        if !session.is_participant(new_owner) {
            if session.is_server() {
                return Err(ReplicationError::UnknownParticipant {
                    client_id: new_owner,
                });
            }
            // the server vouches for participants we have not heard of yet
            session.add_participant(new_owner);
        }

        let mut audience = entry.audience();
        audience.push(new_owner);

        if session.is_server() {
            let introductions = Self::unmirrored(registry, object_id, new_owner, message.hierarchical)
                .into_iter()
                .map(|target| {
                    spawn_message(protocol, registry, world, target, new_owner, message.new_role)
                })
                .collect::<Result<Vec<_>, _>>()?;
            for spawn in introductions {
                debug!("Introducing object {} to its new owner {}", spawn.object_id, new_owner);
                send_spawn(registry, session, self.control_channel, new_owner, spawn);
            }
        }

        let role = if new_owner == session.local_client_id() {
            NetworkObjectRole::OwnedAuthoritative
        } else {
            message.new_role.for_mirrors()
        };
        Self::apply(registry, object_id, new_owner, role, message.hierarchical);
        info!(
            "Object {} handed to client {} by client {} (local role {})",
            object_id,
            new_owner,
            sender,
            role.name()
        );

        if session.is_server() {
            let recipients = session.recipients(audience, Some(sender));
            session.send(&OutgoingMessage::new(
                recipients,
                self.control_channel,
                ReplicationMessage::OwnershipChange(message),
            ));
        }

        Ok(())
    }

    /// Spawned objects among those a change would touch that `owner_client_id`
    /// holds no mirror of, parents first
    fn unmirrored(
        registry: &ReplicationRegistry,
        object_id: ObjectId,
        owner_client_id: ClientId,
        hierarchical: bool,
    ) -> Vec<ObjectId> {
        if owner_client_id == SERVER_CLIENT_ID {
            return Vec::new();
        }
        let targets = if hierarchical {
            registry.hierarchy(&object_id)
        } else {
            vec![object_id]
        };
        targets
            .into_iter()
            .filter(|target| {
                registry.get(target).is_some_and(|entry| {
                    entry.spawned && !entry.mirrored_on.contains(&owner_client_id)
                })
            })
            .collect()
    }

    fn apply(
        registry: &mut ReplicationRegistry,
        object_id: ObjectId,
        owner_client_id: ClientId,
        role: NetworkObjectRole,
        hierarchical: bool,
    ) {
        let targets = if hierarchical {
            registry.hierarchy(&object_id)
        } else {
            vec![object_id]
        };

        for target in targets {
            let Some(entry) = registry.get_mut(&target) else {
                continue;
            };
            if entry.owner_client_id != Some(owner_client_id) {
                entry.last_owner_frame = None;
                entry.relay_pending = false;
            }
            entry.owner_client_id = Some(owner_client_id);
            entry.role = role;
        }
    }
}
