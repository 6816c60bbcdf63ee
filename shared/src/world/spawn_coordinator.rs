use std::collections::HashSet;

use log::{debug, info, trace, warn};

use crate::{
    connection::session::Session,
    error::ReplicationError,
    messages::{
        channel::ChannelType,
        replication_message::{DespawnMessage, OutgoingMessage, ReplicationMessage, SpawnMessage},
    },
    protocol::Protocol,
    world::{
        object_world::{read_state, write_state, ObjectWorld},
        recent_ids::RecentIds,
        replication_entry::ReplicationEntry,
        replication_registry::ReplicationRegistry,
    },
    ClientId, NetworkObjectRole, ObjectId, SERVER_CLIENT_ID,
};

/// Builds the Spawn that introduces a registered object, with its current
/// state, to a participant holding no mirror of it
pub(crate) fn spawn_message<W: ObjectWorld>(
    protocol: &Protocol,
    registry: &ReplicationRegistry,
    world: &mut W,
    object_id: ObjectId,
    owner_client_id: ClientId,
    role: NetworkObjectRole,
) -> Result<SpawnMessage, ReplicationError> {
    let entry = registry
        .get(&object_id)
        .ok_or(ReplicationError::ObjectNotRegistered {
            object_id,
            operation: "spawn_object",
        })?;
    let type_key = entry.type_key.clone();
    let parent = entry.parent;
    let state = write_state(protocol, world, object_id, &type_key)?;
    Ok(SpawnMessage {
        object_id,
        type_key,
        owner_client_id,
        role: role.for_mirrors(),
        parent,
        targets: None,
        state,
    })
}

/// Sends a Spawn built by `spawn_message` and records the new mirror
pub(crate) fn send_spawn(
    registry: &mut ReplicationRegistry,
    session: &mut Session,
    control_channel: ChannelType,
    client_id: ClientId,
    message: SpawnMessage,
) {
    if let Some(entry) = registry.get_mut(&message.object_id) {
        entry.mirrored_on.insert(client_id);
        if let Some(targets) = entry.target_clients.as_mut() {
            targets.insert(client_id);
        }
    }
    session.send(&OutgoingMessage::new(
        vec![client_id],
        control_channel,
        ReplicationMessage::Spawn(message),
    ));
}

/// Publishes objects to remote participants and builds or tears down the
/// local mirrors of objects published by others
pub struct SpawnCoordinator {
    control_channel: ChannelType,
    recently_despawned: RecentIds,
}

impl SpawnCoordinator {
    pub fn new(control_channel: ChannelType, despawned_memory: usize) -> Self {
        Self {
            control_channel,
            recently_despawned: RecentIds::new(despawned_memory),
        }
    }

    pub fn is_recently_despawned(&self, object_id: &ObjectId) -> bool {
        self.recently_despawned.contains(object_id)
    }

    /// Sends the object, with its current state, to `targets` (or everyone).
    ///
    /// An object nobody owns yet is claimed by the spawning participant.
    /// Clients spawn through the server, which forwards to the requested
    /// subset. Spawning an already spawned object again only reaches
    /// participants that do not hold a mirror yet.
    pub fn spawn<W: ObjectWorld>(
        &mut self,
        protocol: &Protocol,
        registry: &mut ReplicationRegistry,
        session: &mut Session,
        world: &mut W,
        object_id: ObjectId,
        targets: Option<&[ClientId]>,
    ) -> Result<(), ReplicationError> {
        let local_client_id = session.local_client_id();
        let entry = registry
            .get_mut(&object_id)
            .ok_or(ReplicationError::ObjectNotRegistered {
                object_id,
                operation: "spawn_object",
            })?;

        match entry.owner_client_id {
            None => {
                info!("Object {} has no owner, claimed by its spawner", object_id);
                entry.owner_client_id = Some(local_client_id);
                entry.role = NetworkObjectRole::OwnedAuthoritative;
            }
            Some(owner) if owner != local_client_id && !session.is_server() => {
                return Err(ReplicationError::AuthorityViolation {
                    object_id,
                    client_id: local_client_id,
                    reason: "only the owner or the server may spawn an object",
                });
            }
            Some(_) => {}
        }

        if entry.spawned && !session.is_server() {
            debug!("Object {} is already spawned", object_id);
            return Ok(());
        }

        let type_key = entry.type_key.clone();
        let owner_client_id = entry.owner_client_id.unwrap_or(local_client_id);
        let role = entry.role.for_mirrors();
        let parent = entry.parent;

        let requested: Option<HashSet<ClientId>> =
            targets.map(|targets| targets.iter().copied().collect());
        let recipients = if session.is_server() {
            let mut audience: Vec<ClientId> = match &requested {
                Some(requested) => requested.iter().copied().collect(),
                None => session.remote_clients(),
            };
            // the owner needs its mirror to hold authority
            audience.push(owner_client_id);
            let mut recipients = session.recipients(audience, None);
            recipients.retain(|client_id| !entry.mirrored_on.contains(client_id));
            recipients
        } else {
            session.recipients(Vec::new(), None)
        };

        let state = write_state(protocol, world, object_id, &type_key)?;

        let forward_targets = if session.is_server() {
            None
        } else {
            requested.as_ref().map(|requested| {
                let mut targets: Vec<ClientId> = requested.iter().copied().collect();
                targets.sort();
                targets
            })
        };

        let Some(entry) = registry.get_mut(&object_id) else {
            return Ok(());
        };
        entry.target_clients = match (entry.spawned, entry.target_clients.take(), requested) {
            (true, None, _) | (_, _, None) => None,
            (true, Some(mut previous), Some(requested)) => {
                previous.extend(requested);
                Some(previous)
            }
            (false, _, Some(requested)) => Some(requested),
        };
        entry.spawned = true;
        entry.dirty = false;
        entry.mirrored_on.extend(recipients.iter().copied());

        info!("Spawning object {} of type {} to {:?}", object_id, type_key, recipients);
        session.send(&OutgoingMessage::new(
            recipients,
            self.control_channel,
            ReplicationMessage::Spawn(SpawnMessage {
                object_id,
                type_key,
                owner_client_id,
                role,
                parent,
                targets: forward_targets,
                state,
            }),
        ));

        Ok(())
    }

    /// Builds a local mirror for an inbound Spawn. Duplicates are ignored.
    pub fn receive_spawn<W: ObjectWorld>(
        &mut self,
        protocol: &Protocol,
        registry: &mut ReplicationRegistry,
        session: &mut Session,
        world: &mut W,
        sender: ClientId,
        message: SpawnMessage,
    ) -> Result<(), ReplicationError> {
        let object_id = message.object_id;
        if registry.contains(&object_id) {
            debug!("Ignoring duplicate spawn of object {}", object_id);
            return Ok(());
        }

        let owner_client_id = message.owner_client_id;
        if session.is_server() && owner_client_id != sender {
            return Err(ReplicationError::AuthorityViolation {
                object_id,
                client_id: sender,
                reason: "clients may only spawn objects they own",
            });
        }
        if !session.is_participant(owner_client_id) {
            if session.is_server() {
                return Err(ReplicationError::UnknownParticipant {
                    client_id: owner_client_id,
                });
            }
            session.add_participant(owner_client_id);
        }

        let type_key = message.type_key.clone();
        if !protocol.serializers().contains(&type_key) || !world.construct_object(&object_id, &type_key) {
            return Err(ReplicationError::SchemaMismatch {
                object_id,
                type_key: type_key.to_string(),
            });
        }

        let mut entry = ReplicationEntry::new(object_id, type_key.clone(), message.parent);
        entry.owner_client_id = Some(owner_client_id);
        entry.role = if owner_client_id == session.local_client_id() {
            NetworkObjectRole::OwnedAuthoritative
        } else {
            message.role.for_mirrors()
        };
        entry.spawned = true;
        entry.is_mirror = true;

        if let Err(err) = registry.try_add(entry) {
            world.destroy_object(&object_id);
            return Err(err);
        }
        if let Err(err) = read_state(protocol, world, object_id, &type_key, &message.state) {
            registry.remove(&object_id);
            world.destroy_object(&object_id);
            return Err(err);
        }
        self.recently_despawned.forget(&object_id);
        info!(
            "Spawned mirror of object {} ({}) owned by client {}",
            object_id, type_key, owner_client_id
        );

        if session.is_server() {
            let audience = match &message.targets {
                Some(targets) => targets.clone(),
                None => session.remote_clients(),
            };
            let recipients = session.recipients(audience, Some(sender));
            if let Some(entry) = registry.get_mut(&object_id) {
                entry.target_clients = message
                    .targets
                    .as_ref()
                    .map(|targets| targets.iter().copied().collect());
                // the spawning client holds the authoritative copy
                entry.mirrored_on.insert(sender);
                entry.mirrored_on.extend(recipients.iter().copied());
            }
            session.send(&OutgoingMessage::new(
                recipients,
                self.control_channel,
                ReplicationMessage::Spawn(SpawnMessage {
                    targets: None,
                    ..message
                }),
            ));
        }

        Ok(())
    }

    /// Removes every remote mirror of the object. The local entry stays
    /// registered until it is removed.
    pub fn despawn(
        &mut self,
        registry: &mut ReplicationRegistry,
        session: &mut Session,
        object_id: ObjectId,
    ) -> Result<(), ReplicationError> {
        let local_client_id = session.local_client_id();
        let entry = registry
            .get_mut(&object_id)
            .ok_or(ReplicationError::ObjectNotRegistered {
                object_id,
                operation: "despawn_object",
            })?;

        if !entry.spawned {
            debug!("Object {} is not spawned, nothing to despawn", object_id);
            return Ok(());
        }
        if !session.is_server() && !entry.is_owned_by(local_client_id) {
            return Err(ReplicationError::AuthorityViolation {
                object_id,
                client_id: local_client_id,
                reason: "only the owner or the server may despawn an object",
            });
        }

        let recipients = session.recipients(entry.audience(), None);
        Self::unpublish(entry);

        info!("Despawning object {} from {:?}", object_id, recipients);
        session.send(&OutgoingMessage::new(
            recipients,
            self.control_channel,
            ReplicationMessage::Despawn(DespawnMessage { object_id }),
        ));
        Ok(())
    }

    /// Destroys the local mirror named by an inbound Despawn. Unknown objects
    /// are ignored. Objects this participant created itself only lose their
    /// spawned state.
    pub fn receive_despawn<W: ObjectWorld>(
        &mut self,
        registry: &mut ReplicationRegistry,
        session: &mut Session,
        world: &mut W,
        sender: ClientId,
        message: DespawnMessage,
    ) -> Result<(), ReplicationError> {
        let object_id = message.object_id;
        let Some(entry) = registry.get_mut(&object_id) else {
            trace!("Ignoring despawn of unknown object {}", object_id);
            return Ok(());
        };

        if sender != SERVER_CLIENT_ID && !entry.is_owned_by(sender) {
            return Err(ReplicationError::AuthorityViolation {
                object_id,
                client_id: sender,
                reason: "despawn from a participant that does not own the object",
            });
        }

        let audience = entry.audience();
        if entry.is_mirror {
            registry.remove(&object_id);
            world.destroy_object(&object_id);
            self.recently_despawned.remember(object_id);
            info!("Despawned mirror of object {}", object_id);
        } else {
            Self::unpublish(entry);
            info!("Object {} was despawned remotely", object_id);
        }

        if session.is_server() {
            let recipients = session.recipients(audience, Some(sender));
            session.send(&OutgoingMessage::new(
                recipients,
                self.control_channel,
                ReplicationMessage::Despawn(message),
            ));
        }

        Ok(())
    }

    /// Sends every spawned object `client_id` was meant to see to a newly
    /// connected client
    pub fn late_join<W: ObjectWorld>(
        &mut self,
        protocol: &Protocol,
        registry: &mut ReplicationRegistry,
        session: &mut Session,
        world: &mut W,
        client_id: ClientId,
    ) {
        if !session.is_participant(client_id) {
            return;
        }

        for object_id in registry.ids() {
            let Some(entry) = registry.get(&object_id) else {
                continue;
            };
            if !entry.spawned
                || !entry.is_targeted(client_id)
                || entry.is_owned_by(client_id)
                || entry.mirrored_on.contains(&client_id)
            {
                continue;
            }

            let owner_client_id = entry.owner_client_id.unwrap_or(SERVER_CLIENT_ID);
            let role = entry.role;
            let message =
                match spawn_message(protocol, registry, world, object_id, owner_client_id, role) {
                    Ok(message) => message,
                    Err(err) => {
                        warn!("Cannot send object {} to late client {}: {}", object_id, client_id, err);
                        continue;
                    }
                };
            send_spawn(registry, session, self.control_channel, client_id, message);
        }
    }

    /// Despawns and destroys every object owned by a departed client, and
    /// forgets its mirrors
    pub fn disconnect<W: ObjectWorld>(
        &mut self,
        registry: &mut ReplicationRegistry,
        session: &mut Session,
        world: &mut W,
        client_id: ClientId,
    ) {
        for object_id in registry.ids() {
            let Some(entry) = registry.get_mut(&object_id) else {
                continue;
            };
            entry.mirrored_on.remove(&client_id);
            if !entry.is_owned_by(client_id) {
                continue;
            }

            if entry.spawned {
                let recipients = session.recipients(entry.audience(), Some(client_id));
                session.send(&OutgoingMessage::new(
                    recipients,
                    self.control_channel,
                    ReplicationMessage::Despawn(DespawnMessage { object_id }),
                ));
            }
            registry.remove(&object_id);
            world.destroy_object(&object_id);
            self.recently_despawned.remember(object_id);
            info!("Despawned object {} of disconnected client {}", object_id, client_id);
        }
    }

    pub fn clear(&mut self) {
        self.recently_despawned.clear();
    }

    fn unpublish(entry: &mut ReplicationEntry) {
        entry.spawned = false;
        entry.mirrored_on.clear();
        entry.target_clients = None;
        entry.relay_pending = false;
    }
}
