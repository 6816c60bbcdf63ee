mod tick;

pub use tick::ReplicationTick;

use std::{any::Any, sync::Arc};

use log::{debug, info, trace, warn};

use replica_serde::NetworkStream;

use crate::{
    config::ReplicationConfig,
    connection::session::Session,
    error::ReplicationError,
    messages::replication_message::ReplicationMessage,
    protocol::Protocol,
    rpc::rpc_dispatcher::RpcDispatcher,
    serialization::{error::SerializerError, serializer_registry::SerializeMode},
    world::{
        object_world::ObjectWorld, ownership_resolver::OwnershipResolver,
        replication_entry::ReplicationEntry, replication_registry::ReplicationRegistry,
        spawn_coordinator::SpawnCoordinator,
    },
    ClientId, Frame, HostType, NetworkObjectRole, ObjectId, TypeKey,
};

fn log_failure(result: Result<(), ReplicationError>) {
    if let Err(err) = result {
        warn!("{}", err);
    }
}

/// Per-participant entry point of the replication core.
///
/// Owns the replication registry and drives spawn/despawn, ownership, RPC
/// and state replication through the active `Session`. Object instances live
/// in the caller's `ObjectWorld`; the replicator only tracks their metadata.
///
/// Every mutating operation comes in two forms: `try_*` returns the error,
/// the plain form logs it and carries on.
pub struct Replicator {
    protocol: Arc<Protocol>,
    config: ReplicationConfig,
    session: Option<Session>,
    registry: ReplicationRegistry,
    ownership: OwnershipResolver,
    spawner: SpawnCoordinator,
    rpc: RpcDispatcher,
    tick: ReplicationTick,
    pending_joins: Vec<ClientId>,
}

impl Replicator {
    /// Create a new Replicator. The protocol is locked if it was not already.
    pub fn new(mut protocol: Protocol, config: ReplicationConfig) -> Self {
        if !protocol.is_locked() {
            protocol.lock();
        }
        Self::with_shared_protocol(Arc::new(protocol), config)
    }

    /// Create a new Replicator that shares an already locked protocol
    pub fn with_shared_protocol(protocol: Arc<Protocol>, config: ReplicationConfig) -> Self {
        Self {
            registry: ReplicationRegistry::new(config.max_hierarchy_depth),
            ownership: OwnershipResolver::new(config.control_channel),
            spawner: SpawnCoordinator::new(config.control_channel, config.despawned_memory),
            rpc: RpcDispatcher::new(config.stream_pool_capacity),
            tick: ReplicationTick::new(config.state_channel),
            protocol,
            config,
            session: None,
            pending_joins: Vec::new(),
        }
    }

    pub fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    pub fn frame(&self) -> Frame {
        self.tick.frame()
    }

    // Session

    pub fn start_session(&mut self, session: Session) {
        if self.session.is_some() {
            warn!("Replication session already active, replacing it");
        }
        info!(
            "Replication session started as {:?} (client {})",
            session.host_type(),
            session.local_client_id()
        );
        self.session = Some(session);
    }

    /// Drops the session. Registered objects are kept; see `clear`.
    pub fn end_session(&mut self) -> Option<Session> {
        let session = self.session.take();
        if session.is_some() {
            info!("Replication session ended");
        }
        self.pending_joins.clear();
        session
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn host_type(&self) -> Option<HostType> {
        self.session.as_ref().map(Session::host_type)
    }

    pub fn local_client_id(&self) -> Option<ClientId> {
        self.session.as_ref().map(Session::local_client_id)
    }

    /// A fresh network-unique id, or `None` while offline
    pub fn new_object_id(&mut self) -> Option<ObjectId> {
        self.session.as_mut().map(Session::next_object_id)
    }

    pub fn client_connected(&mut self, client_id: ClientId) {
        log_failure(self.try_client_connected(client_id));
    }

    /// Records a new participant. On the server every spawned object it
    /// should see is sent to it during the next `update`.
    pub fn try_client_connected(&mut self, client_id: ClientId) -> Result<(), ReplicationError> {
        let session = self.session.as_mut().ok_or(ReplicationError::Offline {
            operation: "client_connected",
        })?;
        if session.add_participant(client_id) {
            info!("Client {} connected", client_id);
        }
        if session.is_server() && !self.pending_joins.contains(&client_id) {
            self.pending_joins.push(client_id);
        }
        Ok(())
    }

    pub fn client_disconnected<W: ObjectWorld>(&mut self, world: &mut W, client_id: ClientId) {
        log_failure(self.try_client_disconnected(world, client_id));
    }

    /// Forgets a participant. On the server every object it owned is
    /// despawned from the remaining clients and destroyed.
    pub fn try_client_disconnected<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        client_id: ClientId,
    ) -> Result<(), ReplicationError> {
        let session = self.session.as_mut().ok_or(ReplicationError::Offline {
            operation: "client_disconnected",
        })?;
        if !session.remove_participant(client_id) {
            return Err(ReplicationError::UnknownParticipant { client_id });
        }
        info!("Client {} disconnected", client_id);
        self.pending_joins.retain(|pending| *pending != client_id);
        if session.is_server() {
            self.spawner
                .disconnect(&mut self.registry, session, world, client_id);
        }
        Ok(())
    }

    // Registry

    /// Registers an object. Does nothing while offline.
    pub fn add_object(&mut self, object_id: ObjectId, type_key: TypeKey, parent: Option<ObjectId>) {
        match self.try_add_object(object_id, type_key, parent) {
            Err(ReplicationError::Offline { .. }) => {
                debug!("Not registering object {} while offline", object_id);
            }
            result => log_failure(result),
        }
    }

    pub fn add_object_of<T: Any>(&mut self, object_id: ObjectId, parent: Option<ObjectId>) {
        self.add_object(object_id, TypeKey::of::<T>(), parent);
    }

    pub fn try_add_object(
        &mut self,
        object_id: ObjectId,
        type_key: TypeKey,
        parent: Option<ObjectId>,
    ) -> Result<(), ReplicationError> {
        if self.session.is_none() {
            return Err(ReplicationError::Offline {
                operation: "add_object",
            });
        }
        self.registry
            .try_add(ReplicationEntry::new(object_id, type_key, parent))?;
        info!("Added object {}", object_id);
        Ok(())
    }

    /// Unregisters an object. A spawned object is not despawned by this.
    pub fn remove_object(&mut self, object_id: ObjectId) {
        match self.try_remove_object(object_id) {
            Err(ReplicationError::Offline { .. }) => {}
            result => log_failure(result),
        }
    }

    pub fn try_remove_object(&mut self, object_id: ObjectId) -> Result<(), ReplicationError> {
        if self.session.is_none() {
            return Err(ReplicationError::Offline {
                operation: "remove_object",
            });
        }
        let entry = self
            .registry
            .remove(&object_id)
            .ok_or(ReplicationError::ObjectNotRegistered {
                object_id,
                operation: "remove_object",
            })?;
        if entry.spawned {
            warn!(
                "Object {} removed while still spawned, its mirrors stay alive until despawned",
                object_id
            );
        }
        info!("Removed object {}", object_id);
        Ok(())
    }

    /// Marks an object for the next tick. Ignored unless the local role may
    /// author state.
    pub fn dirty_object(&mut self, object_id: ObjectId) {
        match self.try_dirty_object(object_id) {
            Err(ReplicationError::Offline { .. }) => {}
            result => log_failure(result),
        }
    }

    pub fn try_dirty_object(&mut self, object_id: ObjectId) -> Result<(), ReplicationError> {
        if self.session.is_none() {
            return Err(ReplicationError::Offline {
                operation: "dirty_object",
            });
        }
        let entry = self
            .registry
            .get_mut(&object_id)
            .ok_or(ReplicationError::ObjectNotRegistered {
                object_id,
                operation: "dirty_object",
            })?;
        if entry.role.can_author_state() {
            entry.dirty = true;
        } else {
            trace!("Ignoring dirty mark on {} with role {}", object_id, entry.role.name());
        }
        Ok(())
    }

    pub fn get_object_owner_client_id(&self, object_id: ObjectId) -> Option<ClientId> {
        self.registry.owner_client_id(&object_id)
    }

    pub fn get_object_role(&self, object_id: ObjectId) -> NetworkObjectRole {
        self.registry.role(&object_id)
    }

    pub fn is_object_owned(&self, object_id: ObjectId) -> bool {
        self.get_object_role(object_id) == NetworkObjectRole::OwnedAuthoritative
    }

    pub fn is_object_simulated(&self, object_id: ObjectId) -> bool {
        self.get_object_role(object_id) == NetworkObjectRole::ReplicatedSimulated
    }

    pub fn is_object_replicated(&self, object_id: ObjectId) -> bool {
        self.get_object_role(object_id).is_replicated()
    }

    pub fn is_object_spawned(&self, object_id: ObjectId) -> bool {
        self.registry
            .get(&object_id)
            .is_some_and(|entry| entry.spawned)
    }

    pub fn has_object(&self, object_id: ObjectId) -> bool {
        self.registry.contains(&object_id)
    }

    pub fn registry(&self) -> &ReplicationRegistry {
        &self.registry
    }

    // Ownership

    pub fn set_object_ownership(
        &mut self,
        object_id: ObjectId,
        owner_client_id: ClientId,
        role: NetworkObjectRole,
        hierarchical: bool,
    ) {
        log_failure(self.try_set_object_ownership(object_id, owner_client_id, role, hierarchical));
    }

    pub fn try_set_object_ownership(
        &mut self,
        object_id: ObjectId,
        owner_client_id: ClientId,
        role: NetworkObjectRole,
        hierarchical: bool,
    ) -> Result<(), ReplicationError> {
        let session = self.session.as_mut().ok_or(ReplicationError::Offline {
            operation: "set_object_ownership",
        })?;
        self.ownership.set_local(
            &mut self.registry,
            session,
            object_id,
            owner_client_id,
            role,
            hierarchical,
        )
    }

    // Spawn / Despawn

    pub fn spawn_object<W: ObjectWorld>(&mut self, world: &mut W, object_id: ObjectId) {
        log_failure(self.try_spawn_object(world, object_id, None));
    }

    pub fn spawn_object_to<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        object_id: ObjectId,
        client_ids: &[ClientId],
    ) {
        log_failure(self.try_spawn_object(world, object_id, Some(client_ids)));
    }

    pub fn try_spawn_object<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        object_id: ObjectId,
        client_ids: Option<&[ClientId]>,
    ) -> Result<(), ReplicationError> {
        let session = self.session.as_mut().ok_or(ReplicationError::Offline {
            operation: "spawn_object",
        })?;
        self.spawner.spawn(
            &self.protocol,
            &mut self.registry,
            session,
            world,
            object_id,
            client_ids,
        )
    }

    pub fn despawn_object(&mut self, object_id: ObjectId) {
        log_failure(self.try_despawn_object(object_id));
    }

    pub fn try_despawn_object(&mut self, object_id: ObjectId) -> Result<(), ReplicationError> {
        let session = self.session.as_mut().ok_or(ReplicationError::Offline {
            operation: "despawn_object",
        })?;
        self.spawner.despawn(&mut self.registry, session, object_id)
    }

    // RPC

    /// A cleared stream to write call arguments into
    pub fn begin_invoke_rpc(&mut self) -> NetworkStream {
        self.rpc.begin()
    }

    pub fn end_invoke_rpc(
        &mut self,
        object_id: ObjectId,
        type_key: &TypeKey,
        name: &str,
        args: NetworkStream,
    ) {
        log_failure(self.try_end_invoke_rpc(object_id, type_key, name, args));
    }

    /// Sends the call. `args` is released back to the pool in every case.
    pub fn try_end_invoke_rpc(
        &mut self,
        object_id: ObjectId,
        type_key: &TypeKey,
        name: &str,
        args: NetworkStream,
    ) -> Result<(), ReplicationError> {
        let Some(session) = self.session.as_mut() else {
            self.rpc.release(args);
            return Err(ReplicationError::Offline {
                operation: "end_invoke_rpc",
            });
        };
        self.rpc.end(
            &self.protocol,
            &self.registry,
            session,
            object_id,
            type_key,
            name,
            args,
        )
    }

    // Serialization

    pub fn invoke_serializer(
        &self,
        type_key: &TypeKey,
        instance: &mut dyn Any,
        stream: &mut NetworkStream,
        mode: SerializeMode,
    ) -> Result<(), SerializerError> {
        self.protocol
            .serializers()
            .invoke_serializer(type_key, instance, stream, mode)
    }

    // Tick

    /// Runs one replication tick: drains inbound messages, sends pending
    /// late-join spawns, then replicates dirty state
    pub fn update<W: ObjectWorld>(&mut self, world: &mut W) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.tick.advance();

        let mut inbound = Vec::new();
        while let Some(packet) = session.receive() {
            inbound.push(packet);
        }
        for (sender, payload) in inbound {
            if let Err(err) = self.receive_message(world, sender, &payload) {
                warn!("Rejected message from client {}: {}", sender, err);
            }
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        for client_id in std::mem::take(&mut self.pending_joins) {
            self.spawner
                .late_join(&self.protocol, &mut self.registry, session, world, client_id);
        }

        self.tick
            .send_dirty(&self.protocol, &mut self.registry, session, world);
    }

    fn receive_message<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        sender: ClientId,
        payload: &[u8],
    ) -> Result<(), ReplicationError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if !session.is_participant(sender) {
            return Err(ReplicationError::UnknownParticipant { client_id: sender });
        }

        let message = ReplicationMessage::from_bytes(payload)?;
        let object_id = message.object_id();
        trace!("Received {:?} for {} from client {}", message.message_type(), object_id, sender);

        match message {
            ReplicationMessage::Spawn(message) => self.spawner.receive_spawn(
                &self.protocol,
                &mut self.registry,
                session,
                world,
                sender,
                message,
            ),
            ReplicationMessage::Despawn(message) => {
                self.spawner
                    .receive_despawn(&mut self.registry, session, world, sender, message)
            }
            ReplicationMessage::OwnershipChange(message) => {
                self.ownership.apply_remote(
                    &self.protocol,
                    &mut self.registry,
                    session,
                    world,
                    sender,
                    message,
                )
            }
            ReplicationMessage::StateDelta(message) => {
                if self.spawner.is_recently_despawned(&object_id) {
                    trace!("Dropping state for despawned object {}", object_id);
                    return Ok(());
                }
                self.tick.receive_state(
                    &self.protocol,
                    &mut self.registry,
                    session,
                    world,
                    sender,
                    message,
                )
            }
            ReplicationMessage::RpcCall(message) => {
                if self.spawner.is_recently_despawned(&object_id) {
                    trace!("Dropping RPC for despawned object {}", object_id);
                    return Ok(());
                }
                let local_host = session.host_type();
                self.rpc.receive(
                    &self.protocol,
                    &self.registry,
                    world,
                    local_host,
                    sender,
                    message,
                )
            }
        }
    }

    /// Shutdown: destroys every mirror through `world` and forgets all
    /// replication state. The session, if any, stays active.
    pub fn clear<W: ObjectWorld>(&mut self, world: &mut W) {
        for object_id in self.registry.ids() {
            if self
                .registry
                .get(&object_id)
                .is_some_and(|entry| entry.is_mirror)
            {
                world.destroy_object(&object_id);
            }
        }
        self.registry.clear();
        self.spawner.clear();
        self.rpc.clear();
        self.tick.reset();
        self.pending_joins.clear();
        info!("Replication state cleared");
    }
}
