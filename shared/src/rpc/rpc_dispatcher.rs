use log::{debug, trace};

use replica_serde::NetworkStream;

use crate::{
    connection::session::Session,
    error::ReplicationError,
    messages::replication_message::{OutgoingMessage, ReplicationMessage, RpcCallMessage},
    protocol::Protocol,
    rpc::{rpc_table::RpcContext, stream_pool::StreamPool},
    serialization::error::SerializerError,
    world::{object_world::ObjectWorld, replication_registry::ReplicationRegistry},
    ClientId, HostType, ObjectId, TypeKey, SERVER_CLIENT_ID,
};

fn invoker_name(host_type: HostType) -> &'static str {
    match host_type {
        HostType::Server => "server",
        HostType::Client => "client",
    }
}

/// Encodes outbound RPCs and runs inbound ones against the protocol's RPC table
pub struct RpcDispatcher {
    pool: StreamPool,
}

impl RpcDispatcher {
    pub fn new(pool_capacity: usize) -> Self {
        Self {
            pool: StreamPool::new(pool_capacity),
        }
    }

    /// Hands out an empty stream to write call arguments into
    pub fn begin(&mut self) -> NetworkStream {
        self.pool.acquire()
    }

    /// Returns a stream to the pool without sending anything
    pub fn release(&mut self, stream: NetworkStream) {
        self.pool.release(stream);
    }

    /// Validates and sends a call. `args` goes back to the pool whatever the outcome.
    pub fn end(
        &mut self,
        protocol: &Protocol,
        registry: &ReplicationRegistry,
        session: &mut Session,
        object_id: ObjectId,
        type_key: &TypeKey,
        name: &str,
        args: NetworkStream,
    ) -> Result<(), ReplicationError> {
        let outgoing = Self::build_call(protocol, registry, session, object_id, type_key, name, &args);
        self.pool.release(args);
        let outgoing = outgoing?;

        if outgoing.targets.is_empty() {
            debug!("RPC {}::{} on {} has no recipients", type_key, name, object_id);
            return Ok(());
        }
        session.send(&outgoing);
        Ok(())
    }

    fn build_call(
        protocol: &Protocol,
        registry: &ReplicationRegistry,
        session: &Session,
        object_id: ObjectId,
        type_key: &TypeKey,
        name: &str,
        args: &NetworkStream,
    ) -> Result<OutgoingMessage, ReplicationError> {
        let entry = protocol
            .rpcs()
            .get(type_key, name)
            .ok_or_else(|| ReplicationError::RpcNotRegistered {
                type_key: type_key.to_string(),
                name: name.to_string(),
            })?;

        let host_type = session.host_type();
        if !entry.can_invoke(host_type) {
            return Err(ReplicationError::RpcPermissionDenied {
                type_key: type_key.to_string(),
                name: name.to_string(),
                invoker: invoker_name(host_type),
            });
        }

        let object = registry
            .get(&object_id)
            .ok_or(ReplicationError::ObjectNotRegistered {
                object_id,
                operation: "end_invoke_rpc",
            })?;

        let targets = session.recipients(object.audience(), None);
        Ok(OutgoingMessage::new(
            targets,
            entry.channel,
            ReplicationMessage::RpcCall(RpcCallMessage {
                object_id,
                type_key: type_key.clone(),
                name: name.to_string(),
                args: args.as_bytes().to_vec(),
            }),
        ))
    }

    /// Runs an inbound call.
    ///
    /// Calls for objects that are not (or no longer) present locally are
    /// dropped without error, since RPCs race spawns and despawns. The
    /// permission flags are checked again against the sender's actual role,
    /// and the call must be one that runs on `local_host`.
    pub fn receive<W: ObjectWorld>(
        &mut self,
        protocol: &Protocol,
        registry: &ReplicationRegistry,
        world: &mut W,
        local_host: HostType,
        sender: ClientId,
        message: RpcCallMessage,
    ) -> Result<(), ReplicationError> {
        let RpcCallMessage {
            object_id,
            type_key,
            name,
            args,
        } = message;

        if !registry.contains(&object_id) {
            debug!("Dropping RPC {}::{} for unknown object {}", type_key, name, object_id);
            return Ok(());
        }

        let entry = protocol
            .rpcs()
            .get(&type_key, &name)
            .ok_or_else(|| ReplicationError::RpcNotRegistered {
                type_key: type_key.to_string(),
                name: name.clone(),
            })?;

        let invoker = if sender == SERVER_CLIENT_ID {
            HostType::Server
        } else {
            HostType::Client
        };
        if !entry.can_invoke(invoker) || !entry.executes_on(local_host) {
            return Err(ReplicationError::RpcPermissionDenied {
                type_key: type_key.to_string(),
                name,
                invoker: invoker_name(invoker),
            });
        }

        let Some(instance) = world.object_mut(&object_id) else {
            trace!("RPC {}::{} target {} has no instance", type_key, name, object_id);
            return Ok(());
        };

        let mut stream = self.pool.acquire();
        stream.initialize_with(&args);
        let result = entry.execute(instance, &mut stream, &RpcContext { object_id, sender });
        self.pool.release(stream);

        result.map_err(|source| {
            SerializerError::Failed {
                type_key: type_key.to_string(),
                source,
            }
            .into()
        })
    }

    pub fn clear(&mut self) {
        self.pool.clear();
    }
}
