use std::any::Any;

use replica_serde::{NetworkStream, SerdeErr};

use crate::{
    messages::channel::ChannelType,
    rpc::rpc_table::{RpcContext, RpcEntry, RpcTable},
    serialization::{
        network_serialize::{downcast_instance, serializable_entry, NetworkSerialize},
        serializer_registry::{SerializerEntry, SerializerRegistry, SerializerTag},
        type_key::TypeKey,
    },
};

pub mod error;
pub use error::ProtocolError;

// Protocol Plugin
pub trait ProtocolPlugin {
    fn build(&self, protocol: &mut Protocol);
}

/// Everything participants must agree on: the serializer for each replicated
/// type and the RPC tables. Built once at startup, then locked and shared.
#[derive(Default)]
pub struct Protocol {
    serializers: SerializerRegistry,
    rpcs: RpcTable,
    locked: bool,
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn add_plugin<P: ProtocolPlugin>(&mut self, plugin: P) -> &mut Self {
        self.check_lock();
        plugin.build(self);
        self
    }

    pub fn add_serializer<S, D>(
        &mut self,
        type_key: TypeKey,
        serialize: S,
        deserialize: D,
        serialize_tag: SerializerTag,
        deserialize_tag: SerializerTag,
    ) -> &mut Self
    where
        S: Fn(&mut dyn Any, &mut NetworkStream, &SerializerTag) -> Result<(), SerdeErr>
            + Send
            + Sync
            + 'static,
        D: Fn(&mut dyn Any, &mut NetworkStream, &SerializerTag) -> Result<(), SerdeErr>
            + Send
            + Sync
            + 'static,
    {
        self.check_lock();
        self.serializers.add_serializer(
            type_key,
            SerializerEntry::new(
                Box::new(serialize),
                Box::new(deserialize),
                serialize_tag,
                deserialize_tag,
            ),
        );
        self
    }

    pub fn add_serializable<T: NetworkSerialize>(&mut self) -> &mut Self {
        self.check_lock();
        self.serializers
            .add_serializer(TypeKey::of::<T>(), serializable_entry::<T>());
        self
    }

    pub fn add_rpc<F>(
        &mut self,
        type_key: TypeKey,
        name: &str,
        is_server: bool,
        is_client: bool,
        channel: ChannelType,
        execute: F,
    ) -> &mut Self
    where
        F: Fn(&mut dyn Any, &mut NetworkStream, &RpcContext) -> Result<(), SerdeErr>
            + Send
            + Sync
            + 'static,
    {
        if let Err(err) = self.try_add_rpc(type_key, name, is_server, is_client, channel, execute) {
            panic!("{}", err);
        }
        self
    }

    /// Registers an RPC whose callback receives the concrete target type
    pub fn add_rpc_for<T, F>(
        &mut self,
        name: &str,
        is_server: bool,
        is_client: bool,
        channel: ChannelType,
        execute: F,
    ) -> &mut Self
    where
        T: Any,
        F: Fn(&mut T, &mut NetworkStream, &RpcContext) -> Result<(), SerdeErr>
            + Send
            + Sync
            + 'static,
    {
        if let Err(err) = self.try_add_rpc_for::<T, F>(name, is_server, is_client, channel, execute)
        {
            panic!("{}", err);
        }
        self
    }

    // Non-panicking builder methods

    pub fn try_add_plugin<P: ProtocolPlugin>(&mut self, plugin: P) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        plugin.build(self);
        Ok(self)
    }

    pub fn try_add_serializer<S, D>(
        &mut self,
        type_key: TypeKey,
        serialize: S,
        deserialize: D,
        serialize_tag: SerializerTag,
        deserialize_tag: SerializerTag,
    ) -> Result<&mut Self, ProtocolError>
    where
        S: Fn(&mut dyn Any, &mut NetworkStream, &SerializerTag) -> Result<(), SerdeErr>
            + Send
            + Sync
            + 'static,
        D: Fn(&mut dyn Any, &mut NetworkStream, &SerializerTag) -> Result<(), SerdeErr>
            + Send
            + Sync
            + 'static,
    {
        self.try_check_lock()?;
        Ok(self.add_serializer(type_key, serialize, deserialize, serialize_tag, deserialize_tag))
    }

    pub fn try_add_serializable<T: NetworkSerialize>(&mut self) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        Ok(self.add_serializable::<T>())
    }

    pub fn try_add_rpc<F>(
        &mut self,
        type_key: TypeKey,
        name: &str,
        is_server: bool,
        is_client: bool,
        channel: ChannelType,
        execute: F,
    ) -> Result<&mut Self, ProtocolError>
    where
        F: Fn(&mut dyn Any, &mut NetworkStream, &RpcContext) -> Result<(), SerdeErr>
            + Send
            + Sync
            + 'static,
    {
        self.try_check_lock()?;
        if !is_server && !is_client {
            return Err(ProtocolError::UninvocableRpc {
                type_key: type_key.to_string(),
                name: name.to_string(),
            });
        }
        self.rpcs.add(
            type_key,
            name.to_string(),
            RpcEntry::new(Box::new(execute), is_server, is_client, channel),
        );
        Ok(self)
    }

    pub fn try_add_rpc_for<T, F>(
        &mut self,
        name: &str,
        is_server: bool,
        is_client: bool,
        channel: ChannelType,
        execute: F,
    ) -> Result<&mut Self, ProtocolError>
    where
        T: Any,
        F: Fn(&mut T, &mut NetworkStream, &RpcContext) -> Result<(), SerdeErr>
            + Send
            + Sync
            + 'static,
    {
        self.try_add_rpc(
            TypeKey::of::<T>(),
            name,
            is_server,
            is_client,
            channel,
            move |instance: &mut dyn Any, stream: &mut NetworkStream, context: &RpcContext| {
                execute(downcast_instance::<T>(instance)?, stream, context)
            },
        )
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if protocol is locked without panicking
    /// Returns Err if protocol is locked
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if protocol is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    pub fn rpcs(&self) -> &RpcTable {
        &self.rpcs
    }
}
