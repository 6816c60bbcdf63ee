use std::{any::Any, collections::HashMap};

use log::warn;

use replica_serde::{NetworkStream, SerdeErr};

use crate::{messages::channel::ChannelType, ClientId, HostType, ObjectId, TypeKey};

/// Passed to an RPC callback alongside its arguments
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpcContext {
    pub object_id: ObjectId,
    /// Participant that invoked the call
    pub sender: ClientId,
}

pub type RpcExecuteFn = Box<
    dyn Fn(&mut dyn Any, &mut NetworkStream, &RpcContext) -> Result<(), SerdeErr> + Send + Sync,
>;

pub struct RpcEntry {
    execute: RpcExecuteFn,
    /// The server may invoke this RPC, clients execute it
    pub is_server: bool,
    /// Clients may invoke this RPC, the server executes it
    pub is_client: bool,
    pub channel: ChannelType,
}

impl RpcEntry {
    pub fn new(execute: RpcExecuteFn, is_server: bool, is_client: bool, channel: ChannelType) -> Self {
        Self {
            execute,
            is_server,
            is_client,
            channel,
        }
    }

    pub fn can_invoke(&self, host_type: HostType) -> bool {
        match host_type {
            HostType::Server => self.is_server,
            HostType::Client => self.is_client,
        }
    }

    /// Whether a participant of `host_type` runs calls that arrive from the other side
    pub fn executes_on(&self, host_type: HostType) -> bool {
        self.can_invoke(host_type.invert())
    }

    pub(crate) fn execute(
        &self,
        instance: &mut dyn Any,
        stream: &mut NetworkStream,
        context: &RpcContext,
    ) -> Result<(), SerdeErr> {
        (self.execute)(instance, stream, context)
    }
}

/// Per-type method tables, looked up by type key and method name
#[derive(Default)]
pub struct RpcTable {
    entries: HashMap<TypeKey, HashMap<String, RpcEntry>>,
}

impl RpcTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn add(&mut self, type_key: TypeKey, name: String, entry: RpcEntry) -> bool {
        let methods = self.entries.entry(type_key.clone()).or_default();
        let replaced = methods.insert(name.clone(), entry).is_some();
        if replaced {
            warn!("RPC {}::{} registered twice, keeping the latest", type_key, name);
        }
        replaced
    }

    pub fn get(&self, type_key: &TypeKey, name: &str) -> Option<&RpcEntry> {
        self.entries.get(type_key)?.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
