use std::default::Default;

use crate::messages::channel::ChannelType;

/// Contains Config properties which will be used by the `Replicator`
#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    /// Channel used for StateDelta messages
    pub state_channel: ChannelType,
    /// Channel used for Spawn, Despawn and OwnershipChange messages.
    /// Ownership changes rely on this channel being ordered and reliable.
    pub control_channel: ChannelType,
    /// Maximum depth walked when applying ownership hierarchically
    pub max_hierarchy_depth: usize,
    /// Number of released RPC streams kept for reuse
    pub stream_pool_capacity: usize,
    /// Number of recently despawned object ids remembered so late messages
    /// addressed to them are dropped early
    pub despawned_memory: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            state_channel: ChannelType::Unreliable,
            control_channel: ChannelType::ReliableOrdered,
            max_hierarchy_depth: 64,
            stream_pool_capacity: 8,
            despawned_memory: 1024,
        }
    }
}
