pub mod object_id;
pub mod object_world;
pub mod ownership_resolver;
pub mod recent_ids;
pub mod replication_entry;
pub mod replication_registry;
pub mod spawn_coordinator;
