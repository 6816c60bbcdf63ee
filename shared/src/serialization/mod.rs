pub mod error;
pub mod network_serialize;
pub mod serializer_registry;
pub mod type_key;
