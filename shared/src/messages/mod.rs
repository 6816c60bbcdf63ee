pub mod channel;
pub mod error;
pub mod message_type;
pub mod replication_message;
