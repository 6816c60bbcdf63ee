pub mod rpc_dispatcher;
pub mod rpc_table;
pub mod stream_pool;
