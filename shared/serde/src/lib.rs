//! # Replica Serde
//! Byte stream and serialization primitives shared by every participant.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod error;
mod integer;
mod network_stream;
mod serde;

pub use error::SerdeErr;
pub use integer::UnsignedVariableInteger;
pub use network_stream::{NetworkStream, StreamCheckpoint};
pub use serde::Serde;
