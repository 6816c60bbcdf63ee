use std::any::Any;

use replica_serde::NetworkStream;

use crate::{
    error::ReplicationError, protocol::Protocol,
    serialization::serializer_registry::SerializeMode, ObjectId, TypeKey,
};

/// Structures that implement the ObjectWorld trait are able to hand out
/// replicated instances by id, and to build and tear down remote mirrors
pub trait ObjectWorld {
    /// The instance the given object id refers to, if it exists
    fn object_mut(&mut self, object_id: &ObjectId) -> Option<&mut dyn Any>;

    /// Builds a default instance of `type_key` under `object_id`.
    /// Returns false if the type cannot be constructed locally.
    fn construct_object(&mut self, object_id: &ObjectId, type_key: &TypeKey) -> bool;

    /// Drops the instance stored under `object_id`, if any
    fn destroy_object(&mut self, object_id: &ObjectId);
}

pub(crate) fn write_state<W: ObjectWorld>(
    protocol: &Protocol,
    world: &mut W,
    object_id: ObjectId,
    type_key: &TypeKey,
) -> Result<Vec<u8>, ReplicationError> {
    let instance = world
        .object_mut(&object_id)
        .ok_or(ReplicationError::MissingInstance { object_id })?;
    let mut stream = NetworkStream::new();
    protocol.serializers().invoke_serializer(
        type_key,
        instance,
        &mut stream,
        SerializeMode::Serialize,
    )?;
    Ok(stream.into_bytes())
}

pub(crate) fn read_state<W: ObjectWorld>(
    protocol: &Protocol,
    world: &mut W,
    object_id: ObjectId,
    type_key: &TypeKey,
    state: &[u8],
) -> Result<(), ReplicationError> {
    let instance = world
        .object_mut(&object_id)
        .ok_or(ReplicationError::MissingInstance { object_id })?;
    let mut stream = NetworkStream::from_bytes(state.to_vec());
    protocol.serializers().invoke_serializer(
        type_key,
        instance,
        &mut stream,
        SerializeMode::Deserialize,
    )?;
    Ok(())
}
