use std::any::{type_name, Any};

use replica_serde::{NetworkStream, SerdeErr};

use crate::serialization::serializer_registry::{SerializerEntry, SerializerTag};

/// Implemented by types that know how to replicate themselves.
/// `Protocol::add_serializable` turns an implementation into a type-erased
/// `SerializerEntry`.
pub trait NetworkSerialize: Any + Send {
    fn serialize(&self, stream: &mut NetworkStream);

    fn deserialize(&mut self, stream: &mut NetworkStream) -> Result<(), SerdeErr>;
}

pub(crate) fn downcast_instance<T: Any>(instance: &mut dyn Any) -> Result<&mut T, SerdeErr> {
    instance
        .downcast_mut::<T>()
        .ok_or(SerdeErr::TypeMismatch {
            expected: type_name::<T>(),
        })
}

pub(crate) fn serializable_entry<T: NetworkSerialize>() -> SerializerEntry {
    SerializerEntry::new(
        Box::new(|instance: &mut dyn Any, stream: &mut NetworkStream, _: &SerializerTag| {
            downcast_instance::<T>(instance)?.serialize(stream);
            Ok(())
        }),
        Box::new(|instance: &mut dyn Any, stream: &mut NetworkStream, _: &SerializerTag| {
            downcast_instance::<T>(instance)?.deserialize(stream)
        }),
        None,
        None,
    )
}
