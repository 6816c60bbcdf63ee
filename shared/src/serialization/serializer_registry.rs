use std::{any::Any, collections::HashMap, sync::Arc};

use log::warn;

use replica_serde::{NetworkStream, SerdeErr};

use crate::serialization::{error::SerializerError, type_key::TypeKey};

/// Opaque value handed unchanged to a serializer callback
pub type SerializerTag = Option<Arc<dyn Any + Send + Sync>>;

/// Type-erased serialize or deserialize callback
pub type SerializeFn = Box<
    dyn Fn(&mut dyn Any, &mut NetworkStream, &SerializerTag) -> Result<(), SerdeErr>
        + Send
        + Sync,
>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializeMode {
    Serialize,
    Deserialize,
}

pub struct SerializerEntry {
    serialize: SerializeFn,
    deserialize: SerializeFn,
    serialize_tag: SerializerTag,
    deserialize_tag: SerializerTag,
}

impl SerializerEntry {
    pub fn new(
        serialize: SerializeFn,
        deserialize: SerializeFn,
        serialize_tag: SerializerTag,
        deserialize_tag: SerializerTag,
    ) -> Self {
        Self {
            serialize,
            deserialize,
            serialize_tag,
            deserialize_tag,
        }
    }

    fn call(
        &self,
        instance: &mut dyn Any,
        stream: &mut NetworkStream,
        mode: SerializeMode,
    ) -> Result<(), SerdeErr> {
        match mode {
            SerializeMode::Serialize => (self.serialize)(instance, stream, &self.serialize_tag),
            SerializeMode::Deserialize => {
                (self.deserialize)(instance, stream, &self.deserialize_tag)
            }
        }
    }
}

/// Maps a `TypeKey` to the pair of callbacks that replicate instances of it.
///
/// Registering a key twice replaces the earlier entry (logged). Entries are
/// immutable once the owning `Protocol` is locked.
#[derive(Default)]
pub struct SerializerRegistry {
    entries: HashMap<TypeKey, SerializerEntry>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns true if an earlier entry for `type_key` was replaced
    pub fn add_serializer(&mut self, type_key: TypeKey, entry: SerializerEntry) -> bool {
        let replaced = self.entries.insert(type_key.clone(), entry).is_some();
        if replaced {
            warn!("Serializer for type {} registered twice, keeping the latest", type_key);
        }
        replaced
    }

    pub fn contains(&self, type_key: &TypeKey) -> bool {
        self.entries.contains_key(type_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the registered callback for `type_key` in the given mode.
    ///
    /// The stream's cursors only move on success; on any failure the stream
    /// is rolled back to where it was.
    pub fn invoke_serializer(
        &self,
        type_key: &TypeKey,
        instance: &mut dyn Any,
        stream: &mut NetworkStream,
        mode: SerializeMode,
    ) -> Result<(), SerializerError> {
        let entry = self
            .entries
            .get(type_key)
            .ok_or_else(|| SerializerError::NotRegistered {
                type_key: type_key.to_string(),
            })?;

        let checkpoint = stream.checkpoint();
        entry.call(instance, stream, mode).map_err(|source| {
            stream.rollback(checkpoint);
            SerializerError::Failed {
                type_key: type_key.to_string(),
                source,
            }
        })
    }
}
