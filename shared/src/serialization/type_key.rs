use std::{borrow::Cow, fmt};

use replica_serde::{NetworkStream, Serde, SerdeErr};

/// Stable cross-process identifier of a replicable type.
///
/// Every participant must resolve the same type to the same key; keys that
/// differ between participants show up as schema mismatches.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    /// Default type-identity resolver: the fully qualified Rust type name
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<T>()))
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeKey {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl Serde for TypeKey {
    fn ser(&self, stream: &mut NetworkStream) {
        stream.write_blob(self.0.as_bytes());
    }

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
        Ok(Self::new(String::de(stream)?))
    }
}
