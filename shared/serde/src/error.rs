use thiserror::Error;

/// Errors that can occur while reading from or writing to a `NetworkStream`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The stream ended before the requested number of bytes could be read
    #[error("Unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },

    /// A length-prefixed string did not contain valid UTF-8
    #[error("String payload is not valid UTF-8")]
    InvalidUtf8,

    /// A decoded value is outside of the range its type allows
    #[error("Invalid value for {type_name}: {value}")]
    InvalidValue { type_name: &'static str, value: u64 },

    /// A type-erased instance handed to a serializer was not of the expected type
    #[error("Instance type mismatch: expected {expected}")]
    TypeMismatch { expected: &'static str },
}
