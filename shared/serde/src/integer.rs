use crate::{error::SerdeErr, network_stream::NetworkStream, serde::Serde};

/// Unsigned integer written with a variable number of bytes: 7 bits of
/// payload per byte, high bit set while more bytes follow.
/// Used as the length prefix of strings, blobs and sequences.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct UnsignedVariableInteger {
    value: u64,
}

const MAX_ENCODED_BYTES: usize = 10;

impl UnsignedVariableInteger {
    pub fn new<T: Into<u64>>(value: T) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn get(&self) -> u64 {
        self.value
    }

    /// Number of bytes this value occupies once written
    pub fn byte_length(&self) -> usize {
        let mut length = 1;
        let mut rest = self.value >> 7;
        while rest != 0 {
            length += 1;
            rest >>= 7;
        }
        length
    }
}

impl Serde for UnsignedVariableInteger {
    fn ser(&self, stream: &mut NetworkStream) {
        let mut rest = self.value;
        loop {
            let byte = (rest & 0x7f) as u8;
            rest >>= 7;
            if rest == 0 {
                stream.write_byte(byte);
                return;
            }
            stream.write_byte(byte | 0x80);
        }
    }

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
        let mut value: u64 = 0;
        for index in 0..MAX_ENCODED_BYTES {
            let byte = stream.read_byte()?;
            let payload = u64::from(byte & 0x7f);
            // the tenth byte may only carry the single remaining bit
            if index == MAX_ENCODED_BYTES - 1 && payload > 1 {
                return Err(SerdeErr::InvalidValue {
                    type_name: "UnsignedVariableInteger",
                    value: payload,
                });
            }
            value |= payload << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(Self { value });
            }
        }
        Err(SerdeErr::InvalidValue {
            type_name: "UnsignedVariableInteger",
            value,
        })
    }
}

impl From<usize> for UnsignedVariableInteger {
    fn from(value: usize) -> Self {
        Self {
            value: value as u64,
        }
    }
}
