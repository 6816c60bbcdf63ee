use crate::{error::SerdeErr, integer::UnsignedVariableInteger, network_stream::NetworkStream};

/// A type that can write itself into, and read itself back from, a
/// `NetworkStream`. All multi-byte primitives are little-endian.
pub trait Serde: Sized {
    fn ser(&self, stream: &mut NetworkStream);

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr>;
}

macro_rules! impl_serde_for_number {
    ($($t:ty),*) => {
        $(
            impl Serde for $t {
                fn ser(&self, stream: &mut NetworkStream) {
                    stream.write_bytes(&self.to_le_bytes());
                }

                fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
                    Ok(<$t>::from_le_bytes(stream.read_array()?))
                }
            }
        )*
    };
}

impl_serde_for_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Serde for bool {
    fn ser(&self, stream: &mut NetworkStream) {
        stream.write_byte(u8::from(*self));
    }

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
        match stream.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerdeErr::InvalidValue {
                type_name: "bool",
                value: u64::from(other),
            }),
        }
    }
}

impl Serde for String {
    fn ser(&self, stream: &mut NetworkStream) {
        stream.write_blob(self.as_bytes());
    }

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
        let length = stream.read_length()?;
        let bytes = stream.read_bytes(length)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| SerdeErr::InvalidUtf8)
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, stream: &mut NetworkStream) {
        match self {
            Some(value) => {
                true.ser(stream);
                value.ser(stream);
            }
            None => false.ser(stream),
        }
    }

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
        if bool::de(stream)? {
            Ok(Some(T::de(stream)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, stream: &mut NetworkStream) {
        UnsignedVariableInteger::from(self.len()).ser(stream);
        for item in self {
            item.ser(stream);
        }
    }

    fn de(stream: &mut NetworkStream) -> Result<Self, SerdeErr> {
        // every element occupies at least one byte
        let length = stream.read_length()?;
        let mut output = Vec::with_capacity(length);
        for _ in 0..length {
            output.push(T::de(stream)?);
        }
        Ok(output)
    }
}
