use crate::{error::SerdeErr, integer::UnsignedVariableInteger, serde::Serde};

/// A growable byte buffer with independent read and write cursors.
///
/// Writes always append at the write cursor (the end of the buffer), reads
/// consume from the read cursor. Both cursors can be captured with
/// [`NetworkStream::checkpoint`] and restored with [`NetworkStream::rollback`]
/// so a failed serializer leaves the stream exactly as it found it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NetworkStream {
    buffer: Vec<u8>,
    read_position: usize,
}

/// Saved cursor positions of a `NetworkStream`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCheckpoint {
    write_position: usize,
    read_position: usize,
}

impl NetworkStream {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            read_position: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            read_position: 0,
        }
    }

    /// Creates a stream positioned at the start of `bytes`
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            read_position: 0,
        }
    }

    /// Resets both cursors, keeping the allocation
    pub fn initialize(&mut self) {
        self.buffer.clear();
        self.read_position = 0;
    }

    /// Resets the stream to read `bytes` from the start
    pub fn initialize_with(&mut self, bytes: &[u8]) {
        self.buffer.clear();
        self.buffer.extend_from_slice(bytes);
        self.read_position = 0;
    }

    pub fn write_position(&self) -> usize {
        self.buffer.len()
    }

    pub fn read_position(&self) -> usize {
        self.read_position
    }

    /// Bytes written but not read yet
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.read_position
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// The bytes between the read cursor and the write cursor
    pub fn unread_bytes(&self) -> &[u8] {
        &self.buffer[self.read_position..]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn checkpoint(&self) -> StreamCheckpoint {
        StreamCheckpoint {
            write_position: self.buffer.len(),
            read_position: self.read_position,
        }
    }

    /// Restores the cursors captured by `checkpoint`, discarding anything
    /// written since.
    pub fn rollback(&mut self, checkpoint: StreamCheckpoint) {
        self.buffer.truncate(checkpoint.write_position);
        self.read_position = checkpoint.read_position.min(self.buffer.len());
    }

    // Writing

    pub fn write_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a length-prefixed blob
    pub fn write_blob(&mut self, bytes: &[u8]) {
        UnsignedVariableInteger::from(bytes.len()).ser(self);
        self.write_bytes(bytes);
    }

    pub fn write<T: Serde>(&mut self, value: &T) {
        value.ser(self);
    }

    // Reading

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let byte = self
            .buffer
            .get(self.read_position)
            .copied()
            .ok_or(SerdeErr::UnexpectedEnd {
                needed: 1,
                remaining: 0,
            })?;
        self.read_position += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<&[u8], SerdeErr> {
        let remaining = self.remaining();
        if length > remaining {
            return Err(SerdeErr::UnexpectedEnd {
                needed: length,
                remaining,
            });
        }
        let start = self.read_position;
        self.read_position += length;
        Ok(&self.buffer[start..self.read_position])
    }

    /// Reads a fixed-size array, used by the primitive impls
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SerdeErr> {
        let mut output = [0u8; N];
        output.copy_from_slice(self.read_bytes(N)?);
        Ok(output)
    }

    /// Reads a length-prefixed blob
    pub fn read_blob(&mut self) -> Result<Vec<u8>, SerdeErr> {
        let length = self.read_length()?;
        Ok(self.read_bytes(length)?.to_vec())
    }

    pub fn read<T: Serde>(&mut self) -> Result<T, SerdeErr> {
        T::de(self)
    }

    /// Reads a variable-length prefix and checks it against the bytes left,
    /// so a corrupt prefix can never trigger a huge allocation.
    pub(crate) fn read_length(&mut self) -> Result<usize, SerdeErr> {
        let length = UnsignedVariableInteger::de(self)?.get();
        let remaining = self.remaining();
        if length > remaining as u64 {
            return Err(SerdeErr::UnexpectedEnd {
                needed: usize::try_from(length).unwrap_or(usize::MAX),
                remaining,
            });
        }
        Ok(length as usize)
    }
}
