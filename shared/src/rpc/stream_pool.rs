use replica_serde::NetworkStream;

/// Reusable argument streams for outbound and inbound RPCs
pub struct StreamPool {
    streams: Vec<NetworkStream>,
    capacity: usize,
}

impl StreamPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            streams: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns an empty stream, reusing a released buffer when one is available
    pub fn acquire(&mut self) -> NetworkStream {
        match self.streams.pop() {
            Some(mut stream) => {
                stream.initialize();
                stream
            }
            None => NetworkStream::new(),
        }
    }

    pub fn release(&mut self, stream: NetworkStream) {
        if self.streams.len() < self.capacity {
            self.streams.push(stream);
        }
    }

    pub fn pooled(&self) -> usize {
        self.streams.len()
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }
}
