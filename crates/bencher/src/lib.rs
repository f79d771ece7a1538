#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    payload: TestPayload,
}

impl TestCase {
    pub fn new(name: &'static str, payload: TestPayload) -> Self {
        Self { name, payload }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn payload(&self) -> &TestPayload {
        &self.payload
    }
}

/// A synthetic font payload, delivered in `chunk_size` pieces when read as a stream.
#[derive(Debug, Copy, Clone)]
pub struct TestPayload {
    size: usize,
    chunk_size: usize,
}

impl TestPayload {
    pub const fn new(size: usize, chunk_size: usize) -> Self {
        Self { size, chunk_size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Deterministic bytes of the configured size.
    pub fn bytes(&self) -> Vec<u8> {
        (0..self.size).map(|i| (i % 251) as u8).collect()
    }
}
