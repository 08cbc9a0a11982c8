/// Append-only byte buffer for code and data. Capacity grows by doubling.
#[derive(Debug, Default)]
pub struct CodeBuffer {
    bytes: Vec<u8>,
}

const INITIAL_CAPACITY: usize = 64;

impl CodeBuffer {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// A buffer that starts out holding `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        let mut buf = Self::new();
        buf.extend(&vec![0; len]);
        buf
    }

    fn grow_for(&mut self, additional: usize) {
        let needed = self.bytes.len() + additional;
        if needed <= self.bytes.capacity() {
            return;
        }
        let mut capacity = self.bytes.capacity().max(INITIAL_CAPACITY);
        while capacity < needed {
            capacity *= 2;
        }
        self.bytes.reserve_exact(capacity - self.bytes.len());
    }

    pub fn push(&mut self, byte: u8) {
        self.grow_for(1);
        self.bytes.push(byte);
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.grow_for(bytes.len());
        self.bytes.extend_from_slice(bytes);
    }

    /// Overwrite bytes already written, starting at `at`.
    pub fn patch(&mut self, at: usize, bytes: &[u8]) {
        self.bytes[at..at + bytes.len()].copy_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
