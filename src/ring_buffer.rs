/// Fixed-capacity circular byte buffer
///
/// - `head` is the next write index, `tail` the next read index
/// - Writing into a full buffer overwrites the oldest unread byte
/// - No allocation, no locking: owned by a single producer/flusher pair
#[derive(Clone)]
pub struct RingBuffer<const N: usize> {
    storage: [u8; N],
    head: usize,
    tail: usize,
    full: bool,
}

impl<const N: usize> RingBuffer<N> {
    const NON_EMPTY: () = assert!(N > 0, "RingBuffer capacity must be > 0");

    /// Create an empty ring buffer
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Self {
            storage: [0; N],
            head: 0,
            tail: 0,
            full: false,
        }
    }

    /// Append one byte, overwriting the oldest byte when full
    #[inline]
    pub fn put(&mut self, byte: u8) {
        self.storage[self.head] = byte;
        if self.full {
            self.tail = (self.tail + 1) % N;
        }
        self.head = (self.head + 1) % N;
        self.full = self.head == self.tail;
    }

    /// Pop the oldest byte
    ///
    /// # Returns
    /// * `None` if the buffer is empty
    #[inline]
    pub fn get(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }

        let byte = self.storage[self.tail];
        self.full = false;
        self.tail = (self.tail + 1) % N;
        Some(byte)
    }

    /// Discard all contents and rewind both indices to 0
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.full = false;
    }

    /// Next write index
    pub fn head(&self) -> usize {
        self.head
    }

    /// Next read index
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Number of unread bytes
    pub fn size(&self) -> usize {
        if self.full {
            N
        } else if self.head >= self.tail {
            self.head - self.tail
        } else {
            N + self.head - self.tail
        }
    }

    /// Get the capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns true if no bytes are buffered
    pub fn is_empty(&self) -> bool {
        !self.full && self.head == self.tail
    }

    /// Returns true if the next `put` overwrites the oldest byte
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Borrow the whole backing array
    ///
    /// Indices are the ones reported by `head()`/`tail()`. The view is only
    /// meaningful until the next mutating call.
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// Get the unread bytes as up to two slices in logical order
    ///
    /// The second slice is empty unless the contents wrap past the end of
    /// the backing array.
    pub fn segments(&self) -> (&[u8], &[u8]) {
        let len = self.size();
        if len == 0 {
            return (&[], &[]);
        }
        let first = (N - self.tail).min(len);
        (
            &self.storage[self.tail..self.tail + first],
            &self.storage[..len - first],
        )
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> std::fmt::Debug for RingBuffer<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &N)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("size", &self.size())
            .field("full", &self.full)
            .finish()
    }
}
