use std::collections::VecDeque;

/// A bounded in-order byte queue connecting a writer to a reader.
///
/// The writer pushes bytes with [`write`](ByteStream::write) and finishes
/// with [`end_input`](ByteStream::end_input); the reader drains them with
/// [`read`](ByteStream::read) / [`pop`](ByteStream::pop). At most
/// `capacity` bytes are buffered at any time.
#[derive(Debug)]
pub struct ByteStream {
    buf: VecDeque<u8>,
    capacity: usize,

    bytes_written: u64,
    bytes_read: u64,

    input_ended: bool,
    error: bool,
}

impl ByteStream {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(64 * 1024)),
            capacity,
            bytes_written: 0,
            bytes_read: 0,
            input_ended: false,
            error: false,
        }
    }

    /// Accepts as much of `data` as fits into the remaining capacity and
    /// returns the accepted count. Nothing is accepted once input ended.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if self.input_ended {
            return 0;
        }
        let accepted = data.len().min(self.remaining_capacity());
        self.buf.extend(&data[..accepted]);
        self.bytes_written += accepted as u64;
        accepted
    }

    /// Copies up to `n` buffered bytes without removing them.
    #[must_use]
    pub fn peek(&self, n: usize) -> Vec<u8> {
        self.buf.iter().copied().take(n).collect()
    }

    /// Removes up to `n` bytes from the reader side.
    pub fn pop(&mut self, n: usize) {
        let popped = n.min(self.buf.len());
        self.buf.drain(..popped);
        self.bytes_read += popped as u64;
    }

    /// Copies and removes the next `n` bytes.
    pub fn read(&mut self, n: usize) -> Vec<u8> {
        let data = self.peek(n);
        self.pop(data.len());
        data
    }

    pub fn end_input(&mut self) {
        self.input_ended = true;
    }

    #[must_use]
    pub fn input_ended(&self) -> bool {
        self.input_ended
    }

    /// The stream is exhausted: input has ended and the buffer is drained.
    #[must_use]
    pub fn eof(&self) -> bool {
        self.input_ended && self.buf.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.buf.len()
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Marks both halves as errored. Buffered data stays readable.
    pub fn set_error(&mut self) {
        self.error = true;
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error
    }
}
