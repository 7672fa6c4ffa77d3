//! Byte ring buffer backing the frame splitter
//!
//! Consuming a frame is an O(1) pointer advance instead of a `Vec::drain()`.

/// Fixed-capacity ring buffer
///
/// Sized to hold several maximum-length RTCM3 frames (1029 bytes each).
pub struct RingBuffer<const N: usize = 8192> {
    data: Box<[u8; N]>,
    tail: usize, // first valid byte
    len: usize,
}

impl<const N: usize> RingBuffer<N> {
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; N]),
            tail: 0,
            len: 0,
        }
    }

    /// Append bytes; returns how many did not fit and were dropped
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let room = N - self.len;
        let take = bytes.len().min(room);
        for (i, &b) in bytes[..take].iter().enumerate() {
            self.data[(self.tail + self.len + i) % N] = b;
        }
        self.len += take;
        bytes.len() - take
    }

    /// Consume `n` bytes from the front
    #[inline]
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len);
        self.tail = (self.tail + n) % N;
        self.len -= n;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte at logical index
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        (index < self.len).then(|| self.data[(self.tail + index) % N])
    }

    /// Offset of the first byte contained in `leads`
    pub fn position_of_any(&self, leads: &[u8]) -> Option<usize> {
        (0..self.len).find(|&i| leads.contains(&self.data[(self.tail + i) % N]))
    }

    /// Offset of `byte` at or after `from`
    pub fn position_from(&self, from: usize, byte: u8) -> Option<usize> {
        (from..self.len).find(|&i| self.data[(self.tail + i) % N] == byte)
    }

    /// Copy `len` bytes starting at logical `start` out of the buffer
    pub fn copy_range(&self, start: usize, len: usize) -> Option<Vec<u8>> {
        if start + len > self.len {
            return None;
        }
        Some(
            (start..start + len)
                .map(|i| self.data[(self.tail + i) % N])
                .collect(),
        )
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut rb: RingBuffer<16> = RingBuffer::new();
        assert!(rb.is_empty());

        assert_eq!(rb.extend(&[1, 2, 3, 4, 5]), 0);
        assert_eq!(rb.len(), 5);
        assert_eq!(rb.get(0), Some(1));
        assert_eq!(rb.get(4), Some(5));
        assert_eq!(rb.get(5), None);
    }

    #[test]
    fn test_overflow_reports_dropped() {
        let mut rb: RingBuffer<4> = RingBuffer::new();
        assert_eq!(rb.extend(&[1, 2, 3, 4, 5, 6]), 2);
        assert_eq!(rb.copy_range(0, 4).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_wraparound_copy() {
        let mut rb: RingBuffer<8> = RingBuffer::new();
        rb.extend(&[1, 2, 3, 4, 5, 6]);
        rb.advance(5);
        rb.extend(&[7, 8, 9]);

        assert_eq!(rb.len(), 4);
        assert_eq!(rb.copy_range(0, 4).unwrap(), vec![6, 7, 8, 9]);
        assert_eq!(rb.copy_range(2, 3), None);
    }

    #[test]
    fn test_search() {
        let mut rb: RingBuffer<32> = RingBuffer::new();
        rb.extend(&[0x00, 0xFF, 0xD3, 0xB5, 0x62, b'\r', b'\n']);

        assert_eq!(rb.position_of_any(&[0xB5, 0xD3]), Some(2));
        assert_eq!(rb.position_of_any(&[0xAA]), None);
        assert_eq!(rb.position_from(3, b'\n'), Some(6));
    }
}
