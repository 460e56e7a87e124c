use super::{check_distance, LookBackMemory};
use crate::error::Result;

/// Capacity allocated on first write
const INITIAL_CAPACITY: usize = 1024;

/// Circular buffer window
///
/// Capacity starts small and doubles (up to `max_distance`) while the buffer
/// fills. Once at full size the oldest byte is overwritten on every write.
#[derive(Debug, Clone)]
pub struct RingWindow {
    /// Backing storage; `buf.len()` is the current capacity
    buf: Vec<u8>,
    /// Next write position
    head: usize,
    /// Valid bytes, at most `buf.len()`
    filled: usize,
    max_distance: usize,
    released: bool,
}

impl RingWindow {
    pub fn new(max_distance: usize) -> Self {
        Self {
            buf: Vec::new(),
            head: 0,
            filled: 0,
            max_distance: max_distance.max(1),
            released: false,
        }
    }

    /// Current capacity
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn can_grow(&self) -> bool {
        self.buf.len() < self.max_distance
    }

    /// Grow when full and below `max_distance`; data is linearized oldest-first
    fn reserve(&mut self) {
        let cap = self.buf.len();
        if self.filled < cap || !self.can_grow() {
            return;
        }
        let new_cap = if cap == 0 {
            INITIAL_CAPACITY.min(self.max_distance)
        } else {
            cap.saturating_mul(2).min(self.max_distance)
        };
        self.buf.rotate_left(self.head % cap.max(1));
        self.head = cap;
        self.buf.resize(new_cap, 0);
    }

    /// Largest chunk writable at `head` without wrapping or overwriting
    /// bytes that a pending growth would still keep
    #[inline]
    fn writable(&mut self) -> usize {
        self.reserve();
        let cap = self.buf.len();
        let to_end = cap - self.head;
        if self.can_grow() {
            to_end.min(cap - self.filled)
        } else {
            to_end
        }
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        let cap = self.buf.len();
        self.head = (self.head + n) % cap;
        self.filled = (self.filled + n).min(cap);
    }

    #[inline]
    fn source(&self, distance: usize) -> usize {
        let cap = self.buf.len();
        (self.head + cap - distance) % cap
    }
}

impl LookBackMemory for RingWindow {
    fn put(&mut self, byte: u8) {
        self.reserve();
        self.buf[self.head] = byte;
        self.advance(1);
    }

    fn put_slice(&mut self, bytes: &[u8]) -> usize {
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = self.writable().min(rest.len());
            self.buf[self.head..self.head + n].copy_from_slice(&rest[..n]);
            self.advance(n);
            rest = &rest[n..];
        }
        bytes.len()
    }

    fn copy(&mut self, distance: usize) -> Result<u8> {
        check_distance(distance, self.filled)?;
        // Read before writing: at full distance the slot is about to be reused
        let byte = self.buf[self.source(distance)];
        self.put(byte);
        Ok(byte)
    }

    fn copy_into(&mut self, distance: usize, out: &mut [u8]) -> Result<usize> {
        check_distance(distance, self.filled)?;

        let mut done = 0;
        while done < out.len() {
            let room = self.writable();
            let src = self.source(distance);
            let n = room
                .min(distance)
                .min(self.buf.len() - src)
                .min(out.len() - done);
            let head = self.head;
            self.buf.copy_within(src..src + n, head);
            out[done..done + n].copy_from_slice(&self.buf[head..head + n]);
            self.advance(n);
            done += n;
        }
        Ok(out.len())
    }

    fn available(&self) -> usize {
        self.max_distance
    }

    fn len(&self) -> usize {
        self.filled
    }

    fn clear(&mut self) {
        self.buf = Vec::new();
        self.head = 0;
        self.filled = 0;
    }

    fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.clear();
        self.released = true;
        true
    }
}
