use super::pool::PooledBuffer;
use super::{check_distance, LookBackMemory};
use crate::error::{Error, Result};

/// Circular window over a pool buffer, validating every byte it copies
///
/// `max_distance` is clamped to the buffer size, and may later be lowered with
/// [`shrink_max_distance`](StrictPooledWindow::shrink_max_distance).
#[derive(Debug)]
pub struct StrictPooledWindow {
    buffer: PooledBuffer,
    head: usize,
    retained: usize,
    max_distance: usize,
}

impl StrictPooledWindow {
    pub fn new(buffer: PooledBuffer, max_distance: usize) -> Self {
        let max_distance = max_distance.max(1).min(buffer.len());
        Self { buffer, head: 0, retained: 0, max_distance }
    }

    /// Lower the maximum distance; larger values are ignored
    pub fn shrink_max_distance(&mut self, max_distance: usize) {
        self.max_distance = self.max_distance.min(max_distance.max(1));
        self.retained = self.retained.min(self.max_distance);
    }
}

impl LookBackMemory for StrictPooledWindow {
    fn put(&mut self, byte: u8) {
        let len = self.buffer.len();
        if len == 0 {
            return;
        }
        self.buffer.as_mut_slice()[self.head] = byte;
        self.head = (self.head + 1) % len;
        self.retained = (self.retained + 1).min(self.max_distance);
    }

    fn put_slice(&mut self, bytes: &[u8]) -> usize {
        for &byte in bytes {
            self.put(byte);
        }
        bytes.len()
    }

    fn copy(&mut self, distance: usize) -> Result<u8> {
        if self.buffer.is_released() {
            return Err(Error::InvalidState("window already released"));
        }
        check_distance(distance, self.retained)?;
        let len = self.buffer.len();
        let byte = self.buffer.as_slice()[(self.head + len - distance) % len];
        self.put(byte);
        Ok(byte)
    }

    fn available(&self) -> usize {
        self.max_distance
    }

    fn len(&self) -> usize {
        self.retained
    }

    fn clear(&mut self) {
        self.head = 0;
        self.retained = 0;
    }

    fn release(&mut self) -> bool {
        self.clear();
        self.buffer.release()
    }
}

/// Circular window over a power-of-two pool buffer
///
/// Positions wrap with a mask and a copy is validated once per call, after
/// which whole runs are moved with slice copies.
#[derive(Debug)]
pub struct FastPooledWindow {
    buffer: PooledBuffer,
    mask: usize,
    head: usize,
    retained: usize,
    max_distance: usize,
}

impl FastPooledWindow {
    pub fn new(buffer: PooledBuffer, max_distance: usize) -> Self {
        debug_assert!(buffer.len().is_power_of_two());
        let mask = buffer.len().wrapping_sub(1);
        let max_distance = max_distance.max(1).min(buffer.len());
        Self { buffer, mask, head: 0, retained: 0, max_distance }
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        self.head = (self.head + n) & self.mask;
        self.retained = (self.retained + n).min(self.max_distance);
    }
}

impl LookBackMemory for FastPooledWindow {
    #[inline]
    fn put(&mut self, byte: u8) {
        if self.buffer.is_released() {
            return;
        }
        let head = self.head;
        self.buffer.as_mut_slice()[head] = byte;
        self.advance(1);
    }

    fn put_slice(&mut self, bytes: &[u8]) -> usize {
        if self.buffer.is_released() {
            return bytes.len();
        }
        let size = self.mask + 1;
        // Only the newest `size` bytes can survive
        let skip = bytes.len().saturating_sub(size);
        if skip > 0 {
            self.advance(skip);
        }
        let mut rest = &bytes[skip..];
        while !rest.is_empty() {
            let n = rest.len().min(size - self.head);
            let head = self.head;
            self.buffer.as_mut_slice()[head..head + n].copy_from_slice(&rest[..n]);
            self.advance(n);
            rest = &rest[n..];
        }
        bytes.len()
    }

    #[inline]
    fn copy(&mut self, distance: usize) -> Result<u8> {
        if self.buffer.is_released() {
            return Err(Error::InvalidState("window already released"));
        }
        check_distance(distance, self.retained)?;
        let byte = self.buffer.as_slice()[(self.head.wrapping_sub(distance)) & self.mask];
        self.put(byte);
        Ok(byte)
    }

    fn copy_into(&mut self, distance: usize, out: &mut [u8]) -> Result<usize> {
        if self.buffer.is_released() {
            return Err(Error::InvalidState("window already released"));
        }
        check_distance(distance, self.retained)?;

        let size = self.mask + 1;
        let mut done = 0;
        while done < out.len() {
            let head = self.head;
            let src = head.wrapping_sub(distance) & self.mask;
            let n = (out.len() - done)
                .min(distance)
                .min(size - src)
                .min(size - head);
            let buf = self.buffer.as_mut_slice();
            buf.copy_within(src..src + n, head);
            out[done..done + n].copy_from_slice(&buf[head..head + n]);
            self.advance(n);
            done += n;
        }
        Ok(out.len())
    }

    fn available(&self) -> usize {
        self.max_distance
    }

    fn len(&self) -> usize {
        self.retained
    }

    fn clear(&mut self) {
        self.head = 0;
        self.retained = 0;
    }

    fn release(&mut self) -> bool {
        self.clear();
        self.buffer.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::BufferPool;

    #[test]
    fn test_strict_clamps_to_buffer() {
        let pool = BufferPool::new(16, 1);
        let window = StrictPooledWindow::new(pool.acquire(), 1000);
        assert_eq!(window.available(), 16);
    }

    #[test]
    fn test_strict_shrink() {
        let pool = BufferPool::new(64, 1);
        let mut window = StrictPooledWindow::new(pool.acquire(), 64);
        window.put_slice(b"0123456789");
        window.shrink_max_distance(4);
        assert_eq!(window.len(), 4);
        assert!(window.copy(5).is_err());
        assert_eq!(window.copy(4).unwrap(), b'6');
        window.shrink_max_distance(100);
        assert_eq!(window.available(), 4);
    }

    #[test]
    fn test_smaller_max_than_buffer() {
        let pool = BufferPool::new(64, 1);
        let mut window = FastPooledWindow::new(pool.acquire(), 8);
        window.put_slice(b"0123456789");
        assert_eq!(window.len(), 8);
        assert!(window.copy(9).is_err());
        assert_eq!(window.copy(8).unwrap(), b'2');
    }

    #[test]
    fn test_fast_long_put_slice() {
        let pool = BufferPool::new(8, 1);
        let mut window = FastPooledWindow::new(pool.acquire(), 8);
        let data: Vec<u8> = (0..21).collect();
        window.put_slice(&data);
        assert_eq!(window.copy(8).unwrap(), 13);
        assert_eq!(window.copy(1).unwrap(), 13);
    }

    #[test]
    fn test_released_window_rejects_copies() {
        let pool = BufferPool::new(64, 2);
        let mut strict = StrictPooledWindow::new(pool.acquire(), 64);
        let mut fast = FastPooledWindow::new(pool.acquire(), 64);
        assert_eq!(pool.outstanding(), 2);

        let windows: [&mut dyn LookBackMemory; 2] = [&mut strict, &mut fast];
        for window in windows {
            window.put_slice(b"abc");
            assert!(window.release());
            assert!(!window.release());
            window.put(b'x');
            assert!(matches!(window.copy(1), Err(Error::InvalidState(_))));
        }
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.pooled(), 2);
    }
}
