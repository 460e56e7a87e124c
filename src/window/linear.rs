use super::{check_distance, LookBackMemory};
use crate::error::Result;

/// Growable linear buffer with compaction
///
/// Bytes are appended to a flat vector. Once it holds twice the maximum
/// distance, the newest `max_distance` bytes are shifted to the front and
/// appending continues. Amortized O(1) per byte, O(max_distance) per compaction.
#[derive(Debug, Clone)]
pub struct LinearWindow {
    buffer: Vec<u8>,
    max_distance: usize,
    /// Length at which the buffer is compacted
    limit: usize,
    /// Total bytes ever written
    total_written: u64,
    released: bool,
}

/// Initial allocation, grown on demand up to `limit`
const INITIAL_CAPACITY: usize = 4096;

impl LinearWindow {
    pub fn new(max_distance: usize) -> Self {
        let max_distance = max_distance.max(1);
        let limit = max_distance.saturating_mul(2);
        Self {
            buffer: Vec::with_capacity(INITIAL_CAPACITY.min(limit)),
            max_distance,
            limit,
            total_written: 0,
            released: false,
        }
    }

    /// Total bytes ever written
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    fn retained(&self) -> usize {
        self.buffer.len().min(self.max_distance)
    }

    /// Keep only the newest `max_distance` bytes, moved to the front
    fn compact(&mut self) {
        let keep_from = self.buffer.len() - self.max_distance;
        self.buffer.copy_within(keep_from.., 0);
        self.buffer.truncate(self.max_distance);
    }

    #[inline]
    fn room(&mut self) -> usize {
        if self.buffer.len() == self.limit {
            self.compact();
        }
        self.limit - self.buffer.len()
    }
}

impl LookBackMemory for LinearWindow {
    fn put(&mut self, byte: u8) {
        self.room();
        self.buffer.push(byte);
        self.total_written += 1;
    }

    fn put_slice(&mut self, bytes: &[u8]) -> usize {
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = self.room().min(rest.len());
            self.buffer.extend_from_slice(&rest[..n]);
            rest = &rest[n..];
        }
        self.total_written += bytes.len() as u64;
        bytes.len()
    }

    fn copy(&mut self, distance: usize) -> Result<u8> {
        check_distance(distance, self.retained())?;
        let byte = self.buffer[self.buffer.len() - distance];
        self.put(byte);
        Ok(byte)
    }

    fn copy_into(&mut self, distance: usize, out: &mut [u8]) -> Result<usize> {
        check_distance(distance, self.retained())?;

        let mut done = 0;
        while done < out.len() {
            // At most `distance` bytes per step so the source never overlaps the tail
            let n = self.room().min(distance).min(out.len() - done);
            let src = self.buffer.len() - distance;
            self.buffer.extend_from_within(src..src + n);
            out[done..done + n].copy_from_slice(&self.buffer[src..src + n]);
            done += n;
        }
        self.total_written += out.len() as u64;
        Ok(out.len())
    }

    fn available(&self) -> usize {
        self.max_distance
    }

    fn len(&self) -> usize {
        self.retained()
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.total_written = 0;
    }

    fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.buffer = Vec::new();
        self.total_written = 0;
        self.released = true;
        true
    }
}
