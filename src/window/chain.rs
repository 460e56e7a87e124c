use super::{check_distance, LookBackMemory};
use crate::error::Result;
use std::collections::VecDeque;

/// Block count used when none is given
pub const DEFAULT_BLOCKS: usize = 4;

/// Window made of a short chain of fixed-size blocks
///
/// With `k` blocks of `ceil(max_distance / (k - 1))` bytes, the partially
/// filled newest block plus `k - 1` full ones always cover `max_distance`.
/// When the newest block fills up, the oldest one is recycled as the new tail,
/// so no byte is ever moved after it is written.
#[derive(Debug)]
pub struct BlockChainWindow {
    blocks: VecDeque<Box<[u8]>>,
    spare: Vec<Box<[u8]>>,
    block_size: usize,
    max_blocks: usize,
    /// Bytes used in the newest block
    fill: usize,
    retained: usize,
    max_distance: usize,
    released: bool,
}

impl BlockChainWindow {
    pub fn new(max_distance: usize) -> Self {
        Self::with_blocks(max_distance, DEFAULT_BLOCKS)
    }

    /// `blocks` is clamped to at least 2
    pub fn with_blocks(max_distance: usize, blocks: usize) -> Self {
        let max_distance = max_distance.max(1);
        let max_blocks = blocks.max(2);
        let full_blocks = max_blocks - 1;
        let block_size =
            max_distance / full_blocks + usize::from(max_distance % full_blocks != 0);
        Self {
            blocks: VecDeque::with_capacity(max_blocks),
            spare: Vec::new(),
            block_size,
            max_blocks,
            fill: 0,
            retained: 0,
            max_distance,
            released: false,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Blocks currently holding history
    pub fn active_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Ensure the newest block has room, rotating in a fresh one if needed
    fn reserve(&mut self) -> usize {
        if self.blocks.is_empty() || self.fill == self.block_size {
            if self.blocks.len() == self.max_blocks {
                if let Some(oldest) = self.blocks.pop_front() {
                    self.spare.push(oldest);
                }
            }
            let block = self
                .spare
                .pop()
                .unwrap_or_else(|| vec![0u8; self.block_size].into_boxed_slice());
            self.blocks.push_back(block);
            self.fill = 0;
        }
        self.block_size - self.fill
    }

    /// Block index and offset of the byte `distance` back
    #[inline]
    fn locate(&self, distance: usize) -> (usize, usize) {
        let last = self.blocks.len() - 1;
        if distance <= self.fill {
            return (last, self.fill - distance);
        }
        let beyond = distance - self.fill - 1;
        let back = 1 + beyond / self.block_size;
        let offset = self.block_size - 1 - beyond % self.block_size;
        (last - back, offset)
    }

    /// Append `bytes`, which must fit in the newest block
    #[inline]
    fn append(&mut self, bytes: &[u8]) {
        let fill = self.fill;
        if let Some(block) = self.blocks.back_mut() {
            block[fill..fill + bytes.len()].copy_from_slice(bytes);
        }
        self.fill += bytes.len();
        self.retained = (self.retained + bytes.len()).min(self.max_distance);
    }
}

impl LookBackMemory for BlockChainWindow {
    fn put(&mut self, byte: u8) {
        self.reserve();
        self.append(&[byte]);
    }

    fn put_slice(&mut self, bytes: &[u8]) -> usize {
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = self.reserve().min(rest.len());
            self.append(&rest[..n]);
            rest = &rest[n..];
        }
        bytes.len()
    }

    fn copy(&mut self, distance: usize) -> Result<u8> {
        check_distance(distance, self.retained)?;
        let (block, offset) = self.locate(distance);
        let byte = self.blocks[block][offset];
        self.put(byte);
        Ok(byte)
    }

    fn copy_into(&mut self, distance: usize, out: &mut [u8]) -> Result<usize> {
        check_distance(distance, self.retained)?;

        let mut done = 0;
        while done < out.len() {
            let room = self.reserve();
            let (block, offset) = self.locate(distance);
            let block_end = if block == self.blocks.len() - 1 { self.fill } else { self.block_size };
            let n = room
                .min(distance)
                .min(block_end - offset)
                .min(out.len() - done);

            let chunk = &mut out[done..done + n];
            chunk.copy_from_slice(&self.blocks[block][offset..offset + n]);
            self.append(chunk);
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
        self.spare.extend(self.blocks.drain(..));
        self.fill = 0;
        self.retained = 0;
    }

    fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.blocks = VecDeque::new();
        self.spare = Vec::new();
        self.fill = 0;
        self.retained = 0;
        self.released = true;
        true
    }
}
