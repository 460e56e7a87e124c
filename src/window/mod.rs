//! Look-back memory: the sliding window DEFLATE back-references read from.
//!
//! All implementations produce identical bytes for identical call sequences;
//! they differ only in growth policy, wraparound handling and where the backing
//! storage comes from.

pub mod chain;
pub mod linear;
pub mod pool;
pub mod pooled;
pub mod ring;

pub use chain::BlockChainWindow;
pub use linear::LinearWindow;
pub use pool::{BufferPool, PooledBuffer};
pub use pooled::{FastPooledWindow, StrictPooledWindow};
pub use ring::RingWindow;

use crate::error::{Error, Result};
use std::sync::Arc;

/// Maximum back-reference distance in DEFLATE (32 KiB)
pub const DEFLATE_MAX_DISTANCE: usize = 32768;

/// Sliding window over decoded output.
///
/// Conceptually an append-only byte log of which only the last
/// [`available`](LookBackMemory::available) bytes are guaranteed retrievable.
pub trait LookBackMemory {
    /// Append one byte
    fn put(&mut self, byte: u8);

    /// Append a run of bytes, returning how many were written
    fn put_slice(&mut self, bytes: &[u8]) -> usize;

    /// Append the byte `distance` positions back and return it
    ///
    /// Requires `0 < distance <= available()` and at least `distance` bytes
    /// written; otherwise fails with [`Error::IllegalDistance`].
    fn copy(&mut self, distance: usize) -> Result<u8>;

    /// Repeat [`copy`](LookBackMemory::copy) `out.len()` times, writing each byte
    /// to `out` as well. `out.len()` may exceed `distance` (overlapping copy).
    fn copy_into(&mut self, distance: usize, out: &mut [u8]) -> Result<usize> {
        for slot in out.iter_mut() {
            *slot = self.copy(distance)?;
        }
        Ok(out.len())
    }

    /// Maximum look-back distance
    fn available(&self) -> usize;

    /// Bytes currently retrievable (`min(written, available())`)
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all history; capacity limits are unchanged
    fn clear(&mut self);

    /// Give up backing storage. Returns `true` only for the call that actually
    /// released it; later calls are no-ops. The window must not be written after.
    fn release(&mut self) -> bool;
}

/// Validate a copy distance against the retrievable history
#[inline]
pub(crate) fn check_distance(distance: usize, retained: usize) -> Result<()> {
    if distance == 0 || distance > retained {
        return Err(Error::IllegalDistance { distance, available: retained });
    }
    Ok(())
}

/// Creates a window for a given maximum distance.
pub type WindowFactory = Arc<dyn Fn(usize) -> Box<dyn LookBackMemory> + Send + Sync>;

/// Window strategy selector
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowKind {
    /// [`LinearWindow`]
    Linear,
    /// [`RingWindow`]
    #[default]
    Ring,
    /// [`BlockChainWindow`]
    BlockChain,
    /// [`StrictPooledWindow`]
    PooledStrict,
    /// [`FastPooledWindow`]
    PooledFast,
}

/// Buffers kept by the pool a pooled factory creates for itself
const DEFAULT_POOLED_BUFFERS: usize = 8;

impl WindowKind {
    pub const ALL: [WindowKind; 5] = [
        WindowKind::Linear,
        WindowKind::Ring,
        WindowKind::BlockChain,
        WindowKind::PooledStrict,
        WindowKind::PooledFast,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WindowKind::Linear => "linear",
            WindowKind::Ring => "ring",
            WindowKind::BlockChain => "chain",
            WindowKind::PooledStrict => "pooled",
            WindowKind::PooledFast => "pooled-fast",
        }
    }

    /// Factory for this kind; pooled kinds draw from a pool of their own
    pub fn factory(self) -> WindowFactory {
        let pool = match self {
            WindowKind::PooledStrict | WindowKind::PooledFast => {
                Some(BufferPool::new(DEFLATE_MAX_DISTANCE, DEFAULT_POOLED_BUFFERS))
            }
            _ => None,
        };
        self.build_factory(pool, chain::DEFAULT_BLOCKS)
    }

    /// Factory drawing pooled windows from `pool`
    pub fn factory_with_pool(self, pool: Arc<BufferPool>) -> WindowFactory {
        self.build_factory(Some(pool), chain::DEFAULT_BLOCKS)
    }

    /// Factory using `blocks` blocks for [`WindowKind::BlockChain`]
    pub fn factory_with_blocks(self, blocks: usize) -> WindowFactory {
        if self == WindowKind::BlockChain {
            return self.build_factory(None, blocks);
        }
        self.factory()
    }

    fn build_factory(self, pool: Option<Arc<BufferPool>>, blocks: usize) -> WindowFactory {
        match (self, pool) {
            (WindowKind::Linear, _) => Arc::new(|max: usize| boxed(LinearWindow::new(max))),
            (WindowKind::Ring, _) => Arc::new(|max: usize| boxed(RingWindow::new(max))),
            (WindowKind::BlockChain, _) => {
                Arc::new(move |max: usize| boxed(BlockChainWindow::with_blocks(max, blocks)))
            }
            (WindowKind::PooledStrict, Some(pool)) => {
                Arc::new(move |max: usize| boxed(StrictPooledWindow::new(pool.acquire(), max)))
            }
            (WindowKind::PooledFast, Some(pool)) => {
                Arc::new(move |max: usize| boxed(FastPooledWindow::new(pool.acquire(), max)))
            }
            (kind, None) => kind.factory(),
        }
    }

    /// Create one window directly
    pub fn create(self, max_distance: usize) -> Box<dyn LookBackMemory> {
        (self.factory())(max_distance)
    }
}

fn boxed<W: LookBackMemory + 'static>(window: W) -> Box<dyn LookBackMemory> {
    Box::new(window)
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
