//! Shared pool of window buffers.
//!
//! Decoders running on several threads can draw their window storage from one
//! [`BufferPool`] so that decoding many small streams does not allocate a fresh
//! 32 KiB buffer per stream.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lock-free pool of equally sized byte buffers
#[derive(Debug)]
pub struct BufferPool {
    free: ArrayQueue<Box<[u8]>>,
    buffer_size: usize,
    outstanding: AtomicUsize,
}

impl BufferPool {
    /// Pool of buffers of at least `buffer_size` bytes (rounded up to a power
    /// of two), keeping at most `max_pooled` idle buffers around.
    pub fn new(buffer_size: usize, max_pooled: usize) -> Arc<Self> {
        Arc::new(Self {
            free: ArrayQueue::new(max_pooled.max(1)),
            buffer_size: buffer_size.max(1).next_power_of_two(),
            outstanding: AtomicUsize::new(0),
        })
    }

    /// Take a buffer, reusing an idle one when available
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let data = self
            .free
            .pop()
            .unwrap_or_else(|| vec![0u8; self.buffer_size].into_boxed_slice());
        self.outstanding.fetch_add(1, Ordering::Relaxed);
        PooledBuffer { data: Some(data), refs: 1, pool: Arc::clone(self) }
    }

    fn give_back(&self, data: Box<[u8]>) {
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        // A full pool simply drops the buffer
        let _ = self.free.push(data);
    }

    /// Idle buffers ready for reuse
    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    /// Buffers currently handed out
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

/// Buffer on loan from a [`BufferPool`]
///
/// Holds a local reference count: [`retain`](PooledBuffer::retain) adds a
/// holder and the storage goes back to the pool when the last holder calls
/// [`release`](PooledBuffer::release). Dropping the handle returns it as well.
#[derive(Debug)]
pub struct PooledBuffer {
    data: Option<Box<[u8]>>,
    refs: usize,
    pool: Arc<BufferPool>,
}

impl PooledBuffer {
    pub fn retain(&mut self) {
        if self.data.is_some() {
            self.refs += 1;
        }
    }

    /// Drop one holder. Returns `true` if this call returned the storage.
    pub fn release(&mut self) -> bool {
        if self.data.is_none() {
            return false;
        }
        self.refs -= 1;
        if self.refs > 0 {
            return false;
        }
        match self.data.take() {
            Some(data) => {
                self.pool.give_back(data);
                true
            }
            None => false,
        }
    }

    pub fn ref_count(&self) -> usize {
        self.refs
    }

    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty once released
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            self.pool.give_back(data);
        }
    }
}
