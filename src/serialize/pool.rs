//! Pooled scratch buffers for entity rendering
//!
//! A buffer is checked out with [`BufferPool::acquire`] and returns to the
//! pool, cleared, when the guard drops. The guard borrows the pool, so a
//! buffer cannot outlive the call that acquired it.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use crate::config::BufferPoolConfig;

#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
    max_capacity: usize,
}

impl BufferPool {
    pub fn new(max_retained: usize, max_capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_retained)),
            max_retained,
            max_capacity,
        }
    }

    pub fn from_config(config: &BufferPoolConfig) -> Self {
        Self::new(config.max_retained, config.max_buffer_capacity)
    }

    /// Check out an empty buffer
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        PooledBuffer { buf, pool: self }
    }

    /// Number of idle buffers
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        if buf.capacity() == 0 || buf.capacity() > self.max_capacity {
            return;
        }
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_retained {
            free.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::from_config(&BufferPoolConfig::default())
    }
}

/// A checked-out buffer; returned to its pool on drop
pub struct PooledBuffer<'a> {
    buf: Vec<u8>,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
