// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Packet buffers and the pool the export node draws from.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use core::fmt;
#[cfg(feature = "std")]
use std::sync::Mutex;

/// An error when adjusting the extent of a [`PacketBuf`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum WriteError {
    #[error("requested {req} bytes but only {avail} fit in the buffer")]
    NotEnoughBytes { req: usize, avail: usize },
}

/// A single packet buffer.
///
/// The buffer is a fixed block of memory in which the packet occupies
/// `current_length` bytes starting at offset `current_data`. Space
/// before `current_data` is headroom; space after the packet is the
/// write region into which new bytes are appended.
///
/// Alongside the bytes every buffer carries a 32-bit opaque metadata
/// slot. Upstream classifiers use it to hand per-packet state to later
/// nodes; the IOAM classifier stores the decap flag in its top bit.
pub struct PacketBuf {
    data: Box<[u8]>,
    current_data: usize,
    current_length: usize,
    opaque: u32,
}

impl PacketBuf {
    /// Allocate an empty buffer able to hold `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self::new_with_headroom(0, capacity)
    }

    /// Allocate an empty buffer with `head_len` bytes of headroom and
    /// `body_len` bytes available for packet data.
    pub fn new_with_headroom(head_len: usize, body_len: usize) -> Self {
        Self {
            data: vec![0u8; head_len + body_len].into_boxed_slice(),
            current_data: head_len,
            current_length: 0,
            opaque: 0,
        }
    }

    /// Allocate a buffer which is an exact copy of `buf`.
    pub fn copy(buf: impl AsRef<[u8]>) -> Self {
        let src = buf.as_ref();
        let mut pkt = Self::new(src.len());
        pkt.data.copy_from_slice(src);
        pkt.current_length = src.len();
        pkt
    }

    /// Total bytes of backing memory, headroom included.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The number of bytes in front of the packet data.
    pub fn head_capacity(&self) -> usize {
        self.current_data
    }

    /// The number of bytes after the packet data that may still be
    /// written.
    pub fn tail_capacity(&self) -> usize {
        self.data.len() - self.current_data - self.current_length
    }

    /// The current logical length of the packet.
    #[inline]
    pub fn len(&self) -> usize {
        self.current_length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current_length == 0
    }

    /// The packet bytes.
    #[inline]
    pub fn current(&self) -> &[u8] {
        &self.data[self.current_data..self.current_data + self.current_length]
    }

    /// The packet bytes, mutably.
    #[inline]
    pub fn current_mut(&mut self) -> &mut [u8] {
        &mut self.data
            [self.current_data..self.current_data + self.current_length]
    }

    /// The write region: everything after the current packet bytes.
    #[inline]
    pub fn tail_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.current_data + self.current_length..]
    }

    /// Grow the packet by `n` bytes already written into the write
    /// region.
    pub fn extend(&mut self, n: usize) -> Result<(), WriteError> {
        let avail = self.tail_capacity();
        if n > avail {
            return Err(WriteError::NotEnoughBytes { req: n, avail });
        }

        self.current_length += n;
        Ok(())
    }

    /// Return the buffer to its freshly allocated state: no packet
    /// bytes, no headroom, and a zeroed metadata slot.
    pub fn reset(&mut self) {
        self.current_data = 0;
        self.current_length = 0;
        self.opaque = 0;
    }

    /// The opaque metadata slot.
    #[inline]
    pub fn opaque(&self) -> u32 {
        self.opaque
    }

    pub fn set_opaque(&mut self, opaque: u32) {
        self.opaque = opaque;
    }
}

impl fmt::Debug for PacketBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketBuf")
            .field("capacity", &self.capacity())
            .field("current_data", &self.current_data)
            .field("current_length", &self.current_length)
            .field("opaque", &format_args!("{:#010x}", self.opaque))
            .finish()
    }
}

/// A source of export buffers.
///
/// The export node only ever acquires from a pool. Whoever ends up
/// owning a buffer after hand-off (the export transport, or whatever
/// it passes the buffer to) is responsible for returning it.
pub trait BufferPool: Send + Sync {
    /// Take a buffer from the pool, or `None` if the pool is
    /// exhausted.
    fn acquire(&self) -> Option<PacketBuf>;

    /// Hand back a buffer which was acquired but never handed off.
    fn reclaim(&self, buf: PacketBuf);
}

impl<P: BufferPool + ?Sized> BufferPool for Arc<P> {
    fn acquire(&self) -> Option<PacketBuf> {
        (**self).acquire()
    }

    fn reclaim(&self, buf: PacketBuf) {
        (**self).reclaim(buf)
    }
}

impl<P: BufferPool + ?Sized> BufferPool for &P {
    fn acquire(&self) -> Option<PacketBuf> {
        (**self).acquire()
    }

    fn reclaim(&self, buf: PacketBuf) {
        (**self).reclaim(buf)
    }
}

/// A pool of a fixed number of equally sized buffers.
///
/// All buffers are allocated up front; the pool never allocates
/// afterwards, so exhaustion is a real possibility under load.
#[cfg(feature = "std")]
pub struct FixedPool {
    free: Mutex<alloc::vec::Vec<PacketBuf>>,
    count: usize,
    buf_size: usize,
}

#[cfg(feature = "std")]
impl FixedPool {
    /// Create a pool of `count` buffers of `buf_size` bytes each.
    pub fn new(count: usize, buf_size: usize) -> Self {
        let free = (0..count).map(|_| PacketBuf::new(buf_size)).collect();
        Self { free: Mutex::new(free), count, buf_size }
    }

    /// The number of buffers this pool was created with.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The size of each buffer in this pool.
    pub fn buf_size(&self) -> usize {
        self.buf_size
    }

    /// The number of buffers currently free.
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    /// Return a buffer to the pool.
    ///
    /// Buffers of the wrong size, or beyond the pool's original count,
    /// are dropped rather than stored.
    pub fn release(&self, mut buf: PacketBuf) {
        if buf.capacity() != self.buf_size {
            return;
        }

        let mut free = self.lock();
        if free.len() < self.count {
            buf.reset();
            free.push(buf);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, alloc::vec::Vec<PacketBuf>> {
        // The free list is only ever pushed or popped under the lock,
        // so a poisoned guard still holds a consistent list.
        self.free.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(feature = "std")]
impl BufferPool for FixedPool {
    fn acquire(&self) -> Option<PacketBuf> {
        self.lock().pop()
    }

    fn reclaim(&self, buf: PacketBuf) {
        self.release(buf);
    }
}
