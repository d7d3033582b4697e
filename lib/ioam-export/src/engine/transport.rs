// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The hand-off point for finished export copies.

use super::buffer::PacketBuf;
use alloc::sync::Arc;
#[cfg(feature = "std")]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::sync::Mutex;

/// Something which ships export copies off the node.
///
/// Submission is fire-and-forget: the transport takes ownership of the
/// buffer, and with it the duty of returning the buffer to its pool.
pub trait ExportTransport: Send + Sync {
    fn submit(&self, buf: PacketBuf);
}

impl<X: ExportTransport + ?Sized> ExportTransport for Arc<X> {
    fn submit(&self, buf: PacketBuf) {
        (**self).submit(buf)
    }
}

impl<X: ExportTransport + ?Sized> ExportTransport for &X {
    fn submit(&self, buf: PacketBuf) {
        (**self).submit(buf)
    }
}

/// A transport which holds every submitted copy in memory, in
/// submission order.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct CaptureTransport {
    bufs: Mutex<Vec<PacketBuf>>,
}

#[cfg(feature = "std")]
impl CaptureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take every copy captured so far.
    pub fn drain(&self) -> Vec<PacketBuf> {
        core::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PacketBuf>> {
        self.bufs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(feature = "std")]
impl ExportTransport for CaptureTransport {
    fn submit(&self, buf: PacketBuf) {
        self.lock().push(buf);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capture_keeps_order() {
        let xport = CaptureTransport::new();
        assert!(xport.is_empty());

        for i in 0..3u8 {
            (&xport).submit(PacketBuf::copy([i]));
        }
        assert_eq!(xport.len(), 3);

        let bufs = xport.drain();
        let firsts: Vec<u8> = bufs.iter().map(|b| b.current()[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2]);
        assert!(xport.is_empty());
    }
}
