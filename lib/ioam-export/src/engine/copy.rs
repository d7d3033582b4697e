// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The bounded, cache-line granular copy used to build export records.
//!
//! Export records only need the leading bytes of a packet, and the
//! copy sits on the fast path for every exported packet. Rather than a
//! byte-exact `memcpy` of a variable length, the copy moves whole
//! 64-byte lines:
//!
//! * a request of at least the export size copies exactly the export
//!   size (three lines by default);
//! * a shorter request copies only the whole lines it covers. A
//!   trailing partial line is **not** copied, so a request shorter than
//!   one line copies nothing at all.
//!
//! Callers size the destination for a full export and must not rely on
//! the bytes of a partial tail line being present.

use ioam_api::CACHE_LINE_SIZE;

/// Errors from [`copy_cache_lines`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CopyError {
    #[error("source holds {avail} bytes but the copy spans {span}")]
    SourceTooShort { span: usize, avail: usize },

    #[error("destination holds {avail} bytes but the copy spans {span}")]
    DestTooShort { span: usize, avail: usize },
}

/// The number of bytes [`copy_cache_lines`] moves for a request of `n`
/// bytes under an export size of `max`.
///
/// `max` is expected to be a multiple of [`CACHE_LINE_SIZE`], which a
/// validated configuration guarantees.
#[inline]
pub const fn copy_span(n: usize, max: usize) -> usize {
    if n >= max { max } else { (n / CACHE_LINE_SIZE) * CACHE_LINE_SIZE }
}

/// Copy a bounded prefix of `src` into `dst` in whole cache lines.
///
/// Returns the number of bytes copied, as given by [`copy_span`]. The
/// copy has no side effects beyond `dst`'s bytes. If either side is
/// too short for the span nothing is copied and an error is returned.
#[inline]
pub fn copy_cache_lines(
    dst: &mut [u8],
    src: &[u8],
    n: usize,
    max: usize,
) -> Result<usize, CopyError> {
    let span = copy_span(n, max);

    let Some(src) = src.get(..span) else {
        return Err(CopyError::SourceTooShort { span, avail: src.len() });
    };

    let avail = dst.len();
    let Some(dst) = dst.get_mut(..span) else {
        return Err(CopyError::DestTooShort { span, avail });
    };

    for (d, s) in dst
        .chunks_exact_mut(CACHE_LINE_SIZE)
        .zip(src.chunks_exact(CACHE_LINE_SIZE))
    {
        d.copy_from_slice(s);
    }

    Ok(span)
}
