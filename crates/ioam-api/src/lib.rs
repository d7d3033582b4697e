// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

#![no_std]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

extern crate alloc;

pub mod cfg;

pub use cfg::*;

/// The overall version of the API. Anytime a type in this crate is
/// added, removed, or modified, this number should increment. It lets
/// `ioamadm` refuse to talk to a dataplane built against a different
/// set of types.
pub const API_VERSION: u64 = 1;

/// Major version of the export package.
pub const MAJOR_VERSION: u64 = 0;

/// The size of a cache line, and therefore the granularity of the
/// bounded export copy.
pub const CACHE_LINE_SIZE: usize = 64;

/// The default number of cache lines copied into each export record.
pub const DEFAULT_EXPORT_LINES: usize = 3;

/// The default maximum number of bytes of a packet that are exported.
pub const DEFAULT_EXPORT_SIZE: usize = DEFAULT_EXPORT_LINES * CACHE_LINE_SIZE;

/// The largest export size we allow to be configured.
///
/// This bounds the size of every buffer in an export pool.
pub const MAX_EXPORT_SIZE: usize = 16 * CACHE_LINE_SIZE;
