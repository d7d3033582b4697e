// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The IOAM export node.
//!
//! For every IPv6 packet that reaches it, the export node produces a
//! bounded, cache-line granular copy of the packet's leading bytes,
//! patches the copy's flow label to carry the packet's decap bit, and
//! hands the copy to an export transport while the original continues
//! on to have its hop-by-hop header popped.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::len_without_is_empty)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

extern crate alloc;

// This is needed so that the stat-macro (`#[derive(StatProvider)]`)
// can use fully-qualified type paths.
extern crate self as ioam_export;

pub use ioam_api as api;

pub mod engine;
#[cfg(feature = "std")]
pub mod print;
pub mod provider;
pub mod stat;
