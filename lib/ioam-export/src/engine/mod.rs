// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The export engine: the per-batch loop and the pieces it is built
//! from.

pub mod buffer;
pub mod cfg;
pub mod copy;
pub mod header;
pub mod node;
pub mod registration;
pub mod transport;

pub use buffer::BufferPool;
pub use buffer::PacketBuf;
pub use cfg::ValidCfg;
pub use header::HeaderFixup;
pub use node::ExportNode;
pub use node::Frame;
pub use registration::ExportNext;
pub use registration::NextNodes;
pub use transport::ExportTransport;

/// The most packets a single frame may carry.
pub const VECTOR_SIZE: usize = 256;
