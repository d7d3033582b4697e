// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The export node.
//!
//! The node is handed a [`Frame`] of packets by its dispatcher. For
//! each packet it
//!
//! 1. acquires an export buffer from its [`BufferPool`],
//! 2. copies a bounded prefix of the packet into the buffer's write
//!    region with [`copy_cache_lines`],
//! 3. lets its [`HeaderFixup`] patch the copy's header,
//! 4. submits the buffer to its [`ExportTransport`], and
//! 5. directs the original to [`ExportNext::PopHopByHop`].
//!
//! The original packet is only ever read. Whatever happens to its
//! export copy (no buffer, a short copy, a copy error) the original is
//! forwarded, and the originals leave in the order they arrived.
//!
//! The node keeps no state between packets other than its counters.
//! Counters are summed locally over the batch and published once at
//! the end, so a node may be shared by workers running disjoint frames.

use super::VECTOR_SIZE;
use super::buffer::BufferPool;
use super::buffer::PacketBuf;
use super::cfg::ValidCfg;
use super::copy::copy_cache_lines;
use super::header::HeaderFixup;
use super::registration::ExportNext;
use super::registration::NextNodes;
use super::registration::NodeRegistration;
use super::registration::registration;
use super::transport::ExportTransport;
use crate::provider::LogLevel;
use crate::provider::Providers;
use crate::stat;
use crate::stat::StatNamed;
use crate::stat::StatProvider;
use crate::stat::StatU64;
use alloc::format;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Display;

/// The module every export node registers its counters under.
pub const STAT_MODULE: &str = "ioam";

/// The counters of an export node.
#[derive(StatProvider)]
pub struct ExportStats {
    /// Packets recorded for export
    pub recorded: StatU64,
    /// Export buffer allocation failures
    pub no_buffer: StatU64,
    /// Exports too short to carry a header
    pub short_copy: StatU64,
    /// Exports abandoned on a copy error
    pub copy_error: StatU64,
}

/// Per-batch counter deltas.
#[derive(Default)]
struct BatchCounts {
    recorded: u64,
    no_buffer: u64,
    short_copy: u64,
    copy_error: u64,
}

impl BatchCounts {
    fn flush(&self, stats: &ExportStats) {
        if self.recorded != 0 {
            stats.recorded.incr(self.recorded);
        }
        if self.no_buffer != 0 {
            stats.no_buffer.incr(self.no_buffer);
        }
        if self.short_copy != 0 {
            stats.short_copy.incr(self.short_copy);
        }
        if self.copy_error != 0 {
            stats.copy_error.incr(self.copy_error);
        }
    }
}

/// One trace record, produced per packet when tracing is enabled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExportTrace {
    pub next_index: u32,
    pub flow_label: u32,
    pub opaque: u32,
}

impl Display for ExportTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EXPORT: flow_label {}, next index {}",
            self.flow_label, self.next_index
        )
    }
}

/// A batch of packets handed to the node in one call.
#[derive(Debug, Default)]
pub struct Frame {
    pkts: heapless::Vec<PacketBuf, VECTOR_SIZE>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a packet, giving it back if the frame is full.
    pub fn push(&mut self, pkt: PacketBuf) -> Result<(), PacketBuf> {
        self.pkts.push(pkt)
    }

    pub fn len(&self) -> usize {
        self.pkts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pkts.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pkts.is_full()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, PacketBuf> {
        self.pkts.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&PacketBuf> {
        self.pkts.get(idx)
    }
}

impl IntoIterator for Frame {
    type Item = PacketBuf;
    type IntoIter =
        <heapless::Vec<PacketBuf, VECTOR_SIZE> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.pkts.into_iter()
    }
}

/// The outcome of [`ExportNode::process`].
#[derive(Debug)]
pub struct BatchResult<T> {
    /// The number of packets processed. Always the frame size.
    pub processed: usize,

    /// The originals, in the order they arrived.
    pub forwarded: Frame,

    /// The next-node handle of each original, by position.
    pub next: heapless::Vec<T, VECTOR_SIZE>,

    /// One record per packet when tracing was enabled, else empty.
    pub traces: Vec<ExportTrace>,
}

/// An export node.
///
/// * `F`: the header fixup applied to every export copy.
/// * `P`: the pool export buffers come from.
/// * `X`: the transport export buffers go to.
/// * `T`: the dispatcher's handle for a downstream node.
pub struct ExportNode<F, P, X, T>
where
    F: HeaderFixup,
    P: BufferPool,
    X: ExportTransport,
    T: Copy,
{
    fixup: F,
    pool: P,
    transport: X,
    next: NextNodes<T>,
    stats: StatNamed<ExportStats>,
}

impl<F, P, X, T> ExportNode<F, P, X, T>
where
    F: HeaderFixup,
    P: BufferPool,
    X: ExportTransport,
    T: Copy,
{
    pub fn new(
        fixup: F,
        pool: P,
        transport: X,
        next: NextNodes<T>,
        ectx: &Providers,
    ) -> Result<Self, stat::Error> {
        let stats =
            StatNamed::new(STAT_MODULE, F::NODE_NAME, ExportStats::new())?;

        ectx.log.log(
            LogLevel::Note,
            &format!(
                "created export node {} ({} counters, next: {})",
                F::NODE_NAME,
                ExportStats::NUM_FIELDS,
                ExportNext::PopHopByHop,
            ),
        );

        Ok(Self { fixup, pool, transport, next, stats })
    }

    pub fn name(&self) -> &'static str {
        F::NODE_NAME
    }

    pub fn registration(&self) -> NodeRegistration {
        registration::<F>()
    }

    pub fn stats(&self) -> &StatNamed<ExportStats> {
        &self.stats
    }

    pub fn snapshot(&self) -> ExportStatsSnap {
        self.stats.vals.snapshot()
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn transport(&self) -> &X {
        &self.transport
    }

    /// Process one frame under the configuration snapshot `cfg`.
    pub fn process(&self, cfg: &ValidCfg, frame: Frame) -> BatchResult<T> {
        let mut counts = BatchCounts::default();
        let mut next = heapless::Vec::new();
        let mut traces = if cfg.trace() {
            Vec::with_capacity(frame.len())
        } else {
            Vec::new()
        };

        let disp = ExportNext::PopHopByHop;
        let handle = self.next.get(disp);

        for pkt in frame.iter() {
            if cfg.enabled() {
                self.export_one(cfg, pkt, &mut counts);
            }

            if cfg.trace() {
                traces.push(ExportTrace {
                    next_index: disp.index(),
                    flow_label: self.fixup.trace_label(pkt.current()),
                    opaque: pkt.opaque(),
                });
            }

            // A frame never holds more than VECTOR_SIZE packets.
            let pushed = next.push(handle);
            debug_assert!(pushed.is_ok());
        }

        counts.flush(&self.stats.vals);

        BatchResult { processed: frame.len(), forwarded: frame, next, traces }
    }

    fn export_one(
        &self,
        cfg: &ValidCfg,
        pkt: &PacketBuf,
        counts: &mut BatchCounts,
    ) {
        let Some(mut buf) = self.pool.acquire() else {
            counts.no_buffer += 1;
            return;
        };

        let src = pkt.current();
        let req = match self.fixup.declared_len(src) {
            Some(len) => len.min(src.len()),
            None => src.len(),
        };

        // The copy lands in the write region, after anything the
        // export buffer already holds.
        let copied = match copy_cache_lines(
            buf.tail_mut(),
            src,
            req,
            cfg.export_size(),
        ) {
            Ok(n) => n,
            Err(_) => {
                counts.copy_error += 1;
                self.pool.reclaim(buf);
                return;
            }
        };

        if copied < F::HDR_LEN.max(1) {
            counts.short_copy += 1;
        } else {
            self.fixup.fixup(&mut buf.tail_mut()[..copied], pkt.opaque());
        }

        if buf.extend(copied).is_err() {
            counts.copy_error += 1;
            self.pool.reclaim(buf);
            return;
        }

        self.transport.submit(buf);
        counts.recorded += 1;
    }
}
