// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Fixtures shared by the export benchmarks.

use ioam_test_utils::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

/// Packet body lengths exercised by the benchmarks: below one line,
/// a partial export, and a full-sized export.
pub const BODY_LENS: &[usize] = &[8, 100, 1400];

/// A transport which hands every export straight back to its pool, so
/// a benchmark loop never runs the pool dry.
pub struct RecycleTransport {
    pool: Arc<FixedPool>,
}

impl RecycleTransport {
    pub fn new(pool: Arc<FixedPool>) -> Self {
        Self { pool }
    }
}

impl ioam_export::engine::ExportTransport for RecycleTransport {
    fn submit(&self, buf: PacketBuf) {
        self.pool.release(buf);
    }
}

pub type BenchNode =
    ExportNode<Ip6FlowLabel, Arc<FixedPool>, RecycleTransport, u16>;

/// An IPv6 export node whose pool holds one full frame of buffers.
pub fn bench_node() -> BenchNode {
    let pool = Arc::new(FixedPool::new(
        ioam_export::engine::VECTOR_SIZE,
        DEFAULT_EXPORT_SIZE,
    ));
    let ectx = Providers { log: Box::new(ioam_export::provider::NullLog) };
    ExportNode::new(
        Ip6FlowLabel,
        pool.clone(),
        RecycleTransport::new(pool),
        NextNodes::new(POP_HBH_HANDLE),
        &ectx,
    )
    .unwrap()
}

/// `n` packets with random headers and decap flags, of the given
/// body length.
pub fn bench_pkts(n: usize, body_len: usize) -> Vec<PacketBuf> {
    let mut rng = StdRng::seed_from_u64(0xb0b);
    (0..n)
        .map(|_| {
            let pkt = gen_random_pkt(&mut rng);
            let vtc = vtc_flow(&pkt);
            gen_ioam_pkt(Ip6PktSpec {
                traffic_class: ((vtc >> 20) & 0xFF) as u8,
                flow_label: vtc & 0xF_FFFF,
                body_len,
                hop_limit: 64,
                opaque: pkt.opaque(),
            })
        })
        .collect()
}

/// A fresh frame holding copies of `pkts`, metadata included.
pub fn frame_of(pkts: &[PacketBuf]) -> Frame {
    gen_frame(pkts.iter().map(|p| {
        let mut pkt = PacketBuf::copy(p.current());
        pkt.set_opaque(p.opaque());
        pkt
    }))
}
