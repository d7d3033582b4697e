// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Integration tests.
//!
//! These drive an `ip6-export` node end to end: frames of generated
//! IPv6 + hop-by-hop packets go in, and we check what comes out on
//! the forwarding side, what lands on the export transport, and what
//! the counters say.

use ioam_export::engine::header::VTC_CLASS_MASK;
use ioam_export::engine::header::VTC_FLOW_MASK;
use ioam_export::engine::header::VTC_VERSION_MASK;
use ioam_export::engine::header::apply_decap;
use ioam_export::engine::header::HeaderFixup;
use ioam_export::print::print_stats_into;
use ioam_test_utils::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

fn default_cfg() -> ValidCfg {
    ValidCfg::default()
}

fn trace_cfg() -> ValidCfg {
    ValidCfg::new(ExportCfg { trace: true, ..Default::default() }).unwrap()
}

// Three packets with decap flags {0, 1, 0} and flow label 1, each long
// enough for a full export.
#[test]
fn decap_scenario() {
    let node = ip6_node(8);
    let frame = gen_frame(
        [false, true, false]
            .into_iter()
            .map(|decap| gen_ioam_pkt(Ip6PktSpec::with_decap(0x00001, decap))),
    );

    let res = node.process(&default_cfg(), frame);
    assert_eq!(res.processed, 3);
    assert_eq!(&res.next[..], &[POP_HBH_HANDLE; 3]);

    let exports = node.transport().drain();
    let labels: Vec<u32> = exports
        .iter()
        .map(|e| vtc_flow(e) & VTC_FLOW_MASK)
        .collect();
    assert_eq!(labels, vec![0x00001, 0x00001 | FLOW_DECAP_BIT, 0x00001]);

    for exp in &exports {
        assert_eq!(exp.len(), DEFAULT_EXPORT_SIZE);
    }

    assert_eq!(node.snapshot().recorded, 3);
}

#[test]
fn originals_forwarded_in_order_and_untouched() {
    let node = ip6_node(64);
    let pkts: Vec<PacketBuf> = (0..10u32)
        .map(|i| {
            gen_ioam_pkt(Ip6PktSpec {
                flow_label: i,
                opaque: IOAM_DECAP_BIT,
                ..Default::default()
            })
        })
        .collect();
    let before: Vec<Vec<u8>> =
        pkts.iter().map(|p| p.current().to_vec()).collect();

    let res = node.process(&default_cfg(), gen_frame(pkts));
    assert_eq!(res.processed, 10);
    assert_eq!(res.forwarded.len(), 10);

    for (orig, bytes) in res.forwarded.iter().zip(&before) {
        assert_eq!(orig.current(), &bytes[..]);
    }
}

#[test]
fn export_preserves_all_but_decap_bit() {
    let mut rng = StdRng::seed_from_u64(0x10a3);
    let node = ip6_node(256);

    let pkts: Vec<PacketBuf> =
        (0..200).map(|_| gen_random_pkt(&mut rng)).collect();
    let expected: Vec<(u32, u32)> =
        pkts.iter().map(|p| (vtc_flow(p), p.opaque())).collect();

    let res = node.process(&default_cfg(), gen_frame(pkts));
    assert_eq!(res.processed, 200);

    let exports = node.transport().drain();
    let mut exported = 0;
    for (exp, (vtc, opaque)) in exports.iter().zip(&expected) {
        if exp.is_empty() {
            continue;
        }

        exported += 1;
        let got = vtc_flow(exp);
        let keep = VTC_VERSION_MASK | VTC_CLASS_MASK;
        assert_eq!(got & keep, vtc & keep);
        assert_eq!(got & !FLOW_DECAP_BIT, vtc & !FLOW_DECAP_BIT);
        assert_eq!(got & FLOW_DECAP_BIT != 0, opaque & IOAM_DECAP_BIT != 0);
        assert_eq!(got, apply_decap(*vtc, *opaque));
    }

    assert_eq!(exports.len(), 200);
    assert_eq!(exported, 200);
}

#[test]
fn fixup_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    let fix = Ip6FlowLabel;

    for _ in 0..64 {
        let pkt = gen_random_pkt(&mut rng);
        let mut once = pkt.current()[..IPV6_HDR_SZ].to_vec();
        fix.fixup(&mut once, pkt.opaque());
        let mut twice = once.clone();
        fix.fixup(&mut twice, pkt.opaque());
        assert_eq!(once, twice);
    }
}

// Pool runs dry at the fourth packet of ten.
#[test]
fn pool_exhaustion_mid_frame() {
    let pool = Arc::new(FixedPool::new(3, DEFAULT_EXPORT_SIZE));
    let node = ip6_node_with(pool.clone());

    let frame =
        gen_frame((0..10).map(|_| gen_ioam_pkt(Ip6PktSpec::default())));
    let res = node.process(&default_cfg(), frame);

    assert_eq!(res.processed, 10);
    assert_eq!(res.forwarded.len(), 10);
    assert_eq!(res.next.len(), 10);
    assert_eq!(node.transport().len(), 3);

    let snap = node.snapshot();
    assert_eq!(snap.recorded, 3);
    assert_eq!(snap.no_buffer, 7);
    assert_eq!(pool.available(), 0);

    // Once the transport's buffers come back the node exports again.
    for buf in node.transport().drain() {
        pool.release(buf);
    }
    let res = node.process(
        &default_cfg(),
        gen_frame([gen_ioam_pkt(Ip6PktSpec::default())]),
    );
    assert_eq!(res.processed, 1);
    assert_eq!(node.snapshot().recorded, 4);
}

// A packet too short to hold an IPv6 header produces an empty export.
#[test]
fn runt_packet() {
    let node = ip6_node(4);
    let mut pkt = PacketBuf::copy([0x60u8; 32]);
    pkt.set_opaque(IOAM_DECAP_BIT);

    let res = node.process(&default_cfg(), gen_frame([pkt]));
    assert_eq!(res.processed, 1);
    assert_eq!(res.forwarded.get(0).unwrap().current(), &[0x60u8; 32]);

    let exports = node.transport().drain();
    assert_eq!(exports.len(), 1);
    assert!(exports[0].is_empty());

    let snap = node.snapshot();
    assert_eq!(snap.recorded, 1);
    assert_eq!(snap.short_copy, 1);
}

#[test]
fn short_packets_truncate_to_whole_lines() {
    let node = ip6_node(4);
    let sizes = [
        // 40 + 8 + 15 = 63 bytes: nothing copied.
        15usize,
        // 64 bytes exactly.
        16,
        // 150 bytes: only two lines make it.
        102,
        // Exactly the export size.
        144,
    ];
    let frame = gen_frame(sizes.iter().map(|body| {
        gen_ioam_pkt(Ip6PktSpec { body_len: *body, ..Default::default() })
    }));

    node.process(&default_cfg(), frame);
    let lens: Vec<usize> =
        node.transport().drain().iter().map(|e| e.len()).collect();
    assert_eq!(lens, vec![0, 64, 128, 192]);
    assert_eq!(node.snapshot().short_copy, 1);
}

const PREFIX_LEN: usize = 16;

// Hands out buffers which already hold PREFIX_LEN bytes of 0xEE.
struct PrefixPool;

impl BufferPool for PrefixPool {
    fn acquire(&self) -> Option<PacketBuf> {
        let mut buf = PacketBuf::new(PREFIX_LEN + DEFAULT_EXPORT_SIZE);
        buf.tail_mut()[..PREFIX_LEN].fill(0xEE);
        buf.extend(PREFIX_LEN).ok()?;
        Some(buf)
    }

    fn reclaim(&self, _buf: PacketBuf) {}
}

// The copy and the fixup land after whatever the export buffer holds.
#[test]
fn export_appends_after_existing_bytes() {
    let ectx = Providers { log: Box::new(PrintlnLog) };
    let node = ExportNode::new(
        Ip6FlowLabel,
        PrefixPool,
        CaptureTransport::new(),
        NextNodes::new(POP_HBH_HANDLE),
        &ectx,
    )
    .unwrap();

    let pkt = gen_ioam_pkt(Ip6PktSpec::with_decap(0x00001, true));
    let orig = pkt.current().to_vec();
    let want_vtc = apply_decap(vtc_flow(&pkt), IOAM_DECAP_BIT);

    node.process(&default_cfg(), gen_frame([pkt]));
    let exports = node.transport().drain();
    assert_eq!(exports.len(), 1);

    let exp = exports[0].current();
    assert_eq!(exp.len(), PREFIX_LEN + DEFAULT_EXPORT_SIZE);
    assert_eq!(&exp[..PREFIX_LEN], &[0xEE; PREFIX_LEN]);

    let vtc = u32::from_be_bytes([
        exp[PREFIX_LEN],
        exp[PREFIX_LEN + 1],
        exp[PREFIX_LEN + 2],
        exp[PREFIX_LEN + 3],
    ]);
    assert_eq!(vtc, want_vtc);
    assert_ne!(vtc & FLOW_DECAP_BIT, 0);
    assert_eq!(&exp[PREFIX_LEN + 4..], &orig[4..DEFAULT_EXPORT_SIZE]);
}

#[test]
fn smaller_export_size() {
    let node = ip6_node(2);
    let cfg = ValidCfg::new(ExportCfg { export_size: 128, ..Default::default() })
        .unwrap();

    node.process(&cfg, gen_frame([gen_ioam_pkt(Ip6PktSpec::default())]));
    let exports = node.transport().drain();
    assert_eq!(exports[0].len(), 128);
}

#[test]
fn tracing_records_every_packet() {
    let node = ip6_node(1);
    let frame = gen_frame([
        gen_ioam_pkt(Ip6PktSpec::with_decap(5, true)),
        gen_ioam_pkt(Ip6PktSpec::with_decap(6, false)),
    ]);

    let res = node.process(&trace_cfg(), frame);
    assert_eq!(res.traces.len(), 2);
    assert_eq!(res.traces[0].flow_label, 5);
    assert_eq!(res.traces[0].opaque, IOAM_DECAP_BIT);
    assert_eq!(res.traces[1].to_string(), "EXPORT: flow_label 6, next index 0");

    // Tracing still happens for the packet that found no buffer.
    assert_eq!(node.snapshot().no_buffer, 1);
}

#[test]
fn shared_across_workers() {
    let node = Arc::new(ip6_node(1024));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let node = node.clone();
            std::thread::spawn(move || {
                for _ in 0..4 {
                    let frame = gen_frame(
                        (0..16).map(|_| gen_ioam_pkt(Ip6PktSpec::default())),
                    );
                    let res = node.process(&ValidCfg::default(), frame);
                    assert_eq!(res.processed, 16);
                }
            })
        })
        .collect();

    for w in workers {
        w.join().unwrap();
    }

    assert_eq!(node.snapshot().recorded, 256);
    assert_eq!(node.transport().len(), 256);

    let mut out = Vec::new();
    print_stats_into(&mut out, node.stats()).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("256"));
}
