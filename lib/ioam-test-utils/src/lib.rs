// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Common routines for integration tests.

// This type of pedantry is more trouble than it's worth here.
#![allow(dead_code)]

pub mod pcap;

// Let's make our lives easier and pub use a bunch of stuff.
pub use ioam_export::api::DEFAULT_EXPORT_SIZE;
pub use ioam_export::api::ExportCfg;
pub use ioam_export::engine::ExportNode;
pub use ioam_export::engine::ExportNext;
pub use ioam_export::engine::Frame;
pub use ioam_export::engine::NextNodes;
pub use ioam_export::engine::PacketBuf;
pub use ioam_export::engine::ValidCfg;
pub use ioam_export::engine::buffer::BufferPool;
pub use ioam_export::engine::buffer::FixedPool;
pub use ioam_export::engine::header::FLOW_DECAP_BIT;
pub use ioam_export::engine::header::IOAM_DECAP_BIT;
pub use ioam_export::engine::header::IPV6_HDR_SZ;
pub use ioam_export::engine::header::Ip6FlowLabel;
pub use ioam_export::engine::header::Ipv6HdrRaw;
pub use ioam_export::engine::node::BatchResult;
pub use ioam_export::engine::transport::CaptureTransport;
pub use ioam_export::provider::PrintlnLog;
pub use ioam_export::provider::Providers;

use rand::Rng;
use smoltcp::wire::IpProtocol;
use smoltcp::wire::Ipv6Address;
use smoltcp::wire::Ipv6Packet;
use smoltcp::wire::Ipv6Repr;
use std::sync::Arc;

/// The size of the hop-by-hop header every generated packet carries.
pub const HBH_LEN: usize = 8;

/// The handle the test dispatcher uses for `ip6-pop-hop-by-hop`.
pub const POP_HBH_HANDLE: u16 = 42;

pub const SRC_ADDR: Ipv6Address = Ipv6Address::new(0xfd00, 0, 0, 0, 0, 0, 0, 1);
pub const DST_ADDR: Ipv6Address = Ipv6Address::new(0xfd00, 0, 0, 0, 0, 0, 0, 2);

pub type TestNode =
    ExportNode<Ip6FlowLabel, Arc<FixedPool>, Arc<CaptureTransport>, u16>;

/// The parameters of a generated IPv6 packet.
#[derive(Clone, Copy, Debug)]
pub struct Ip6PktSpec {
    pub traffic_class: u8,
    pub flow_label: u32,
    /// Bytes following the hop-by-hop header.
    pub body_len: usize,
    pub hop_limit: u8,
    /// The value left in the packet's metadata slot.
    pub opaque: u32,
}

impl Default for Ip6PktSpec {
    fn default() -> Self {
        Self {
            traffic_class: 0,
            flow_label: 0,
            body_len: 512,
            hop_limit: 64,
            opaque: 0,
        }
    }
}

impl Ip6PktSpec {
    /// A packet with the given flow label and decap flag.
    pub fn with_decap(flow_label: u32, decap: bool) -> Self {
        Self {
            flow_label,
            opaque: if decap { IOAM_DECAP_BIT } else { 0 },
            ..Default::default()
        }
    }

    /// The total length of the generated packet.
    pub fn total_len(&self) -> usize {
        IPV6_HDR_SZ + HBH_LEN + self.body_len
    }
}

/// Generate an IPv6 packet carrying a hop-by-hop header.
///
/// The hop-by-hop header holds a single PadN option standing in for
/// the IOAM option, and is followed by `body_len` bytes of a counting
/// pattern.
pub fn gen_ioam_pkt(desc: Ip6PktSpec) -> PacketBuf {
    let payload_len = HBH_LEN + desc.body_len;
    let repr = Ipv6Repr {
        src_addr: SRC_ADDR,
        dst_addr: DST_ADDR,
        next_header: IpProtocol::HopByHop,
        payload_len,
        hop_limit: desc.hop_limit,
    };

    let mut bytes = vec![0u8; IPV6_HDR_SZ + payload_len];
    let mut ip = Ipv6Packet::new_unchecked(&mut bytes[..]);
    repr.emit(&mut ip);
    ip.set_traffic_class(desc.traffic_class);
    ip.set_flow_label(desc.flow_label);

    let hbh = &mut bytes[IPV6_HDR_SZ..IPV6_HDR_SZ + HBH_LEN];
    hbh.copy_from_slice(&[
        u8::from(IpProtocol::Ipv6NoNxt),
        0,
        // PadN, four bytes of padding.
        1,
        4,
        0,
        0,
        0,
        0,
    ]);

    for (i, b) in bytes[IPV6_HDR_SZ + HBH_LEN..].iter_mut().enumerate() {
        *b = i as u8;
    }

    let mut pkt = PacketBuf::copy(bytes);
    pkt.set_opaque(desc.opaque);
    pkt
}

/// Generate a packet with random header fields and decap flag. The
/// packet always spans at least one cache line.
pub fn gen_random_pkt<R: Rng>(rng: &mut R) -> PacketBuf {
    let opaque: u32 = rng.random();
    gen_ioam_pkt(Ip6PktSpec {
        traffic_class: rng.random(),
        flow_label: rng.random_range(0..=0xF_FFFF),
        body_len: rng.random_range(16..1400),
        hop_limit: rng.random_range(1..=255),
        opaque,
    })
}

/// Read the version/class/flow word of the packet in `buf`.
pub fn vtc_flow(buf: &PacketBuf) -> u32 {
    Ipv6HdrRaw::parse(buf.current()).unwrap().vtc_flow()
}

/// Build a frame from a series of packets.
pub fn gen_frame(pkts: impl IntoIterator<Item = PacketBuf>) -> Frame {
    let mut frame = Frame::new();
    for pkt in pkts {
        frame.push(pkt).unwrap();
    }
    frame
}

/// Build an IPv6 export node over a pool of `bufs` full-sized
/// buffers and an in-memory transport.
pub fn ip6_node(bufs: usize) -> TestNode {
    ip6_node_with(Arc::new(FixedPool::new(bufs, DEFAULT_EXPORT_SIZE)))
}

/// Build an IPv6 export node over the given pool.
pub fn ip6_node_with(pool: Arc<FixedPool>) -> TestNode {
    let ectx = Providers { log: Box::new(PrintlnLog) };
    ExportNode::new(
        Ip6FlowLabel,
        pool,
        Arc::new(CaptureTransport::new()),
        NextNodes::new(POP_HBH_HANDLE),
        &ectx,
    )
    .unwrap()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_header_fields() {
        let desc = Ip6PktSpec {
            traffic_class: 0xAB,
            flow_label: 0x1_2345,
            body_len: 100,
            ..Default::default()
        };
        let pkt = gen_ioam_pkt(desc);
        assert_eq!(pkt.len(), desc.total_len());

        let hdr = Ipv6HdrRaw::parse(pkt.current()).unwrap();
        assert_eq!(hdr.version(), 6);
        assert_eq!(hdr.traffic_class(), 0xAB);
        assert_eq!(hdr.flow_label(), 0x1_2345);
        assert_eq!(usize::from(hdr.payload_len()), HBH_LEN + 100);
        assert_eq!(hdr.next_hdr, u8::from(IpProtocol::HopByHop));
    }
}
