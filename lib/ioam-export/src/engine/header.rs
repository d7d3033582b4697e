// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Rewriting the header of an export copy.
//!
//! The export copy of a packet is identical to the packet's leading
//! bytes except for one bit: the IOAM decap flag, which the upstream
//! classifier leaves in the top bit of the packet's opaque metadata
//! slot, is folded into the flow label of the copy's IPv6 header. A
//! collector can then tell from the export alone whether the IOAM data
//! was stripped from the original.

use core::mem::size_of;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const IPV6_HDR_SZ: usize = size_of::<Ipv6HdrRaw>();
pub const IPV6_VERSION: u8 = 6;

/// The version bits of the version/class/flow word.
pub const VTC_VERSION_MASK: u32 = 0xF000_0000;
/// The traffic-class bits of the version/class/flow word.
pub const VTC_CLASS_MASK: u32 = 0x0FF0_0000;
/// The flow-label bits of the version/class/flow word.
pub const VTC_FLOW_MASK: u32 = 0x000F_FFFF;

/// The decap flag in the opaque metadata slot.
pub const IOAM_DECAP_BIT: u32 = 0x8000_0000;

/// The distance the decap flag moves from the metadata slot into the
/// flow label.
pub const DECAP_SHIFT: u32 = 12;

/// The decap flag in the version/class/flow word: the top bit of the
/// flow label.
pub const FLOW_DECAP_BIT: u32 = IOAM_DECAP_BIT >> DECAP_SHIFT;

/// Map the opaque metadata slot onto the flow-label decap bit.
#[inline]
pub const fn decap_flow_bit(opaque: u32) -> u32 {
    (opaque & IOAM_DECAP_BIT) >> DECAP_SHIFT
}

/// Replace the decap bit of `vtc_flow` with the one carried by `opaque`.
///
/// Every other bit of the word passes through untouched.
#[inline]
pub const fn apply_decap(vtc_flow: u32, opaque: u32) -> u32 {
    (vtc_flow & !FLOW_DECAP_BIT) | decap_flow_bit(opaque)
}

#[inline]
pub const fn is_decap(vtc_flow: u32) -> bool {
    vtc_flow & FLOW_DECAP_BIT != 0
}

/// The fixed IPv6 header, kept unaligned as it sits at arbitrary
/// offsets in export buffers.
#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct Ipv6HdrRaw {
    pub vtc_flow: [u8; 4],
    pub payload_len: [u8; 2],
    pub next_hdr: u8,
    pub hop_limit: u8,
    pub src: [u8; 16],
    pub dst: [u8; 16],
}

impl Ipv6HdrRaw {
    /// View the header at the front of `src`.
    pub fn parse(src: &[u8]) -> Option<&Self> {
        Self::ref_from_prefix(src).ok().map(|(hdr, _)| hdr)
    }

    /// View the header at the front of `dst`, mutably.
    pub fn parse_mut(dst: &mut [u8]) -> Option<&mut Self> {
        Self::mut_from_prefix(dst).ok().map(|(hdr, _)| hdr)
    }

    pub fn vtc_flow(&self) -> u32 {
        u32::from_be_bytes(self.vtc_flow)
    }

    pub fn set_vtc_flow(&mut self, val: u32) {
        self.vtc_flow = val.to_be_bytes();
    }

    pub fn version(&self) -> u8 {
        (self.vtc_flow() >> 28) as u8
    }

    pub fn traffic_class(&self) -> u8 {
        ((self.vtc_flow() & VTC_CLASS_MASK) >> 20) as u8
    }

    pub fn flow_label(&self) -> u32 {
        self.vtc_flow() & VTC_FLOW_MASK
    }

    pub fn payload_len(&self) -> u16 {
        u16::from_be_bytes(self.payload_len)
    }
}

/// A header rewrite applied to each export copy.
///
/// One export loop serves many encapsulations; each provides the size
/// of its fixed header, how to read the length it declares, and how
/// its export copy is patched.
pub trait HeaderFixup: Send + Sync {
    /// The size of the fixed header the fixup rewrites.
    const HDR_LEN: usize;

    /// The name the node registers under.
    const NODE_NAME: &'static str;

    /// The total packet length the header at the front of `pkt`
    /// declares, or `None` if `pkt` does not hold a full header.
    fn declared_len(&self, pkt: &[u8]) -> Option<usize>;

    /// Patch the header at the front of `hdr`, the export copy of a
    /// packet whose metadata slot holds `opaque`.
    ///
    /// A region shorter than [`Self::HDR_LEN`] is left untouched.
    fn fixup(&self, hdr: &mut [u8], opaque: u32);

    /// The value recorded in the trace for the packet `pkt`.
    fn trace_label(&self, pkt: &[u8]) -> u32;
}

/// Fold the decap flag into the IPv6 flow label.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ip6FlowLabel;

impl HeaderFixup for Ip6FlowLabel {
    const HDR_LEN: usize = IPV6_HDR_SZ;
    const NODE_NAME: &'static str = "ip6-export";

    #[inline]
    fn declared_len(&self, pkt: &[u8]) -> Option<usize> {
        Ipv6HdrRaw::parse(pkt)
            .map(|hdr| usize::from(hdr.payload_len()) + IPV6_HDR_SZ)
    }

    #[inline]
    fn fixup(&self, hdr: &mut [u8], opaque: u32) {
        if let Some(hdr) = Ipv6HdrRaw::parse_mut(hdr) {
            hdr.set_vtc_flow(apply_decap(hdr.vtc_flow(), opaque));
        }
    }

    fn trace_label(&self, pkt: &[u8]) -> u32 {
        Ipv6HdrRaw::parse(pkt).map(Ipv6HdrRaw::flow_label).unwrap_or(0)
    }
}

/// Export the copy exactly as captured.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThrough;

impl HeaderFixup for PassThrough {
    const HDR_LEN: usize = 0;
    const NODE_NAME: &'static str = "export-passthrough";

    fn declared_len(&self, pkt: &[u8]) -> Option<usize> {
        Some(pkt.len())
    }

    fn fixup(&self, _hdr: &mut [u8], _opaque: u32) {}

    fn trace_label(&self, _pkt: &[u8]) -> u32 {
        0
    }
}
