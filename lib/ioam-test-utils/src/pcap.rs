// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Routines for building and reading packet capture files.

use ioam_export::engine::PacketBuf;
use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn get_header(offset: &[u8]) -> (&[u8], PcapHeader) {
    match pcap::parse_pcap_header(offset) {
        Ok((new_offset, header)) => (new_offset, header),
        Err(e) => panic!("failed to get header: {e:?}"),
    }
}

fn next_block(offset: &[u8]) -> (&[u8], LegacyPcapBlock<'_>) {
    match pcap::parse_pcap_frame(offset) {
        Ok((new_offset, block)) => {
            // We always want access to the entire packet.
            assert_eq!(block.origlen, block.caplen);
            (new_offset, block)
        }

        Err(e) => panic!("failed to get next block: {e:?}"),
    }
}

/// Read every packet out of a little-endian capture held in `bytes`.
pub fn read_pcap(bytes: &[u8]) -> (Linktype, Vec<Vec<u8>>) {
    let (mut rest, hdr) = get_header(bytes);
    let mut pkts = vec![];
    while !rest.is_empty() {
        let (new_rest, block) = next_block(rest);
        pkts.push(block.data.to_vec());
        rest = new_rest;
    }
    (hdr.network, pkts)
}

/// Build a packet capture file from a series of packets.
pub struct PcapBuilder {
    file: File,
}

impl PcapBuilder {
    /// Create a new pcap builder of raw IPv6 packets, writing all
    /// captures to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_linktype(path, Linktype::RAW)
    }

    pub fn with_linktype(path: impl AsRef<Path>, network: Linktype) -> Self {
        let mut file = File::create(path).unwrap();

        let mut hdr = PcapHeader {
            magic_number: 0xa1b2c3d4,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: 1500,
            network,
        };

        file.write_all(&hdr.to_vec().unwrap()).unwrap();

        Self { file }
    }

    /// Add a packet to the capture.
    pub fn add_pkt(&mut self, pkt: &PacketBuf) {
        self.add_bytes(pkt.current());
    }

    pub fn add_bytes(&mut self, pkt_bytes: &[u8]) {
        let mut block = LegacyPcapBlock {
            ts_sec: 7777,
            ts_usec: 7777,
            caplen: pkt_bytes.len() as u32,
            origlen: pkt_bytes.len() as u32,
            data: pkt_bytes,
        };

        self.file.write_all(&block.to_vec().unwrap()).unwrap();
    }
}
