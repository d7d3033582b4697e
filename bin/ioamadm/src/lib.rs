// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! IOAM export node administration library.
//!
//! Beyond describing the node, `ioamadm` can replay a packet capture
//! through an export node running in this process, writing what the
//! node exports to a second capture.

use ioam_export::api::API_VERSION;
use ioam_export::api::CfgError;
use ioam_export::api::ExportCfg;
use ioam_export::api::MAJOR_VERSION;
use ioam_export::engine::ExportNext;
use ioam_export::engine::ExportNode;
use ioam_export::engine::ExportTransport;
use ioam_export::engine::Frame;
use ioam_export::engine::NextNodes;
use ioam_export::engine::PacketBuf;
use ioam_export::engine::VECTOR_SIZE;
use ioam_export::engine::ValidCfg;
use ioam_export::engine::buffer::FixedPool;
use ioam_export::engine::header::Ip6FlowLabel;
use ioam_export::engine::node::ExportTrace;
use ioam_export::provider::LogLevel;
use ioam_export::provider::LogProvider;
use ioam_export::provider::Providers;
use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;
use slog::Drain;
use smoltcp::wire::EthernetFrame;
use smoltcp::wire::EthernetProtocol;
use slog::Logger;
use slog::debug;
use slog::error;
use slog::info;
use slog::o;
use slog::warn;
use std::fs;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// The link layer in front of each captured packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Link {
    Ip,
    Ethernet,
}

/// The snap length written into export captures.
const EXPORT_SNAPLEN: u32 = ioam_export::api::MAX_EXPORT_SIZE as u32;

pub fn ioam_pkg_version() -> String {
    format!("{MAJOR_VERSION}.{API_VERSION}")
}

/// Errors encountered while replaying a capture.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write export capture: {0}")]
    Export(#[source] io::Error),

    #[error("malformed capture: {0}")]
    Pcap(String),

    #[error("unsupported capture link type {0}")]
    Linktype(i32),

    #[error("invalid export configuration: {0}")]
    Cfg(#[from] CfgError),

    #[error("invalid config file {}: {msg}", .path.display())]
    CfgFile { path: PathBuf, msg: String },

    #[error("batch size must be between 1 and {max}", max = VECTOR_SIZE)]
    BatchSize(usize),

    #[error("failed to create export node: {0}")]
    Node(String),
}

/// Build the root logger: terminal output, filtered by `RUST_LOG`.
pub fn logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain);
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("component" => "ioamadm"))
}

/// A [`LogProvider`] which logs through a `slog` logger.
pub struct SlogLog(pub Logger);

impl LogProvider for SlogLog {
    fn log(&self, level: LogLevel, msg: &str) {
        match level {
            LogLevel::Note => info!(self.0, "{}", msg),
            LogLevel::Warn => warn!(self.0, "{}", msg),
            LogLevel::Error => error!(self.0, "{}", msg),
        }
    }
}

/// Load the export configuration from an optional TOML file.
///
/// Settings absent from the file keep their defaults.
pub fn load_cfg(path: Option<&Path>) -> Result<ExportCfg, ReplayError> {
    let Some(path) = path else {
        return Ok(ExportCfg::default());
    };

    let text = fs::read_to_string(path)
        .map_err(|source| ReplayError::Io { path: path.into(), source })?;
    toml::from_str(&text).map_err(|e| ReplayError::CfgFile {
        path: path.into(),
        msg: e.to_string(),
    })
}

/// A transport which writes every export into a pcap stream of raw
/// IPv6 packets, then returns the buffer to its pool.
pub struct PcapTransport {
    out: Mutex<Box<dyn Write + Send>>,
    pool: Arc<FixedPool>,
    written: AtomicU64,
    err: Mutex<Option<io::Error>>,
}

impl PcapTransport {
    pub fn new(
        mut out: Box<dyn Write + Send>,
        pool: Arc<FixedPool>,
    ) -> Result<Self, ReplayError> {
        let mut hdr = PcapHeader {
            magic_number: 0xa1b2c3d4,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: EXPORT_SNAPLEN,
            network: Linktype::RAW,
        };
        let bytes = hdr
            .to_vec()
            .map_err(|e| ReplayError::Pcap(format!("{e:?}")))?;
        out.write_all(&bytes).map_err(ReplayError::Export)?;

        Ok(Self {
            out: Mutex::new(out),
            pool,
            written: AtomicU64::new(0),
            err: Mutex::new(None),
        })
    }

    /// The number of exports written so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Flush the stream, reporting the first failure seen by any
    /// submission.
    pub fn finish(&self) -> Result<(), ReplayError> {
        if let Some(e) = self.err.lock().unwrap_or_else(|e| e.into_inner()).take()
        {
            return Err(ReplayError::Export(e));
        }

        self.out
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .flush()
            .map_err(ReplayError::Export)
    }

    fn write_record(&self, data: &[u8]) -> io::Result<()> {
        let mut block = LegacyPcapBlock {
            ts_sec: 0,
            ts_usec: 0,
            caplen: data.len() as u32,
            origlen: data.len() as u32,
            data,
        };
        let bytes = block
            .to_vec()
            .map_err(|e| io::Error::other(format!("{e:?}")))?;
        self.out.lock().unwrap_or_else(|e| e.into_inner()).write_all(&bytes)
    }
}

impl ExportTransport for PcapTransport {
    fn submit(&self, buf: PacketBuf) {
        match self.write_record(buf.current()) {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
            }

            Err(e) => {
                let mut err = self.err.lock().unwrap_or_else(|e| e.into_inner());
                err.get_or_insert(e);
            }
        }

        self.pool.release(buf);
    }
}

pub type ReplayNode =
    ExportNode<Ip6FlowLabel, Arc<FixedPool>, Arc<PcapTransport>, ExportNext>;

/// The settings of a replay.
#[derive(Clone, Debug)]
pub struct ReplayOpts {
    pub input: PathBuf,
    pub output: PathBuf,
    pub cfg: ExportCfg,
    /// The number of buffers in the export pool.
    pub pool: usize,
    /// The number of packets handed to the node per frame.
    pub batch: usize,
}

/// What a replay did.
pub struct ReplaySummary {
    pub node: ReplayNode,
    pub packets: u64,
    pub frames: u64,
    /// Capture records which did not hold an IPv6 packet.
    pub skipped: u64,
    pub exported: u64,
    pub traces: Vec<ExportTrace>,
}

/// Run every IPv6 packet of the capture at `opts.input` through an
/// `ip6-export` node, writing its exports to `opts.output`.
pub fn replay(
    opts: &ReplayOpts,
    log: &Logger,
) -> Result<ReplaySummary, ReplayError> {
    let cfg = ValidCfg::new(opts.cfg)?;
    if opts.batch == 0 || opts.batch > VECTOR_SIZE {
        return Err(ReplayError::BatchSize(opts.batch));
    }

    let input = fs::read(&opts.input).map_err(|source| ReplayError::Io {
        path: opts.input.clone(),
        source,
    })?;
    let pkts = read_capture(&input, log)?;

    let out = File::create(&opts.output).map_err(|source| ReplayError::Io {
        path: opts.output.clone(),
        source,
    })?;
    let pool = Arc::new(FixedPool::new(opts.pool, cfg.export_size()));
    let xport = Arc::new(PcapTransport::new(
        Box::new(BufWriter::new(out)),
        pool.clone(),
    )?);

    let ectx = Providers { log: Box::new(SlogLog(log.clone())) };
    let node = ExportNode::new(
        Ip6FlowLabel,
        pool,
        xport.clone(),
        NextNodes::new(ExportNext::PopHopByHop),
        &ectx,
    )
    .map_err(|e| ReplayError::Node(e.to_string()))?;

    info!(log, "replaying capture";
        "input" => %opts.input.display(),
        "packets" => pkts.packets.len(),
        "cfg" => %opts.cfg,
    );

    let mut summary = ReplaySummary {
        node,
        packets: 0,
        frames: 0,
        skipped: pkts.skipped,
        exported: 0,
        traces: vec![],
    };

    for chunk in pkts.packets.chunks(opts.batch) {
        let mut frame = Frame::new();
        for bytes in chunk {
            frame
                .push(PacketBuf::copy(bytes))
                .map_err(|_| ReplayError::BatchSize(opts.batch))?;
        }

        let res = summary.node.process(&cfg, frame);
        summary.packets += res.processed as u64;
        summary.frames += 1;
        summary.traces.extend(res.traces);
        debug!(log, "frame done"; "frame" => summary.frames,
            "processed" => res.processed);
    }

    xport.finish()?;
    summary.exported = xport.written();
    info!(log, "replay done";
        "packets" => summary.packets,
        "exported" => summary.exported,
        "output" => %opts.output.display(),
    );

    Ok(summary)
}

/// The IPv6 packets held by a capture.
struct Capture {
    packets: Vec<Vec<u8>>,
    skipped: u64,
}

fn read_capture(bytes: &[u8], log: &Logger) -> Result<Capture, ReplayError> {
    let (mut rest, hdr) = pcap::parse_pcap_header(bytes)
        .map_err(|e| ReplayError::Pcap(format!("bad header: {e:?}")))?;

    let link = if hdr.network == Linktype::RAW || hdr.network == Linktype::IPV6
    {
        Link::Ip
    } else if hdr.network == Linktype::ETHERNET {
        Link::Ethernet
    } else {
        return Err(ReplayError::Linktype(hdr.network.0));
    };

    let big_endian = hdr.is_bigendian();
    let mut cap = Capture { packets: vec![], skipped: 0 };

    while !rest.is_empty() {
        let res = if big_endian {
            pcap::parse_pcap_frame_be(rest)
        } else {
            pcap::parse_pcap_frame(rest)
        };
        let (new_rest, block) = res.map_err(|e| {
            ReplayError::Pcap(format!(
                "bad record {}: {e:?}",
                cap.packets.len() as u64 + cap.skipped
            ))
        })?;
        rest = new_rest;

        match ipv6_payload(block.data, link) {
            Some(pkt) => cap.packets.push(pkt.to_vec()),
            None => {
                cap.skipped += 1;
                warn!(log, "skipping non-IPv6 record";
                    "len" => block.data.len());
            }
        }
    }

    Ok(cap)
}

fn ipv6_payload(data: &[u8], link: Link) -> Option<&[u8]> {
    let pkt = match link {
        Link::Ip => data,
        Link::Ethernet => {
            let frame = EthernetFrame::new_checked(data).ok()?;
            if frame.ethertype() != EthernetProtocol::Ipv6 {
                return None;
            }
            data.get(EthernetFrame::<&[u8]>::header_len()..)?
        }
    };

    match pkt.first() {
        Some(b) if b >> 4 == 6 => Some(pkt),
        _ => None,
    }
}
