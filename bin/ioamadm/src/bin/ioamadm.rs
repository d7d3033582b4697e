// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap::Parser;

use ioam_export::engine::VECTOR_SIZE;
use ioam_export::engine::ValidCfg;
use ioam_export::engine::header::Ip6FlowLabel;
use ioam_export::engine::registration::registration;
use ioam_export::print::print_registration;
use ioam_export::print::print_stats;
use ioam_export::print::print_traces;
use ioamadm::ReplayOpts;
use ioamadm::ioam_pkg_version;
use ioamadm::load_cfg;
use ioamadm::logger;
use ioamadm::replay;

/// Administer the IOAM export node
#[derive(Debug, Parser)]
#[command(version=ioam_pkg_version())]
enum Command {
    /// Show the registration of the ip6-export node.
    ShowNode,

    /// Show the export configuration, validated, as JSON.
    ShowConfig {
        /// A TOML file of export settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Replay a packet capture through an ip6-export node.
    Replay(ReplayArgs),
}

#[derive(Args, Clone, Debug)]
struct ReplayArgs {
    /// The capture to read: raw IPv6 or Ethernet.
    #[arg(long)]
    input: PathBuf,

    /// Where to write the exported copies, as raw IPv6.
    #[arg(long)]
    output: PathBuf,

    /// A TOML file of export settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the maximum export size.
    #[arg(long)]
    export_size: Option<usize>,

    /// Forward packets without exporting them.
    #[arg(long)]
    disable: bool,

    /// Print a trace record for every packet.
    #[arg(long)]
    trace: bool,

    /// The number of buffers in the export pool.
    #[arg(long, default_value_t = 1024)]
    pool: usize,

    /// The number of packets per frame.
    #[arg(long, default_value_t = VECTOR_SIZE)]
    batch: usize,
}

fn main() -> anyhow::Result<()> {
    let cmd = Command::parse();
    match cmd {
        Command::ShowNode => {
            print_registration(&registration::<Ip6FlowLabel>())?;
        }

        Command::ShowConfig { config } => {
            let cfg = load_cfg(config.as_deref())?;
            let cfg = ValidCfg::new(cfg).context("invalid export config")?;
            println!("{}", serde_json::to_string_pretty(&cfg.to_cfg())?);
        }

        Command::Replay(args) => {
            let mut cfg = load_cfg(args.config.as_deref())?;
            if let Some(size) = args.export_size {
                cfg.export_size = size;
            }
            if args.disable {
                cfg.enabled = false;
            }
            if args.trace {
                cfg.trace = true;
            }

            let opts = ReplayOpts {
                input: args.input,
                output: args.output,
                cfg,
                pool: args.pool,
                batch: args.batch,
            };

            let log = logger();
            let summary = replay(&opts, &log).with_context(|| {
                format!("failed to replay {}", opts.input.display())
            })?;

            println!(
                "packets: {} frames: {} skipped: {} exported: {}\n",
                summary.packets,
                summary.frames,
                summary.skipped,
                summary.exported
            );
            print_stats(summary.node.stats())?;
            if !summary.traces.is_empty() {
                print_traces(&summary.traces)?;
            }
        }
    }

    Ok(())
}
