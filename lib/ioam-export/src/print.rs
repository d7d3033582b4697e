// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Print node state in human-friendly manner.
//!
//! This is mostly just a place to hang printing routines so that they
//! can be used by both ioamadm and integration tests.

use crate::engine::node::ExportTrace;
use crate::engine::registration::NodeRegistration;
use crate::stat::StatNamed;
use crate::stat::StatProvider;
use std::io::Write;
use tabwriter::TabWriter;

/// Print a [`NodeRegistration`].
pub fn print_registration(reg: &NodeRegistration) -> std::io::Result<()> {
    print_registration_into(&mut std::io::stdout(), reg)
}

/// Print a [`NodeRegistration`].
pub fn print_registration_into(
    writer: &mut impl Write,
    reg: &NodeRegistration,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "Node {}", reg.name)?;
    write_hrb(&mut t)?;
    writeln!(t, "vector size:\t{}", reg.vector_size)?;
    writeln!(t, "trace format:\t{}", reg.trace_format)?;
    t.flush()?;

    writeln!(t, "\nCounters")?;
    write_hr(&mut t)?;
    writeln!(t, "NAME\tDESCRIPTION")?;
    for field in reg.counters {
        writeln!(t, "{}\t{}", field.name, field.desc)?;
    }
    t.flush()?;

    writeln!(t, "\nNext Nodes")?;
    write_hr(&mut t)?;
    writeln!(t, "INDEX\tNODE")?;
    for next in reg.next_nodes {
        writeln!(t, "{}\t{}", next.index(), next.node_name())?;
    }
    writeln!(t)?;
    t.flush()
}

/// Print the counters of a registered provider.
pub fn print_stats<T: StatProvider>(
    stats: &StatNamed<T>,
) -> std::io::Result<()> {
    print_stats_into(&mut std::io::stdout(), stats)
}

/// Print the counters of a registered provider.
pub fn print_stats_into<T: StatProvider>(
    writer: &mut impl Write,
    stats: &StatNamed<T>,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "Counters {}:{}", stats.module(), stats.name())?;
    write_hr(&mut t)?;
    writeln!(t, "NAME\tVALUE\tDESCRIPTION")?;
    for (i, field) in T::FIELDS.iter().enumerate() {
        let val = stats.vals.value(i).unwrap_or(0);
        writeln!(t, "{}\t{}\t{}", field.name, val, field.desc)?;
    }
    writeln!(t)?;
    t.flush()
}

/// Print trace records.
pub fn print_traces(traces: &[ExportTrace]) -> std::io::Result<()> {
    print_traces_into(&mut std::io::stdout(), traces)
}

/// Print trace records.
pub fn print_traces_into(
    writer: &mut impl Write,
    traces: &[ExportTrace],
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "Traces")?;
    write_hr(&mut t)?;
    writeln!(t, "PKT\tOPAQUE\tRECORD")?;
    for (i, trace) in traces.iter().enumerate() {
        writeln!(t, "{}\t{:#010x}\t{}", i, trace.opaque, trace)?;
    }
    writeln!(t)?;
    t.flush()
}

/// Print a horizontal rule in bold.
pub fn write_hrb(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:=<70}", "=")
}

/// Print a horizontal rule.
pub fn write_hr(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:-<70}", "-")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::header::Ip6FlowLabel;
    use crate::engine::node::ExportStats;
    use crate::engine::registration::registration;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn registration_lists_everything() {
        let reg = registration::<Ip6FlowLabel>();
        let out = render(|w| print_registration_into(w, &reg));
        assert!(out.starts_with("Node ip6-export\n"));
        assert!(out.contains("Packets recorded for export"));
        assert!(out.contains("ip6-pop-hop-by-hop"));
        assert!(out.contains("EXPORT: flow_label %d, next index %d"));
    }

    #[test]
    fn stats_show_values() {
        let stats =
            StatNamed::new("ioam", "ip6-export", ExportStats::new()).unwrap();
        stats.vals.recorded.incr(42);
        let out = render(|w| print_stats_into(w, &stats));
        assert!(out.starts_with("Counters ioam:ip6-export\n"));
        let line = out.lines().find(|l| l.starts_with("recorded")).unwrap();
        assert!(line.contains("42"));
    }

    #[test]
    fn traces_use_record_format() {
        let traces = [ExportTrace { next_index: 0, flow_label: 1, opaque: 0 }];
        let out = render(|w| print_traces_into(w, &traces));
        assert!(out.contains("EXPORT: flow_label 1, next index 0"));
    }
}
