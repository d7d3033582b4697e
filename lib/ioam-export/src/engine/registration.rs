// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! What an export node declares to the host dispatching it.

use super::VECTOR_SIZE;
use super::header::HeaderFixup;
use super::node::ExportStats;
use crate::stat::StatField;
use crate::stat::StatProvider;
use core::fmt;
use core::fmt::Display;

/// The dispositions available to a packet leaving the export node.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u32)]
pub enum ExportNext {
    /// Strip the hop-by-hop header and continue forwarding.
    PopHopByHop = 0,
}

impl ExportNext {
    pub const ALL: [Self; 1] = [Self::PopHopByHop];

    /// The registered name of the downstream node.
    pub const fn node_name(self) -> &'static str {
        match self {
            Self::PopHopByHop => "ip6-pop-hop-by-hop",
        }
    }

    pub const fn index(self) -> u32 {
        self as u32
    }
}

impl Display for ExportNext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node_name())
    }
}

/// The host's handle for each [`ExportNext`].
///
/// The handles are whatever the dispatcher uses to reach a downstream
/// node. They are bound once, at construction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NextNodes<T: Copy> {
    pop_hop_by_hop: T,
}

impl<T: Copy> NextNodes<T> {
    pub fn new(pop_hop_by_hop: T) -> Self {
        Self { pop_hop_by_hop }
    }

    #[inline]
    pub fn get(&self, next: ExportNext) -> T {
        match next {
            ExportNext::PopHopByHop => self.pop_hop_by_hop,
        }
    }
}

const NEXT_NODES: &[ExportNext] = &ExportNext::ALL;

/// The format of each trace record, as shown to an operator.
pub const TRACE_FORMAT: &str = "EXPORT: flow_label %d, next index %d";

/// The static description of an export node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeRegistration {
    pub name: &'static str,
    pub vector_size: usize,
    /// Counters in the order the node reports them.
    pub counters: &'static [StatField],
    pub trace_format: &'static str,
    /// Next nodes, indexed by [`ExportNext`].
    pub next_nodes: &'static [ExportNext],
}

/// Describe the export node built around the fixup `F`.
pub fn registration<F: HeaderFixup>() -> NodeRegistration {
    NodeRegistration {
        name: F::NODE_NAME,
        vector_size: VECTOR_SIZE,
        counters: ExportStats::FIELDS,
        trace_format: TRACE_FORMAT,
        next_nodes: NEXT_NODES,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::header::Ip6FlowLabel;

    #[test]
    fn ip6_registration() {
        let reg = registration::<Ip6FlowLabel>();
        assert_eq!(reg.name, "ip6-export");
        assert_eq!(reg.vector_size, VECTOR_SIZE);
        assert_eq!(reg.trace_format, TRACE_FORMAT);

        assert_eq!(reg.counters[0].name, "recorded");
        assert_eq!(reg.counters[0].desc, "Packets recorded for export");
        assert_eq!(reg.counters.len(), 4);

        assert_eq!(reg.next_nodes.len(), 1);
        for (i, next) in reg.next_nodes.iter().enumerate() {
            assert_eq!(next.index() as usize, i);
        }
        assert_eq!(reg.next_nodes[0].node_name(), "ip6-pop-hop-by-hop");
    }

    #[test]
    fn next_handles() {
        let next = NextNodes::new(7u16);
        assert_eq!(next.get(ExportNext::PopHopByHop), 7);
    }
}
