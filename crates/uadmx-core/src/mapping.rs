//! Node id to DMX address mapping

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::graph::NodeId;

/// A DMX address: linear universe id plus 1-based channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DmxAddress {
    pub universe: u16,
    pub channel: u16, // 1-512
}

impl DmxAddress {
    pub fn new(universe: u16, channel: u16) -> Self {
        Self { universe, channel }
    }
}

impl fmt::Display for DmxAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Universe: {}, Channel: {}", self.universe, self.channel)
    }
}

/// Immutable lookup table from node identifier to DMX address.
///
/// Built once by the graph resolver and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMapping {
    entries: HashMap<NodeId, DmxAddress>,
}

impl ChannelMapping {
    /// Look up the address of a node
    pub fn get(&self, id: &str) -> Option<DmxAddress> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &DmxAddress)> {
        self.entries.iter()
    }

    /// Universes referenced by at least one entry, sorted
    pub fn universes(&self) -> Vec<u16> {
        let mut universes: Vec<u16> = self.entries.values().map(|a| a.universe).collect();
        universes.sort_unstable();
        universes.dedup();
        universes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(NodeId, DmxAddress)> for ChannelMapping {
    fn from_iter<I: IntoIterator<Item = (NodeId, DmxAddress)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
