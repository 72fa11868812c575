//! uadmx Core - Node graph resolution
//!
//! This crate turns an OPC UA style node graph describing lighting fixtures
//! into a static lookup table from node identifier to DMX address:
//! - Node graph model and nodeset XML loader
//! - Fixture catalog (Open Fixture Library JSON files)
//! - Channel index resolution per fixture mode
//! - Graph resolver producing the [`ChannelMapping`]
//! - Logging configuration shared with the binary

#![allow(missing_docs)]

/// Fixture catalog
pub mod catalog;
/// Fixture definitions and channel index resolution
pub mod fixture;
/// Node graph model
pub mod graph;
/// Logging configuration
pub mod logging;
/// Node id to DMX address mapping
pub mod mapping;
/// Nodeset XML loader
pub mod nodeset;
/// Graph resolver
pub mod resolver;

// --- Re-exports grouped by category ---

// Graph
pub use graph::{
    GraphError, Node, NodeClass, NodeGraph, NodeId, NodeValue, Reference, ReferenceType,
};
pub use nodeset::{find_nodeset_files, load_nodeset, parse_nodeset, NodesetError};

// Fixtures
pub use catalog::{CatalogError, FixtureCatalog};
pub use fixture::{resolve_index, ChannelIndexError, ChannelSlot, FixtureDefinition, Mode};

// Resolution
pub use mapping::{ChannelMapping, DmxAddress};
pub use resolver::{FixtureInstance, GraphResolver, ResolveError, ResolverConfig};

// Logging
pub use logging::LogConfig;
