//! uadmx Control - DMX output and the bridge protocol
//!
//! This crate serves a resolved [`uadmx_core::ChannelMapping`]:
//! - **DMX**: universe addressing, the per-universe send boundary, Art-Net output
//! - **Store**: committed and prepared channel state per universe
//! - **Patterns**: scheduled test patterns
//! - **Bridge**: node identifier reads and writes with an audit log
//! - **Web API**: the HTTP protocol surface (requires `http-api`)
//!
//! ## Feature Flags
//!
//! - `http-api`: Enable the web server (requires `axum`, `tower`, `tower-http`), on by default
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uadmx_control::{AuditLog, Bridge, MemorySender, UniverseChannelStore};
//! use uadmx_core::{ChannelMapping, DmxAddress, NodeId};
//!
//! # fn main() -> uadmx_control::Result<()> {
//! let mapping: ChannelMapping = [(NodeId::from("ns=1;i=2021"), DmxAddress::new(0, 1))]
//!     .into_iter()
//!     .collect();
//!
//! let mut store = UniverseChannelStore::new();
//! store.register(0, Box::new(MemorySender::new(0)))?;
//!
//! let bridge = Bridge::new(Arc::new(mapping), Arc::new(store), AuditLog::disabled());
//! bridge.write("ns=1;i=2021", 128).ok();
//! assert_eq!(bridge.read("ns=1;i=2021"), Ok(128));
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]

/// Error types
pub mod error;

/// DMX output, channel store and test patterns
pub mod dmx;

/// Bridge protocol handler and audit log
pub mod bridge;

#[cfg(feature = "http-api")]
/// Web API server
pub mod web;

// Re-exports
pub use error::{ControlError, Result};

pub use bridge::{AuditConfig, AuditLog, Bridge, BridgeError};
pub use dmx::{
    ArtNetConfig, ArtNetNode, ArtNetSender, DmxSender, MemorySender, PatternConfig, PatternKind,
    PatternRunner, UniverseAddress, UniverseChannelStore,
};

#[cfg(feature = "http-api")]
pub use web::{AppState, WebServer, WebServerConfig};
