//! Bridge protocol handler
//!
//! Translates reads and writes addressed by node identifier into channel
//! store operations. The mapping is fixed at startup; the store and audit
//! log are shared with the rest of the process.

pub mod audit;

use std::sync::Arc;
use thiserror::Error;
use uadmx_core::{ChannelMapping, DmxAddress};

use crate::dmx::UniverseChannelStore;
pub use audit::{AuditConfig, AuditLog, AuditRecord};

/// Errors reported to the protocol caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("UA Node not found: {0}")]
    NotFound(String),

    #[error("Value {0} is outside 0-255")]
    InvalidValue(i64),
}

/// Read/write access to mapped variables
pub struct Bridge {
    mapping: Arc<ChannelMapping>,
    store: Arc<UniverseChannelStore>,
    audit: AuditLog,
}

impl Bridge {
    pub fn new(
        mapping: Arc<ChannelMapping>,
        store: Arc<UniverseChannelStore>,
        audit: AuditLog,
    ) -> Self {
        for universe in mapping.universes() {
            if !store.contains(universe) {
                tracing::warn!(
                    "Universe {} is mapped but has no sender; writes to it are dropped",
                    universe
                );
            }
        }
        Self {
            mapping,
            store,
            audit,
        }
    }

    fn lookup(&self, node_id: &str) -> Result<DmxAddress, BridgeError> {
        self.mapping
            .get(node_id)
            .ok_or_else(|| BridgeError::NotFound(node_id.to_string()))
    }

    /// Current committed value of a variable
    pub fn read(&self, node_id: &str) -> Result<u8, BridgeError> {
        let address = self.lookup(node_id)?;
        Ok(self.store.get_value(address.universe, address.channel))
    }

    /// Write a variable and record it in the audit log
    pub fn write(&self, node_id: &str, value: i64) -> Result<DmxAddress, BridgeError> {
        let address = self.lookup(node_id)?;
        let value = u8::try_from(value).map_err(|_| BridgeError::InvalidValue(value))?;

        self.store.set_channel(address.universe, address.channel, value);
        self.audit.record(node_id, value);
        tracing::debug!("{} = {} ({})", node_id, value, address);

        Ok(address)
    }

    pub fn mapping(&self) -> &ChannelMapping {
        &self.mapping
    }

    pub fn store(&self) -> &Arc<UniverseChannelStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmx::MemorySender;
    use uadmx_core::NodeId;

    fn bridge() -> (Bridge, MemorySender) {
        let mapping: ChannelMapping = [
            (NodeId::from("ns=1;i=10"), DmxAddress::new(0, 1)),
            (NodeId::from("ns=1;i=11"), DmxAddress::new(0, 2)),
        ]
        .into_iter()
        .collect();

        let sender = MemorySender::new(0);
        let mut store = UniverseChannelStore::new();
        store.register(0, Box::new(sender.clone())).unwrap();

        let bridge = Bridge::new(Arc::new(mapping), Arc::new(store), AuditLog::disabled());
        (bridge, sender)
    }

    #[test]
    fn test_write_then_read() {
        let (bridge, sender) = bridge();

        let address = bridge.write("ns=1;i=11", 77).unwrap();
        assert_eq!(address, DmxAddress::new(0, 2));
        assert_eq!(bridge.read("ns=1;i=11").unwrap(), 77);
        assert_eq!(bridge.read("ns=1;i=10").unwrap(), 0);
        assert_eq!(sender.last_sent().unwrap()[1], 77);
    }

    #[test]
    fn test_unknown_node() {
        let (bridge, sender) = bridge();

        assert_eq!(
            bridge.read("ns=1;i=99"),
            Err(BridgeError::NotFound("ns=1;i=99".to_string()))
        );
        assert!(matches!(
            bridge.write("ns=1;i=99", 1),
            Err(BridgeError::NotFound(_))
        ));
        assert_eq!(sender.sent_count(), 0);
    }

    #[test]
    fn test_value_out_of_range() {
        let (bridge, sender) = bridge();

        assert_eq!(bridge.write("ns=1;i=10", 256), Err(BridgeError::InvalidValue(256)));
        assert_eq!(bridge.write("ns=1;i=10", -1), Err(BridgeError::InvalidValue(-1)));
        assert_eq!(bridge.read("ns=1;i=10").unwrap(), 0);
        assert_eq!(sender.sent_count(), 0);
    }

    #[test]
    fn test_writes_are_audited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mapping: ChannelMapping = [(NodeId::from("ns=1;i=10"), DmxAddress::new(0, 1))]
            .into_iter()
            .collect();
        let mut store = UniverseChannelStore::new();
        store.register(0, Box::new(MemorySender::new(0))).unwrap();

        let bridge = Bridge::new(
            Arc::new(mapping),
            Arc::new(store),
            AuditLog::open(&path).unwrap(),
        );
        bridge.write("ns=1;i=10", 200).unwrap();
        assert!(bridge.write("ns=1;i=10", 300).is_err());
        drop(bridge);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"ns=1;i=10\";200;"));
    }
}
