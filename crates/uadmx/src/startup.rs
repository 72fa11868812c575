//! Startup sequence
//!
//! Everything here runs before the listener binds. Any failure is a
//! configuration error and ends the process.

use anyhow::{Context, Result};
use std::sync::Arc;

use uadmx_control::{AppState, AuditLog, Bridge, PatternRunner, UniverseChannelStore};
use uadmx_core::{find_nodeset_files, load_nodeset, FixtureCatalog, GraphResolver};

use crate::config::BridgeConfig;

/// Load the model, resolve it and wire up the runtime
pub fn build_state(config: &BridgeConfig) -> Result<AppState> {
    let files = find_nodeset_files(&config.model.directory).with_context(|| {
        format!(
            "No nodeset found in {}",
            config.model.directory.display()
        )
    })?;
    let nodeset = files
        .first()
        .cloned()
        .context("Model directory holds no nodeset")?;
    if files.len() > 1 {
        tracing::warn!(
            "{} xml files in {}, using {}",
            files.len(),
            config.model.directory.display(),
            nodeset.display()
        );
    }

    let graph = load_nodeset(&nodeset)
        .with_context(|| format!("Failed to load nodeset {}", nodeset.display()))?;
    tracing::info!("Loaded {} nodes from {}", graph.len(), nodeset.display());

    let catalog = FixtureCatalog::new(&config.fixtures.directory);
    let resolver_config = config.model.resolver_config();
    let mapping = GraphResolver::new(&graph, &catalog, &resolver_config)
        .resolve()
        .context("Failed to resolve fixtures")?;

    let mut store = UniverseChannelStore::new();
    for (universe, sender) in config
        .artnet
        .build_senders()
        .context("Failed to create Art-Net senders")?
    {
        store
            .register(universe, sender)
            .with_context(|| format!("Failed to register universe {}", universe))?;
    }
    if store.universes().is_empty() {
        tracing::warn!("No Art-Net nodes configured, writes will not reach the network");
    }
    let store = Arc::new(store);

    let audit = AuditLog::from_config(&config.audit).with_context(|| {
        format!("Failed to open audit log {}", config.audit.path.display())
    })?;

    let bridge = Bridge::new(Arc::new(mapping), store.clone(), audit);
    let patterns = PatternRunner::new(store, config.patterns.clone());

    Ok(AppState::new(
        Arc::new(bridge),
        Arc::new(patterns),
        files,
        config.model.namespace,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use uadmx_control::ArtNetNode;

    const NODESET: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<UANodeSet xmlns:uax="http://opcfoundation.org/UA/2008/02/Types.xsd">
  <UAObjectType NodeId="ns=1;i=1" BrowseName="1:DMXLight"><DisplayName>DMXLight</DisplayName></UAObjectType>
  <UAObject NodeId="ns=1;i=10" BrowseName="1:U">
    <DisplayName>U</DisplayName>
    <References><Reference ReferenceType="HasProperty">ns=1;i=11</Reference></References>
  </UAObject>
  <UAVariable NodeId="ns=1;i=11" BrowseName="1:UniverseId" ParentNodeId="ns=1;i=10">
    <DisplayName>UniverseId</DisplayName><Value><uax:Int32>2</uax:Int32></Value>
  </UAVariable>
  <UAObject NodeId="ns=1;i=12" BrowseName="1:Fixtures" ParentNodeId="ns=1;i=10"><DisplayName>Fixtures</DisplayName></UAObject>
  <UAObject NodeId="ns=1;i=20" BrowseName="1:Dimmer" ParentNodeId="ns=1;i=12">
    <DisplayName>Dimmer</DisplayName>
    <References>
      <Reference ReferenceType="HasTypeDefinition">ns=1;i=1</Reference>
      <Reference ReferenceType="HasProperty">ns=1;i=21</Reference>
      <Reference ReferenceType="HasProperty">ns=1;i=22</Reference>
      <Reference ReferenceType="HasProperty">ns=1;i=23</Reference>
      <Reference ReferenceType="HasProperty">ns=1;i=24</Reference>
      <Reference ReferenceType="HasComponent">ns=1;i=30</Reference>
    </References>
  </UAObject>
  <UAVariable NodeId="ns=1;i=21" BrowseName="1:FixtureKey" ParentNodeId="ns=1;i=20">
    <DisplayName>FixtureKey</DisplayName><Value><uax:String>dimmer</uax:String></Value>
  </UAVariable>
  <UAVariable NodeId="ns=1;i=22" BrowseName="1:Manufacturer" ParentNodeId="ns=1;i=20">
    <DisplayName>Manufacturer</DisplayName><Value><uax:String>generic</uax:String></Value>
  </UAVariable>
  <UAVariable NodeId="ns=1;i=23" BrowseName="1:Mode" ParentNodeId="ns=1;i=20">
    <DisplayName>Mode</DisplayName><Value><uax:String>1ch</uax:String></Value>
  </UAVariable>
  <UAVariable NodeId="ns=1;i=24" BrowseName="1:Address" ParentNodeId="ns=1;i=20">
    <DisplayName>Address</DisplayName><Value><uax:Int32>12</uax:Int32></Value>
  </UAVariable>
  <UAObject NodeId="ns=1;i=30" BrowseName="1:Capabilities" ParentNodeId="ns=1;i=20">
    <DisplayName>Capabilities</DisplayName>
    <References><Reference ReferenceType="HasComponent">ns=1;i=31</Reference></References>
  </UAObject>
  <UAVariable NodeId="ns=1;i=31" BrowseName="1:Dimmer" ParentNodeId="ns=1;i=30">
    <DisplayName>Dimmer</DisplayName>
  </UAVariable>
</UANodeSet>
"#;

    const DIMMER: &str =
        r#"{ "name": "Dimmer", "modes": [{ "name": "1-channel", "shortName": "1ch", "channels": ["Dimmer"] }] }"#;

    fn config_in(root: &Path) -> BridgeConfig {
        fs::create_dir_all(root.join("models")).unwrap();
        fs::write(root.join("models/show.xml"), NODESET).unwrap();
        fs::create_dir_all(root.join("fixtures/generic")).unwrap();
        fs::write(root.join("fixtures/generic/dimmer.json"), DIMMER).unwrap();

        let mut config = BridgeConfig::default();
        config.model.directory = root.join("models");
        config.fixtures.directory = root.join("fixtures");
        config.audit.path = root.join("log.csv");
        config.artnet.dry_run = true;
        config.artnet.nodes = vec![ArtNetNode {
            name: "test".to_string(),
            ip: "127.0.0.1".to_string(),
            universes: vec![2],
        }];
        config
    }

    #[test]
    fn test_build_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let state = build_state(&config).unwrap();
        assert_eq!(state.nodeset_files.len(), 1);

        let address = state.bridge.write("ns=1;i=31", 42).unwrap();
        assert_eq!((address.universe, address.channel), (2, 12));
        assert_eq!(state.bridge.read("ns=1;i=31").unwrap(), 42);
        assert_eq!(state.bridge.store().universes(), vec![2]);
    }

    #[test]
    fn test_missing_model_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.model.directory = dir.path().join("elsewhere");

        let err = build_state(&config).err().unwrap();
        assert!(err.to_string().contains("No nodeset found"));
    }

    #[test]
    fn test_missing_fixture_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::remove_file(dir.path().join("fixtures/generic/dimmer.json")).unwrap();

        let err = build_state(&config).err().unwrap();
        assert!(err.to_string().contains("Failed to resolve fixtures"));
    }
}
