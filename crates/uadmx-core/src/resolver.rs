//! Graph resolver
//!
//! Walks the node graph once at startup to find every fixture instance,
//! reads its declared configuration and turns each of its capability
//! variables into a [`DmxAddress`].
//!
//! Expected structure:
//!
//! ```text
//! Universe object            (HasProperty -> UniverseId variable)
//! └── Fixtures folder
//!     └── Fixture object     (HasTypeDefinition -> fixture type,
//!         │                   HasProperty -> FixtureKey, Manufacturer, Mode, Address)
//!         └── Capabilities   (HasComponent -> one variable per channel name)
//! ```
//!
//! Any deviation is a deployment error and fails the whole resolution.

use std::collections::HashMap;
use thiserror::Error;

use crate::catalog::{CatalogError, FixtureCatalog};
use crate::fixture::{resolve_index, ChannelIndexError};
use crate::graph::{GraphError, Node, NodeClass, NodeGraph, NodeId, NodeValue, ReferenceType};
use crate::mapping::{ChannelMapping, DmxAddress};

/// Display names of the fixture configuration properties
pub const PROP_FIXTURE_KEY: &str = "FixtureKey";
pub const PROP_MANUFACTURER: &str = "Manufacturer";
pub const PROP_MODE: &str = "Mode";
pub const PROP_ADDRESS: &str = "Address";

/// Highest linear universe id: net, subnet and universe each 0-15
pub const MAX_UNIVERSE_ID: i64 = 4095;

/// Errors raised while resolving the graph. All of them are fatal.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Object type not found: {0}")]
    ObjectTypeNotFound(String),

    #[error("No properties found for fixture {0}")]
    NoPropertiesFound(NodeId),

    #[error("Property {name} missing or empty on fixture {node}")]
    MissingProperty { node: NodeId, name: String },

    #[error("Property {name} on {node} is invalid: {reason}")]
    InvalidProperty {
        node: NodeId,
        name: String,
        reason: String,
    },

    #[error("Fixture definition for {node} could not be loaded: {source}")]
    FixtureNotFound {
        node: NodeId,
        #[source]
        source: CatalogError,
    },

    #[error("Broken containment at {node}: {reason}")]
    BrokenContainment { node: NodeId, reason: String },

    #[error("Universe object {0} has no universe id property")]
    UniverseIdNotFound(NodeId),

    #[error("Universe object {0} has more than one property")]
    AmbiguousUniverseId(NodeId),

    #[error("Invalid universe id on {node}: {reason}")]
    InvalidUniverseId { node: NodeId, reason: String },

    #[error("Fixture {0} has no capabilities object")]
    CapabilitiesNotFound(NodeId),

    #[error("Fixture {0} has more than one component object")]
    AmbiguousCapabilities(NodeId),

    #[error("Cannot resolve channel of {node}: {source}")]
    ChannelIndex {
        node: NodeId,
        #[source]
        source: ChannelIndexError,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Names the resolver looks for in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Display name of the fixture object type
    pub fixture_type: String,
    /// Display name of the universe object type; checked when set
    pub universe_type: Option<String>,
}

impl ResolverConfig {
    pub fn new(fixture_type: impl Into<String>) -> Self {
        Self {
            fixture_type: fixture_type.into(),
            universe_type: None,
        }
    }

    pub fn with_universe_type(mut self, universe_type: impl Into<String>) -> Self {
        self.universe_type = Some(universe_type.into());
        self
    }
}

/// A fully specified fixture instance found in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureInstance {
    pub node_id: NodeId,
    pub fixture_key: String,
    pub manufacturer: String,
    pub mode: String,
    pub address: i64,
    pub universe: u16,
    /// Capability variable id and its channel name
    pub capabilities: Vec<(NodeId, String)>,
}

/// Resolves a node graph into a [`ChannelMapping`]
pub struct GraphResolver<'a> {
    graph: &'a NodeGraph,
    catalog: &'a FixtureCatalog,
    config: &'a ResolverConfig,
}

impl<'a> GraphResolver<'a> {
    pub fn new(graph: &'a NodeGraph, catalog: &'a FixtureCatalog, config: &'a ResolverConfig) -> Self {
        Self {
            graph,
            catalog,
            config,
        }
    }

    /// Build the channel mapping
    pub fn resolve(&self) -> Result<ChannelMapping, ResolveError> {
        let mut entries: Vec<(NodeId, DmxAddress)> = Vec::new();
        let mut owners: HashMap<DmxAddress, NodeId> = HashMap::new();

        for instance in self.fixture_instances()? {
            let definition = self
                .catalog
                .load(&instance.fixture_key, &instance.manufacturer)
                .map_err(|source| ResolveError::FixtureNotFound {
                    node: instance.node_id.clone(),
                    source,
                })?;

            for (node_id, capability) in &instance.capabilities {
                let channel = resolve_index(capability, &definition, &instance.mode, instance.address)
                    .map_err(|source| ResolveError::ChannelIndex {
                        node: node_id.clone(),
                        source,
                    })?;
                let address = DmxAddress::new(instance.universe, channel);

                if let Some(other) = owners.insert(address, node_id.clone()) {
                    tracing::warn!("{} and {} share {}", other, node_id, address);
                }
                tracing::info!(
                    "Fixture: {}/{}, Mode: {}, Address: {}, Channel: {}, Index: {} -> {}",
                    instance.manufacturer,
                    instance.fixture_key,
                    instance.mode,
                    instance.address,
                    capability,
                    channel,
                    node_id
                );
                entries.push((node_id.clone(), address));
            }
        }

        let mapping: ChannelMapping = entries.into_iter().collect();
        tracing::info!(
            "Resolved {} variables across universes {:?}",
            mapping.len(),
            mapping.universes()
        );
        Ok(mapping)
    }

    /// Find and validate every fixture instance of the configured type
    pub fn fixture_instances(&self) -> Result<Vec<FixtureInstance>, ResolveError> {
        let fixture_type = self
            .graph
            .object_type_by_name(&self.config.fixture_type)
            .ok_or_else(|| ResolveError::ObjectTypeNotFound(self.config.fixture_type.clone()))?;

        let universe_type = match &self.config.universe_type {
            Some(name) => Some(
                self.graph
                    .object_type_by_name(name)
                    .ok_or_else(|| ResolveError::ObjectTypeNotFound(name.clone()))?,
            ),
            None => None,
        };

        // Objects with a modelling rule belong to the type definition itself
        let fixtures: Vec<&Node> = self
            .graph
            .nodes_with_reference(
                NodeClass::Object,
                &ReferenceType::HasTypeDefinition,
                fixture_type.node_id.as_str(),
            )
            .filter(|n| !n.has_reference_type(&ReferenceType::HasModellingRule))
            .collect();

        if fixtures.is_empty() {
            tracing::warn!("No instances of {} found", self.config.fixture_type);
        }

        fixtures
            .into_iter()
            .map(|fixture| self.fixture_instance(fixture, universe_type))
            .collect()
    }

    fn fixture_instance(
        &self,
        fixture: &Node,
        universe_type: Option<&Node>,
    ) -> Result<FixtureInstance, ResolveError> {
        let properties = self
            .graph
            .forward_targets(fixture, &ReferenceType::HasProperty)?;
        if properties.is_empty() {
            return Err(ResolveError::NoPropertiesFound(fixture.node_id.clone()));
        }

        let fixture_key = required_property(fixture, &properties, PROP_FIXTURE_KEY)?.as_text();
        let manufacturer = required_property(fixture, &properties, PROP_MANUFACTURER)?.as_text();
        let mode = required_property(fixture, &properties, PROP_MODE)?.as_text();
        let address = required_property(fixture, &properties, PROP_ADDRESS)?
            .as_i64()
            .ok_or_else(|| ResolveError::InvalidProperty {
                node: fixture.node_id.clone(),
                name: PROP_ADDRESS.to_string(),
                reason: "not an integer".to_string(),
            })?;

        let universe_node = self.universe_of(fixture, universe_type)?;
        let universe = self.universe_id(universe_node)?;
        let capabilities = self.capabilities_of(fixture)?;

        Ok(FixtureInstance {
            node_id: fixture.node_id.clone(),
            fixture_key,
            manufacturer,
            mode,
            address,
            universe,
            capabilities,
        })
    }

    fn parent_of(&self, node: &Node) -> Result<&'a Node, ResolveError> {
        let parent = node
            .parent
            .as_ref()
            .ok_or_else(|| ResolveError::BrokenContainment {
                node: node.node_id.clone(),
                reason: "no parent node".to_string(),
            })?;
        self.graph
            .get(parent.as_str())
            .ok_or_else(|| ResolveError::BrokenContainment {
                node: node.node_id.clone(),
                reason: format!("parent {} not found", parent),
            })
    }

    /// fixture -> folder -> universe
    fn universe_of(
        &self,
        fixture: &Node,
        universe_type: Option<&Node>,
    ) -> Result<&'a Node, ResolveError> {
        let folder = self.parent_of(fixture)?;
        let universe = self.parent_of(folder)?;

        if universe.class != NodeClass::Object {
            return Err(ResolveError::BrokenContainment {
                node: universe.node_id.clone(),
                reason: "universe grouping is not an object".to_string(),
            });
        }

        if let Some(universe_type) = universe_type {
            let typed = universe
                .forward_references(&ReferenceType::HasTypeDefinition)
                .any(|r| r.target == universe_type.node_id);
            if !typed {
                return Err(ResolveError::BrokenContainment {
                    node: universe.node_id.clone(),
                    reason: format!("not an instance of {}", universe_type.display_name),
                });
            }
        }

        Ok(universe)
    }

    fn universe_id(&self, universe: &Node) -> Result<u16, ResolveError> {
        let properties = self
            .graph
            .forward_targets(universe, &ReferenceType::HasProperty)?;

        let property = match properties.as_slice() {
            [] => return Err(ResolveError::UniverseIdNotFound(universe.node_id.clone())),
            [only] => only,
            _ => return Err(ResolveError::AmbiguousUniverseId(universe.node_id.clone())),
        };

        let invalid = |reason: &str| ResolveError::InvalidUniverseId {
            node: universe.node_id.clone(),
            reason: reason.to_string(),
        };

        let id = property
            .value
            .as_ref()
            .ok_or_else(|| invalid("no value"))?
            .as_i64()
            .ok_or_else(|| invalid("not an integer"))?;

        if !(0..=MAX_UNIVERSE_ID).contains(&id) {
            return Err(invalid("out of range"));
        }
        Ok(id as u16)
    }

    fn capabilities_of(&self, fixture: &Node) -> Result<Vec<(NodeId, String)>, ResolveError> {
        let components: Vec<&Node> = self
            .graph
            .forward_targets(fixture, &ReferenceType::HasComponent)?
            .into_iter()
            .filter(|n| n.class == NodeClass::Object)
            .collect();

        let capabilities = match components.as_slice() {
            [] => return Err(ResolveError::CapabilitiesNotFound(fixture.node_id.clone())),
            [only] => *only,
            _ => return Err(ResolveError::AmbiguousCapabilities(fixture.node_id.clone())),
        };

        Ok(self
            .graph
            .forward_targets(capabilities, &ReferenceType::HasComponent)?
            .into_iter()
            .filter(|n| n.class == NodeClass::Variable)
            .map(|n| (n.node_id.clone(), n.display_name.clone()))
            .collect())
    }
}

fn required_property<'g>(
    fixture: &Node,
    properties: &[&'g Node],
    name: &str,
) -> Result<&'g NodeValue, ResolveError> {
    properties
        .iter()
        .find(|p| p.display_name == name)
        .and_then(|p| p.value.as_ref())
        .filter(|v| v.is_truthy())
        .ok_or_else(|| ResolveError::MissingProperty {
            node: fixture.node_id.clone(),
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Reference;

    fn universe_with_fixture() -> Vec<Node> {
        use NodeClass::*;
        use ReferenceType::*;

        vec![
            Node::new("t1", "DMXLight", ObjectType),
            Node::new("t2", "Universe", ObjectType),
            Node::new("u0", "Universe0", Object)
                .with_reference(Reference::forward(HasTypeDefinition, "t2"))
                .with_reference(Reference::forward(HasProperty, "u0.id"))
                .with_reference(Reference::forward(Organizes, "f0")),
            Node::new("u0.id", "UniverseId", Variable)
                .with_parent("u0")
                .with_value(NodeValue::Int(2)),
            Node::new("f0", "Fixtures", Object).with_parent("u0"),
            Node::new("par", "Par", Object)
                .with_parent("f0")
                .with_reference(Reference::forward(HasTypeDefinition, "t1"))
                .with_reference(Reference::forward(HasProperty, "par.key"))
                .with_reference(Reference::forward(HasProperty, "par.mode"))
                .with_reference(Reference::forward(HasComponent, "par.caps"))
                .with_reference(Reference::inverse(HasComponent, "f0")),
            Node::new("par.key", "FixtureKey", Variable).with_value(NodeValue::Text("par64".into())),
            Node::new("par.mode", "Mode", Variable).with_value(NodeValue::Text("4ch".into())),
            Node::new("par.caps", "Capabilities", Object)
                .with_parent("par")
                .with_reference(Reference::forward(HasComponent, "par.red")),
            Node::new("par.red", "Red", Variable).with_parent("par.caps"),
        ]
    }

    fn resolver_for(nodes: Vec<Node>) -> (NodeGraph, FixtureCatalog) {
        (
            NodeGraph::from_nodes(nodes).unwrap(),
            FixtureCatalog::new("does-not-exist"),
        )
    }

    #[test]
    fn test_object_type_not_found() {
        let (graph, catalog) = resolver_for(universe_with_fixture());
        let config = ResolverConfig::new("MovingHead");
        let err = GraphResolver::new(&graph, &catalog, &config)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ResolveError::ObjectTypeNotFound(name) if name == "MovingHead"));
    }

    #[test]
    fn test_missing_property_is_fatal() {
        // Manufacturer and Address are not declared
        let (graph, catalog) = resolver_for(universe_with_fixture());
        let config = ResolverConfig::new("DMXLight");
        let err = GraphResolver::new(&graph, &catalog, &config)
            .fixture_instances()
            .unwrap_err();
        assert!(
            matches!(err, ResolveError::MissingProperty { ref name, .. } if name == PROP_MANUFACTURER)
        );
    }

    #[test]
    fn test_fixture_without_properties() {
        let mut nodes = universe_with_fixture();
        let par = nodes.iter_mut().find(|n| n.node_id.as_str() == "par").unwrap();
        par.references.retain(|r| r.reference_type != ReferenceType::HasProperty);

        let (graph, catalog) = resolver_for(nodes);
        let config = ResolverConfig::new("DMXLight");
        let err = GraphResolver::new(&graph, &catalog, &config)
            .fixture_instances()
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoPropertiesFound(_)));
    }

    #[test]
    fn test_required_property_rejects_falsy() {
        let fixture = Node::new("x", "X", NodeClass::Object);
        let empty = Node::new("p", "Mode", NodeClass::Variable).with_value(NodeValue::Text(String::new()));
        let props = vec![&empty];
        assert!(required_property(&fixture, &props, "Mode").is_err());
    }

    #[test]
    fn test_universe_id_must_be_single() {
        let mut nodes = universe_with_fixture();
        nodes.push(Node::new("u0.name", "Name", NodeClass::Variable));
        let u0 = nodes.iter_mut().find(|n| n.node_id.as_str() == "u0").unwrap();
        u0.references
            .push(Reference::forward(ReferenceType::HasProperty, "u0.name"));

        let (graph, catalog) = resolver_for(nodes);
        let config = ResolverConfig::new("DMXLight");
        let resolver = GraphResolver::new(&graph, &catalog, &config);
        let universe = graph.get("u0").unwrap();
        assert!(matches!(
            resolver.universe_id(universe),
            Err(ResolveError::AmbiguousUniverseId(_))
        ));
    }

    #[test]
    fn test_universe_type_checked() {
        let (graph, catalog) = resolver_for(universe_with_fixture());
        let config = ResolverConfig::new("DMXLight").with_universe_type("DMXLight");
        let resolver = GraphResolver::new(&graph, &catalog, &config);
        let fixture = graph.get("par").unwrap();
        let wrong_type = graph.get("t1");
        assert!(matches!(
            resolver.universe_of(fixture, wrong_type),
            Err(ResolveError::BrokenContainment { .. })
        ));
        let right_type = graph.get("t2");
        assert_eq!(
            resolver.universe_of(fixture, right_type).unwrap().node_id.as_str(),
            "u0"
        );
    }

    #[test]
    fn test_broken_containment() {
        let mut nodes = universe_with_fixture();
        let folder = nodes.iter_mut().find(|n| n.node_id.as_str() == "f0").unwrap();
        folder.parent = None;

        let (graph, catalog) = resolver_for(nodes);
        let config = ResolverConfig::new("DMXLight");
        let resolver = GraphResolver::new(&graph, &catalog, &config);
        let fixture = graph.get("par").unwrap();
        assert!(matches!(
            resolver.universe_of(fixture, None),
            Err(ResolveError::BrokenContainment { .. })
        ));
    }

    #[test]
    fn test_capabilities_of() {
        let (graph, catalog) = resolver_for(universe_with_fixture());
        let config = ResolverConfig::new("DMXLight");
        let resolver = GraphResolver::new(&graph, &catalog, &config);
        let fixture = graph.get("par").unwrap();
        assert_eq!(
            resolver.capabilities_of(fixture).unwrap(),
            vec![(NodeId::from("par.red"), "Red".to_string())]
        );
        assert_eq!(resolver.universe_id(graph.get("u0").unwrap()).unwrap(), 2);
    }

    #[test]
    fn test_capabilities_not_found() {
        // only a Variable hangs off the fixture through HasComponent
        let mut nodes = universe_with_fixture();
        let par = nodes.iter_mut().find(|n| n.node_id.as_str() == "par").unwrap();
        par.references.retain(|r| r.target.as_str() != "par.caps");
        par.references
            .push(Reference::forward(ReferenceType::HasComponent, "par.dimmer"));
        nodes.push(Node::new("par.dimmer", "Dimmer", NodeClass::Variable).with_parent("par"));

        let (graph, catalog) = resolver_for(nodes);
        let config = ResolverConfig::new("DMXLight");
        let resolver = GraphResolver::new(&graph, &catalog, &config);
        let fixture = graph.get("par").unwrap();
        assert!(matches!(
            resolver.capabilities_of(fixture),
            Err(ResolveError::CapabilitiesNotFound(id)) if id.as_str() == "par"
        ));
    }

    #[test]
    fn test_capabilities_must_be_single() {
        let mut nodes = universe_with_fixture();
        let par = nodes.iter_mut().find(|n| n.node_id.as_str() == "par").unwrap();
        par.references
            .push(Reference::forward(ReferenceType::HasComponent, "par.caps2"));
        nodes.push(Node::new("par.caps2", "Capabilities2", NodeClass::Object).with_parent("par"));

        let (graph, catalog) = resolver_for(nodes);
        let config = ResolverConfig::new("DMXLight");
        let resolver = GraphResolver::new(&graph, &catalog, &config);
        let fixture = graph.get("par").unwrap();
        assert!(matches!(
            resolver.capabilities_of(fixture),
            Err(ResolveError::AmbiguousCapabilities(id)) if id.as_str() == "par"
        ));
    }
}
