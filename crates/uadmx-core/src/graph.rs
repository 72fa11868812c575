//! Node graph model
//!
//! An immutable, typed view of an OPC UA style address space: objects,
//! variables and object types connected by typed, directed references.
//! The graph is built once (usually by [`crate::nodeset`]) and only read
//! afterwards.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Opaque node identifier, e.g. `ns=1;i=2024`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Numeric node id inside the given namespace (`ns=<ns>;i=<id>`)
    pub fn numeric(namespace: u16, id: &str) -> Self {
        Self(format!("ns={};i={}", namespace, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of a node in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    Object,
    Variable,
    ObjectType,
}

/// Reference type tag of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    /// Links an instance to its object type
    HasTypeDefinition,
    /// Parent-to-child ownership
    HasComponent,
    /// Declared attributes (fixture configuration, universe id)
    HasProperty,
    /// Marks template members of a type definition
    HasModellingRule,
    /// Folder organization
    Organizes,
    /// Any other reference type, kept verbatim
    Other(String),
}

impl ReferenceType {
    /// Resolve a reference type from its browse name or well-known numeric id
    pub fn parse(name: &str) -> Self {
        match name {
            "HasTypeDefinition" | "i=40" => Self::HasTypeDefinition,
            "HasComponent" | "i=47" => Self::HasComponent,
            "HasProperty" | "i=46" => Self::HasProperty,
            "HasModellingRule" | "i=37" => Self::HasModellingRule,
            "Organizes" | "i=35" => Self::Organizes,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A directed, typed edge to another node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub reference_type: ReferenceType,
    pub target: NodeId,
    pub is_forward: bool,
}

impl Reference {
    /// Forward reference of the given type
    pub fn forward(reference_type: ReferenceType, target: impl Into<NodeId>) -> Self {
        Self {
            reference_type,
            target: target.into(),
            is_forward: true,
        }
    }

    /// Inverse (non-owning back-link) reference of the given type
    pub fn inverse(reference_type: ReferenceType, target: impl Into<NodeId>) -> Self {
        Self {
            reference_type,
            target: target.into(),
            is_forward: false,
        }
    }
}

/// Value held by a variable node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl NodeValue {
    /// JavaScript-like truthiness: empty text, zero and false are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            NodeValue::Text(s) => !s.is_empty(),
            NodeValue::Int(i) => *i != 0,
            NodeValue::Float(f) => *f != 0.0 && !f.is_nan(),
            NodeValue::Bool(b) => *b,
        }
    }

    /// Textual form of the value
    pub fn as_text(&self) -> String {
        match self {
            NodeValue::Text(s) => s.clone(),
            NodeValue::Int(i) => i.to_string(),
            NodeValue::Float(f) => f.to_string(),
            NodeValue::Bool(b) => b.to_string(),
        }
    }

    /// Integer form of the value, if it has one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NodeValue::Int(i) => Some(*i),
            NodeValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            NodeValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A node of the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub display_name: String,
    pub class: NodeClass,
    pub references: Vec<Reference>,
    pub parent: Option<NodeId>,
    pub value: Option<NodeValue>,
}

impl Node {
    /// Create a node without references, parent or value
    pub fn new(node_id: impl Into<NodeId>, display_name: impl Into<String>, class: NodeClass) -> Self {
        Self {
            node_id: node_id.into(),
            display_name: display_name.into(),
            class,
            references: Vec::new(),
            parent: None,
            value: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_value(mut self, value: NodeValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Does this node carry an outgoing reference of the given type?
    pub fn has_reference_type(&self, reference_type: &ReferenceType) -> bool {
        self.references
            .iter()
            .any(|r| &r.reference_type == reference_type)
    }

    /// Forward references of the given type, in document order
    pub fn forward_references<'a>(
        &'a self,
        reference_type: &'a ReferenceType,
    ) -> impl Iterator<Item = &'a Reference> + 'a {
        self.references
            .iter()
            .filter(move |r| r.is_forward && &r.reference_type == reference_type)
    }
}

/// Errors raised while building or walking the graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Node {source_node} references unknown node {target}")]
    DanglingReference { source_node: NodeId, target: NodeId },
}

/// Immutable typed node graph keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    nodes: HashMap<NodeId, Node>,
    // Document order, so enumeration is deterministic
    order: Vec<NodeId>,
}

impl NodeGraph {
    /// Build a graph from nodes, rejecting duplicate identifiers
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self, GraphError> {
        let mut graph = Self::default();
        for node in nodes {
            if graph.nodes.contains_key(&node.node_id) {
                return Err(GraphError::DuplicateNode(node.node_id));
            }
            graph.order.push(node.node_id.clone());
            graph.nodes.insert(node.node_id.clone(), node);
        }
        Ok(graph)
    }

    /// Find a node by identifier
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in document order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// All nodes of one class in document order
    pub fn nodes_of_class(&self, class: NodeClass) -> impl Iterator<Item = &Node> {
        self.nodes().filter(move |n| n.class == class)
    }

    /// Nodes of `class` carrying an outgoing reference of `reference_type` to `target`
    pub fn nodes_with_reference<'a>(
        &'a self,
        class: NodeClass,
        reference_type: &'a ReferenceType,
        target: &'a str,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes_of_class(class).filter(move |n| {
            n.references
                .iter()
                .any(|r| &r.reference_type == reference_type && r.target.as_str() == target)
        })
    }

    /// References of a node, empty if the node is unknown
    pub fn references_of(&self, id: &str) -> &[Reference] {
        self.nodes
            .get(id)
            .map(|n| n.references.as_slice())
            .unwrap_or(&[])
    }

    /// Object type with the given display name
    pub fn object_type_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes_of_class(NodeClass::ObjectType)
            .find(|n| n.display_name == name)
    }

    /// Forward targets of one reference type, resolved to nodes.
    ///
    /// A reference to an id that is not part of the graph is an error.
    pub fn forward_targets(
        &self,
        node: &Node,
        reference_type: &ReferenceType,
    ) -> Result<Vec<&Node>, GraphError> {
        node.forward_references(reference_type)
            .map(|r| {
                self.nodes
                    .get(&r.target)
                    .ok_or_else(|| GraphError::DanglingReference {
                        source_node: node.node_id.clone(),
                        target: r.target.clone(),
                    })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> NodeGraph {
        NodeGraph::from_nodes(vec![
            Node::new("ns=1;i=1", "DMXLight", NodeClass::ObjectType),
            Node::new("ns=1;i=10", "Par", NodeClass::Object)
                .with_reference(Reference::forward(ReferenceType::HasTypeDefinition, "ns=1;i=1"))
                .with_reference(Reference::forward(ReferenceType::HasProperty, "ns=1;i=11"))
                .with_reference(Reference::inverse(ReferenceType::HasProperty, "ns=1;i=12")),
            Node::new("ns=1;i=11", "Mode", NodeClass::Variable)
                .with_value(NodeValue::Text("4ch".into())),
            Node::new("ns=1;i=12", "Other", NodeClass::Variable),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let result = NodeGraph::from_nodes(vec![
            Node::new("a", "A", NodeClass::Object),
            Node::new("a", "B", NodeClass::Object),
        ]);
        assert_eq!(result.unwrap_err(), GraphError::DuplicateNode("a".into()));
    }

    #[test]
    fn test_lookup_and_references() {
        let graph = sample_graph();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.get("ns=1;i=10").unwrap().display_name, "Par");
        assert_eq!(graph.references_of("ns=1;i=10").len(), 3);
        assert!(graph.references_of("missing").is_empty());
    }

    #[test]
    fn test_nodes_with_reference() {
        let graph = sample_graph();
        let found: Vec<_> = graph
            .nodes_with_reference(NodeClass::Object, &ReferenceType::HasTypeDefinition, "ns=1;i=1")
            .map(|n| n.node_id.as_str())
            .collect();
        assert_eq!(found, vec!["ns=1;i=10"]);
    }

    #[test]
    fn test_forward_targets_skip_inverse() {
        let graph = sample_graph();
        let node = graph.get("ns=1;i=10").unwrap();
        let props = graph
            .forward_targets(node, &ReferenceType::HasProperty)
            .unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].display_name, "Mode");
    }

    #[test]
    fn test_forward_targets_dangling() {
        let graph = NodeGraph::from_nodes(vec![Node::new("a", "A", NodeClass::Object)
            .with_reference(Reference::forward(ReferenceType::HasComponent, "b"))])
        .unwrap();
        let node = graph.get("a").unwrap();
        assert!(matches!(
            graph.forward_targets(node, &ReferenceType::HasComponent),
            Err(GraphError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_reference_type_parse() {
        assert_eq!(ReferenceType::parse("i=47"), ReferenceType::HasComponent);
        assert_eq!(ReferenceType::parse("HasProperty"), ReferenceType::HasProperty);
        assert_eq!(
            ReferenceType::parse("GeneratesEvent"),
            ReferenceType::Other("GeneratesEvent".into())
        );
    }

    #[test]
    fn test_value_truthiness() {
        assert!(!NodeValue::Text(String::new()).is_truthy());
        assert!(!NodeValue::Int(0).is_truthy());
        assert!(NodeValue::Int(1).is_truthy());
        assert_eq!(NodeValue::Text(" 12 ".into()).as_i64(), Some(12));
        assert_eq!(NodeValue::Float(3.5).as_i64(), None);
    }
}
