//! Nodeset XML loader
//!
//! Parses a `UANodeSet` document into a [`NodeGraph`]. Only objects,
//! variables and object types are kept; all other node classes
//! (reference types, data types, methods, ...) are skipped.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node as XmlNode;
use thiserror::Error;

use crate::graph::{GraphError, Node, NodeClass, NodeGraph, NodeValue, Reference, ReferenceType};

/// Errors raised while loading a nodeset
#[derive(Error, Debug)]
pub enum NodesetError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Root element is <{0}>, expected <UANodeSet>")]
    UnexpectedRoot(String),

    #[error("Missing attribute {attr} on <{tag}>")]
    MissingAttribute { tag: String, attr: String },

    #[error("Invalid value for {node}: {reason}")]
    InvalidValue { node: String, reason: String },

    #[error("No nodeset (*.xml) found in {0:?}")]
    NoNodeset(PathBuf),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// List the nodeset files of a model directory, sorted by file name
pub fn find_nodeset_files(dir: &Path) -> Result<Vec<PathBuf>, NodesetError> {
    let entries = fs::read_dir(dir).map_err(|source| NodesetError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "xml"))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(NodesetError::NoNodeset(dir.to_path_buf()));
    }
    Ok(files)
}

/// Read and parse a nodeset file
pub fn load_nodeset(path: &Path) -> Result<NodeGraph, NodesetError> {
    let xml = fs::read_to_string(path).map_err(|source| NodesetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let graph = parse_nodeset(&xml)?;
    tracing::info!("Loaded {} nodes from {:?}", graph.len(), path);
    Ok(graph)
}

/// Parse a nodeset document
pub fn parse_nodeset(xml: &str) -> Result<NodeGraph, NodesetError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "UANodeSet" {
        return Err(NodesetError::UnexpectedRoot(
            root.tag_name().name().to_string(),
        ));
    }

    let aliases = parse_aliases(&root);
    let mut nodes = Vec::new();

    for element in root.children().filter(|n| n.is_element()) {
        let class = match element.tag_name().name() {
            "UAObject" => NodeClass::Object,
            "UAVariable" => NodeClass::Variable,
            "UAObjectType" => NodeClass::ObjectType,
            _ => continue,
        };
        nodes.push(parse_node(&element, class, &aliases)?);
    }

    Ok(NodeGraph::from_nodes(nodes)?)
}

fn parse_aliases(root: &XmlNode) -> HashMap<String, String> {
    root.children()
        .filter(|n| n.has_tag_name("Aliases"))
        .flat_map(|aliases| aliases.children().filter(|n| n.has_tag_name("Alias")))
        .filter_map(|alias| {
            let name = alias.attribute("Alias")?;
            let target = alias.text()?.trim();
            Some((name.to_string(), target.to_string()))
        })
        .collect()
}

fn required_attribute<'a>(element: &XmlNode<'a, '_>, attr: &str) -> Result<&'a str, NodesetError> {
    element
        .attribute(attr)
        .ok_or_else(|| NodesetError::MissingAttribute {
            tag: element.tag_name().name().to_string(),
            attr: attr.to_string(),
        })
}

fn child_text<'a>(element: &XmlNode<'a, '_>, tag: &str) -> Option<&'a str> {
    element
        .children()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(str::trim)
}

fn parse_node(
    element: &XmlNode,
    class: NodeClass,
    aliases: &HashMap<String, String>,
) -> Result<Node, NodesetError> {
    let node_id = required_attribute(element, "NodeId")?;

    // BrowseName carries a namespace prefix ("1:Par"), DisplayName does not
    let display_name = match child_text(element, "DisplayName") {
        Some(name) => name.to_string(),
        None => {
            let browse_name = required_attribute(element, "BrowseName")?;
            browse_name
                .split_once(':')
                .map(|(_, name)| name)
                .unwrap_or(browse_name)
                .to_string()
        }
    };

    let mut node = Node::new(node_id, display_name, class);
    node.parent = element.attribute("ParentNodeId").map(Into::into);

    if let Some(references) = element.children().find(|n| n.has_tag_name("References")) {
        for reference in references.children().filter(|n| n.has_tag_name("Reference")) {
            node.references.push(parse_reference(&reference, aliases)?);
        }
    }

    if class == NodeClass::Variable {
        if let Some(value) = element.children().find(|n| n.has_tag_name("Value")) {
            node.value = parse_value(node_id, &value)?;
        }
    }

    Ok(node)
}

fn parse_reference(
    reference: &XmlNode,
    aliases: &HashMap<String, String>,
) -> Result<Reference, NodesetError> {
    let type_name = required_attribute(reference, "ReferenceType")?;
    let reference_type = match ReferenceType::parse(type_name) {
        ReferenceType::Other(name) => match aliases.get(&name) {
            Some(target) => ReferenceType::parse(target),
            None => ReferenceType::Other(name),
        },
        known => known,
    };

    let is_forward = reference
        .attribute("IsForward")
        .map(|v| !v.eq_ignore_ascii_case("false"))
        .unwrap_or(true);

    let target = reference.text().map(str::trim).unwrap_or_default();

    Ok(Reference {
        reference_type,
        target: target.into(),
        is_forward,
    })
}

fn parse_value(node_id: &str, value: &XmlNode) -> Result<Option<NodeValue>, NodesetError> {
    let Some(inner) = value.children().find(|n| n.is_element()) else {
        return Ok(None);
    };
    let text = inner.text().map(str::trim).unwrap_or_default();
    let invalid = |reason: String| NodesetError::InvalidValue {
        node: node_id.to_string(),
        reason,
    };

    let parsed = match inner.tag_name().name() {
        "String" => NodeValue::Text(text.to_string()),
        "LocalizedText" => NodeValue::Text(child_text(&inner, "Text").unwrap_or_default().to_string()),
        "Boolean" => NodeValue::Bool(text.eq_ignore_ascii_case("true") || text == "1"),
        "SByte" | "Byte" | "Int16" | "UInt16" | "Int32" | "UInt32" | "Int64" | "UInt64" => {
            NodeValue::Int(
                text.parse()
                    .map_err(|e| invalid(format!("{:?} is not an integer: {}", text, e)))?,
            )
        }
        "Float" | "Double" => NodeValue::Float(
            text.parse()
                .map_err(|e| invalid(format!("{:?} is not a number: {}", text, e)))?,
        ),
        other => {
            tracing::debug!("Ignoring value of unsupported type {} on {}", other, node_id);
            return Ok(None);
        }
    };
    Ok(Some(parsed))
}
