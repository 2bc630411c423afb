// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted shape of a node script.
//!
//! Field names follow the storage layer (`PascalCase`). Pins are stored by
//! position: the index among the node's standalone pins, or the index within
//! a named collection.

use crate::connection::Connection;
use crate::graph::ScriptGraph;
use crate::node::{Node, NodeId, PinLocation};
use crate::pin::{PinHandle, PinId};
use serde::{Deserialize, Serialize};

/// Current version of [`NodeScriptEntity`]
pub const SCRIPT_ENTITY_VERSION: u32 = 1;
/// Current version of [`NodeEntity`]
pub const NODE_ENTITY_VERSION: u32 = 1;

/// A persisted node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeEntity {
    /// Node ID
    pub id: NodeId,
    /// Registered type name
    pub type_name: String,
    /// Display name, when it differs from the type's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Editor position
    pub position_x: f64,
    /// Editor position
    pub position_y: f64,
    /// Node storage as a JSON document
    #[serde(default)]
    pub storage_json: Option<String>,
    /// Entity version
    pub version: u32,
}

/// Number of pins a node's collection had when saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PinCollectionEntity {
    /// Owning node
    pub node_id: NodeId,
    /// Collection name
    pub collection_name: String,
    /// Pin count
    pub count: usize,
}

/// A persisted connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionEntity {
    /// Node owning the output pin
    pub source_node_id: NodeId,
    /// Position of the output pin
    pub source_pin_id: usize,
    /// Collection of the output pin, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_collection: Option<String>,
    /// Node owning the input pin
    pub target_node_id: NodeId,
    /// Position of the input pin
    pub target_pin_id: usize,
    /// Collection of the input pin, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_collection: Option<String>,
}

impl ConnectionEntity {
    pub(crate) fn from_connection(graph: &ScriptGraph, connection: &Connection) -> Option<Self> {
        let (source_pin_id, source_collection) = pin_position(graph.node(connection.source.node)?, connection.source.pin)?;
        let (target_pin_id, target_collection) = pin_position(graph.node(connection.target.node)?, connection.target.pin)?;
        Some(Self {
            source_node_id: connection.source.node,
            source_pin_id,
            source_collection,
            target_node_id: connection.target.node,
            target_pin_id,
            target_collection,
        })
    }

    /// Find the pins this entity refers to in `graph`
    pub(crate) fn resolve(&self, graph: &ScriptGraph) -> Option<(PinHandle, PinHandle)> {
        Some((
            resolve_pin(graph, self.source_node_id, self.source_pin_id, self.source_collection.as_deref())?,
            resolve_pin(graph, self.target_node_id, self.target_pin_id, self.target_collection.as_deref())?,
        ))
    }
}

/// A persisted script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeScriptEntity {
    /// Script name
    pub name: String,
    /// Nodes, including the exit node
    pub nodes: Vec<NodeEntity>,
    /// Collection sizes
    #[serde(default)]
    pub pin_collections: Vec<PinCollectionEntity>,
    /// Connections
    pub connections: Vec<ConnectionEntity>,
    /// Entity version
    pub version: u32,
}

impl NodeScriptEntity {
    /// Snapshot a graph
    pub(crate) fn from_graph(name: &str, graph: &ScriptGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| NodeEntity {
                id: node.id,
                type_name: node.type_name.clone(),
                name: Some(node.name.clone()),
                position_x: f64::from(node.position[0]),
                position_y: f64::from(node.position[1]),
                storage_json: node.save_storage().map(|storage| storage.to_string()),
                version: NODE_ENTITY_VERSION,
            })
            .collect();
        let pin_collections = graph
            .nodes()
            .flat_map(|node| {
                node.pins().collections().iter().map(|collection| PinCollectionEntity {
                    node_id: node.id,
                    collection_name: collection.name.clone(),
                    count: collection.len(),
                })
            })
            .collect();
        let connections = graph
            .connections()
            .filter_map(|connection| ConnectionEntity::from_connection(graph, connection))
            .collect();
        Self {
            name: name.to_string(),
            nodes,
            pin_collections,
            connections,
            version: SCRIPT_ENTITY_VERSION,
        }
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn pin_position(node: &Node, pin: PinId) -> Option<(usize, Option<String>)> {
    match node.pins().locate(pin)? {
        PinLocation::Standalone(index) => Some((index, None)),
        PinLocation::Collection { collection, index } => {
            let name = node.pins().collections().get(collection)?.name.clone();
            Some((index, Some(name)))
        }
    }
}

fn resolve_pin(graph: &ScriptGraph, node: NodeId, index: usize, collection: Option<&str>) -> Option<PinHandle> {
    let pins = graph.node(node)?.pins();
    let pin = match collection {
        Some(name) => pins.collection_by_name(name)?.get(index)?,
        None => pins.pins().get(index)?,
    };
    Some(pin.handle())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pascal_case_fields() {
        let entity = ConnectionEntity {
            source_node_id: NodeId::new(),
            source_pin_id: 0,
            source_collection: None,
            target_node_id: NodeId::new(),
            target_pin_id: 2,
            target_collection: Some("Values".into()),
        };
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["TargetPinId"], json!(2));
        assert_eq!(value["TargetCollection"], json!("Values"));
        assert!(value.get("SourceCollection").is_none());
    }

    #[test]
    fn test_optional_fields_default() {
        let id = NodeId::new();
        let text = json!({
            "Name": "Layer brightness",
            "Nodes": [{
                "Id": id,
                "TypeName": "static_numeric",
                "PositionX": 1.0,
                "PositionY": 2.0,
                "Version": 1
            }],
            "Connections": [],
            "Version": 1
        })
        .to_string();
        let entity = NodeScriptEntity::from_json(&text).unwrap();
        assert!(entity.pin_collections.is_empty());
        assert_eq!(entity.nodes[0].id, id);
        assert_eq!(entity.nodes[0].storage_json, None);
        assert_eq!(entity.nodes[0].name, None);
    }
}
