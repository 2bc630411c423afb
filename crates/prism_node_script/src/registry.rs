// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node type registry.
//!
//! Maps persisted type names to factories, so scripts can be restored and
//! editors can list what is available.

use crate::node::{Node, NodeBehavior, NodeEditor, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Declares a node's pins and returns its behavior
pub type NodeFactory = Arc<dyn Fn(&mut NodeEditor<'_>) -> Box<dyn NodeBehavior> + Send + Sync>;

/// Node category for organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Constant values
    Static,
    /// Math operations
    Math,
    /// Time-based transitions
    Transition,
    /// Bindings to the data model
    DataModel,
    /// Script result
    Output,
    /// Custom/user-defined
    Custom,
}

/// Node type definition
#[derive(Clone)]
pub struct NodeDescriptor {
    /// Unique type identifier, as persisted
    pub type_name: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Creates the pins and behavior of an instance
    pub factory: NodeFactory,
}

impl NodeDescriptor {
    /// Create a descriptor
    pub fn new<F>(type_name: impl Into<String>, name: impl Into<String>, category: NodeCategory, factory: F) -> Self
    where
        F: Fn(&mut NodeEditor<'_>) -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            category,
            description: String::new(),
            factory: Arc::new(factory),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Create an instance with the given ID
    pub fn instantiate(&self, id: NodeId) -> Node {
        let factory = &self.factory;
        Node::new(id, self.type_name.clone(), self.name.clone(), |editor| factory(editor))
            .with_description(self.description.clone())
    }
}

impl fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Registry of node types
#[derive(Debug, Default, Clone)]
pub struct NodeRegistry {
    types: indexmap::IndexMap<String, NodeDescriptor>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing any previous one with the same name
    pub fn register(&mut self, descriptor: NodeDescriptor) {
        if self.types.contains_key(&descriptor.type_name) {
            tracing::warn!(node_type = %descriptor.type_name, "replacing registered node type");
        }
        self.types.insert(descriptor.type_name.clone(), descriptor);
    }

    /// Get a node type by name
    pub fn get(&self, type_name: &str) -> Option<&NodeDescriptor> {
        self.types.get(type_name)
    }

    /// Get all registered types
    pub fn descriptors(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.types.values()
    }

    /// Get types by category
    pub fn in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeDescriptor> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node with a fresh ID
    pub fn create(&self, type_name: &str) -> Option<Node> {
        self.create_with_id(type_name, NodeId::new())
    }

    /// Create a node with a known ID, as when restoring a script
    pub fn create_with_id(&self, type_name: &str, id: NodeId) -> Option<Node> {
        self.get(type_name).map(|descriptor| descriptor.instantiate(id))
    }
}
