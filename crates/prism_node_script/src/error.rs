// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for node scripts.

use crate::collection::CollectionId;
use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::pin::{PinDirection, PinHandle, PinType};
use thiserror::Error;

/// A structural mutation was rejected; the graph is left unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// A node with this ID already exists
    #[error("Duplicate node: {0:?}")]
    DuplicateNode(NodeId),

    /// No factory is registered for the node type
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Pin not found
    #[error("Pin not found: {0:?}")]
    PinNotFound(PinHandle),

    /// Collection not found
    #[error("Pin collection not found: {0:?}")]
    CollectionNotFound(CollectionId),

    /// Connection not found
    #[error("Connection not found: {0:?}")]
    ConnectionNotFound(ConnectionId),

    /// A pin had the wrong direction for the operation
    #[error("Pin {pin:?} must be an {expected:?} pin")]
    DirectionMismatch {
        /// Offending pin
        pin: PinHandle,
        /// Direction the operation needs
        expected: PinDirection,
    },

    /// The pin types are neither identical nor numeric-coercible
    #[error("Cannot connect {output} output to {input} input")]
    TypeMismatch {
        /// Type of the output pin
        output: PinType,
        /// Type of the input pin
        input: PinType,
    },

    /// A value does not fit the pin it was assigned to
    #[error("Value does not fit {expected} pin {pin:?}")]
    ValueMismatch {
        /// Target pin
        pin: PinHandle,
        /// Type of the pin
        expected: PinType,
    },

    /// The input pin already has a connection
    #[error("Input pin already connected: {0:?}")]
    CapacityExceeded(PinHandle),

    /// The exact connection already exists
    #[error("Pins are already connected: {0:?}")]
    DuplicateConnection(ConnectionId),

    /// The connection would close a cycle
    #[error("Connecting {from:?} to {to:?} would create a cycle")]
    WouldCreateCycle {
        /// Node owning the output pin
        from: NodeId,
        /// Node owning the input pin
        to: NodeId,
    },

    /// The exit node belongs to the script and cannot be removed
    #[error("The exit node cannot be removed")]
    ExitNodeProtected,

    /// The node rejected its new storage
    #[error("Invalid storage for node {node:?}: {message}")]
    InvalidStorage {
        /// Target node
        node: NodeId,
        /// Reason given by the node
        message: String,
    },
}

/// Failure raised by a node while initializing, evaluating or loading storage
#[derive(Debug, Error)]
pub enum NodeError {
    /// Evaluation failed
    #[error("{0}")]
    Evaluation(String),

    /// A required input has no usable value
    #[error("Input '{0}' has no usable value")]
    MissingInput(String),

    /// Storage could not be (de)serialized
    #[error("Storage error: {0}")]
    Storage(#[from] serde_json::Error),

    /// External binding failed
    #[error("Binding error: {0}")]
    Binding(String),

    /// The node panicked
    #[error("Node panicked: {0}")]
    Panicked(String),
}

/// Errors while restoring a script from persisted entities
#[derive(Debug, Error)]
pub enum LoadError {
    /// The entity was written by a newer format version
    #[error("Unsupported script version {found} (supported up to {supported})")]
    UnsupportedVersion {
        /// Version found in the entity
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },

    /// A node type is not registered
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Node storage could not be restored
    #[error("Node {node:?} storage: {source}")]
    Storage {
        /// Node being restored
        node: NodeId,
        /// Underlying error
        #[source]
        source: NodeError,
    },

    /// A structural operation failed while rebuilding the graph
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// JSON could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors loading runtime configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Result type for structural mutations
pub type StructureResult<T> = Result<T, StructureError>;
