// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the scripting runtime.
//!
//! A [`Node`] couples the pins it owns with a [`NodeBehavior`]: the
//! type-specific logic supplied by a registered factory. Behaviors never see
//! the rest of the graph. They read and stage values through a
//! [`NodeIo`](crate::evaluation::NodeIo) during evaluation and reshape their
//! own pins through a [`NodeEditor`] during structural callbacks.

use crate::collection::{CollectionId, PinCollection};
use crate::connection::ConnectionId;
use crate::error::NodeError;
use crate::evaluation::{EvaluationContext, NodeIo};
use crate::events::PinEvent;
use crate::pin::{Pin, PinDirection, PinHandle, PinId, PinType};
use crate::value::PinValue;
use prism_data_model::DataModelRegistry;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// External services available to nodes while initializing and refreshing
#[derive(Debug, Clone, Default)]
pub struct ScriptEnvironment {
    /// Data models nodes may bind to
    pub data_models: Arc<DataModelRegistry>,
}

impl ScriptEnvironment {
    /// Create an environment around a data model registry
    pub fn new(data_models: Arc<DataModelRegistry>) -> Self {
        Self { data_models }
    }
}

/// Upcast helper so behaviors can be downcast for inspection
pub trait AsAny: Any {
    /// Borrow as `Any`
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as `Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Type-specific logic of a node.
///
/// Lifecycle: the factory declares pins, storage is loaded, `initialize` runs
/// exactly once, then `refresh` and `evaluate` run every pass until
/// `dispose`.
pub trait NodeBehavior: AsAny + Send {
    /// Acquire external resources (e.g. resolve a data model path)
    fn initialize(&mut self, _editor: &mut NodeEditor<'_>, _env: &ScriptEnvironment) -> Result<(), NodeError> {
        Ok(())
    }

    /// Poll external state that may reshape the node's pins.
    ///
    /// Runs before every evaluation pass and after storage changes.
    fn refresh(&mut self, _editor: &mut NodeEditor<'_>, _env: &ScriptEnvironment) {}

    /// Compute outputs from inputs. Must not touch graph structure.
    fn evaluate(&mut self, io: &mut NodeIo<'_>) -> Result<(), NodeError>;

    /// React to a pin of this node being connected, disconnected, added or removed
    fn on_pin_event(&mut self, _event: &PinEvent, _editor: &mut NodeEditor<'_>) {}

    /// Persisted configuration
    fn save_storage(&self) -> Option<serde_json::Value> {
        None
    }

    /// Restore persisted configuration
    fn load_storage(&mut self, _storage: serde_json::Value) -> Result<(), NodeError> {
        Ok(())
    }

    /// Release external subscriptions
    fn dispose(&mut self) {}
}

/// Health of a node
#[derive(Debug, Clone, Default)]
pub enum NodeStatus {
    /// Evaluating normally
    #[default]
    Ok,
    /// The last evaluation failed; outputs hold their last good values
    Broken {
        /// Human-readable reason
        reason: String,
        /// The error that broke the node
        error: Arc<NodeError>,
    },
}

impl NodeStatus {
    /// Whether the node is broken
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken { .. })
    }
}

/// Position of a pin inside its node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLocation {
    /// Standalone pin at this index
    Standalone(usize),
    /// Member `index` of collection number `collection`
    Collection {
        /// Collection index within the node
        collection: usize,
        /// Pin index within the collection
        index: usize,
    },
}

/// All pins owned by a node
#[derive(Debug, Clone, Default)]
pub struct PinSet {
    pins: Vec<Pin>,
    collections: Vec<PinCollection>,
}

impl PinSet {
    /// Standalone pins in declaration order
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Pin collections in declaration order
    pub fn collections(&self) -> &[PinCollection] {
        &self.collections
    }

    /// Every pin, standalone first, then collection members
    pub fn all(&self) -> impl Iterator<Item = &Pin> {
        self.pins
            .iter()
            .chain(self.collections.iter().flat_map(|c| c.pins().iter()))
    }

    /// Find a pin by ID
    pub fn find(&self, id: PinId) -> Option<&Pin> {
        self.all().find(|p| p.id == id)
    }

    /// Find a standalone pin by name
    pub fn find_by_name(&self, name: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.name == name)
    }

    /// Find a collection by ID
    pub fn collection(&self, id: CollectionId) -> Option<&PinCollection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// Find a collection by name
    pub fn collection_by_name(&self, name: &str) -> Option<&PinCollection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Locate a pin by ID
    pub fn locate(&self, id: PinId) -> Option<PinLocation> {
        if let Some(index) = self.pins.iter().position(|p| p.id == id) {
            return Some(PinLocation::Standalone(index));
        }
        self.collections.iter().enumerate().find_map(|(collection, c)| {
            c.position(id)
                .map(|index| PinLocation::Collection { collection, index })
        })
    }

    /// Pin at a location
    pub fn at(&self, location: PinLocation) -> Option<&Pin> {
        match location {
            PinLocation::Standalone(index) => self.pins.get(index),
            PinLocation::Collection { collection, index } => self.collections.get(collection)?.get(index),
        }
    }

    pub(crate) fn find_mut(&mut self, id: PinId) -> Option<&mut Pin> {
        if let Some(pin) = self.pins.iter_mut().find(|p| p.id == id) {
            return Some(pin);
        }
        self.collections.iter_mut().find_map(|c| c.pin_mut(id))
    }

    pub(crate) fn collection_mut(&mut self, id: CollectionId) -> Option<&mut PinCollection> {
        self.collections.iter_mut().find(|c| c.id == id)
    }
}

/// A pin that left the node, with the connections that must go with it
#[derive(Debug, Clone)]
pub(crate) struct RemovedPin {
    pub pin: PinId,
    pub collection: Option<CollectionId>,
    pub connections: Vec<ConnectionId>,
}

/// A pin replaced in place; its connections should follow the new pin
#[derive(Debug, Clone)]
pub(crate) struct PinRemap {
    pub old: PinId,
    pub new: PinId,
    pub connections: Vec<ConnectionId>,
}

/// Structural changes recorded by a [`NodeEditor`], applied by the graph afterwards
#[derive(Debug, Default)]
pub(crate) struct EditLog {
    pub added: Vec<(PinId, Option<CollectionId>)>,
    pub removed: Vec<RemovedPin>,
    pub remaps: Vec<PinRemap>,
    pub retyped: Vec<PinId>,
}

impl EditLog {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.remaps.is_empty() && self.retyped.is_empty()
    }
}

/// Mutable view of one node's pins.
///
/// Changes apply to the node immediately; the owning script then drops or
/// re-attaches connections that no longer fit and fires pin events.
pub struct NodeEditor<'a> {
    node: NodeId,
    pins: &'a mut PinSet,
    log: &'a mut EditLog,
}

impl<'a> NodeEditor<'a> {
    pub(crate) fn new(node: NodeId, pins: &'a mut PinSet, log: &'a mut EditLog) -> Self {
        Self { node, pins, log }
    }

    /// The node being edited
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Read access to the node's pins
    pub fn pins(&self) -> &PinSet {
        self.pins
    }

    /// Find a pin by ID
    pub fn pin(&self, id: PinId) -> Option<&Pin> {
        self.pins.find(id)
    }

    /// Find a collection by ID
    pub fn collection(&self, id: CollectionId) -> Option<&PinCollection> {
        self.pins.collection(id)
    }

    /// Create a standalone input pin
    pub fn add_input(&mut self, name: impl Into<String>, pin_type: PinType) -> PinId {
        self.add_pin(name.into(), PinDirection::Input, pin_type)
    }

    /// Create a standalone output pin
    pub fn add_output(&mut self, name: impl Into<String>, pin_type: PinType) -> PinId {
        self.add_pin(name.into(), PinDirection::Output, pin_type)
    }

    /// Create an input pin holding `value` until something is connected
    pub fn add_input_with_value(&mut self, name: impl Into<String>, pin_type: PinType, value: PinValue) -> PinId {
        let id = self.add_input(name, pin_type);
        if let Some(pin) = self.pins.find_mut(id) {
            if value.fits(pin.pin_type()) {
                pin.set_value(value);
            }
        }
        id
    }

    fn add_pin(&mut self, name: String, direction: PinDirection, pin_type: PinType) -> PinId {
        let pin = Pin::new(self.node, name, direction, pin_type);
        let id = pin.id;
        self.pins.pins.push(pin);
        self.log.added.push((id, None));
        id
    }

    /// Create a collection with `count` initial pins
    pub fn add_collection(
        &mut self,
        name: impl Into<String>,
        direction: PinDirection,
        pin_type: PinType,
        count: usize,
    ) -> CollectionId {
        let collection = PinCollection::new(self.node, name, direction, pin_type);
        let id = collection.id;
        self.pins.collections.push(collection);
        for _ in 0..count {
            self.add_collection_pin(id);
        }
        id
    }

    /// Append a pin to a collection
    pub fn add_collection_pin(&mut self, collection: CollectionId) -> Option<PinId> {
        let pin = self.pins.collection_mut(collection)?.add_pin();
        self.log.added.push((pin, Some(collection)));
        Some(pin)
    }

    /// Remove a pin from a collection; its connections are dropped
    pub fn remove_collection_pin(&mut self, collection: CollectionId, pin: PinId) -> bool {
        let Some(removed) = self
            .pins
            .collection_mut(collection)
            .and_then(|c| c.remove_pin(pin))
        else {
            return false;
        };
        self.log.removed.push(RemovedPin {
            pin,
            collection: Some(collection),
            connections: removed.connections().collect(),
        });
        true
    }

    /// Remove a standalone pin; its connections are dropped
    pub fn remove_pin(&mut self, pin: PinId) -> bool {
        let Some(index) = self.pins.pins.iter().position(|p| p.id == pin) else {
            return false;
        };
        let removed = self.pins.pins.remove(index);
        self.log.removed.push(RemovedPin {
            pin,
            collection: None,
            connections: removed.connections().collect(),
        });
        true
    }

    /// Replace a standalone pin with a fresh one of `pin_type` at the same
    /// position. Existing connections are re-attached where they still fit.
    pub fn replace_pin(&mut self, pin: PinId, pin_type: PinType) -> Option<PinId> {
        let index = self.pins.pins.iter().position(|p| p.id == pin)?;
        let old = &self.pins.pins[index];
        let replacement = Pin::new(self.node, old.name.clone(), old.direction, pin_type);
        let new = replacement.id;
        let old = std::mem::replace(&mut self.pins.pins[index], replacement);
        self.log.remaps.push(PinRemap {
            old: pin,
            new,
            connections: old.connections().collect(),
        });
        Some(new)
    }

    /// Retype a standalone pin
    pub fn set_pin_type(&mut self, pin: PinId, pin_type: PinType) -> bool {
        let Some(target) = self.pins.pins.iter_mut().find(|p| p.id == pin) else {
            return false;
        };
        if target.pin_type() != &pin_type {
            target.set_type(pin_type);
            self.log.retyped.push(pin);
        }
        true
    }

    /// Retype a collection and all of its members
    pub fn set_collection_type(&mut self, collection: CollectionId, pin_type: PinType) -> bool {
        let Some(target) = self.pins.collection_mut(collection) else {
            return false;
        };
        if target.pin_type() != &pin_type {
            target.set_type(pin_type);
            self.log.retyped.extend(target.pins().iter().map(|p| p.id));
        }
        true
    }
}

/// A node instance in a script
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Registered type name
    pub type_name: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Position in the editor
    pub position: [f32; 2],
    pins: PinSet,
    status: NodeStatus,
    behavior: Box<dyn NodeBehavior>,
    initialized: bool,
    disposed: bool,
    exit: bool,
}

impl Node {
    /// Build a node by running `factory` against a fresh pin set
    pub fn new<F>(id: NodeId, type_name: impl Into<String>, name: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce(&mut NodeEditor<'_>) -> Box<dyn NodeBehavior>,
    {
        let mut pins = PinSet::default();
        let mut log = EditLog::default();
        let behavior = factory(&mut NodeEditor::new(id, &mut pins, &mut log));
        Self {
            id,
            type_name: type_name.into(),
            name: name.into(),
            description: String::new(),
            position: [0.0, 0.0],
            pins,
            status: NodeStatus::Ok,
            behavior,
            initialized: false,
            disposed: false,
            exit: false,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    pub(crate) fn into_exit(mut self) -> Self {
        self.exit = true;
        self
    }

    /// The node's pins
    pub fn pins(&self) -> &PinSet {
        &self.pins
    }

    /// Handle of a standalone pin, looked up by name
    pub fn pin_handle(&self, name: &str) -> Option<PinHandle> {
        self.pins.find_by_name(name).map(Pin::handle)
    }

    /// Current status
    pub fn status(&self) -> &NodeStatus {
        &self.status
    }

    /// Whether the node is broken
    pub fn is_broken(&self) -> bool {
        self.status.is_broken()
    }

    /// Whether this is the script's exit node
    pub fn is_exit(&self) -> bool {
        self.exit
    }

    /// Whether `initialize` already ran
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Downcast the behavior for inspection
    pub fn behavior<T: NodeBehavior>(&self) -> Option<&T> {
        AsAny::as_any(&*self.behavior).downcast_ref::<T>()
    }

    /// Mutably downcast the behavior
    pub fn behavior_mut<T: NodeBehavior>(&mut self) -> Option<&mut T> {
        AsAny::as_any_mut(&mut *self.behavior).downcast_mut::<T>()
    }

    /// Persisted configuration of the behavior
    pub fn save_storage(&self) -> Option<serde_json::Value> {
        self.behavior.save_storage()
    }

    pub(crate) fn pins_mut(&mut self) -> &mut PinSet {
        &mut self.pins
    }

    pub(crate) fn editor<'a>(&'a mut self, log: &'a mut EditLog) -> NodeEditor<'a> {
        NodeEditor::new(self.id, &mut self.pins, log)
    }

    pub(crate) fn set_status(&mut self, status: NodeStatus) {
        self.status = status;
    }

    pub(crate) fn load_storage(&mut self, storage: serde_json::Value) -> Result<(), NodeError> {
        self.behavior.load_storage(storage)
    }

    pub(crate) fn initialize(&mut self, env: &ScriptEnvironment) -> (Result<(), NodeError>, EditLog) {
        let mut log = EditLog::default();
        if self.initialized {
            return (Ok(()), log);
        }
        self.initialized = true;
        let result = self
            .behavior
            .initialize(&mut NodeEditor::new(self.id, &mut self.pins, &mut log), env);
        (result, log)
    }

    pub(crate) fn refresh(&mut self, env: &ScriptEnvironment) -> EditLog {
        let mut log = EditLog::default();
        if self.initialized && !self.disposed {
            self.behavior
                .refresh(&mut NodeEditor::new(self.id, &mut self.pins, &mut log), env);
        }
        log
    }

    pub(crate) fn handle_event(&mut self, event: &PinEvent) -> EditLog {
        let mut log = EditLog::default();
        self.behavior
            .on_pin_event(event, &mut NodeEditor::new(self.id, &mut self.pins, &mut log));
        log
    }

    /// Run the behavior; staged outputs are committed only on success
    pub(crate) fn evaluate(&mut self, context: &EvaluationContext, catch_panics: bool) -> Result<(), NodeError> {
        let Self { id, pins, behavior, .. } = self;
        let mut io = NodeIo::new(*id, pins, context);
        let result = if catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| behavior.evaluate(&mut io)))
                .unwrap_or_else(|payload| Err(NodeError::Panicked(panic_message(payload.as_ref()))))
        } else {
            behavior.evaluate(&mut io)
        };
        let writes = io.into_writes();
        if result.is_ok() {
            for (pin, value) in writes {
                match pins.find_mut(pin) {
                    Some(pin) if pin.direction == PinDirection::Output => pin.set_value(value),
                    _ => tracing::debug!(node = ?id, ?pin, "dropped write to unknown output pin"),
                }
            }
        }
        result
    }

    pub(crate) fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.behavior.dispose();
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("pins", &self.pins)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
