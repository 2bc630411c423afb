// SPDX-License-Identifier: MIT OR Apache-2.0
//! The host-facing script object.
//!
//! A [`NodeScript`] wraps one [`ScriptGraph`] behind a single mutex. Every
//! evaluation pass and every structural mutation holds the lock for its full
//! duration, so an editor thread can reshape the graph while the render
//! thread evaluates it.

use crate::collection::CollectionId;
use crate::config::ScriptConfig;
use crate::connection::{Connection, ConnectionId};
use crate::entity::{ConnectionEntity, NodeScriptEntity, NODE_ENTITY_VERSION, SCRIPT_ENTITY_VERSION};
use crate::error::{LoadError, NodeError, StructureError, StructureResult};
use crate::evaluation::{Clock, EvaluationContext, EvaluationReport, SystemClock};
use crate::events::ScriptEvent;
use crate::graph::ScriptGraph;
use crate::node::{Node, NodeBehavior, NodeId, NodeStatus, ScriptEnvironment};
use crate::nodes::exit::exit_node;
use crate::nodes::EXIT_NODE_TYPE;
use crate::pin::{PinHandle, PinId, PinType};
use crate::registry::NodeRegistry;
use crate::value::PinValue;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct ScriptState {
    graph: ScriptGraph,
    initialized: bool,
    disposed: bool,
    frame: u64,
    pending_connections: Vec<ConnectionEntity>,
}

/// A node graph computing one scripted property
pub struct NodeScript {
    name: String,
    result_type: PinType,
    exit_node: NodeId,
    registry: Arc<NodeRegistry>,
    env: ScriptEnvironment,
    clock: Arc<dyn Clock>,
    config: ScriptConfig,
    state: Mutex<ScriptState>,
}

impl NodeScript {
    /// Create an empty script whose exit node accepts `result_type`
    pub fn new(
        name: impl Into<String>,
        result_type: PinType,
        registry: Arc<NodeRegistry>,
        env: ScriptEnvironment,
    ) -> Self {
        Self::with_exit(name.into(), result_type, registry, env, NodeId::new())
    }

    fn with_exit(
        name: String,
        result_type: PinType,
        registry: Arc<NodeRegistry>,
        env: ScriptEnvironment,
        exit_id: NodeId,
    ) -> Self {
        let config = ScriptConfig::default();
        let mut graph =
            ScriptGraph::new(config.max_event_cascade).with_event_log_capacity(config.event_log_capacity);
        if let Err(error) = graph.add_node(exit_node(exit_id, result_type.clone())) {
            tracing::error!(%error, "failed to add exit node");
        }
        graph.take_events();
        Self {
            name,
            result_type,
            exit_node: exit_id,
            registry,
            env,
            clock: Arc::new(SystemClock),
            config,
            state: Mutex::new(ScriptState {
                graph,
                initialized: false,
                disposed: false,
                frame: 0,
                pending_connections: Vec::new(),
            }),
        }
    }

    /// Use a different wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different configuration
    pub fn with_config(mut self, config: ScriptConfig) -> Self {
        let graph = &mut self.state.get_mut().graph;
        graph.set_max_event_cascade(config.max_event_cascade);
        graph.set_event_log_capacity(config.event_log_capacity);
        self.config = config;
        self
    }

    /// Script name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type accepted by the exit node
    pub fn result_type(&self) -> &PinType {
        &self.result_type
    }

    /// The exit node
    pub fn exit_node(&self) -> NodeId {
        self.exit_node
    }

    /// Active configuration
    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// Node types this script can create
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Services available to nodes
    pub fn environment(&self) -> &ScriptEnvironment {
        &self.env
    }

    /// Initialize every node and restore persisted connections. Runs once.
    pub fn initialize(&self) {
        let mut state = self.state.lock();
        self.initialize_locked(&mut state);
    }

    fn initialize_locked(&self, state: &mut ScriptState) {
        if state.initialized || state.disposed {
            return;
        }
        state.initialized = true;

        let ids: Vec<NodeId> = state.graph.nodes().map(|n| n.id).collect();
        for id in ids {
            state.graph.initialize_node(id, &self.env);
        }

        for entity in std::mem::take(&mut state.pending_connections) {
            let Some((source, target)) = entity.resolve(&state.graph) else {
                tracing::warn!(script = %self.name, ?entity, "persisted connection refers to a missing pin");
                continue;
            };
            if let Err(error) = state.graph.connect(source, target) {
                tracing::warn!(script = %self.name, %error, "could not restore persisted connection");
            }
        }
        tracing::info!(
            script = %self.name,
            nodes = state.graph.node_count(),
            connections = state.graph.connection_count(),
            "node script initialized"
        );
    }

    /// Run one evaluation pass.
    ///
    /// Initializes the script first if the host has not. `delta_time` is
    /// passed through to nodes; transition nodes read the wall clock instead.
    pub fn evaluate(&self, delta_time: Duration) -> EvaluationReport {
        let mut state = self.state.lock();
        if state.disposed {
            return EvaluationReport::default();
        }
        if !state.initialized {
            tracing::debug!(script = %self.name, "evaluating before initialize, initializing now");
            self.initialize_locked(&mut state);
        }

        let started = Instant::now();
        state.frame += 1;
        state.graph.refresh(&self.env);
        let context = EvaluationContext::new(delta_time, self.clock.now(), state.frame);
        let report = state.graph.evaluate(&context, self.config.catch_panics);

        if let Some(threshold) = self.config.evaluation_warn_threshold() {
            let elapsed = started.elapsed();
            if elapsed > threshold {
                tracing::warn!(script = %self.name, ?elapsed, ?threshold, "slow evaluation pass");
            }
        }
        report
    }

    /// Add a registered node type at the origin
    pub fn add_node(&self, type_name: &str) -> StructureResult<NodeId> {
        self.add_node_at(type_name, [0.0, 0.0])
    }

    /// Add a registered node type at a position
    pub fn add_node_at(&self, type_name: &str, position: [f32; 2]) -> StructureResult<NodeId> {
        let mut node = self
            .registry
            .create(type_name)
            .ok_or_else(|| StructureError::UnknownNodeType(type_name.to_string()))?;
        node.position = position;
        self.insert_node(node)
    }

    /// Add a node built by the host. Initialized immediately if the script already is.
    pub fn insert_node(&self, node: Node) -> StructureResult<NodeId> {
        let mut state = self.state.lock();
        let id = state.graph.add_node(node)?;
        if state.initialized {
            state.graph.initialize_node(id, &self.env);
        }
        Ok(id)
    }

    /// Remove a node, its connections, and release its resources
    pub fn remove_node(&self, node: NodeId) -> StructureResult<()> {
        self.state.lock().graph.remove_node(node).map(drop)
    }

    /// Connect an output pin to an input pin
    pub fn connect(&self, source: PinHandle, target: PinHandle) -> StructureResult<ConnectionId> {
        self.state.lock().graph.connect(source, target)
    }

    /// Remove a connection
    pub fn disconnect(&self, connection: ConnectionId) -> StructureResult<()> {
        self.state.lock().graph.disconnect(connection).map(drop)
    }

    /// Append a pin to a collection
    pub fn add_collection_pin(&self, node: NodeId, collection: CollectionId) -> StructureResult<PinId> {
        self.state.lock().graph.add_collection_pin(node, collection)
    }

    /// Remove a pin from a collection
    pub fn remove_collection_pin(&self, node: NodeId, collection: CollectionId, pin: PinId) -> StructureResult<()> {
        self.state.lock().graph.remove_collection_pin(node, collection, pin)
    }

    /// Set the value of an unconnected input
    pub fn set_input_value(&self, pin: PinHandle, value: impl Into<PinValue>) -> StructureResult<()> {
        self.state.lock().graph.set_input_value(pin, value.into())
    }

    /// Replace a node's storage
    pub fn set_node_storage(&self, node: NodeId, storage: serde_json::Value) -> StructureResult<()> {
        self.state.lock().graph.set_node_storage(node, storage, &self.env)
    }

    /// Move a node
    pub fn set_node_position(&self, node: NodeId, position: [f32; 2]) -> StructureResult<()> {
        self.state.lock().graph.set_node_position(node, position)
    }

    /// Value on the exit node's input
    pub fn result(&self) -> PinValue {
        let state = self.state.lock();
        state
            .graph
            .node(self.exit_node)
            .and_then(|node| node.pins().pins().first())
            .map(|pin| pin.value().clone())
            .unwrap_or_else(|| PinValue::default_for(&self.result_type))
    }

    /// Current value of a pin
    pub fn pin_value(&self, pin: PinHandle) -> Option<PinValue> {
        self.state.lock().graph.pin(pin).map(|p| p.value().clone())
    }

    /// Handle of a standalone pin, looked up by name
    pub fn pin(&self, node: NodeId, name: &str) -> Option<PinHandle> {
        self.state.lock().graph.node(node)?.pin_handle(name)
    }

    /// Collection of a node, looked up by name
    pub fn collection(&self, node: NodeId, name: &str) -> Option<CollectionId> {
        let state = self.state.lock();
        state.graph.node(node)?.pins().collection_by_name(name).map(|c| c.id)
    }

    /// Handles of a collection's pins, in order
    pub fn collection_pins(&self, node: NodeId, collection: CollectionId) -> Vec<PinHandle> {
        let state = self.state.lock();
        state
            .graph
            .node(node)
            .and_then(|n| n.pins().collection(collection))
            .map(|c| c.pins().iter().map(|p| p.handle()).collect())
            .unwrap_or_default()
    }

    /// Status of a node
    pub fn node_status(&self, node: NodeId) -> Option<NodeStatus> {
        self.state.lock().graph.node(node).map(|n| n.status().clone())
    }

    /// All node IDs, in insertion order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.state.lock().graph.nodes().map(|n| n.id).collect()
    }

    /// Number of nodes, including the exit node
    pub fn node_count(&self) -> usize {
        self.state.lock().graph.node_count()
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.state.lock().graph.connection_count()
    }

    /// All connections
    pub fn connections(&self) -> Vec<Connection> {
        self.state.lock().graph.connections().copied().collect()
    }

    /// The cached evaluation order
    pub fn evaluation_order(&self) -> Vec<NodeId> {
        self.state.lock().graph.plan().order().to_vec()
    }

    /// Drain structural and health notifications
    pub fn take_events(&self) -> Vec<ScriptEvent> {
        self.state.lock().graph.take_events()
    }

    /// Read a node's behavior as its concrete type
    pub fn inspect_node<T: NodeBehavior, R>(&self, node: NodeId, f: impl FnOnce(&T) -> R) -> Option<R> {
        let state = self.state.lock();
        state.graph.node(node)?.behavior::<T>().map(f)
    }

    /// Read access to the whole graph under the lock
    pub fn with_graph<R>(&self, f: impl FnOnce(&ScriptGraph) -> R) -> R {
        f(&self.state.lock().graph)
    }

    /// Snapshot for persistence
    pub fn to_entity(&self) -> NodeScriptEntity {
        let state = self.state.lock();
        let mut entity = NodeScriptEntity::from_graph(&self.name, &state.graph);
        // Connections not restored yet still belong to the script
        entity
            .connections
            .extend(state.pending_connections.iter().cloned());
        entity
    }

    /// Rebuild a script from its persisted form.
    ///
    /// Connections are restored by [`initialize`](Self::initialize), after
    /// every node had the chance to create its pins.
    pub fn load(
        entity: &NodeScriptEntity,
        result_type: PinType,
        registry: Arc<NodeRegistry>,
        env: ScriptEnvironment,
    ) -> Result<Self, LoadError> {
        if entity.version > SCRIPT_ENTITY_VERSION {
            return Err(LoadError::UnsupportedVersion {
                found: entity.version,
                supported: SCRIPT_ENTITY_VERSION,
            });
        }
        let exit_id = entity
            .nodes
            .iter()
            .find(|n| n.type_name == EXIT_NODE_TYPE)
            .map_or_else(NodeId::new, |n| n.id);
        let mut script = Self::with_exit(entity.name.clone(), result_type, registry, env, exit_id);

        let state = script.state.get_mut();
        for node_entity in &entity.nodes {
            if node_entity.version > NODE_ENTITY_VERSION {
                return Err(LoadError::UnsupportedVersion {
                    found: node_entity.version,
                    supported: NODE_ENTITY_VERSION,
                });
            }
            let position = [node_entity.position_x as f32, node_entity.position_y as f32];
            if node_entity.type_name == EXIT_NODE_TYPE {
                state.graph.set_node_position(exit_id, position)?;
                continue;
            }

            let mut node = script
                .registry
                .create_with_id(&node_entity.type_name, node_entity.id)
                .ok_or_else(|| LoadError::UnknownNodeType(node_entity.type_name.clone()))?;
            if let Some(name) = &node_entity.name {
                node.name = name.clone();
            }
            node.position = position;
            if let Some(json) = &node_entity.storage_json {
                let storage_error = |source: NodeError| LoadError::Storage {
                    node: node_entity.id,
                    source,
                };
                let storage = serde_json::from_str(json).map_err(|e| storage_error(NodeError::Storage(e)))?;
                node.load_storage(storage).map_err(storage_error)?;
            }
            state.graph.add_node(node)?;
        }

        for collection in &entity.pin_collections {
            if !state
                .graph
                .resize_collection(collection.node_id, &collection.collection_name, collection.count)
            {
                tracing::warn!(
                    script = %entity.name,
                    node = ?collection.node_id,
                    collection = %collection.collection_name,
                    "persisted pin collection not found"
                );
            }
        }
        state.pending_connections = entity.connections.clone();
        state.graph.take_events();
        tracing::debug!(script = %entity.name, nodes = entity.nodes.len(), "node script loaded");
        Ok(script)
    }

    /// Dispose every node. The script evaluates to nothing afterwards.
    pub fn dispose(&self) {
        Self::dispose_state(&self.name, &mut self.state.lock());
    }

    fn dispose_state(name: &str, state: &mut ScriptState) {
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.graph.dispose();
        tracing::info!(script = %name, "node script disposed");
    }
}

impl Drop for NodeScript {
    fn drop(&mut self) {
        Self::dispose_state(&self.name, self.state.get_mut());
    }
}

impl std::fmt::Debug for NodeScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeScript")
            .field("name", &self.name)
            .field("result_type", &self.result_type)
            .field("exit_node", &self.exit_node)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
