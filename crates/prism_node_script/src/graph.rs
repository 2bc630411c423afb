// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! The graph is an arena: it owns every [`Node`] and [`Connection`] of one
//! script, and pins are addressed by [`PinHandle`]s. The graph stays acyclic
//! by construction. A connection that would close a cycle is rejected when
//! it is made, and the cached [`EvaluationPlan`] is rebuilt after every
//! structural change.

use crate::collection::CollectionId;
use crate::connection::{Connection, ConnectionId};
use crate::error::{NodeError, StructureError, StructureResult};
use crate::evaluation::{EvaluationContext, EvaluationReport};
use crate::events::{PinEvent, ScriptEvent};
use crate::node::{EditLog, Node, NodeId, NodeStatus, RemovedPin, ScriptEnvironment};
use crate::pin::{Pin, PinDirection, PinHandle, PinId};
use crate::value::PinValue;
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Error when the graph contains a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;

/// Cached evaluation order plus, per node, the connections feeding it
#[derive(Debug, Clone, Default)]
pub struct EvaluationPlan {
    order: Vec<NodeId>,
    inbound: HashMap<NodeId, Vec<ConnectionId>>,
}

impl EvaluationPlan {
    /// Topologically sort `nodes` so every producer precedes its consumers.
    ///
    /// Depth-first over each node's upstream dependencies, marking nodes in
    /// progress; meeting an in-progress node again is a back edge. The walk
    /// keeps its own stack, so chain length is not limited by the call stack.
    pub fn build(
        nodes: &IndexMap<NodeId, Node>,
        connections: &IndexMap<ConnectionId, Connection>,
    ) -> Result<Self, CycleError> {
        let mut upstream: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut inbound: HashMap<NodeId, Vec<ConnectionId>> = HashMap::new();
        for connection in connections.values() {
            upstream
                .entry(connection.target.node)
                .or_default()
                .push(connection.source.node);
            inbound
                .entry(connection.target.node)
                .or_default()
                .push(connection.id);
        }

        let mut marks = HashMap::with_capacity(nodes.len());
        let mut order = Vec::with_capacity(nodes.len());
        for node_id in nodes.keys() {
            visit(*node_id, &upstream, &mut marks, &mut order)?;
        }
        Ok(Self { order, inbound })
    }

    /// Nodes in evaluation order
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Connections whose target pin belongs to `node`
    pub fn inbound(&self, node: NodeId) -> &[ConnectionId] {
        self.inbound.get(&node).map_or(&[], Vec::as_slice)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

fn visit(
    root: NodeId,
    upstream: &HashMap<NodeId, Vec<NodeId>>,
    marks: &mut HashMap<NodeId, Mark>,
    order: &mut Vec<NodeId>,
) -> Result<(), CycleError> {
    if marks.contains_key(&root) {
        return Ok(());
    }
    // (node, index of the next dependency to look at)
    let mut stack = vec![(root, 0usize)];
    marks.insert(root, Mark::InProgress);
    while let Some(top) = stack.last_mut() {
        let (node_id, next) = *top;
        let dependency = upstream.get(&node_id).and_then(|deps| deps.get(next)).copied();
        let Some(dependency) = dependency else {
            marks.insert(node_id, Mark::Done);
            order.push(node_id);
            stack.pop();
            continue;
        };
        top.1 += 1;
        match marks.get(&dependency) {
            Some(Mark::Done) => {}
            Some(Mark::InProgress) => return Err(CycleError),
            None => {
                marks.insert(dependency, Mark::InProgress);
                stack.push((dependency, 0));
            }
        }
    }
    Ok(())
}

/// The nodes and connections of one script
#[derive(Debug)]
pub struct ScriptGraph {
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
    plan: EvaluationPlan,
    pending: VecDeque<PinEvent>,
    events: VecDeque<ScriptEvent>,
    max_event_cascade: usize,
    event_log_capacity: usize,
}

impl ScriptGraph {
    /// Create an empty graph
    pub fn new(max_event_cascade: usize) -> Self {
        Self {
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            plan: EvaluationPlan::default(),
            pending: VecDeque::new(),
            events: VecDeque::new(),
            max_event_cascade,
            event_log_capacity: crate::config::ScriptConfig::default().event_log_capacity,
        }
    }

    /// Keep at most `capacity` undrained host events, dropping the oldest
    pub fn with_event_log_capacity(mut self, capacity: usize) -> Self {
        self.set_event_log_capacity(capacity);
        self
    }

    pub(crate) fn set_max_event_cascade(&mut self, max_event_cascade: usize) {
        self.max_event_cascade = max_event_cascade;
    }

    pub(crate) fn set_event_log_capacity(&mut self, capacity: usize) {
        self.event_log_capacity = capacity;
        self.trim_events();
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get all nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Look up a pin
    pub fn pin(&self, handle: PinHandle) -> Option<&Pin> {
        self.nodes.get(&handle.node)?.pins().find(handle.pin)
    }

    /// The cached evaluation plan
    pub fn plan(&self) -> &EvaluationPlan {
        &self.plan
    }

    /// Drain the host event log.
    ///
    /// Undrained events are capped; the oldest are dropped first.
    pub fn take_events(&mut self) -> Vec<ScriptEvent> {
        self.events.drain(..).collect()
    }

    /// Whether pin events are still queued for delivery
    pub fn has_pending_pin_events(&self) -> bool {
        !self.pending.is_empty()
    }

    fn log_event(&mut self, event: ScriptEvent) {
        self.events.push_back(event);
        self.trim_events();
    }

    fn trim_events(&mut self) {
        let excess = self.events.len().saturating_sub(self.event_log_capacity);
        if excess > 0 {
            self.events.drain(..excess);
            tracing::debug!(dropped = excess, "event log full, dropped oldest events");
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> StructureResult<NodeId> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(StructureError::DuplicateNode(id));
        }
        tracing::debug!(node = ?id, node_type = %node.type_name, "adding node");
        self.nodes.insert(id, node);
        self.rebuild_plan();
        self.log_event(ScriptEvent::NodeAdded(id));
        Ok(id)
    }

    /// Run a node's `initialize` and apply the pins it created
    pub(crate) fn initialize_node(&mut self, node_id: NodeId, env: &ScriptEnvironment) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        let (result, log) = node.initialize(env);
        if let Err(error) = result {
            self.mark_broken(node_id, error);
        }
        self.apply_edits(node_id, log);
        self.drain_pin_events();
    }

    /// Remove a node and every connection touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> StructureResult<Node> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(StructureError::NodeNotFound(node_id))?;
        if node.is_exit() {
            return Err(StructureError::ExitNodeProtected);
        }
        let touching: Vec<ConnectionId> = self.connections_for_node(node_id).map(|c| c.id).collect();
        let mut node = self
            .nodes
            .shift_remove(&node_id)
            .ok_or(StructureError::NodeNotFound(node_id))?;
        for connection in touching {
            self.drop_connection(connection);
        }
        node.dispose();
        self.rebuild_plan();
        self.drain_pin_events();
        self.log_event(ScriptEvent::NodeRemoved(node_id));
        tracing::debug!(node = ?node_id, "removed node");
        Ok(node)
    }

    /// Connect an output pin to an input pin.
    ///
    /// Rejections leave the graph untouched and fire no events.
    pub fn connect(&mut self, source: PinHandle, target: PinHandle) -> StructureResult<ConnectionId> {
        let source_pin = self.pin(source).ok_or(StructureError::PinNotFound(source))?;
        let target_pin = self.pin(target).ok_or(StructureError::PinNotFound(target))?;

        if source_pin.direction != PinDirection::Output {
            return Err(StructureError::DirectionMismatch {
                pin: source,
                expected: PinDirection::Output,
            });
        }
        if target_pin.direction != PinDirection::Input {
            return Err(StructureError::DirectionMismatch {
                pin: target,
                expected: PinDirection::Input,
            });
        }
        if !source_pin.pin_type().can_connect_to(target_pin.pin_type()) {
            return Err(StructureError::TypeMismatch {
                output: source_pin.pin_type().clone(),
                input: target_pin.pin_type().clone(),
            });
        }
        if let Some(existing) = self
            .connections
            .values()
            .find(|c| c.source == source && c.target == target)
        {
            return Err(StructureError::DuplicateConnection(existing.id));
        }
        if !target_pin.has_capacity() {
            return Err(StructureError::CapacityExceeded(target));
        }
        let source_type = source_pin.pin_type().clone();
        let target_type = target_pin.pin_type().clone();

        let connection = Connection::new(source, target);
        self.connections.insert(connection.id, connection);
        match EvaluationPlan::build(&self.nodes, &self.connections) {
            Ok(plan) => self.plan = plan,
            Err(CycleError) => {
                self.connections.shift_remove(&connection.id);
                return Err(StructureError::WouldCreateCycle {
                    from: source.node,
                    to: target.node,
                });
            }
        }

        self.attach(source, connection.id);
        self.attach(target, connection.id);
        self.pending.push_back(PinEvent::Connected {
            pin: source,
            peer: target,
            peer_type: target_type,
            connection: connection.id,
        });
        self.pending.push_back(PinEvent::Connected {
            pin: target,
            peer: source,
            peer_type: source_type,
            connection: connection.id,
        });
        tracing::debug!(?source, ?target, connection = ?connection.id, "connected pins");
        self.drain_pin_events();
        Ok(connection.id)
    }

    /// Remove a connection from both of its pins
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> StructureResult<Connection> {
        let connection = self
            .drop_connection(connection_id)
            .ok_or(StructureError::ConnectionNotFound(connection_id))?;
        self.rebuild_plan();
        self.drain_pin_events();
        Ok(connection)
    }

    /// Append a pin to a collection
    pub fn add_collection_pin(&mut self, node_id: NodeId, collection: CollectionId) -> StructureResult<PinId> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(StructureError::NodeNotFound(node_id))?;
        let mut log = EditLog::default();
        let pin = node
            .editor(&mut log)
            .add_collection_pin(collection)
            .ok_or(StructureError::CollectionNotFound(collection))?;
        self.apply_edits(node_id, log);
        self.drain_pin_events();
        Ok(pin)
    }

    /// Remove a pin from a collection, dropping its connections
    pub fn remove_collection_pin(
        &mut self,
        node_id: NodeId,
        collection: CollectionId,
        pin: PinId,
    ) -> StructureResult<()> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(StructureError::NodeNotFound(node_id))?;
        if node.pins().collection(collection).is_none() {
            return Err(StructureError::CollectionNotFound(collection));
        }
        let mut log = EditLog::default();
        if !node.editor(&mut log).remove_collection_pin(collection, pin) {
            return Err(StructureError::PinNotFound(PinHandle::new(node_id, pin)));
        }
        self.apply_edits(node_id, log);
        self.drain_pin_events();
        Ok(())
    }

    /// Resize a collection, identified by name, to `count` pins
    pub(crate) fn resize_collection(&mut self, node_id: NodeId, name: &str, count: usize) -> bool {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return false;
        };
        let Some(collection) = node.pins().collection_by_name(name) else {
            return false;
        };
        let id = collection.id;
        let surplus: Vec<PinId> = collection.pins().iter().skip(count).map(|p| p.id).collect();
        let missing = count.saturating_sub(collection.len());

        let mut log = EditLog::default();
        let mut editor = node.editor(&mut log);
        for pin in surplus {
            editor.remove_collection_pin(id, pin);
        }
        for _ in 0..missing {
            editor.add_collection_pin(id);
        }
        self.apply_edits(node_id, log);
        self.drain_pin_events();
        true
    }

    /// Set the value of an input pin. Connected inputs are overwritten by the next pass.
    pub fn set_input_value(&mut self, handle: PinHandle, value: PinValue) -> StructureResult<()> {
        let pin = self
            .nodes
            .get_mut(&handle.node)
            .and_then(|n| n.pins_mut().find_mut(handle.pin))
            .ok_or(StructureError::PinNotFound(handle))?;
        if pin.direction != PinDirection::Input {
            return Err(StructureError::DirectionMismatch {
                pin: handle,
                expected: PinDirection::Input,
            });
        }
        if !value.fits(pin.pin_type()) {
            return Err(StructureError::ValueMismatch {
                pin: handle,
                expected: pin.pin_type().clone(),
            });
        }
        pin.set_value(value);
        Ok(())
    }

    /// Replace a node's storage and let it reshape itself
    pub(crate) fn set_node_storage(
        &mut self,
        node_id: NodeId,
        storage: serde_json::Value,
        env: &ScriptEnvironment,
    ) -> StructureResult<()> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(StructureError::NodeNotFound(node_id))?;
        node.load_storage(storage)
            .map_err(|error| StructureError::InvalidStorage {
                node: node_id,
                message: error.to_string(),
            })?;
        let log = node.refresh(env);
        self.apply_edits(node_id, log);
        self.drain_pin_events();
        Ok(())
    }

    /// Move a node in the editor
    pub fn set_node_position(&mut self, node_id: NodeId, position: [f32; 2]) -> StructureResult<()> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(StructureError::NodeNotFound(node_id))?;
        node.position = position;
        Ok(())
    }

    /// Give every node a chance to react to external changes
    pub(crate) fn refresh(&mut self, env: &ScriptEnvironment) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for node_id in ids {
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            let log = node.refresh(env);
            if !log.is_empty() {
                self.apply_edits(node_id, log);
                self.drain_pin_events();
            }
        }
    }

    /// Evaluate every node once in cached order.
    ///
    /// Before a node runs, the values of the outputs feeding it are copied
    /// into its inputs. A failing node is marked broken and keeps its last
    /// outputs; the pass continues with the next node.
    pub(crate) fn evaluate(&mut self, context: &EvaluationContext, catch_panics: bool) -> EvaluationReport {
        let mut report = EvaluationReport::default();
        for index in 0..self.plan.order.len() {
            let node_id = self.plan.order[index];
            let inputs: Vec<(PinId, PinValue)> = self
                .plan
                .inbound(node_id)
                .iter()
                .filter_map(|id| {
                    let connection = self.connections.get(id)?;
                    let value = self.pin(connection.source)?.value().clone();
                    Some((connection.target.pin, value))
                })
                .collect();

            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            for (pin, value) in inputs {
                if let Some(pin) = node.pins_mut().find_mut(pin) {
                    let value = if value.fits(pin.pin_type()) {
                        value
                    } else {
                        PinValue::default_for(pin.pin_type())
                    };
                    pin.set_value(value);
                }
            }

            report.evaluated.push(node_id);
            match node.evaluate(context, catch_panics) {
                Ok(()) => {
                    if node.is_broken() {
                        node.set_status(NodeStatus::Ok);
                        tracing::info!(node = ?node_id, "node recovered");
                        self.log_event(ScriptEvent::NodeRecovered(node_id));
                    }
                }
                Err(error) => {
                    report.broken.push(node_id);
                    self.mark_broken(node_id, error);
                }
            }
        }
        report
    }

    /// Dispose every node
    pub(crate) fn dispose(&mut self) {
        for node in self.nodes.values_mut() {
            node.dispose();
        }
    }

    fn mark_broken(&mut self, node_id: NodeId, error: NodeError) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        let reason = error.to_string();
        let newly_broken = !node.is_broken();
        node.set_status(NodeStatus::Broken {
            reason: reason.clone(),
            error: Arc::new(error),
        });
        if newly_broken {
            tracing::warn!(node = ?node_id, node_type = %node.type_name, %reason, "node marked broken");
            self.log_event(ScriptEvent::NodeBroken { node: node_id, reason });
        }
    }

    fn attach(&mut self, handle: PinHandle, connection: ConnectionId) {
        if let Some(pin) = self
            .nodes
            .get_mut(&handle.node)
            .and_then(|n| n.pins_mut().find_mut(handle.pin))
        {
            pin.attach(connection);
        }
    }

    fn detach(&mut self, handle: PinHandle, connection: ConnectionId) -> bool {
        self.nodes
            .get_mut(&handle.node)
            .and_then(|n| n.pins_mut().find_mut(handle.pin))
            .is_some_and(|pin| pin.detach(connection))
    }

    /// Remove a connection record and queue `Disconnected` for each surviving end
    fn drop_connection(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.shift_remove(&connection_id)?;
        if self.detach(connection.source, connection_id) {
            self.pending.push_back(PinEvent::Disconnected {
                pin: connection.source,
                peer: connection.target,
                connection: connection_id,
            });
        }
        if self.detach(connection.target, connection_id) {
            self.pending.push_back(PinEvent::Disconnected {
                pin: connection.target,
                peer: connection.source,
                connection: connection_id,
            });
        }
        tracing::debug!(connection = ?connection_id, "disconnected pins");
        Some(connection)
    }

    /// Point a connection at a replacement pin, or drop it if it no longer fits
    fn remap_connection(&mut self, connection_id: ConnectionId, old: PinHandle, new: PinHandle) {
        let Some(mut connection) = self.connections.get(&connection_id).copied() else {
            return;
        };
        let new_is_target = if connection.source == old {
            connection.source = new;
            false
        } else if connection.target == old {
            connection.target = new;
            true
        } else {
            return;
        };

        let fits = match (self.pin(connection.source), self.pin(connection.target)) {
            (Some(source), Some(target)) => source.can_connect(target) && (!new_is_target || target.has_capacity()),
            _ => false,
        };
        if !fits {
            self.drop_connection(connection_id);
            return;
        }

        self.connections.insert(connection_id, connection);
        self.attach(new, connection_id);
        let peer = if new_is_target { connection.source } else { connection.target };
        let (Some(new_type), Some(peer_type)) = (
            self.pin(new).map(|p| p.pin_type().clone()),
            self.pin(peer).map(|p| p.pin_type().clone()),
        ) else {
            return;
        };
        self.pending.push_back(PinEvent::Connected {
            pin: new,
            peer,
            peer_type,
            connection: connection_id,
        });
        self.pending.push_back(PinEvent::Connected {
            pin: peer,
            peer: new,
            peer_type: new_type,
            connection: connection_id,
        });
    }

    /// Settle the graph after a node edited its own pins
    fn apply_edits(&mut self, node_id: NodeId, log: EditLog) {
        if log.is_empty() {
            return;
        }
        let EditLog {
            added,
            removed,
            remaps,
            retyped,
        } = log;

        for remap in remaps {
            let old = PinHandle::new(node_id, remap.old);
            let new = PinHandle::new(node_id, remap.new);
            for connection in remap.connections {
                self.remap_connection(connection, old, new);
            }
        }
        for RemovedPin {
            pin,
            collection,
            connections,
        } in removed
        {
            for connection in connections {
                self.drop_connection(connection);
            }
            self.pending.push_back(PinEvent::Removed {
                pin: PinHandle::new(node_id, pin),
                collection,
            });
        }
        for (pin, collection) in added {
            self.pending.push_back(PinEvent::Added {
                pin: PinHandle::new(node_id, pin),
                collection,
            });
        }
        for pin in retyped {
            let handle = PinHandle::new(node_id, pin);
            let connections: Vec<ConnectionId> = self
                .pin(handle)
                .map(|p| p.connections().collect())
                .unwrap_or_default();
            for connection_id in connections {
                let compatible = self.connections.get(&connection_id).is_some_and(|c| {
                    match (self.pin(c.source), self.pin(c.target)) {
                        (Some(source), Some(target)) => source.can_connect(target),
                        _ => false,
                    }
                });
                if !compatible {
                    self.drop_connection(connection_id);
                }
            }
        }
        self.rebuild_plan();
    }

    /// Hand queued pin events to their nodes until the queue settles
    fn drain_pin_events(&mut self) {
        let mut steps = 0;
        while let Some(event) = self.pending.pop_front() {
            steps += 1;
            if steps > self.max_event_cascade {
                tracing::warn!(
                    dropped = self.pending.len() + 1,
                    limit = self.max_event_cascade,
                    "pin event cascade exceeded its limit"
                );
                self.pending.clear();
                break;
            }
            let node_id = event.node();
            let log = self.nodes.get_mut(&node_id).map(|node| node.handle_event(&event));
            self.log_event(ScriptEvent::Pin(event));
            if let Some(log) = log {
                self.apply_edits(node_id, log);
            }
        }
    }

    fn rebuild_plan(&mut self) {
        match EvaluationPlan::build(&self.nodes, &self.connections) {
            Ok(plan) => self.plan = plan,
            Err(CycleError) => tracing::error!("evaluation plan rebuild found a cycle, keeping previous plan"),
        }
    }
}

impl Default for ScriptGraph {
    fn default() -> Self {
        Self::new(crate::config::ScriptConfig::default().max_event_cascade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use crate::evaluation::NodeIo;
    use crate::node::{NodeBehavior, NodeEditor};
    use crate::pin::PinType;

    /// Copies its input to its output, optionally failing
    struct Relay {
        input: PinId,
        output: PinId,
        fail: bool,
    }

    impl NodeBehavior for Relay {
        fn evaluate(&mut self, io: &mut NodeIo<'_>) -> Result<(), NodeError> {
            if self.fail {
                return Err(NodeError::Evaluation("relay failure".into()));
            }
            let value = io.input(self.input).clone();
            io.set_output(self.output, value);
            Ok(())
        }
    }

    fn relay(pin_type: PinType) -> Node {
        Node::new(NodeId::new(), "relay", "Relay", move |editor| {
            Box::new(Relay {
                input: editor.add_input("Input", pin_type.clone()),
                output: editor.add_output("Output", pin_type),
                fail: false,
            })
        })
    }

    /// Grows its collection every time a pin is added to it
    struct Spawner {
        members: CollectionId,
    }

    impl NodeBehavior for Spawner {
        fn evaluate(&mut self, _io: &mut NodeIo<'_>) -> Result<(), NodeError> {
            Ok(())
        }

        fn on_pin_event(&mut self, event: &PinEvent, editor: &mut NodeEditor<'_>) {
            if matches!(event, PinEvent::Added { collection: Some(c), .. } if *c == self.members) {
                editor.add_collection_pin(self.members);
            }
        }
    }

    fn handles(graph: &ScriptGraph, node: NodeId) -> (PinHandle, PinHandle) {
        let node = graph.node(node).unwrap();
        (node.pin_handle("Input").unwrap(), node.pin_handle("Output").unwrap())
    }

    fn chain(graph: &mut ScriptGraph, count: usize) -> Vec<NodeId> {
        let ids: Vec<NodeId> = (0..count)
            .map(|_| graph.add_node(relay(PinType::Numeric)).unwrap())
            .collect();
        for pair in ids.windows(2) {
            let (_, output) = handles(graph, pair[0]);
            let (input, _) = handles(graph, pair[1]);
            graph.connect(output, input).unwrap();
        }
        ids
    }

    #[test]
    fn test_order_respects_dependencies() {
        let mut graph = ScriptGraph::default();
        let ids = chain(&mut graph, 3);
        // Insert an unrelated node and a producer added after its consumer
        let late = graph.add_node(relay(PinType::Numeric)).unwrap();
        let (_, late_out) = handles(&graph, late);
        let consumer = graph.add_node(relay(PinType::Numeric)).unwrap();
        let (consumer_in, _) = handles(&graph, consumer);
        graph.connect(late_out, consumer_in).unwrap();
        let (_, last_out) = handles(&graph, ids[2]);
        let (late_in, _) = handles(&graph, late);
        graph.connect(last_out, late_in).unwrap();

        let order = graph.plan().order();
        let position = |id: NodeId| order.iter().position(|n| *n == id).unwrap();
        assert_eq!(order.len(), 5);
        assert!(position(ids[0]) < position(ids[1]));
        assert!(position(ids[1]) < position(ids[2]));
        assert!(position(ids[2]) < position(late));
        assert!(position(late) < position(consumer));
    }

    #[test]
    fn test_cycle_rejected_and_graph_unchanged() {
        let mut graph = ScriptGraph::default();
        let ids = chain(&mut graph, 3);
        graph.take_events();
        let before: Vec<ConnectionId> = graph.connections().map(|c| c.id).collect();
        let order_before = graph.plan().order().to_vec();

        let (_, last_out) = handles(&graph, ids[2]);
        let (first_in, _) = handles(&graph, ids[0]);
        let err = graph.connect(last_out, first_in).unwrap_err();
        assert_eq!(
            err,
            StructureError::WouldCreateCycle {
                from: ids[2],
                to: ids[0]
            }
        );
        let after: Vec<ConnectionId> = graph.connections().map(|c| c.id).collect();
        assert_eq!(before, after);
        assert_eq!(graph.plan().order(), order_before.as_slice());
        assert!(!graph.pin(first_in).unwrap().is_connected());
        assert!(graph.take_events().is_empty());
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = ScriptGraph::default();
        let node = graph.add_node(relay(PinType::Numeric)).unwrap();
        let (input, output) = handles(&graph, node);
        assert!(matches!(
            graph.connect(output, input),
            Err(StructureError::WouldCreateCycle { .. })
        ));
    }

    #[test]
    fn test_connect_validation() {
        let mut graph = ScriptGraph::default();
        let numeric = graph.add_node(relay(PinType::Numeric)).unwrap();
        let boolean = graph.add_node(relay(PinType::Bool)).unwrap();
        let integer = graph.add_node(relay(PinType::Integer)).unwrap();
        let (num_in, num_out) = handles(&graph, numeric);
        let (bool_in, bool_out) = handles(&graph, boolean);
        let (int_in, _) = handles(&graph, integer);
        graph.take_events();

        assert!(matches!(
            graph.connect(num_out, bool_in),
            Err(StructureError::TypeMismatch { .. })
        ));
        assert!(matches!(
            graph.connect(num_in, int_in),
            Err(StructureError::DirectionMismatch { .. })
        ));
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.take_events().is_empty());

        // Numeric coercion
        let connection = graph.connect(num_out, int_in).unwrap();
        assert!(matches!(
            graph.connect(num_out, int_in),
            Err(StructureError::DuplicateConnection(id)) if id == connection
        ));
        assert!(matches!(
            graph.connect(bool_out, num_in),
            Err(StructureError::TypeMismatch { .. })
        ));

        let other = graph.add_node(relay(PinType::Numeric)).unwrap();
        let (_, other_out) = handles(&graph, other);
        assert_eq!(
            graph.connect(other_out, int_in),
            Err(StructureError::CapacityExceeded(int_in))
        );
    }

    #[test]
    fn test_connect_and_disconnect_fire_events() {
        let mut graph = ScriptGraph::default();
        let ids = chain(&mut graph, 2);
        let events = graph.take_events();
        let connected = events
            .iter()
            .filter(|e| matches!(e, ScriptEvent::Pin(PinEvent::Connected { .. })))
            .count();
        assert_eq!(connected, 2);

        let connection = graph.connections_for_node(ids[0]).next().unwrap().id;
        graph.disconnect(connection).unwrap();
        let events = graph.take_events();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, ScriptEvent::Pin(PinEvent::Disconnected { .. }))));
        let (_, output) = handles(&graph, ids[0]);
        assert!(!graph.pin(output).unwrap().is_connected());
        assert!(matches!(
            graph.disconnect(connection),
            Err(StructureError::ConnectionNotFound(_))
        ));
    }

    #[test]
    fn test_remove_node_drops_connections() {
        let mut graph = ScriptGraph::default();
        let ids = chain(&mut graph, 3);
        graph.remove_node(ids[1]).unwrap();

        assert_eq!(graph.connection_count(), 0);
        assert!(!graph.plan().order().contains(&ids[1]));
        let (_, output) = handles(&graph, ids[0]);
        assert!(!graph.pin(output).unwrap().is_connected());

        let context = EvaluationContext::for_test();
        let report = graph.evaluate(&context, true);
        assert_eq!(report.evaluated.len(), 2);
        assert!(report.broken.is_empty());
    }

    #[test]
    fn test_values_flow_in_one_pass() {
        let mut graph = ScriptGraph::default();
        let ids = chain(&mut graph, 3);
        let (first_in, _) = handles(&graph, ids[0]);
        let (_, last_out) = handles(&graph, ids[2]);
        graph.set_input_value(first_in, PinValue::from(7)).unwrap();

        let report = graph.evaluate(&EvaluationContext::for_test(), true);
        assert_eq!(report.evaluated, ids);
        assert_eq!(graph.pin(last_out).unwrap().value(), &PinValue::from(7));
    }

    #[test]
    fn test_set_input_value_validation() {
        let mut graph = ScriptGraph::default();
        let node = graph.add_node(relay(PinType::Numeric)).unwrap();
        let (input, output) = handles(&graph, node);
        assert!(matches!(
            graph.set_input_value(input, PinValue::from(true)),
            Err(StructureError::ValueMismatch { .. })
        ));
        assert!(matches!(
            graph.set_input_value(output, PinValue::from(1)),
            Err(StructureError::DirectionMismatch { .. })
        ));
    }

    #[test]
    fn test_broken_node_keeps_last_output() {
        let mut graph = ScriptGraph::default();
        let ids = chain(&mut graph, 2);
        let sibling = graph.add_node(relay(PinType::Numeric)).unwrap();
        let (first_in, first_out) = handles(&graph, ids[0]);
        let (sibling_in, sibling_out) = handles(&graph, sibling);
        graph.set_input_value(first_in, PinValue::from(1)).unwrap();
        graph.set_input_value(sibling_in, PinValue::from(2)).unwrap();
        let context = EvaluationContext::for_test();
        graph.evaluate(&context, true);
        graph.take_events();

        graph.nodes.get_mut(&ids[0]).unwrap().behavior_mut::<Relay>().unwrap().fail = true;
        graph.set_input_value(first_in, PinValue::from(5)).unwrap();
        graph.set_input_value(sibling_in, PinValue::from(3)).unwrap();
        let report = graph.evaluate(&context, true);

        assert_eq!(report.broken, vec![ids[0]]);
        assert_eq!(report.evaluated.len(), 3);
        assert!(graph.node(ids[0]).unwrap().is_broken());
        assert_eq!(graph.pin(first_out).unwrap().value(), &PinValue::from(1));
        assert_eq!(graph.pin(sibling_out).unwrap().value(), &PinValue::from(3));
        let events = graph.take_events();
        assert!(matches!(&events[..], [ScriptEvent::NodeBroken { node, .. }] if *node == ids[0]));

        // Still broken on the next pass, but reported only once
        graph.evaluate(&context, true);
        assert!(graph.take_events().is_empty());

        graph.nodes.get_mut(&ids[0]).unwrap().behavior_mut::<Relay>().unwrap().fail = false;
        graph.evaluate(&context, true);
        assert!(!graph.node(ids[0]).unwrap().is_broken());
        assert_eq!(graph.pin(first_out).unwrap().value(), &PinValue::from(5));
        assert_eq!(graph.take_events(), vec![ScriptEvent::NodeRecovered(ids[0])]);
    }

    #[test]
    fn test_event_cascade_is_bounded() {
        let mut graph = ScriptGraph::new(8);
        let source = graph.add_node(relay(PinType::Numeric)).unwrap();
        let spawner = Node::new(NodeId::new(), "spawner", "Spawner", |editor| {
            Box::new(Spawner {
                members: editor.add_collection("Members", PinDirection::Input, PinType::Numeric, 1),
            })
        });
        let spawner = graph.add_node(spawner).unwrap();
        let members = graph.node(spawner).unwrap().pins().collection_by_name("Members").unwrap().id;
        let first = graph.node(spawner).unwrap().pins().collection(members).unwrap().pins()[0].handle();
        let (_, source_out) = handles(&graph, source);
        graph.connect(source_out, first).unwrap();
        graph.take_events();

        graph.add_collection_pin(spawner, members).unwrap();

        assert!(!graph.has_pending_pin_events());
        let delivered = graph
            .take_events()
            .iter()
            .filter(|e| matches!(e, ScriptEvent::Pin(PinEvent::Added { .. })))
            .count();
        assert_eq!(delivered, 8);
        // The initial pin, the one added above, and one per delivered event
        let collection = graph.node(spawner).unwrap().pins().collection(members).unwrap();
        assert_eq!(collection.len(), 10);
        assert_eq!(graph.connection_count(), 1);
        assert!(graph.pin(first).unwrap().is_connected());
        assert_eq!(graph.plan().order(), &[source, spawner]);
    }

    #[test]
    fn test_event_log_keeps_newest() {
        let mut graph = ScriptGraph::default().with_event_log_capacity(3);
        let ids: Vec<NodeId> = (0..5)
            .map(|_| graph.add_node(relay(PinType::Numeric)).unwrap())
            .collect();
        let events = graph.take_events();
        assert_eq!(
            events,
            ids[2..].iter().map(|id| ScriptEvent::NodeAdded(*id)).collect::<Vec<_>>()
        );
        assert!(graph.take_events().is_empty());
    }

    #[test]
    fn test_long_chain_plan() {
        let mut nodes = IndexMap::new();
        let mut connections = IndexMap::new();
        let ids: Vec<NodeId> = (0..100_000)
            .map(|_| {
                let node = relay(PinType::Numeric);
                let id = node.id;
                nodes.insert(id, node);
                id
            })
            .collect();
        for pair in ids.windows(2) {
            let source = nodes[&pair[0]].pin_handle("Output").unwrap();
            let target = nodes[&pair[1]].pin_handle("Input").unwrap();
            let connection = Connection::new(source, target);
            connections.insert(connection.id, connection);
        }
        // Visit the far end first so the walk has to descend the whole chain
        nodes.reverse();

        let plan = EvaluationPlan::build(&nodes, &connections).unwrap();
        assert_eq!(plan.order(), ids.as_slice());
        assert!(plan.inbound(ids[0]).is_empty());
        assert_eq!(plan.inbound(ids[1]).len(), 1);

        let (source, target) = (ids[ids.len() - 1], ids[0]);
        let back = Connection::new(
            nodes[&source].pin_handle("Output").unwrap(),
            nodes[&target].pin_handle("Input").unwrap(),
        );
        connections.insert(back.id, back);
        assert_eq!(EvaluationPlan::build(&nodes, &connections).unwrap_err(), CycleError);
    }
}
