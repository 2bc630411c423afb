// SPDX-License-Identifier: MIT OR Apache-2.0
//! Round-robin over a list of values, advanced by a data model event.
//!
//! The `Cycle Values` collection starts untyped. The first connection to
//! any of its pins adopts the peer's type for the whole collection and the
//! output; once no member is connected any more both revert to untyped.

use super::data_model::DataModelStorage;
use crate::collection::CollectionId;
use crate::error::NodeError;
use crate::evaluation::NodeIo;
use crate::events::PinEvent;
use crate::node::{NodeBehavior, NodeEditor, ScriptEnvironment};
use crate::pin::{PinDirection, PinHandle, PinId, PinType};
use crate::value::PinValue;
use prism_data_model::{DataModelEvent, DataModelPath, DataValue};
use std::time::SystemTime;

/// Name of the cycle value collection
pub const CYCLE_VALUES: &str = "Cycle Values";

/// Outputs the next cycle value every time the bound event fires
pub struct DataModelEventNode {
    storage: DataModelStorage,
    path: Option<DataModelPath>,
    values: CollectionId,
    output: PinId,
    last_trigger: Option<SystemTime>,
    current_index: Option<usize>,
}

impl DataModelEventNode {
    /// Declare the output and two untyped cycle values
    pub fn new(editor: &mut NodeEditor<'_>) -> Self {
        Self {
            storage: DataModelStorage::default(),
            path: None,
            values: editor.add_collection(CYCLE_VALUES, PinDirection::Input, PinType::Any, 2),
            output: editor.add_output("Output", PinType::Any),
            last_trigger: None,
            current_index: None,
        }
    }

    /// The bound event path
    pub fn path(&self) -> Option<&DataModelPath> {
        self.path.as_ref()
    }

    /// Index of the cycle value currently output; `None` before the first trigger
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    fn event(&self) -> Option<DataModelEvent> {
        match self.path.as_ref()?.get_value()? {
            DataValue::Event(event) => Some(event),
            _ => None,
        }
    }

    fn bind(&mut self, env: &ScriptEnvironment) {
        self.path = self.storage.bind(env);
        self.last_trigger = self.event().and_then(|event| event.last_trigger);
        self.current_index = None;
    }

    fn owns(&self, editor: &NodeEditor<'_>, pin: PinHandle) -> bool {
        editor
            .collection(self.values)
            .is_some_and(|c| c.position(pin.pin).is_some())
    }

    fn retype(&self, editor: &mut NodeEditor<'_>, pin_type: PinType) {
        tracing::debug!(node = ?editor.node_id(), %pin_type, "cycle values retyped");
        editor.set_collection_type(self.values, pin_type.clone());
        editor.set_pin_type(self.output, pin_type);
    }

    fn revert_if_unconnected(&self, editor: &mut NodeEditor<'_>) {
        let Some(values) = editor.collection(self.values) else {
            return;
        };
        if !values.any_connected() && values.pin_type() != &PinType::Any {
            self.retype(editor, PinType::Any);
        }
    }
}

impl NodeBehavior for DataModelEventNode {
    fn initialize(&mut self, _editor: &mut NodeEditor<'_>, env: &ScriptEnvironment) -> Result<(), NodeError> {
        self.bind(env);
        Ok(())
    }

    fn refresh(&mut self, _editor: &mut NodeEditor<'_>, env: &ScriptEnvironment) {
        if !self.storage.matches(self.path.as_ref()) {
            self.bind(env);
        } else if let Some(path) = self.path.as_mut() {
            path.poll_validation();
        }
    }

    fn evaluate(&mut self, io: &mut NodeIo<'_>) -> Result<(), NodeError> {
        let len = io.collection(self.values).map_or(0, |c| c.len());
        if len == 0 {
            io.set_output(self.output, PinValue::None);
            return Ok(());
        }

        if let Some(event) = self.event().filter(|e| e.triggered_since(self.last_trigger)) {
            self.last_trigger = event.last_trigger;
            self.current_index = Some(self.current_index.map_or(0, |index| (index + 1) % len));
        }

        let index = self.current_index.unwrap_or(0) % len;
        let value = io
            .collection(self.values)
            .and_then(|c| c.get(index))
            .map(|pin| pin.value().clone())
            .unwrap_or_default();
        io.set_output(self.output, value);
        Ok(())
    }

    fn on_pin_event(&mut self, event: &PinEvent, editor: &mut NodeEditor<'_>) {
        match event {
            PinEvent::Connected { pin, peer_type, .. } if self.owns(editor, *pin) => {
                let untyped = editor
                    .collection(self.values)
                    .is_some_and(|c| c.pin_type() == &PinType::Any);
                if untyped && peer_type != &PinType::Any {
                    self.retype(editor, peer_type.clone());
                }
            }
            PinEvent::Disconnected { pin, .. } if self.owns(editor, *pin) => {
                self.revert_if_unconnected(editor);
            }
            PinEvent::Removed {
                collection: Some(collection),
                ..
            } if *collection == self.values => {
                self.revert_if_unconnected(editor);
            }
            _ => {}
        }
    }

    fn save_storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.storage).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<(), NodeError> {
        self.storage = serde_json::from_value(storage)?;
        Ok(())
    }

    fn dispose(&mut self) {
        self.path = None;
    }
}

/// Data model event node
pub fn data_model_event(editor: &mut NodeEditor<'_>) -> Box<dyn NodeBehavior> {
    Box::new(DataModelEventNode::new(editor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationContext;
    use crate::graph::ScriptGraph;
    use crate::node::{Node, NodeId};
    use crate::nodes::static_value::static_numeric;
    use prism_data_model::{DataModel, DataModelRegistry, PropertyType};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        graph: ScriptGraph,
        model: Arc<DataModel>,
        node: NodeId,
        values: CollectionId,
        output: PinHandle,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(DataModelRegistry::new());
        let model = Arc::new(DataModel::new("audio"));
        model.define("beat", PropertyType::Event).unwrap();
        registry.register(model.clone());
        let env = ScriptEnvironment::new(registry);

        let mut graph = ScriptGraph::default();
        let mut node = Node::new(NodeId::new(), "data_model_event", "Event", data_model_event);
        node.load_storage(json!({ "path": "audio.beat" })).unwrap();
        let node = graph.add_node(node).unwrap();
        graph.initialize_node(node, &env);
        let values = graph.node(node).unwrap().pins().collection_by_name(CYCLE_VALUES).unwrap().id;
        let output = graph.node(node).unwrap().pin_handle("Output").unwrap();
        Fixture {
            graph,
            model,
            node,
            values,
            output,
        }
    }

    fn cycle_pins(f: &Fixture) -> Vec<PinHandle> {
        f.graph
            .node(f.node)
            .unwrap()
            .pins()
            .collection(f.values)
            .unwrap()
            .pins()
            .iter()
            .map(|p| p.handle())
            .collect()
    }

    fn collection_type(f: &Fixture) -> PinType {
        f.graph
            .node(f.node)
            .unwrap()
            .pins()
            .collection(f.values)
            .unwrap()
            .pin_type()
            .clone()
    }

    #[test]
    fn test_cycles_on_each_trigger() {
        let mut f = fixture();
        f.graph.add_collection_pin(f.node, f.values).unwrap();
        for (pin, value) in cycle_pins(&f).into_iter().zip([10, 20, 30]) {
            f.graph.set_input_value(pin, PinValue::from(value)).unwrap();
        }

        let context = EvaluationContext::for_test();
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut outputs = Vec::new();
        for step in 0..4u64 {
            f.model
                .trigger_at("beat", start + Duration::from_secs(step))
                .unwrap();
            f.graph.evaluate(&context, true);
            outputs.push(f.graph.pin(f.output).unwrap().value().clone());
            // Without a new trigger the output holds
            f.graph.evaluate(&context, true);
            assert_eq!(f.graph.pin(f.output).unwrap().value(), outputs.last().unwrap());
        }
        let expected: Vec<PinValue> = [10, 20, 30, 10].into_iter().map(PinValue::from).collect();
        assert_eq!(outputs, expected);
    }

    #[test]
    fn test_outputs_first_value_before_any_trigger() {
        let mut f = fixture();
        let pins = cycle_pins(&f);
        f.graph.set_input_value(pins[0], PinValue::from("idle")).unwrap();
        f.graph.evaluate(&EvaluationContext::for_test(), true);
        assert_eq!(f.graph.pin(f.output).unwrap().value(), &PinValue::from("idle"));
    }

    #[test]
    fn test_connection_drives_collection_type() {
        let mut f = fixture();
        let source = f
            .graph
            .add_node(Node::new(NodeId::new(), "static_numeric", "Number", static_numeric))
            .unwrap();
        let source_out = f.graph.node(source).unwrap().pin_handle("Output").unwrap();
        let pins = cycle_pins(&f);

        let connection = f.graph.connect(source_out, pins[1]).unwrap();
        assert_eq!(collection_type(&f), PinType::Numeric);
        assert_eq!(f.graph.pin(f.output).unwrap().pin_type(), &PinType::Numeric);
        assert!(f
            .graph
            .node(f.node)
            .unwrap()
            .pins()
            .collection(f.values)
            .unwrap()
            .pins()
            .iter()
            .all(|p| p.pin_type() == &PinType::Numeric));

        f.graph.disconnect(connection).unwrap();
        assert_eq!(collection_type(&f), PinType::Any);
        assert_eq!(f.graph.pin(f.output).unwrap().pin_type(), &PinType::Any);
    }

    #[test]
    fn test_removing_connected_pin_reverts_type() {
        let mut f = fixture();
        let source = f
            .graph
            .add_node(Node::new(NodeId::new(), "static_numeric", "Number", static_numeric))
            .unwrap();
        let source_out = f.graph.node(source).unwrap().pin_handle("Output").unwrap();
        let pins = cycle_pins(&f);
        f.graph.connect(source_out, pins[0]).unwrap();

        f.graph.remove_collection_pin(f.node, f.values, pins[0].pin).unwrap();
        assert_eq!(f.graph.connection_count(), 0);
        assert_eq!(collection_type(&f), PinType::Any);
    }
}
