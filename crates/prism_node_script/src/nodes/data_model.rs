// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node exposing a live data model property.
//!
//! The output pin follows the resolved type of the bound path. When the type
//! changes the pin is replaced and its connections are carried over where
//! they still fit; when the path stops resolving the pin is removed until it
//! resolves again.

use crate::error::NodeError;
use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeEditor, ScriptEnvironment};
use crate::pin::{PinId, PinType};
use crate::value::PinValue;
use prism_data_model::DataModelPath;
use serde::{Deserialize, Serialize};

/// Persisted binding of a data model node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataModelStorage {
    /// Dotted path, `model_id.property.sub_property`
    pub path: Option<String>,
}

impl DataModelStorage {
    /// Whether `bound` already reflects this storage
    pub(crate) fn matches(&self, bound: Option<&DataModelPath>) -> bool {
        self.path.as_deref() == bound.map(DataModelPath::path)
    }

    pub(crate) fn bind(&self, env: &ScriptEnvironment) -> Option<DataModelPath> {
        self.path
            .as_ref()
            .map(|path| DataModelPath::new(env.data_models.clone(), path.clone()))
    }
}

/// Outputs the value at a data model path
#[derive(Default)]
pub struct DataModelNode {
    storage: DataModelStorage,
    path: Option<DataModelPath>,
    output: Option<(PinId, PinType)>,
}

impl DataModelNode {
    /// Create an unbound node; the output pin appears once a path resolves
    pub fn new() -> Self {
        Self::default()
    }

    /// The bound path
    pub fn path(&self) -> Option<&DataModelPath> {
        self.path.as_ref()
    }

    /// Current output pin and its type
    pub fn output(&self) -> Option<(PinId, &PinType)> {
        self.output.as_ref().map(|(pin, pin_type)| (*pin, pin_type))
    }

    fn sync_output(&mut self, editor: &mut NodeEditor<'_>) {
        let resolved = self
            .path
            .as_ref()
            .and_then(DataModelPath::get_property_type)
            .map(|property_type| PinType::from_property_type(&property_type));

        self.output = match (self.output.take(), resolved) {
            (Some((pin, current)), Some(pin_type)) if current == pin_type => Some((pin, current)),
            (Some((pin, _)), Some(pin_type)) => {
                tracing::debug!(node = ?editor.node_id(), %pin_type, "data model output retyped");
                editor
                    .replace_pin(pin, pin_type.clone())
                    .map(|pin| (pin, pin_type))
            }
            (None, Some(pin_type)) => Some((editor.add_output("Output", pin_type.clone()), pin_type)),
            (Some((pin, _)), None) => {
                tracing::debug!(node = ?editor.node_id(), "data model binding lost, removing output");
                editor.remove_pin(pin);
                None
            }
            (None, None) => None,
        };
    }
}

impl NodeBehavior for DataModelNode {
    fn initialize(&mut self, editor: &mut NodeEditor<'_>, env: &ScriptEnvironment) -> Result<(), NodeError> {
        self.path = self.storage.bind(env);
        self.sync_output(editor);
        Ok(())
    }

    fn refresh(&mut self, editor: &mut NodeEditor<'_>, env: &ScriptEnvironment) {
        if !self.storage.matches(self.path.as_ref()) {
            self.path = self.storage.bind(env);
            self.sync_output(editor);
        } else if self.path.as_mut().and_then(DataModelPath::poll_validation).is_some() {
            self.sync_output(editor);
        }
    }

    fn evaluate(&mut self, io: &mut NodeIo<'_>) -> Result<(), NodeError> {
        if let (Some(path), Some((pin, pin_type))) = (&self.path, &self.output) {
            io.set_output(*pin, PinValue::from_data(path.get_value(), pin_type));
        }
        Ok(())
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

/// Data model property node
pub fn data_model(_editor: &mut NodeEditor<'_>) -> Box<dyn NodeBehavior> {
    Box::new(DataModelNode::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationContext;
    use crate::graph::ScriptGraph;
    use crate::events::{PinEvent, ScriptEvent};
    use crate::node::{Node, NodeId};
    use crate::pin::PinHandle;
    use prism_data_model::{Color, DataModel, DataModelRegistry, DataValue, PropertyType};
    use serde_json::json;
    use std::sync::Arc;

    /// Consumes one input and does nothing with it
    struct Sink;

    impl NodeBehavior for Sink {
        fn evaluate(&mut self, _io: &mut NodeIo<'_>) -> Result<(), NodeError> {
            Ok(())
        }
    }

    fn add_sink(graph: &mut ScriptGraph, pin_type: PinType) -> PinHandle {
        let node = Node::new(NodeId::new(), "sink", "Sink", move |editor| {
            editor.add_input("Input", pin_type);
            Box::new(Sink)
        });
        let id = graph.add_node(node).unwrap();
        graph.node(id).unwrap().pin_handle("Input").unwrap()
    }

    fn setup() -> (ScriptGraph, ScriptEnvironment, Arc<DataModel>, NodeId) {
        let registry = Arc::new(DataModelRegistry::new());
        let model = Arc::new(DataModel::new("audio"));
        model.define("volume", PropertyType::Float).unwrap();
        registry.register(model.clone());
        let env = ScriptEnvironment::new(registry);

        let mut graph = ScriptGraph::default();
        let mut node = Node::new(NodeId::new(), "data_model", "Data Model", data_model);
        node.load_storage(json!({ "path": "audio.volume" })).unwrap();
        let id = graph.add_node(node).unwrap();
        graph.initialize_node(id, &env);
        (graph, env, model, id)
    }

    fn output(graph: &ScriptGraph, id: NodeId) -> Option<(PinId, PinType)> {
        graph
            .node(id)
            .unwrap()
            .behavior::<DataModelNode>()
            .unwrap()
            .output()
            .map(|(pin, pin_type)| (pin, pin_type.clone()))
    }

    #[test]
    fn test_reads_live_value() {
        let (mut graph, env, model, id) = setup();
        let (pin, pin_type) = output(&graph, id).unwrap();
        assert_eq!(pin_type, PinType::Numeric);

        model.set("volume", Some(DataValue::Float(0.25))).unwrap();
        graph.refresh(&env);
        graph.evaluate(&EvaluationContext::for_test(), true);
        let handle = crate::pin::PinHandle::new(id, pin);
        assert_eq!(graph.pin(handle).unwrap().value(), &PinValue::from(0.25));

        // Null value types fall back to their default
        model.set("volume", None).unwrap();
        graph.evaluate(&EvaluationContext::for_test(), true);
        assert_eq!(graph.pin(handle).unwrap().value(), &PinValue::from(0.0));
    }

    #[test]
    fn test_retype_replaces_output() {
        let (mut graph, env, model, id) = setup();
        let (old_pin, _) = output(&graph, id).unwrap();

        model.define("volume", PropertyType::Color).unwrap();
        graph.refresh(&env);
        let (new_pin, pin_type) = output(&graph, id).unwrap();
        assert_eq!(pin_type, PinType::Color);
        assert_ne!(old_pin, new_pin);
        assert_eq!(graph.node(id).unwrap().pins().pins().len(), 1);
    }

    #[test]
    fn test_retype_carries_compatible_connection() {
        let (mut graph, env, model, id) = setup();
        let (old_pin, _) = output(&graph, id).unwrap();
        let sink = add_sink(&mut graph, PinType::Any);
        let connection = graph.connect(PinHandle::new(id, old_pin), sink).unwrap();

        model.define("volume", PropertyType::Color).unwrap();
        model
            .set("volume", Some(DataValue::Color(Color::rgb(255, 128, 0))))
            .unwrap();
        graph.refresh(&env);

        let (new_pin, _) = output(&graph, id).unwrap();
        assert_eq!(graph.connection_count(), 1);
        let moved = graph.connection(connection).unwrap();
        assert_eq!(moved.source, PinHandle::new(id, new_pin));
        assert_eq!(moved.target, sink);
        assert!(graph.pin(PinHandle::new(id, new_pin)).unwrap().is_connected());
        assert_eq!(graph.plan().order().len(), 2);

        graph.evaluate(&EvaluationContext::for_test(), true);
        assert_eq!(graph.pin(sink).unwrap().value(), &PinValue::from(Color::rgb(255, 128, 0)));
    }

    #[test]
    fn test_retype_drops_incompatible_connection() {
        let (mut graph, env, model, id) = setup();
        let (old_pin, _) = output(&graph, id).unwrap();
        let sink = add_sink(&mut graph, PinType::Numeric);
        let connection = graph.connect(PinHandle::new(id, old_pin), sink).unwrap();
        graph.take_events();

        model.define("volume", PropertyType::Color).unwrap();
        graph.refresh(&env);

        assert_eq!(graph.connection_count(), 0);
        assert!(!graph.pin(sink).unwrap().is_connected());
        let disconnected: Vec<PinHandle> = graph
            .take_events()
            .into_iter()
            .filter_map(|event| match event {
                ScriptEvent::Pin(PinEvent::Disconnected { pin, connection: dropped, .. }) => {
                    assert_eq!(dropped, connection);
                    Some(pin)
                }
                _ => None,
            })
            .collect();
        assert_eq!(disconnected, vec![sink]);
    }

    #[test]
    fn test_binding_loss_and_recovery() {
        let (mut graph, env, model, id) = setup();
        model.remove("volume").unwrap();
        graph.refresh(&env);
        assert!(output(&graph, id).is_none());
        assert!(graph.node(id).unwrap().pins().pins().is_empty());
        let report = graph.evaluate(&EvaluationContext::for_test(), true);
        assert!(report.broken.is_empty());

        model.define("volume", PropertyType::Int).unwrap();
        graph.refresh(&env);
        assert_eq!(output(&graph, id).unwrap().1, PinType::Numeric);
    }

    #[test]
    fn test_dispose_releases_path() {
        let (mut graph, env, _model, _id) = setup();
        assert_eq!(env.data_models.live_path_count(), 1);
        graph.dispose();
        assert_eq!(env.data_models.live_path_count(), 0);
    }
}
