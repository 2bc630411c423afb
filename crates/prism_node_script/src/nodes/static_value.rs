// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant value nodes.

use crate::error::NodeError;
use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeEditor};
use crate::numeric::Numeric;
use crate::pin::{PinId, PinType};
use crate::value::PinValue;
use prism_data_model::Color;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Storage<T> {
    value: T,
}

/// Outputs a value held in the node's storage
pub struct StaticValueNode<T> {
    output: PinId,
    value: T,
}

impl<T> StaticValueNode<T> {
    /// Declare the output pin and start from `value`
    pub fn new(editor: &mut NodeEditor<'_>, pin_type: PinType, value: T) -> Self {
        Self {
            output: editor.add_output("Output", pin_type),
            value,
        }
    }

    /// The stored value
    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> NodeBehavior for StaticValueNode<T>
where
    T: Clone + Into<PinValue> + Serialize + DeserializeOwned + Send + 'static,
{
    fn evaluate(&mut self, io: &mut NodeIo<'_>) -> Result<(), NodeError> {
        io.set_output(self.output, self.value.clone());
        Ok(())
    }

    fn save_storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(Storage { value: &self.value }).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<(), NodeError> {
        let storage: Storage<T> = serde_json::from_value(storage)?;
        self.value = storage.value;
        Ok(())
    }
}

/// Constant number
pub fn static_numeric(editor: &mut NodeEditor<'_>) -> Box<dyn NodeBehavior> {
    Box::new(StaticValueNode::new(editor, PinType::Numeric, Numeric::ZERO))
}

/// Constant boolean
pub fn static_bool(editor: &mut NodeEditor<'_>) -> Box<dyn NodeBehavior> {
    Box::new(StaticValueNode::new(editor, PinType::Bool, false))
}

/// Constant text
pub fn static_string(editor: &mut NodeEditor<'_>) -> Box<dyn NodeBehavior> {
    Box::new(StaticValueNode::new(editor, PinType::String, String::new()))
}

/// Constant color
pub fn static_color(editor: &mut NodeEditor<'_>) -> Box<dyn NodeBehavior> {
    Box::new(StaticValueNode::new(editor, PinType::Color, Color::WHITE))
}
