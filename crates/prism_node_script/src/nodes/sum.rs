// SPDX-License-Identifier: MIT OR Apache-2.0
//! Adds up a resizable list of numbers.

use crate::collection::CollectionId;
use crate::error::NodeError;
use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeEditor};
use crate::numeric::Numeric;
use crate::pin::{PinDirection, PinId, PinType};

/// Sums every pin of its `Values` collection
pub struct SumNode {
    values: CollectionId,
    output: PinId,
}

impl SumNode {
    /// Declare the pins: two `Values` inputs and a `Sum` output
    pub fn new(editor: &mut NodeEditor<'_>) -> Self {
        Self {
            values: editor.add_collection("Values", PinDirection::Input, PinType::Numeric, 2),
            output: editor.add_output("Sum", PinType::Numeric),
        }
    }
}

impl NodeBehavior for SumNode {
    fn evaluate(&mut self, io: &mut NodeIo<'_>) -> Result<(), NodeError> {
        let values = io
            .collection(self.values)
            .ok_or_else(|| NodeError::Evaluation("Values collection missing".into()))?;
        let sum: Numeric = values
            .pins()
            .iter()
            .filter_map(|pin| pin.value().as_numeric())
            .sum();
        io.set_output(self.output, sum);
        Ok(())
    }
}
