// SPDX-License-Identifier: MIT OR Apache-2.0
//! The script's result sink.

use crate::error::NodeError;
use crate::evaluation::NodeIo;
use crate::node::{Node, NodeBehavior, NodeId};
use crate::pin::{PinId, PinType};

use super::EXIT_NODE_TYPE;

/// Holds the script result on its single `Input` pin
pub struct ExitNode {
    input: PinId,
}

impl ExitNode {
    /// The input pin carrying the result
    pub fn input(&self) -> PinId {
        self.input
    }
}

impl NodeBehavior for ExitNode {
    fn evaluate(&mut self, _io: &mut NodeIo<'_>) -> Result<(), NodeError> {
        Ok(())
    }
}

/// Build the exit node for a script producing `result_type`
pub(crate) fn exit_node(id: NodeId, result_type: PinType) -> Node {
    Node::new(id, EXIT_NODE_TYPE, "Exit", |editor| {
        Box::new(ExitNode {
            input: editor.add_input("Input", result_type),
        })
    })
    .with_description("Final value of the script")
    .into_exit()
}
