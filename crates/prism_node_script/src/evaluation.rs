// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.

use crate::collection::{CollectionId, PinCollection};
use crate::error::NodeError;
use crate::node::{NodeId, PinSet};
use crate::numeric::Numeric;
use crate::pin::{Pin, PinId};
use crate::value::PinValue;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Source of wall-clock time for nodes that track real elapsed time
pub trait Clock: Send + Sync {
    /// The current instant
    fn now(&self) -> Instant;
}

/// The system monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Per-pass information handed to every node
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext {
    delta_time: Duration,
    now: Instant,
    frame: u64,
}

impl EvaluationContext {
    /// Create a context
    pub fn new(delta_time: Duration, now: Instant, frame: u64) -> Self {
        Self {
            delta_time,
            now,
            frame,
        }
    }

    /// Logical time since the previous pass, as given by the host
    pub fn delta_time(&self) -> Duration {
        self.delta_time
    }

    /// Wall-clock time of this pass
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Pass counter, starting at 1
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self::new(Duration::from_millis(16), Instant::now(), 1)
    }
}

/// Result of one evaluation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    /// Nodes evaluated, in evaluation order
    pub evaluated: Vec<NodeId>,
    /// Nodes whose evaluation failed during this pass
    pub broken: Vec<NodeId>,
}

static NO_VALUE: PinValue = PinValue::None;

/// A node's window onto its own pins during evaluation.
///
/// Input values were copied from upstream outputs before the call. Output
/// writes are staged and only committed when evaluation succeeds.
pub struct NodeIo<'a> {
    node: NodeId,
    pins: &'a PinSet,
    context: &'a EvaluationContext,
    writes: Vec<(PinId, PinValue)>,
}

impl<'a> NodeIo<'a> {
    pub(crate) fn new(node: NodeId, pins: &'a PinSet, context: &'a EvaluationContext) -> Self {
        Self {
            node,
            pins,
            context,
            writes: Vec::new(),
        }
    }

    /// The node being evaluated
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// The pass context
    pub fn context(&self) -> &EvaluationContext {
        self.context
    }

    /// Wall-clock time of this pass
    pub fn now(&self) -> Instant {
        self.context.now()
    }

    /// Host-supplied time since the previous pass
    pub fn delta_time(&self) -> Duration {
        self.context.delta_time()
    }

    /// Look up a pin
    pub fn pin(&self, pin: PinId) -> Option<&Pin> {
        self.pins.find(pin)
    }

    /// Look up a collection
    pub fn collection(&self, collection: CollectionId) -> Option<&PinCollection> {
        self.pins.collection(collection)
    }

    /// Current value of an input pin; [`PinValue::None`] for unknown pins
    pub fn input(&self, pin: PinId) -> &PinValue {
        self.pins.find(pin).map_or(&NO_VALUE, Pin::value)
    }

    /// Input as a number
    pub fn numeric(&self, pin: PinId) -> Option<Numeric> {
        self.input(pin).as_numeric()
    }

    /// Input as a number, or a [`NodeError::MissingInput`] naming the pin
    pub fn require_numeric(&self, pin: PinId) -> Result<Numeric, NodeError> {
        self.numeric(pin).ok_or_else(|| self.missing(pin))
    }

    /// Whether a pin has a connection
    pub fn is_connected(&self, pin: PinId) -> bool {
        self.pins.find(pin).is_some_and(Pin::is_connected)
    }

    /// Value of an output pin, including writes staged in this pass
    pub fn output(&self, pin: PinId) -> &PinValue {
        self.writes
            .iter()
            .rev()
            .find(|(id, _)| *id == pin)
            .map_or_else(|| self.input(pin), |(_, value)| value)
    }

    /// Stage a value for an output pin
    pub fn set_output(&mut self, pin: PinId, value: impl Into<PinValue>) {
        self.writes.push((pin, value.into()));
    }

    /// Build a [`NodeError::MissingInput`] for a pin
    pub fn missing(&self, pin: PinId) -> NodeError {
        let name = self.pins.find(pin).map_or_else(|| format!("{pin:?}"), |p| p.name.clone());
        NodeError::MissingInput(name)
    }

    pub(crate) fn into_writes(self) -> Vec<(PinId, PinValue)> {
        self.writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{EditLog, NodeEditor};
    use crate::pin::PinType;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn test_staged_output_shadows_current() {
        let mut pins = PinSet::default();
        let mut log = EditLog::default();
        let node = NodeId::new();
        let (input, output) = {
            let mut editor = NodeEditor::new(node, &mut pins, &mut log);
            (
                editor.add_input_with_value("In", PinType::Numeric, PinValue::from(3)),
                editor.add_output("Out", PinType::Numeric),
            )
        };
        let context = EvaluationContext::for_test();
        let mut io = NodeIo::new(node, &pins, &context);

        assert_eq!(io.require_numeric(input).unwrap(), Numeric::from(3));
        assert_eq!(io.output(output), &PinValue::from(0.0));
        io.set_output(output, 9);
        assert_eq!(io.output(output), &PinValue::from(9));
        assert!(!io.is_connected(input));
        assert!(matches!(io.require_numeric(PinId::new()), Err(NodeError::MissingInput(_))));
    }
}
