// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resizable groups of same-typed pins.

use crate::node::NodeId;
use crate::pin::{Pin, PinDirection, PinId, PinType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a pin collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub Uuid);

impl CollectionId {
    /// Create a new random collection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered, resizable sequence of pins sharing one type
#[derive(Debug, Clone)]
pub struct PinCollection {
    /// Unique collection ID
    pub id: CollectionId,
    /// Owning node
    pub node: NodeId,
    /// Collection name
    pub name: String,
    /// Direction of every member pin
    pub direction: PinDirection,
    pin_type: PinType,
    pins: Vec<Pin>,
}

impl PinCollection {
    /// Create an empty collection
    pub fn new(node: NodeId, name: impl Into<String>, direction: PinDirection, pin_type: PinType) -> Self {
        Self {
            id: CollectionId::new(),
            node,
            name: name.into(),
            direction,
            pin_type,
            pins: Vec::new(),
        }
    }

    /// Shared type of every member
    pub fn pin_type(&self) -> &PinType {
        &self.pin_type
    }

    /// Member pins in order
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Number of member pins
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Whether the collection has no pins
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Member pin at `index`
    pub fn get(&self, index: usize) -> Option<&Pin> {
        self.pins.get(index)
    }

    /// Position of a member pin
    pub fn position(&self, pin: PinId) -> Option<usize> {
        self.pins.iter().position(|p| p.id == pin)
    }

    /// Whether any member pin is connected
    pub fn any_connected(&self) -> bool {
        self.pins.iter().any(Pin::is_connected)
    }

    /// Append a new pin of the collection type, named after its position
    pub(crate) fn add_pin(&mut self) -> PinId {
        let name = format!("{} {}", self.name, self.pins.len() + 1);
        let mut pin = Pin::new(self.node, name, self.direction, self.pin_type.clone());
        pin.collection = Some(self.id);
        let id = pin.id;
        self.pins.push(pin);
        id
    }

    pub(crate) fn remove_pin(&mut self, pin: PinId) -> Option<Pin> {
        let index = self.position(pin)?;
        Some(self.pins.remove(index))
    }

    /// Retype the collection and every member pin
    pub(crate) fn set_type(&mut self, pin_type: PinType) {
        for pin in &mut self.pins {
            pin.set_type(pin_type.clone());
        }
        self.pin_type = pin_type;
    }

    pub(crate) fn pin_mut(&mut self, pin: PinId) -> Option<&mut Pin> {
        self.pins.iter_mut().find(|p| p.id == pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PinValue;

    #[test]
    fn test_add_and_remove() {
        let mut collection = PinCollection::new(NodeId::new(), "Values", PinDirection::Input, PinType::Numeric);
        let first = collection.add_pin();
        let second = collection.add_pin();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(1).unwrap().name, "Values 2");
        assert_eq!(collection.get(0).unwrap().collection, Some(collection.id));

        assert!(collection.remove_pin(first).is_some());
        assert_eq!(collection.position(second), Some(0));
        assert!(collection.remove_pin(first).is_none());
    }

    #[test]
    fn test_set_type_retypes_members() {
        let mut collection = PinCollection::new(NodeId::new(), "Cycle", PinDirection::Input, PinType::Any);
        let pin = collection.add_pin();
        collection.pin_mut(pin).unwrap().set_value(PinValue::from("text"));

        collection.set_type(PinType::Numeric);
        assert_eq!(collection.pin_type(), &PinType::Numeric);
        assert_eq!(collection.get(0).unwrap().pin_type(), &PinType::Numeric);
        assert_eq!(collection.get(0).unwrap().value(), &PinValue::Numeric(crate::Numeric::ZERO));
    }
}
