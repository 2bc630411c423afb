// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin definitions for node inputs/outputs.

use crate::collection::CollectionId;
use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::value::PinValue;
use indexmap::IndexSet;
use prism_data_model::PropertyType;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinId(pub Uuid);

impl PinId {
    /// Create a new random pin ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinId {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable address of a pin inside a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinHandle {
    /// Owning node
    pub node: NodeId,
    /// Pin within the node
    pub pin: PinId,
}

impl PinHandle {
    /// Create a handle
    pub fn new(node: NodeId, pin: PinId) -> Self {
        Self { node, pin }
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

/// Data type carried by a pin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    /// Untyped; connects to anything
    Any,
    /// Any number (see [`Numeric`](crate::Numeric))
    Numeric,
    /// Integer number, coercible with the other numeric types
    Integer,
    /// Floating point number, coercible with the other numeric types
    Float,
    /// Boolean
    Bool,
    /// Text
    String,
    /// RGBA color
    Color,
    /// Color gradient
    Gradient,
    /// Host-defined type, e.g. a data model object or event
    Custom(String),
}

impl PinType {
    /// Whether this type belongs to the coercible numeric family
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric | Self::Integer | Self::Float)
    }

    /// Whether values of this type may be absent (`PinValue::None`)
    pub fn is_reference_type(&self) -> bool {
        matches!(self, Self::Any | Self::String | Self::Gradient | Self::Custom(_))
    }

    /// Check if an output of this type can feed an input of type `input`
    pub fn can_connect_to(&self, input: &PinType) -> bool {
        match (self, input) {
            (Self::Any, _) | (_, Self::Any) => true,
            (a, b) if a == b => true,
            (a, b) => a.is_numeric() && b.is_numeric(),
        }
    }

    /// Map a data model property type onto a pin type; numbers become `Numeric`
    pub fn from_property_type(property_type: &PropertyType) -> Self {
        match property_type {
            PropertyType::Int
            | PropertyType::Long
            | PropertyType::Byte
            | PropertyType::Float
            | PropertyType::Double => Self::Numeric,
            PropertyType::Bool => Self::Bool,
            PropertyType::String => Self::String,
            PropertyType::Color => Self::Color,
            PropertyType::Gradient => Self::Gradient,
            PropertyType::Event => Self::Custom("DataModelEvent".to_string()),
            PropertyType::Object(name) => Self::Custom(name.clone()),
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A pin on a node
#[derive(Debug, Clone)]
pub struct Pin {
    /// Unique pin ID
    pub id: PinId,
    /// Owning node
    pub node: NodeId,
    /// Pin name
    pub name: String,
    /// Pin direction
    pub direction: PinDirection,
    /// Collection the pin belongs to, if any
    pub collection: Option<CollectionId>,
    pin_type: PinType,
    value: PinValue,
    connections: IndexSet<ConnectionId>,
}

impl Pin {
    /// Create a new pin holding the default value of its type
    pub fn new(node: NodeId, name: impl Into<String>, direction: PinDirection, pin_type: PinType) -> Self {
        Self {
            id: PinId::new(),
            node,
            name: name.into(),
            direction,
            collection: None,
            value: PinValue::default_for(&pin_type),
            pin_type,
            connections: IndexSet::new(),
        }
    }

    /// Handle addressing this pin
    pub fn handle(&self) -> PinHandle {
        PinHandle::new(self.node, self.id)
    }

    /// Current data type
    pub fn pin_type(&self) -> &PinType {
        &self.pin_type
    }

    /// Current value
    pub fn value(&self) -> &PinValue {
        &self.value
    }

    /// Connections this pin participates in
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.iter().copied()
    }

    /// Whether the pin has at least one connection
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Whether another connection may be attached. Standalone inputs take a
    /// single one; collection members and outputs take any number.
    pub fn has_capacity(&self) -> bool {
        self.direction == PinDirection::Output || self.collection.is_some() || self.connections.is_empty()
    }

    /// Check if a connection from this pin to `input` is valid
    pub fn can_connect(&self, input: &Pin) -> bool {
        self.direction == PinDirection::Output
            && input.direction == PinDirection::Input
            && self.pin_type.can_connect_to(&input.pin_type)
    }

    pub(crate) fn set_value(&mut self, value: PinValue) {
        self.value = value;
    }

    /// Replace the type. The value is reset when it no longer fits.
    pub(crate) fn set_type(&mut self, pin_type: PinType) {
        if !self.value.fits(&pin_type) {
            self.value = PinValue::default_for(&pin_type);
        }
        self.pin_type = pin_type;
    }

    pub(crate) fn attach(&mut self, connection: ConnectionId) {
        self.connections.insert(connection);
    }

    pub(crate) fn detach(&mut self, connection: ConnectionId) -> bool {
        self.connections.shift_remove(&connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_compatibility() {
        assert!(PinType::Numeric.can_connect_to(&PinType::Integer));
        assert!(PinType::Float.can_connect_to(&PinType::Numeric));
        assert!(PinType::Color.can_connect_to(&PinType::Any));
        assert!(PinType::Any.can_connect_to(&PinType::Bool));
        assert!(!PinType::Bool.can_connect_to(&PinType::Numeric));
        assert!(!PinType::Custom("A".into()).can_connect_to(&PinType::Custom("B".into())));
    }

    #[test]
    fn test_property_types_normalize_to_numeric() {
        for ty in [PropertyType::Int, PropertyType::Long, PropertyType::Float, PropertyType::Double] {
            assert_eq!(PinType::from_property_type(&ty), PinType::Numeric);
        }
        assert_eq!(
            PinType::from_property_type(&PropertyType::Object("Keyboard".into())),
            PinType::Custom("Keyboard".into())
        );
    }

    #[test]
    fn test_retype_resets_incompatible_value() {
        let mut pin = Pin::new(NodeId::new(), "Input", PinDirection::Input, PinType::Numeric);
        pin.set_value(PinValue::from(4));
        pin.set_type(PinType::Integer);
        assert_eq!(pin.value(), &PinValue::from(4));

        pin.set_type(PinType::String);
        assert_eq!(pin.value(), &PinValue::None);
    }

    #[test]
    fn test_input_capacity() {
        let mut input = Pin::new(NodeId::new(), "In", PinDirection::Input, PinType::Any);
        let mut output = Pin::new(NodeId::new(), "Out", PinDirection::Output, PinType::Any);
        assert!(output.can_connect(&input));
        assert!(!input.can_connect(&output));

        input.attach(ConnectionId::new());
        output.attach(ConnectionId::new());
        assert!(!input.has_capacity());
        assert!(output.has_capacity());

        let mut member = Pin::new(NodeId::new(), "Values", PinDirection::Input, PinType::Numeric);
        member.collection = Some(CollectionId::new());
        member.attach(ConnectionId::new());
        assert!(member.has_capacity());
    }
}
