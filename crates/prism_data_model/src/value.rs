// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property types and values stored in a data model.

use crate::color::{Color, ColorGradient};
use crate::event::DataModelEvent;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a data model property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// Byte
    Byte,
    /// Single precision float
    Float,
    /// Double precision float
    Double,
    /// Boolean
    Bool,
    /// Text
    String,
    /// RGBA color
    Color,
    /// Color gradient
    Gradient,
    /// Pulse-style event
    Event,
    /// Nested object, identified by its type name
    Object(String),
}

impl PropertyType {
    /// Whether values of this type are numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Byte | Self::Float | Self::Double)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A concrete property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Byte
    Byte(u8),
    /// Single precision float
    Float(f32),
    /// Double precision float
    Double(f64),
    /// Boolean
    Bool(bool),
    /// Text
    String(String),
    /// RGBA color
    Color(Color),
    /// Color gradient
    Gradient(ColorGradient),
    /// Event state
    Event(DataModelEvent),
    /// Nested object
    Object(DataObject),
}

impl DataValue {
    /// The property type this value satisfies
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Int(_) => PropertyType::Int,
            Self::Long(_) => PropertyType::Long,
            Self::Byte(_) => PropertyType::Byte,
            Self::Float(_) => PropertyType::Float,
            Self::Double(_) => PropertyType::Double,
            Self::Bool(_) => PropertyType::Bool,
            Self::String(_) => PropertyType::String,
            Self::Color(_) => PropertyType::Color,
            Self::Gradient(_) => PropertyType::Gradient,
            Self::Event(_) => PropertyType::Event,
            Self::Object(object) => PropertyType::Object(object.type_name().to_string()),
        }
    }

    /// Numeric view of the value, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Byte(v) => Some(f64::from(*v)),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// The event state, if this value is an event
    pub fn as_event(&self) -> Option<&DataModelEvent> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }
}

/// A declared property slot: its type plus an optional (nullable) value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProperty {
    /// Declared type
    pub property_type: PropertyType,
    /// Current value; `None` means null
    pub value: Option<DataValue>,
}

impl DataProperty {
    /// Create a null property of the given type
    pub fn null(property_type: PropertyType) -> Self {
        Self {
            property_type,
            value: None,
        }
    }

    /// Create a property holding `value`
    pub fn with_value(value: DataValue) -> Self {
        Self {
            property_type: value.property_type(),
            value: Some(value),
        }
    }
}

/// An object with named, typed properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    type_name: String,
    properties: IndexMap<String, DataProperty>,
}

impl DataObject {
    /// Create an empty object
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: IndexMap::new(),
        }
    }

    /// The object's type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&DataProperty> {
        self.properties.get(name)
    }

    /// Look up a property by name, mutably
    pub fn property_mut(&mut self, name: &str) -> Option<&mut DataProperty> {
        self.properties.get_mut(name)
    }

    /// Insert or replace a property
    pub fn insert(&mut self, name: impl Into<String>, property: DataProperty) -> Option<DataProperty> {
        self.properties.insert(name.into(), property)
    }

    /// Remove a property
    pub fn remove(&mut self, name: &str) -> Option<DataProperty> {
        self.properties.shift_remove(name)
    }

    /// Property names in declaration order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}
