// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values that flow through pins.

use crate::numeric::Numeric;
use crate::pin::PinType;
use prism_data_model::{Color, ColorGradient, DataValue};

/// Value held by a pin
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PinValue {
    /// No value (null reference, unbound pin)
    #[default]
    None,
    /// Number
    Numeric(Numeric),
    /// Boolean
    Bool(bool),
    /// Text
    String(String),
    /// RGBA color
    Color(Color),
    /// Color gradient
    Gradient(ColorGradient),
    /// Opaque host value (data model objects and events)
    Data(DataValue),
}

impl PinValue {
    /// The default value for a pin of type `pin_type`.
    ///
    /// Reference types default to [`PinValue::None`]; value types to their zero.
    pub fn default_for(pin_type: &PinType) -> Self {
        match pin_type {
            PinType::Numeric | PinType::Float => Self::Numeric(Numeric::ZERO),
            PinType::Integer => Self::Numeric(Numeric::from(0)),
            PinType::Bool => Self::Bool(false),
            PinType::Color => Self::Color(Color::TRANSPARENT),
            PinType::Any | PinType::String | PinType::Gradient | PinType::Custom(_) => Self::None,
        }
    }

    /// Whether this value may be held by a pin of type `pin_type`
    pub fn fits(&self, pin_type: &PinType) -> bool {
        match (self, pin_type) {
            (_, PinType::Any) => true,
            (Self::None, ty) => ty.is_reference_type(),
            (Self::Numeric(_), ty) => ty.is_numeric(),
            (Self::Bool(_), PinType::Bool)
            | (Self::String(_), PinType::String)
            | (Self::Color(_), PinType::Color)
            | (Self::Gradient(_), PinType::Gradient) => true,
            (Self::Data(_), PinType::Custom(_)) => true,
            _ => false,
        }
    }

    /// Build a pin value from a data model value.
    ///
    /// Null is kept as [`PinValue::None`] only for reference types; value
    /// types fall back to their default.
    pub fn from_data(value: Option<DataValue>, pin_type: &PinType) -> Self {
        let Some(value) = value else {
            return Self::default_for(pin_type);
        };
        if let Some(number) = value.as_f64() {
            let numeric = match value {
                DataValue::Float(_) => Numeric::from(number as f32),
                DataValue::Double(_) => Numeric::from(number),
                _ => Numeric::with_kind(number, crate::numeric::NumericKind::Int),
            };
            return Self::Numeric(numeric);
        }
        match value {
            DataValue::Bool(v) => Self::Bool(v),
            DataValue::String(v) => Self::String(v),
            DataValue::Color(v) => Self::Color(v),
            DataValue::Gradient(v) => Self::Gradient(v),
            other => Self::Data(other),
        }
    }

    /// Whether this is [`PinValue::None`]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Extract as number
    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            Self::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract as text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Extract as color
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract as gradient
    pub fn as_gradient(&self) -> Option<&ColorGradient> {
        match self {
            Self::Gradient(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Numeric> for PinValue {
    fn from(value: Numeric) -> Self {
        Self::Numeric(value)
    }
}

impl From<i32> for PinValue {
    fn from(value: i32) -> Self {
        Self::Numeric(Numeric::from(value))
    }
}

impl From<f64> for PinValue {
    fn from(value: f64) -> Self {
        Self::Numeric(Numeric::from(value))
    }
}

impl From<bool> for PinValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PinValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PinValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Color> for PinValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<ColorGradient> for PinValue {
    fn from(value: ColorGradient) -> Self {
        Self::Gradient(value)
    }
}
