// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host-owned data models for Prism node scripts.
//!
//! Plugins publish data models (audio levels, keyboard state, game data, ...)
//! as trees of typed properties. Node scripts bind to those properties through
//! [`DataModelPath`]s and react to [`DataModelEvent`] pulses.

pub mod color;
pub mod error;
pub mod event;
pub mod model;
pub mod path;
pub mod value;

pub use color::{Color, ColorGradient, GradientStop};
pub use error::DataModelError;
pub use event::DataModelEvent;
pub use model::{DataModel, DataModelRegistry};
pub use path::{DataModelPath, PathValidation};
pub use value::{DataObject, DataProperty, DataValue, PropertyType};
