// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.

pub mod data_model;
pub mod data_model_event;
pub mod easing;
pub mod exit;
pub mod static_value;
pub mod sum;

use crate::registry::{NodeCategory, NodeDescriptor, NodeRegistry};

/// Type name of every script's exit node
pub const EXIT_NODE_TYPE: &str = "exit";
/// Constant number
pub const STATIC_NUMERIC: &str = "static_numeric";
/// Constant boolean
pub const STATIC_BOOL: &str = "static_bool";
/// Constant text
pub const STATIC_STRING: &str = "static_string";
/// Constant color
pub const STATIC_COLOR: &str = "static_color";
/// Sum of numbers
pub const SUM: &str = "sum";
/// Numeric transition
pub const NUMERIC_EASING: &str = "numeric_easing";
/// Color transition
pub const COLOR_EASING: &str = "color_easing";
/// Gradient transition
pub const GRADIENT_EASING: &str = "gradient_easing";
/// Data model property
pub const DATA_MODEL: &str = "data_model";
/// Data model event cycler
pub const DATA_MODEL_EVENT: &str = "data_model_event";

/// Create a registry holding every built-in node type
pub fn builtin_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    registry.register(
        NodeDescriptor::new(STATIC_NUMERIC, "Number", NodeCategory::Static, static_value::static_numeric)
            .with_description("Outputs a configured number"),
    );
    registry.register(
        NodeDescriptor::new(STATIC_BOOL, "Boolean", NodeCategory::Static, static_value::static_bool)
            .with_description("Outputs a configured boolean"),
    );
    registry.register(
        NodeDescriptor::new(STATIC_STRING, "Text", NodeCategory::Static, static_value::static_string)
            .with_description("Outputs a configured text"),
    );
    registry.register(
        NodeDescriptor::new(STATIC_COLOR, "Color", NodeCategory::Static, static_value::static_color)
            .with_description("Outputs a configured color"),
    );

    registry.register(
        NodeDescriptor::new(SUM, "Sum", NodeCategory::Math, |editor| Box::new(sum::SumNode::new(editor)))
            .with_description("Adds up all connected values"),
    );

    // Transitions
    registry.register(
        NodeDescriptor::new(NUMERIC_EASING, "Numeric Easing", NodeCategory::Transition, easing::numeric_easing)
            .with_description("Eases a number towards its input"),
    );
    registry.register(
        NodeDescriptor::new(COLOR_EASING, "Color Easing", NodeCategory::Transition, easing::color_easing)
            .with_description("Eases a color towards its input"),
    );
    registry.register(
        NodeDescriptor::new(GRADIENT_EASING, "Gradient Easing", NodeCategory::Transition, easing::gradient_easing)
            .with_description("Eases a gradient towards its input"),
    );

    // Data model
    registry.register(
        NodeDescriptor::new(DATA_MODEL, "Data Model", NodeCategory::DataModel, data_model::data_model)
            .with_description("Outputs a data model property"),
    );
    registry.register(
        NodeDescriptor::new(
            DATA_MODEL_EVENT,
            "Data Model Event Cycle",
            NodeCategory::DataModel,
            data_model_event::data_model_event,
        )
        .with_description("Cycles through values each time a data model event fires"),
    );

    registry
}
