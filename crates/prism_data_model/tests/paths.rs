// SPDX-License-Identifier: MIT OR Apache-2.0
//! Path resolution against models that change shape at runtime.

use prism_data_model::{
    Color, ColorGradient, DataModel, DataModelError, DataModelPath, DataModelRegistry, DataValue, GradientStop,
    PropertyType,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn keyboard() -> (Arc<DataModelRegistry>, Arc<DataModel>) {
    let registry = Arc::new(DataModelRegistry::new());
    let model = Arc::new(DataModel::new("keyboard"));
    model.define("caps_lock", PropertyType::Bool).unwrap();
    model.define("layout.name", PropertyType::String).unwrap();
    model.define("layout.accent", PropertyType::Color).unwrap();
    model.define("key_pressed", PropertyType::Event).unwrap();
    registry.register(model.clone());
    (registry, model)
}

#[test]
fn test_nested_paths_resolve() {
    let (registry, model) = keyboard();
    model
        .set("layout.accent", Some(DataValue::Color(Color::rgb(0, 128, 255))))
        .unwrap();

    let accent = DataModelPath::new(registry.clone(), "keyboard.layout.accent");
    assert!(accent.is_valid());
    assert_eq!(accent.model_id(), "keyboard");
    assert_eq!(accent.get_property_type(), Some(PropertyType::Color));
    assert_eq!(accent.get_value(), Some(DataValue::Color(Color::rgb(0, 128, 255))));

    let name = DataModelPath::new(registry.clone(), "keyboard.layout.name");
    assert_eq!(name.get_value(), None);

    let missing = DataModelPath::new(registry, "keyboard.layout.font");
    assert!(!missing.is_valid());
}

#[test]
fn test_poll_only_reports_shape_changes() {
    let (registry, model) = keyboard();
    let mut path = DataModelPath::new(registry.clone(), "keyboard.caps_lock");
    assert_eq!(path.poll_validation(), None);

    // Value changes are not shape changes
    model.set("caps_lock", Some(DataValue::Bool(true))).unwrap();
    assert_eq!(path.poll_validation(), None);
    assert_eq!(path.get_value(), Some(DataValue::Bool(true)));

    model.define("caps_lock", PropertyType::Int).unwrap();
    let validation = path.poll_validation().unwrap();
    assert!(validation.type_changed());
    assert_eq!(validation.resolved_type, Some(PropertyType::Int));

    registry.unregister("keyboard");
    let validation = path.poll_validation().unwrap();
    assert_eq!(validation.resolved_type, None);
    assert!(!path.is_valid());

    registry.register(model);
    assert_eq!(path.poll_validation().unwrap().resolved_type, Some(PropertyType::Int));
}

#[test]
fn test_events_record_triggers() {
    let (registry, model) = keyboard();
    let path = DataModelPath::new(registry, "keyboard.key_pressed");
    let at = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
    model.trigger_at("key_pressed", at).unwrap();
    model.trigger_at("key_pressed", at + Duration::from_secs(1)).unwrap();

    let Some(DataValue::Event(event)) = path.get_value() else {
        panic!("expected an event");
    };
    assert_eq!(event.trigger_count, 2);
    assert_eq!(event.last_trigger, Some(at + Duration::from_secs(1)));
    assert!(matches!(
        model.trigger_at("caps_lock", at),
        Err(DataModelError::NotAnEvent(_))
    ));
}

#[test]
fn test_live_paths_are_counted() {
    let (registry, _model) = keyboard();
    let first = DataModelPath::new(registry.clone(), "keyboard.caps_lock");
    let second = DataModelPath::new(registry.clone(), "keyboard.layout.name");
    assert_eq!(registry.live_path_count(), 2);
    drop(first);
    assert_eq!(registry.live_path_count(), 1);
    drop(second);
    assert_eq!(registry.live_path_count(), 0);
}

#[test]
fn test_gradient_values_round_trip_through_model() {
    let (registry, model) = keyboard();
    model.define("layout.backlight", PropertyType::Gradient).unwrap();
    let gradient = ColorGradient::new(vec![
        GradientStop::new(Color::rgb(255, 0, 0), 1.0),
        GradientStop::new(Color::rgb(0, 0, 255), 0.0),
    ]);
    model
        .set("layout.backlight", Some(DataValue::Gradient(gradient.clone())))
        .unwrap();

    let path = DataModelPath::new(registry, "keyboard.layout.backlight");
    assert_eq!(path.get_value(), Some(DataValue::Gradient(gradient.clone())));
    assert_eq!(gradient.stops()[0].color, Color::rgb(0, 0, 255));
    assert_eq!(gradient.color_at(0.5), Color::rgb(128, 0, 128));
}
