// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data models and the registry that exposes them to scripts.

use crate::error::{DataModelError, Result};
use crate::value::{DataObject, DataProperty, DataValue, PropertyType};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// A host-owned tree of typed properties, addressed by dotted paths.
///
/// Values may change at any time. Structural changes (defining or removing
/// properties) bump the shape generation so that bound paths revalidate.
#[derive(Debug)]
pub struct DataModel {
    id: String,
    root: RwLock<DataObject>,
    generation: AtomicU64,
}

impl DataModel {
    /// Create an empty data model
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            root: RwLock::new(DataObject::new(id.clone())),
            id,
            generation: AtomicU64::new(0),
        }
    }

    /// The model identifier, used as the first segment of a path
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shape generation, bumped on every structural change
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Declare a property at `path`, creating intermediate objects.
    ///
    /// Redefining an existing property with a different type resets it to null.
    pub fn define(&self, path: &str, property_type: PropertyType) -> Result<()> {
        let segments = split_path(path)?;
        {
            let mut root = self.root.write();
            let (parent, name) = walk_create(&mut root, &segments)?;
            if parent
                .property(name)
                .is_some_and(|existing| existing.property_type == property_type)
            {
                return Ok(());
            }
            let property = match &property_type {
                PropertyType::Object(type_name) => {
                    DataProperty::with_value(DataValue::Object(DataObject::new(type_name.clone())))
                }
                PropertyType::Event => DataProperty::with_value(DataValue::Event(Default::default())),
                _ => DataProperty::null(property_type),
            };
            parent.insert(name, property);
        }
        self.bump();
        tracing::debug!(model = %self.id, path, "defined data model property");
        Ok(())
    }

    /// Remove the property at `path`
    pub fn remove(&self, path: &str) -> Result<()> {
        let segments = split_path(path)?;
        {
            let mut root = self.root.write();
            let (last, parents) = segments
                .split_last()
                .ok_or_else(|| DataModelError::InvalidPath(path.to_string()))?;
            let parent = walk_mut(&mut root, parents, path)?;
            parent
                .remove(last)
                .ok_or_else(|| DataModelError::PathNotFound(path.to_string()))?;
        }
        self.bump();
        Ok(())
    }

    /// Set the value at `path`. `None` sets the property to null.
    pub fn set(&self, path: &str, value: Option<DataValue>) -> Result<()> {
        let segments = split_path(path)?;
        let mut root = self.root.write();
        let property = property_mut(&mut root, &segments, path)?;
        if let Some(value) = &value {
            let actual = value.property_type();
            if actual != property.property_type {
                return Err(DataModelError::TypeMismatch {
                    path: path.to_string(),
                    expected: property.property_type.clone(),
                    actual,
                });
            }
        }
        property.value = value;
        Ok(())
    }

    /// Read the value at `path`. Null values and missing paths both yield `None`.
    pub fn get(&self, path: &str) -> Option<DataValue> {
        let segments = split_path(path).ok()?;
        let root = self.root.read();
        property(&root, &segments)?.value.clone()
    }

    /// The declared type of the property at `path`
    pub fn property_type(&self, path: &str) -> Option<PropertyType> {
        let segments = split_path(path).ok()?;
        let root = self.root.read();
        property(&root, &segments).map(|p| p.property_type.clone())
    }

    /// Trigger the event at `path` now
    pub fn trigger(&self, path: &str) -> Result<()> {
        self.trigger_at(path, SystemTime::now())
    }

    /// Trigger the event at `path` with an explicit timestamp
    pub fn trigger_at(&self, path: &str, time: SystemTime) -> Result<()> {
        let segments = split_path(path)?;
        let mut root = self.root.write();
        let property = property_mut(&mut root, &segments, path)?;
        match &mut property.value {
            Some(DataValue::Event(event)) => {
                event.trigger_at(time);
                Ok(())
            }
            _ => Err(DataModelError::NotAnEvent(path.to_string())),
        }
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if path.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(DataModelError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn property<'a>(root: &'a DataObject, segments: &[&str]) -> Option<&'a DataProperty> {
    let (last, parents) = segments.split_last()?;
    let mut current = root;
    for segment in parents {
        match &current.property(segment)?.value {
            Some(DataValue::Object(object)) => current = object,
            _ => return None,
        }
    }
    current.property(last)
}

fn walk_mut<'a>(root: &'a mut DataObject, segments: &[&str], path: &str) -> Result<&'a mut DataObject> {
    let mut current = root;
    for segment in segments {
        let property = current
            .property_mut(segment)
            .ok_or_else(|| DataModelError::PathNotFound(path.to_string()))?;
        current = match &mut property.value {
            Some(DataValue::Object(object)) => object,
            _ => return Err(DataModelError::NotAnObject(segment.to_string())),
        };
    }
    Ok(current)
}

fn property_mut<'a>(root: &'a mut DataObject, segments: &[&str], path: &str) -> Result<&'a mut DataProperty> {
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| DataModelError::InvalidPath(path.to_string()))?;
    walk_mut(root, parents, path)?
        .property_mut(last)
        .ok_or_else(|| DataModelError::PathNotFound(path.to_string()))
}

fn walk_create<'a, 's>(root: &'a mut DataObject, segments: &[&'s str]) -> Result<(&'a mut DataObject, &'s str)> {
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| DataModelError::InvalidPath(String::new()))?;
    let mut current = root;
    for segment in parents {
        if current.property(segment).is_none() {
            let object = DataObject::new(*segment);
            current.insert(*segment, DataProperty::with_value(DataValue::Object(object)));
        }
        let property = current
            .property_mut(segment)
            .ok_or_else(|| DataModelError::PathNotFound(segment.to_string()))?;
        current = match &mut property.value {
            Some(DataValue::Object(object)) => object,
            _ => return Err(DataModelError::NotAnObject(segment.to_string())),
        };
    }
    Ok((current, *last))
}

/// All data models currently available to scripts
#[derive(Debug, Default)]
pub struct DataModelRegistry {
    models: RwLock<IndexMap<String, Arc<DataModel>>>,
    generation: AtomicU64,
    live_paths: AtomicUsize,
}

impl DataModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a model
    pub fn register(&self, model: Arc<DataModel>) {
        let id = model.id().to_string();
        self.models.write().insert(id.clone(), model);
        self.generation.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(model = %id, "registered data model");
    }

    /// Remove a model, e.g. because its plugin was disabled
    pub fn unregister(&self, id: &str) -> Option<Arc<DataModel>> {
        let removed = self.models.write().shift_remove(id);
        if removed.is_some() {
            self.generation.fetch_add(1, Ordering::AcqRel);
            tracing::debug!(model = %id, "unregistered data model");
        }
        removed
    }

    /// Look up a model by id
    pub fn get(&self, id: &str) -> Option<Arc<DataModel>> {
        self.models.read().get(id).cloned()
    }

    /// Registered model ids
    pub fn model_ids(&self) -> Vec<String> {
        self.models.read().keys().cloned().collect()
    }

    /// Registry generation, bumped when models come and go
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of live [`DataModelPath`](crate::DataModelPath)s bound to this registry
    pub fn live_path_count(&self) -> usize {
        self.live_paths.load(Ordering::Acquire)
    }

    pub(crate) fn path_created(&self) {
        self.live_paths.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn path_dropped(&self) {
        self.live_paths.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_set() {
        let model = DataModel::new("audio");
        model.define("volume", PropertyType::Float).unwrap();
        model.define("device.name", PropertyType::String).unwrap();

        assert_eq!(model.get("volume"), None);
        model.set("volume", Some(DataValue::Float(0.5))).unwrap();
        assert_eq!(model.get("volume"), Some(DataValue::Float(0.5)));
        assert_eq!(model.property_type("device.name"), Some(PropertyType::String));
        assert_eq!(
            model.property_type("device"),
            Some(PropertyType::Object("device".to_string()))
        );
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let model = DataModel::new("audio");
        model.define("volume", PropertyType::Float).unwrap();
        let err = model.set("volume", Some(DataValue::Bool(true))).unwrap_err();
        assert!(matches!(err, DataModelError::TypeMismatch { .. }));
        assert!(matches!(
            model.set("missing", None),
            Err(DataModelError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_shape_changes_bump_generation() {
        let model = DataModel::new("audio");
        let start = model.generation();
        model.define("volume", PropertyType::Float).unwrap();
        assert_eq!(model.generation(), start + 1);

        // Value writes and identical redefinitions leave the shape alone
        model.set("volume", Some(DataValue::Float(1.0))).unwrap();
        model.define("volume", PropertyType::Float).unwrap();
        assert_eq!(model.generation(), start + 1);

        model.remove("volume").unwrap();
        assert_eq!(model.generation(), start + 2);
        assert_eq!(model.property_type("volume"), None);
    }

    #[test]
    fn test_trigger_event() {
        let model = DataModel::new("keyboard");
        model.define("key_pressed", PropertyType::Event).unwrap();
        model.trigger("key_pressed").unwrap();
        let event = model.get("key_pressed").unwrap();
        assert_eq!(event.as_event().unwrap().trigger_count, 1);

        model.define("count", PropertyType::Int).unwrap();
        assert!(matches!(model.trigger("count"), Err(DataModelError::NotAnEvent(_))));
    }

    #[test]
    fn test_registry_generation() {
        let registry = DataModelRegistry::new();
        registry.register(Arc::new(DataModel::new("audio")));
        assert_eq!(registry.generation(), 1);
        assert!(registry.get("audio").is_some());
        assert!(registry.unregister("audio").is_some());
        assert!(registry.unregister("audio").is_none());
        assert_eq!(registry.generation(), 2);
    }
}
