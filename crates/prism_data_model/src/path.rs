// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dotted paths into registered data models.
//!
//! A path has the form `model_id.property.sub_property`. It caches the
//! resolved property type and notices when the registry or the target model
//! changes shape, so bound script nodes can retype their pins.

use crate::model::DataModelRegistry;
use crate::value::{DataValue, PropertyType};
use std::sync::Arc;

/// Outcome of (re)validating a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathValidation {
    /// Type resolved by the previous validation
    pub previous_type: Option<PropertyType>,
    /// Type resolved now; `None` when the path no longer resolves
    pub resolved_type: Option<PropertyType>,
}

impl PathValidation {
    /// Whether the resolved type differs from the previous one
    pub fn type_changed(&self) -> bool {
        self.previous_type != self.resolved_type
    }
}

/// A resolvable path into a data model
#[derive(Debug)]
pub struct DataModelPath {
    registry: Arc<DataModelRegistry>,
    path: String,
    resolved_type: Option<PropertyType>,
    observed: Option<(u64, u64)>,
}

impl DataModelPath {
    /// Create a path and validate it immediately
    pub fn new(registry: Arc<DataModelRegistry>, path: impl Into<String>) -> Self {
        registry.path_created();
        let mut path = Self {
            registry,
            path: path.into(),
            resolved_type: None,
            observed: None,
        };
        path.validate();
        path
    }

    /// The full path expression
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The model id segment of the path
    pub fn model_id(&self) -> &str {
        self.split().0
    }

    /// Whether the path resolved during its last validation
    pub fn is_valid(&self) -> bool {
        self.resolved_type.is_some()
    }

    /// The property type resolved during the last validation
    pub fn get_property_type(&self) -> Option<PropertyType> {
        self.resolved_type.clone()
    }

    /// Read the live value. Null properties and unresolved paths yield `None`.
    pub fn get_value(&self) -> Option<DataValue> {
        let (model_id, property) = self.split();
        let property = property?;
        self.registry.get(model_id)?.get(property)
    }

    /// Re-resolve the path against the current registry state
    pub fn validate(&mut self) -> PathValidation {
        let (model_id, property) = self.split();
        let model = self.registry.get(model_id);
        let resolved_type = match (&model, property) {
            (Some(model), Some(property)) => model.property_type(property),
            _ => None,
        };
        self.observed = Some(self.current_generation(model.as_deref()));

        let previous_type = std::mem::replace(&mut self.resolved_type, resolved_type.clone());
        if previous_type != resolved_type {
            tracing::debug!(path = %self.path, ?previous_type, ?resolved_type, "data model path revalidated");
        }
        PathValidation {
            previous_type,
            resolved_type,
        }
    }

    /// Revalidate only if the registry or model changed shape since the last
    /// validation. Returns `None` when nothing changed.
    pub fn poll_validation(&mut self) -> Option<PathValidation> {
        let model = self.registry.get(self.model_id());
        let current = self.current_generation(model.as_deref());
        if self.observed == Some(current) {
            return None;
        }
        Some(self.validate())
    }

    fn current_generation(&self, model: Option<&crate::model::DataModel>) -> (u64, u64) {
        (
            self.registry.generation(),
            model.map_or(u64::MAX, crate::model::DataModel::generation),
        )
    }

    fn split(&self) -> (&str, Option<&str>) {
        match self.path.split_once('.') {
            Some((model, property)) => (model, Some(property)),
            None => (self.path.as_str(), None),
        }
    }
}

impl Drop for DataModelPath {
    fn drop(&mut self) {
        self.registry.path_dropped();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataModel;

    fn registry_with_audio() -> (Arc<DataModelRegistry>, Arc<DataModel>) {
        let registry = Arc::new(DataModelRegistry::new());
        let model = Arc::new(DataModel::new("audio"));
        model.define("volume", PropertyType::Float).unwrap();
        registry.register(model.clone());
        (registry, model)
    }

    #[test]
    fn test_resolve_value_and_type() {
        let (registry, model) = registry_with_audio();
        model.set("volume", Some(DataValue::Float(0.25))).unwrap();

        let path = DataModelPath::new(registry, "audio.volume");
        assert!(path.is_valid());
        assert_eq!(path.model_id(), "audio");
        assert_eq!(path.get_property_type(), Some(PropertyType::Float));
        assert_eq!(path.get_value(), Some(DataValue::Float(0.25)));
    }

    #[test]
    fn test_model_only_path_is_invalid() {
        let (registry, _model) = registry_with_audio();
        let path = DataModelPath::new(registry, "audio");
        assert!(!path.is_valid());
        assert_eq!(path.get_value(), None);
    }

    #[test]
    fn test_poll_detects_shape_changes() {
        let (registry, model) = registry_with_audio();
        let mut path = DataModelPath::new(registry.clone(), "audio.volume");
        assert_eq!(path.poll_validation(), None);

        model.set("volume", Some(DataValue::Float(1.0))).unwrap();
        assert_eq!(path.poll_validation(), None);

        model.remove("volume").unwrap();
        model.define("volume", PropertyType::Int).unwrap();
        let validation = path.poll_validation().unwrap();
        assert!(validation.type_changed());
        assert_eq!(validation.resolved_type, Some(PropertyType::Int));

        registry.unregister("audio");
        let validation = path.poll_validation().unwrap();
        assert_eq!(validation.resolved_type, None);
        assert!(!path.is_valid());
    }

    #[test]
    fn test_live_path_count() {
        let (registry, _model) = registry_with_audio();
        let path = DataModelPath::new(registry.clone(), "audio.volume");
        assert_eq!(registry.live_path_count(), 1);
        drop(path);
        assert_eq!(registry.live_path_count(), 0);
    }
}
