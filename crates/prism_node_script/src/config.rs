// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime configuration for node scripts.
//!
//! Stored as RON so hosts can ship it next to their other settings files.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for a [`NodeScript`](crate::NodeScript)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Upper bound on pin events processed for one structural mutation.
    /// Events beyond it are dropped with a warning.
    pub max_event_cascade: usize,
    /// Host events kept until drained with `take_events`. The oldest are
    /// dropped beyond this.
    pub event_log_capacity: usize,
    /// Turn panics inside node evaluation into broken nodes
    pub catch_panics: bool,
    /// Passes slower than this are logged at warn level, in milliseconds.
    /// Zero disables the check.
    pub evaluation_warn_threshold_ms: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_event_cascade: 1024,
            event_log_capacity: 4096,
            catch_panics: true,
            evaluation_warn_threshold_ms: 50,
        }
    }
}

impl ScriptConfig {
    /// Slow-pass threshold, if enabled
    pub fn evaluation_warn_threshold(&self) -> Option<Duration> {
        (self.evaluation_warn_threshold_ms > 0).then(|| Duration::from_millis(self.evaluation_warn_threshold_ms))
    }

    /// Parse from RON text
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize to pretty RON
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Write to a RON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}
