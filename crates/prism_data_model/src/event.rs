// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pulse-style events raised by data model providers.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// State of a data model event: when it last fired and how often
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataModelEvent {
    /// Time of the most recent trigger
    pub last_trigger: Option<SystemTime>,
    /// Number of times the event fired
    pub trigger_count: u64,
}

impl DataModelEvent {
    /// Create an event that never fired
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trigger at `time`
    pub fn trigger_at(&mut self, time: SystemTime) {
        self.last_trigger = Some(time);
        self.trigger_count += 1;
    }

    /// Record a trigger now
    pub fn trigger(&mut self) {
        self.trigger_at(SystemTime::now());
    }

    /// Whether the event fired after `since` (or at all, if `since` is `None`)
    pub fn triggered_since(&self, since: Option<SystemTime>) -> bool {
        match (self.last_trigger, since) {
            (Some(last), Some(since)) => last > since,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
