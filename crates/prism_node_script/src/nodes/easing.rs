// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transition nodes that ease their output towards their input over time.
//!
//! Elapsed time is measured between the node's own evaluations using the
//! wall clock of the pass, not the host's delta time, so a transition keeps
//! its duration even when passes are skipped.

use crate::easing::Easing;
use crate::error::NodeError;
use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeEditor};
use crate::numeric::Numeric;
use crate::pin::{PinId, PinType};
use crate::value::PinValue;
use prism_data_model::{Color, ColorGradient};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Numeric inputs closer than this to the current target do not restart the transition
const NUMERIC_CHANGE_THRESHOLD: f64 = 0.001;

/// Default transition duration in milliseconds
pub const DEFAULT_EASING_TIME_MS: f64 = 1000.0;

/// Values a transition can blend between
pub trait Interpolate: Clone {
    /// Blend from `self` towards `target`; `t` is eased progress
    fn interpolate(&self, target: &Self, t: f64) -> Self;

    /// Whether `other` is a different target than `self`
    fn differs(&self, other: &Self) -> bool;
}

impl Interpolate for Numeric {
    fn interpolate(&self, target: &Self, t: f64) -> Self {
        let from = self.to_f64();
        Numeric::new(from + (target.to_f64() - from) * t)
    }

    fn differs(&self, other: &Self) -> bool {
        (self.to_f64() - other.to_f64()).abs() > NUMERIC_CHANGE_THRESHOLD
    }
}

impl Interpolate for Color {
    fn interpolate(&self, target: &Self, t: f64) -> Self {
        self.lerp(*target, t)
    }

    fn differs(&self, other: &Self) -> bool {
        self != other
    }
}

impl Interpolate for ColorGradient {
    fn interpolate(&self, target: &Self, t: f64) -> Self {
        ColorGradient::interpolate(self, target, t)
    }

    fn differs(&self, other: &Self) -> bool {
        self != other
    }
}

/// A value type an [`EasingNode`] can carry on its pins
pub trait TransitionValue: Interpolate + Default + Into<PinValue> + Send + 'static {
    /// Type of the input and output pins
    const PIN_TYPE: PinType;

    /// Extract from a pin value
    fn from_pin(value: &PinValue) -> Option<Self>;
}

impl TransitionValue for Numeric {
    const PIN_TYPE: PinType = PinType::Numeric;

    fn from_pin(value: &PinValue) -> Option<Self> {
        value.as_numeric()
    }
}

impl TransitionValue for Color {
    const PIN_TYPE: PinType = PinType::Color;

    fn from_pin(value: &PinValue) -> Option<Self> {
        value.as_color()
    }
}

impl TransitionValue for ColorGradient {
    const PIN_TYPE: PinType = PinType::Gradient;

    fn from_pin(value: &PinValue) -> Option<Self> {
        value.as_gradient().cloned()
    }
}

/// Whether a transition is still moving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    /// Output equals the target
    Settled,
    /// Output is between source and target
    Transitioning,
}

/// Time-driven blend from a source value to a target value
#[derive(Debug, Clone)]
pub struct Transition<T> {
    source: T,
    target: T,
    current: T,
    progress: f64,
    last_evaluate: Option<Instant>,
}

impl<T: Interpolate> Transition<T> {
    /// A settled transition resting on `value`
    pub fn new(value: T) -> Self {
        Self {
            source: value.clone(),
            target: value.clone(),
            current: value,
            progress: 1.0,
            last_evaluate: None,
        }
    }

    /// Advance to `now` and return the value to output.
    ///
    /// A new target restarts the blend from the current value. A duration
    /// below 1 ms counts as 1 ms.
    pub fn update(&mut self, input: &T, now: Instant, duration_ms: f64, easing: Easing) -> &T {
        if self.target.differs(input) {
            self.source = self.current.clone();
            self.target = input.clone();
            self.progress = 0.0;
        }

        let elapsed_ms = self
            .last_evaluate
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f64() * 1000.0);
        self.last_evaluate = Some(now);

        if self.progress < 1.0 {
            let duration_ms = if duration_ms.is_finite() { duration_ms.max(1.0) } else { 1.0 };
            self.progress = (self.progress + elapsed_ms / duration_ms).clamp(0.0, 1.0);
        }
        self.current = if self.progress < 1.0 {
            self.source.interpolate(&self.target, easing.apply(self.progress))
        } else {
            self.target.clone()
        };
        &self.current
    }

    /// Current phase
    pub fn phase(&self) -> TransitionPhase {
        if self.progress >= 1.0 {
            TransitionPhase::Settled
        } else {
            TransitionPhase::Transitioning
        }
    }

    /// Progress through the current blend, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Value being approached
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Last output value
    pub fn current(&self) -> &T {
        &self.current
    }
}

/// Persisted settings of an easing node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EasingStorage {
    /// Transition duration in milliseconds
    pub easing_time_ms: f64,
    /// Easing curve
    pub easing: Easing,
}

impl Default for EasingStorage {
    fn default() -> Self {
        Self {
            easing_time_ms: DEFAULT_EASING_TIME_MS,
            easing: Easing::Linear,
        }
    }
}

/// Eases its `Output` towards its `Input`
pub struct EasingNode<T> {
    input: PinId,
    easing_time: PinId,
    output: PinId,
    storage: EasingStorage,
    transition: Transition<T>,
}

impl<T: TransitionValue> EasingNode<T> {
    /// Declare `Input`, `Easing Time` and `Output`
    pub fn new(editor: &mut NodeEditor<'_>) -> Self {
        Self {
            input: editor.add_input("Input", T::PIN_TYPE),
            easing_time: editor.add_input_with_value(
                "Easing Time",
                PinType::Numeric,
                PinValue::from(DEFAULT_EASING_TIME_MS),
            ),
            output: editor.add_output("Output", T::PIN_TYPE),
            storage: EasingStorage::default(),
            transition: Transition::new(T::default()),
        }
    }

    /// Current settings
    pub fn storage(&self) -> &EasingStorage {
        &self.storage
    }

    /// Current phase of the transition
    pub fn phase(&self) -> TransitionPhase {
        self.transition.phase()
    }

    /// The transition state
    pub fn transition(&self) -> &Transition<T> {
        &self.transition
    }
}

impl<T: TransitionValue> NodeBehavior for EasingNode<T> {
    fn evaluate(&mut self, io: &mut NodeIo<'_>) -> Result<(), NodeError> {
        let input = T::from_pin(io.input(self.input)).unwrap_or_else(|| self.transition.target().clone());
        let duration_ms = if io.is_connected(self.easing_time) {
            io.numeric(self.easing_time)
                .map_or(self.storage.easing_time_ms, Numeric::to_f64)
        } else {
            self.storage.easing_time_ms
        };
        let value = self
            .transition
            .update(&input, io.now(), duration_ms, self.storage.easing)
            .clone();
        io.set_output(self.output, value);
        Ok(())
    }

    fn save_storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.storage).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<(), NodeError> {
        self.storage = serde_json::from_value(storage)?;
        Ok(())
    }
}

/// Numeric transition node
pub fn numeric_easing(editor: &mut NodeEditor<'_>) -> Box<dyn NodeBehavior> {
    Box::new(EasingNode::<Numeric>::new(editor))
}

/// Color transition node
pub fn color_easing(editor: &mut NodeEditor<'_>) -> Box<dyn NodeBehavior> {
    Box::new(EasingNode::<Color>::new(editor))
}

/// Gradient transition node
pub fn gradient_easing(editor: &mut NodeEditor<'_>) -> Box<dyn NodeBehavior> {
    Box::new(EasingNode::<ColorGradient>::new(editor))
}
