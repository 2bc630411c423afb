// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing functions used to map normalized transition progress.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Easing curve applied to a transition's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Easing {
    /// Linear interpolation
    #[default]
    Linear,
    /// Quadratic ease-in
    QuadraticIn,
    /// Quadratic ease-out
    QuadraticOut,
    /// Quadratic ease-in/out
    QuadraticInOut,
    /// Cubic ease-in
    CubicIn,
    /// Cubic ease-out
    CubicOut,
    /// Cubic ease-in/out
    CubicInOut,
    /// Quartic ease-in
    QuarticIn,
    /// Quartic ease-out
    QuarticOut,
    /// Quartic ease-in/out
    QuarticInOut,
    /// Quintic ease-in
    QuinticIn,
    /// Quintic ease-out
    QuinticOut,
    /// Quintic ease-in/out
    QuinticInOut,
    /// Sine ease-in
    SineIn,
    /// Sine ease-out
    SineOut,
    /// Sine ease-in/out
    SineInOut,
    /// Circular ease-in
    CircularIn,
    /// Circular ease-out
    CircularOut,
    /// Circular ease-in/out
    CircularInOut,
    /// Exponential ease-in
    ExponentialIn,
    /// Exponential ease-out
    ExponentialOut,
    /// Exponential ease-in/out
    ExponentialInOut,
    /// Elastic ease-in
    ElasticIn,
    /// Elastic ease-out
    ElasticOut,
    /// Elastic ease-in/out
    ElasticInOut,
    /// Back ease-in (overshoots below 0)
    BackIn,
    /// Back ease-out (overshoots above 1)
    BackOut,
    /// Back ease-in/out
    BackInOut,
    /// Bounce ease-in
    BounceIn,
    /// Bounce ease-out
    BounceOut,
    /// Bounce ease-in/out
    BounceInOut,
}

impl Easing {
    /// Every easing curve, in declaration order
    pub const ALL: [Easing; 31] = [
        Self::Linear,
        Self::QuadraticIn,
        Self::QuadraticOut,
        Self::QuadraticInOut,
        Self::CubicIn,
        Self::CubicOut,
        Self::CubicInOut,
        Self::QuarticIn,
        Self::QuarticOut,
        Self::QuarticInOut,
        Self::QuinticIn,
        Self::QuinticOut,
        Self::QuinticInOut,
        Self::SineIn,
        Self::SineOut,
        Self::SineInOut,
        Self::CircularIn,
        Self::CircularOut,
        Self::CircularInOut,
        Self::ExponentialIn,
        Self::ExponentialOut,
        Self::ExponentialInOut,
        Self::ElasticIn,
        Self::ElasticOut,
        Self::ElasticInOut,
        Self::BackIn,
        Self::BackOut,
        Self::BackInOut,
        Self::BounceIn,
        Self::BounceOut,
        Self::BounceInOut,
    ];

    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    ///
    /// Always maps 0 to 0 and 1 to 1; elastic and back curves may leave
    /// the unit range in between.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadraticIn => t.powi(2),
            Self::QuadraticOut => 1.0 - (1.0 - t).powi(2),
            Self::QuadraticInOut => in_out(t, 2),
            Self::CubicIn => t.powi(3),
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
            Self::CubicInOut => in_out(t, 3),
            Self::QuarticIn => t.powi(4),
            Self::QuarticOut => 1.0 - (1.0 - t).powi(4),
            Self::QuarticInOut => in_out(t, 4),
            Self::QuinticIn => t.powi(5),
            Self::QuinticOut => 1.0 - (1.0 - t).powi(5),
            Self::QuinticInOut => in_out(t, 5),
            Self::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Self::SineOut => (t * PI / 2.0).sin(),
            Self::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Self::CircularIn => 1.0 - (1.0 - t.powi(2)).sqrt(),
            Self::CircularOut => (1.0 - (t - 1.0).powi(2)).sqrt(),
            Self::CircularInOut => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            Self::ExponentialIn => {
                if t == 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * t - 10.0)
                }
            }
            Self::ExponentialOut => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * t)
                }
            }
            Self::ExponentialInOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    2f64.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f64.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Self::ElasticIn => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * ELASTIC).sin()
                }
            }
            Self::ElasticOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC).sin() + 1.0
                }
            }
            Self::ElasticInOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    -(2f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * ELASTIC_IN_OUT).sin()) / 2.0
                } else {
                    (2f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * ELASTIC_IN_OUT).sin()) / 2.0 + 1.0
                }
            }
            Self::BackIn => BACK_C3 * t.powi(3) - BACK_C1 * t.powi(2),
            Self::BackOut => 1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2),
            Self::BackInOut => {
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2) + 2.0) / 2.0
                }
            }
            Self::BounceIn => 1.0 - bounce_out(1.0 - t),
            Self::BounceOut => bounce_out(t),
            Self::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }
}

const BACK_C1: f64 = 1.70158;
const BACK_C2: f64 = BACK_C1 * 1.525;
const BACK_C3: f64 = BACK_C1 + 1.0;
const ELASTIC: f64 = (2.0 * PI) / 3.0;
const ELASTIC_IN_OUT: f64 = (2.0 * PI) / 4.5;

fn in_out(t: f64, power: i32) -> f64 {
    if t < 0.5 {
        2f64.powi(power - 1) * t.powi(power)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(power) / 2.0
    }
}

fn bounce_out(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}
