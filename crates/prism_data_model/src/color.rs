// SPDX-License-Identifier: MIT OR Apache-2.0
//! Color and gradient values exposed by data models and carried by pins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An 8-bit-per-channel RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Color {
    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque black
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Interpolate each channel towards `other`. `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let channel = |a: u8, b: u8| -> u8 {
            let value = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
            value.round().clamp(0.0, 255.0) as u8
        };
        Color {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
            a: channel(self.a, other.a),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
    }
}

/// Error parsing a hex color string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid color '{0}', expected #RRGGBB or #AARRGGBB")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let err = || ParseColorError(s.to_string());
        if !hex.is_ascii() {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        match hex.len() {
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color::rgba(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
            _ => Err(err()),
        }
    }
}

/// A single color stop of a gradient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Stop color
    pub color: Color,
    /// Position along the gradient in `[0, 1]`
    pub position: f32,
}

impl GradientStop {
    /// Create a new stop
    pub fn new(color: Color, position: f32) -> Self {
        Self { color, position }
    }
}

/// An ordered list of color stops
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorGradient {
    stops: Vec<GradientStop>,
}

impl ColorGradient {
    /// Create a gradient from stops; stops are sorted by position
    pub fn new(mut stops: Vec<GradientStop>) -> Self {
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self { stops }
    }

    /// The stops, ordered by position
    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    /// Whether the gradient has no stops
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Sample the gradient color at `position`
    pub fn color_at(&self, position: f32) -> Color {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Color::TRANSPARENT;
        };
        if position <= first.position {
            return first.color;
        }
        if position >= last.position {
            return last.color;
        }
        for pair in self.stops.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            if position >= left.position && position <= right.position {
                let span = right.position - left.position;
                if span <= f32::EPSILON {
                    return right.color;
                }
                let t = (position - left.position) / span;
                return left.color.lerp(right.color, f64::from(t));
            }
        }
        last.color
    }

    /// Interpolate stop by stop towards `target`.
    ///
    /// When the stop counts differ, the missing side is sampled at the
    /// position of the stop it is paired with.
    pub fn interpolate(&self, target: &ColorGradient, t: f64) -> ColorGradient {
        let count = self.stops.len().max(target.stops.len());
        let t = t.clamp(0.0, 1.0);
        let stops = (0..count)
            .filter_map(|i| {
                let from = self.stops.get(i).copied();
                let to = target.stops.get(i).copied();
                let (from, to) = match (from, to) {
                    (Some(from), Some(to)) => (from, to),
                    (Some(from), None) => (from, GradientStop::new(target.color_at(from.position), from.position)),
                    (None, Some(to)) => (GradientStop::new(self.color_at(to.position), to.position), to),
                    (None, None) => return None,
                };
                Some(GradientStop {
                    color: from.color.lerp(to.color, t),
                    position: from.position + (to.position - from.position) * t as f32,
                })
            })
            .collect();
        ColorGradient::new(stops)
    }
}
