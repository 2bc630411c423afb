// SPDX-License-Identifier: MIT OR Apache-2.0
//! Coercible numeric values.
//!
//! A [`Numeric`] lets pins be declared "any number": ints, floats and doubles
//! all interconnect without converter nodes. Arithmetic runs in double
//! precision; conversion back to a primitive happens only when a consumer
//! asks for one.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::str::FromStr;

/// The primitive a [`Numeric`] was created from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum NumericKind {
    /// Integer
    Int,
    /// Single precision float
    Float,
    /// Double precision float
    #[default]
    Double,
}

/// A number that remembers its origin but always computes as `f64`
#[derive(Debug, Clone, Copy, Default)]
pub struct Numeric {
    value: f64,
    kind: NumericKind,
}

impl Numeric {
    /// Zero, as a double
    pub const ZERO: Self = Self {
        value: 0.0,
        kind: NumericKind::Double,
    };

    /// Wrap a double
    pub const fn new(value: f64) -> Self {
        Self {
            value,
            kind: NumericKind::Double,
        }
    }

    /// Wrap a value with an explicit origin kind
    pub const fn with_kind(value: f64, kind: NumericKind) -> Self {
        Self { value, kind }
    }

    /// The primitive this value originated from
    pub fn kind(self) -> NumericKind {
        self.kind
    }

    /// Read as `f64`
    pub fn to_f64(self) -> f64 {
        self.value
    }

    /// Read as `f32`
    pub fn to_f32(self) -> f32 {
        self.value as f32
    }

    /// Read as `i32`, truncating towards zero and saturating at the bounds
    pub fn to_i32(self) -> i32 {
        self.value as i32
    }

    /// Read as `i64`, truncating towards zero and saturating at the bounds
    pub fn to_i64(self) -> i64 {
        self.value as i64
    }

    /// Whether the value is finite
    pub fn is_finite(self) -> bool {
        self.value.is_finite()
    }

    /// Absolute value
    pub fn abs(self) -> Self {
        Self::with_kind(self.value.abs(), self.kind)
    }

    fn combine(self, other: Numeric, value: f64) -> Self {
        Self::with_kind(value, self.kind.max(other.kind))
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

macro_rules! numeric_from {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl From<$ty> for Numeric {
                fn from(value: $ty) -> Self {
                    Self::with_kind(value as f64, NumericKind::$kind)
                }
            }
        )*
    };
}

numeric_from!(u8 => Int, i32 => Int, i64 => Int, u32 => Int, f32 => Float, f64 => Double);

impl From<Numeric> for f64 {
    fn from(value: Numeric) -> Self {
        value.to_f64()
    }
}

impl From<Numeric> for f32 {
    fn from(value: Numeric) -> Self {
        value.to_f32()
    }
}

impl From<Numeric> for i32 {
    fn from(value: Numeric) -> Self {
        value.to_i32()
    }
}

macro_rules! numeric_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Numeric {
            type Output = Numeric;

            fn $method(self, rhs: Numeric) -> Numeric {
                self.combine(rhs, self.value $op rhs.value)
            }
        }
    };
}

numeric_op!(Add, add, +);
numeric_op!(Sub, sub, -);
numeric_op!(Mul, mul, *);
numeric_op!(Div, div, /);
numeric_op!(Rem, rem, %);

impl Neg for Numeric {
    type Output = Numeric;

    fn neg(self) -> Numeric {
        Self::with_kind(-self.value, self.kind)
    }
}

impl Sum for Numeric {
    fn sum<I: Iterator<Item = Numeric>>(iter: I) -> Self {
        iter.fold(Numeric::from(0), Add::add)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl FromStr for Numeric {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(int) = s.parse::<i64>() {
            return Ok(Numeric::from(int));
        }
        s.parse::<f64>().map(Numeric::from)
    }
}

impl Serialize for Numeric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value)
    }
}

impl<'de> Deserialize<'de> for Numeric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Numeric::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_reads_as_float() {
        let five = Numeric::from(5);
        assert_eq!(five.kind(), NumericKind::Int);
        assert_eq!(five.to_f32(), 5.0);
        assert_eq!(f64::from(five), 5.0);
    }

    #[test]
    fn test_mixed_arithmetic() {
        let sum = Numeric::from(2) + Numeric::from(3.5);
        assert_eq!(sum, Numeric::from(5.5));
        assert_eq!(sum.kind(), NumericKind::Double);

        let product = Numeric::from(3) * Numeric::from(2.5f32);
        assert_eq!(product.kind(), NumericKind::Float);
        assert_eq!(product.to_f64(), 7.5);
    }

    #[test]
    fn test_integer_division_truncates_at_boundary() {
        let half = Numeric::from(5) / Numeric::from(2);
        assert_eq!(half.to_f64(), 2.5);
        assert_eq!(half.to_i32(), 2);
        assert_eq!((-half).to_i32(), -2);
    }

    #[test]
    fn test_comparison_ignores_kind() {
        assert_eq!(Numeric::from(1), Numeric::from(1.0f32));
        assert!(Numeric::from(1) < Numeric::from(1.5));
        assert!(Numeric::new(f64::NAN) != Numeric::new(f64::NAN));
    }

    #[test]
    fn test_saturating_conversion() {
        assert_eq!(Numeric::new(1e20).to_i32(), i32::MAX);
        assert_eq!(Numeric::new(f64::NAN).to_i32(), 0);
    }

    #[test]
    fn test_parse_and_sum() {
        assert_eq!("42".parse::<Numeric>().unwrap().kind(), NumericKind::Int);
        assert_eq!("0.5".parse::<Numeric>().unwrap(), Numeric::new(0.5));
        assert!("abc".parse::<Numeric>().is_err());

        let total: Numeric = [1, 2, 3].into_iter().map(Numeric::from).sum();
        assert_eq!(total, Numeric::from(6));
        assert_eq!(total.kind(), NumericKind::Int);
    }

    #[test]
    fn test_serde_as_plain_number() {
        let json = serde_json::to_string(&Numeric::from(1.5)).unwrap();
        assert_eq!(json, "1.5");
        let back: Numeric = serde_json::from_str("3").unwrap();
        assert_eq!(back, Numeric::from(3));
    }
}
