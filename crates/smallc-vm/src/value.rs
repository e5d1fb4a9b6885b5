//! Valeurs de la pile d'opérandes.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::RuntimeError;

/// Valeur étiquetée. Les `char` vivent dans `Int`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// Entier 32 bits (int, char, booléen, adresse).
    Int(i32),
    /// Flottant 32 bits.
    Real(f32),
}

impl Value {
    /// Non nul ⇒ vrai.
    pub fn truthy(self) -> bool {
        match self {
            Self::Int(i) => i != 0,
            Self::Real(x) => x != 0.0,
        }
    }

    /// Nom du tag, pour les messages.
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Real(_) => "float",
        }
    }

    /// Comparaison : entière si les deux côtés le sont, flottante sinon.
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(self, rhs: Self) -> Option<core::cmp::Ordering> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f32().partial_cmp(&b.as_f32()),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    const fn as_f32(self) -> f32 {
        match self {
            Self::Int(i) => i as f32,
            Self::Real(x) => x,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(x) => write!(f, "{x:.6}"),
        }
    }
}

impl From<i32> for Value { fn from(v: i32) -> Self { Self::Int(v) } }
impl From<f32> for Value { fn from(v: f32) -> Self { Self::Real(v) } }
impl From<bool> for Value { fn from(v: bool) -> Self { Self::Int(i32::from(v)) } }

impl TryFrom<Value> for i32 {
    type Error = RuntimeError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Int(i) => Ok(i),
            other => Err(RuntimeError::TypeMismatch { expected: "int", found: other }),
        }
    }
}

impl TryFrom<Value> for f32 {
    type Error = RuntimeError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Real(x) => Ok(x),
            other => Err(RuntimeError::TypeMismatch { expected: "float", found: other }),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cmp::Ordering;

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn truthiness() {
        assert!(Value::Int(-3).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::Real(0.5).truthy());
        assert!(!Value::Real(0.0).truthy());
    }

    #[test]
    fn mixed_comparison_goes_through_float() {
        assert_eq!(Value::Int(2).compare(Value::Int(3)), Some(Ordering::Less));
        assert_eq!(Value::Int(3).compare(Value::Real(2.5)), Some(Ordering::Greater));
        assert_eq!(Value::Real(f32::NAN).compare(Value::Real(1.0)), None);
    }

    #[test]
    fn strict_extraction() {
        assert_eq!(i32::try_from(Value::Int(7)), Ok(7));
        assert_eq!(
            f32::try_from(Value::Int(7)),
            Err(RuntimeError::TypeMismatch { expected: "float", found: Value::Int(7) })
        );
    }

    #[test]
    fn display() {
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Real(1.414_213_5).to_string(), "1.414214");
    }
}
