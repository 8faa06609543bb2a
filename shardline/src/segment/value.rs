//! Literal and parameter values.

use std::fmt::Display;
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// Value of a literal or a bound parameter.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => (),
            Self::Bool(value) => value.hash(state),
            Self::Integer(value) => value.hash(state),
            Self::Float(value) => value.to_bits().hash(state),
            Self::String(value) => value.hash(state),
        }
    }
}

impl Value {
    /// Integer value, parsing strings that hold one.
    pub fn integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::String(value) => value.trim().parse().ok(),
            Self::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::String(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// `?` or `$n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParameterMarkerKind {
    Question,
    Dollar,
}

/// Placeholder for a bound parameter.
///
/// `index` is zero-based into the parameter list, so `$1` has index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ParameterMarker {
    pub index: usize,
    pub kind: ParameterMarkerKind,
}

impl ParameterMarker {
    pub fn question(index: usize) -> Self {
        Self {
            index,
            kind: ParameterMarkerKind::Question,
        }
    }

    /// `$n`, with `n` as written (one-based).
    pub fn dollar(n: usize) -> Self {
        Self {
            index: n.saturating_sub(1),
            kind: ParameterMarkerKind::Dollar,
        }
    }

    /// Look up the bound value.
    pub fn value<'a>(&self, parameters: &'a [Value]) -> Option<&'a Value> {
        parameters.get(self.index)
    }
}

impl Display for ParameterMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ParameterMarkerKind::Question => write!(f, "?"),
            ParameterMarkerKind::Dollar => write!(f, "${}", self.index + 1),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_integer() {
        assert_eq!(Value::Integer(5).integer(), Some(5));
        assert_eq!(Value::from(" 12 ").integer(), Some(12));
        assert_eq!(Value::Float(3.0).integer(), Some(3));
        assert_eq!(Value::Float(3.5).integer(), None);
        assert_eq!(Value::from("abc").integer(), None);
        assert_eq!(Value::Null.integer(), None);
    }

    #[test]
    fn test_float_eq() {
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
        assert_ne!(Value::Float(1.0), Value::Integer(1));
    }

    #[test]
    fn test_parameter_marker() {
        let params = vec![Value::from(1), Value::from("two")];
        assert_eq!(ParameterMarker::dollar(2).value(&params), Some(&Value::from("two")));
        assert_eq!(ParameterMarker::question(0).value(&params), Some(&Value::from(1)));
        assert_eq!(ParameterMarker::question(5).value(&params), None);
        assert_eq!(ParameterMarker::dollar(1).to_string(), "$1");
    }
}
