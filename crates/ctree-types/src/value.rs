//! Host values and their runtime classes

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime class of a host value.
///
/// Classes form single-inheritance chains through `base`; the registry
/// walks the chain when no recognizer is registered for the exact class.
#[derive(Debug, PartialEq, Eq)]
pub struct ValueClass {
    pub name: &'static str,
    pub base: Option<&'static ValueClass>,
}

impl ValueClass {
    pub const fn root(name: &'static str) -> Self {
        Self { name, base: None }
    }

    pub const fn derived(name: &'static str, base: &'static ValueClass) -> Self {
        Self {
            name,
            base: Some(base),
        }
    }

    /// This class followed by its bases, nearest first
    pub fn ancestry(&'static self) -> impl Iterator<Item = &'static ValueClass> {
        std::iter::successors(Some(self), |class| class.base)
    }
}

/// Built-in value classes
pub mod class {
    use super::ValueClass;

    pub static INT: ValueClass = ValueClass::root("int");
    pub static UINT: ValueClass = ValueClass::derived("uint", &INT);
    pub static BOOL: ValueClass = ValueClass::derived("bool", &INT);
    pub static FLOAT: ValueClass = ValueClass::root("float");
    pub static FLOAT32: ValueClass = ValueClass::derived("float32", &FLOAT);
    pub static CHAR: ValueClass = ValueClass::root("char");
    pub static STR: ValueClass = ValueClass::root("str");
}

/// A value living in the host program that may be lowered to a C literal
/// or passed to a compiled function.
pub trait HostValue: Any + fmt::Debug {
    fn value_class(&self) -> &'static ValueClass;

    fn as_any(&self) -> &dyn Any;
}

/// Literal payload carried by `Constant` nodes and returned from calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Char(u8),
    Bool(bool),
}

impl Value {
    /// Integer view, if the value is integral
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => Some(v as i64),
            Value::Char(v) => Some(v as i64),
            Value::Bool(v) => Some(v as i64),
            Value::Float(_) | Value::Double(_) => None,
        }
    }

    /// Floating view; integral values convert
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Int(v) => v as f64,
            Value::UInt(v) => v as f64,
            Value::Float(v) => v as f64,
            Value::Double(v) => v,
            Value::Char(v) => v as f64,
            Value::Bool(v) => v as u8 as f64,
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Value::Float(v) => v == 0.0,
            Value::Double(v) => v == 0.0,
            other => other.as_i64() == Some(0),
        }
    }

    pub fn is_one(&self) -> bool {
        match *self {
            Value::Float(v) => v == 1.0,
            Value::Double(v) => v == 1.0,
            other => other.as_i64() == Some(1),
        }
    }
}

impl HostValue for Value {
    fn value_class(&self) -> &'static ValueClass {
        match self {
            Value::Int(_) => &class::INT,
            Value::UInt(_) => &class::UINT,
            Value::Float(_) => &class::FLOAT32,
            Value::Double(_) => &class::FLOAT,
            Value::Char(_) => &class::CHAR,
            Value::Bool(_) => &class::BOOL,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

macro_rules! host_value {
    ($class:ident: $($ty:ty),+) => {
        $(
            impl HostValue for $ty {
                fn value_class(&self) -> &'static ValueClass {
                    &class::$class
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )+
    };
}

host_value!(INT: i8, i16, i32, i64, isize);
host_value!(UINT: u16, u32, u64, usize);
host_value!(FLOAT: f64);
host_value!(FLOAT32: f32);
host_value!(BOOL: bool);
host_value!(CHAR: char, u8);
host_value!(STR: String, &'static str);

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestry_walks_bases() {
        let names: Vec<&str> = class::BOOL.ancestry().map(|c| c.name).collect();
        assert_eq!(names, vec!["bool", "int"]);
    }

    #[test]
    fn test_value_classes() {
        assert_eq!(Value::Int(3).value_class().name, "int");
        assert_eq!(Value::Double(1.5).value_class().name, "float");
        assert_eq!("hi".value_class().name, "str");
        assert_eq!(true.value_class().name, "bool");
    }

    #[test]
    fn test_identities() {
        assert!(Value::Int(0).is_zero());
        assert!(Value::Double(1.0).is_one());
        assert!(!Value::Char(b'a').is_zero());
    }
}
