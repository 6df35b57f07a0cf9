//! Provides the dynamic value type used by the engine.
//!
//! Everything a template can see is a [`Value`]: the variables in the
//! [`Context`](crate::Context), literals in expressions, results of filters
//! and the parameters handed to includes.  Values are plain data; maps keep
//! their insertion order and use canonical [`String`] keys.
//!
//! # Converting Values
//!
//! Values are typically created via the [`From`] trait or from anything
//! that implements [`Serialize`](serde::Serialize):
//!
//! ```
//! # use miniliquid::value::Value;
//! let int_value = Value::from(42);
//! let none_value = Value::from(());
//! let map_value = Value::from_serialize(&std::collections::BTreeMap::from([("a", 1)]));
//! ```
//!
//! All map keys become strings at this point, so lookups inside templates
//! never need to try several key forms.
//!
//! Values implement [`Display`](std::fmt::Display) the way they are written
//! into templates: `nil` renders as the empty string, floats always carry a
//! fractional part and strings are written as-is.  Sequences and maps are
//! written in their debug form.
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

use crate::error::Error;

pub(crate) mod ops;
mod serialize;

/// The map type used by values and the context.
pub type ValueMap = IndexMap<String, Value>;

/// Describes the kind of value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ValueKind {
    /// The value is `nil`.
    None,
    /// The value is a bool
    Bool,
    /// The value is a number (integer or float)
    Number,
    /// The value is a string
    String,
    /// The value is a sequence
    Seq,
    /// The value is a key/value mapping
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ValueKind::None => "nil",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Seq => "sequence",
            ValueKind::Map => "map",
        })
    }
}

/// Represents a dynamically typed value in the template engine.
#[derive(Clone, Default)]
pub enum Value {
    /// The absent value, spelled `nil` or `null` in templates.
    #[default]
    None,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A string.
    String(String),
    /// A sequence of values.
    Seq(Vec<Value>),
    /// A mapping with string keys, in insertion order.
    Map(ValueMap),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(key, value)| b.get(key) == Some(value))
            }
            _ => match ops::coerce(self, other) {
                Some(ops::CoerceResult::I64(a, b)) => a == b,
                Some(ops::CoerceResult::F64(a, b)) => a == b,
                None => false,
            },
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let value_ordering = match (self, other) {
            (Value::None, Value::None) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Seq(a), Value::Seq(b)) => a.iter().cmp(b.iter()),
            (Value::Map(a), Value::Map(b)) => a.iter().cmp(b.iter()),
            _ => match ops::coerce(self, other) {
                Some(ops::CoerceResult::I64(a, b)) => a.cmp(&b),
                Some(ops::CoerceResult::F64(a, b)) => a.total_cmp(&b),
                None => Ordering::Equal,
            },
        };
        value_ordering.then(self.kind().cmp(&other.kind()))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("nil"),
            Value::Bool(val) => fmt::Debug::fmt(val, f),
            Value::Int(val) => fmt::Debug::fmt(val, f),
            Value::Float(_) => fmt::Display::fmt(self, f),
            Value::String(val) => fmt::Debug::fmt(val, f),
            Value::Seq(val) => f.debug_list().entries(val.iter()).finish(),
            Value::Map(val) => f.debug_map().entries(val.iter()).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(val) => val.fmt(f),
            Value::Int(val) => val.fmt(f),
            Value::Float(val) => {
                if val.is_nan() {
                    f.write_str("NaN")
                } else if val.is_infinite() {
                    write!(f, "{}Infinity", if val.is_sign_negative() { "-" } else { "" })
                } else {
                    let mut num = val.to_string();
                    if !num.contains('.') {
                        num.push_str(".0");
                    }
                    write!(f, "{num}")
                }
            }
            Value::String(val) => f.write_str(val),
            Value::Seq(_) | Value::Map(_) => fmt::Debug::fmt(self, f),
        }
    }
}

impl Value {
    /// Creates a value from something that can be serialized.
    ///
    /// Data that cannot be represented (for instance maps with non string
    /// keys that do not stringify) becomes `nil`.  Use
    /// [`try_from_serialize`](Self::try_from_serialize) to see the error.
    pub fn from_serialize<T: serde::Serialize + ?Sized>(value: &T) -> Value {
        Value::try_from_serialize(value).unwrap_or_default()
    }

    /// Creates a value from something that can be serialized or fails.
    pub fn try_from_serialize<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
        serialize::to_value(value)
    }

    /// Returns the kind of the value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) | Value::Float(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Seq(_) => ValueKind::Seq,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Is this value `nil`?
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Is this value blank?
    ///
    /// Blank values are `nil`, the empty string and empty collections.
    /// This is what the `default` filter substitutes.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::None => true,
            Value::String(s) => s.is_empty(),
            Value::Seq(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Is this value truthy?
    ///
    /// Everything that is not blank is true.  That includes `false` and `0`.
    pub fn is_true(&self) -> bool {
        !self.is_blank()
    }

    /// If the value is a string, return it.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// If the value is a sequence, return its items.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// If the value is a map, return it.
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the length of strings (in characters), sequences and maps.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Seq(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Looks up a single attribute the way a dotted path segment does.
    ///
    /// Maps are indexed by key.  Strings expose `size` and `length`,
    /// sequences expose `size`, `length`, `first`, `last` and numeric
    /// indexes.  Everything else is `None`.
    pub fn get_attr(&self, name: &str) -> Option<Cow<'_, Value>> {
        ops::get_attr(self, name)
    }

    /// Returns the string form of the value as it would be rendered.
    pub fn to_str(&self) -> Cow<'_, str> {
        match self {
            Value::String(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Coerces the value into a list of items.
    ///
    /// `nil` is the empty list, sequences are returned as is, maps turn into
    /// `[key, value]` pairs and every other value becomes a single item list.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::None => Vec::new(),
            Value::Seq(items) => items,
            Value::Map(map) => map
                .into_iter()
                .map(|(key, value)| Value::Seq(vec![Value::String(key), value]))
                .collect(),
            other => vec![other],
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::None
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Bool(val)
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::String(val)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(val: &'a str) -> Self {
        Value::String(val.to_string())
    }
}

impl<'a> From<Cow<'a, str>> for Value {
    fn from(val: Cow<'a, str>) -> Self {
        Value::String(val.into_owned())
    }
}

impl From<f32> for Value {
    fn from(val: f32) -> Self {
        Value::Float(val as f64)
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Float(val)
    }
}

impl From<ValueMap> for Value {
    fn from(val: ValueMap) -> Self {
        Value::Map(val)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Self {
        Value::Seq(val.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        match val {
            Some(val) => val.into(),
            None => Value::None,
        }
    }
}

macro_rules! value_from_int {
    ($($src:ty),*) => {
        $(
            impl From<$src> for Value {
                #[inline(always)]
                fn from(val: $src) -> Self {
                    Value::Int(val as i64)
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(val: u64) -> Self {
        i64::try_from(val).map_or(Value::Float(val as f64), Value::Int)
    }
}

impl From<usize> for Value {
    fn from(val: usize) -> Self {
        Value::from(val as u64)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Value::Seq(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
