use std::borrow::Cow;
use std::cmp::Ordering;

use crate::value::Value;

pub enum CoerceResult {
    I64(i64, i64),
    F64(f64, f64),
}

fn as_f64(value: &Value) -> Option<f64> {
    Some(match *value {
        Value::Int(x) => x as f64,
        Value::Float(x) => x,
        _ => return None,
    })
}

/// Brings two numbers to a common representation.  Bools are not numbers.
pub fn coerce(a: &Value, b: &Value) -> Option<CoerceResult> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(CoerceResult::I64(*a, *b)),
        (Value::Float(a), _) => Some(CoerceResult::F64(*a, some!(as_f64(b)))),
        (_, Value::Float(b)) => Some(CoerceResult::F64(some!(as_f64(a)), *b)),
        _ => None,
    }
}

/// Orders two values if they are comparable.
///
/// Only numbers with numbers and strings with strings compare, every other
/// pairing has no order.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match some!(coerce(a, b)) {
            CoerceResult::I64(a, b) => Some(a.cmp(&b)),
            CoerceResult::F64(a, b) => a.partial_cmp(&b),
        },
    }
}

/// Implements the `contains` operator.
pub fn contains(container: &Value, value: &Value) -> bool {
    if container.is_none() || value.is_none() {
        return false;
    }
    match container {
        Value::String(s) => s.contains(&*value.to_str()),
        Value::Seq(items) => items.contains(value),
        Value::Map(map) => map.contains_key(&*value.to_str()),
        other => other.to_str().contains(&*value.to_str()),
    }
}

pub fn get_attr<'v>(value: &'v Value, name: &str) -> Option<Cow<'v, Value>> {
    match value {
        Value::Map(map) => map.get(name).map(Cow::Borrowed),
        Value::String(_) => match name {
            "size" | "length" => value.len().map(|x| Cow::Owned(Value::from(x))),
            _ => None,
        },
        Value::Seq(items) => match name {
            "size" | "length" => Some(Cow::Owned(Value::from(items.len()))),
            "first" => items.first().map(Cow::Borrowed),
            "last" => items.last().map(Cow::Borrowed),
            _ => name
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx))
                .map(Cow::Borrowed),
        },
        _ => None,
    }
}
