use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{Error, ErrorKind};
use crate::value::{Value, ValueMap};

/// Converts serializable data into a value.
///
/// The data goes through [`serde_json::Value`] which already turns every map
/// key into a string.  Key order is kept.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map(Value::from).map_err(|err| {
        Error::new(ErrorKind::BadSerialization, "unable to convert context data")
            .with_source(err)
    })
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(val) => Value::Bool(val),
            serde_json::Value::Number(num) => {
                if let Some(val) = num.as_i64() {
                    Value::Int(val)
                } else if let Some(val) = num.as_f64() {
                    Value::Float(val)
                } else {
                    Value::None
                }
            }
            serde_json::Value::String(val) => Value::String(val),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect::<ValueMap>(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(val) => serializer.serialize_bool(*val),
            Value::Int(val) => serializer.serialize_i64(*val),
            Value::Float(val) => serializer.serialize_f64(*val),
            Value::String(val) => serializer.serialize_str(val),
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    m.serialize_entry(key, value)?;
                }
                m.end()
            }
        }
    }
}
