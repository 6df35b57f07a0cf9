use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::value::{Value, ValueMap};

/// The mutable scope a template renders against.
///
/// A context maps variable names to [`Value`]s.  Rendering mutates it in
/// place: `{% assign %}` stores variables that stay visible after the
/// render returns, loops bind (and afterwards remove) their loop variable,
/// and includes temporarily replace the `include` entry with their
/// parameters.  The same context is shared by a template and all the
/// includes it renders.
///
/// Contexts are usually created with the [`context!`](crate::context!)
/// macro or from serializable data with [`Context::from_serialize`].
#[derive(Clone, Default, PartialEq)]
pub struct Context {
    vars: ValueMap,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.vars.iter()).finish()
    }
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Context {
        Context::default()
    }

    /// Creates a context from serializable data.
    ///
    /// The data has to serialize into a map.  Keys of that map (and of all
    /// nested maps) are converted into strings once, here.
    pub fn from_serialize<S: Serialize + ?Sized>(ctx: &S) -> Result<Context, Error> {
        match ok!(Value::try_from_serialize(ctx)) {
            Value::Map(vars) => Ok(Context { vars }),
            Value::None => Ok(Context::new()),
            other => Err(Error::new(
                ErrorKind::BadSerialization,
                format!("context must be a map, got {}", other.kind()),
            )),
        }
    }

    /// Looks up a variable.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Checks if a variable is set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Sets a variable and returns the previous value.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.vars.insert(key.into(), value.into())
    }

    /// Removes a variable and returns it.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.vars.shift_remove(key)
    }

    /// Resolves a dotted path like `site.baseurl` or `items.first.title`.
    ///
    /// Missing variables and attributes resolve to `nil`.
    pub fn lookup(&self, path: &str) -> Value {
        self.resolve(path.split('.'))
    }

    /// Returns the number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Checks if the context is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over all variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Converts the context into a map value.
    pub fn into_value(self) -> Value {
        Value::Map(self.vars)
    }

    pub(crate) fn resolve<'p, I: IntoIterator<Item = &'p str>>(&self, segments: I) -> Value {
        let mut segments = segments.into_iter();
        let mut value = match segments.next().and_then(|first| self.vars.get(first)) {
            Some(value) => Cow::Borrowed(value),
            None => return Value::None,
        };
        for segment in segments {
            value = match value {
                Cow::Borrowed(value) => match value.get_attr(segment) {
                    Some(next) => next,
                    None => return Value::None,
                },
                Cow::Owned(value) => match value.get_attr(segment) {
                    Some(next) => Cow::Owned(next.into_owned()),
                    None => return Value::None,
                },
            };
        }
        value.into_owned()
    }

    /// Puts back a value that was replaced for the duration of a block.
    ///
    /// If there was no value, or it was `nil`, the key is removed instead.
    pub(crate) fn restore(&mut self, key: &str, previous: Option<Value>) {
        match previous {
            Some(value) if !value.is_none() => {
                self.vars.insert(key.into(), value);
            }
            _ => {
                self.vars.shift_remove(key);
            }
        }
    }
}

impl Serialize for Context {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.vars.iter())
    }
}

impl From<ValueMap> for Context {
    fn from(vars: ValueMap) -> Self {
        Context { vars }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Context {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Context {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.vars
            .extend(iter.into_iter().map(|(key, value)| (key.into(), value.into())));
    }
}
