//! Argument lists and typed argument extraction
//!
//! [`ArgList`] is the literal `args` of a specification. It may come from a
//! loader that only knows keyed collections, so a keyed form is accepted as
//! long as its keys are exactly `0..n` in order.

use crate::{FactoryError, Injectable, Object, Result, Value};
use std::sync::Arc;

/// Key of an entry in a keyed argument list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgKey {
    Index(usize),
    Name(String),
}

impl From<usize> for ArgKey {
    fn from(i: usize) -> Self {
        ArgKey::Index(i)
    }
}

impl From<&str> for ArgKey {
    fn from(name: &str) -> Self {
        ArgKey::Name(name.to_string())
    }
}

impl From<String> for ArgKey {
    fn from(name: String) -> Self {
        ArgKey::Name(name)
    }
}

/// Literal argument list of a specification or a setter call.
///
/// # Examples
///
/// ```rust
/// use object_factory::{args, ArgList, Value};
///
/// let list = args!["a", 2];
/// assert_eq!(list.to_positional().unwrap(), vec![Value::from("a"), Value::Int(2)]);
///
/// let named = ArgList::keyed([("foo", Value::Int(1)), ("bar", Value::Int(2))]);
/// assert!(named.to_positional().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ArgList {
    Positional(Vec<Value>),
    Keyed(Vec<(ArgKey, Value)>),
}

impl Default for ArgList {
    fn default() -> Self {
        ArgList::Positional(Vec::new())
    }
}

impl ArgList {
    /// Empty positional list
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keyed list
    pub fn keyed<K, V, I>(entries: I) -> Self
    where
        K: Into<ArgKey>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        ArgList::Keyed(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            ArgList::Positional(values) => values.len(),
            ArgList::Keyed(entries) => entries.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the keys form the index range `0..len` in order
    pub fn is_list(&self) -> bool {
        match self {
            ArgList::Positional(_) => true,
            ArgList::Keyed(entries) => entries
                .iter()
                .enumerate()
                .all(|(i, (key, _))| *key == ArgKey::Index(i)),
        }
    }

    /// Positional values, failing when the list is associative
    pub fn to_positional(&self) -> Result<Vec<Value>> {
        match self {
            ArgList::Positional(values) => Ok(values.clone()),
            ArgList::Keyed(entries) if self.is_list() => {
                Ok(entries.iter().map(|(_, v)| v.clone()).collect())
            }
            ArgList::Keyed(_) => Err(FactoryError::associative_args()),
        }
    }

    /// Consuming variant of [`to_positional`](Self::to_positional)
    pub fn into_positional(self) -> Result<Vec<Value>> {
        if !self.is_list() {
            return Err(FactoryError::associative_args());
        }
        Ok(match self {
            ArgList::Positional(values) => values,
            ArgList::Keyed(entries) => entries.into_iter().map(|(_, v)| v).collect(),
        })
    }
}

impl From<Vec<Value>> for ArgList {
    fn from(values: Vec<Value>) -> Self {
        ArgList::Positional(values)
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for ArgList {
    fn from(values: [V; N]) -> Self {
        ArgList::Positional(values.into_iter().map(Into::into).collect())
    }
}

impl FromIterator<Value> for ArgList {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        ArgList::Positional(iter.into_iter().collect())
    }
}

/// Build a positional [`ArgList`] from heterogeneous values
#[macro_export]
macro_rules! args {
    () => {
        $crate::ArgList::Positional(::std::vec::Vec::new())
    };
    ($($value:expr),+ $(,)?) => {
        $crate::ArgList::Positional(::std::vec![$($crate::Value::from($value)),+])
    };
}

// =============================================================================
// Typed extraction
// =============================================================================

/// Conversion from a [`Value`] into a constructor parameter
pub trait FromValue: Sized {
    /// Convert, or describe why the value does not fit
    fn from_value(value: Value) -> std::result::Result<Self, String>;

    /// Value to use when the argument list is too short
    fn from_missing() -> Option<Self> {
        None
    }
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, got {}", value.kind())
}

impl FromValue for Value {
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        value.as_bool().ok_or_else(|| mismatch("bool", &value))
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        value.as_int().ok_or_else(|| mismatch("int", &value))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        value.as_float().ok_or_else(|| mismatch("float", &value))
    }
}

macro_rules! from_value_int {
    ($($ty:ty),+) => {$(
        impl FromValue for $ty {
            fn from_value(value: Value) -> std::result::Result<Self, String> {
                let i = value.as_int().ok_or_else(|| mismatch("int", &value))?;
                <$ty>::try_from(i).map_err(|_| format!("{i} is out of range for {}", stringify!($ty)))
            }
        }
    )+};
}

from_value_int!(i32, u32, u64, usize);

impl FromValue for Vec<Value> {
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::List(items) => Ok(items),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl FromValue for Object {
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Object(obj) => Ok(obj),
            other => Err(mismatch("object", &other)),
        }
    }
}

impl<T: Injectable> FromValue for Arc<T> {
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Object(obj) => obj.downcast::<T>().ok_or_else(|| {
                format!(
                    "expected instance of {}, got {}",
                    std::any::type_name::<T>(),
                    obj.type_name()
                )
            }),
            other => Err(mismatch("object", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn from_missing() -> Option<Self> {
        Some(None)
    }
}

/// Positional cursor over a constructor's argument list.
///
/// # Examples
///
/// ```rust
/// use object_factory::{ArgReader, Value};
///
/// let mut reader = ArgReader::new(vec![Value::from("db1"), Value::Int(5432)]);
/// let host: String = reader.next("host").unwrap();
/// let port: i64 = reader.next("port").unwrap();
/// let user: Option<String> = reader.next("user").unwrap();
///
/// assert_eq!((host.as_str(), port, user), ("db1", 5432, None));
/// ```
#[derive(Debug)]
pub struct ArgReader {
    args: std::vec::IntoIter<Value>,
    position: usize,
}

impl ArgReader {
    pub fn new(args: Vec<Value>) -> Self {
        Self {
            args: args.into_iter(),
            position: 0,
        }
    }

    /// Take the next argument, converting it to `T`
    pub fn next<T: FromValue>(&mut self, name: &str) -> Result<T> {
        self.position += 1;
        match self.args.next() {
            Some(value) => T::from_value(value).map_err(|reason| self.error(name, reason)),
            None => T::from_missing().ok_or_else(|| self.error(name, "too few arguments".into())),
        }
    }

    /// Remaining, unread arguments
    pub fn remaining(self) -> Vec<Value> {
        self.args.collect()
    }

    fn error(&self, name: &str, reason: String) -> FactoryError {
        FactoryError::Argument {
            position: self.position,
            name: name.to_string(),
            reason,
        }
    }
}

/// Types that can be built from positional arguments.
///
/// Implemented by `#[derive(Constructible)]` when the `derive` feature is on.
pub trait FromArgs: Sized {
    fn from_args(args: Vec<Value>) -> Result<Self>;
}
