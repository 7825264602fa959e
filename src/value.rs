//! Values passed through the factory
//!
//! Argument lists, service lookups and factory results all travel as
//! [`Value`]. Live instances are carried as type-erased [`Object`]s and
//! lazy arguments as [`Deferred`] computations.

use crate::spec::Spec;
use crate::{BoxError, FactoryError, Injectable, Result};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A type-erased, shareable instance.
///
/// Remembers the concrete type it was created from so that instance-of
/// checks and setter dispatch can find its registered class.
///
/// # Examples
///
/// ```rust
/// use object_factory::Object;
///
/// struct Mailer { host: String }
///
/// let obj = Object::new(Mailer { host: "localhost".into() });
/// assert!(obj.is::<Mailer>());
/// assert_eq!(obj.downcast_ref::<Mailer>().unwrap().host, "localhost");
/// ```
#[derive(Clone)]
pub struct Object {
    inner: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Object {
    /// Wrap a freshly created value
    #[inline]
    pub fn new<T: Injectable>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value
    #[inline]
    pub fn from_arc<T: Injectable>(value: Arc<T>) -> Self {
        Self {
            inner: value as Arc<dyn Any + Send + Sync>,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// TypeId of the wrapped value
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the wrapped value
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether the wrapped value is a `T`
    #[inline]
    pub fn is<T: Injectable>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrow the wrapped value as `T`
    #[inline]
    pub fn downcast_ref<T: Injectable>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Get a shared handle to the wrapped value as `T`
    #[inline]
    pub fn downcast<T: Injectable>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Mutable access while this handle is the only one
    #[inline]
    pub fn get_mut<T: Injectable>(&mut self) -> Option<&mut T> {
        Arc::get_mut(&mut self.inner)?.downcast_mut::<T>()
    }

    /// Type-erased mutable access, used by setter dispatch
    #[inline]
    pub(crate) fn get_mut_any(&mut self) -> Option<&mut (dyn Any + Send + Sync)> {
        Arc::get_mut(&mut self.inner)
    }

    /// Check if two handles point at the same instance
    #[inline]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Type-erased deferred computation
type DeferredFn = Arc<dyn Fn() -> std::result::Result<Value, BoxError> + Send + Sync>;

/// A lazy argument value.
///
/// When closure expansion is enabled, a deferred value found at the top level
/// of an argument list is replaced by the value it produces. Otherwise it is
/// passed through untouched.
///
/// # Examples
///
/// ```rust
/// use object_factory::{Deferred, Value};
///
/// let port = Deferred::new(|| 8080_i64);
/// assert_eq!(port.call().unwrap(), Value::Int(8080));
/// ```
#[derive(Clone)]
pub struct Deferred(DeferredFn);

impl Deferred {
    /// Create from an infallible closure
    pub fn new<V, F>(f: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self(Arc::new(move || Ok(f().into())))
    }

    /// Create from a fallible closure
    pub fn try_new<V, F>(f: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> std::result::Result<V, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(move || f().map(Into::into)))
    }

    /// Run the computation
    #[inline]
    pub fn call(&self) -> Result<Value> {
        (self.0)().map_err(FactoryError::Delegate)
    }

    /// Check if two handles share the same computation
    #[inline]
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

/// Type-erased factory function
type CallableFn = Arc<dyn Fn(Vec<Value>) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// A factory function invoked with the assembled positional arguments.
///
/// # Examples
///
/// ```rust
/// use object_factory::{Callable, Object, Value};
///
/// struct Greeting(String);
///
/// let factory = Callable::new(|args: Vec<Value>| {
///     let name = args[0].as_str().unwrap_or("world").to_string();
///     Object::new(Greeting(format!("hello {name}")))
/// });
/// ```
#[derive(Clone)]
pub struct Callable(CallableFn);

impl Callable {
    /// Create from an infallible closure
    pub fn new<V, F>(f: F) -> Self
    where
        V: Into<Value>,
        F: Fn(Vec<Value>) -> V + Send + Sync + 'static,
    {
        Self(Arc::new(move |args| Ok(f(args).into())))
    }

    /// Create from a fallible closure
    pub fn try_new<V, F>(f: F) -> Self
    where
        V: Into<Value>,
        F: Fn(Vec<Value>) -> std::result::Result<V, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(move |args| f(args).map(Into::into)))
    }

    /// Invoke with positional arguments
    #[inline]
    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        (self.0)(args).map_err(FactoryError::Delegate)
    }

    /// Check if two handles share the same function
    #[inline]
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// Any value that can appear in an argument list, a service slot or a
/// factory result.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absent value, also the null service sentinel
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Ordered key/value pairs
    Map(Vec<(String, Value)>),
    /// A live instance
    Object(Object),
    /// A lazy value, expanded before invocation unless disabled
    Deferred(Deferred),
    /// A function value, such as a decoded `factory` entry
    Callable(Callable),
    /// A specification passed as an argument (`spec_is_arg`)
    Spec(Arc<Spec>),
}

impl Value {
    /// Short name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Deferred(_) => "deferred",
            Value::Callable(_) => "callable",
            Value::Spec(_) => "spec",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[inline]
    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Value::Deferred(d) => Some(d),
            _ => None,
        }
    }

    #[inline]
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }

    #[inline]
    pub fn as_spec(&self) -> Option<&Spec> {
        match self {
            Value::Spec(spec) => Some(spec.as_ref()),
            _ => None,
        }
    }

    /// Look up a key in a map value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Replace a deferred value with what it produces; anything else is
    /// returned unchanged. Nested containers are not visited.
    #[inline]
    pub fn expand(self) -> Result<Value> {
        match self {
            Value::Deferred(d) => d.call(),
            other => Ok(other),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<Deferred> for Value {
    fn from(v: Deferred) -> Self {
        Value::Deferred(v)
    }
}

impl From<Callable> for Value {
    fn from(v: Callable) -> Self {
        Value::Callable(v)
    }
}

impl From<Spec> for Value {
    fn from(v: Spec) -> Self {
        Value::Spec(Arc::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Expand every top-level deferred value in `args`.
///
/// The first failing computation aborts the pass.
pub fn expand_deferred(args: Vec<Value>) -> Result<Vec<Value>> {
    args.into_iter().map(Value::expand).collect()
}
