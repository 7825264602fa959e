//! Class registry
//!
//! Specifications name classes by string. Instead of reflection, every
//! constructible type is registered once with a constructor taking the
//! positional argument list, the setter methods it exposes to `calls`, and
//! the supertype names it answers to in instance-of checks.

use crate::args::FromArgs;
use crate::{BoxError, FactoryError, Injectable, Object, Result, Value};
use ahash::{AHashSet, RandomState};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Type-erased constructor
type ConstructorFn = Arc<dyn Fn(Vec<Value>) -> Result<Object> + Send + Sync>;

/// Type-erased setter method
type MethodFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), Vec<Value>) -> Result<()> + Send + Sync>;

/// A registered, constructible class.
pub struct ClassDef {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    constructor: ConstructorFn,
    methods: HashMap<String, MethodFn, RandomState>,
    implements: Vec<String>,
}

impl ClassDef {
    /// Start a class definition from a constructor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use object_factory::{ClassDef, Value};
    ///
    /// struct Mailer { host: Value, log: Vec<Value> }
    ///
    /// let def = ClassDef::new("Mailer", |args: Vec<Value>| {
    ///     Ok(Mailer { host: args.into_iter().next().unwrap_or_default(), log: Vec::new() })
    /// })
    /// .method("setLogger", |mailer: &mut Mailer, args| {
    ///     mailer.log = args;
    ///     Ok(())
    /// })
    /// .implements("Transport")
    /// .build();
    ///
    /// assert_eq!(def.name(), "Mailer");
    /// assert!(def.has_method("setLogger"));
    /// ```
    pub fn new<T, F>(name: impl Into<String>, constructor: F) -> ClassBuilder<T>
    where
        T: Injectable,
        F: Fn(Vec<Value>) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        ClassBuilder::with_constructor(
            name.into(),
            Arc::new(move |args| {
                constructor(args)
                    .map(Object::new)
                    .map_err(FactoryError::Delegate)
            }),
        )
    }

    /// Start a class definition whose constructor is [`FromArgs`].
    pub fn from_args<T>(name: impl Into<String>) -> ClassBuilder<T>
    where
        T: FromArgs + Injectable,
    {
        ClassBuilder::with_constructor(
            name.into(),
            Arc::new(|args| T::from_args(args).map(Object::new)),
        )
    }

    /// Start a class definition for a type built with `Default`, ignoring
    /// any arguments.
    pub fn with_default<T>(name: impl Into<String>) -> ClassBuilder<T>
    where
        T: Default + Injectable,
    {
        ClassBuilder::with_constructor(name.into(), Arc::new(|_| Ok(Object::new(T::default()))))
    }

    /// Registered class name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// TypeId of the instances this class creates
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the instances this class creates
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Declared supertype names
    #[inline]
    pub fn implements(&self) -> &[String] {
        &self.implements
    }

    #[inline]
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Names of the setter methods, sorted
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the constructor with positional arguments
    #[inline]
    pub(crate) fn instantiate(&self, args: Vec<Value>) -> Result<Object> {
        (self.constructor)(args)
    }

    /// Invoke a setter on a uniquely owned instance of this class
    pub(crate) fn call_method(&self, object: &mut Object, method: &str, args: Vec<Value>) -> Result<()> {
        let Some(setter) = self.methods.get(method) else {
            return Err(FactoryError::UnknownMethod {
                class: self.name.clone(),
                method: method.to_string(),
            });
        };

        let Some(target) = object.get_mut_any() else {
            return Err(FactoryError::SharedInstance {
                class: self.name.clone(),
                method: method.to_string(),
            });
        };

        setter(target, args)
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("methods", &self.method_names())
            .field("implements", &self.implements)
            .finish()
    }
}

/// Builder returned by the [`ClassDef`] constructors.
pub struct ClassBuilder<T> {
    def: ClassDef,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> ClassBuilder<T> {
    fn with_constructor(name: String, constructor: ConstructorFn) -> Self {
        Self {
            def: ClassDef {
                name,
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                constructor,
                methods: HashMap::default(),
                implements: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Expose a setter method to `calls`
    pub fn method<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut T, Vec<Value>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let class = self.def.name.clone();
        let method = name.clone();

        let erased: MethodFn = Arc::new(move |target: &mut (dyn Any + Send + Sync), args: Vec<Value>| {
            let target = target.downcast_mut::<T>().ok_or_else(|| FactoryError::UnknownMethod {
                class: class.clone(),
                method: method.clone(),
            })?;
            setter(target, args).map_err(FactoryError::Delegate)
        });

        self.def.methods.insert(name, erased);
        self
    }

    /// Declare a supertype name this class satisfies
    pub fn implements(mut self, name: impl Into<String>) -> Self {
        self.def.implements.push(name.into());
        self
    }

    pub fn build(self) -> ClassDef {
        self.def
    }
}

impl<T: Injectable> From<ClassBuilder<T>> for ClassDef {
    fn from(builder: ClassBuilder<T>) -> Self {
        builder.build()
    }
}

/// Concurrent registry of constructible classes.
///
/// # Examples
///
/// ```rust
/// use object_factory::{ClassDef, ClassRegistry, Object};
///
/// #[derive(Default)]
/// struct Cache;
///
/// let classes = ClassRegistry::new();
/// classes.register(ClassDef::with_default::<Cache>("Cache").implements("Store"));
///
/// let cache = Object::new(Cache);
/// assert!(classes.is_instance_of(&cache, "Cache"));
/// assert!(classes.is_instance_of(&cache, "Store"));
/// assert!(!classes.is_instance_of(&cache, "Database"));
/// ```
pub struct ClassRegistry {
    by_name: DashMap<String, Arc<ClassDef>, RandomState>,
    by_type: DashMap<TypeId, Arc<ClassDef>, RandomState>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            by_name: DashMap::with_hasher(RandomState::new()),
            by_type: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Register a class, replacing any class of the same name.
    ///
    /// When two names share a Rust type, [`class_of`](Self::class_of) maps the
    /// type to the one registered last. Objects built by name keep their own
    /// class inside [`ObjectFactory`](crate::ObjectFactory).
    pub fn register(&self, def: impl Into<ClassDef>) -> Arc<ClassDef> {
        let def = Arc::new(def.into());

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            class = %def.name,
            type_name = def.type_name,
            methods = def.methods.len(),
            "Registering class"
        );

        self.by_name.insert(def.name.clone(), Arc::clone(&def));
        self.by_type.insert(def.type_id, Arc::clone(&def));
        def
    }

    /// Look up a class by name
    #[inline]
    pub fn get(&self, name: &str) -> Option<Arc<ClassDef>> {
        self.by_name.get(name).map(|r| Arc::clone(r.value()))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The registered class of an object, if any
    #[inline]
    pub fn class_of(&self, object: &Object) -> Option<Arc<ClassDef>> {
        self.by_type.get(&object.type_id()).map(|r| Arc::clone(r.value()))
    }

    /// Registered class name of an object, or its Rust type name
    pub fn class_name_of(&self, object: &Object) -> String {
        match self.class_of(object) {
            Some(def) => def.name.clone(),
            None => object.type_name().to_string(),
        }
    }

    /// Check whether `object` is an instance of `expected`.
    ///
    /// True when the object's class is `expected` or declares it, directly or
    /// through registered supertypes. Objects of unregistered types only
    /// match their own Rust type name.
    pub fn is_instance_of(&self, object: &Object, expected: &str) -> bool {
        match self.class_of(object) {
            Some(def) => self.satisfies(&def, expected),
            None => object.type_name() == expected,
        }
    }

    /// Check whether `class` is `expected` or declares it, directly or
    /// through registered supertypes
    pub fn satisfies(&self, class: &ClassDef, expected: &str) -> bool {
        if class.name == expected {
            return true;
        }

        let mut seen = AHashSet::new();
        let mut pending: Vec<String> = class.implements.clone();

        while let Some(name) = pending.pop() {
            if name == expected {
                return true;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(parent) = self.get(&name) {
                pending.extend(parent.implements.iter().cloned());
            }
        }

        false
    }

    /// Registered class names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.names())
            .finish()
    }
}
