//! Object construction from specifications
//!
//! [`ObjectFactory::construct`] runs the whole pipeline: normalize the input,
//! validate it, assemble the argument list, expand deferred values, invoke the
//! class constructor or factory function, check the result type and apply the
//! setter calls.
//!
//! Validation is finished before anything with side effects runs, so an
//! `InvalidSpecification` error never leaves a half-built object behind and
//! never triggers a service lookup.

use crate::class::{ClassDef, ClassRegistry};
use crate::spec::{Options, Spec, SpecInput};
use crate::value::expand_deferred;
use crate::{ArgList, FactoryError, Object, Result, ServiceContainer, Value};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Builds objects from [`Spec`]s using a [`ClassRegistry`].
///
/// Holds no per-call state; one factory can serve any number of concurrent
/// callers.
///
/// # Examples
///
/// ```rust
/// use object_factory::{args, ClassDef, ClassRegistry, ObjectFactory, Options, Spec, Value};
/// use std::sync::Arc;
///
/// struct Endpoint { url: String, retries: i64 }
///
/// let classes = Arc::new(ClassRegistry::new());
/// classes.register(
///     ClassDef::new("Endpoint", |args: Vec<Value>| {
///         Ok(Endpoint {
///             url: args[0].as_str().unwrap_or_default().to_string(),
///             retries: 0,
///         })
///     })
///     .method("setRetries", |e: &mut Endpoint, args| {
///         e.retries = args[0].as_int().unwrap_or_default();
///         Ok(())
///     }),
/// );
///
/// let factory = ObjectFactory::new(classes);
/// let spec = Spec::class("Endpoint")
///     .with_args(args!["https://example.org"])
///     .with_call("setRetries", args![3]);
///
/// let obj = factory.construct(spec, &Options::new()).unwrap();
/// let endpoint = obj.downcast_ref::<Endpoint>().unwrap();
/// assert_eq!(endpoint.url, "https://example.org");
/// assert_eq!(endpoint.retries, 3);
/// ```
#[derive(Clone)]
pub struct ObjectFactory {
    classes: Arc<ClassRegistry>,
    container: Option<Arc<dyn ServiceContainer>>,
}

/// A specification that passed validation, with its lists made positional
struct Validated {
    spec: Spec,
    args: Vec<Value>,
    calls: Vec<(String, Vec<Value>)>,
    /// Resolved `class` when no factory is given
    class: Option<Arc<ClassDef>>,
}

impl ObjectFactory {
    /// Create a factory without a default service container
    pub fn new(classes: Arc<ClassRegistry>) -> Self {
        Self {
            classes,
            container: None,
        }
    }

    /// Create a factory whose container is used when the options carry none
    pub fn with_container(classes: Arc<ClassRegistry>, container: Arc<dyn ServiceContainer>) -> Self {
        Self {
            classes,
            container: Some(container),
        }
    }

    /// The class registry used to resolve `class` names and setters
    #[inline]
    pub fn classes(&self) -> &Arc<ClassRegistry> {
        &self.classes
    }

    /// The default service container, if any
    #[inline]
    pub fn container(&self) -> Option<&Arc<dyn ServiceContainer>> {
        self.container.as_ref()
    }

    /// Construct an object from a specification.
    ///
    /// When `options` has no service container, the factory's default
    /// container is used.
    ///
    /// # Errors
    ///
    /// - `InvalidSpecification` for a disallowed shorthand, a missing
    ///   selector, associative `args` or `calls` lists, or services without a
    ///   container.
    /// - `UnexpectedResult` when a factory returns a non-object or the
    ///   object fails a type check.
    /// - Anything raised by constructors, factories, service lookups, setters
    ///   or deferred values, unchanged.
    pub fn construct(&self, spec: impl Into<SpecInput>, options: &Options) -> Result<Object> {
        let result = self.construct_inner(spec.into(), options);

        #[cfg(feature = "logging")]
        if let Err(ref err) = result {
            debug!(
                target: "object_factory",
                error = %err,
                "Object construction failed"
            );
        }

        result
    }

    /// Construct using the factory's own container unless `options` names one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use object_factory::{ClassDef, ClassRegistry, ObjectFactory, Options, ServiceRegistry, Spec, Value};
    /// use std::sync::Arc;
    ///
    /// struct Greeter { name: Value }
    ///
    /// let classes = Arc::new(ClassRegistry::new());
    /// classes.register(ClassDef::new("Greeter", |mut args: Vec<Value>| {
    ///     Ok(Greeter { name: args.pop().unwrap_or_default() })
    /// }));
    ///
    /// let services = ServiceRegistry::new();
    /// services.singleton("UserName", "Ada");
    ///
    /// let factory = ObjectFactory::with_container(classes, Arc::new(services));
    /// let obj = factory
    ///     .create_object(Spec::class("Greeter").with_services(["UserName"]), Options::new())
    ///     .unwrap();
    ///
    /// assert_eq!(obj.downcast_ref::<Greeter>().unwrap().name, Value::from("Ada"));
    /// ```
    pub fn create_object(&self, spec: impl Into<SpecInput>, mut options: Options) -> Result<Object> {
        if options.service_container.is_none() {
            options.service_container = self.container.clone();
        }
        self.construct(spec, &options)
    }

    /// Instantiate `class` with a positional argument list.
    ///
    /// # Errors
    ///
    /// `InvalidSpecification` if `args` is not positional; otherwise whatever
    /// the constructor raises.
    pub fn construct_from_class_and_args(class: &ClassDef, args: impl Into<ArgList>) -> Result<Object> {
        let args = args.into().into_positional()?;

        #[cfg(feature = "logging")]
        trace!(
            target: "object_factory",
            class = class.name(),
            arg_count = args.len(),
            "Instantiating class"
        );

        class.instantiate(args)
    }

    fn construct_inner(&self, input: SpecInput, options: &Options) -> Result<Object> {
        let spec = self.normalize(input, options)?;
        let container = options
            .service_container
            .as_ref()
            .or(self.container.as_ref());

        let Validated {
            spec,
            args,
            calls,
            class,
        } = self.validate(spec, container.is_some())?;

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            class = spec.class.as_deref().unwrap_or(""),
            has_factory = spec.factory.is_some(),
            calls = calls.len(),
            "Constructing object from specification"
        );

        let mut args = self.assemble(&spec, args, container, options)?;
        if spec.closure_expansion {
            args = expand_deferred(args)?;
        }

        let mut object = match &class {
            Some(class) => Self::construct_from_class_and_args(class, args)?,
            None => self.invoke_factory(&spec, args)?,
        };

        // Factory results are classified by their Rust type
        let class = class.or_else(|| self.classes.class_of(&object));

        if let Some(expected) = options.assert_class.as_deref() {
            let matches = match &class {
                Some(class) => self.classes.satisfies(class, expected),
                None => object.type_name() == expected,
            };
            if !matches {
                let actual = class.as_ref().map_or(object.type_name(), |class| class.name());
                return Err(FactoryError::assertion_failed(expected, actual));
            }
        }

        for (method, call_args) in calls {
            let call_args = if spec.closure_expansion {
                expand_deferred(call_args)?
            } else {
                call_args
            };
            Self::call_setter(class.as_deref(), &mut object, &method, call_args)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            type_name = object.type_name(),
            "Object constructed"
        );

        Ok(object)
    }

    /// Turn shorthand input into a full specification
    fn normalize(&self, input: SpecInput, options: &Options) -> Result<Spec> {
        match input {
            SpecInput::Spec(spec) => Ok(spec),
            SpecInput::Map(entries) => Spec::try_from(Value::Map(entries)),
            SpecInput::ClassName(name) if self.classes.contains(&name) => {
                if !options.allow_class_name {
                    return Err(FactoryError::raw_class_name_not_allowed());
                }
                Ok(Spec::class(name))
            }
            SpecInput::Callable(factory) => {
                if !options.allow_callable {
                    return Err(FactoryError::raw_callable_not_allowed());
                }
                Ok(Spec::factory(factory))
            }
            SpecInput::ClassName(_) | SpecInput::Other(_) => Err(FactoryError::not_a_specification()),
        }
    }

    /// Every check that can fail without running user code
    fn validate(&self, spec: Spec, has_container: bool) -> Result<Validated> {
        if spec.uses_services() && !has_container {
            return Err(FactoryError::services_without_container());
        }

        let args = match &spec.args {
            Some(list) => list.to_positional()?,
            None => Vec::new(),
        };

        if spec.factory.is_none() && spec.class.is_none() {
            return Err(FactoryError::missing_selector());
        }

        let calls = spec
            .calls
            .iter()
            .map(|(method, list)| list.to_positional().map(|args| (method.clone(), args)))
            .collect::<Result<Vec<_>>>()?;

        let class = match (&spec.factory, spec.class.as_deref()) {
            (None, Some(name)) => Some(self.classes.get(name).ok_or_else(|| {
                FactoryError::UnknownClass {
                    name: name.to_string(),
                }
            })?),
            _ => None,
        };

        Ok(Validated {
            spec,
            args,
            calls,
            class,
        })
    }

    /// Concatenate extra args, services, optional services, literal args and
    /// the specification itself, in that order
    fn assemble(
        &self,
        spec: &Spec,
        literal: Vec<Value>,
        container: Option<&Arc<dyn ServiceContainer>>,
        options: &Options,
    ) -> Result<Vec<Value>> {
        let mut args = Vec::with_capacity(
            options.extra_args.len()
                + spec.services.len()
                + spec.optional_services.len()
                + literal.len()
                + usize::from(spec.spec_is_arg),
        );

        args.extend(options.extra_args.iter().cloned());

        if let Some(container) = container {
            for name in &spec.services {
                let value = match name {
                    Some(name) => container.get(name)?,
                    None => Value::Null,
                };

                #[cfg(feature = "logging")]
                trace!(
                    target: "object_factory",
                    service = name.as_deref().unwrap_or("null"),
                    "Injecting required service"
                );

                args.push(value);
            }

            for name in &spec.optional_services {
                let value = match name {
                    Some(name) if container.has(name) => container.get(name)?,
                    _ => Value::Null,
                };

                #[cfg(feature = "logging")]
                trace!(
                    target: "object_factory",
                    service = name.as_deref().unwrap_or("null"),
                    found = !value.is_null(),
                    "Injecting optional service"
                );

                args.push(value);
            }
        }

        args.extend(literal);

        if spec.spec_is_arg {
            args.push(Value::from(spec.clone()));
        }

        #[cfg(feature = "logging")]
        trace!(
            target: "object_factory",
            extra = options.extra_args.len(),
            services = spec.services.len(),
            optional_services = spec.optional_services.len(),
            total = args.len(),
            "Assembled arguments"
        );

        Ok(args)
    }

    /// Run the factory and check its result against `class`
    fn invoke_factory(&self, spec: &Spec, args: Vec<Value>) -> Result<Object> {
        let Some(factory) = &spec.factory else {
            return Err(FactoryError::missing_selector());
        };

        let Value::Object(object) = factory.call(args)? else {
            return Err(FactoryError::factory_not_object());
        };

        if let Some(expected) = spec.class.as_deref() {
            if !self.classes.is_instance_of(&object, expected) {
                return Err(FactoryError::factory_wrong_class(
                    expected,
                    &self.classes.class_name_of(&object),
                ));
            }
        }

        Ok(object)
    }

    fn call_setter(
        class: Option<&ClassDef>,
        object: &mut Object,
        method: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        let Some(class) = class else {
            return Err(FactoryError::UnknownMethod {
                class: object.type_name().to_string(),
                method: method.to_string(),
            });
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "object_factory",
            class = class.name(),
            method = method,
            arg_count = args.len(),
            "Calling setter"
        );

        class.call_method(object, method, args)
    }
}

impl std::fmt::Debug for ObjectFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectFactory")
            .field("classes", &self.classes.len())
            .field("has_container", &self.container.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, ArgKey, BoxError, Callable, Deferred, ServiceRegistry};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Default)]
    struct Fixture {
        args: Vec<Value>,
        setter_args: Vec<Vec<Value>>,
    }

    #[derive(Debug, Default)]
    struct Other;

    fn fixture_class() -> ClassDef {
        ClassDef::new("Fixture", |args| {
            Ok(Fixture {
                args,
                setter_args: Vec::new(),
            })
        })
        .method("setter", |fixture: &mut Fixture, args| {
            fixture.setter_args.push(args);
            Ok(())
        })
        .implements("FixtureBase")
        .build()
    }

    fn factory() -> ObjectFactory {
        let classes = Arc::new(ClassRegistry::new());
        classes.register(fixture_class());
        classes.register(ClassDef::with_default::<Other>("Other"));
        ObjectFactory::new(classes)
    }

    fn fixture(obj: &Object) -> &Fixture {
        obj.downcast_ref::<Fixture>().unwrap()
    }

    fn fixture_factory() -> Callable {
        Callable::new(|args| {
            Object::new(Fixture {
                args,
                setter_args: Vec::new(),
            })
        })
    }

    fn services() -> Arc<dyn ServiceContainer> {
        let registry = ServiceRegistry::new();
        registry.singleton("Foo", "FOO");
        registry.singleton("Bar", "BAR");
        Arc::new(registry)
    }

    #[test]
    fn test_class_without_args() {
        let obj = factory().construct(Spec::class("Fixture"), &Options::new()).unwrap();

        assert!(fixture(&obj).args.is_empty());
        assert!(fixture(&obj).setter_args.is_empty());
    }

    #[test]
    fn test_closure_expansion_default_on() {
        let spec = Spec::class("Fixture")
            .with_args(args![Deferred::new(|| "unwrapped")])
            .with_call("setter", args![Deferred::new(|| "unwrapped")]);

        let obj = factory().construct(spec, &Options::new()).unwrap();

        assert_eq!(fixture(&obj).args, vec![Value::from("unwrapped")]);
        assert_eq!(fixture(&obj).setter_args, vec![vec![Value::from("unwrapped")]]);
    }

    #[test]
    fn test_closure_expansion_disabled() {
        let deferred = Deferred::new(|| "wrapped");
        let spec = Spec::class("Fixture")
            .with_args(args![deferred.clone()])
            .with_call("setter", args![deferred.clone()])
            .with_closure_expansion(false);

        let obj = factory().construct(spec, &Options::new()).unwrap();

        assert_eq!(fixture(&obj).args, vec![Value::Deferred(deferred.clone())]);
        assert_eq!(fixture(&obj).setter_args, vec![vec![Value::Deferred(deferred)]]);
    }

    #[test]
    fn test_closure_expansion_for_factory() {
        let spec = Spec::factory(fixture_factory()).with_args(args![Deferred::new(|| 42)]);

        let obj = factory().construct(spec, &Options::new()).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::Int(42)]);
    }

    #[test]
    fn test_spec_is_arg_appended_last() {
        let spec = Spec::class("Fixture")
            .with_args(args!["a"])
            .with_call("setter", args!["b"])
            .with_spec_is_arg(true);

        let obj = factory().construct(spec.clone(), &Options::new()).unwrap();
        let args = &fixture(&obj).args;

        assert_eq!(args.len(), 2);
        assert_eq!(args[0], Value::from("a"));
        assert_eq!(args[1].as_spec(), Some(&spec));
        assert_eq!(fixture(&obj).setter_args, vec![vec![Value::from("b")]]);
    }

    #[test]
    fn test_factory_receives_args() {
        let spec = Spec::factory(fixture_factory()).with_args(args!["a", "b"]);

        let obj = factory().construct(spec, &Options::new()).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_missing_selector() {
        let err = factory()
            .construct(Spec::new().with_args(args![1]), &Options::new())
            .unwrap_err();

        assert!(err.is_invalid_specification());
        assert_eq!(
            err.to_string(),
            "Provided specification lacks both 'factory' and 'class' parameters."
        );
    }

    #[test]
    fn test_args_round_trip_for_all_lengths() {
        let factory = factory();

        for len in 0..=11 {
            let values: Vec<Value> = (0..len).map(|i| Value::from(format!("arg{i}"))).collect();

            let by_class = factory
                .construct(Spec::class("Fixture").with_args(values.clone()), &Options::new())
                .unwrap();
            assert_eq!(fixture(&by_class).args, values, "class path, {len} args");

            let by_factory = factory
                .construct(
                    Spec::factory(fixture_factory()).with_args(values.clone()),
                    &Options::new(),
                )
                .unwrap();
            assert_eq!(fixture(&by_factory).args, values, "factory path, {len} args");
        }
    }

    #[test]
    fn test_keyed_args_with_sequential_indices_accepted() {
        let spec = Spec::class("Fixture").with_args(ArgList::keyed([(0usize, "a"), (1, "b")]));

        let obj = factory().construct(spec, &Options::new()).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_named_args_rejected() {
        let named = ArgList::keyed([("foo", 1), ("bar", 2), ("baz", 3)]);

        for spec in [
            Spec::class("Fixture").with_args(named.clone()),
            Spec::factory(fixture_factory()).with_args(named.clone()),
            Spec::class("Fixture").with_call("setter", named.clone()),
        ] {
            let err = factory().construct(spec, &Options::new()).unwrap_err();
            assert!(err.is_invalid_specification());
            assert!(err.to_string().contains("'args' cannot be an associative array"));
        }
    }

    #[test]
    fn test_mixed_keys_rejected() {
        let mixed = ArgList::Keyed(vec![
            (ArgKey::Index(0), Value::Int(1)),
            (ArgKey::Name("x".into()), Value::Int(2)),
        ]);

        let err = factory()
            .construct(Spec::class("Fixture").with_args(mixed), &Options::new())
            .unwrap_err();
        assert!(err.is_invalid_specification());
    }

    #[test]
    fn test_factory_returning_non_object() {
        let spec = Spec::factory(Callable::new(|_| "not an object"));

        let err = factory().construct(spec, &Options::new()).unwrap_err();
        assert!(err.is_unexpected_result());
        assert_eq!(err.to_string(), "'factory' did not return an object");
    }

    #[test]
    fn test_factory_returning_wrong_class() {
        let spec = Spec::factory(Callable::new(|_| Object::new(Other))).with_class("Fixture");

        let err = factory().construct(spec, &Options::new()).unwrap_err();
        assert!(err.is_unexpected_result());
        assert_eq!(
            err.to_string(),
            "'factory' was expected to return an instance of Fixture, got Other"
        );
    }

    #[test]
    fn test_factory_takes_precedence_over_class() {
        static BUILT: AtomicU32 = AtomicU32::new(0);

        let counting = Callable::new(|args| {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Object::new(Fixture {
                args,
                setter_args: Vec::new(),
            })
        });
        let spec = Spec::factory(counting).with_class("FixtureBase");

        let obj = factory().construct(spec, &Options::new()).unwrap();
        assert!(obj.is::<Fixture>());
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_extra_args_come_first() {
        let spec = Spec::class("Fixture").with_args(args!["literal"]);
        let options = Options::new().with_extra_args(["extra1", "extra2"]);

        let obj = factory().construct(spec, &options).unwrap();
        assert_eq!(
            fixture(&obj).args,
            vec![Value::from("extra1"), Value::from("extra2"), Value::from("literal")]
        );
    }

    #[test]
    fn test_assert_class() {
        let factory = factory();

        let ok = factory.construct(
            Spec::class("Fixture"),
            &Options::new().with_assert_class("FixtureBase"),
        );
        assert!(ok.is_ok());

        let err = factory
            .construct(Spec::class("Fixture"), &Options::new().with_assert_class("FooBar"))
            .unwrap_err();
        assert!(err.is_unexpected_result());
        assert_eq!(err.to_string(), "Expected instance of FooBar, got Fixture");
    }

    #[test]
    fn test_assert_class_checked_before_setters() {
        static CALLS: AtomicU32 = AtomicU32::new(0);

        let classes = Arc::new(ClassRegistry::new());
        classes.register(ClassDef::with_default::<Other>("Other").method("touch", |_: &mut Other, _| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        let factory = ObjectFactory::new(classes);

        let spec = Spec::class("Other").with_call("touch", args![]);
        let err = factory
            .construct(spec, &Options::new().with_assert_class("Fixture"))
            .unwrap_err();

        assert!(err.is_unexpected_result());
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_raw_class_name() {
        let factory = factory();
        let options = Options::new().allow_class_name().with_extra_args(["x"]);

        let obj = factory.construct("Fixture", &options).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::from("x")]);

        let err = factory.construct("Fixture", &Options::new()).unwrap_err();
        assert!(err.is_invalid_specification());
        assert!(err.to_string().starts_with("Passing a raw class name is not allowed here"));
    }

    #[test]
    fn test_unregistered_raw_class_name_is_not_a_specification() {
        let err = factory()
            .construct("Missing", &Options::new().allow_class_name())
            .unwrap_err();

        assert!(err.is_invalid_specification());
        assert_eq!(err.to_string(), "Provided specification is not an array.");
    }

    #[test]
    fn test_raw_callable() {
        let factory = factory();
        let options = Options::new().allow_callable().with_extra_args(["x"]);

        let obj = factory.construct(fixture_factory(), &options).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::from("x")]);

        let err = factory.construct(fixture_factory(), &Options::new()).unwrap_err();
        assert!(err.is_invalid_specification());
        assert!(err.to_string().starts_with("Passing a raw callable is not allowed here"));
    }

    #[test]
    fn test_other_input_rejected() {
        let options = Options::new().allow_class_name().allow_callable();

        for input in [Value::Null, Value::Int(3), Value::List(Vec::new())] {
            let err = factory().construct(input, &options).unwrap_err();
            assert_eq!(err.to_string(), "Provided specification is not an array.");
        }
    }

    #[test]
    fn test_decoded_map_specification() {
        let decoded = Value::Map(vec![
            ("class".into(), Value::from("Fixture")),
            ("args".into(), Value::List(vec![Value::from("a")])),
            (
                "calls".into(),
                Value::Map(vec![("setter".into(), Value::List(vec![Value::from("b")]))]),
            ),
        ]);

        let obj = factory().construct(decoded, &Options::new()).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::from("a")]);
        assert_eq!(fixture(&obj).setter_args, vec![vec![Value::from("b")]]);

        let by_factory = Value::Map(vec![("factory".into(), Value::from(fixture_factory()))]);
        let obj = factory().construct(by_factory, &Options::new()).unwrap();
        assert!(obj.is::<Fixture>());

        let bad = Value::Map(vec![("class".into(), Value::Int(7))]);
        let err = factory().construct(bad, &Options::new()).unwrap_err();
        assert!(err.is_invalid_specification());
        assert_eq!(err.to_string(), "'class' must be a string, got int");

        let named = Value::Map(vec![
            ("class".into(), Value::from("Fixture")),
            ("args".into(), Value::Map(vec![("host".into(), Value::from("x"))])),
        ]);
        let err = factory().construct(named, &Options::new()).unwrap_err();
        assert!(err.to_string().contains("'args' cannot be an associative array"));
    }

    #[test]
    fn test_unknown_class() {
        let err = factory().construct(Spec::class("Missing"), &Options::new()).unwrap_err();
        assert!(matches!(err, FactoryError::UnknownClass { ref name } if name == "Missing"));
    }

    #[test]
    fn test_unknown_class_fails_before_service_lookup() {
        static LOOKUPS: AtomicU32 = AtomicU32::new(0);
        static EXPANDED: AtomicU32 = AtomicU32::new(0);

        let registry = ServiceRegistry::new();
        registry.transient("Counted", || LOOKUPS.fetch_add(1, Ordering::SeqCst));

        let spec = Spec::class("Missing")
            .with_services(["Counted"])
            .with_args(args![Deferred::new(|| EXPANDED.fetch_add(1, Ordering::SeqCst))]);
        let options = Options::new().with_service_container(Arc::new(registry));

        let err = factory().construct(spec, &options).unwrap_err();

        assert!(matches!(err, FactoryError::UnknownClass { ref name } if name == "Missing"));
        assert_eq!(LOOKUPS.load(Ordering::SeqCst), 0);
        assert_eq!(EXPANDED.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_two_names_on_one_type_keep_their_class() {
        #[derive(Default)]
        struct Db {
            role: Option<Value>,
        }

        static SET: AtomicU32 = AtomicU32::new(0);

        let classes = Arc::new(ClassRegistry::new());
        classes.register(
            ClassDef::with_default::<Db>("Primary")
                .method("setPrimary", |db: &mut Db, mut args| {
                    SET.fetch_add(1, Ordering::SeqCst);
                    db.role = args.pop();
                    Ok(())
                })
                .implements("Store"),
        );
        classes.register(ClassDef::with_default::<Db>("Replica"));
        let factory = ObjectFactory::new(classes);

        let spec = Spec::class("Primary").with_call("setPrimary", args!["x"]);
        let obj = factory
            .construct(spec, &Options::new().with_assert_class("Primary"))
            .unwrap();
        assert_eq!(obj.downcast_ref::<Db>().unwrap().role, Some(Value::from("x")));
        assert_eq!(SET.load(Ordering::SeqCst), 1);

        assert!(factory
            .construct(Spec::class("Primary"), &Options::new().with_assert_class("Store"))
            .is_ok());

        let err = factory
            .construct(Spec::class("Replica"), &Options::new().with_assert_class("Primary"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Expected instance of Primary, got Replica");

        let err = factory
            .construct(Spec::class("Replica").with_call("setPrimary", args![]), &Options::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Call to undefined method Replica::setPrimary()");
        assert_eq!(SET.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_factory_result_fails_assert_class() {
        let spec = Spec::factory(fixture_factory());

        let err = factory()
            .construct(spec.clone(), &Options::new().with_assert_class("Unrelated"))
            .unwrap_err();
        assert!(err.is_unexpected_result());
        assert_eq!(err.to_string(), "Expected instance of Unrelated, got Fixture");

        let ok = factory().construct(spec, &Options::new().with_assert_class("FixtureBase"));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_argument_order_with_every_source() {
        let spec = Spec::class("Fixture")
            .with_services(["Foo"])
            .with_null_service()
            .with_services(["Bar"])
            .with_optional_services(["Bar", "Missing"])
            .with_null_optional_service()
            .with_optional_services(["Foo"])
            .with_args(args!["a", "b"])
            .with_spec_is_arg(true);
        let options = Options::new()
            .with_extra_args(["extra"])
            .with_service_container(services());

        let obj = factory().construct(spec.clone(), &options).unwrap();

        assert_eq!(
            fixture(&obj).args,
            vec![
                Value::from("extra"),
                Value::from("FOO"),
                Value::Null,
                Value::from("BAR"),
                Value::from("BAR"),
                Value::Null,
                Value::Null,
                Value::from("FOO"),
                Value::from("a"),
                Value::from("b"),
                Value::from(spec),
            ]
        );
    }

    #[test]
    fn test_repeated_service_is_injected_twice() {
        let spec = Spec::class("Fixture").with_services(["Foo", "Foo"]);
        let options = Options::new().with_service_container(services());

        let obj = factory().construct(spec, &options).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::from("FOO"), Value::from("FOO")]);
    }

    #[test]
    fn test_missing_required_service() {
        let spec = Spec::class("Fixture").with_services(["Missing"]);
        let options = Options::new().with_service_container(services());

        let err = factory().construct(spec, &options).unwrap_err();
        assert!(matches!(err, FactoryError::ServiceNotFound { ref name } if name == "Missing"));
    }

    #[test]
    fn test_services_without_container() {
        for spec in [
            Spec::class("Fixture").with_services(["Foo"]),
            Spec::class("Fixture").with_optional_services(["Foo"]),
            Spec::class("Fixture").with_null_service(),
        ] {
            let err = factory().construct(spec, &Options::new()).unwrap_err();
            assert!(err.is_invalid_specification());
            assert_eq!(
                err.to_string(),
                "'services' and 'optional_services' cannot be used without a service container"
            );
        }
    }

    #[test]
    fn test_default_container() {
        let factory = ObjectFactory::with_container(Arc::clone(factory().classes()), services());
        let spec = Spec::class("Fixture").with_services(["Foo"]);

        let obj = factory.construct(spec.clone(), &Options::new()).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::from("FOO")]);

        let obj = factory.create_object(spec, Options::new()).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::from("FOO")]);
    }

    #[test]
    fn test_options_container_overrides_default() {
        let override_services = ServiceRegistry::new();
        override_services.singleton("Foo", "OVERRIDE");

        let factory = ObjectFactory::with_container(Arc::clone(factory().classes()), services());
        let options = Options::new().with_service_container(Arc::new(override_services));

        let obj = factory
            .create_object(Spec::class("Fixture").with_services(["Foo"]), options)
            .unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::from("OVERRIDE")]);
    }

    #[test]
    fn test_setters_called_once_in_order() {
        let spec = Spec::class("Fixture")
            .with_call("setter", args!["a", "b"])
            .with_call("setter", args!["c"]);

        let obj = factory().construct(spec, &Options::new()).unwrap();
        assert_eq!(
            fixture(&obj).setter_args,
            vec![vec![Value::from("a"), Value::from("b")], vec![Value::from("c")]]
        );
    }

    #[test]
    fn test_unknown_setter() {
        let spec = Spec::class("Fixture").with_call("frobnicate", args![]);

        let err = factory().construct(spec, &Options::new()).unwrap_err();
        assert_eq!(err.to_string(), "Call to undefined method Fixture::frobnicate()");
    }

    #[test]
    fn test_setter_on_shared_factory_result() {
        let shared = Object::new(Fixture::default());
        let keep = shared.clone();
        let spec = Spec::factory(Callable::new(move |_| shared.clone())).with_call("setter", args![]);

        let err = factory().construct(spec, &Options::new()).unwrap_err();
        assert!(matches!(err, FactoryError::SharedInstance { .. }));
        assert!(fixture(&keep).setter_args.is_empty());
    }

    #[test]
    fn test_validation_precedes_side_effects() {
        static LOOKUPS: AtomicU32 = AtomicU32::new(0);
        static EXPANDED: AtomicU32 = AtomicU32::new(0);

        let registry = ServiceRegistry::new();
        registry.transient("Counted", || LOOKUPS.fetch_add(1, Ordering::SeqCst));

        let spec = Spec::class("Fixture")
            .with_services(["Counted"])
            .with_args(args![Deferred::new(|| EXPANDED.fetch_add(1, Ordering::SeqCst))])
            .with_call("setter", ArgList::keyed([("named", 1)]));
        let options = Options::new().with_service_container(Arc::new(registry));

        let err = factory().construct(spec, &options).unwrap_err();

        assert!(err.is_invalid_specification());
        assert_eq!(LOOKUPS.load(Ordering::SeqCst), 0);
        assert_eq!(EXPANDED.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_delegate_failures_propagate() {
        let failing_factory = Callable::try_new(|_| -> std::result::Result<Value, BoxError> {
            Err("factory exploded".into())
        });
        let err = factory()
            .construct(Spec::factory(failing_factory), &Options::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "factory exploded");

        let failing_arg = Deferred::try_new(|| -> std::result::Result<Value, BoxError> {
            Err("lazy value exploded".into())
        });
        let err = factory()
            .construct(Spec::class("Fixture").with_args(args![failing_arg]), &Options::new())
            .unwrap_err();
        assert!(matches!(err, FactoryError::Delegate(_)));
        assert_eq!(err.to_string(), "lazy value exploded");
    }

    #[test]
    fn test_construct_from_class_and_args() {
        let class = fixture_class();

        let obj = ObjectFactory::construct_from_class_and_args(&class, args![1, 2]).unwrap();
        assert_eq!(fixture(&obj).args, vec![Value::Int(1), Value::Int(2)]);

        let empty = ObjectFactory::construct_from_class_and_args(&class, ArgList::new()).unwrap();
        assert!(fixture(&empty).args.is_empty());

        let err = ObjectFactory::construct_from_class_and_args(&class, ArgList::keyed([("a", 1)]))
            .unwrap_err();
        assert!(err.is_invalid_specification());
    }

    #[test]
    fn test_concurrent_construction() {
        let factory = Arc::new(factory());

        let handles: Vec<_> = (0..8_i64)
            .map(|i| {
                let factory = Arc::clone(&factory);
                std::thread::spawn(move || {
                    let obj = factory
                        .construct(Spec::class("Fixture").with_args(args![i]), &Options::new())
                        .unwrap();
                    obj.downcast_ref::<Fixture>().unwrap().args[0].as_int()
                })
            })
            .collect();

        let mut seen: Vec<i64> = handles.into_iter().filter_map(|h| h.join().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }
}
