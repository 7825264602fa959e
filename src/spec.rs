//! Object specifications and per-call options

use crate::{ArgKey, ArgList, Callable, FactoryError, Result, ServiceContainer, Value};
use std::fmt;
use std::sync::Arc;

/// Declarative description of an object to build.
///
/// Exactly one of `class` or `factory` selects how the object is created.
/// When both are present the factory constructs the object and `class` is
/// only the type the result must be an instance of.
///
/// # Examples
///
/// ```rust
/// use object_factory::{args, Spec};
///
/// let spec = Spec::class("Mailer")
///     .with_args(args!["smtp.example.org", 25])
///     .with_services(["Logger"])
///     .with_optional_services(["Metrics"])
///     .with_call("setTimeout", args![30]);
///
/// assert_eq!(spec.class.as_deref(), Some("Mailer"));
/// assert!(spec.closure_expansion);
/// ```
#[derive(Clone, PartialEq)]
pub struct Spec {
    /// Registered class to instantiate
    pub class: Option<String>,
    /// Function producing the object; takes precedence over `class`
    pub factory: Option<Callable>,
    /// Literal arguments, placed after extra arguments and services
    pub args: Option<ArgList>,
    /// Required service names; `None` entries inject null
    pub services: Vec<Option<String>>,
    /// Optional service names; missing services and `None` inject null
    pub optional_services: Vec<Option<String>>,
    /// Setter calls made after construction, in order
    pub calls: Vec<(String, ArgList)>,
    /// Expand deferred values in argument lists (default `true`)
    pub closure_expansion: bool,
    /// Append the specification itself as the last constructor argument
    pub spec_is_arg: bool,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            class: None,
            factory: None,
            args: None,
            services: Vec::new(),
            optional_services: Vec::new(),
            calls: Vec::new(),
            closure_expansion: true,
            spec_is_arg: false,
        }
    }
}

impl Spec {
    /// Empty specification; fails to construct until a selector is set
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Specification for a registered class
    #[inline]
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            class: Some(name.into()),
            ..Self::default()
        }
    }

    /// Specification for a factory function
    #[inline]
    pub fn factory(factory: Callable) -> Self {
        Self {
            factory: Some(factory),
            ..Self::default()
        }
    }

    /// Set the class; with a factory present it becomes the expected type
    pub fn with_class(mut self, name: impl Into<String>) -> Self {
        self.class = Some(name.into());
        self
    }

    pub fn with_factory(mut self, factory: Callable) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_args(mut self, args: impl Into<ArgList>) -> Self {
        self.args = Some(args.into());
        self
    }

    /// Append required services
    pub fn with_services<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services.extend(names.into_iter().map(|n| Some(n.into())));
        self
    }

    /// Append a null entry to the required services
    pub fn with_null_service(mut self) -> Self {
        self.services.push(None);
        self
    }

    /// Append optional services
    pub fn with_optional_services<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional_services
            .extend(names.into_iter().map(|n| Some(n.into())));
        self
    }

    /// Append a null entry to the optional services
    pub fn with_null_optional_service(mut self) -> Self {
        self.optional_services.push(None);
        self
    }

    /// Append a setter call
    pub fn with_call(mut self, method: impl Into<String>, args: impl Into<ArgList>) -> Self {
        self.calls.push((method.into(), args.into()));
        self
    }

    pub fn with_closure_expansion(mut self, enabled: bool) -> Self {
        self.closure_expansion = enabled;
        self
    }

    pub fn with_spec_is_arg(mut self, enabled: bool) -> Self {
        self.spec_is_arg = enabled;
        self
    }

    /// Whether any service, required or optional, is requested
    #[inline]
    pub fn uses_services(&self) -> bool {
        !self.services.is_empty() || !self.optional_services.is_empty()
    }
}

/// Decode a specification from a map, as produced by a configuration
/// loader.
///
/// Recognized keys are `class`, `factory`, `args`, `services`,
/// `optional_services`, `calls`, `closure_expansion` and `spec_is_arg`.
/// Null entries count as absent and unknown keys are ignored. Keyed argument
/// maps whose keys parse as integers become positional indices.
///
/// # Examples
///
/// ```rust
/// use object_factory::{ArgList, Spec, Value};
///
/// let decoded = Value::Map(vec![
///     ("class".into(), Value::from("Mailer")),
///     ("args".into(), Value::List(vec![Value::from("smtp"), Value::Int(25)])),
///     ("services".into(), Value::List(vec![Value::from("Logger"), Value::Null])),
///     ("calls".into(), Value::Map(vec![("setTimeout".into(), Value::List(vec![Value::Int(30)]))])),
/// ]);
///
/// let spec = Spec::try_from(decoded).unwrap();
/// assert_eq!(spec.class.as_deref(), Some("Mailer"));
/// assert_eq!(spec.services, vec![Some("Logger".to_string()), None]);
/// assert_eq!(spec.calls[0].0, "setTimeout");
/// ```
impl TryFrom<Value> for Spec {
    type Error = FactoryError;

    fn try_from(value: Value) -> Result<Self> {
        let entries = match value {
            Value::Map(entries) => entries,
            Value::Spec(spec) => return Ok(Arc::unwrap_or_clone(spec)),
            _ => return Err(FactoryError::not_a_specification()),
        };

        let mut spec = Spec::new();
        for (key, value) in entries {
            if value.is_null() {
                continue;
            }

            match key.as_str() {
                "class" => match value {
                    Value::Str(name) => spec.class = Some(name),
                    other => return Err(FactoryError::wrong_field_type(&key, "a string", other.kind())),
                },
                "factory" => match value {
                    Value::Callable(factory) => spec.factory = Some(factory),
                    other => return Err(FactoryError::wrong_field_type(&key, "a callable", other.kind())),
                },
                "args" => spec.args = Some(decode_args(&key, value)?),
                "services" => spec.services = decode_names(&key, value)?,
                "optional_services" => spec.optional_services = decode_names(&key, value)?,
                "calls" => {
                    let Value::Map(calls) = value else {
                        return Err(FactoryError::wrong_field_type(&key, "a map", value.kind()));
                    };
                    for (method, args) in calls {
                        let args = decode_args(&key, args)?;
                        spec.calls.push((method, args));
                    }
                }
                "closure_expansion" => spec.closure_expansion = decode_flag(&key, value)?,
                "spec_is_arg" => spec.spec_is_arg = decode_flag(&key, value)?,
                _ => {}
            }
        }

        Ok(spec)
    }
}

fn decode_args(key: &str, value: Value) -> Result<ArgList> {
    match value {
        Value::List(items) => Ok(ArgList::Positional(items)),
        Value::Map(entries) => Ok(ArgList::Keyed(
            entries
                .into_iter()
                .map(|(name, value)| {
                    let key = match name.parse::<usize>() {
                        Ok(index) => ArgKey::Index(index),
                        Err(_) => ArgKey::Name(name),
                    };
                    (key, value)
                })
                .collect(),
        )),
        other => Err(FactoryError::wrong_field_type(key, "a list or map", other.kind())),
    }
}

fn decode_names(key: &str, value: Value) -> Result<Vec<Option<String>>> {
    let Value::List(items) = value else {
        return Err(FactoryError::wrong_field_type(key, "a list", value.kind()));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Str(name) => Ok(Some(name)),
            Value::Null => Ok(None),
            other => Err(FactoryError::wrong_field_type(key, "a list of names", other.kind())),
        })
        .collect()
}

fn decode_flag(key: &str, value: Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| FactoryError::wrong_field_type(key, "a bool", value.kind()))
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spec")
            .field("class", &self.class)
            .field("factory", &self.factory.as_ref().map(|_| "Callable(..)"))
            .field("args", &self.args)
            .field("services", &self.services)
            .field("optional_services", &self.optional_services)
            .field("calls", &self.calls)
            .field("closure_expansion", &self.closure_expansion)
            .field("spec_is_arg", &self.spec_is_arg)
            .finish()
    }
}

/// What callers may hand to the factory.
///
/// Bare class names and callables are shorthands that must be allowed in
/// [`Options`]. Maps are decoded with [`Spec::try_from`]; any other value is
/// rejected.
#[derive(Debug, Clone)]
pub enum SpecInput {
    Spec(Spec),
    ClassName(String),
    Callable(Callable),
    /// Undecoded specification map
    Map(Vec<(String, Value)>),
    Other(Value),
}

impl From<Spec> for SpecInput {
    fn from(spec: Spec) -> Self {
        SpecInput::Spec(spec)
    }
}

impl From<&Spec> for SpecInput {
    fn from(spec: &Spec) -> Self {
        SpecInput::Spec(spec.clone())
    }
}

impl From<&str> for SpecInput {
    fn from(name: &str) -> Self {
        SpecInput::ClassName(name.to_string())
    }
}

impl From<String> for SpecInput {
    fn from(name: String) -> Self {
        SpecInput::ClassName(name)
    }
}

impl From<Callable> for SpecInput {
    fn from(callable: Callable) -> Self {
        SpecInput::Callable(callable)
    }
}

impl From<Value> for SpecInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Str(name) => SpecInput::ClassName(name),
            Value::Spec(spec) => SpecInput::Spec(Arc::unwrap_or_clone(spec)),
            Value::Callable(callable) => SpecInput::Callable(callable),
            Value::Map(entries) => SpecInput::Map(entries),
            other => SpecInput::Other(other),
        }
    }
}

/// Per-call options.
///
/// # Examples
///
/// ```rust
/// use object_factory::{Options, ServiceRegistry, Value};
/// use std::sync::Arc;
///
/// let options = Options::new()
///     .with_extra_args([Value::from("request-1")])
///     .with_service_container(Arc::new(ServiceRegistry::new()))
///     .with_assert_class("Handler")
///     .allow_class_name();
///
/// assert!(options.allow_class_name);
/// assert!(!options.allow_callable);
/// ```
#[derive(Clone, Default)]
pub struct Options {
    /// Arguments placed before everything else
    pub extra_args: Vec<Value>,
    /// Container resolving `services` and `optional_services`
    pub service_container: Option<Arc<dyn ServiceContainer>>,
    /// Class the constructed object must be an instance of
    pub assert_class: Option<String>,
    /// Accept a bare class name as the specification
    pub allow_class_name: bool,
    /// Accept a bare callable as the specification
    pub allow_callable: bool,
}

impl Options {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_service_container(mut self, container: Arc<dyn ServiceContainer>) -> Self {
        self.service_container = Some(container);
        self
    }

    pub fn with_assert_class(mut self, class: impl Into<String>) -> Self {
        self.assert_class = Some(class.into());
        self
    }

    pub fn allow_class_name(mut self) -> Self {
        self.allow_class_name = true;
        self
    }

    pub fn allow_callable(mut self) -> Self {
        self.allow_callable = true;
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("extra_args", &self.extra_args)
            .field("has_service_container", &self.service_container.is_some())
            .field("assert_class", &self.assert_class)
            .field("allow_class_name", &self.allow_class_name)
            .field("allow_callable", &self.allow_callable)
            .finish()
    }
}
