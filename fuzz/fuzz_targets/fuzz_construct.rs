#![no_main]

//! Fuzz target for object construction
//!
//! Builds arbitrary specifications and checks that construction never panics,
//! that every argument source lands in the documented order, and that
//! invalid specifications fail before any service lookup happens.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use object_factory::{
    ArgKey, ArgList, Callable, ClassDef, ClassRegistry, Deferred, FactoryError, Object,
    ObjectFactory, Options, ServiceContainer, Spec, SpecInput, Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Names the fuzzer can pick from; only the first three are registered services
const SERVICE_NAMES: [&str; 5] = ["alpha", "beta", "gamma", "missing", ""];

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Deferred(i64),
}

impl FuzzValue {
    /// Value placed in the specification
    fn raw(&self) -> Value {
        match self {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => Value::Bool(*b),
            FuzzValue::Int(i) => Value::Int(*i),
            FuzzValue::Str(s) => Value::Str(s.clone()),
            FuzzValue::Deferred(i) => {
                let i = *i;
                Value::Deferred(Deferred::new(move || i))
            }
        }
    }
}

#[derive(Debug, Arbitrary)]
enum FuzzArgs {
    Positional(Vec<FuzzValue>),
    Named(Vec<(String, FuzzValue)>),
    Indexed(Vec<(u8, FuzzValue)>),
}

impl FuzzArgs {
    fn to_list(&self) -> ArgList {
        match self {
            FuzzArgs::Positional(values) => values.iter().map(FuzzValue::raw).collect(),
            FuzzArgs::Named(entries) => ArgList::Keyed(
                entries
                    .iter()
                    .map(|(k, v)| (ArgKey::Name(k.clone()), v.raw()))
                    .collect(),
            ),
            FuzzArgs::Indexed(entries) => ArgList::Keyed(
                entries
                    .iter()
                    .map(|(k, v)| (ArgKey::Index(usize::from(*k)), v.raw()))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzSpec {
    use_factory: bool,
    use_class: bool,
    raw_shorthand: bool,
    allow_shorthand: bool,
    args: Option<FuzzArgs>,
    services: Vec<Option<u8>>,
    optional_services: Vec<Option<u8>>,
    calls: Vec<(bool, FuzzArgs)>,
    closure_expansion: bool,
    spec_is_arg: bool,
    extra_args: Vec<FuzzValue>,
    with_container: bool,
    assert_class: Option<bool>,
}

#[allow(dead_code)]
struct Target {
    args: Vec<Value>,
    calls: Vec<Vec<Value>>,
}

/// Counts lookups so validation failures can be checked for side effects
struct CountingContainer {
    lookups: AtomicUsize,
}

impl ServiceContainer for CountingContainer {
    fn has(&self, name: &str) -> bool {
        SERVICE_NAMES[..3].contains(&name)
    }

    fn get(&self, name: &str) -> object_factory::Result<Value> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.has(name) {
            Ok(Value::from(format!("service:{name}")))
        } else {
            Err(FactoryError::ServiceNotFound {
                name: name.to_string(),
            })
        }
    }
}

fn service_name(index: u8) -> String {
    SERVICE_NAMES[usize::from(index) % SERVICE_NAMES.len()].to_string()
}

fn classes() -> Arc<ClassRegistry> {
    let classes = Arc::new(ClassRegistry::new());
    classes.register(
        ClassDef::new("Target", |args| Ok(Target { args, calls: Vec::new() }))
            .method("setter", |target: &mut Target, args| {
                target.calls.push(args);
                Ok(())
            })
            .implements("Base"),
    );
    classes
}

fn build_spec(input: &FuzzSpec) -> Spec {
    let mut spec = Spec::new()
        .with_closure_expansion(input.closure_expansion)
        .with_spec_is_arg(input.spec_is_arg);

    if input.use_class {
        spec = spec.with_class("Target");
    }
    if input.use_factory {
        spec = spec.with_factory(Callable::new(|args| {
            Object::new(Target {
                args,
                calls: Vec::new(),
            })
        }));
    }
    if let Some(args) = &input.args {
        spec = spec.with_args(args.to_list());
    }

    spec.services = input.services.iter().map(|s| s.map(service_name)).collect();
    spec.optional_services = input
        .optional_services
        .iter()
        .map(|s| s.map(service_name))
        .collect();

    for (known, args) in &input.calls {
        let method = if *known { "setter" } else { "unknown" };
        spec = spec.with_call(method, args.to_list());
    }

    spec
}

/// Expected constructor arguments, computed independently of the factory
fn expected_args(input: &FuzzSpec, spec: &Spec, literal: &[Value], container: &CountingContainer) -> Vec<Value> {
    let mut expected: Vec<Value> = input.extra_args.iter().map(FuzzValue::raw).collect();

    for name in &spec.services {
        expected.push(match name {
            Some(name) => Value::from(format!("service:{name}")),
            None => Value::Null,
        });
    }
    for name in &spec.optional_services {
        expected.push(match name {
            Some(name) if container.has(name) => Value::from(format!("service:{name}")),
            _ => Value::Null,
        });
    }
    expected.extend(literal.iter().cloned());

    if spec.closure_expansion {
        expected = expected
            .into_iter()
            .map(|v| v.expand().unwrap_or(Value::Null))
            .collect();
    }
    if spec.spec_is_arg {
        expected.push(Value::from(spec.clone()));
    }
    expected
}

fuzz_target!(|input: FuzzSpec| {
    let factory = ObjectFactory::new(classes());
    let container = Arc::new(CountingContainer {
        lookups: AtomicUsize::new(0),
    });

    let spec = build_spec(&input);

    let mut options = Options::new().with_extra_args(input.extra_args.iter().map(FuzzValue::raw));
    if input.with_container {
        options = options.with_service_container(container.clone());
    }
    if input.allow_shorthand {
        options = options.allow_class_name().allow_callable();
    }
    match input.assert_class {
        Some(true) => options = options.with_assert_class("Base"),
        Some(false) => options = options.with_assert_class("Unrelated"),
        None => {}
    }

    let spec_input = if input.raw_shorthand {
        SpecInput::ClassName("Target".into())
    } else {
        SpecInput::Spec(spec.clone())
    };

    let result = factory.construct(spec_input, &options);

    match result {
        Err(err) if err.is_invalid_specification() => {
            assert_eq!(container.lookups.load(Ordering::SeqCst), 0);
        }
        Err(_) => {}
        Ok(obj) if !input.raw_shorthand => {
            let target = obj.downcast_ref::<Target>().expect("factory built a Target");
            let literal = spec
                .args
                .as_ref()
                .map(|a| a.to_positional().expect("accepted args are positional"))
                .unwrap_or_default();

            let expected = expected_args(&input, &spec, &literal, &container);
            assert_eq!(target.args.len(), expected.len());
            for (got, want) in target.args.iter().zip(&expected) {
                if !want.is_deferred() {
                    assert_eq!(got, want);
                }
            }
            assert_eq!(target.calls.len(), spec.calls.len());
        }
        Ok(obj) => {
            let target = obj.downcast_ref::<Target>().expect("shorthand built a Target");
            assert_eq!(target.args.len(), input.extra_args.len());
            assert!(target.calls.is_empty());
        }
    }
});
