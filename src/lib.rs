//! # object-factory - Build Objects from Declarative Specifications
//!
//! Describe what to build as data (a class name or a factory function,
//! constructor arguments, named services and setter calls) and let
//! [`ObjectFactory`] turn it into a live, wired instance.
//!
//! ## Features
//!
//! - **Ordered argument assembly** - extra arguments, required services,
//!   optional services, literal arguments and the specification itself, always
//!   in that order
//! - **Deferred values** - lazy arguments evaluated right before the call
//! - **Setter injection** - named methods called after construction
//! - **Type assertions** - check the result against a registered class or
//!   one of its declared supertypes
//! - **Lock-free registries** - `DashMap`-backed class and service registries
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use object_factory::{args, ClassDef, ClassRegistry, ObjectFactory, Options, ServiceRegistry, Spec, Value};
//! use std::sync::Arc;
//!
//! struct Mailer {
//!     transport: Value,
//!     sender: Value,
//!     logger: Option<Value>,
//! }
//!
//! let classes = Arc::new(ClassRegistry::new());
//! classes.register(
//!     ClassDef::new("Mailer", |args: Vec<Value>| {
//!         let mut args = args.into_iter();
//!         Ok(Mailer {
//!             transport: args.next().unwrap_or_default(),
//!             sender: args.next().unwrap_or_default(),
//!             logger: None,
//!         })
//!     })
//!     .method("setLogger", |mailer: &mut Mailer, mut args| {
//!         mailer.logger = args.pop();
//!         Ok(())
//!     }),
//! );
//!
//! let services = ServiceRegistry::new();
//! services.singleton("Transport", "smtp");
//!
//! let factory = ObjectFactory::with_container(classes, Arc::new(services));
//! let spec = Spec::class("Mailer")
//!     .with_services(["Transport"])
//!     .with_args(args!["noreply@example.org"])
//!     .with_call("setLogger", args!["stderr"]);
//!
//! let obj = factory.construct(spec, &Options::new()).unwrap();
//! let mailer = obj.downcast_ref::<Mailer>().unwrap();
//!
//! assert_eq!(mailer.transport, Value::from("smtp"));
//! assert_eq!(mailer.sender, Value::from("noreply@example.org"));
//! assert_eq!(mailer.logger, Some(Value::from("stderr")));
//! ```
//!
//! ## Deferred Values
//!
//! ```rust
//! use object_factory::{args, ClassDef, ClassRegistry, Deferred, ObjectFactory, Options, Spec, Value};
//! use std::sync::Arc;
//!
//! struct Pool { size: Value }
//!
//! let classes = Arc::new(ClassRegistry::new());
//! classes.register(ClassDef::new("Pool", |mut args: Vec<Value>| {
//!     Ok(Pool { size: args.pop().unwrap_or_default() })
//! }));
//! let factory = ObjectFactory::new(classes);
//!
//! let size = Deferred::new(|| 4_i64);
//!
//! let expanded = factory.construct(Spec::class("Pool").with_args(args![size.clone()]), &Options::new()).unwrap();
//! assert_eq!(expanded.downcast_ref::<Pool>().unwrap().size, Value::Int(4));
//!
//! let raw = factory
//!     .construct(
//!         Spec::class("Pool").with_args(args![size]).with_closure_expansion(false),
//!         &Options::new(),
//!     )
//!     .unwrap();
//! assert!(raw.downcast_ref::<Pool>().unwrap().size.is_deferred());
//! ```
//!
//! ## Shorthand Specifications
//!
//! ```rust
//! use object_factory::{ClassDef, ClassRegistry, ObjectFactory, Options};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Cache;
//!
//! let classes = Arc::new(ClassRegistry::new());
//! classes.register(ClassDef::with_default::<Cache>("Cache"));
//! let factory = ObjectFactory::new(classes);
//!
//! // Bare class names must be allowed explicitly
//! assert!(factory.construct("Cache", &Options::new()).is_err());
//! assert!(factory.construct("Cache", &Options::new().allow_class_name()).is_ok());
//! ```

extern crate self as object_factory;

mod args;
mod class;
mod container;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod spec;
mod storage;
mod value;

pub use args::*;
pub use class::*;
pub use container::*;
pub use error::*;
pub use factory::*;
pub use provider::*;
pub use spec::*;
pub use value::*;

#[cfg(feature = "derive")]
pub use object_factory_derive::Constructible;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ArgList, Callable, ClassDef, ClassRegistry, Deferred, FactoryError, Object, ObjectFactory,
        Options, Result, ServiceContainer, ServiceRegistry, Spec, SpecInput, Value,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Database {
        url: String,
    }

    struct UserRepository {
        db: Value,
        table: String,
        cache: Value,
    }

    fn classes() -> Arc<ClassRegistry> {
        let classes = Arc::new(ClassRegistry::new());
        classes.register(
            ClassDef::new("UserRepository", |args: Vec<Value>| {
                let mut reader = ArgReader::new(args);
                Ok(UserRepository {
                    db: reader.next("db")?,
                    table: reader.next("table")?,
                    cache: Value::Null,
                })
            })
            .method("setCache", |repo: &mut UserRepository, mut args| {
                repo.cache = args.pop().unwrap_or_default();
                Ok(())
            })
            .implements("Repository"),
        );
        classes
    }

    #[test]
    fn test_services_args_and_setters() {
        let services = ServiceRegistry::new();
        services.instance("Database", Database { url: "postgres://localhost".into() });
        services.singleton("Cache", "memory");

        let factory = ObjectFactory::with_container(classes(), Arc::new(services));
        let spec = Spec::class("UserRepository")
            .with_services(["Database"])
            .with_args(args!["users"])
            .with_call("setCache", args![Deferred::new(|| "redis")]);

        let obj = factory
            .construct(spec, &Options::new().with_assert_class("Repository"))
            .unwrap();
        let repo = obj.downcast_ref::<UserRepository>().unwrap();

        let db = repo.db.as_object().unwrap().downcast_ref::<Database>().unwrap();
        assert_eq!(db.url, "postgres://localhost");
        assert_eq!(repo.table, "users");
        assert_eq!(repo.cache, Value::from("redis"));
    }

    #[test]
    fn test_service_shared_between_objects() {
        let services = ServiceRegistry::new();
        services.instance("Database", Database { url: "shared".into() });

        let factory = ObjectFactory::with_container(classes(), Arc::new(services));
        let spec = Spec::class("UserRepository")
            .with_services(["Database"])
            .with_args(args!["users"]);

        let a = factory.construct(spec.clone(), &Options::new()).unwrap();
        let b = factory.construct(spec, &Options::new()).unwrap();

        let db_a = &a.downcast_ref::<UserRepository>().unwrap().db;
        let db_b = &b.downcast_ref::<UserRepository>().unwrap().db;
        assert_eq!(db_a, db_b);
    }

    #[test]
    fn test_lazy_service_created_on_first_construction() {
        static CONNECTIONS: AtomicU32 = AtomicU32::new(0);

        let services = ServiceRegistry::new();
        services.lazy("Database", || {
            CONNECTIONS.fetch_add(1, Ordering::SeqCst);
            Object::new(Database { url: "lazy".into() })
        });

        let factory = ObjectFactory::with_container(classes(), Arc::new(services));
        let spec = Spec::class("UserRepository")
            .with_optional_services(["Database"])
            .with_args(args!["users"]);

        assert_eq!(CONNECTIONS.load(Ordering::SeqCst), 0);
        factory.construct(spec.clone(), &Options::new()).unwrap();
        factory.construct(spec, &Options::new()).unwrap();
        assert_eq!(CONNECTIONS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_services() {
        let root = ServiceRegistry::new();
        root.singleton("Table", "users");

        let request = root.scope();
        request.singleton("Table", "sessions");

        let spec = Spec::class("UserRepository").with_services(["Table", "Table"]);
        let factory = ObjectFactory::new(classes());

        let obj = factory
            .construct(spec, &Options::new().with_service_container(Arc::new(request)))
            .unwrap();
        let repo = obj.downcast_ref::<UserRepository>().unwrap();

        assert_eq!(repo.db, Value::from("sessions"));
        assert_eq!(repo.table, "sessions");
    }

    #[test]
    fn test_typed_constructor_reports_bad_argument() {
        let factory = ObjectFactory::new(classes());
        let spec = Spec::class("UserRepository").with_args(args![Value::Null, 42]);

        let err = factory.construct(spec, &Options::new()).unwrap_err();
        assert_eq!(err.to_string(), "Argument #2 ($table): expected string, got int");
    }
}
