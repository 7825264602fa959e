//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use object_factory::{
    ClassDef, ClassRegistry, Deferred, ObjectFactory, Options, ServiceRegistry, Spec, Value, args,
};
use std::sync::Arc;

// Example classes
#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    args: Vec<Value>,
    cache: Option<Value>,
}

fn main() {
    // Initialize logging - uses JSON if logging-json feature enabled,
    // pretty if logging-pretty enabled
    #[cfg(feature = "logging")]
    {
        object_factory::logging::builder()
            .trace()
            .with_env_filter()
            .init();
    }

    println!("=== Object Factory Logging Demo ===\n");

    // Register classes (logs: "Registering class")
    let classes = Arc::new(ClassRegistry::new());
    classes.register(
        ClassDef::new("UserService", |args| Ok(UserService { args, cache: None }))
            .method("setCache", |service: &mut UserService, mut args| {
                service.cache = args.pop();
                Ok(())
            })
            .implements("Service"),
    );

    // Register services (logs: "Registering singleton service")
    let services = ServiceRegistry::new();
    services.instance("Database", Database {
        url: "postgres://localhost/mydb".into(),
    });

    // Register a lazy service (logs: "Registering lazy singleton service")
    services.lazy("Cache", || {
        println!("  [App] Lazy cache being created...");
        "redis://localhost"
    });

    let factory = ObjectFactory::with_container(classes, Arc::new(services));

    // Construct (logs: "Constructing object from specification", "Injecting required service",
    // "Assembled arguments", "Calling setter", "Object constructed")
    let spec = Spec::class("UserService")
        .with_services(["Database"])
        .with_optional_services(["Metrics"])
        .with_args(args!["users", Deferred::new(|| 25_i64)])
        .with_call("setCache", args![Deferred::new(|| "in-memory")]);

    let obj = factory
        .construct(spec, &Options::new().with_assert_class("Service"))
        .expect("construction failed");
    println!("  Built {}", factory.classes().class_name_of(&obj));

    // Optional service found on the second lookup (logs: "Lazy service initializing on first access")
    let spec = Spec::class("UserService").with_optional_services(["Cache"]);
    let _ = factory.construct(spec, &Options::new());

    // Failures are logged at debug level (logs: "Object construction failed")
    let err = factory
        .construct(Spec::class("Missing"), &Options::new())
        .unwrap_err();
    println!("  Expected failure: {err}");

    let err = factory
        .construct("UserService", &Options::new())
        .unwrap_err();
    println!("  Expected failure: {err}");

    println!("\n=== Demo Complete ===");
}
