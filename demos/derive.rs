//! Example demonstrating the #[derive(Constructible)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use object_factory::{
    ClassDef, ClassRegistry, Constructible, ObjectFactory, Options, ServiceRegistry, Spec, args,
};
use std::sync::Arc;

// Dependencies
#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct Logger {
    level: String,
}

// Built from positional arguments in field order
#[derive(Constructible)]
struct UserService {
    db: Arc<Database>,
    table: String,
    page_size: i64,
    // Missing or null arguments become None
    logger: Option<Arc<Logger>>,
    // Not taken from the argument list
    #[arg(skip)]
    request_count: u64,
}

impl UserService {
    fn describe(&self) -> String {
        let logger_status = if self.logger.is_some() {
            "with logging"
        } else {
            "without logging"
        };
        format!(
            "UserService on {} (table {}, page size {}, {}, requests: {})",
            self.db.url, self.table, self.page_size, logger_status, self.request_count
        )
    }
}

fn main() {
    println!("=== Object Factory Derive Macro Demo ===\n");

    let classes = Arc::new(ClassRegistry::new());
    classes.register(ClassDef::from_args::<UserService>("UserService"));

    let services = ServiceRegistry::new();
    services.instance("Database", Database {
        url: "postgres://localhost:5432/myapp".into(),
    });
    // Note: no logger argument is given, so the field is None

    let factory = ObjectFactory::with_container(classes, Arc::new(services));
    let spec = Spec::class("UserService")
        .with_services(["Database"])
        .with_args(args!["users", 50]);

    println!("Creating UserService without a logger...");
    let obj = factory
        .construct(spec, &Options::new())
        .expect("Failed to create UserService");
    let user_service = obj.downcast_ref::<UserService>().expect("wrong type");
    println!("  {}", user_service.describe());
    println!();

    // A wrongly typed argument is reported with the field name
    println!("Creating UserService with a bad page size...");
    let bad = Spec::class("UserService")
        .with_services(["Database"])
        .with_args(args!["users", "fifty"]);
    match factory.construct(bad, &Options::new()) {
        Ok(_) => println!("  unexpected success"),
        Err(err) => println!("  error: {err}"),
    }
    println!();

    println!("=== Demo Complete ===");
    println!("\nThe #[derive(Constructible)] macro generated a `FromArgs` impl that:");
    println!("  - Reads fields from the argument list in declaration order");
    println!("  - Uses None for missing or null Option fields");
    println!("  - Uses Default::default() for #[arg(skip)] fields");
}
