//! Wiring an application with the registry
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example wiring --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example wiring --features logging-pretty
//! ```

use dependency_registry::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

struct Config {
    database_url: String,
}

struct Database {
    url: String,
}

struct RequestContext {
    request_id: u64,
}

struct UserService {
    db: Arc<Database>,
    ctx: Arc<RequestContext>,
}

declare_key!(static CONFIG: Config = "config");
declare_key!(static DATABASE: Database = "database");
declare_key!(static REQUEST: RequestContext = "request");
declare_key!(static USERS: UserService = "users");

impl Component for Database {
    type Deps = Key<Config>;

    fn key() -> Key<Self> {
        DATABASE.clone()
    }

    fn dependencies() -> Self::Deps {
        CONFIG.clone()
    }

    fn construct(config: Arc<Config>) -> Self {
        println!("  [App] Connecting to {}", config.database_url);
        Database {
            url: config.database_url.clone(),
        }
    }
}

fn main() -> Result<()> {
    // Uses JSON if logging-json feature enabled, pretty if logging-pretty enabled
    dependency_registry::logging::init();

    println!("=== Dependency Registry Demo ===\n");

    static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

    let app = Registry::root()
        .register(&CONFIG)
        .factory(|()| Config {
            database_url: "postgres://localhost/app".into(),
        })?
        .register_class::<Database>()?
        .register(&REQUEST)
        .local()
        .factory(|()| RequestContext {
            request_id: NEXT_REQUEST.fetch_add(1, Ordering::SeqCst),
        })?
        .register(&USERS)
        .depends_on((DATABASE.clone(), REQUEST.clone()))
        .ephemeral()
        .factory(|(db, ctx)| UserService { db, ctx })?;

    println!("Registered {} services", app.len());

    for _ in 0..2 {
        // One scope per request: the database is shared, the context is not
        let request = app.fork();
        let users = request.get(&USERS)?;
        let again = request.get(&USERS)?;

        println!(
            "  request {} -> {} (same context: {})",
            users.ctx.request_id,
            users.db.url,
            Arc::ptr_eq(&users.ctx, &again.ctx)
        );
    }

    let summary = app.make((CONFIG.clone(), DATABASE.clone()), |(config, db)| {
        format!("{} == {}", config.database_url, db.url)
    })?;
    println!("\nAd-hoc: {summary}");

    let missing = Key::<String>::new("never-registered");
    if let Err(err) = app.get(&missing) {
        println!("Expected failure: {err}");
    }

    Ok(())
}
