use std::sync::Arc;
use std::time::Duration;

use sqlhooks::drivers::FakeDriver;
use sqlhooks::{CompositeHook, Database, DriverRegistry, HookedDriver, Hooks, StatsHook, TracingHook};
use tracing::Level;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::TRACE)
        .try_init();
}

#[tokio::test]
async fn test_tracing_hook_passes_results_through() {
    init_tracing();

    let stats = Arc::new(StatsHook::new());
    let hook = CompositeHook::new()
        .add(
            TracingHook::new()
                .level(Level::INFO)
                .max_sql_length(16)
                .slow_threshold(Duration::from_secs(5))
                .log_args(true),
        )
        .add_arc(stats.clone());

    let registry = DriverRegistry::new();
    registry.register("test", Arc::new(FakeDriver::new())).unwrap();
    let hooked = HookedDriver::new(&registry, "test", Hooks::new().with_both(hook)).unwrap();
    registry.register("test-traced", Arc::new(hooked)).unwrap();

    let db = Database::open(&registry, "test-traced", "traced").await.unwrap();
    db.exec("CREATE|people|name=string,age=int32", &[]).await.unwrap();
    db.exec("INSERT|people|name=?,age=?", &["alice".into(), 30i32.into()])
        .await
        .unwrap();

    let rows = db.query("SELECT|people|name,age|", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = rows.single_row().unwrap();
    assert_eq!(row.get_str("name").unwrap(), "alice");

    assert!(db.query("SELECT|nobody|name|", &[]).await.is_err());

    let snapshot = stats.stats();
    assert_eq!(snapshot.started, 4);
    assert_eq!(snapshot.failed, 1);
}

#[tokio::test]
async fn test_tracing_hook_with_default_settings() {
    init_tracing();

    let fake = Arc::new(FakeDriver::new());
    let hooked = HookedDriver::wrap(fake.clone(), Hooks::new().with_both(TracingHook::new()));
    let registry = DriverRegistry::new();
    registry.register("traced", Arc::new(hooked)).unwrap();

    let db = Database::open(&registry, "traced", "defaults").await.unwrap();
    let long_name = "x".repeat(300);
    db.exec(&format!("CREATE|{long_name}|f1=string"), &[])
        .await
        .unwrap();

    // Truncation only affects the log line, never the statement sent to the driver.
    fake.assert_last_statement(&format!("CREATE|{long_name}|f1=string"), &[]);
}
