//! sqlhooks - observe every statement a database driver executes
//!
//! Wrap any [`Driver`] in a [`HookedDriver`] and every exec and query call
//! runs through your [`Hook`]s first, without touching call sites.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use sqlhooks::{Database, DriverRegistry, FnHook, HookAction, HookedDriver, Hooks};
//! use sqlhooks::drivers::PostgresDriver;
//!
//! let registry = DriverRegistry::new();
//! registry.register("postgres", Arc::new(PostgresDriver::new()))?;
//!
//! let hooks = Hooks::new().with_query(
//!     FnHook::new()
//!         .on_before(|ctx| {
//!             println!("[query] {} {:?}", ctx.sql, ctx.args);
//!             HookAction::Continue
//!         })
//!         .on_after(|ctx, _| println!("[query] took {:?}", ctx.elapsed())),
//! );
//! registry.register("postgres-hooked", Arc::new(HookedDriver::new(&registry, "postgres", hooks)?))?;
//!
//! let db = Database::open(&registry, "postgres-hooked", "postgres://localhost/mydb").await?;
//! db.exec("CREATE TABLE t (id INT, text VARCHAR(16))", &[]).await?;
//! let rows = db.query("SELECT id, text FROM t", &[]).await?;
//! ```

pub mod adapter;
pub mod drivers;
pub mod error;
pub mod hooks;
pub mod registry;
pub mod traits;
pub mod types;

mod client;

// Re-export main types for convenient access
pub use adapter::{HookedConnection, HookedDriver, HookedStatement};
pub use client::Database;
pub use error::{Result, SqlHooksError};
pub use hooks::{
    CompositeHook, FnHook, Hook, HookAction, HookContext, Hooks, NoopHook, Outcome,
    StatementKind, StatsHook, TracingHook,
};
pub use registry::DriverRegistry;
pub use traits::{Connection, Driver, Statement};
pub use types::{ExecResult, Row, Rows, SqlValue};
