//! Hooks that observe statements passing through a [`HookedDriver`].
//!
//! A [`Hook`] has two phases: [`Hook::before`] runs just before the inner
//! driver is called, and [`Hook::after`] runs once the inner driver returned,
//! whether it succeeded or not. [`Hooks`] holds one optional hook for exec
//! statements and one for query statements.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sqlhooks::hooks::{CompositeHook, Hooks, StatsHook, TracingHook};
//!
//! let stats = Arc::new(StatsHook::new());
//! let hooks = Hooks::new().with_both(
//!     CompositeHook::new()
//!         .add(TracingHook::new().log_args(true))
//!         .add_arc(stats.clone()),
//! );
//! assert!(!hooks.is_empty());
//! assert_eq!(stats.stats().started, 0);
//! ```
//!
//! [`HookedDriver`]: crate::adapter::HookedDriver

mod builtin;
mod tracing_hook;
mod types;


pub use builtin::{CompositeHook, FnHook, NoopHook, StatsHook, StatsSnapshot};
pub use tracing_hook::TracingHook;
pub use types::{Hook, HookAction, HookContext, Hooks, Outcome, StatementKind};

pub(crate) use types::Observe;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
