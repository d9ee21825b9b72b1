use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, SqlHooksError};
use crate::hooks::{Hook, HookAction, HookContext, Hooks, Observe, Outcome, StatementKind};
use crate::registry::DriverRegistry;
use crate::traits::{Connection, Driver, Statement};
use crate::types::{ExecResult, Rows, SqlValue};

/// A driver that wraps another driver and runs [`Hooks`] around every exec
/// and query call.
///
/// Results and errors from the inner driver are returned unchanged.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use sqlhooks::adapter::HookedDriver;
/// use sqlhooks::drivers::FakeDriver;
/// use sqlhooks::hooks::{Hooks, TracingHook};
/// use sqlhooks::registry::DriverRegistry;
///
/// let registry = DriverRegistry::new();
/// registry.register("fake", Arc::new(FakeDriver::new())).unwrap();
///
/// let hooked = HookedDriver::new(&registry, "fake", Hooks::new().with_both(TracingHook::new()))
///     .unwrap();
/// registry.register("fake-hooked", Arc::new(hooked)).unwrap();
/// ```
pub struct HookedDriver {
    inner: Arc<dyn Driver>,
    hooks: Arc<Hooks>,
}

impl HookedDriver {
    /// Wrap the driver registered as `inner_name` in `registry`.
    pub fn new(registry: &DriverRegistry, inner_name: &str, hooks: Hooks) -> Result<Self> {
        let inner = registry.get(inner_name)?;
        Ok(Self::wrap(inner, hooks))
    }

    /// Wrap a driver handle directly.
    pub fn wrap(inner: Arc<dyn Driver>, hooks: Hooks) -> Self {
        Self {
            inner,
            hooks: Arc::new(hooks),
        }
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn inner(&self) -> &Arc<dyn Driver> {
        &self.inner
    }
}

#[async_trait]
impl Driver for HookedDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>> {
        let conn = self.inner.open(dsn).await?;
        tracing::trace!(target: "sqlhooks", "opened hooked connection");
        Ok(Box::new(HookedConnection {
            inner: conn,
            hooks: Arc::clone(&self.hooks),
        }))
    }
}

/// Connection returned by [`HookedDriver::open`].
pub struct HookedConnection {
    inner: Box<dyn Connection>,
    hooks: Arc<Hooks>,
}

#[async_trait]
impl Connection for HookedConnection {
    async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        let stmt = self.inner.prepare(sql).await?;
        tracing::trace!(target: "sqlhooks", sql, "prepared hooked statement");
        Ok(Box::new(HookedStatement {
            inner: stmt,
            sql: sql.to_string(),
            hooks: Arc::clone(&self.hooks),
        }))
    }

    async fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult> {
        let ctx = HookContext::new(StatementKind::Exec, sql, args);
        observe(self.hooks.exec_hook(), ctx, || self.inner.exec(sql, args)).await
    }

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Rows> {
        let ctx = HookContext::new(StatementKind::Query, sql, args);
        observe(self.hooks.query_hook(), ctx, || self.inner.query(sql, args)).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}

/// Statement returned by [`HookedConnection::prepare`].
///
/// Hooks see the text the statement was prepared with and the arguments of
/// each execution.
pub struct HookedStatement {
    inner: Box<dyn Statement>,
    sql: String,
    hooks: Arc<Hooks>,
}

impl HookedStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

#[async_trait]
impl Statement for HookedStatement {
    fn param_count(&self) -> Option<usize> {
        self.inner.param_count()
    }

    async fn exec(&self, args: &[SqlValue]) -> Result<ExecResult> {
        let ctx = HookContext::new(StatementKind::Exec, &self.sql, args).prepared();
        observe(self.hooks.exec_hook(), ctx, || self.inner.exec(args)).await
    }

    async fn query(&self, args: &[SqlValue]) -> Result<Rows> {
        let ctx = HookContext::new(StatementKind::Query, &self.sql, args).prepared();
        observe(self.hooks.query_hook(), ctx, || self.inner.query(args)).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}

/// Runs `call` between the hook's two phases.
///
/// Without a hook the call is awaited directly. `call` is not started until
/// `before` has returned.
async fn observe<T, F, Fut>(hook: Option<&Arc<dyn Hook>>, ctx: HookContext<'_>, call: F) -> Result<T>
where
    T: Observe,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let Some(hook) = hook else {
        return call().await;
    };

    if let HookAction::Abort(reason) = hook.before(&ctx) {
        tracing::debug!(
            target: "sqlhooks",
            kind = ?ctx.kind,
            sql = ctx.sql,
            reason = %reason,
            "statement aborted by hook"
        );
        return Err(SqlHooksError::Aborted(reason));
    }

    let result = call().await;
    match &result {
        Ok(value) => hook.after(&ctx, &value.outcome()),
        Err(e) => hook.after(&ctx, &Outcome::Error(e)),
    }
    result
}
