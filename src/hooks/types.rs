use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::SqlHooksError;
use crate::types::{ExecResult, Rows, SqlValue};

/// Which kind of statement a hook is observing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Statement that produces no result set.
    Exec,
    /// Statement that produces a result set.
    Query,
}

/// Everything a hook gets to see about one statement call.
///
/// The same context is handed to [`Hook::before`] and [`Hook::after`], so
/// per-call state such as the start time travels with it.
#[derive(Debug, Clone)]
pub struct HookContext<'a> {
    /// Exec or query.
    pub kind: StatementKind,
    /// Statement text exactly as the caller issued (or prepared) it.
    pub sql: &'a str,
    /// Arguments bound for this call.
    pub args: &'a [SqlValue],
    /// Whether the call goes through a prepared statement.
    pub prepared: bool,
    /// When the hooked call started.
    pub started_at: Instant,
}

impl<'a> HookContext<'a> {
    /// Create a context for an ad-hoc statement, starting now.
    pub fn new(kind: StatementKind, sql: &'a str, args: &'a [SqlValue]) -> Self {
        Self {
            kind,
            sql,
            args,
            prepared: false,
            started_at: Instant::now(),
        }
    }

    /// Mark this context as belonging to a prepared statement.
    pub fn prepared(mut self) -> Self {
        self.prepared = true;
        self
    }

    /// Time since the hooked call started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Decision returned by [`Hook::before`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HookAction {
    /// Run the statement.
    #[default]
    Continue,
    /// Skip the statement and fail the call with [`SqlHooksError::Aborted`].
    Abort(String),
}

/// Read-only view of how a hooked call ended.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Exec(&'a ExecResult),
    Rows(&'a Rows),
    Error(&'a SqlHooksError),
    /// Another hook aborted the statement after this one's `before` ran.
    Aborted(&'a str),
}

impl Outcome<'_> {
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_) | Outcome::Aborted(_))
    }
}

impl fmt::Display for Outcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Exec(result) => write!(f, "{} affected", result.rows_affected),
            Outcome::Rows(rows) => write!(f, "{} rows", rows.len()),
            Outcome::Error(e) => write!(f, "error: {e}"),
            Outcome::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

/// Results a hook can observe.
pub(crate) trait Observe {
    fn outcome(&self) -> Outcome<'_>;
}

impl Observe for ExecResult {
    fn outcome(&self) -> Outcome<'_> {
        Outcome::Exec(self)
    }
}

impl Observe for Rows {
    fn outcome(&self) -> Outcome<'_> {
        Outcome::Rows(self)
    }
}

/// Two-phase hook around a statement call.
///
/// Both methods default to doing nothing, so implementors only override the
/// phase they care about.
pub trait Hook: Send + Sync {
    /// Called before the statement is handed to the inner driver.
    fn before(&self, _ctx: &HookContext<'_>) -> HookAction {
        HookAction::Continue
    }

    /// Called exactly once after the inner driver returns, on success and on error.
    ///
    /// Not called when [`Hook::before`] aborted the statement.
    fn after(&self, _ctx: &HookContext<'_>, _outcome: &Outcome<'_>) {}
}

impl<H: Hook + ?Sized> Hook for Arc<H> {
    fn before(&self, ctx: &HookContext<'_>) -> HookAction {
        (**self).before(ctx)
    }

    fn after(&self, ctx: &HookContext<'_>, outcome: &Outcome<'_>) {
        (**self).after(ctx, outcome)
    }
}

/// The pair of hook slots attached to a hooked driver.
///
/// An unset slot means the matching call path is not hooked at all.
#[derive(Clone, Default)]
pub struct Hooks {
    exec: Option<Arc<dyn Hook>>,
    query: Option<Arc<dyn Hook>>,
}

impl Hooks {
    /// Create hooks with both slots unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hook for statements that produce no rows.
    pub fn with_exec<H: Hook + 'static>(self, hook: H) -> Self {
        self.with_exec_arc(Arc::new(hook))
    }

    pub fn with_exec_arc(mut self, hook: Arc<dyn Hook>) -> Self {
        self.exec = Some(hook);
        self
    }

    /// Set the hook for statements that produce rows.
    pub fn with_query<H: Hook + 'static>(self, hook: H) -> Self {
        self.with_query_arc(Arc::new(hook))
    }

    pub fn with_query_arc(mut self, hook: Arc<dyn Hook>) -> Self {
        self.query = Some(hook);
        self
    }

    /// Install one hook instance in both slots.
    pub fn with_both<H: Hook + 'static>(self, hook: H) -> Self {
        let hook: Arc<dyn Hook> = Arc::new(hook);
        self.with_exec_arc(Arc::clone(&hook)).with_query_arc(hook)
    }

    pub fn exec_hook(&self) -> Option<&Arc<dyn Hook>> {
        self.exec.as_ref()
    }

    pub fn query_hook(&self) -> Option<&Arc<dyn Hook>> {
        self.query.as_ref()
    }

    /// The slot matching a statement kind.
    pub fn for_kind(&self, kind: StatementKind) -> Option<&Arc<dyn Hook>> {
        match kind {
            StatementKind::Exec => self.exec_hook(),
            StatementKind::Query => self.query_hook(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exec.is_none() && self.query.is_none()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("exec", &self.exec.is_some())
            .field("query", &self.query.is_some())
            .finish()
    }
}
