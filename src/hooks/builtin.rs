use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::types::{Hook, HookAction, HookContext, Outcome, StatementKind};

/// A hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl Hook for NoopHook {}

type BeforeFn = dyn Fn(&HookContext<'_>) -> HookAction + Send + Sync;
type AfterFn = dyn Fn(&HookContext<'_>, &Outcome<'_>) + Send + Sync;

/// A hook built from closures.
///
/// ```
/// use sqlhooks::hooks::{FnHook, HookAction, Hooks};
///
/// let hooks = Hooks::new().with_query(
///     FnHook::new()
///         .on_before(|ctx| {
///             println!("[query] {} {:?}", ctx.sql, ctx.args);
///             HookAction::Continue
///         })
///         .on_after(|ctx, _| println!("[query] took {:?}", ctx.elapsed())),
/// );
/// assert!(hooks.query_hook().is_some());
/// ```
#[derive(Default)]
pub struct FnHook {
    before: Option<Box<BeforeFn>>,
    after: Option<Box<AfterFn>>,
}

impl FnHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> HookAction + Send + Sync + 'static,
    {
        self.before = Some(Box::new(f));
        self
    }

    pub fn on_after<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookContext<'_>, &Outcome<'_>) + Send + Sync + 'static,
    {
        self.after = Some(Box::new(f));
        self
    }
}

impl Hook for FnHook {
    fn before(&self, ctx: &HookContext<'_>) -> HookAction {
        match &self.before {
            Some(f) => f(ctx),
            None => HookAction::Continue,
        }
    }

    fn after(&self, ctx: &HookContext<'_>, outcome: &Outcome<'_>) {
        if let Some(f) = &self.after {
            f(ctx, outcome);
        }
    }
}

/// Runs several hooks in registration order.
///
/// The first hook to abort stops the `before` chain. Hooks earlier in the
/// chain then get their `after` call with [`Outcome::Aborted`], so every
/// `before` is matched by exactly one `after`.
#[derive(Default, Clone)]
pub struct CompositeHook {
    hooks: Vec<Arc<dyn Hook>>,
}

impl CompositeHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<H: Hook + 'static>(self, hook: H) -> Self {
        self.add_arc(Arc::new(hook))
    }

    pub fn add_arc(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Hook for CompositeHook {
    fn before(&self, ctx: &HookContext<'_>) -> HookAction {
        for (i, hook) in self.hooks.iter().enumerate() {
            if let HookAction::Abort(reason) = hook.before(ctx) {
                let outcome = Outcome::Aborted(&reason);
                for earlier in &self.hooks[..i] {
                    earlier.after(ctx, &outcome);
                }
                return HookAction::Abort(reason);
            }
        }
        HookAction::Continue
    }

    fn after(&self, ctx: &HookContext<'_>, outcome: &Outcome<'_>) {
        for hook in &self.hooks {
            hook.after(ctx, outcome);
        }
    }
}

/// A hook that counts statements and tracks their elapsed time.
#[derive(Debug, Default)]
pub struct StatsHook {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    exec_count: AtomicU64,
    query_count: AtomicU64,
    total_elapsed_nanos: AtomicU64,
    max_elapsed_nanos: AtomicU64,
}

/// Point-in-time copy of [`StatsHook`] counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Statements that passed through `before`.
    pub started: u64,
    /// Statements that reached `after`.
    pub completed: u64,
    /// Completed statements that failed or were aborted.
    pub failed: u64,
    pub exec_count: u64,
    pub query_count: u64,
    pub total_elapsed: Duration,
    pub max_elapsed: Duration,
}

impl StatsHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            exec_count: self.exec_count.load(Ordering::Relaxed),
            query_count: self.query_count.load(Ordering::Relaxed),
            total_elapsed: Duration::from_nanos(self.total_elapsed_nanos.load(Ordering::Relaxed)),
            max_elapsed: Duration::from_nanos(self.max_elapsed_nanos.load(Ordering::Relaxed)),
        }
    }

    /// Statements currently between `before` and `after`.
    pub fn in_flight(&self) -> u64 {
        let started = self.started.load(Ordering::Relaxed);
        started.saturating_sub(self.completed.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.started.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.exec_count.store(0, Ordering::Relaxed);
        self.query_count.store(0, Ordering::Relaxed);
        self.total_elapsed_nanos.store(0, Ordering::Relaxed);
        self.max_elapsed_nanos.store(0, Ordering::Relaxed);
    }
}

impl Hook for StatsHook {
    fn before(&self, ctx: &HookContext<'_>) -> HookAction {
        self.started.fetch_add(1, Ordering::Relaxed);
        match ctx.kind {
            StatementKind::Exec => self.exec_count.fetch_add(1, Ordering::Relaxed),
            StatementKind::Query => self.query_count.fetch_add(1, Ordering::Relaxed),
        };
        HookAction::Continue
    }

    fn after(&self, ctx: &HookContext<'_>, outcome: &Outcome<'_>) {
        let nanos = u64::try_from(ctx.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.completed.fetch_add(1, Ordering::Relaxed);
        if outcome.is_error() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_elapsed_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_elapsed_nanos.fetch_max(nanos, Ordering::Relaxed);
    }
}
