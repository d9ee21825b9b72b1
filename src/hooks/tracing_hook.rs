use std::time::Duration;

use tracing::Level;

use super::truncate_sql_bytes;
use super::types::{Hook, HookAction, HookContext, Outcome};
use crate::types::SqlValue;

/// A `tracing`-based hook that logs every statement and how it ended.
///
/// `before` emits the statement at [`TracingHook::level`]. `after` emits the
/// elapsed time at the same level, or at `WARN` for failures and for
/// statements slower than the configured threshold.
#[derive(Debug, Clone)]
pub struct TracingHook {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Statements slower than this are logged at `WARN`.
    pub slow_threshold: Option<Duration>,
    /// Include argument values in the logged fields.
    pub log_args: bool,
}

impl Default for TracingHook {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            slow_threshold: None,
            log_args: false,
        }
    }
}

impl TracingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    /// Argument values may carry sensitive data; off by default.
    pub fn log_args(mut self, enabled: bool) -> Self {
        self.log_args = enabled;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn format_args(&self, args: &[SqlValue]) -> String {
        if !self.log_args {
            return "-".to_string();
        }
        let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
        format!("[{}]", rendered.join(", "))
    }

    pub(crate) fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_threshold.is_some_and(|threshold| elapsed > threshold)
    }
}

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN => tracing::warn!($($field)*),
            Level::INFO => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            _ => tracing::trace!($($field)*),
        }
    };
}

impl Hook for TracingHook {
    fn before(&self, ctx: &HookContext<'_>) -> HookAction {
        let sql = self.truncate_sql(ctx.sql);
        let args = self.format_args(ctx.args);
        emit_at_level!(
            self.level,
            target: "sqlhooks.sql",
            kind = ?ctx.kind,
            prepared = ctx.prepared,
            param_count = ctx.args.len(),
            args = %args,
            sql = %sql,
            "statement started"
        );
        HookAction::Continue
    }

    fn after(&self, ctx: &HookContext<'_>, outcome: &Outcome<'_>) {
        let elapsed = ctx.elapsed();
        let sql = self.truncate_sql(ctx.sql);
        match outcome {
            Outcome::Error(e) => tracing::warn!(
                target: "sqlhooks.sql",
                kind = ?ctx.kind,
                elapsed = ?elapsed,
                error = %e,
                sql = %sql,
                "statement failed"
            ),
            Outcome::Aborted(reason) => tracing::warn!(
                target: "sqlhooks.sql",
                kind = ?ctx.kind,
                reason = %reason,
                sql = %sql,
                "statement aborted"
            ),
            _ if self.is_slow(elapsed) => tracing::warn!(
                target: "sqlhooks.sql",
                kind = ?ctx.kind,
                elapsed = ?elapsed,
                outcome = %outcome,
                sql = %sql,
                "slow statement"
            ),
            _ => emit_at_level!(
                self.level,
                target: "sqlhooks.sql",
                kind = ?ctx.kind,
                elapsed = ?elapsed,
                outcome = %outcome,
                "statement finished"
            ),
        }
    }
}
