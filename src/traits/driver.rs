use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ExecResult, Rows, SqlValue};

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Opening connections from a driver-specific data source name
/// - Converting SqlValue arguments to native types
/// - Converting native results back to Rows and ExecResult
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a new connection. The meaning of `dsn` is up to the driver.
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>>;
}

/// A single open connection to a database.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Prepare a statement for later execution.
    async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Execute a statement that produces no rows.
    ///
    /// The default prepares a one-off statement, executes it and closes it.
    async fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult> {
        let stmt = self.prepare(sql).await?;
        let result = stmt.exec(args).await;
        let closed = stmt.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    /// Execute a statement that produces rows.
    ///
    /// The default prepares a one-off statement, queries it and closes it.
    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Rows> {
        let stmt = self.prepare(sql).await?;
        let result = stmt.query(args).await;
        let closed = stmt.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A prepared statement bound to the connection that created it.
#[async_trait]
pub trait Statement: Send + Sync {
    /// Number of placeholders, if the driver knows it.
    fn param_count(&self) -> Option<usize> {
        None
    }

    async fn exec(&self, args: &[SqlValue]) -> Result<ExecResult>;

    async fn query(&self, args: &[SqlValue]) -> Result<Rows>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
