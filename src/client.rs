use crate::drivers::PostgresDriver;
use crate::error::Result;
use crate::registry::DriverRegistry;
use crate::traits::{Connection, Driver, Statement};
use crate::types::{ExecResult, Rows, SqlValue};

/// Main entry point for callers.
/// Holds one open connection obtained from a named driver.
pub struct Database {
    conn: Box<dyn Connection>,
}

impl Database {
    /// Open a connection through the driver registered as `driver_name`.
    ///
    /// # Example
    /// ```ignore
    /// let registry = DriverRegistry::new();
    /// registry.register("fake", Arc::new(FakeDriver::new()))?;
    /// let db = Database::open(&registry, "fake", "d1").await?;
    /// ```
    pub async fn open(registry: &DriverRegistry, driver_name: &str, dsn: &str) -> Result<Self> {
        let conn = registry.open(driver_name, dsn).await?;
        Ok(Self { conn })
    }

    /// Connect to a PostgreSQL database using the provided connection string.
    pub async fn connect_postgres(connection_string: &str) -> Result<Self> {
        let conn = PostgresDriver::new().open(connection_string).await?;
        Ok(Self { conn })
    }

    /// Wrap an already open connection.
    pub fn with_connection(conn: Box<dyn Connection>) -> Self {
        Self { conn }
    }

    /// Execute a statement that produces no rows.
    pub async fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult> {
        self.conn.exec(sql, args).await
    }

    /// Execute a statement that produces rows.
    pub async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Rows> {
        self.conn.query(sql, args).await
    }

    /// Prepare a statement for repeated execution.
    pub async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        self.conn.prepare(sql).await
    }

    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await
    }
}
