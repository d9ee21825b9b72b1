use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio_postgres::types::{IsNull, ToSql, Type};
use tokio_postgres::{Client, Column, NoTls};

use crate::error::{Result, SqlHooksError};
use crate::traits::{Connection, Driver, Statement};
use crate::types::{ExecResult, Rows, SqlValue};

/// PostgreSQL driver implementation using tokio-postgres.
///
/// The DSN is a libpq-style connection string or `postgres://` URL.
/// Placeholders use PostgreSQL syntax (`$1`, `$2`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>> {
        let (client, connection) = tokio_postgres::connect(dsn, NoTls)
            .await
            .map_err(|e| SqlHooksError::ConnectionFailed(e.to_string()))?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "sqlhooks", error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Box::new(PostgresConnection {
            client: Arc::new(client),
        }))
    }
}

struct PostgresConnection {
    client: Arc<Client>,
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| SqlHooksError::QueryFailed(e.to_string()))?;
        Ok(Box::new(PostgresStatement {
            client: Arc::clone(&self.client),
            statement,
        }))
    }

    async fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult> {
        let params = bind(args);
        let rows_affected = self
            .client
            .execute(sql, &param_refs(&params))
            .await
            .map_err(|e| SqlHooksError::QueryFailed(e.to_string()))?;
        Ok(ExecResult::new(rows_affected))
    }

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Rows> {
        // Prepared explicitly so column names survive an empty result.
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| SqlHooksError::QueryFailed(e.to_string()))?;
        let params = bind(args);
        let rows = self
            .client
            .query(&statement, &param_refs(&params))
            .await
            .map_err(|e| SqlHooksError::QueryFailed(e.to_string()))?;
        convert_rows(statement.columns(), &rows)
    }
}

struct PostgresStatement {
    client: Arc<Client>,
    statement: tokio_postgres::Statement,
}

#[async_trait]
impl Statement for PostgresStatement {
    fn param_count(&self) -> Option<usize> {
        Some(self.statement.params().len())
    }

    async fn exec(&self, args: &[SqlValue]) -> Result<ExecResult> {
        let params = bind(args);
        let rows_affected = self
            .client
            .execute(&self.statement, &param_refs(&params))
            .await
            .map_err(|e| SqlHooksError::QueryFailed(e.to_string()))?;
        Ok(ExecResult::new(rows_affected))
    }

    async fn query(&self, args: &[SqlValue]) -> Result<Rows> {
        let params = bind(args);
        let rows = self
            .client
            .query(&self.statement, &param_refs(&params))
            .await
            .map_err(|e| SqlHooksError::QueryFailed(e.to_string()))?;
        convert_rows(self.statement.columns(), &rows)
    }
}

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// Convert SqlValue arguments to tokio-postgres compatible types.
fn bind(args: &[SqlValue]) -> Vec<BoxedParam> {
    args.iter().map(sql_value_to_tosql).collect()
}

fn param_refs(params: &[BoxedParam]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|b| b.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

/// Untyped NULL parameter, accepted for any column type.
#[derive(Debug, Clone, Copy)]
struct Null;

impl ToSql for Null {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn sql_value_to_tosql(value: &SqlValue) -> BoxedParam {
    match value {
        SqlValue::Null => Box::new(Null),
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Int32(i) => Box::new(*i),
        SqlValue::Int64(i) => Box::new(*i),
        SqlValue::Float64(v) => Box::new(*v),
        SqlValue::Bool(b) => Box::new(*b),
    }
}

fn convert_rows(columns: &[Column], rows: &[tokio_postgres::Row]) -> Result<Rows> {
    let columns: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let values = rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .enumerate()
                .map(|(i, col)| column_value(row, i, col.type_()))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Rows::new(columns, values))
}

/// Convert the value at `index` to a SqlValue based on its column type.
fn column_value(row: &tokio_postgres::Row, index: usize, ty: &Type) -> Result<SqlValue> {
    let decode_err = |e: tokio_postgres::Error| SqlHooksError::QueryFailed(e.to_string());

    let value: SqlValue = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(index)
            .map_err(decode_err)?
            .into()
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(index)
            .map_err(decode_err)?
            .map(i32::from)
            .into()
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(index)
            .map_err(decode_err)?
            .into()
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(index)
            .map_err(decode_err)?
            .into()
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(index)
            .map_err(decode_err)?
            .map(f64::from)
            .into()
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(index)
            .map_err(decode_err)?
            .into()
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        row.try_get::<_, Option<String>>(index)
            .map_err(decode_err)?
            .into()
    } else {
        return Err(SqlHooksError::QueryFailed(format!(
            "unsupported column type {} at index {index}",
            ty.name()
        )));
    };
    Ok(value)
}
