use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, SqlHooksError};
use crate::hooks::StatementKind;
use crate::traits::{Connection, Driver, Statement};
use crate::types::{ExecResult, Rows, SqlValue};

/// A recorded statement execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub kind: StatementKind,
    pub sql: String,
    pub args: Vec<SqlValue>,
}

/// An in-memory database driver for testing.
///
/// Statements use a pipe-delimited mini-language instead of SQL:
///
/// | Statement | Meaning |
/// |-----------|---------|
/// | `CREATE\|t\|f1=string,f2=int32` | create table `t` |
/// | `INSERT\|t\|f1=?,f2=7` | insert one row, `?` binds the next argument |
/// | `SELECT\|t\|f1,f2\|f2=?` | select columns, optional equality filters |
/// | `WIPE` | drop every table |
///
/// Column types are `string`, `int32`, `int64`, `bool` and `float64`.
/// Connections opened with the same DSN share one database.
///
/// # Example
/// ```
/// use sqlhooks::drivers::FakeDriver;
/// use sqlhooks::traits::Driver;
///
/// # tokio_test_block(async {
/// let driver = FakeDriver::new();
/// let conn = driver.open("db1").await.unwrap();
/// conn.exec("CREATE|t|f1=string", &[]).await.unwrap();
/// conn.exec("INSERT|t|f1=?", &["a".into()]).await.unwrap();
/// let rows = conn.query("SELECT|t|f1|", &[]).await.unwrap();
/// assert_eq!(rows.len(), 1);
/// driver.assert_statement_count(3);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub struct FakeDriver {
    databases: Mutex<HashMap<String, Arc<FakeDatabase>>>,
    recorded: Arc<Mutex<Vec<RecordedStatement>>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            databases: Mutex::new(HashMap::new()),
            recorded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get all recorded statements that have been executed.
    pub fn recorded_statements(&self) -> Vec<RecordedStatement> {
        self.recorded.lock().unwrap().clone()
    }

    /// Get the last recorded statement, if any.
    pub fn last_statement(&self) -> Option<RecordedStatement> {
        self.recorded.lock().unwrap().last().cloned()
    }

    pub fn clear_recorded_statements(&self) {
        self.recorded.lock().unwrap().clear();
    }

    /// Assert that the last statement matches the expected text and arguments.
    pub fn assert_last_statement(&self, expected_sql: &str, expected_args: &[SqlValue]) {
        let last = self.last_statement().expect("No statements were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.args, expected_args,
            "Arguments mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_args, last.args
        );
    }

    /// Assert that exactly n statements were executed.
    pub fn assert_statement_count(&self, expected: usize) {
        let actual = self.recorded.lock().unwrap().len();
        assert_eq!(
            actual, expected,
            "Statement count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    fn database(&self, dsn: &str) -> Arc<FakeDatabase> {
        let mut databases = self.databases.lock().unwrap();
        Arc::clone(databases.entry(dsn.to_string()).or_default())
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>> {
        if dsn.is_empty() {
            return Err(SqlHooksError::ConnectionFailed(
                "fake driver needs a database name".to_string(),
            ));
        }
        Ok(Box::new(FakeConnection {
            db: self.database(dsn),
            recorded: Arc::clone(&self.recorded),
            closed: AtomicBool::new(false),
        }))
    }
}

#[derive(Debug, Default)]
struct FakeDatabase {
    tables: Mutex<HashMap<String, FakeTable>>,
}

#[derive(Debug)]
struct FakeTable {
    columns: Vec<(String, ColumnType)>,
    rows: Vec<Vec<SqlValue>>,
}

impl FakeTable {
    fn column_index(&self, table: &str, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|(name, _)| name == column)
            .ok_or_else(|| SqlHooksError::ColumnNotFound(format!("{table}.{column}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    String,
    Int32,
    Int64,
    Bool,
    Float64,
}

impl ColumnType {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "string" => Ok(ColumnType::String),
            "int32" => Ok(ColumnType::Int32),
            "int64" => Ok(ColumnType::Int64),
            "bool" => Ok(ColumnType::Bool),
            "float64" => Ok(ColumnType::Float64),
            other => Err(SqlHooksError::query_failed(format!(
                "unsupported column type: {other}"
            ))),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Bool => "bool",
            ColumnType::Float64 => "float64",
        }
    }

    /// Parse a literal written inline in a statement.
    fn parse_literal(self, literal: &str) -> Result<SqlValue> {
        let invalid = || {
            SqlHooksError::query_failed(format!("invalid {} literal: {literal}", self.name()))
        };
        match self {
            ColumnType::String => Ok(SqlValue::Text(literal.to_string())),
            ColumnType::Int32 => literal.parse().map(SqlValue::Int32).map_err(|_| invalid()),
            ColumnType::Int64 => literal.parse().map(SqlValue::Int64).map_err(|_| invalid()),
            ColumnType::Bool => literal.parse().map(SqlValue::Bool).map_err(|_| invalid()),
            ColumnType::Float64 => literal.parse().map(SqlValue::Float64).map_err(|_| invalid()),
        }
    }

    /// Check a bound value against this column type, widening integers where lossless.
    fn coerce(self, column: &str, value: &SqlValue) -> Result<SqlValue> {
        let coerced = match (self, value) {
            (_, SqlValue::Null) => Some(SqlValue::Null),
            (ColumnType::String, SqlValue::Text(_)) => Some(value.clone()),
            (ColumnType::Int32, SqlValue::Int32(_)) => Some(value.clone()),
            (ColumnType::Int32, SqlValue::Int64(i)) => i32::try_from(*i).ok().map(SqlValue::Int32),
            (ColumnType::Int64, v) => v.as_i64().map(SqlValue::Int64),
            (ColumnType::Bool, SqlValue::Bool(_)) => Some(value.clone()),
            (ColumnType::Float64, SqlValue::Float64(_)) => Some(value.clone()),
            (ColumnType::Float64, v) => v.as_i64().map(|i| SqlValue::Float64(i as f64)),
            _ => None,
        };
        coerced.ok_or_else(|| {
            SqlHooksError::query_failed(format!(
                "column {column} expects {}, got {}",
                self.name(),
                value.type_name()
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// Index into the argument list.
    Placeholder(usize),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Create {
        table: String,
        columns: Vec<(String, ColumnType)>,
    },
    Insert {
        table: String,
        values: Vec<(String, Operand)>,
    },
    Select {
        table: String,
        columns: Vec<String>,
        filters: Vec<(String, Operand)>,
    },
    Wipe,
}

impl Command {
    /// Parse a statement and count its placeholders.
    fn parse(sql: &str) -> Result<(Self, usize)> {
        let parts: Vec<&str> = sql.split('|').collect();
        let malformed = || SqlHooksError::query_failed(format!("malformed statement: {sql:?}"));
        let mut placeholders = 0;

        let command = match parts.as_slice() {
            ["WIPE"] => Command::Wipe,
            ["CREATE", table, defs] if !table.is_empty() => {
                let columns = split_pairs(defs)
                    .ok_or_else(malformed)?
                    .into_iter()
                    .map(|(name, ty)| -> Result<(String, ColumnType)> {
                        Ok((name.to_string(), ColumnType::parse(ty)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Command::Create {
                    table: table.to_string(),
                    columns,
                }
            }
            ["INSERT", table, defs] if !table.is_empty() => Command::Insert {
                table: table.to_string(),
                values: operands(split_pairs(defs).ok_or_else(malformed)?, &mut placeholders),
            },
            ["SELECT", table, columns, filters] if !table.is_empty() && !columns.is_empty() => {
                let columns: Vec<String> = columns.split(',').map(str::to_string).collect();
                if columns.iter().any(String::is_empty) {
                    return Err(malformed());
                }
                let filters = if filters.is_empty() {
                    Vec::new()
                } else {
                    operands(split_pairs(filters).ok_or_else(malformed)?, &mut placeholders)
                };
                Command::Select {
                    table: table.to_string(),
                    columns,
                    filters,
                }
            }
            _ => return Err(malformed()),
        };
        Ok((command, placeholders))
    }
}

/// Split `a=b,c=d` into pairs. `None` if any pair is incomplete.
fn split_pairs(defs: &str) -> Option<Vec<(&str, &str)>> {
    defs.split(',')
        .map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (!key.is_empty() && !value.is_empty()).then_some((key, value))
        })
        .collect()
}

fn operands(pairs: Vec<(&str, &str)>, placeholders: &mut usize) -> Vec<(String, Operand)> {
    pairs
        .into_iter()
        .map(|(column, value)| {
            let operand = if value == "?" {
                *placeholders += 1;
                Operand::Placeholder(*placeholders - 1)
            } else {
                Operand::Literal(value.to_string())
            };
            (column.to_string(), operand)
        })
        .collect()
}

fn resolve(
    operand: &Operand,
    ty: ColumnType,
    column: &str,
    args: &[SqlValue],
) -> Result<SqlValue> {
    match operand {
        Operand::Placeholder(i) => ty.coerce(column, &args[*i]),
        Operand::Literal(literal) => ty.parse_literal(literal),
    }
}

struct FakeConnection {
    db: Arc<FakeDatabase>,
    recorded: Arc<Mutex<Vec<RecordedStatement>>>,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SqlHooksError::Closed("connection"));
        }
        let (command, param_count) = Command::parse(sql)?;
        Ok(Box::new(FakeStatement {
            sql: sql.to_string(),
            command,
            param_count,
            db: Arc::clone(&self.db),
            recorded: Arc::clone(&self.recorded),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeStatement {
    sql: String,
    command: Command,
    param_count: usize,
    db: Arc<FakeDatabase>,
    recorded: Arc<Mutex<Vec<RecordedStatement>>>,
    closed: AtomicBool,
}

impl FakeStatement {
    /// Record the execution and validate it can run.
    fn begin(&self, kind: StatementKind, args: &[SqlValue]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SqlHooksError::Closed("statement"));
        }
        self.recorded.lock().unwrap().push(RecordedStatement {
            kind,
            sql: self.sql.clone(),
            args: args.to_vec(),
        });
        if args.len() != self.param_count {
            return Err(SqlHooksError::ArgumentCount {
                expected: self.param_count,
                actual: args.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Statement for FakeStatement {
    fn param_count(&self) -> Option<usize> {
        Some(self.param_count)
    }

    async fn exec(&self, args: &[SqlValue]) -> Result<ExecResult> {
        self.begin(StatementKind::Exec, args)?;
        let mut tables = self.db.tables.lock().unwrap();

        match &self.command {
            Command::Wipe => {
                tables.clear();
                Ok(ExecResult::new(0))
            }
            Command::Create { table, columns } => {
                if tables.contains_key(table) {
                    return Err(SqlHooksError::query_failed(format!(
                        "table {table} already exists"
                    )));
                }
                tables.insert(
                    table.clone(),
                    FakeTable {
                        columns: columns.clone(),
                        rows: Vec::new(),
                    },
                );
                Ok(ExecResult::new(0))
            }
            Command::Insert { table, values } => {
                let target = tables
                    .get_mut(table)
                    .ok_or_else(|| SqlHooksError::query_failed(format!("no such table: {table}")))?;
                let mut row = vec![SqlValue::Null; target.columns.len()];
                for (column, operand) in values {
                    let index = target.column_index(table, column)?;
                    let ty = target.columns[index].1;
                    row[index] = resolve(operand, ty, column, args)?;
                }
                target.rows.push(row);
                let id = i64::try_from(target.rows.len()).unwrap_or(i64::MAX);
                Ok(ExecResult::new(1).with_last_insert_id(id))
            }
            Command::Select { .. } => Err(SqlHooksError::query_failed(
                "SELECT produces rows; use query",
            )),
        }
    }

    async fn query(&self, args: &[SqlValue]) -> Result<Rows> {
        self.begin(StatementKind::Query, args)?;
        let Command::Select {
            table,
            columns,
            filters,
        } = &self.command
        else {
            return Err(SqlHooksError::query_failed(format!(
                "statement produces no rows: {}",
                self.sql
            )));
        };

        let tables = self.db.tables.lock().unwrap();
        let source = tables
            .get(table)
            .ok_or_else(|| SqlHooksError::query_failed(format!("no such table: {table}")))?;

        let projection = columns
            .iter()
            .map(|column| source.column_index(table, column))
            .collect::<Result<Vec<_>>>()?;
        let conditions = filters
            .iter()
            .map(|(column, operand)| -> Result<(usize, SqlValue)> {
                let index = source.column_index(table, column)?;
                let value = resolve(operand, source.columns[index].1, column, args)?;
                Ok((index, value))
            })
            .collect::<Result<Vec<_>>>()?;

        let values: Vec<Vec<SqlValue>> = source
            .rows
            .iter()
            .filter(|row| conditions.iter().all(|(i, value)| &row[*i] == value))
            .map(|row| projection.iter().map(|i| row[*i].clone()).collect())
            .collect();

        Ok(Rows::new(columns.clone(), values))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let (command, params) = Command::parse("CREATE|t|f1=string,f2=int32").unwrap();
        assert_eq!(params, 0);
        assert_eq!(
            command,
            Command::Create {
                table: "t".to_string(),
                columns: vec![
                    ("f1".to_string(), ColumnType::String),
                    ("f2".to_string(), ColumnType::Int32),
                ],
            }
        );
    }

    #[test]
    fn test_parse_counts_placeholders() {
        let (_, params) = Command::parse("INSERT|t|f1=?,f2=3,f3=?").unwrap();
        assert_eq!(params, 2);

        let (command, params) = Command::parse("SELECT|t|f1|f2=?").unwrap();
        assert_eq!(params, 1);
        match command {
            Command::Select { filters, .. } => {
                assert_eq!(filters, vec![("f2".to_string(), Operand::Placeholder(0))]);
            }
            _ => panic!("Expected Select"),
        }
    }

    #[test]
    fn test_parse_select_without_filters() {
        let (command, params) = Command::parse("SELECT|t|f1|").unwrap();
        assert_eq!(params, 0);
        assert_eq!(
            command,
            Command::Select {
                table: "t".to_string(),
                columns: vec!["f1".to_string()],
                filters: vec![],
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for sql in [
            "",
            "DROP|t",
            "CREATE|t|",
            "CREATE|t|f1",
            "CREATE|t|f1=blob",
            "INSERT|t|f1=",
            "SELECT|t|f1",
            "SELECT|t||",
            "SELECT * FROM t",
        ] {
            assert!(Command::parse(sql).is_err(), "expected {sql:?} to be rejected");
        }
    }

    #[test]
    fn test_coerce() {
        assert_eq!(
            ColumnType::Int64.coerce("n", &SqlValue::Int32(4)).unwrap(),
            SqlValue::Int64(4)
        );
        assert_eq!(
            ColumnType::Int32.coerce("n", &SqlValue::Int64(4)).unwrap(),
            SqlValue::Int32(4)
        );
        assert!(ColumnType::Int32
            .coerce("n", &SqlValue::Int64(i64::MAX))
            .is_err());
        assert!(ColumnType::String.coerce("s", &SqlValue::Bool(true)).is_err());
        assert_eq!(
            ColumnType::Bool.coerce("b", &SqlValue::Null).unwrap(),
            SqlValue::Null
        );
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(
            ColumnType::Int32.parse_literal("7").unwrap(),
            SqlValue::Int32(7)
        );
        assert_eq!(
            ColumnType::Bool.parse_literal("true").unwrap(),
            SqlValue::Bool(true)
        );
        assert!(ColumnType::Int32.parse_literal("seven").is_err());
    }

    #[tokio::test]
    async fn test_create_insert_select() {
        let driver = FakeDriver::new();
        let conn = driver.open("db").await.unwrap();

        conn.exec("CREATE|people|name=string,age=int32", &[])
            .await
            .unwrap();
        let result = conn
            .exec("INSERT|people|name=?,age=?", &["alice".into(), SqlValue::Int32(30)])
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(1));
        conn.exec("INSERT|people|name=bob,age=41", &[]).await.unwrap();

        let rows = conn
            .query("SELECT|people|name|age=?", &[SqlValue::Int32(41)])
            .await
            .unwrap();
        assert_eq!(rows.columns(), &["name".to_string()]);
        assert_eq!(rows.single_row().unwrap().get_str("name").unwrap(), "bob");

        driver.assert_last_statement("SELECT|people|name|age=?", &[SqlValue::Int32(41)]);
        driver.assert_statement_count(4);
    }

    #[tokio::test]
    async fn test_dsn_shares_database() {
        let driver = FakeDriver::new();
        let first = driver.open("shared").await.unwrap();
        let second = driver.open("shared").await.unwrap();
        let other = driver.open("other").await.unwrap();

        first.exec("CREATE|t|f1=string", &[]).await.unwrap();
        second.exec("INSERT|t|f1=x", &[]).await.unwrap();

        assert_eq!(first.query("SELECT|t|f1|", &[]).await.unwrap().len(), 1);
        assert!(other.query("SELECT|t|f1|", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_errors() {
        let driver = FakeDriver::new();
        let conn = driver.open("db").await.unwrap();
        conn.exec("CREATE|t|f1=string", &[]).await.unwrap();

        assert!(conn.exec("CREATE|t|f1=string", &[]).await.is_err());
        assert!(conn.exec("INSERT|u|f1=a", &[]).await.is_err());
        assert!(matches!(
            conn.exec("INSERT|t|f2=a", &[]).await,
            Err(SqlHooksError::ColumnNotFound(_))
        ));
        assert!(matches!(
            conn.exec("INSERT|t|f1=?", &[]).await,
            Err(SqlHooksError::ArgumentCount {
                expected: 1,
                actual: 0
            })
        ));
        assert!(conn.exec("INSERT|t|f1=?", &[SqlValue::Int32(1)]).await.is_err());
        assert!(conn.exec("SELECT|t|f1|", &[]).await.is_err());
        assert!(conn.query("INSERT|t|f1=a", &[]).await.is_err());
        assert!(driver.open("").await.is_err());
    }

    #[tokio::test]
    async fn test_closed_statement_and_connection() {
        let driver = FakeDriver::new();
        let conn = driver.open("db").await.unwrap();
        let stmt = conn.prepare("CREATE|t|f1=string").await.unwrap();
        assert_eq!(stmt.param_count(), Some(0));

        stmt.close().await.unwrap();
        assert!(matches!(
            stmt.exec(&[]).await,
            Err(SqlHooksError::Closed("statement"))
        ));

        conn.close().await.unwrap();
        assert!(matches!(
            conn.prepare("WIPE").await,
            Err(SqlHooksError::Closed("connection"))
        ));
    }

    #[tokio::test]
    async fn test_wipe() {
        let driver = FakeDriver::new();
        let conn = driver.open("db").await.unwrap();
        conn.exec("CREATE|t|f1=string", &[]).await.unwrap();
        conn.exec("WIPE", &[]).await.unwrap();
        conn.exec("CREATE|t|f1=string", &[]).await.unwrap();
        driver.clear_recorded_statements();
        driver.assert_statement_count(0);
    }
}
