use std::collections::HashMap;

use crate::error::{Result, SqlHooksError};
use crate::types::SqlValue;

/// Outcome of a statement that does not produce rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Number of rows inserted, updated or deleted
    pub rows_affected: u64,
    /// Identifier of the last inserted row, when the driver reports one
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// A single row from a result set.
/// Values are accessed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: HashMap<String, SqlValue>,
}

impl Row {
    pub(crate) fn new(columns: &[String], values: Vec<SqlValue>) -> Self {
        let values = columns
            .iter()
            .zip(values)
            .map(|(col, val)| (col.clone(), val))
            .collect();
        Self { values }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.values
            .get(column)
            .ok_or_else(|| SqlHooksError::ColumnNotFound(column.to_string()))
    }

    /// Gets a text value by column name.
    /// Fails with `QueryFailed` if the column holds a non-text value.
    pub fn get_str(&self, column: &str) -> Result<&str> {
        let value = self.get(column)?;
        value.as_str().ok_or_else(|| {
            SqlHooksError::query_failed(format!(
                "column {column} holds {}, not string",
                value.type_name()
            ))
        })
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> Vec<&str> {
        self.values.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result set of a query, containing zero or more rows in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    columns: Vec<String>,
    values: Vec<Vec<SqlValue>>,
}

impl Rows {
    pub fn new(columns: Vec<String>, values: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        if self.values.len() != 1 {
            return Err(SqlHooksError::UnexpectedRowCount {
                expected: 1,
                actual: self.values.len(),
            });
        }
        let columns = self.columns;
        self.values
            .into_iter()
            .next()
            .map(|values| Row::new(&columns, values))
            .ok_or(SqlHooksError::UnexpectedRowCount {
                expected: 1,
                actual: 0,
            })
    }

    /// Returns all rows, keyed by column name.
    pub fn rows(self) -> Vec<Row> {
        let columns = self.columns;
        self.values
            .into_iter()
            .map(|values| Row::new(&columns, values))
            .collect()
    }

    /// Returns the raw values without consuming the result.
    pub fn rows_ref(&self) -> &[Vec<SqlValue>] {
        &self.values
    }

    /// Returns every value of one column, in row order.
    pub fn column_values(&self, column: &str) -> Result<Vec<&SqlValue>> {
        let index = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| SqlHooksError::ColumnNotFound(column.to_string()))?;
        Ok(self.values.iter().filter_map(|row| row.get(index)).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rows: Vec<Vec<SqlValue>>) -> Rows {
        Rows::new(vec!["id".to_string(), "name".to_string()], rows)
    }

    #[test]
    fn test_row_get() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let row = Row::new(&columns, vec![SqlValue::Int32(1), "John".into()]);

        assert_eq!(row.get("id").unwrap(), &SqlValue::Int32(1));
        assert_eq!(row.get_str("name").unwrap(), "John");
        assert!(row.get("missing").is_err());
        assert!(row.get_str("id").is_err());
    }

    #[test]
    fn test_single_row() {
        let rows = sample(vec![vec![SqlValue::Int32(1), "a".into()]]);
        let row = rows.single_row().unwrap();
        assert_eq!(row.get_str("name").unwrap(), "a");
    }

    #[test]
    fn test_single_row_error_on_empty() {
        let err = sample(vec![]).single_row().unwrap_err();
        match err {
            SqlHooksError::UnexpectedRowCount { expected, actual } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 0);
            }
            _ => panic!("Expected UnexpectedRowCount error"),
        }
    }

    #[test]
    fn test_single_row_error_on_multiple() {
        let rows = sample(vec![
            vec![SqlValue::Int32(1), "a".into()],
            vec![SqlValue::Int32(2), "b".into()],
        ]);
        match rows.single_row().unwrap_err() {
            SqlHooksError::UnexpectedRowCount { expected, actual } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            _ => panic!("Expected UnexpectedRowCount error"),
        }
    }

    #[test]
    fn test_column_values() {
        let rows = sample(vec![
            vec![SqlValue::Int32(1), "a".into()],
            vec![SqlValue::Int32(2), "b".into()],
        ]);
        let names: Vec<_> = rows
            .column_values("name")
            .unwrap()
            .into_iter()
            .filter_map(SqlValue::as_str)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(rows.column_values("missing").is_err());
    }
}
