mod row;
mod sql_value;

pub use row::{ExecResult, Row, Rows};
pub use sql_value::SqlValue;
