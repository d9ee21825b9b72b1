mod fake;
mod tokio_postgres;

pub use self::fake::{FakeDriver, RecordedStatement};
pub use self::tokio_postgres::PostgresDriver;
