mod driver;

pub use driver::{Connection, Driver, Statement};
