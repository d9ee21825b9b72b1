//! Driver registry
//!
//! Maps names to drivers so connections can be opened by driver name. A
//! registry is an ordinary value: create one per configuration (or per test)
//! and hand it to whatever opens connections.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Result, SqlHooksError};
use crate::traits::{Connection, Driver};

/// Registry that holds named drivers.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl DriverRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a driver under `name`.
    ///
    /// Fails with `DuplicateDriver` if the name is taken; the existing
    /// registration is kept.
    pub fn register(&self, name: impl Into<String>, driver: Arc<dyn Driver>) -> Result<()> {
        let name = name.into();
        let mut drivers = self.drivers.write().unwrap();
        if drivers.contains_key(&name) {
            return Err(SqlHooksError::DuplicateDriver(name));
        }
        tracing::debug!(target: "sqlhooks", driver = %name, "registered driver");
        drivers.insert(name, driver);
        Ok(())
    }

    /// Gets a driver by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| SqlHooksError::DriverNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drivers.read().unwrap().contains_key(name)
    }

    /// Lists registered driver names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.drivers.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.read().unwrap().is_empty()
    }

    /// Opens a connection through the driver registered under `name`.
    pub async fn open(&self, name: &str, dsn: &str) -> Result<Box<dyn Connection>> {
        let driver = self.get(name)?;
        driver.open(dsn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::FakeDriver;

    #[test]
    fn test_register_and_get() {
        let registry = DriverRegistry::new();
        assert!(registry.is_empty());

        registry
            .register("fake", Arc::new(FakeDriver::new()))
            .unwrap();

        assert!(registry.contains("fake"));
        assert!(registry.get("fake").is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = DriverRegistry::new();
        let first: Arc<dyn Driver> = Arc::new(FakeDriver::new());
        registry.register("fake", Arc::clone(&first)).unwrap();

        let err = registry
            .register("fake", Arc::new(FakeDriver::new()))
            .unwrap_err();
        match err {
            SqlHooksError::DuplicateDriver(name) => assert_eq!(name, "fake"),
            _ => panic!("Expected DuplicateDriver error"),
        }

        assert!(Arc::ptr_eq(&registry.get("fake").unwrap(), &first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_driver() {
        let registry = DriverRegistry::new();
        match registry.get("nope") {
            Err(SqlHooksError::DriverNotFound(name)) => assert_eq!(name, "nope"),
            _ => panic!("Expected DriverNotFound error"),
        }
    }

    #[test]
    fn test_names_sorted() {
        let registry = DriverRegistry::new();
        registry.register("b", Arc::new(FakeDriver::new())).unwrap();
        registry.register("a", Arc::new(FakeDriver::new())).unwrap();
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_open_unknown_driver() {
        let registry = DriverRegistry::new();
        assert!(matches!(
            registry.open("nope", "d1").await,
            Err(SqlHooksError::DriverNotFound(_))
        ));
    }
}
