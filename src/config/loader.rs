//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine settings
//! and seed data from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::store::StoreSeed;

use super::types::EngineSettings;

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/payroll/
/// ├── engine.yaml   # Engine settings (overtime roles, rounding, audit, server)
/// └── seed.yaml     # Components, groups, employees, structure and source records
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/payroll").unwrap();
/// println!("Organisation: {}", loader.settings().metadata.organisation);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    settings: EngineSettings,
    seed: StoreSeed,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if either file is missing or contains invalid YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<EngineSettings>(&path.join("engine.yaml"))?;
        let seed = Self::load_yaml::<StoreSeed>(&path.join("seed.yaml"))?;

        if settings.overtime.rate_divisor.is_zero() {
            return Err(EngineError::ConfigParseError {
                path: path.join("engine.yaml").display().to_string(),
                message: "overtime.rate_divisor must be non-zero".to_string(),
            });
        }

        Ok(Self { settings, seed })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the seed data.
    pub fn seed(&self) -> &StoreSeed {
        &self.seed
    }

    /// Splits the loader into settings and seed.
    pub fn into_parts(self) -> (EngineSettings, StoreSeed) {
        (self.settings, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn config_path() -> &'static str {
        "./config/payroll"
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.settings().metadata.organisation, "Acme Manufacturing");
        assert_eq!(loader.settings().overtime.regular_component_id, 4);
        assert_eq!(loader.settings().overtime.rate_divisor, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_seed_is_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let seed = loader.seed();
        assert!(!seed.components.is_empty());
        assert!(!seed.groups.is_empty());
        assert!(seed.employees.iter().any(|e| e.id == "emp_001"));
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");
        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("engine.yaml"));
            }
            other => panic!("Expected ConfigNotFound error, got {:?}", other),
        }
    }
}
