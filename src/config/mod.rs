//! Configuration loading and management for the payroll engine.
//!
//! This module loads engine settings (overtime roles, presentation rounding,
//! audit gate behaviour, server address) and seed data from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/payroll").unwrap();
//! println!("Loaded settings for: {}", config.settings().metadata.organisation);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AuditSettings, EngineMetadata, EngineSettings, OvertimeSettings, PresentationSettings,
    ServerSettings,
};
