//! Configuration loading and management for the back-office engine.
//!
//! This module provides functionality to load the application configuration
//! from a YAML file, including the listener address, database location, pay
//! rates and the settings of the accounting and groupware connectors.
//!
//! # Example
//!
//! ```no_run
//! use backoffice_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/backoffice.yaml").unwrap();
//! println!("Regular rate: {}", config.payroll_rates().regular_rate);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AccountingConfig, AccountingEnvironment, AccountingMode, AppConfig, DatabaseConfig,
    GroupwareConfig, GroupwareMode, LoggingConfig, PayrollRates, ServerConfig,
};
