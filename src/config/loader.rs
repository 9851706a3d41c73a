//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the
//! application configuration from a YAML file and applying environment
//! overrides for secrets.

use rust_decimal::Decimal;
use std::fs;
use std::path::Path;

use crate::error::{BackofficeError, BackofficeResult};

use super::types::{AppConfig, PayrollRates};

/// Environment variables that override configuration values.
const ENV_OVERRIDES: &[&str] = &[
    "DATABASE_PATH",
    "QUICKBOOKS_CLIENT_ID",
    "QUICKBOOKS_CLIENT_SECRET",
    "QUICKBOOKS_REDIRECT_URI",
    "AZURE_AD_TENANT_ID",
    "AZURE_AD_CLIENT_ID",
    "AZURE_AD_CLIENT_SECRET",
    "SHAREPOINT_SITE_ID",
];

/// Loads and provides access to application configuration.
///
/// # Example
///
/// ```no_run
/// use backoffice_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/backoffice.yaml")?;
/// println!("Listening on {}", loader.config().server.bind_address);
/// # Ok::<(), backoffice_engine::error::BackofficeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: AppConfig,
}

impl ConfigLoader {
    /// Loads configuration from the given YAML file and applies overrides
    /// from the process environment.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - The file is missing
    /// - The file contains invalid YAML
    /// - A pay rate is negative
    pub fn load<P: AsRef<Path>>(path: P) -> BackofficeResult<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Loads configuration, resolving overrides through `lookup` instead of
    /// the process environment.
    pub fn load_with_env<P, F>(path: P, lookup: F) -> BackofficeResult<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| BackofficeError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let mut config = Self::parse(&content, &path_str)?;
        Self::apply_overrides(&mut config, lookup);
        Ok(Self { config })
    }

    /// Wraps an already-built configuration.
    pub fn from_config(config: AppConfig) -> Self {
        Self { config }
    }

    /// Parses and validates YAML content.
    fn parse(content: &str, path: &str) -> BackofficeResult<AppConfig> {
        // An empty file is a valid all-defaults configuration.
        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }

        let config: AppConfig =
            serde_yaml::from_str(content).map_err(|e| BackofficeError::ConfigParseError {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let PayrollRates {
            regular_rate,
            overtime_rate,
        } = config.payroll;
        if regular_rate < Decimal::ZERO || overtime_rate < Decimal::ZERO {
            return Err(BackofficeError::ConfigParseError {
                path: path.to_string(),
                message: "payroll rates must not be negative".to_string(),
            });
        }

        Ok(config)
    }

    fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ENV_OVERRIDES {
            let Some(value) = lookup(key).filter(|v| !v.is_empty()) else {
                continue;
            };
            match *key {
                "DATABASE_PATH" => config.database.path = value,
                "QUICKBOOKS_CLIENT_ID" => config.accounting.client_id = value,
                "QUICKBOOKS_CLIENT_SECRET" => config.accounting.client_secret = value,
                "QUICKBOOKS_REDIRECT_URI" => config.accounting.redirect_uri = value,
                "AZURE_AD_TENANT_ID" => config.groupware.tenant_id = value,
                "AZURE_AD_CLIENT_ID" => config.groupware.client_id = value,
                "AZURE_AD_CLIENT_SECRET" => config.groupware.client_secret = value,
                "SHAREPOINT_SITE_ID" => config.groupware.site_id = value,
                _ => {}
            }
        }
    }

    /// Returns the underlying application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the configured payroll rates.
    pub fn payroll_rates(&self) -> PayrollRates {
        self.config.payroll
    }
}
