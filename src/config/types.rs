//! Configuration types for the back-office engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from the YAML configuration file. Every section has
//! defaults so a minimal file only needs to name what differs.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// SQLite store settings.
    pub database: DatabaseConfig,
    /// Log filter settings.
    pub logging: LoggingConfig,
    /// Pay rates used by payroll computation.
    pub payroll: PayrollRates,
    /// Accounting service settings.
    pub accounting: AccountingConfig,
    /// Groupware (receipt storage) settings.
    pub groupware: GroupwareConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "0.0.0.0:8080".
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// SQLite store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the database file. `:memory:` opens a private in-memory store.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./data/backoffice.db".to_string(),
        }
    }
}

/// Log filter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Hourly pay rates applied to time entry hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PayrollRates {
    /// Rate for REGULAR hours.
    pub regular_rate: Decimal,
    /// Rate for OVERTIME hours.
    pub overtime_rate: Decimal,
}

impl Default for PayrollRates {
    fn default() -> Self {
        Self {
            regular_rate: Decimal::from(25),
            overtime_rate: Decimal::new(375, 1),
        }
    }
}

/// Which accounting connector to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountingMode {
    /// Synthetic references, no network traffic.
    #[default]
    Sandbox,
    /// Real HTTP calls to the accounting API.
    Live,
}

/// The accounting service environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountingEnvironment {
    /// The provider's developer sandbox.
    #[default]
    Sandbox,
    /// The production company files.
    Production,
}

/// Accounting service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountingConfig {
    /// Connector selection.
    pub mode: AccountingMode,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Provider environment, selects the default API host.
    pub environment: AccountingEnvironment,
    /// OAuth redirect URI registered with the provider.
    pub redirect_uri: String,
    /// Account charged by created purchases.
    pub expense_account_ref: String,
    /// Overrides the API host derived from `environment`.
    pub api_base_url: Option<String>,
    /// OAuth authorization page.
    pub authorize_url: String,
    /// OAuth token endpoint.
    pub token_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl AccountingConfig {
    /// Returns the API host for the configured environment.
    pub fn resolved_api_base_url(&self) -> String {
        match (&self.api_base_url, self.environment) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, AccountingEnvironment::Sandbox) => {
                "https://sandbox-quickbooks.api.intuit.com".to_string()
            }
            (None, AccountingEnvironment::Production) => {
                "https://quickbooks.api.intuit.com".to_string()
            }
        }
    }
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            mode: AccountingMode::default(),
            client_id: String::new(),
            client_secret: String::new(),
            environment: AccountingEnvironment::default(),
            redirect_uri: "http://127.0.0.1:8080/api/integrations/accounting/callback"
                .to_string(),
            expense_account_ref: "1".to_string(),
            api_base_url: None,
            authorize_url: "https://appcenter.intuit.com/connect/oauth2".to_string(),
            token_url: "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Which groupware connector to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupwareMode {
    /// Receipt uploads are refused.
    #[default]
    Disabled,
    /// Real HTTP calls to the drive API.
    Live,
}

/// Groupware (receipt storage) settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GroupwareConfig {
    /// Connector selection.
    pub mode: GroupwareMode,
    /// Directory tenant id.
    pub tenant_id: String,
    /// Application client id.
    pub client_id: String,
    /// Application client secret.
    pub client_secret: String,
    /// The site whose drive holds receipts.
    pub site_id: String,
    /// Drive API root.
    pub graph_base_url: String,
    /// Overrides the token endpoint derived from `tenant_id`.
    pub token_url: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl GroupwareConfig {
    /// Returns the client-credentials token endpoint for the tenant.
    pub fn resolved_token_url(&self) -> String {
        self.token_url.clone().unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            )
        })
    }
}

impl Default for GroupwareConfig {
    fn default() -> Self {
        Self {
            mode: GroupwareMode::default(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            site_id: String::new(),
            graph_base_url: "https://graph.microsoft.com/v1.0".to_string(),
            token_url: None,
            request_timeout_secs: 30,
        }
    }
}
