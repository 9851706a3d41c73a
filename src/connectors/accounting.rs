//! Accounting service connector.
//!
//! The [`AccountingConnector`] trait is the only thing the expense workflow
//! and payroll computation know about the bookkeeping service. Two
//! implementations are provided: [`SandboxAccountingConnector`], which
//! issues synthetic references without any network traffic, and
//! [`HttpAccountingConnector`], which talks to a QuickBooks-style REST API
//! using OAuth 2 bearer tokens.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AccountingConfig;
use crate::error::{BackofficeError, BackofficeResult};

/// OAuth scopes requested when connecting a company file.
const OAUTH_SCOPES: &str = "com.intuit.quickbooks.accounting com.intuit.quickbooks.payroll openid profile email";

/// Treat tokens as expired this long before they actually expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An expense (or payroll) entry to create in the accounting system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountingExpenseEntry {
    /// The employee record the entry is booked against.
    pub employee_ref: String,
    /// Amount to book.
    pub amount: Decimal,
    /// Memo shown in the accounting system.
    pub description: String,
    /// Transaction date.
    pub date: NaiveDate,
    /// Location of the receipt, when one exists.
    pub receipt_url: Option<String>,
}

/// Tokens returned by the authorization-code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingTokens {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// The connected company file.
    pub realm_id: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Stored credentials for one connected company file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmCredentials {
    /// The connected company file.
    pub realm_id: String,
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// When `access_token` stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl RealmCredentials {
    /// Builds credentials from a token exchange performed at `now`.
    pub fn from_tokens(tokens: &AccountingTokens, now: DateTime<Utc>) -> Self {
        Self {
            realm_id: tokens.realm_id.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: now + TimeDelta::seconds(tokens.expires_in),
        }
    }

    /// Returns true if the access token should be refreshed before use.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TimeDelta::seconds(EXPIRY_MARGIN_SECS) <= now
    }
}

/// Capability contract of the accounting service.
pub trait AccountingConnector: Send + Sync {
    /// Creates an expense entry and returns the accounting system's id for it.
    fn create_expense_entry(&self, entry: &AccountingExpenseEntry) -> BackofficeResult<String>;

    /// Returns the URL a user visits to connect a company file.
    fn authorization_url(&self, state: &str) -> BackofficeResult<String>;

    /// Exchanges the authorization code carried by an OAuth callback URL.
    ///
    /// Fails when the callback carries no `realmId`.
    fn exchange_authorization_code(&self, callback_url: &str)
    -> BackofficeResult<AccountingTokens>;

    /// Takes credentials rotated by an internal refresh so the caller can
    /// persist them. Returns `None` when nothing changed since the last call.
    fn take_refreshed_credentials(&self) -> Option<RealmCredentials> {
        None
    }
}

/// The parameters carried by an OAuth callback.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CallbackParams {
    code: String,
    realm_id: String,
}

fn parse_callback(callback_url: &str) -> BackofficeResult<CallbackParams> {
    let url = Url::parse(callback_url).map_err(|e| BackofficeError::Accounting {
        message: format!("invalid callback URL: {}", e),
    })?;

    let mut code = None;
    let mut realm_id = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "realmId" => realm_id = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(BackofficeError::Accounting {
            message: format!("authorization denied: {}", error),
        });
    }
    let code = code.ok_or_else(|| BackofficeError::Accounting {
        message: "Missing authorization code in callback".to_string(),
    })?;
    let realm_id = realm_id
        .filter(|r| !r.is_empty())
        .ok_or_else(|| BackofficeError::Accounting {
            message: "Missing realmId in callback".to_string(),
        })?;
    Ok(CallbackParams { code, realm_id })
}

fn build_authorization_url(config: &AccountingConfig, state: &str) -> BackofficeResult<String> {
    let mut url = Url::parse(&config.authorize_url).map_err(|e| BackofficeError::Accounting {
        message: format!("invalid authorize URL: {}", e),
    })?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("scope", OAUTH_SCOPES)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("state", state);
    Ok(url.into())
}

/// Issues synthetic `QB-EXP-<millis>` references without network traffic.
///
/// References are strictly increasing, so two entries created within the
/// same millisecond still get distinct ids.
#[derive(Debug)]
pub struct SandboxAccountingConnector {
    config: AccountingConfig,
    last_issued: AtomicI64,
}

impl SandboxAccountingConnector {
    /// Creates a sandbox connector.
    pub fn new(config: AccountingConfig) -> Self {
        Self {
            config,
            last_issued: AtomicI64::new(0),
        }
    }

    fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_issued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

impl AccountingConnector for SandboxAccountingConnector {
    fn create_expense_entry(&self, entry: &AccountingExpenseEntry) -> BackofficeResult<String> {
        let id = format!("QB-EXP-{}", self.next_millis());
        debug!(
            accounting_id = %id,
            employee_ref = %entry.employee_ref,
            amount = %entry.amount,
            "Sandbox accounting entry issued"
        );
        Ok(id)
    }

    fn authorization_url(&self, state: &str) -> BackofficeResult<String> {
        build_authorization_url(&self.config, state)
    }

    fn exchange_authorization_code(
        &self,
        callback_url: &str,
    ) -> BackofficeResult<AccountingTokens> {
        let params = parse_callback(callback_url)?;
        Ok(AccountingTokens {
            access_token: format!("sandbox-access-{}", params.code),
            refresh_token: format!("sandbox-refresh-{}", params.code),
            realm_id: params.realm_id,
            expires_in: 3600,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PurchaseRequest<'a> {
    payment_type: &'static str,
    account_ref: Reference<'a>,
    entity_ref: EntityReference<'a>,
    #[serde(with = "rust_decimal::serde::float")]
    total_amt: Decimal,
    private_note: String,
    txn_date: String,
    line: Vec<PurchaseLine<'a>>,
}

#[derive(Serialize)]
struct Reference<'a> {
    value: &'a str,
}

#[derive(Serialize)]
struct EntityReference<'a> {
    value: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PurchaseLine<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    description: &'a str,
    detail_type: &'static str,
    account_based_expense_line_detail: LineDetail<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LineDetail<'a> {
    account_ref: Reference<'a>,
}

#[derive(Deserialize)]
struct PurchaseResponse {
    #[serde(rename = "Purchase")]
    purchase: PurchaseBody,
}

#[derive(Deserialize)]
struct PurchaseBody {
    #[serde(rename = "Id")]
    id: String,
}

/// Talks to a QuickBooks-style REST API.
///
/// Credentials for the connected company file are held in memory. They are
/// installed at startup from the store, replaced by an authorization-code
/// exchange, and rotated by refresh when the access token expires.
pub struct HttpAccountingConnector {
    client: Client,
    config: AccountingConfig,
    api_base: String,
    session: Mutex<Option<RealmCredentials>>,
    refreshed: Mutex<Option<RealmCredentials>>,
}

impl HttpAccountingConnector {
    /// Creates a connector, optionally with previously stored credentials.
    pub fn new(
        config: AccountingConfig,
        credentials: Option<RealmCredentials>,
    ) -> BackofficeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackofficeError::Accounting {
                message: format!("cannot build HTTP client: {}", e),
            })?;
        let api_base = config.resolved_api_base_url();
        Ok(Self {
            client,
            config,
            api_base,
            session: Mutex::new(credentials),
            refreshed: Mutex::new(None),
        })
    }

    fn lock<T>(mutex: &Mutex<T>) -> BackofficeResult<std::sync::MutexGuard<'_, T>> {
        mutex.lock().map_err(|_| BackofficeError::Internal {
            message: "accounting session lock poisoned".to_string(),
        })
    }

    fn request_tokens(&self, form: &[(&str, &str)]) -> BackofficeResult<TokenResponse> {
        let response = self
            .client
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .map_err(|e| BackofficeError::Accounting {
                message: format!("token request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Accounting token endpoint rejected request");
            return Err(BackofficeError::Accounting {
                message: format!("token endpoint returned {}", status),
            });
        }

        response.json().map_err(|e| BackofficeError::Accounting {
            message: format!("invalid token response: {}", e),
        })
    }

    /// Returns usable credentials, refreshing them first if they expired.
    fn valid_credentials(&self) -> BackofficeResult<RealmCredentials> {
        let mut session = Self::lock(&self.session)?;
        let current = session.clone().ok_or_else(|| BackofficeError::Accounting {
            message: "accounting service not connected".to_string(),
        })?;

        let now = Utc::now();
        if !current.is_expired(now) {
            return Ok(current);
        }

        debug!(realm_id = %current.realm_id, "Refreshing accounting access token");
        let tokens = self.request_tokens(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", &current.refresh_token),
        ])?;
        let refreshed = RealmCredentials {
            realm_id: current.realm_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: now + TimeDelta::seconds(tokens.expires_in),
        };
        *session = Some(refreshed.clone());
        *Self::lock(&self.refreshed)? = Some(refreshed.clone());
        info!(realm_id = %refreshed.realm_id, "Accounting access token refreshed");
        Ok(refreshed)
    }
}

impl AccountingConnector for HttpAccountingConnector {
    fn create_expense_entry(&self, entry: &AccountingExpenseEntry) -> BackofficeResult<String> {
        let credentials = self.valid_credentials()?;
        let account = self.config.expense_account_ref.as_str();

        let private_note = match &entry.receipt_url {
            Some(url) => format!("{} (receipt: {})", entry.description, url),
            None => entry.description.clone(),
        };
        let body = PurchaseRequest {
            payment_type: "Cash",
            account_ref: Reference { value: account },
            entity_ref: EntityReference {
                value: &entry.employee_ref,
                kind: "Employee",
            },
            total_amt: entry.amount,
            private_note,
            txn_date: entry.date.format("%Y-%m-%d").to_string(),
            line: vec![PurchaseLine {
                amount: entry.amount,
                description: &entry.description,
                detail_type: "AccountBasedExpenseLineDetail",
                account_based_expense_line_detail: LineDetail {
                    account_ref: Reference { value: account },
                },
            }],
        };

        let url = format!(
            "{}/v3/company/{}/purchase",
            self.api_base, credentials.realm_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&credentials.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .map_err(|e| BackofficeError::Accounting {
                message: format!("purchase request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, realm_id = %credentials.realm_id, "Purchase creation rejected");
            return Err(BackofficeError::Accounting {
                message: format!("purchase endpoint returned {}", status),
            });
        }

        let created: PurchaseResponse = response.json().map_err(|e| BackofficeError::Accounting {
            message: format!("invalid purchase response: {}", e),
        })?;
        info!(accounting_id = %created.purchase.id, "Accounting expense entry created");
        Ok(created.purchase.id)
    }

    fn authorization_url(&self, state: &str) -> BackofficeResult<String> {
        build_authorization_url(&self.config, state)
    }

    fn exchange_authorization_code(
        &self,
        callback_url: &str,
    ) -> BackofficeResult<AccountingTokens> {
        let params = parse_callback(callback_url)?;
        let response = self.request_tokens(&[
            ("grant_type", "authorization_code"),
            ("code", &params.code),
            ("redirect_uri", &self.config.redirect_uri),
        ])?;

        let tokens = AccountingTokens {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            realm_id: params.realm_id,
            expires_in: response.expires_in,
        };
        *Self::lock(&self.session)? = Some(RealmCredentials::from_tokens(&tokens, Utc::now()));
        info!(realm_id = %tokens.realm_id, "Accounting company file connected");
        Ok(tokens)
    }

    fn take_refreshed_credentials(&self) -> Option<RealmCredentials> {
        self.refreshed.lock().ok().and_then(|mut slot| slot.take())
    }
}
