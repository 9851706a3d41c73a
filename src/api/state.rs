//! Application state for the back-office API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::connectors::{AccountingConnector, GroupwareConnector};
use crate::error::{BackofficeError, BackofficeResult};
use crate::payroll::PayrollService;
use crate::store::Database;
use crate::workflow::ExpenseWorkflow;

/// How long an issued OAuth `state` value is accepted by the callback.
const AUTHORIZATION_STATE_TTL_SECS: i64 = 600;

/// OAuth `state` values handed out by the connect endpoint.
///
/// Each value is accepted once, and only until it expires.
#[derive(Debug, Default)]
pub struct AuthorizationStates {
    issued: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl AuthorizationStates {
    fn lock(&self) -> BackofficeResult<MutexGuard<'_, HashMap<String, DateTime<Utc>>>> {
        self.issued.lock().map_err(|_| BackofficeError::Internal {
            message: "authorization state lock poisoned".to_string(),
        })
    }

    /// Issues a fresh state value, dropping any that have expired.
    pub fn issue(&self, now: DateTime<Utc>) -> BackofficeResult<String> {
        let mut issued = self.lock()?;
        issued.retain(|_, expires_at| *expires_at > now);
        let state = Uuid::new_v4().to_string();
        issued.insert(
            state.clone(),
            now + TimeDelta::seconds(AUTHORIZATION_STATE_TTL_SECS),
        );
        Ok(state)
    }

    /// Consumes `state`, returning true if it was issued and has not expired.
    pub fn consume(&self, state: &str, now: DateTime<Utc>) -> BackofficeResult<bool> {
        Ok(self
            .lock()?
            .remove(state)
            .is_some_and(|expires_at| expires_at > now))
    }
}

/// Shared application state.
///
/// Holds the services built around the single store handle and the
/// configured connectors.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
    accounting: Arc<dyn AccountingConnector>,
    workflow: ExpenseWorkflow,
    payroll: PayrollService,
    callback_url: String,
    authorization_states: Arc<AuthorizationStates>,
}

impl AppState {
    /// Wires the services from configuration and injected dependencies.
    pub fn new(
        db: Arc<Database>,
        accounting: Arc<dyn AccountingConnector>,
        groupware: Arc<dyn GroupwareConnector>,
        config: &AppConfig,
    ) -> Self {
        let workflow = ExpenseWorkflow::new(
            db.clone(),
            accounting.clone(),
            groupware,
            config.groupware.site_id.clone(),
        );
        let payroll = PayrollService::new(db.clone(), accounting.clone(), config.payroll);
        Self {
            db,
            accounting,
            workflow,
            payroll,
            callback_url: config.accounting.redirect_uri.clone(),
            authorization_states: Arc::new(AuthorizationStates::default()),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn accounting(&self) -> &Arc<dyn AccountingConnector> {
        &self.accounting
    }

    pub fn workflow(&self) -> &ExpenseWorkflow {
        &self.workflow
    }

    pub fn payroll(&self) -> &PayrollService {
        &self.payroll
    }

    /// The registered OAuth redirect URI, used to rebuild the callback URL.
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    pub fn authorization_states(&self) -> &AuthorizationStates {
        &self.authorization_states
    }
}
