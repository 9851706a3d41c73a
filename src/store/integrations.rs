//! Persisted integration settings and credentials.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::connectors::{AccountingConnector, RealmCredentials};
use crate::error::BackofficeResult;

use super::Database;

/// Stores credentials for a company file, replacing any previous ones.
pub fn upsert_accounting_credentials(
    conn: &Connection,
    credentials: &RealmCredentials,
) -> BackofficeResult<()> {
    conn.execute(
        "INSERT INTO quickbooks_integrations (realm_id, access_token, refresh_token,
                                              token_expires_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(realm_id) DO UPDATE SET
             access_token = excluded.access_token,
             refresh_token = excluded.refresh_token,
             token_expires_at = excluded.token_expires_at,
             updated_at = excluded.updated_at",
        params![
            credentials.realm_id,
            credentials.access_token,
            credentials.refresh_token,
            credentials.expires_at,
            Utc::now(),
        ],
    )?;
    Ok(())
}

/// Returns the most recently updated company file credentials.
pub fn latest_accounting_credentials(
    conn: &Connection,
) -> BackofficeResult<Option<RealmCredentials>> {
    Ok(conn
        .query_row(
            "SELECT realm_id, access_token, refresh_token, token_expires_at
             FROM quickbooks_integrations
             ORDER BY updated_at DESC
             LIMIT 1",
            [],
            |row| {
                Ok(RealmCredentials {
                    realm_id: row.get(0)?,
                    access_token: row.get(1)?,
                    refresh_token: row.get(2)?,
                    expires_at: row.get(3)?,
                })
            },
        )
        .optional()?)
}

/// Persists credentials the connector rotated during its last calls.
///
/// Runs in its own transaction after the caller's work finished, so a token
/// refresh is kept even when the operation that triggered it failed.
pub fn save_rotated_credentials(db: &Database, accounting: &dyn AccountingConnector) {
    let Some(credentials) = accounting.take_refreshed_credentials() else {
        return;
    };
    match db.transaction(|tx| upsert_accounting_credentials(tx, &credentials)) {
        Ok(()) => debug!(realm_id = %credentials.realm_id, "Rotated accounting tokens stored"),
        Err(e) => warn!(realm_id = %credentials.realm_id, error = %e, "Failed to store rotated accounting tokens"),
    }
}

/// Records a groupware tenant with its settings document.
pub fn insert_groupware_integration(
    conn: &Connection,
    tenant_id: &str,
    settings: &serde_json::Value,
) -> BackofficeResult<Uuid> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO microsoft_integrations (id, tenant_id, settings) VALUES (?1, ?2, ?3)",
        params![id.to_string(), tenant_id, settings.to_string()],
    )?;
    Ok(id)
}
