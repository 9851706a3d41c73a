//! Relational schema and migrations.
//!
//! Monetary amounts and hours are stored as decimal TEXT so they round-trip
//! exactly; dates are ISO-8601 TEXT so range filters compare lexically.

use rusqlite::Connection;
use tracing::info;

use crate::error::BackofficeResult;

/// Version stamped into `PRAGMA user_version` once the schema is applied.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    email           TEXT NOT NULL UNIQUE,
    microsoft_id    TEXT UNIQUE,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    role            TEXT NOT NULL DEFAULT 'EMPLOYEE',
    position        TEXT,
    department      TEXT,
    phone           TEXT,
    hire_date       TEXT,
    qb_employee_id  TEXT
);

CREATE TABLE IF NOT EXISTS projects (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    description       TEXT,
    status            TEXT NOT NULL DEFAULT 'PLANNING',
    start_date        TEXT NOT NULL,
    end_date          TEXT,
    budget            TEXT NOT NULL DEFAULT '0',
    client_name       TEXT NOT NULL,
    creator_id        TEXT NOT NULL REFERENCES users(id),
    teams_channel_id  TEXT,
    location          TEXT
);

CREATE TABLE IF NOT EXISTS project_members (
    project_id  TEXT NOT NULL REFERENCES projects(id),
    user_id     TEXT NOT NULL REFERENCES users(id),
    role        TEXT NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

CREATE TABLE IF NOT EXISTS documents (
    id              TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    description     TEXT,
    sharepoint_url  TEXT NOT NULL,
    project_id      TEXT NOT NULL REFERENCES projects(id),
    uploaded_by_id  TEXT NOT NULL REFERENCES users(id),
    file_size       INTEGER NOT NULL,
    mime_type       TEXT NOT NULL,
    version         INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS expenses (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES users(id),
    project_id      TEXT REFERENCES projects(id),
    description     TEXT NOT NULL,
    amount          TEXT NOT NULL,
    date            TEXT NOT NULL,
    category        TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'DRAFT',
    notes           TEXT,
    qb_expense_id   TEXT,
    approved_by_id  TEXT REFERENCES users(id),
    approved_at     TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses(user_id, date);
CREATE INDEX IF NOT EXISTS idx_expenses_status_date ON expenses(status, date);

CREATE TABLE IF NOT EXISTS expense_receipts (
    id          TEXT PRIMARY KEY,
    expense_id  TEXT NOT NULL UNIQUE REFERENCES expenses(id),
    file_name   TEXT NOT NULL,
    file_url    TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS time_entries (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id),
    project_id  TEXT NOT NULL REFERENCES projects(id),
    date        TEXT NOT NULL,
    hours       TEXT NOT NULL,
    type        TEXT NOT NULL DEFAULT 'REGULAR',
    status      TEXT NOT NULL DEFAULT 'PENDING'
);

CREATE INDEX IF NOT EXISTS idx_time_entries_user_date ON time_entries(user_id, date);

CREATE TABLE IF NOT EXISTS payroll_records (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES users(id),
    period_start    TEXT NOT NULL,
    period_end      TEXT NOT NULL,
    regular_hours   TEXT NOT NULL,
    overtime_hours  TEXT NOT NULL,
    gross_pay       TEXT NOT NULL,
    net_pay         TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'PENDING',
    qb_employee_id  TEXT NOT NULL,
    qb_paycheck_id  TEXT,
    created_at      TEXT NOT NULL,
    CHECK (period_start <= period_end)
);

CREATE INDEX IF NOT EXISTS idx_payroll_user_end ON payroll_records(user_id, period_end);

CREATE TABLE IF NOT EXISTS microsoft_integrations (
    id          TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL UNIQUE,
    settings    TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS quickbooks_integrations (
    realm_id          TEXT PRIMARY KEY,
    access_token      TEXT NOT NULL,
    refresh_token     TEXT NOT NULL,
    token_expires_at  TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);
"#;

/// Applies any schema changes the database has not seen yet.
pub fn migrate(conn: &Connection) -> BackofficeResult<()> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch(SCHEMA_V1)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    info!(from = current, to = SCHEMA_VERSION, "Database schema migrated");
    Ok(())
}
