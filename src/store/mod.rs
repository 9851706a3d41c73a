//! Persistence gateway for the back-office engine.
//!
//! A single SQLite connection is opened at process start and shared through
//! an `Arc<Database>`. Callers never touch the connection directly: reads go
//! through [`Database::read`] and multi-step writes through
//! [`Database::transaction`], which commits only when the closure succeeds.

pub mod expenses;
pub mod integrations;
pub mod payroll;
pub mod projects;
mod schema;
pub mod seed;
pub mod time_entries;
pub mod users;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use crate::error::{BackofficeError, BackofficeResult};

pub use schema::{SCHEMA_VERSION, migrate};

/// The process-wide store handle.
///
/// Every operation holds the connection for its whole duration, so write
/// transactions are serialized.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and migrates it.
    ///
    /// The path `:memory:` opens a private in-memory database.
    pub fn open<P: AsRef<Path>>(path: P) -> BackofficeResult<Self> {
        let path = path.as_ref();
        let conn = if path == Path::new(":memory:") {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| BackofficeError::Internal {
                    message: format!("cannot create {}: {}", parent.display(), e),
                })?;
            }
            Connection::open(path)?
        };
        Self::init(conn)
    }

    /// Opens a fresh, migrated in-memory database.
    pub fn open_in_memory() -> BackofficeResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> BackofficeResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> BackofficeResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| BackofficeError::Internal {
            message: "database connection lock poisoned".to_string(),
        })
    }

    /// Runs read-only work against the connection.
    pub fn read<T, F>(&self, f: F) -> BackofficeResult<T>
    where
        F: FnOnce(&Connection) -> BackofficeResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside an immediate transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err`, so no partial state is ever visible to other callers.
    pub fn transaction<T, F>(&self, f: F) -> BackofficeResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> BackofficeResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = Transaction::new(&mut conn, TransactionBehavior::Immediate)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                debug!("Transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                debug!(error = %err, "Transaction rolled back");
                Err(err)
            }
        }
    }
}

/// Reads a TEXT column and parses it into `T`.
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: String = row.get(idx)?;
    parse_text(idx, &raw)
}

/// Reads a nullable TEXT column and parses it into `T`.
pub(crate) fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| parse_text(idx, &value)).transpose()
}

fn parse_text<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(|tx| {
            tx.execute(
                "INSERT INTO microsoft_integrations (id, tenant_id) VALUES ('a', 't1')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .read(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM microsoft_integrations", [], |r| {
                    r.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result: BackofficeResult<()> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO microsoft_integrations (id, tenant_id) VALUES ('a', 't1')",
                [],
            )?;
            Err(BackofficeError::Groupware {
                message: "upload failed".to_string(),
            })
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM microsoft_integrations", [], |r| {
                    r.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let db = Database::open_in_memory().unwrap();
        let result = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO expense_receipts (id, expense_id, file_name, file_url, created_at)
                 VALUES ('r', 'missing', 'f.pdf', 'u', '2026-01-01')",
                [],
            )?;
            Ok(())
        });
        assert!(matches!(result, Err(BackofficeError::Storage(_))));
    }

    #[test]
    fn test_parse_column_reports_bad_values() {
        let conn = Connection::open_in_memory().unwrap();
        let good: Decimal = conn
            .query_row("SELECT '12.50'", [], |row| parse_column(row, 0))
            .unwrap();
        assert_eq!(good, Decimal::new(1250, 2));

        let bad = conn.query_row("SELECT 'not-a-uuid'", [], |row| {
            parse_column::<Uuid>(row, 0)
        });
        assert!(matches!(
            bad,
            Err(rusqlite::Error::FromSqlConversionFailure(0, Type::Text, _))
        ));

        let none: Option<Uuid> = conn
            .query_row("SELECT NULL", [], |row| parse_optional_column(row, 0))
            .unwrap();
        assert!(none.is_none());
    }
}
