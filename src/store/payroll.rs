//! Payroll record queries.

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::BackofficeResult;
use crate::models::{PayrollRecord, PayrollRecordDetails, PayrollStatus, UserSummary};

use super::parse_column;

const RECORD_COLUMNS: &str = "pr.id, pr.user_id, pr.period_start, pr.period_end, \
     pr.regular_hours, pr.overtime_hours, pr.gross_pay, pr.net_pay, pr.status, \
     pr.qb_employee_id, pr.qb_paycheck_id";

fn map_record(row: &Row<'_>) -> rusqlite::Result<PayrollRecord> {
    Ok(PayrollRecord {
        id: parse_column(row, 0)?,
        user_id: parse_column(row, 1)?,
        period_start: row.get(2)?,
        period_end: row.get(3)?,
        regular_hours: parse_column(row, 4)?,
        overtime_hours: parse_column(row, 5)?,
        gross_pay: parse_column(row, 6)?,
        net_pay: parse_column(row, 7)?,
        status: parse_column(row, 8)?,
        accounting_employee_ref: row.get(9)?,
        accounting_paycheck_ref: row.get(10)?,
    })
}

/// Inserts a payroll record.
pub fn insert_record(conn: &Connection, record: &PayrollRecord) -> BackofficeResult<()> {
    conn.execute(
        "INSERT INTO payroll_records (id, user_id, period_start, period_end, regular_hours,
                                      overtime_hours, gross_pay, net_pay, status,
                                      qb_employee_id, qb_paycheck_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            record.id.to_string(),
            record.user_id.to_string(),
            record.period_start,
            record.period_end,
            record.regular_hours.to_string(),
            record.overtime_hours.to_string(),
            record.gross_pay.to_string(),
            record.net_pay.to_string(),
            record.status.as_str(),
            record.accounting_employee_ref,
            record.accounting_paycheck_ref,
            chrono::Utc::now(),
        ],
    )?;
    Ok(())
}

/// Marks a pending record as processed with the accounting reference.
/// Returns false if the record was not PENDING.
pub fn mark_processed(conn: &Connection, id: Uuid, paycheck_ref: &str) -> BackofficeResult<bool> {
    let changed = conn.execute(
        "UPDATE payroll_records SET status = ?2, qb_paycheck_id = ?3
         WHERE id = ?1 AND status = ?4",
        params![
            id.to_string(),
            PayrollStatus::Processed.as_str(),
            paycheck_ref,
            PayrollStatus::Pending.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

/// Loads a payroll record by id.
pub fn find_record(conn: &Connection, id: Uuid) -> BackofficeResult<Option<PayrollRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM payroll_records pr WHERE pr.id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_record)
        .optional()?)
}

/// Lists a user's payroll records, latest period end first.
pub fn list_for_user(
    conn: &Connection,
    user_id: Uuid,
) -> BackofficeResult<Vec<PayrollRecordDetails>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS}, u.first_name, u.last_name, u.email
         FROM payroll_records pr
         JOIN users u ON u.id = pr.user_id
         WHERE pr.user_id = ?1
         ORDER BY pr.period_end DESC, pr.created_at DESC, pr.id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params![user_id.to_string()], |row| {
            let record = map_record(row)?;
            let user = UserSummary {
                id: record.user_id,
                first_name: row.get(11)?,
                last_name: row.get(12)?,
                email: row.get(13)?,
            };
            Ok(PayrollRecordDetails { record, user })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Counts all payroll records of a user.
pub fn count_for_user(conn: &Connection, user_id: Uuid) -> BackofficeResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM payroll_records WHERE user_id = ?1",
        params![user_id.to_string()],
        |row| row.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::store::Database;
    use crate::store::users::insert_user;
    use rust_decimal::Decimal;

    fn record(user_id: Uuid, start: &str, end: &str) -> PayrollRecord {
        PayrollRecord {
            id: Uuid::new_v4(),
            user_id,
            period_start: start.parse().unwrap(),
            period_end: end.parse().unwrap(),
            regular_hours: Decimal::from(80),
            overtime_hours: Decimal::from(5),
            gross_pay: Decimal::new(21875, 1),
            net_pay: Decimal::ZERO,
            status: PayrollStatus::Pending,
            accounting_employee_ref: "QB-EMP-003".to_string(),
            accounting_paycheck_ref: None,
        }
    }

    fn setup() -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let user = User {
            id: Uuid::new_v4(),
            email: "employee1@company.com".to_string(),
            first_name: "Employee".to_string(),
            last_name: "1".to_string(),
            role: Role::Employee,
            position: None,
            department: None,
            accounting_employee_ref: Some("QB-EMP-003".to_string()),
        };
        db.transaction(|tx| insert_user(tx, &user)).unwrap();
        (db, user)
    }

    #[test]
    fn test_insert_and_mark_processed() {
        let (db, user) = setup();
        let pending = record(user.id, "2026-03-01", "2026-03-14");
        db.transaction(|tx| insert_record(tx, &pending)).unwrap();

        assert!(db.transaction(|tx| mark_processed(tx, pending.id, "QB-EXP-9")).unwrap());
        assert!(!db.transaction(|tx| mark_processed(tx, pending.id, "QB-EXP-10")).unwrap());

        let stored = db.read(|conn| find_record(conn, pending.id)).unwrap().unwrap();
        assert_eq!(stored.status, PayrollStatus::Processed);
        assert_eq!(stored.accounting_paycheck_ref.as_deref(), Some("QB-EXP-9"));
        assert_eq!(stored.gross_pay, Decimal::new(21875, 1));
    }

    #[test]
    fn test_reversed_period_is_rejected_by_schema() {
        let (db, user) = setup();
        let reversed = record(user.id, "2026-03-14", "2026-03-01");
        assert!(db.transaction(|tx| insert_record(tx, &reversed)).is_err());
    }

    #[test]
    fn test_list_for_user_orders_by_period_end_desc() {
        let (db, user) = setup();
        let first = record(user.id, "2026-02-15", "2026-02-28");
        let second = record(user.id, "2026-03-01", "2026-03-14");
        db.transaction(|tx| {
            insert_record(tx, &first)?;
            insert_record(tx, &second)
        })
        .unwrap();

        let records = db.read(|conn| list_for_user(conn, user.id)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record.id, second.id);
        assert_eq!(records[1].record.id, first.id);
        assert_eq!(records[0].user.email, "employee1@company.com");
        assert_eq!(db.read(|conn| count_for_user(conn, user.id)).unwrap(), 2);
    }
}
