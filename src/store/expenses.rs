//! Expense and receipt queries.
//!
//! Status changes are written only through the `mark_*` functions, each of
//! which is guarded by the expected current status so a concurrent change
//! can never be overwritten silently.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::BackofficeResult;
use crate::models::{
    Expense, ExpenseDetails, ExpenseReceipt, ExpenseStatus, ProjectSummary, UserSummary,
};

use super::{parse_column, parse_optional_column};

const DETAILS_SELECT: &str = "
    SELECT e.id, e.user_id, e.project_id, e.description, e.amount, e.date, e.category,
           e.status, e.notes, e.qb_expense_id, e.approved_by_id, e.approved_at,
           e.created_at, e.updated_at,
           u.first_name, u.last_name, u.email,
           p.name,
           r.id, r.file_name, r.file_url
    FROM expenses e
    JOIN users u ON u.id = e.user_id
    LEFT JOIN projects p ON p.id = e.project_id
    LEFT JOIN expense_receipts r ON r.expense_id = e.id";

const DETAILS_ORDER: &str = "ORDER BY e.date DESC, e.created_at DESC, e.id DESC";

/// Optional filters for expense listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    /// Only expenses claimed by this user.
    pub user_id: Option<Uuid>,
    /// Only expenses in this status.
    pub status: Option<ExpenseStatus>,
}

fn map_expense(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: parse_column(row, 0)?,
        user_id: parse_column(row, 1)?,
        project_id: parse_optional_column(row, 2)?,
        description: row.get(3)?,
        amount: parse_column(row, 4)?,
        date: row.get(5)?,
        category: parse_column(row, 6)?,
        status: parse_column(row, 7)?,
        notes: row.get(8)?,
        accounting_ref: row.get(9)?,
        approved_by_id: parse_optional_column(row, 10)?,
        approved_at: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn map_details(row: &Row<'_>) -> rusqlite::Result<ExpenseDetails> {
    let expense = map_expense(row)?;
    let user = UserSummary {
        id: expense.user_id,
        first_name: row.get(14)?,
        last_name: row.get(15)?,
        email: row.get(16)?,
    };
    let project = match (expense.project_id, row.get::<_, Option<String>>(17)?) {
        (Some(id), Some(name)) => Some(ProjectSummary { id, name }),
        _ => None,
    };
    let receipt = match parse_optional_column::<Uuid>(row, 18)? {
        Some(id) => Some(ExpenseReceipt {
            id,
            expense_id: expense.id,
            file_name: row.get(19)?,
            file_url: row.get(20)?,
        }),
        None => None,
    };

    Ok(ExpenseDetails {
        expense,
        user,
        project,
        receipt,
    })
}

/// Inserts an expense row.
pub fn insert_expense(conn: &Connection, expense: &Expense) -> BackofficeResult<()> {
    conn.execute(
        "INSERT INTO expenses (id, user_id, project_id, description, amount, date, category,
                               status, notes, qb_expense_id, approved_by_id, approved_at,
                               created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            expense.id.to_string(),
            expense.user_id.to_string(),
            expense.project_id.map(|id| id.to_string()),
            expense.description,
            expense.amount.to_string(),
            expense.date,
            expense.category.as_str(),
            expense.status.as_str(),
            expense.notes,
            expense.accounting_ref,
            expense.approved_by_id.map(|id| id.to_string()),
            expense.approved_at,
            expense.created_at,
            expense.updated_at,
        ],
    )?;
    Ok(())
}

/// Inserts the receipt of an expense.
pub fn insert_receipt(
    conn: &Connection,
    receipt: &ExpenseReceipt,
    created_at: DateTime<Utc>,
) -> BackofficeResult<()> {
    conn.execute(
        "INSERT INTO expense_receipts (id, expense_id, file_name, file_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            receipt.id.to_string(),
            receipt.expense_id.to_string(),
            receipt.file_name,
            receipt.file_url,
            created_at,
        ],
    )?;
    Ok(())
}

/// Loads an expense with its user, project and receipt.
pub fn find_details(conn: &Connection, id: Uuid) -> BackofficeResult<Option<ExpenseDetails>> {
    let sql = format!("{DETAILS_SELECT} WHERE e.id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_details)
        .optional()?)
}

/// Lists expenses with relations, newest date first.
///
/// Ties on date are broken by creation time and then id, so repeated calls
/// without intervening writes return identical orderings.
pub fn list_details(
    conn: &Connection,
    filter: ExpenseFilter,
) -> BackofficeResult<Vec<ExpenseDetails>> {
    let sql = format!(
        "{DETAILS_SELECT}
         WHERE (?1 IS NULL OR e.user_id = ?1) AND (?2 IS NULL OR e.status = ?2)
         {DETAILS_ORDER}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![
                filter.user_id.map(|id| id.to_string()),
                filter.status.map(|status| status.as_str()),
            ],
            map_details,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns approved expenses dated within `[start, end]` with their project names.
pub fn approved_in_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> BackofficeResult<Vec<(Expense, Option<String>)>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.user_id, e.project_id, e.description, e.amount, e.date, e.category,
                e.status, e.notes, e.qb_expense_id, e.approved_by_id, e.approved_at,
                e.created_at, e.updated_at, p.name
         FROM expenses e
         LEFT JOIN projects p ON p.id = e.project_id
         WHERE e.status = ?1 AND e.date >= ?2 AND e.date <= ?3
         ORDER BY e.date, e.id",
    )?;
    let rows = stmt
        .query_map(
            params![ExpenseStatus::Approved.as_str(), start, end],
            |row| Ok((map_expense(row)?, row.get::<_, Option<String>>(14)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Moves a DRAFT expense to SUBMITTED. Returns false if it was not DRAFT.
pub fn mark_submitted(conn: &Connection, id: Uuid, now: DateTime<Utc>) -> BackofficeResult<bool> {
    let changed = conn.execute(
        "UPDATE expenses SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
        params![
            id.to_string(),
            ExpenseStatus::Submitted.as_str(),
            now,
            ExpenseStatus::Draft.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

/// Moves a SUBMITTED expense to APPROVED and records the accounting reference.
/// Returns false if it was not SUBMITTED.
pub fn mark_approved(
    conn: &Connection,
    id: Uuid,
    approver_id: Uuid,
    accounting_ref: &str,
    now: DateTime<Utc>,
) -> BackofficeResult<bool> {
    let changed = conn.execute(
        "UPDATE expenses
         SET status = ?2, approved_by_id = ?3, approved_at = ?4, qb_expense_id = ?5, updated_at = ?4
         WHERE id = ?1 AND status = ?6",
        params![
            id.to_string(),
            ExpenseStatus::Approved.as_str(),
            approver_id.to_string(),
            now,
            accounting_ref,
            ExpenseStatus::Submitted.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

/// Moves a SUBMITTED expense to REJECTED, overwriting its notes.
/// Returns false if it was not SUBMITTED.
pub fn mark_rejected(
    conn: &Connection,
    id: Uuid,
    approver_id: Uuid,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> BackofficeResult<bool> {
    let changed = conn.execute(
        "UPDATE expenses
         SET status = ?2, approved_by_id = ?3, approved_at = ?4, notes = ?5, updated_at = ?4
         WHERE id = ?1 AND status = ?6",
        params![
            id.to_string(),
            ExpenseStatus::Rejected.as_str(),
            approver_id.to_string(),
            now,
            notes,
            ExpenseStatus::Submitted.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseCategory, Role, User};
    use crate::store::Database;
    use crate::store::users::insert_user;
    use rust_decimal::Decimal;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "employee1@company.com".to_string(),
            first_name: "Employee".to_string(),
            last_name: "1".to_string(),
            role: Role::Employee,
            position: None,
            department: None,
            accounting_employee_ref: Some("QB-EMP-003".to_string()),
        }
    }

    fn expense(user_id: Uuid, date: &str, status: ExpenseStatus) -> Expense {
        let now = Utc::now();
        Expense {
            id: Uuid::new_v4(),
            user_id,
            project_id: None,
            description: "Rebar".to_string(),
            amount: Decimal::new(15000, 2),
            date: date.parse().unwrap(),
            category: ExpenseCategory::Materials,
            status,
            notes: None,
            accounting_ref: None,
            approved_by_id: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn setup() -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let user = user();
        db.transaction(|tx| insert_user(tx, &user)).unwrap();
        (db, user)
    }

    #[test]
    fn test_insert_and_load_details_without_receipt() {
        let (db, user) = setup();
        let draft = expense(user.id, "2026-03-02", ExpenseStatus::Draft);
        db.transaction(|tx| insert_expense(tx, &draft)).unwrap();

        let details = db.read(|conn| find_details(conn, draft.id)).unwrap().unwrap();
        assert_eq!(details.expense.amount, Decimal::new(15000, 2));
        assert_eq!(details.user.email, "employee1@company.com");
        assert!(details.project.is_none());
        assert!(details.receipt.is_none());
    }

    #[test]
    fn test_receipt_is_unique_per_expense() {
        let (db, user) = setup();
        let draft = expense(user.id, "2026-03-02", ExpenseStatus::Draft);
        let receipt = |id| ExpenseReceipt {
            id,
            expense_id: draft.id,
            file_name: "receipt.pdf".to_string(),
            file_url: "https://files.example/receipt.pdf".to_string(),
        };

        db.transaction(|tx| {
            insert_expense(tx, &draft)?;
            insert_receipt(tx, &receipt(Uuid::new_v4()), Utc::now())
        })
        .unwrap();

        let second = db.transaction(|tx| insert_receipt(tx, &receipt(Uuid::new_v4()), Utc::now()));
        assert!(second.is_err());

        let details = db.read(|conn| find_details(conn, draft.id)).unwrap().unwrap();
        assert_eq!(details.receipt.unwrap().file_name, "receipt.pdf");
    }

    #[test]
    fn test_status_updates_are_guarded() {
        let (db, user) = setup();
        let draft = expense(user.id, "2026-03-02", ExpenseStatus::Draft);
        db.transaction(|tx| insert_expense(tx, &draft)).unwrap();
        let now = Utc::now();

        assert!(!db
            .transaction(|tx| mark_approved(tx, draft.id, user.id, "QB-1", now))
            .unwrap());
        assert!(db.transaction(|tx| mark_submitted(tx, draft.id, now)).unwrap());
        assert!(!db.transaction(|tx| mark_submitted(tx, draft.id, now)).unwrap());
        assert!(db
            .transaction(|tx| mark_rejected(tx, draft.id, user.id, Some("Duplicate"), now))
            .unwrap());

        let details = db.read(|conn| find_details(conn, draft.id)).unwrap().unwrap();
        assert_eq!(details.expense.status, ExpenseStatus::Rejected);
        assert_eq!(details.expense.notes.as_deref(), Some("Duplicate"));
        assert_eq!(details.expense.approved_by_id, Some(user.id));
        assert!(details.expense.accounting_ref.is_none());
    }

    #[test]
    fn test_list_details_filters_and_orders_by_date_desc() {
        let (db, user) = setup();
        let older = expense(user.id, "2026-03-01", ExpenseStatus::Draft);
        let newer = expense(user.id, "2026-03-05", ExpenseStatus::Submitted);
        db.transaction(|tx| {
            insert_expense(tx, &older)?;
            insert_expense(tx, &newer)
        })
        .unwrap();

        let all = db
            .read(|conn| list_details(conn, ExpenseFilter { user_id: Some(user.id), status: None }))
            .unwrap();
        let ids: Vec<Uuid> = all.iter().map(|d| d.expense.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        let submitted = db
            .read(|conn| {
                list_details(
                    conn,
                    ExpenseFilter {
                        user_id: None,
                        status: Some(ExpenseStatus::Submitted),
                    },
                )
            })
            .unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].expense.id, newer.id);
    }

    #[test]
    fn test_approved_in_range_is_inclusive() {
        let (db, user) = setup();
        let inside_start = expense(user.id, "2026-03-01", ExpenseStatus::Approved);
        let inside_end = expense(user.id, "2026-03-31", ExpenseStatus::Approved);
        let outside = expense(user.id, "2026-04-01", ExpenseStatus::Approved);
        let not_approved = expense(user.id, "2026-03-15", ExpenseStatus::Submitted);
        db.transaction(|tx| {
            for e in [&inside_start, &inside_end, &outside, &not_approved] {
                insert_expense(tx, e)?;
            }
            Ok(())
        })
        .unwrap();

        let rows = db
            .read(|conn| {
                approved_in_range(
                    conn,
                    "2026-03-01".parse().unwrap(),
                    "2026-03-31".parse().unwrap(),
                )
            })
            .unwrap();
        let ids: Vec<Uuid> = rows.iter().map(|(e, _)| e.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&inside_start.id));
        assert!(ids.contains(&inside_end.id));
    }
}
