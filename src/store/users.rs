//! User queries.

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::BackofficeResult;
use crate::models::User;

use super::parse_column;

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, role, position, department, qb_employee_id";

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_column(row, 0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        role: parse_column(row, 4)?,
        position: row.get(5)?,
        department: row.get(6)?,
        accounting_employee_ref: row.get(7)?,
    })
}

/// Looks up a user by id.
pub fn find_user(conn: &Connection, id: Uuid) -> BackofficeResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_user_row)
        .optional()?)
}

/// Inserts a user.
pub fn insert_user(conn: &Connection, user: &User) -> BackofficeResult<()> {
    conn.execute(
        "INSERT INTO users (id, email, first_name, last_name, role, position, department, qb_employee_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id.to_string(),
            user.email,
            user.first_name,
            user.last_name,
            user.role.as_str(),
            user.position,
            user.department,
            user.accounting_employee_ref,
        ],
    )?;
    Ok(())
}
