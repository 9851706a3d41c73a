//! Time entry queries.

use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::error::BackofficeResult;
use crate::models::{PayPeriod, TimeEntry};

use super::parse_column;

fn map_time_entry(row: &Row<'_>) -> rusqlite::Result<TimeEntry> {
    Ok(TimeEntry {
        id: parse_column(row, 0)?,
        user_id: parse_column(row, 1)?,
        project_id: parse_column(row, 2)?,
        date: row.get(3)?,
        hours: parse_column(row, 4)?,
        entry_type: parse_column(row, 5)?,
        status: parse_column(row, 6)?,
    })
}

/// Inserts a time entry.
pub fn insert_time_entry(conn: &Connection, entry: &TimeEntry) -> BackofficeResult<()> {
    conn.execute(
        "INSERT INTO time_entries (id, user_id, project_id, date, hours, type, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id.to_string(),
            entry.user_id.to_string(),
            entry.project_id.to_string(),
            entry.date,
            entry.hours.to_string(),
            entry.entry_type.as_str(),
            entry.status.as_str(),
        ],
    )?;
    Ok(())
}

/// Returns a user's time entries dated within the period, oldest first.
pub fn entries_in_period(
    conn: &Connection,
    user_id: Uuid,
    period: PayPeriod,
) -> BackofficeResult<Vec<TimeEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, project_id, date, hours, type, status
         FROM time_entries
         WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
         ORDER BY date, id",
    )?;
    let entries = stmt
        .query_map(
            params![user_id.to_string(), period.start_date, period.end_date],
            map_time_entry,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}
