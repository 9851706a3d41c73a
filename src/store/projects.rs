//! Project queries.

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::BackofficeResult;
use crate::models::Project;

use super::parse_column;

fn map_project_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_column(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        status: parse_column(row, 3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        budget: parse_column(row, 6)?,
        client_name: row.get(7)?,
        creator_id: parse_column(row, 8)?,
    })
}

/// Looks up a project by id.
pub fn find_project(conn: &Connection, id: Uuid) -> BackofficeResult<Option<Project>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description, status, start_date, end_date, budget, client_name, creator_id
             FROM projects WHERE id = ?1",
            params![id.to_string()],
            map_project_row,
        )
        .optional()?)
}

/// Inserts a project.
pub fn insert_project(conn: &Connection, project: &Project) -> BackofficeResult<()> {
    conn.execute(
        "INSERT INTO projects (id, name, description, status, start_date, end_date, budget, client_name, creator_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            project.id.to_string(),
            project.name,
            project.description,
            project.status.as_str(),
            project.start_date,
            project.end_date,
            project.budget.to_string(),
            project.client_name,
            project.creator_id.to_string(),
        ],
    )?;
    Ok(())
}

/// Adds a user to a project team.
pub fn add_member(
    conn: &Connection,
    project_id: Uuid,
    user_id: Uuid,
    role: &str,
) -> BackofficeResult<()> {
    conn.execute(
        "INSERT INTO project_members (project_id, user_id, role) VALUES (?1, ?2, ?3)",
        params![project_id.to_string(), user_id.to_string(), role],
    )?;
    Ok(())
}
