//! Job context repository — operations on the `job_contexts` table.

use rusqlite::{params, Connection, Row};

use super::DatabaseError;

/// A raw job context row from the database.
#[derive(Debug, Clone)]
pub struct ContextRow {
    pub id: String,
    pub project_id: String,
    pub body: String,
    pub created_at: String,
}

impl ContextRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            body: row.get("body")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new job context.
pub fn insert(conn: &Connection, context: &ContextRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO job_contexts (id, project_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            context.id,
            context.project_id,
            context.body,
            context.created_at
        ],
    )?;
    Ok(())
}

/// Finds a job context by its ID.
pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<ContextRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM job_contexts WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], ContextRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

/// Lists all job contexts of a project, newest first.
pub fn list_by_project(
    conn: &Connection,
    project_id: &str,
) -> Result<Vec<ContextRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM job_contexts WHERE project_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows: Vec<ContextRow> = stmt
        .query_map(params![project_id], ContextRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
