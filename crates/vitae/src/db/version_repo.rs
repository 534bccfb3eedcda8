//! Version repository — operations on the `versions` table.
//!
//! Functions take `&Connection` so multi-statement operations can compose
//! inside a single `Database::with_conn` closure.

use rusqlite::{params, Connection, Row};

use super::DatabaseError;

/// A raw version row from the database.
#[derive(Debug, Clone)]
pub struct VersionRow {
    pub id: String,
    pub project_id: String,
    pub kind: String,
    pub compile_state: String,
    pub active: bool,
    pub content: String,
    pub artifact_url: Option<String>,
    /// JSON array of diagnostic strings.
    pub diagnostics: Option<String>,
    pub parent_id: Option<String>,
    pub created_at: String,
}

impl VersionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            kind: row.get("kind")?,
            compile_state: row.get("compile_state")?,
            active: row.get("active")?,
            content: row.get("content")?,
            artifact_url: row.get("artifact_url")?,
            diagnostics: row.get("diagnostics")?,
            parent_id: row.get("parent_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new version row. Content is never updated afterwards.
pub fn insert(conn: &Connection, version: &VersionRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO versions (id, project_id, kind, compile_state, active, content,
         artifact_url, diagnostics, parent_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            version.id,
            version.project_id,
            version.kind,
            version.compile_state,
            version.active,
            version.content,
            version.artifact_url,
            version.diagnostics,
            version.parent_id,
            version.created_at,
        ],
    )?;
    Ok(())
}

/// Finds a version by its ID.
pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<VersionRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM versions WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], VersionRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

/// Lists all versions of a project, newest first.
pub fn list_by_project(
    conn: &Connection,
    project_id: &str,
) -> Result<Vec<VersionRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM versions WHERE project_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows: Vec<VersionRow> = stmt
        .query_map(params![project_id], VersionRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns true if the project already has a root (parentless) version.
pub fn base_exists(conn: &Connection, project_id: &str) -> Result<bool, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM versions WHERE project_id = ?1 AND parent_id IS NULL",
        params![project_id],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Records a compile outcome. Only draft versions are updated; returns the
/// number of rows changed so callers can detect an illegal transition.
/// Content is deliberately untouched.
pub fn set_compile_result(
    conn: &Connection,
    id: &str,
    compile_state: &str,
    artifact_url: Option<&str>,
    diagnostics: Option<&str>,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE versions SET compile_state = ?2, artifact_url = ?3, diagnostics = ?4
         WHERE id = ?1 AND compile_state = 'draft'",
        params![id, compile_state, artifact_url, diagnostics],
    )?;
    Ok(changed)
}

/// Moves the project's ACTIVE marker to the given version.
pub fn set_active(conn: &Connection, project_id: &str, id: &str) -> Result<usize, DatabaseError> {
    conn.execute(
        "UPDATE versions SET active = 0 WHERE project_id = ?1 AND active = 1",
        params![project_id],
    )?;
    let changed = conn.execute("UPDATE versions SET active = 1 WHERE id = ?1", params![id])?;
    Ok(changed)
}
