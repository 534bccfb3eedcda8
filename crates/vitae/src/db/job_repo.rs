//! Job repository — operations on the `jobs` table.
//!
//! Status writes are guarded on the current status so transitions stay
//! monotonic even if two execution paths race.

use rusqlite::{params, Connection, Row};

use super::DatabaseError;

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub project_id: String,
    pub base_version_id: String,
    pub context_id: Option<String>,
    pub instructions: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub refined_from: Option<String>,
    pub accepted_version_id: Option<String>,
    pub discarded: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            base_version_id: row.get("base_version_id")?,
            context_id: row.get("context_id")?,
            instructions: row.get("instructions")?,
            status: row.get("status")?,
            error: row.get("error")?,
            refined_from: row.get("refined_from")?,
            accepted_version_id: row.get("accepted_version_id")?,
            discarded: row.get("discarded")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(conn: &Connection, job: &JobRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (id, project_id, base_version_id, context_id, instructions,
         status, error, refined_from, accepted_version_id, discarded, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            job.id,
            job.project_id,
            job.base_version_id,
            job.context_id,
            job.instructions,
            job.status,
            job.error,
            job.refined_from,
            job.accepted_version_id,
            job.discarded,
            job.created_at,
            job.updated_at,
        ],
    )?;
    Ok(())
}

/// Finds a job by its ID.
pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

/// Lists all jobs of a project, newest first.
pub fn list_by_project(conn: &Connection, project_id: &str) -> Result<Vec<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM jobs WHERE project_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows: Vec<JobRow> = stmt
        .query_map(params![project_id], JobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Moves a job from `from` to `to`, recording an optional error message.
/// Returns the number of rows changed: 0 means the job was not in `from`,
/// so the caller's transition lost and must not be applied.
pub fn transition(
    conn: &Connection,
    id: &str,
    from: &str,
    to: &str,
    error: Option<&str>,
    updated_at: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET status = ?3, error = ?4, updated_at = ?5
         WHERE id = ?1 AND status = ?2",
        params![id, from, to, error, updated_at],
    )?;
    Ok(changed)
}

/// Records which version consumed this job's proposal. Guarded so a job can
/// be consumed exactly once and never after a reject.
pub fn mark_accepted(
    conn: &Connection,
    id: &str,
    version_id: &str,
    updated_at: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET accepted_version_id = ?2, updated_at = ?3
         WHERE id = ?1 AND accepted_version_id IS NULL AND discarded = 0",
        params![id, version_id, updated_at],
    )?;
    Ok(changed)
}

/// Marks a job's proposal as discarded. Guarded against consumed jobs.
pub fn mark_discarded(
    conn: &Connection,
    id: &str,
    updated_at: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET discarded = 1, updated_at = ?2
         WHERE id = ?1 AND accepted_version_id IS NULL",
        params![id, updated_at],
    )?;
    Ok(changed)
}
