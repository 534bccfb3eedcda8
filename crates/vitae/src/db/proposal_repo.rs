//! Proposal repository — operations on the `proposals` table.
//!
//! `job_id` is the primary key, so the at-most-one-proposal-per-job
//! invariant is enforced by the schema.

use rusqlite::{params, Connection, Row};

use super::DatabaseError;

/// A raw proposal row from the database.
#[derive(Debug, Clone)]
pub struct ProposalRow {
    pub job_id: String,
    pub content: String,
    pub created_at: String,
}

impl ProposalRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            job_id: row.get("job_id")?,
            content: row.get("content")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a proposal. Fails if the job already has one.
pub fn insert(conn: &Connection, proposal: &ProposalRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO proposals (job_id, content, created_at) VALUES (?1, ?2, ?3)",
        params![proposal.job_id, proposal.content, proposal.created_at],
    )?;
    Ok(())
}

/// Finds the proposal attached to a job.
pub fn find_by_job(conn: &Connection, job_id: &str) -> Result<Option<ProposalRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM proposals WHERE job_id = ?1")?;
    let mut rows = stmt.query_map(params![job_id], ProposalRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}
