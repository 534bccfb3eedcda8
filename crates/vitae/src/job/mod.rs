//! Asynchronous generation jobs: submission, state transitions, polling,
//! and refine chains.
//!
//! A job's status only moves forward: queued → running → completed | failed.
//! Submission returns immediately; the provider call runs on a detached
//! tokio task under a bounded timeout. Status is observed by polling, which
//! is a plain idempotent read resumable from the job id alone.

pub mod provider;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::job_repo::{self, JobRow};
use crate::db::proposal_repo::{self, ProposalRow};
use crate::db::{self, context_repo, version_repo, Database};
use crate::error::{Result, VitaeError};

pub use provider::{
    GeneratedDraft, GenerationRequest, GenerativeProvider, HttpGenerativeProvider, ProviderError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

fn status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    }
}

fn parse_status(s: &str, job_id: &str) -> JobStatus {
    match s {
        "queued" => JobStatus::Queued,
        "running" => JobStatus::Running,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        other => {
            log::warn!(
                "Unknown job status '{}' for job {}, defaulting to Queued",
                other,
                job_id
            );
            JobStatus::Queued
        }
    }
}

/// A generation request and its current state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub project_id: String,
    pub base_version_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub status: JobStatus,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_version_id: Option<String>,
    pub discarded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub(crate) fn from_row(row: &JobRow) -> Self {
        Self {
            id: row.id.clone(),
            project_id: row.project_id.clone(),
            base_version_id: row.base_version_id.clone(),
            context_id: row.context_id.clone(),
            instructions: row.instructions.clone(),
            status: parse_status(&row.status, &row.id),
            error: row.error.clone(),
            refined_from: row.refined_from.clone(),
            accepted_version_id: row.accepted_version_id.clone(),
            discarded: row.discarded,
            created_at: db::parse_timestamp(&row.created_at),
            updated_at: db::parse_timestamp(&row.updated_at),
        }
    }
}

/// An immutable piece of targeting text (e.g. a role description) a job can
/// carry into the provider prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    pub id: String,
    pub project_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl JobContext {
    fn from_row(row: &context_repo::ContextRow) -> Self {
        Self {
            id: row.id.clone(),
            project_id: row.project_id.clone(),
            body: row.body.clone(),
            created_at: db::parse_timestamp(&row.created_at),
        }
    }
}

/// Input to `JobOrchestrator::submit`.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub project_id: String,
    pub base_version_id: String,
    pub context_id: Option<String>,
    pub instructions: Option<String>,
}

/// Owns job rows and their status field. Cloning is cheap.
#[derive(Clone)]
pub struct JobOrchestrator {
    db: Database,
    provider: Arc<dyn GenerativeProvider>,
    provider_timeout: Duration,
}

impl JobOrchestrator {
    pub fn new(
        db: Database,
        provider: Arc<dyn GenerativeProvider>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            db,
            provider,
            provider_timeout,
        }
    }

    /// Validates the request, creates a queued job, and kicks off execution
    /// on a detached task. Never blocks on the provider.
    pub fn submit(&self, request: SubmitRequest) -> Result<Job> {
        let base = self
            .db
            .with_conn(|conn| version_repo::find_by_id(conn, &request.base_version_id))?
            .ok_or_else(|| {
                VitaeError::InvalidRequest(format!(
                    "base version {} does not exist",
                    request.base_version_id
                ))
            })?;
        if base.project_id != request.project_id {
            return Err(VitaeError::InvalidRequest(format!(
                "base version {} does not belong to project {}",
                request.base_version_id, request.project_id
            )));
        }

        let job_context = match &request.context_id {
            Some(context_id) => {
                let row = self
                    .db
                    .with_conn(|conn| context_repo::find_by_id(conn, context_id))?
                    .ok_or_else(|| {
                        VitaeError::InvalidRequest(format!(
                            "job context {} does not exist",
                            context_id
                        ))
                    })?;
                if row.project_id != request.project_id {
                    return Err(VitaeError::InvalidRequest(format!(
                        "job context {} does not belong to project {}",
                        context_id, request.project_id
                    )));
                }
                Some(row.body)
            }
            None => None,
        };

        self.create_and_run(
            &request.project_id,
            &request.base_version_id,
            request.context_id.as_deref(),
            request.instructions.as_deref(),
            None,
            GenerationRequest {
                base_content: base.content,
                job_context,
                instructions: request.instructions.clone(),
            },
        )
    }

    /// Cheap idempotent status read; the polling endpoint.
    pub fn get_status(&self, job_id: &str) -> Result<Job> {
        let row = self
            .db
            .with_conn(|conn| job_repo::find_by_id(conn, job_id))?
            .ok_or_else(|| VitaeError::not_found("job", job_id))?;
        Ok(Job::from_row(&row))
    }

    /// All jobs of a project, newest first.
    pub fn list_jobs(&self, project_id: &str) -> Result<Vec<Job>> {
        let rows = self
            .db
            .with_conn(|conn| job_repo::list_by_project(conn, project_id))?;
        Ok(rows.iter().map(Job::from_row).collect())
    }

    /// Creates a new job chained to a completed one: same base version and
    /// context, original instructions with the feedback appended. The
    /// original job and its proposal are left untouched.
    pub fn refine(&self, job_id: &str, feedback: &str) -> Result<Job> {
        if feedback.trim().is_empty() {
            return Err(VitaeError::InvalidRequest(
                "refine feedback must not be empty".to_string(),
            ));
        }

        let original = self
            .db
            .with_conn(|conn| job_repo::find_by_id(conn, job_id))?
            .ok_or_else(|| VitaeError::not_found("job", job_id))?;
        if parse_status(&original.status, &original.id) != JobStatus::Completed {
            return Err(VitaeError::InvalidState(format!(
                "job {} is {}, only completed jobs can be refined",
                job_id, original.status
            )));
        }

        let base = self
            .db
            .with_conn(|conn| version_repo::find_by_id(conn, &original.base_version_id))?
            .ok_or_else(|| {
                VitaeError::Internal(format!(
                    "job {} references missing base version {}",
                    job_id, original.base_version_id
                ))
            })?;

        let job_context = match &original.context_id {
            Some(context_id) => self
                .db
                .with_conn(|conn| context_repo::find_by_id(conn, context_id))?
                .map(|row| row.body),
            None => None,
        };

        let instructions =
            compose_refined_instructions(original.instructions.as_deref(), feedback);

        self.create_and_run(
            &original.project_id,
            &original.base_version_id,
            original.context_id.as_deref(),
            Some(&instructions),
            Some(job_id),
            GenerationRequest {
                base_content: base.content,
                job_context,
                instructions: Some(instructions.clone()),
            },
        )
    }

    /// Creates a job context owned by a project.
    pub fn create_context(&self, project_id: &str, body: &str) -> Result<JobContext> {
        if body.trim().is_empty() {
            return Err(VitaeError::InvalidRequest(
                "job context body must not be empty".to_string(),
            ));
        }

        let row = context_repo::ContextRow {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            body: body.to_string(),
            created_at: db::format_timestamp(Utc::now()),
        };
        self.db.with_conn(|conn| context_repo::insert(conn, &row))?;
        Ok(JobContext::from_row(&row))
    }

    pub fn get_context(&self, id: &str) -> Result<JobContext> {
        let row = self
            .db
            .with_conn(|conn| context_repo::find_by_id(conn, id))?
            .ok_or_else(|| VitaeError::not_found("job context", id))?;
        Ok(JobContext::from_row(&row))
    }

    pub fn list_contexts(&self, project_id: &str) -> Result<Vec<JobContext>> {
        let rows = self
            .db
            .with_conn(|conn| context_repo::list_by_project(conn, project_id))?;
        Ok(rows.iter().map(JobContext::from_row).collect())
    }

    fn create_and_run(
        &self,
        project_id: &str,
        base_version_id: &str,
        context_id: Option<&str>,
        instructions: Option<&str>,
        refined_from: Option<&str>,
        generation: GenerationRequest,
    ) -> Result<Job> {
        let now = db::format_timestamp(Utc::now());
        let row = JobRow {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            base_version_id: base_version_id.to_string(),
            context_id: context_id.map(|s| s.to_string()),
            instructions: instructions.map(|s| s.to_string()),
            status: status_to_str(JobStatus::Queued).to_string(),
            error: None,
            refined_from: refined_from.map(|s| s.to_string()),
            accepted_version_id: None,
            discarded: false,
            created_at: now.clone(),
            updated_at: now,
        };
        self.db.with_conn(|conn| job_repo::insert(conn, &row))?;

        log::info!("job {}: queued for project {}", row.id, project_id);

        // The job is handed to exactly one task, so at most one provider
        // call is ever in flight for it.
        let db = self.db.clone();
        let provider = Arc::clone(&self.provider);
        let timeout = self.provider_timeout;
        let job_id = row.id.clone();
        tokio::spawn(async move {
            run_job(db, provider, timeout, job_id, generation).await;
        });

        Ok(Job::from_row(&row))
    }
}

fn compose_refined_instructions(original: Option<&str>, feedback: &str) -> String {
    match original {
        Some(original) if !original.trim().is_empty() => {
            format!(
                "{}\n\nFeedback on the previous draft:\n{}",
                original, feedback
            )
        }
        _ => format!("Feedback on the previous draft:\n{}", feedback),
    }
}

async fn run_job(
    db: Database,
    provider: Arc<dyn GenerativeProvider>,
    timeout: Duration,
    job_id: String,
    request: GenerationRequest,
) {
    let now = db::format_timestamp(Utc::now());
    match db.with_conn(|conn| job_repo::transition(conn, &job_id, "queued", "running", None, &now))
    {
        Ok(1) => {}
        Ok(_) => {
            log::warn!("job {}: no longer queued, skipping execution", job_id);
            return;
        }
        Err(e) => {
            log::error!("job {}: failed to mark running: {}", job_id, e);
            return;
        }
    }
    log::info!("job {}: generation started", job_id);

    match tokio::time::timeout(timeout, provider.generate(&request)).await {
        Ok(Ok(draft)) => {
            let now = db::format_timestamp(Utc::now());
            let proposal = ProposalRow {
                job_id: job_id.clone(),
                content: draft.content,
                created_at: now.clone(),
            };
            // Proposal insert and the terminal transition land together.
            let result = db.with_conn(|conn| {
                proposal_repo::insert(conn, &proposal)?;
                job_repo::transition(conn, &job_id, "running", "completed", None, &now)
            });
            match result {
                Ok(1) => log::info!("job {}: completed", job_id),
                Ok(_) => log::warn!("job {}: completion raced a concurrent transition", job_id),
                Err(e) => log::error!("job {}: failed to record completion: {}", job_id, e),
            }
        }
        Ok(Err(e)) => {
            fail_job(&db, &job_id, &format!("generation provider failed: {}", e));
        }
        Err(_) => {
            fail_job(
                &db,
                &job_id,
                &format!(
                    "generation provider timed out after {}s",
                    timeout.as_secs_f64()
                ),
            );
        }
    }
}

fn fail_job(db: &Database, job_id: &str, message: &str) {
    log::warn!("job {}: {}", job_id, message);
    let now = db::format_timestamp(Utc::now());
    match db.with_conn(|conn| {
        job_repo::transition(conn, job_id, "running", "failed", Some(message), &now)
    }) {
        Ok(1) => {}
        Ok(_) => log::warn!("job {}: failure raced a concurrent transition", job_id),
        Err(e) => log::error!("job {}: failed to record failure: {}", job_id, e),
    }
}
