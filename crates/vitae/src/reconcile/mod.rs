//! Mediates between a completed job's generated content and the version
//! store: section view computation, accept (the only path that turns AI
//! output into a real version), and reject.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use crate::db::job_repo::{self, JobRow};
use crate::db::version_repo::{self, VersionRow};
use crate::db::{self, proposal_repo, Database};
use crate::diff::{self, ChangeKind};
use crate::error::{Result, VitaeError};
use crate::job::JobStatus;
use crate::section::{SectionName, SectionSplitter};
use crate::version::Version;

/// A completed job's generated content, with the per-section breakdown when
/// the documents have recognizable structure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub job_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SectionView>>,
}

/// One section of the base/proposal comparison. Modified sections are
/// selected by default: applying the suggestion is opt-out, not opt-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub name: SectionName,
    pub before: String,
    pub after: String,
    pub change_type: ChangeKind,
    pub selected_by_default: bool,
}

impl From<diff::SectionDiff> for SectionView {
    fn from(d: diff::SectionDiff) -> Self {
        let selected_by_default = d.change_type == ChangeKind::Modified;
        Self {
            name: d.name,
            before: d.before,
            after: d.after,
            change_type: d.change_type,
            selected_by_default,
        }
    }
}

/// Reads jobs and proposals, writes new versions. Never mutates a proposal.
#[derive(Clone)]
pub struct ProposalReconciler {
    db: Database,
}

impl ProposalReconciler {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the proposal attached to a completed job.
    ///
    /// A job that has not completed yet reads as `NotFound` for the
    /// proposal; a completed job with no proposal row is an internal
    /// consistency error.
    pub fn get_proposal(&self, job_id: &str) -> Result<Proposal> {
        let (job, content) = self.load_completed(job_id)?;
        let view = self.section_view(&job, &content)?;
        let sections = if is_degenerate(&view) { None } else { Some(view) };
        Ok(Proposal {
            job_id: job.id,
            content,
            sections,
        })
    }

    /// Splits base and proposal content and classifies every section.
    pub fn compute_section_view(&self, job_id: &str) -> Result<Vec<SectionView>> {
        let (job, content) = self.load_completed(job_id)?;
        self.section_view(&job, &content)
    }

    /// Commits the proposal into a new version.
    ///
    /// With section structure, the merged document takes the after-text of
    /// every accepted modified section and the before-text of everything
    /// else, in the base document's order; accepted proposal-only sections
    /// are appended. Without structure the whole proposal content is used
    /// and the selection is ignored. `selection = None` applies the default
    /// selection (all modified sections).
    ///
    /// Atomic and idempotent per job: a second accept fails `InvalidState`.
    pub fn accept(&self, job_id: &str, selection: Option<&HashSet<String>>) -> Result<Version> {
        let (job, proposal_content) = self.load_completed(job_id)?;
        if job.discarded {
            return Err(VitaeError::InvalidState(format!(
                "job {} was rejected, its proposal can no longer be accepted",
                job_id
            )));
        }
        if job.accepted_version_id.is_some() {
            return Err(VitaeError::InvalidState(format!(
                "job {} has already been accepted",
                job_id
            )));
        }

        let view = self.section_view(&job, &proposal_content)?;
        let merged = if is_degenerate(&view) {
            proposal_content
        } else {
            let default_selection;
            let accepted = match selection {
                Some(names) => names,
                None => {
                    default_selection = view
                        .iter()
                        .filter(|s| s.selected_by_default)
                        .map(|s| s.name.as_str().to_string())
                        .collect();
                    &default_selection
                }
            };
            merge_sections(&view, accepted)
        };

        let now = Utc::now();
        let version_row = VersionRow {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: job.project_id.clone(),
            kind: "ai_generated".to_string(),
            compile_state: "draft".to_string(),
            active: false,
            content: merged,
            artifact_url: None,
            diagnostics: None,
            parent_id: Some(job.base_version_id.clone()),
            created_at: db::format_timestamp(now),
        };
        let updated_at = db::format_timestamp(now);

        // Consume the job and create the version under one lock: either
        // both happen or neither does, and only the first accept claims it.
        let claimed = self.db.with_conn(|conn| {
            let claimed = job_repo::mark_accepted(conn, &job.id, &version_row.id, &updated_at)?;
            if claimed == 1 {
                version_repo::insert(conn, &version_row)?;
            }
            Ok(claimed)
        })?;

        if claimed == 0 {
            return Err(VitaeError::InvalidState(format!(
                "job {} proposal is no longer available for accept",
                job_id
            )));
        }

        log::info!(
            "job {}: proposal accepted into version {}",
            job.id,
            version_row.id
        );
        Ok(Version::from_row(&version_row))
    }

    /// Discards the proposal for UI purposes. Writes nothing to the version
    /// store; idempotent; legal from any non-accepted state.
    pub fn reject(&self, job_id: &str) -> Result<()> {
        let job = self
            .db
            .with_conn(|conn| job_repo::find_by_id(conn, job_id))?
            .ok_or_else(|| VitaeError::not_found("job", job_id))?;
        if job.accepted_version_id.is_some() {
            return Err(VitaeError::InvalidState(format!(
                "job {} has already been accepted, its proposal cannot be rejected",
                job_id
            )));
        }
        if job.discarded {
            return Ok(());
        }

        let now = db::format_timestamp(Utc::now());
        let changed = self
            .db
            .with_conn(|conn| job_repo::mark_discarded(conn, job_id, &now))?;
        if changed == 0 {
            return Err(VitaeError::InvalidState(format!(
                "job {} was accepted concurrently, its proposal cannot be rejected",
                job_id
            )));
        }

        log::info!("job {}: proposal rejected", job_id);
        Ok(())
    }

    fn load_completed(&self, job_id: &str) -> Result<(JobRow, String)> {
        let job = self
            .db
            .with_conn(|conn| job_repo::find_by_id(conn, job_id))?
            .ok_or_else(|| VitaeError::not_found("job", job_id))?;

        let status = crate::job::Job::from_row(&job).status;
        if status != JobStatus::Completed {
            return Err(VitaeError::not_found("proposal", job_id));
        }

        let proposal = self
            .db
            .with_conn(|conn| proposal_repo::find_by_job(conn, job_id))?
            .ok_or_else(|| {
                VitaeError::Internal(format!("job {} is completed but has no proposal", job_id))
            })?;

        Ok((job, proposal.content))
    }

    fn section_view(&self, job: &JobRow, proposal_content: &str) -> Result<Vec<SectionView>> {
        let base = self
            .db
            .with_conn(|conn| version_repo::find_by_id(conn, &job.base_version_id))?
            .ok_or_else(|| {
                VitaeError::Internal(format!(
                    "job {} references missing base version {}",
                    job.id, job.base_version_id
                ))
            })?;
        Ok(build_view(&base.content, proposal_content))
    }
}

fn build_view(base: &str, proposal: &str) -> Vec<SectionView> {
    let splitter = SectionSplitter::new();
    let before = splitter.split(base);
    let after = splitter.split(proposal);
    diff::diff_sections(&before, &after)
        .into_iter()
        .map(SectionView::from)
        .collect()
}

/// A view with no named structure on either side: nothing to select, so the
/// reconciler falls back to whole-document accept/reject.
fn is_degenerate(view: &[SectionView]) -> bool {
    view.iter().all(|s| s.name == SectionName::Other)
}

fn merge_sections(view: &[SectionView], accepted: &HashSet<String>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for section in view {
        let take_after = section.change_type == ChangeKind::Modified
            && accepted.contains(section.name.as_str());
        let text = if take_after {
            section.after.as_str()
        } else {
            section.before.as_str()
        };
        if !text.is_empty() {
            parts.push(text);
        }
    }
    parts.join("\n\n")
}
