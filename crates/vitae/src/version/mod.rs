//! Append-only store of immutable document versions.
//!
//! Versions form a forest per project: exactly one root (the base version)
//! and arbitrary branching below it. Content never changes after insert;
//! the only writes after creation touch compile metadata and the ACTIVE
//! marker.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::version_repo::{self, VersionRow};
use crate::db::{self, Database};
use crate::error::{Result, VitaeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Base,
    Manual,
    AiGenerated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileState {
    Draft,
    Compiled,
    Error,
}

fn kind_to_str(kind: VersionKind) -> &'static str {
    match kind {
        VersionKind::Base => "base",
        VersionKind::Manual => "manual",
        VersionKind::AiGenerated => "ai_generated",
    }
}

fn parse_kind(s: &str, id: &str) -> VersionKind {
    match s {
        "base" => VersionKind::Base,
        "manual" => VersionKind::Manual,
        "ai_generated" => VersionKind::AiGenerated,
        other => {
            log::warn!(
                "Unknown version kind '{}' for version {}, defaulting to Manual",
                other,
                id
            );
            VersionKind::Manual
        }
    }
}

fn compile_state_to_str(state: CompileState) -> &'static str {
    match state {
        CompileState::Draft => "draft",
        CompileState::Compiled => "compiled",
        CompileState::Error => "error",
    }
}

fn parse_compile_state(s: &str, id: &str) -> CompileState {
    match s {
        "draft" => CompileState::Draft,
        "compiled" => CompileState::Compiled,
        "error" => CompileState::Error,
        other => {
            log::warn!(
                "Unknown compile state '{}' for version {}, defaulting to Draft",
                other,
                id
            );
            CompileState::Draft
        }
    }
}

/// An immutable snapshot of document content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub project_id: String,
    pub kind: VersionKind,
    pub compile_state: CompileState,
    pub active: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Version {
    pub(crate) fn from_row(row: &VersionRow) -> Self {
        let diagnostics: Vec<String> = row
            .diagnostics
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        Self {
            id: row.id.clone(),
            project_id: row.project_id.clone(),
            kind: parse_kind(&row.kind, &row.id),
            compile_state: parse_compile_state(&row.compile_state, &row.id),
            active: row.active,
            content: row.content.clone(),
            artifact_url: row.artifact_url.clone(),
            diagnostics,
            parent_id: row.parent_id.clone(),
            created_at: db::parse_timestamp(&row.created_at),
        }
    }
}

enum CreateOutcome {
    Created,
    BaseExists,
    ParentMissing,
    ParentForeignProject,
}

/// Store over the `versions` table. Cloning is cheap.
#[derive(Clone)]
pub struct VersionStore {
    db: Database,
}

impl VersionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates a new immutable version.
    ///
    /// A `None` parent is only legal once per project, for the base version.
    /// Any other version must name an existing parent of the same project.
    /// The base version starts as the project's ACTIVE version.
    pub fn create_version(
        &self,
        project_id: &str,
        parent_id: Option<&str>,
        kind: VersionKind,
        content: &str,
    ) -> Result<Version> {
        match (parent_id, kind) {
            (None, k) if k != VersionKind::Base => {
                return Err(VitaeError::InvalidRequest(
                    "a version without a parent must be the project's base version".to_string(),
                ));
            }
            (Some(_), VersionKind::Base) => {
                return Err(VitaeError::InvalidRequest(
                    "a base version cannot have a parent".to_string(),
                ));
            }
            _ => {}
        }

        let row = VersionRow {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            kind: kind_to_str(kind).to_string(),
            compile_state: "draft".to_string(),
            active: parent_id.is_none(),
            content: content.to_string(),
            artifact_url: None,
            diagnostics: None,
            parent_id: parent_id.map(|p| p.to_string()),
            created_at: db::format_timestamp(Utc::now()),
        };

        // Validation and insert happen under one lock so a concurrent caller
        // cannot slip a second base or delete-out a parent in between.
        let outcome = self.db.with_conn(|conn| match &row.parent_id {
            None => {
                if version_repo::base_exists(conn, &row.project_id)? {
                    return Ok(CreateOutcome::BaseExists);
                }
                version_repo::insert(conn, &row)?;
                Ok(CreateOutcome::Created)
            }
            Some(parent) => match version_repo::find_by_id(conn, parent)? {
                None => Ok(CreateOutcome::ParentMissing),
                Some(parent_row) if parent_row.project_id != row.project_id => {
                    Ok(CreateOutcome::ParentForeignProject)
                }
                Some(_) => {
                    version_repo::insert(conn, &row)?;
                    Ok(CreateOutcome::Created)
                }
            },
        })?;

        match outcome {
            CreateOutcome::Created => {
                log::info!(
                    "project {}: created {} version {}",
                    project_id,
                    kind_to_str(kind),
                    row.id
                );
                Ok(Version::from_row(&row))
            }
            CreateOutcome::BaseExists => Err(VitaeError::InvalidState(format!(
                "project {} already has a base version",
                project_id
            ))),
            CreateOutcome::ParentMissing => Err(VitaeError::not_found(
                "version",
                parent_id.unwrap_or_default(),
            )),
            CreateOutcome::ParentForeignProject => Err(VitaeError::InvalidRequest(format!(
                "parent version {} belongs to a different project",
                parent_id.unwrap_or_default()
            ))),
        }
    }

    pub fn get_version(&self, id: &str) -> Result<Version> {
        let row = self
            .db
            .with_conn(|conn| version_repo::find_by_id(conn, id))?
            .ok_or_else(|| VitaeError::not_found("version", id))?;
        Ok(Version::from_row(&row))
    }

    /// All versions of a project, newest first.
    pub fn list_versions(&self, project_id: &str) -> Result<Vec<Version>> {
        let rows = self
            .db
            .with_conn(|conn| version_repo::list_by_project(conn, project_id))?;
        Ok(rows.iter().map(Version::from_row).collect())
    }

    /// Records a successful compile. Only legal while the version is a draft.
    pub fn mark_compiled(
        &self,
        id: &str,
        artifact_url: &str,
        warnings: &[String],
    ) -> Result<Version> {
        self.set_compile_result(id, CompileState::Compiled, Some(artifact_url), warnings)
    }

    /// Records a failed compile with the renderer's raw diagnostics.
    pub fn mark_error(&self, id: &str, diagnostics: &[String]) -> Result<Version> {
        self.set_compile_result(id, CompileState::Error, None, diagnostics)
    }

    fn set_compile_result(
        &self,
        id: &str,
        state: CompileState,
        artifact_url: Option<&str>,
        diagnostics: &[String],
    ) -> Result<Version> {
        // Surface a missing version as NotFound before the guarded update.
        let existing = self.get_version(id)?;

        let diagnostics_json = if diagnostics.is_empty() {
            None
        } else {
            Some(serde_json::to_string(diagnostics).map_err(|e| {
                VitaeError::Internal(format!("failed to encode diagnostics: {}", e))
            })?)
        };

        let changed = self.db.with_conn(|conn| {
            version_repo::set_compile_result(
                conn,
                id,
                compile_state_to_str(state),
                artifact_url,
                diagnostics_json.as_deref(),
            )
        })?;
        if changed == 0 {
            return Err(VitaeError::InvalidState(format!(
                "version {} is {}, only drafts can record a compile result",
                id,
                compile_state_to_str(existing.compile_state)
            )));
        }

        self.get_version(id)
    }

    /// Moves the project's ACTIVE marker to this version.
    pub fn set_active(&self, id: &str) -> Result<Version> {
        let version = self.get_version(id)?;
        self.db
            .with_conn(|conn| version_repo::set_active(conn, &version.project_id, id))?;
        self.get_version(id)
    }

    /// The parent chain from a version up to the project's root, starting
    /// with the version itself. Traversal is a query, not a pointer walk.
    pub fn ancestors(&self, id: &str) -> Result<Vec<Version>> {
        let mut chain = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor = Some(id.to_string());

        while let Some(current) = cursor {
            if !seen.insert(current.clone()) {
                return Err(VitaeError::Internal(format!(
                    "version parent chain contains a cycle at {}",
                    current
                )));
            }
            let row = self
                .db
                .with_conn(|conn| version_repo::find_by_id(conn, &current))?
                .ok_or_else(|| {
                    if chain.is_empty() {
                        VitaeError::not_found("version", current.clone())
                    } else {
                        VitaeError::Internal(format!(
                            "version {} references missing parent {}",
                            chain
                                .last()
                                .map(|v: &Version| v.id.clone())
                                .unwrap_or_default(),
                            current
                        ))
                    }
                })?;
            cursor = row.parent_id.clone();
            chain.push(Version::from_row(&row));
        }

        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VersionStore {
        VersionStore::new(Database::open_in_memory().expect("in-memory database"))
    }

    #[test]
    fn test_create_base_version() {
        let versions = store();
        let base = versions
            .create_version("proj-1", None, VersionKind::Base, "SKILLS\nRust")
            .unwrap();

        assert_eq!(base.kind, VersionKind::Base);
        assert_eq!(base.compile_state, CompileState::Draft);
        assert!(base.active);
        assert!(base.parent_id.is_none());
    }

    #[test]
    fn test_second_base_is_rejected() {
        let versions = store();
        versions
            .create_version("proj-1", None, VersionKind::Base, "first")
            .unwrap();

        let err = versions
            .create_version("proj-1", None, VersionKind::Base, "second")
            .unwrap_err();
        assert!(matches!(err, VitaeError::InvalidState(_)));
    }

    #[test]
    fn test_parentless_non_base_is_rejected() {
        let versions = store();
        let err = versions
            .create_version("proj-1", None, VersionKind::Manual, "content")
            .unwrap_err();
        assert!(matches!(err, VitaeError::InvalidRequest(_)));
    }

    #[test]
    fn test_missing_parent_is_not_found() {
        let versions = store();
        let err = versions
            .create_version("proj-1", Some("nope"), VersionKind::Manual, "content")
            .unwrap_err();
        assert!(matches!(err, VitaeError::NotFound { .. }));
    }

    #[test]
    fn test_parent_from_other_project_is_rejected() {
        let versions = store();
        let base = versions
            .create_version("proj-1", None, VersionKind::Base, "content")
            .unwrap();

        let err = versions
            .create_version("proj-2", Some(&base.id), VersionKind::Manual, "content")
            .unwrap_err();
        assert!(matches!(err, VitaeError::InvalidRequest(_)));
    }

    #[test]
    fn test_content_is_immutable_through_compile_marks() {
        let versions = store();
        let base = versions
            .create_version("proj-1", None, VersionKind::Base, "SKILLS\nRust")
            .unwrap();

        let compiled = versions
            .mark_compiled(&base.id, "https://artifacts.example/base.pdf", &[])
            .unwrap();
        assert_eq!(compiled.compile_state, CompileState::Compiled);
        assert_eq!(compiled.content, "SKILLS\nRust");
    }

    #[test]
    fn test_compile_marks_only_on_draft() {
        let versions = store();
        let base = versions
            .create_version("proj-1", None, VersionKind::Base, "content")
            .unwrap();
        versions
            .mark_error(&base.id, &["undefined control sequence".to_string()])
            .unwrap();

        let err = versions
            .mark_compiled(&base.id, "https://artifacts.example/x.pdf", &[])
            .unwrap_err();
        assert!(matches!(err, VitaeError::InvalidState(_)));

        let version = versions.get_version(&base.id).unwrap();
        assert_eq!(version.compile_state, CompileState::Error);
        assert_eq!(version.diagnostics, vec!["undefined control sequence"]);
        assert!(version.artifact_url.is_none());
    }

    #[test]
    fn test_set_active_single_holder() {
        let versions = store();
        let base = versions
            .create_version("proj-1", None, VersionKind::Base, "v0")
            .unwrap();
        let edited = versions
            .create_version("proj-1", Some(&base.id), VersionKind::Manual, "v1")
            .unwrap();

        versions.set_active(&edited.id).unwrap();

        let all = versions.list_versions("proj-1").unwrap();
        let active: Vec<&str> = all
            .iter()
            .filter(|v| v.active)
            .map(|v| v.id.as_str())
            .collect();
        assert_eq!(active, vec![edited.id.as_str()]);
    }

    #[test]
    fn test_ancestors_walks_to_root() {
        let versions = store();
        let base = versions
            .create_version("proj-1", None, VersionKind::Base, "v0")
            .unwrap();
        let middle = versions
            .create_version("proj-1", Some(&base.id), VersionKind::Manual, "v1")
            .unwrap();
        let leaf = versions
            .create_version("proj-1", Some(&middle.id), VersionKind::AiGenerated, "v2")
            .unwrap();

        let chain = versions.ancestors(&leaf.id).unwrap();
        let ids: Vec<&str> = chain.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec![leaf.id.as_str(), middle.id.as_str(), base.id.as_str()]);
        assert!(chain.last().unwrap().parent_id.is_none());
    }

    #[test]
    fn test_get_missing_version() {
        let versions = store();
        let err = versions.get_version("missing").unwrap_err();
        assert!(matches!(err, VitaeError::NotFound { .. }));
    }
}
