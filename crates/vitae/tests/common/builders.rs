//! Shared fixtures for resume documents and versions.

#![allow(dead_code)]

use vitae::{Version, VersionKind, VersionStore};

/// A small two-section resume used across the flow tests.
pub fn resume(experience: &str, skills: &str) -> String {
    format!("EXPERIENCE\n{}\n\nSKILLS\n{}", experience, skills)
}

pub const BASE_RESUME: &str = "SUMMARY\nSeasoned systems engineer.\n\nEXPERIENCE\nAcme Corp: built data pipelines.\n\nSKILLS\nRust, SQL.";

pub fn create_base(versions: &VersionStore, project_id: &str, content: &str) -> Version {
    versions
        .create_version(project_id, None, VersionKind::Base, content)
        .expect("base version")
}
