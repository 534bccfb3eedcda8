//! Pure classification of changes between two sectioned documents.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::section::{Section, SectionName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Unchanged,
    Modified,
}

/// Per-section classification carrying both sides of the text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDiff {
    pub name: SectionName,
    pub before: String,
    pub after: String,
    pub change_type: ChangeKind,
}

/// Classifies each section name present on either side. Order is the
/// before-document's order, with after-only sections appended in their own
/// order. A name absent from one side is treated as empty text there, so
/// wholly new or wholly removed sections surface as modified.
pub fn diff_sections(before: &[Section], after: &[Section]) -> Vec<SectionDiff> {
    let after_by_name: HashMap<SectionName, &str> =
        after.iter().map(|s| (s.name, s.text.as_str())).collect();
    let before_names: Vec<SectionName> = before.iter().map(|s| s.name).collect();

    let mut diffs = Vec::new();
    for section in before {
        let after_text = after_by_name.get(&section.name).copied().unwrap_or("");
        diffs.push(classify(section.name, &section.text, after_text));
    }
    for section in after {
        if !before_names.contains(&section.name) {
            diffs.push(classify(section.name, "", &section.text));
        }
    }
    diffs
}

fn classify(name: SectionName, before: &str, after: &str) -> SectionDiff {
    let change_type = if before == after {
        ChangeKind::Unchanged
    } else {
        ChangeKind::Modified
    };
    SectionDiff {
        name,
        before: before.to_string(),
        after: after.to_string(),
        change_type,
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WholeDiff {
    pub has_changes: bool,
}

/// Whole-document fallback for degenerate or unsectioned content.
pub fn diff_whole(before: &str, after: &str) -> WholeDiff {
    WholeDiff {
        has_changes: before != after,
    }
}
