//! Pure partitioning of resume text into named sections.
//!
//! Splitting is total: unrecognized structure lands in the catch-all
//! `OTHER` section instead of failing, and a document with no recognizable
//! headings becomes a single `OTHER` section holding the whole text.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical section names. Heading aliases map into this fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionName {
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
    Other,
}

impl SectionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::Summary => "SUMMARY",
            SectionName::Experience => "EXPERIENCE",
            SectionName::Education => "EDUCATION",
            SectionName::Skills => "SKILLS",
            SectionName::Projects => "PROJECTS",
            SectionName::Certifications => "CERTIFICATIONS",
            SectionName::Other => "OTHER",
        }
    }

    /// Maps a lowercased heading text to its canonical name.
    fn from_alias(heading: &str) -> Option<Self> {
        match heading {
            "summary" | "professional summary" | "profile" | "objective" | "about"
            | "about me" => Some(SectionName::Summary),
            "experience" | "work experience" | "professional experience" | "employment"
            | "employment history" | "work history" => Some(SectionName::Experience),
            "education" | "academic background" | "academics" => Some(SectionName::Education),
            "skills" | "technical skills" | "core competencies" | "technologies" | "tools" => {
                Some(SectionName::Skills)
            }
            "projects" | "personal projects" | "selected projects" | "portfolio" => {
                Some(SectionName::Projects)
            }
            "certifications" | "certificates" | "licenses" | "awards" | "honors" => {
                Some(SectionName::Certifications)
            }
            "other" | "additional information" | "interests" | "hobbies" | "miscellaneous"
            | "references" => Some(SectionName::Other),
            _ => None,
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named region of the document. `text` retains the heading line so that
/// reassembling sections reproduces the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: SectionName,
    pub text: String,
}

/// Splits document text on structural heading markers.
pub struct SectionSplitter {
    heading: Regex,
}

impl SectionSplitter {
    pub fn new() -> Self {
        // A heading is a short line of plain words, optionally marked up as a
        // markdown heading and optionally ending with a colon.
        let heading = Regex::new(r"^\s{0,3}(?:#{1,6}\s+)?([A-Za-z][A-Za-z &/]{0,48})\s*:?\s*$")
            .expect("hardcoded heading pattern is valid");
        Self { heading }
    }

    /// Partitions `content` into sections. Deterministic and total.
    ///
    /// Repeated headings with the same canonical name merge into the first
    /// occurrence. Text before the first heading goes to `OTHER`. Empty
    /// input yields no sections.
    pub fn split(&self, content: &str) -> Vec<Section> {
        let mut sections: Vec<Section> = Vec::new();
        let mut by_name: HashMap<SectionName, usize> = HashMap::new();
        let mut current: Option<usize> = None;

        for line in content.lines() {
            if let Some(name) = self.heading_name(line) {
                let index = match by_name.get(&name).copied() {
                    Some(i) => {
                        append_line(&mut sections[i].text, line);
                        i
                    }
                    None => {
                        sections.push(Section {
                            name,
                            text: line.to_string(),
                        });
                        let i = sections.len() - 1;
                        by_name.insert(name, i);
                        i
                    }
                };
                current = Some(index);
            } else {
                let index = match current {
                    Some(i) => i,
                    None => match by_name.get(&SectionName::Other).copied() {
                        Some(i) => i,
                        None => {
                            sections.push(Section {
                                name: SectionName::Other,
                                text: String::new(),
                            });
                            let i = sections.len() - 1;
                            by_name.insert(SectionName::Other, i);
                            i
                        }
                    },
                };
                append_line(&mut sections[index].text, line);
                current = Some(index);
            }
        }

        for section in &mut sections {
            section.text = section.text.trim_end().to_string();
        }
        sections.retain(|s| !s.text.is_empty());
        sections
    }

    fn heading_name(&self, line: &str) -> Option<SectionName> {
        let caps = self.heading.captures(line)?;
        SectionName::from_alias(&caps[1].trim().to_lowercase())
    }
}

impl Default for SectionSplitter {
    fn default() -> Self {
        Self::new()
    }
}

fn append_line(text: &mut String, line: &str) {
    if !text.is_empty() {
        text.push('\n');
    }
    text.push_str(line);
}
