//! Requirements corpus parsing.
//!
//! The corpus is plain text. Requirement statements are list items, lines
//! using "shall" or "must", user stories ("As a ..., I want ...") and lines
//! led by an explicit id. Headings open sections; a heading mentioning
//! exclusions, out-of-scope items or non-goals marks everything under it
//! as excluded until the next heading.

use crate::report::AuditInconsistency;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use switchyard_proto::id::RequirementId;

/// Declared importance, lowest first so that `Ord` ranks `Critical` highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Nice to have.
    Low,
    /// The default.
    #[default]
    Medium,
    /// Required.
    High,
    /// Blocking.
    Critical,
}

/// One parsed requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementRecord {
    /// Explicit or assigned id.
    pub id: RequirementId,
    /// Statement text with id and markers removed.
    pub description: String,
    /// Declared or inferred priority.
    #[serde(default)]
    pub priority: Priority,
    /// Documented as intentionally not built.
    #[serde(default)]
    pub excluded: bool,
}

impl RequirementRecord {
    /// A medium-priority, non-excluded requirement.
    pub fn new(id: impl Into<RequirementId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority: Priority::Medium,
            excluded: false,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Flag as excluded.
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }
}

/// Parser output: records in corpus order plus anything odd found on the way.
#[derive(Debug, Clone, Default)]
pub struct ParsedCorpus {
    /// Requirements in order of appearance.
    pub requirements: Vec<RequirementRecord>,
    /// Duplicate ids and similar problems.
    pub inconsistencies: Vec<AuditInconsistency>,
}

/// Line-oriented requirements parser.
pub struct CorpusParser {
    list_item: Regex,
    explicit_id: Regex,
    priority_tag: Regex,
    priority_level: Regex,
    excluded_marker: Regex,
    user_story: Regex,
    high_modal: Regex,
    medium_modal: Regex,
    low_modal: Regex,
}

struct Candidate {
    explicit: Option<RequirementId>,
    description: String,
    priority: Priority,
    excluded: bool,
}

impl CorpusParser {
    /// Create a parser with the built-in statement patterns.
    pub fn new() -> Self {
        Self {
            list_item: Regex::new(r"^(?:[-*+]|\d+[.)])\s+(.*)$").expect("valid regex"),
            explicit_id: Regex::new(
                r"^(?:\[(?P<bracket>[A-Za-z]{1,6}-?\d+)\]|(?P<plain>[A-Za-z]{1,6}-?\d+)\s*(?::|\s-))\s*",
            )
            .expect("valid regex"),
            priority_tag: Regex::new(r"(?i)\[(critical|high|medium|low)\]").expect("valid regex"),
            priority_level: Regex::new(r"(?:^|\s|\[|\()P([0-3])(?:$|\s|\]|\)|:)").expect("valid regex"),
            excluded_marker: Regex::new(r"(?i)[\[(]excluded[\])]").expect("valid regex"),
            user_story: Regex::new(r"(?i)^as an?\s+[^,]+,\s*i\s+(?:want|need)\b").expect("valid regex"),
            high_modal: Regex::new(r"(?i)\b(?:must|shall)\b").expect("valid regex"),
            medium_modal: Regex::new(r"(?i)\bshould\b").expect("valid regex"),
            low_modal: Regex::new(r"(?i)\b(?:may|could)\b").expect("valid regex"),
        }
    }

    /// Parse a corpus.
    pub fn parse(&self, corpus: &str) -> ParsedCorpus {
        let mut in_exclusions = false;
        let mut candidates = vec![];

        for raw in corpus.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let list_body = self
                .list_item
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim());

            // "The system shall support the following:" is a statement.
            let colon_heading = list_body.is_none()
                && line.ends_with(':')
                && !self.high_modal.is_match(line)
                && !self.user_story.is_match(line);
            if line.starts_with('#') || colon_heading {
                in_exclusions = is_exclusion_heading(line);
                continue;
            }

            let body = list_body.unwrap_or(line);
            let (explicit, rest) = match self.explicit_id.captures(body) {
                Some(c) => {
                    let id = c
                        .name("bracket")
                        .or_else(|| c.name("plain"))
                        .map(|m| RequirementId::new(m.as_str()));
                    (id, &body[c.get(0).map_or(0, |m| m.end())..])
                }
                None => (None, body),
            };

            let is_statement = list_body.is_some()
                || explicit.is_some()
                || self.high_modal.is_match(rest)
                || self.user_story.is_match(rest);
            if !is_statement {
                continue;
            }

            let excluded = in_exclusions || self.excluded_marker.is_match(rest);
            let priority = self.priority(rest);
            let description = self.clean(rest);
            if description.is_empty() {
                continue;
            }
            candidates.push(Candidate {
                explicit,
                description,
                priority,
                excluded,
            });
        }

        assign_ids(candidates)
    }

    fn priority(&self, text: &str) -> Priority {
        if let Some(c) = self.priority_tag.captures(text) {
            return match c[1].to_ascii_lowercase().as_str() {
                "critical" => Priority::Critical,
                "high" => Priority::High,
                "low" => Priority::Low,
                _ => Priority::Medium,
            };
        }
        if let Some(c) = self.priority_level.captures(text) {
            return match &c[1] {
                "0" => Priority::Critical,
                "1" => Priority::High,
                "2" => Priority::Medium,
                _ => Priority::Low,
            };
        }
        if self.high_modal.is_match(text) {
            Priority::High
        } else if self.medium_modal.is_match(text) {
            Priority::Medium
        } else if self.low_modal.is_match(text) {
            Priority::Low
        } else {
            Priority::Medium
        }
    }

    /// Strip markers and collapse whitespace.
    fn clean(&self, text: &str) -> String {
        let text = self.priority_tag.replace_all(text, " ");
        let text = self.excluded_marker.replace_all(&text, " ");
        let text = self.priority_level.replace_all(&text, " ");
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for CorpusParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CorpusParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusParser").finish_non_exhaustive()
    }
}

fn is_exclusion_heading(line: &str) -> bool {
    let lower = line.to_lowercase();
    ["exclusion", "out of scope", "out-of-scope", "non-goal"]
        .iter()
        .any(|k| lower.contains(k))
}

/// Give every candidate an id: explicit ids are kept (later duplicates are
/// dropped and reported), the rest get the lowest free `R<n>`.
fn assign_ids(candidates: Vec<Candidate>) -> ParsedCorpus {
    let mut taken: BTreeSet<RequirementId> = BTreeSet::new();
    let mut parsed = ParsedCorpus::default();
    let mut keep = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match &candidate.explicit {
            Some(id) if !taken.insert(id.clone()) => {
                tracing::warn!(requirement = %id, "switchyard.audit.duplicate_requirement");
                parsed
                    .inconsistencies
                    .push(AuditInconsistency::DuplicateRequirement { id: id.clone() });
            }
            _ => keep.push(candidate),
        }
    }

    let mut next = 1u32;
    for candidate in keep {
        let id = match candidate.explicit {
            Some(id) => id,
            None => loop {
                let id = RequirementId::new(format!("R{next}"));
                next += 1;
                if taken.insert(id.clone()) {
                    break id;
                }
            },
        };
        parsed.requirements.push(RequirementRecord {
            id,
            description: candidate.description,
            priority: candidate.priority,
            excluded: candidate.excluded,
        });
    }
    parsed
}
