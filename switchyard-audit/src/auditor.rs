//! Reconciles requirements against an inventory.

use crate::config::AuditConfig;
use crate::corpus::{CorpusParser, RequirementRecord};
use crate::inventory::{ArtifactDescriptor, RecencyBucket};
use crate::matching::{self, Match, MatchStrength, Matcher};
use crate::report::{
    ArtifactClassification, ArtifactScope, AuditInconsistency, AuditReport, DependencyNote, Gap,
    MatchRef, Overage, ReportParts, RequirementClassification, RequirementStatus,
};
use crate::safety::{SafetyCondition, SafetyGate};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use switchyard_proto::error::ConfigurationError;
use switchyard_proto::id::RequirementId;

/// The compliance auditor.
#[derive(Debug)]
pub struct Auditor {
    config: AuditConfig,
    parser: CorpusParser,
    matcher: Matcher,
    gate: SafetyGate,
}

impl Auditor {
    /// Validate the config and compile its patterns.
    pub fn new(config: AuditConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let gate = SafetyGate::new(&config)?;
        Ok(Self {
            matcher: Matcher::new(config.high_confidence, config.low_confidence),
            parser: CorpusParser::new(),
            gate,
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// The safety gate used for the phased plan.
    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    /// Parse `corpus` and audit `inventory` against it. Parser
    /// inconsistencies are carried into the report.
    pub fn audit_corpus(&self, corpus: &str, inventory: &[ArtifactDescriptor]) -> AuditReport {
        let parsed = self.parser.parse(corpus);
        self.reconcile(&parsed.requirements, inventory, parsed.inconsistencies)
    }

    /// Audit already-parsed requirements.
    pub fn audit(
        &self,
        requirements: &[RequirementRecord],
        inventory: &[ArtifactDescriptor],
    ) -> AuditReport {
        self.reconcile(requirements, inventory, vec![])
    }

    fn reconcile(
        &self,
        requirements: &[RequirementRecord],
        inventory: &[ArtifactDescriptor],
        mut inconsistencies: Vec<AuditInconsistency>,
    ) -> AuditReport {
        let mut seen_ids = HashSet::new();
        let requirements: Vec<&RequirementRecord> = requirements
            .iter()
            .filter(|r| {
                let fresh = seen_ids.insert(r.id.clone());
                if !fresh {
                    inconsistencies.push(AuditInconsistency::DuplicateRequirement { id: r.id.clone() });
                }
                fresh
            })
            .collect();

        let mut seen_paths = HashSet::new();
        let mut artifacts: Vec<&ArtifactDescriptor> = inventory
            .iter()
            .filter(|a| {
                let fresh = seen_paths.insert(a.path.as_str());
                if !fresh {
                    inconsistencies.push(AuditInconsistency::DuplicateArtifact { path: a.path.clone() });
                }
                fresh
            })
            .collect();
        artifacts.sort_by(|a, b| a.path.cmp(&b.path));

        let active: Vec<&RequirementRecord> =
            requirements.iter().copied().filter(|r| !r.excluded).collect();
        let mut excluded: Vec<RequirementId> = requirements
            .iter()
            .filter(|r| r.excluded)
            .map(|r| r.id.clone())
            .collect();
        excluded.sort_by(|a, b| natural_cmp(a.as_str(), b.as_str()));

        let req_kw: Vec<BTreeSet<String>> =
            active.iter().map(|r| matching::keywords(&r.description)).collect();
        let art_kw: Vec<BTreeSet<String>> =
            artifacts.iter().map(|a| matching::artifact_keywords(a)).collect();

        // matches[r][a]
        let matches: Vec<Vec<Match>> = active
            .iter()
            .zip(&req_kw)
            .map(|(r, rk)| {
                artifacts
                    .iter()
                    .zip(&art_kw)
                    .map(|(a, ak)| self.matcher.judge(r, rk, a, ak))
                    .collect()
            })
            .collect();

        // Requirement side.
        let mut classified_reqs: Vec<RequirementClassification> = active
            .iter()
            .enumerate()
            .map(|(ri, r)| {
                let best = matches[ri]
                    .iter()
                    .map(|m| m.strength)
                    .max()
                    .unwrap_or(MatchStrength::None);
                let status = match best {
                    MatchStrength::Exact => RequirementStatus::Implemented,
                    MatchStrength::Partial => RequirementStatus::Partial,
                    MatchStrength::None => RequirementStatus::Missing,
                };
                let refs = artifacts
                    .iter()
                    .enumerate()
                    .filter(|(ai, _)| matches[ri][*ai].strength != MatchStrength::None)
                    .map(|(ai, a)| match_ref(a.path.clone(), matches[ri][ai]))
                    .collect();
                RequirementClassification {
                    id: r.id.clone(),
                    priority: r.priority,
                    status,
                    matches: refs,
                }
            })
            .collect();

        let implemented = classified_reqs
            .iter()
            .filter(|r| r.status == RequirementStatus::Implemented)
            .count();
        let coverage = if active.is_empty() {
            100.0
        } else {
            (implemented as f64 / active.len() as f64 * 10_000.0).round() / 100.0
        };

        let mut gaps: Vec<Gap> = active
            .iter()
            .zip(&classified_reqs)
            .filter(|(_, c)| c.status != RequirementStatus::Implemented)
            .map(|(r, c)| Gap {
                id: r.id.clone(),
                priority: r.priority,
                status: c.status,
                description: r.description.clone(),
            })
            .collect();
        gaps.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| natural_cmp(a.id.as_str(), b.id.as_str()))
        });
        classified_reqs.sort_by(|a, b| natural_cmp(a.id.as_str(), b.id.as_str()));

        // Artifact side.
        let known: HashSet<&RequirementId> = requirements.iter().map(|r| &r.id).collect();
        let mut parts = ReportParts::default();
        for (ai, a) in artifacts.iter().enumerate() {
            let unknown: Vec<&RequirementId> =
                a.claims.iter().filter(|c| !known.contains(c)).collect();
            for requirement in &unknown {
                tracing::warn!(artifact = %a.path, requirement = %requirement, "switchyard.audit.unknown_claim");
                inconsistencies.push(AuditInconsistency::UnknownRequirementClaim {
                    artifact: a.path.clone(),
                    requirement: (*requirement).clone(),
                });
            }
            let held = !unknown.is_empty();

            let mut refs: Vec<MatchRef> = active
                .iter()
                .enumerate()
                .filter(|(ri, _)| matches[*ri][ai].strength != MatchStrength::None)
                .map(|(ri, r)| match_ref(r.id.to_string(), matches[ri][ai]))
                .collect();
            refs.sort_by(|x, y| natural_cmp(&x.target, &y.target));

            let exact = refs.iter().filter(|m| m.strength == MatchStrength::Exact).count();
            let scope = if exact > 0 || refs.len() >= 2 || self.gate.is_protected(a) {
                ArtifactScope::InScope
            } else if refs.len() == 1 {
                ArtifactScope::Uncertain
            } else {
                ArtifactScope::OutOfScope
            };

            if scope == ArtifactScope::OutOfScope && !held {
                let verdict = self.gate.evaluate(a);
                let overage = Overage {
                    path: a.path.clone(),
                    size_bytes: a.size_bytes,
                    unmet: verdict.unmet().to_vec(),
                };
                if verdict.is_safe() {
                    parts.phase1.push(overage);
                } else {
                    notes_for(a, verdict.unmet(), &self.gate, &mut parts.dependency_notes);
                    parts.phase2.push(overage);
                }
            }

            parts.artifacts.push(ArtifactClassification {
                path: a.path.clone(),
                category: a.effective_category(),
                recency: RecencyBucket::of(a.days_since_modified, &self.config),
                scope,
                matches: refs,
                held,
            });
        }
        parts.dependency_notes.sort();

        for inconsistency in &inconsistencies {
            tracing::warn!(inconsistency = %inconsistency, "switchyard.audit.inconsistency");
        }
        tracing::info!(
            requirements = active.len(),
            excluded = excluded.len(),
            artifacts = artifacts.len(),
            coverage,
            phase1 = parts.phase1.len(),
            phase2 = parts.phase2.len(),
            "switchyard.audit.complete"
        );

        parts.coverage = coverage;
        parts.requirements = classified_reqs;
        parts.gaps = gaps;
        parts.excluded = excluded;
        parts.inconsistencies = inconsistencies;
        AuditReport::from_parts(parts)
    }
}

fn match_ref(target: String, m: Match) -> MatchRef {
    MatchRef {
        target,
        strength: m.strength,
        score: (m.score * 10_000.0).round() / 10_000.0,
    }
}

fn notes_for(
    artifact: &ArtifactDescriptor,
    unmet: &[SafetyCondition],
    gate: &SafetyGate,
    notes: &mut Vec<DependencyNote>,
) {
    if unmet.contains(&SafetyCondition::InboundReferences) {
        if artifact.reference_count > 0 {
            notes.push(DependencyNote::StillReferenced {
                path: artifact.path.clone(),
                references: artifact.reference_count,
            });
        }
        if gate.is_entry_point(artifact) {
            notes.push(DependencyNote::EntryPoint {
                path: artifact.path.clone(),
            });
        }
    }
    if unmet.contains(&SafetyCondition::PublicInterface) {
        notes.push(DependencyNote::PublicInterface {
            path: artifact.path.clone(),
        });
    }
}

/// Orders `R2` before `R10`: alphabetic prefix first, then the trailing
/// number, then the raw string.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    fn split(s: &str) -> (&str, Option<u64>) {
        let digits = s.len() - s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (prefix, number) = s.split_at(s.len() - digits);
        (prefix, number.parse().ok())
    }
    let (pa, na) = split(a);
    let (pb, nb) = split(b);
    pa.cmp(pb).then(na.cmp(&nb)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order_of_ids() {
        let mut ids = vec!["R10", "R2", "REQ-1", "R1", "FR-3"];
        ids.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(ids, vec!["FR-3", "R1", "R2", "R10", "REQ-1"]);
    }
}
