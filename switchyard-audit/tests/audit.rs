use serde_json::json;
use std::sync::Arc;
use switchyard_audit::{
    ArtifactCategory, ArtifactDescriptor, ArtifactScope, AuditCapability, AuditConfig,
    AuditInconsistency, AuditLedger, Auditor, DependencyNote, Priority, RequirementRecord,
    RequirementStatus, SafetyCondition, SafetyGate,
};
use switchyard_proto::handler::Capability;
use switchyard_proto::id::RequirementId;
use switchyard_proto::work::WorkItem;

fn auditor() -> Auditor {
    Auditor::new(AuditConfig::default()).unwrap()
}

fn export_scenario() -> (Vec<RequirementRecord>, Vec<ArtifactDescriptor>) {
    let requirements = vec![
        RequirementRecord::new("R1", "export to file"),
        RequirementRecord::new("R2", "admin panel").excluded(),
    ];
    let inventory = vec![
        ArtifactDescriptor::new("src/export/file_export.rs", 5).with_references(3),
        ArtifactDescriptor::new("src/admin-dashboard.ts", 200),
    ];
    (requirements, inventory)
}

#[test]
fn excluded_requirement_does_not_hold_back_coverage_or_deletion() {
    let (requirements, inventory) = export_scenario();
    let report = auditor().audit(&requirements, &inventory);

    assert_eq!(report.coverage(), 100.0);
    assert!(report.gaps().is_empty());
    assert_eq!(report.excluded(), &[RequirementId::new("R2")]);

    let a1 = report.artifact("src/export/file_export.rs").unwrap();
    assert_eq!(a1.scope, ArtifactScope::InScope);
    let a2 = report.artifact("src/admin-dashboard.ts").unwrap();
    assert_eq!(a2.scope, ArtifactScope::OutOfScope);

    assert_eq!(report.phase1().len(), 1);
    assert_eq!(report.phase1()[0].path, "src/admin-dashboard.ts");
    assert!(report.phase2().is_empty());
    assert_eq!(
        report.requirement(&"R1".into()).unwrap().status,
        RequirementStatus::Implemented
    );
    assert!(report.requirement(&"R2".into()).is_none());
}

#[test]
fn rerun_on_same_inputs_is_byte_identical() {
    let (requirements, inventory) = export_scenario();
    let auditor = auditor();
    let first = auditor.audit(&requirements, &inventory).to_json().unwrap();

    let mut shuffled = inventory.clone();
    shuffled.reverse();
    let second = auditor.audit(&requirements, &shuffled).to_json().unwrap();
    assert_eq!(first, second);

    let mut ledger = AuditLedger::new();
    assert_eq!(ledger.append(auditor.audit(&requirements, &inventory)), 1);
    assert_eq!(ledger.append(auditor.audit(&requirements, &inventory)), 2);
    assert_eq!(ledger.get(1).unwrap().report, ledger.get(2).unwrap().report);
    assert_eq!(ledger.latest().unwrap().sequence, 2);
    assert!(ledger.get(0).is_none());
}

#[test]
fn safety_gate_requires_every_condition() {
    let gate = SafetyGate::new(&AuditConfig::default()).unwrap();
    for mask in 0u8..16 {
        let referenced = mask & 1 != 0;
        let fresh = mask & 2 != 0;
        let protected = mask & 4 != 0;
        let public = mask & 8 != 0;

        let mut artifact = ArtifactDescriptor::new("src/legacy/report.rs", if fresh { 3 } else { 365 })
            .with_references(u32::from(referenced))
            .with_category(if protected {
                ArtifactCategory::Build
            } else {
                ArtifactCategory::Source
            });
        if public {
            artifact = artifact.public();
        }

        let verdict = gate.evaluate(&artifact);
        assert_eq!(verdict.is_safe(), mask == 0, "mask {mask:04b}");
        assert_eq!(gate.is_safe_to_delete(&artifact), mask == 0);
        assert_eq!(verdict.unmet().len(), mask.count_ones() as usize, "mask {mask:04b}");
    }
}

#[test]
fn multiply_matched_artifact_is_never_deleted() {
    let requirements = vec![
        RequirementRecord::new("R1", "invoice rendering"),
        RequirementRecord::new("R2", "invoice emailing"),
    ];
    // Each requirement scores 0.5 against it: partial twice.
    let inventory = vec![ArtifactDescriptor::new("src/invoice.rs", 400)];
    let report = auditor().audit(&requirements, &inventory);

    let a = report.artifact("src/invoice.rs").unwrap();
    assert_eq!(a.matches.len(), 2);
    assert_eq!(a.scope, ArtifactScope::InScope);
    assert!(report.phase1().is_empty());
    assert!(report.phase2().is_empty());
}

#[test]
fn single_partial_match_is_uncertain_and_retained() {
    let requirements = vec![RequirementRecord::new("R1", "invoice rendering")];
    let inventory = vec![ArtifactDescriptor::new("src/invoice.rs", 400)];
    let report = auditor().audit(&requirements, &inventory);
    assert_eq!(report.artifact("src/invoice.rs").unwrap().scope, ArtifactScope::Uncertain);
    assert_eq!(report.requirement(&"R1".into()).unwrap().status, RequirementStatus::Partial);
    assert_eq!(report.coverage(), 0.0);
    assert!(report.phase1().is_empty() && report.phase2().is_empty());
}

#[test]
fn protected_and_referenced_overages_go_to_review() {
    let requirements = vec![RequirementRecord::new("R1", "export to file")];
    let config = AuditConfig {
        entry_points: vec!["src/bin/legacy_cli.rs".into()],
        ..AuditConfig::default()
    };
    let inventory = vec![
        ArtifactDescriptor::new("src/export/file_export.rs", 5),
        ArtifactDescriptor::new("src/legacy/report.rs", 400).with_references(2),
        ArtifactDescriptor::new("src/bin/legacy_cli.rs", 400),
        ArtifactDescriptor::new("src/legacy/types.rs", 400),
    ];
    let report = Auditor::new(config).unwrap().audit(&requirements, &inventory);

    // Protected types file is in scope, so it never reaches the plan.
    assert_eq!(report.artifact("src/legacy/types.rs").unwrap().scope, ArtifactScope::InScope);

    let phase2: Vec<_> = report.phase2().iter().map(|o| o.path.as_str()).collect();
    assert_eq!(phase2, vec!["src/bin/legacy_cli.rs", "src/legacy/report.rs"]);
    assert_eq!(report.phase2()[1].unmet, vec![SafetyCondition::InboundReferences]);
    assert_eq!(
        report.dependency_notes(),
        &[
            DependencyNote::StillReferenced {
                path: "src/legacy/report.rs".into(),
                references: 2
            },
            DependencyNote::EntryPoint {
                path: "src/bin/legacy_cli.rs".into()
            },
        ]
    );
}

#[test]
fn unknown_claim_is_recorded_and_held_out_of_the_plan() {
    let requirements = vec![RequirementRecord::new("R1", "export to file")];
    let inventory = vec![ArtifactDescriptor::new("src/orphan.rs", 400).with_claim("R42")];
    let report = auditor().audit(&requirements, &inventory);

    assert_eq!(
        report.inconsistencies(),
        &[AuditInconsistency::UnknownRequirementClaim {
            artifact: "src/orphan.rs".into(),
            requirement: "R42".into(),
        }]
    );
    let a = report.artifact("src/orphan.rs").unwrap();
    assert!(a.held);
    assert_eq!(a.scope, ArtifactScope::OutOfScope);
    assert!(report.phase1().is_empty() && report.phase2().is_empty());
}

#[test]
fn gaps_are_ordered_by_priority_then_id() {
    let requirements = vec![
        RequirementRecord::new("R10", "quarterly reconciliation").with_priority(Priority::Low),
        RequirementRecord::new("R2", "password rotation").with_priority(Priority::Critical),
        RequirementRecord::new("R1", "audit trail").with_priority(Priority::Low),
    ];
    let report = auditor().audit(&requirements, &[]);
    let ids: Vec<_> = report.gaps().iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["R2", "R1", "R10"]);
    assert_eq!(report.coverage(), 0.0);
}

#[test]
fn empty_requirement_set_is_fully_covered() {
    let report = auditor().audit(&[], &[ArtifactDescriptor::new("Cargo.toml", 900)]);
    assert_eq!(report.coverage(), 100.0);
    assert_eq!(report.artifact("Cargo.toml").unwrap().scope, ArtifactScope::InScope);
}

#[test]
fn corpus_text_end_to_end() {
    let corpus = "\
# Requirements
- R1: Users must export reports to file
- R1: Duplicate entry
- Search should support filters

## Non-goals
- Admin dashboard
";
    let inventory = vec![
        ArtifactDescriptor::new("src/report_export.rs", 2).with_symbol("writeFile"),
        ArtifactDescriptor::new("src/admin/dashboard.rs", 300),
    ];
    let report = auditor().audit_corpus(corpus, &inventory);

    assert_eq!(report.excluded(), &[RequirementId::new("R3")]);
    assert_eq!(
        report.inconsistencies(),
        &[AuditInconsistency::DuplicateRequirement { id: "R1".into() }]
    );
    assert_eq!(report.requirement(&"R1".into()).unwrap().status, RequirementStatus::Implemented);
    assert_eq!(report.requirement(&"R2".into()).unwrap().status, RequirementStatus::Missing);
    assert_eq!(report.coverage(), 50.0);
    assert_eq!(report.phase1()[0].path, "src/admin/dashboard.rs");
}

#[tokio::test]
async fn capability_wraps_the_auditor() {
    let capability = AuditCapability::new(Arc::new(auditor()));

    let item = WorkItem::new("audit-1").with_payload(json!({
        "requirements": "- R1: export to file\n",
        "inventory": [{"path": "src/export/file_export.rs", "days_since_modified": 1}],
    }));
    let output = capability.invoke(item).await.unwrap();
    assert!(!output.partial);
    assert_eq!(output.output["coverage"], json!(100.0));

    let item = WorkItem::new("audit-2").with_payload(json!({
        "requirements": "- R1: export to file\n",
        "inventory": [{"path": "src/x.rs", "days_since_modified": 1, "claims": ["R7"]}],
    }));
    assert!(capability.invoke(item).await.unwrap().partial);

    let item = WorkItem::new("audit-3").with_payload(json!({"inventory": []}));
    assert!(capability.invoke(item).await.is_err());
}
