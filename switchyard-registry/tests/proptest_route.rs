//! Property-based tests: routing returns exactly the matching handlers.

use proptest::prelude::*;
use std::sync::Arc;
use switchyard_proto::handler::{Category, HandlerSpec};
use switchyard_proto::test_utils::EchoHandler;
use switchyard_proto::trigger::Trigger;
use switchyard_proto::work::WorkItem;
use switchyard_registry::CapabilityRegistry;

const STAGES: &[&str] = &["plan", "implement", "review", "security"];
const TAGS: &[&str] = &["web", "auth", "db"];
const KEYS: &[&str] = &["diff", "spec", "log"];

fn category() -> impl Strategy<Value = Category> {
    proptest::sample::select(Category::ALL.to_vec())
}

fn trigger() -> impl Strategy<Value = Trigger> {
    let leaf = prop_oneof![
        Just(Trigger::Always),
        category().prop_map(Trigger::Category),
        proptest::sample::select(STAGES).prop_map(|s| Trigger::Stage(s.into())),
        proptest::sample::select(TAGS).prop_map(|t| Trigger::Tag(t.into())),
        proptest::sample::select(KEYS).prop_map(|k| Trigger::PayloadKey(k.into())),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..3).prop_map(Trigger::All),
            proptest::collection::vec(inner.clone(), 0..3).prop_map(Trigger::Any),
            inner.prop_map(|t| Trigger::Not(Box::new(t))),
        ]
    })
}

fn work_item() -> impl Strategy<Value = WorkItem> {
    (
        proptest::option::of(category()),
        proptest::option::of(proptest::sample::select(STAGES)),
        proptest::sample::subsequence(TAGS, 0..=TAGS.len()),
        proptest::sample::subsequence(KEYS, 0..=KEYS.len()),
    )
        .prop_map(|(category, stage, tags, keys)| {
            let mut item = WorkItem::new("w");
            item.category = category;
            item.origin = stage.map(Into::into);
            for tag in tags {
                item = item.with_tag(tag);
            }
            let payload: serde_json::Map<String, serde_json::Value> = keys
                .into_iter()
                .map(|k| (k.to_string(), serde_json::Value::Bool(true)))
                .collect();
            item.with_payload(serde_json::Value::Object(payload))
        })
}

proptest! {
    #[test]
    fn route_returns_exactly_the_matching_subset(
        specs in proptest::collection::vec((category(), trigger()), 0..12),
        item in work_item(),
    ) {
        let mut registry = CapabilityRegistry::new();
        for (i, (category, trigger)) in specs.iter().enumerate() {
            registry
                .register(
                    HandlerSpec::new(format!("h{i}"), *category).with_trigger(trigger.clone()),
                    Arc::new(EchoHandler),
                )
                .unwrap();
        }

        let routed: Vec<String> = registry
            .route(&item)
            .iter()
            .map(|h| h.id().to_string())
            .collect();
        let expected: Vec<String> = specs
            .iter()
            .enumerate()
            .filter(|(_, (_, trigger))| trigger.matches(&item))
            .map(|(i, _)| format!("h{i}"))
            .collect();

        prop_assert_eq!(routed, expected);
    }
}
