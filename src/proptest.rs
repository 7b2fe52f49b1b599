//! Property-based tests for the matrix builder.
//!
//! Inputs are generated as loosely shaped JSON so that missing, null and
//! mistyped sub-fields all reach the builder.

use crate::matrix::{build_classic_row, build_ruleset_rows, PolicyKind};
use crate::model::{ClassicProtection, RuleSet};
use crate::schema::{CLASSIC_SCHEMA, RULESET_SCHEMA};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ============================================================================
// Strategies
// ============================================================================

/// Any small JSON scalar, including shapes the API never sends.
fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (0u64..20).prop_map(|n| json!(n)),
        "[a-z/_-]{0,10}".prop_map(Value::String),
    ]
}

fn arb_names() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec("[a-z-]{1,8}", 0..4).prop_map(|names| json!(names)),
        prop::collection::vec("[a-z-]{1,8}", 0..4)
            .prop_map(|names| json!(names.iter().map(|n| json!({"context": n})).collect::<Vec<_>>())),
        arb_scalar(),
    ]
}

fn arb_toggle() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(|enabled| json!({"enabled": enabled})),
        Just(json!({})),
        arb_scalar(),
    ]
}

/// An object holding a random subset of `fields`.
fn arb_object(
    fields: Vec<(&'static str, BoxedStrategy<Value>)>,
) -> impl Strategy<Value = Value> {
    let entries: Vec<_> = fields
        .into_iter()
        .map(|(name, strategy)| prop::option::of(strategy).prop_map(move |v| (name, v)))
        .collect();
    entries.prop_map(|entries| {
        let map: Map<String, Value> = entries
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name.to_string(), value)))
            .collect();
        Value::Object(map)
    })
}

fn arb_classic() -> impl Strategy<Value = Value> {
    arb_object(vec![
        (
            "required_pull_request_reviews",
            prop_oneof![
                arb_scalar().prop_map(|count| json!({"required_approving_review_count": count})),
                arb_scalar(),
            ]
            .boxed(),
        ),
        (
            "required_status_checks",
            prop_oneof![
                arb_names().prop_map(|checks| json!({"checks": checks})),
                arb_names().prop_map(|contexts| json!({"contexts": contexts})),
                arb_scalar(),
            ]
            .boxed(),
        ),
        ("required_linear_history", arb_toggle().boxed()),
        ("required_signatures", arb_toggle().boxed()),
        ("allow_force_pushes", arb_toggle().boxed()),
        ("allow_deletions", arb_toggle().boxed()),
        ("enforce_admins", arb_toggle().boxed()),
        (
            "required_deployments",
            arb_names()
                .prop_map(|environments| json!({"environments": environments}))
                .boxed(),
        ),
    ])
}

fn arb_rule() -> impl Strategy<Value = Value> {
    let kind = prop::sample::select(vec![
        "creation",
        "update",
        "deletion",
        "required_linear_history",
        "merge_queue",
        "required_deployments",
        "signed_commits",
        "pull_request",
        "required_status_checks",
        "block_force_pushes",
        "code_scanning_results",
        "workflows",
        "file_path_restriction",
    ]);
    let config = arb_object(vec![
        ("required_approving_review_count", arb_scalar().boxed()),
        ("required_status_checks", arb_names().boxed()),
        ("merge_method", arb_scalar().boxed()),
        ("build_concurrency", arb_scalar().boxed()),
        ("min_group_size", arb_scalar().boxed()),
        ("require_all_group_entries_to_pass", arb_scalar().boxed()),
    ]);
    (kind, prop::option::of(config)).prop_map(|(kind, config)| match config {
        Some(config) => json!({"type": kind, "configuration": config}),
        None => json!({"type": kind}),
    })
}

fn arb_ruleset() -> impl Strategy<Value = Value> {
    (
        prop::option::of("[a-z -]{0,12}"),
        prop_oneof![Just("active"), Just("disabled"), Just("evaluate"), Just("bogus")],
        prop::collection::vec(
            prop_oneof![Just("main".to_string()), Just("*".to_string()), Just("All".to_string()), "[a-z/]{1,8}"],
            0..3,
        ),
        prop::collection::vec(arb_rule(), 0..6),
        prop::collection::vec((0i64..100).prop_map(|id| json!({"actor_id": id})), 0..3),
    )
        .prop_map(|(name, enforcement, targets, rules, actors)| {
            json!({
                "name": name,
                "enforcement": enforcement,
                "target_branches": targets,
                "rules": rules,
                "bypass_actors": actors,
            })
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn classic_rows_always_match_schema(raw in arb_classic(), present in any::<bool>()) {
        let protection: ClassicProtection = serde_json::from_value(raw).unwrap();
        let protection = present.then_some(&protection);
        let row = build_classic_row(&"repo".into(), "main", protection);

        let columns: Vec<_> = row.cells().iter().map(|(key, _)| *key).collect();
        prop_assert_eq!(columns.as_slice(), CLASSIC_SCHEMA);
    }

    #[test]
    fn ruleset_rows_always_match_schema(raw in prop::collection::vec(arb_ruleset(), 0..4)) {
        let rulesets: Vec<RuleSet> = serde_json::from_value(Value::Array(raw)).unwrap();
        let rows = build_ruleset_rows(&"repo".into(), "main", &rulesets);

        if rulesets.is_empty() {
            prop_assert_eq!(rows.len(), 1);
            prop_assert_eq!(rows[0].key().kind, PolicyKind::NoRuleSet);
        } else {
            prop_assert!(rows.len() <= rulesets.len());
        }
        for row in &rows {
            let columns: Vec<_> = row.cells().iter().map(|(key, _)| *key).collect();
            prop_assert_eq!(columns.as_slice(), RULESET_SCHEMA);
        }
    }

    #[test]
    fn building_is_idempotent(classic in arb_classic(), raw in prop::collection::vec(arb_ruleset(), 0..4)) {
        let protection: ClassicProtection = serde_json::from_value(classic).unwrap();
        let rulesets: Vec<RuleSet> = serde_json::from_value(Value::Array(raw)).unwrap();
        let repo = "repo".into();

        let first = build_classic_row(&repo, "main", Some(&protection));
        let second = build_classic_row(&repo, "main", Some(&protection));
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        let first = build_ruleset_rows(&repo, "main", &rulesets);
        let second = build_ruleset_rows(&repo, "main", &rulesets);
        prop_assert_eq!(first, second);
    }
}
