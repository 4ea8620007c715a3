// integration tests for check-status gating

use mergegate::{
    conclude, conclude_batch, evaluate, Conclusion, ConditionSet, GatePolicy, MatchResult,
};
use serde_json::json;

use crate::common::{at, pull};

const NOW: &str = "2021-09-22T08:00:05Z";

fn conclusion_of(set: &ConditionSet, attributes: serde_json::Value, policy: GatePolicy) -> Conclusion {
    conclude(set, &pull(attributes), &at(NOW), policy)
}

// ============================================================================
// conjunctive check conditions
// ============================================================================

fn conjunctive() -> ConditionSet {
    ConditionSet::from_strs(&["check-success=ci-1", "check-success=ci-2"]).unwrap()
}

#[test]
fn test_conjunctive_nothing_reported_is_pending() {
    let c = conclusion_of(&conjunctive(), json!({}), GatePolicy::queue());
    assert_eq!(c, Conclusion::Pending);
}

#[test]
fn test_conjunctive_one_pending_is_pending() {
    let c = conclusion_of(
        &conjunctive(),
        json!({"check-pending": ["ci-1"], "check-success": ["ci-2"]}),
        GatePolicy::queue(),
    );
    assert_eq!(c, Conclusion::Pending);
}

#[test]
fn test_conjunctive_one_failed_is_failure() {
    let c = conclusion_of(
        &conjunctive(),
        json!({"check-failure": ["ci-1"], "check-success": ["ci-2"]}),
        GatePolicy::queue(),
    );
    assert_eq!(c, Conclusion::Failure);
}

#[test]
fn test_conjunctive_all_succeeded_is_success() {
    let c = conclusion_of(
        &conjunctive(),
        json!({"check-success": ["ci-1", "ci-2"]}),
        GatePolicy::queue(),
    );
    assert_eq!(c, Conclusion::Success);
}

#[test]
fn test_conjunctive_partial_report_is_pending() {
    let c = conclusion_of(
        &conjunctive(),
        json!({"check-success": ["ci-1"]}),
        GatePolicy::queue(),
    );
    assert_eq!(c, Conclusion::Pending);
}

#[test]
fn test_conjunctive_failure_with_missing_check_is_pending() {
    let c = conclusion_of(
        &conjunctive(),
        json!({"check-failure": ["ci-1"]}),
        GatePolicy::queue(),
    );
    assert_eq!(c, Conclusion::Pending);
}

#[test]
fn test_conjunctive_table_under_merge_policy() {
    // only check conditions here, so the policy flag changes nothing
    let rows = [
        (json!({}), Conclusion::Pending),
        (json!({"check-pending": ["ci-1"], "check-success": ["ci-2"]}), Conclusion::Pending),
        (json!({"check-failure": ["ci-1"], "check-success": ["ci-2"]}), Conclusion::Failure),
        (json!({"check-success": ["ci-1", "ci-2"]}), Conclusion::Success),
        (json!({"check-success": ["ci-1"]}), Conclusion::Pending),
        (json!({"check-failure": ["ci-1"]}), Conclusion::Pending),
    ];
    for (attributes, expected) in rows {
        let c = conclusion_of(&conjunctive(), attributes.clone(), GatePolicy::merge());
        assert_eq!(c, expected, "{}", attributes);
    }
}

// ============================================================================
// disjunctive check conditions
// ============================================================================

fn disjunctive() -> ConditionSet {
    ConditionSet::build(&[json!({"or": ["check-success=ci-1", "check-success=ci-2"]})]).unwrap()
}

#[test]
fn test_disjunctive_pending_and_success_is_success() {
    let c = conclusion_of(
        &disjunctive(),
        json!({"check-pending": ["ci-1"], "check-success": ["ci-2"]}),
        GatePolicy::queue(),
    );
    assert_eq!(c, Conclusion::Success);
}

#[test]
fn test_disjunctive_pending_and_failure_is_pending() {
    let c = conclusion_of(
        &disjunctive(),
        json!({"check-pending": ["ci-1"], "check-failure": ["ci-2"]}),
        GatePolicy::queue(),
    );
    assert_eq!(c, Conclusion::Pending);
}

#[test]
fn test_disjunctive_lone_failure_is_failure() {
    let c = conclusion_of(
        &disjunctive(),
        json!({"check-failure": ["ci-1"]}),
        GatePolicy::queue(),
    );
    assert_eq!(c, Conclusion::Failure);
}

#[test]
fn test_disjunctive_original_scenarios() {
    let rows = [
        (json!({}), Conclusion::Pending),
        (json!({"check-success": ["ci-1", "ci-2"]}), Conclusion::Success),
        (json!({"check-failure": ["ci-1"], "check-success": ["ci-2"]}), Conclusion::Success),
        (json!({"check-success": ["ci-1"]}), Conclusion::Success),
    ];
    for (attributes, expected) in rows {
        let c = conclusion_of(&disjunctive(), attributes.clone(), GatePolicy::merge());
        assert_eq!(c, expected, "{}", attributes);
    }
}

// ============================================================================
// expected failure
// ============================================================================

#[test]
fn test_expected_failure() {
    let set = ConditionSet::from_strs(&["check-failure=ci-1"]).unwrap();
    let rows = [
        (json!({}), Conclusion::Pending),
        (json!({"check-pending": ["ci-1"]}), Conclusion::Pending),
        (json!({"check-failure": ["ci-1"]}), Conclusion::Success),
        // a success is not read as "will never fail"
        (json!({"check-success": ["ci-1"]}), Conclusion::Pending),
    ];
    for (attributes, expected) in rows {
        let c = conclusion_of(&set, attributes.clone(), GatePolicy::merge());
        assert_eq!(c, expected, "{}", attributes);
    }
}

// ============================================================================
// negated checks in a conjunction
// ============================================================================

#[test]
fn test_negated_checks_in_conjunction() {
    let set = ConditionSet::from_strs(&[
        "check-success=test-starter",
        "-check-pending=foo",
        "-check-failure=foo",
    ])
    .unwrap();

    let rows = [
        (json!({}), Conclusion::Pending),
        (
            json!({"check-success": ["test-starter"], "check-pending": ["foo"]}),
            Conclusion::Pending,
        ),
        (
            json!({"check-success": ["test-starter"], "check-failure": ["foo"]}),
            Conclusion::Failure,
        ),
        (
            json!({"check-success": ["test-starter", "foo"]}),
            Conclusion::Success,
        ),
        (
            json!({"check-success": ["foo"], "check-failure": ["test-starter"]}),
            Conclusion::Failure,
        ),
    ];
    for (attributes, expected) in rows {
        let c = conclusion_of(&set, attributes.clone(), GatePolicy::merge());
        assert_eq!(c, expected, "{}", attributes);
    }
}

#[test]
fn test_failed_check_beside_satisfied_negated_failure_condition() {
    let set = ConditionSet::from_strs(&["-check-failure=lint", "check-success=tests"]).unwrap();
    let attributes = json!({"check-success": ["lint"], "check-failure": ["tests"]});

    for policy in [GatePolicy::merge(), GatePolicy::queue()] {
        assert_eq!(
            conclusion_of(&set, attributes.clone(), policy),
            Conclusion::Failure,
            "{:?}",
            policy
        );
    }

    // with the failing check still running the gate waits
    let running = json!({"check-success": ["lint"], "check-pending": ["tests"]});
    assert_eq!(
        conclusion_of(&set, running, GatePolicy::merge()),
        Conclusion::Pending
    );

    let status = ConditionSet::from_strs(&["-status-failure=lint", "status-success=tests"]).unwrap();
    let attributes = json!({"status-success": ["lint"], "status-failure": ["tests"]});
    assert_eq!(
        conclusion_of(&status, attributes, GatePolicy::merge()),
        Conclusion::Failure
    );
}

// ============================================================================
// non-check conditions and the policy flag
// ============================================================================

#[test]
fn test_unmatched_condition_follows_policy() {
    let set = ConditionSet::from_strs(&["label=foo", "check-success=ci"]).unwrap();
    let attributes = json!({"label": ["bar"], "check-success": ["ci"]});

    assert_eq!(
        conclusion_of(&set, attributes.clone(), GatePolicy::merge()),
        Conclusion::Failure
    );
    assert_eq!(
        conclusion_of(&set, attributes, GatePolicy::queue()),
        Conclusion::Pending
    );
}

#[test]
fn test_missing_attribute_is_pending_under_both_policies() {
    let set = ConditionSet::from_strs(&["base=main"]).unwrap();
    assert_eq!(conclusion_of(&set, json!({}), GatePolicy::merge()), Conclusion::Pending);
    assert_eq!(conclusion_of(&set, json!({}), GatePolicy::queue()), Conclusion::Pending);
}

#[test]
fn test_failed_check_beats_queue_policy() {
    let set = ConditionSet::from_strs(&["label=foo", "check-success=ci"]).unwrap();
    let c = conclusion_of(
        &set,
        json!({"label": ["foo"], "check-failure": ["ci"]}),
        GatePolicy::queue(),
    );
    assert_eq!(c, Conclusion::Failure);
}

#[test]
fn test_queue_scenario_with_failed_check() {
    let set = ConditionSet::from_strs(&[
        "label=foo",
        "check-success=tests",
        "check-success=jenkins/fake-tests",
    ])
    .unwrap();
    let c = conclusion_of(
        &set,
        json!({
            "number": 1,
            "label": ["foo"],
            "check-success": ["tests"],
            "check-failure": ["jenkins/fake-tests"],
        }),
        GatePolicy::merge(),
    );
    assert_eq!(c, Conclusion::Failure);
}

// ============================================================================
// batches
// ============================================================================

#[test]
fn test_batch_failure_dominates() {
    let set = conjunctive();
    let batch = [
        pull(json!({"number": 1, "check-success": ["ci-1", "ci-2"]})),
        pull(json!({"number": 2, "check-pending": ["ci-1"]})),
        pull(json!({"number": 3, "check-failure": ["ci-1"], "check-success": ["ci-2"]})),
    ];
    let c = conclude_batch(&set, &batch, &at(NOW), GatePolicy::merge());
    assert_eq!(c, Conclusion::Failure);
}

#[test]
fn test_batch_pending_over_success() {
    let set = conjunctive();
    let batch = [
        pull(json!({"number": 1, "check-success": ["ci-1", "ci-2"]})),
        pull(json!({"number": 2, "check-pending": ["ci-1"]})),
    ];
    let evaluation = evaluate(&set, &batch, &at(NOW));
    assert_eq!(
        evaluation.subject_conclusions(GatePolicy::merge()),
        vec![Conclusion::Success, Conclusion::Pending]
    );
    assert_eq!(evaluation.conclusion(GatePolicy::merge()), Conclusion::Pending);
}

#[test]
fn test_empty_batch_is_pending() {
    let c = conclude_batch(&conjunctive(), &[], &at(NOW), GatePolicy::merge());
    assert_eq!(c, Conclusion::Pending);
}

#[test]
fn test_empty_conditions_succeed() {
    let set = ConditionSet::build(&[]).unwrap();
    let c = conclusion_of(&set, json!({}), GatePolicy::merge());
    assert_eq!(c, Conclusion::Success);
}

// ============================================================================
// general properties
// ============================================================================

#[test]
fn test_evaluation_is_idempotent() {
    let set = ConditionSet::build(&[
        json!("base=main"),
        json!({"or": ["check-success=ci-1", "check-success=ci-2"]}),
        json!("schedule=MON-FRI 08:00-17:00"),
    ])
    .unwrap();
    let batch = [pull(json!({
        "base": "main",
        "check-pending": ["ci-1"],
        "check-failure": ["ci-2"],
    }))];
    let ctx = at(NOW);

    let first = evaluate(&set, &batch, &ctx);
    for _ in 0..5 {
        let again = evaluate(&set, &batch, &ctx);
        assert_eq!(again.match_result(), first.match_result());
        assert_eq!(again.summary(), first.summary());
        assert_eq!(
            again.conclusion(GatePolicy::merge()),
            first.conclusion(GatePolicy::merge())
        );
    }
}

#[test]
fn test_negation_law_over_snapshots() {
    let snapshots = [
        pull(json!({})),
        pull(json!({"label": ["foo"], "check-success": ["ci"]})),
        pull(json!({"label": ["bar"], "check-pending": ["ci"]})),
        pull(json!({"check-failure": ["ci"]})),
    ];
    let pairs = [
        ("label=foo", "-label=foo"),
        ("check-success=ci", "-check-success=ci"),
        ("check-failure=ci", "-check-failure=ci"),
        ("#label>=1", "-#label>=1"),
    ];

    for (plain, negated) in pairs {
        let plain_set = ConditionSet::from_strs(&[plain]).unwrap();
        let negated_set = ConditionSet::from_strs(&[negated]).unwrap();
        for s in &snapshots {
            let batch = std::slice::from_ref(s);
            let p = evaluate(&plain_set, batch, &at(NOW)).match_result();
            let n = evaluate(&negated_set, batch, &at(NOW)).match_result();
            assert_eq!(n, p.negate(), "{} vs {} on {:?}", plain, negated, s);
        }
    }
}

#[test]
fn test_kleene_dominance_in_groups() {
    let snapshot = pull(json!({"label": ["foo"]}));
    let batch = std::slice::from_ref(&snapshot);

    // label=bar is NotMatched, check-success=ci is Pending
    let all = ConditionSet::from_strs(&["check-success=ci", "label=bar"]).unwrap();
    assert_eq!(
        evaluate(&all, batch, &at(NOW)).match_result(),
        MatchResult::NotMatched
    );

    let any = ConditionSet::build(&[json!({"or": ["check-success=ci", "label=foo"]})]).unwrap();
    assert_eq!(
        evaluate(&any, batch, &at(NOW)).match_result(),
        MatchResult::Matched
    );
}

#[test]
fn test_shared_across_threads() {
    let set = conjunctive();
    let ctx = at(NOW);
    let inputs = [
        (json!({"check-success": ["ci-1", "ci-2"]}), Conclusion::Success),
        (json!({"check-failure": ["ci-1"], "check-success": ["ci-2"]}), Conclusion::Failure),
        (json!({"check-pending": ["ci-1"]}), Conclusion::Pending),
    ];

    std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|(attributes, expected)| {
                let set = &set;
                let ctx = &ctx;
                scope.spawn(move || {
                    let c = conclude(set, &pull(attributes.clone()), ctx, GatePolicy::merge());
                    assert_eq!(c, *expected);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });
}

#[test]
fn test_negation_in_or_fails_at_build_time() {
    let err = ConditionSet::build(&[json!({"or": ["check-success=ci-1", "-check-success=ci-2"]})])
        .unwrap_err();
    assert!(err.is_unsupported_combination());
    assert!(err.to_string().contains("conditions[0].or[1]"));
}
