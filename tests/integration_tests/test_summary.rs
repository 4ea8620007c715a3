// integration tests for summary rendering

use mergegate::{evaluate, ConditionSet};
use serde_json::json;

use crate::common::{at, pull};

const NOW: &str = "2021-09-22T08:00:05Z";

#[test]
fn test_queue_summary_with_failed_check() {
    let set = ConditionSet::from_strs(&[
        "label=foo",
        "check-success=tests",
        "check-success=jenkins/fake-tests",
    ])
    .unwrap();
    let batch = [pull(json!({
        "number": 1,
        "current-year": null,
        "label": ["foo"],
        "check-success": ["tests"],
        "check-failure": ["jenkins/fake-tests"],
    }))];

    let evaluation = evaluate(&set, &batch, &at(NOW));
    assert_eq!(
        evaluation.queue_summary(),
        "- `label=foo`\n  - [X] #1\n- [X] `check-success=tests`\n- [ ] `check-success=jenkins/fake-tests`\n"
    );
}

#[test]
fn test_queue_summary_for_batch() {
    let set = ConditionSet::from_strs(&["base=main", "#approved-reviews-by>=1", "check-success=ci"])
        .unwrap();
    let batch = [
        pull(json!({
            "number": 1,
            "base": "main",
            "approved-reviews-by": ["alice"],
            "check-success": ["ci"],
        })),
        pull(json!({
            "number": 2,
            "base": "main",
            "approved-reviews-by": [],
            "check-success": ["ci"],
        })),
    ];

    let evaluation = evaluate(&set, &batch, &at(NOW));
    assert_eq!(
        evaluation.queue_summary(),
        "- [X] `base=main`\n\
         - `#approved-reviews-by>=1`\n  \
           - [X] #1\n  \
           - [ ] #2\n\
         - [X] `check-success=ci`\n"
    );
    assert_eq!(
        evaluation.summary(),
        "- [X] `base=main`\n- [ ] `#approved-reviews-by>=1`\n- [X] `check-success=ci`\n"
    );
}

#[test]
fn test_summary_preserves_input_order() {
    let conditions = ["label=c", "label=a", "check-success=ci", "base=main", "label=b"];
    let set = ConditionSet::from_strs(&conditions).unwrap();

    for attributes in [
        json!({}),
        json!({"label": ["a", "b", "c"], "base": "main", "check-success": ["ci"]}),
        json!({"label": ["b"], "check-failure": ["ci"]}),
    ] {
        let batch = [pull(attributes)];
        let summary = evaluate(&set, &batch, &at(NOW)).summary();
        let rendered: Vec<&str> = summary
            .lines()
            .map(|line| line.trim_start_matches("- [X] ").trim_start_matches("- [ ] "))
            .map(|line| line.trim_matches('`'))
            .collect();
        assert_eq!(rendered, conditions);
    }
}

#[test]
fn test_nested_group_summary() {
    let set = ConditionSet::build(&[
        json!("base=main"),
        json!({"or": [
            "label=urgent",
            {"and": ["#approved-reviews-by>=2", "check-success=ci"]}
        ]}),
    ])
    .unwrap();
    let batch = [pull(json!({
        "base": "main",
        "label": [],
        "approved-reviews-by": ["alice", "bob"],
        "check-success": ["ci"],
    }))];

    assert_eq!(
        evaluate(&set, &batch, &at(NOW)).summary(),
        "- [X] `base=main`\n\
         - `or`\n  \
           - [ ] `label=urgent`\n  \
           - `and`\n    \
             - [X] `#approved-reviews-by>=2`\n    \
             - [X] `check-success=ci`\n"
    );
}

#[test]
fn test_summary_uses_raw_text() {
    let set = ConditionSet::from_strs(&["  base = main ", "number≥3", "-draft"]).unwrap();
    let batch = [pull(json!({"base": "main", "number": 3, "draft": false}))];
    assert_eq!(
        evaluate(&set, &batch, &at(NOW)).summary(),
        "- [X] `base = main`\n- [X] `number≥3`\n- [X] `-draft`\n"
    );
}
