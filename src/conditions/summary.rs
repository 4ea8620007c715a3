//! markdown checklist rendering
//!
//! two layouts are produced from the same per-node results:
//!
//! ```text
//! - [X] `base=main`          plain summary, one checkbox per condition
//! - `or`
//!   - [ ] `label=a`
//!   - [X] `label=b`
//!
//! - `label=foo`              queue summary, per pull request lines for
//!   - [X] #1                 attributes that differ between them
//! - [X] `check-success=ci`
//! ```

use super::attributes::is_shared;
use super::eval::{Evaluation, NodeResult};
use super::parser::ConditionSet;
use super::types::Condition;
use crate::snapshot::Snapshot;

pub(crate) fn render(evaluation: &Evaluation) -> String {
    render_with(evaluation, None)
}

pub(crate) fn render_queue(evaluation: &Evaluation) -> String {
    render_with(evaluation, Some(evaluation.subjects))
}

fn render_with(evaluation: &Evaluation, queue: Option<&[Snapshot]>) -> String {
    let tops: Vec<&[NodeResult]> = evaluation
        .results
        .iter()
        .map(|root| top_level_nodes(evaluation.conditions, root))
        .collect();

    let mut out = String::new();
    for (i, condition) in evaluation.conditions.top_level().iter().enumerate() {
        let results: Vec<&NodeResult> = tops.iter().filter_map(|nodes| nodes.get(i)).collect();
        render_node(&mut out, condition, &results, 0, queue);
    }
    out
}

/// node results lined up with `ConditionSet::top_level`
fn top_level_nodes<'r>(conditions: &ConditionSet, root: &'r NodeResult) -> &'r [NodeResult] {
    match conditions.root() {
        Condition::All(_) => &root.children,
        _ => std::slice::from_ref(root),
    }
}

fn render_node(
    out: &mut String,
    condition: &Condition,
    results: &[&NodeResult],
    depth: usize,
    queue: Option<&[Snapshot]>,
) {
    let indent = "  ".repeat(depth);

    match condition {
        Condition::Atomic(atom) => match queue {
            Some(subjects) if !is_shared(&atom.attribute) => {
                out.push_str(&format!("{}- `{}`\n", indent, atom.raw));
                for (i, (subject, node)) in subjects.iter().zip(results).enumerate() {
                    let label = subject
                        .label()
                        .unwrap_or_else(|| format!("subject {}", i + 1));
                    out.push_str(&format!(
                        "{}  - {} {}\n",
                        indent,
                        checkbox(node.result.is_matched()),
                        label
                    ));
                }
            }
            _ => {
                // checked only when every subject of the batch matched
                let checked = !results.is_empty() && results.iter().all(|n| n.result.is_matched());
                out.push_str(&format!("{}- {} `{}`\n", indent, checkbox(checked), atom.raw));
            }
        },
        Condition::All(children) | Condition::Any(children) => {
            out.push_str(&format!("{}- `{}`\n", indent, condition.label()));
            for (i, child) in children.iter().enumerate() {
                let child_results: Vec<&NodeResult> =
                    results.iter().filter_map(|n| n.children.get(i)).collect();
                render_node(out, child, &child_results, depth + 1, queue);
            }
        }
    }
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[X]"
    } else {
        "[ ]"
    }
}
