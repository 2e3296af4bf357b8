//! Human-readable renderers for diffs and merge outcomes.

use crate::diff::model::{Conflict, DiffResult, FieldChange, Modification};

fn push_ids(out: &mut String, label: &str, ids: &[String]) {
    if !ids.is_empty() {
        out.push_str(&format!("- **{}** ({}): {}\n", label, ids.len(), ids.join(", ")));
    }
}

fn render_change(change: &FieldChange) -> String {
    format!("`{}`: {} → {}", change.field, change.old, change.new)
}

fn push_modified(out: &mut String, modified: &[Modification]) {
    for m in modified {
        let changes: Vec<String> = m.changes.iter().map(render_change).collect();
        out.push_str(&format!("- `{}` {}\n", m.id, changes.join("; ")));
    }
}

/// Render a Markdown summary of a [`DiffResult`].
///
/// Informational only; sections with no changes are omitted.
pub fn render_diff_summary(diff: &DiffResult) -> String {
    let mut out = String::from("## Model Diff\n\n");
    let summary = diff.summary();
    out.push_str(&format!(
        "**Added**: {}  \n**Removed**: {}  \n**Modified**: {}\n\n",
        summary.added, summary.removed, summary.modified
    ));

    if diff.is_empty() {
        out.push_str("_No structural changes detected._\n");
        return out;
    }

    let has_elements = !diff.added_elements.is_empty()
        || !diff.removed_elements.is_empty()
        || !diff.modified_elements.is_empty();
    if has_elements {
        out.push_str("### Elements\n\n");
        let added: Vec<String> = diff.added_elements.iter().map(|e| e.id.clone()).collect();
        let removed: Vec<String> = diff.removed_elements.iter().map(|e| e.id.clone()).collect();
        push_ids(&mut out, "Added", &added);
        push_ids(&mut out, "Removed", &removed);
        push_modified(&mut out, &diff.modified_elements);
        out.push('\n');
    }

    let has_relations = !diff.added_relations.is_empty()
        || !diff.removed_relations.is_empty()
        || !diff.modified_relations.is_empty();
    if has_relations {
        out.push_str("### Relations\n\n");
        let added: Vec<String> = diff.added_relations.iter().map(|r| r.endpoint_key()).collect();
        let removed: Vec<String> = diff
            .removed_relations
            .iter()
            .map(|r| r.endpoint_key())
            .collect();
        push_ids(&mut out, "Added", &added);
        push_ids(&mut out, "Removed", &removed);
        push_modified(&mut out, &diff.modified_relations);
        out.push('\n');
    }

    let has_requirements = !diff.added_requirements.is_empty()
        || !diff.removed_requirements.is_empty()
        || !diff.modified_requirements.is_empty();
    if has_requirements {
        out.push_str("### Requirements\n\n");
        let added: Vec<String> = diff.added_requirements.iter().map(|r| r.id.clone()).collect();
        let removed: Vec<String> = diff
            .removed_requirements
            .iter()
            .map(|r| r.id.clone())
            .collect();
        push_ids(&mut out, "Added", &added);
        push_ids(&mut out, "Removed", &removed);
        push_modified(&mut out, &diff.modified_requirements);
        out.push('\n');
    }

    out
}

/// Plain-text explanation of a three-way merge attempt.
///
/// Summarises added/removed/modified counts on each side, then either
/// confirms the merge or lists the conflicts that blocked it.
pub fn render_merge_explanation(
    variant_diff: &DiffResult,
    current_diff: &DiffResult,
    conflicts: &[Conflict],
) -> String {
    let v = variant_diff.summary();
    let c = current_diff.summary();
    let mut out = format!(
        "Variant changes since base: {} added, {} removed, {} modified.\n\
         Current changes since base: {} added, {} removed, {} modified.\n",
        v.added, v.removed, v.modified, c.added, c.removed, c.modified
    );

    if conflicts.is_empty() {
        out.push_str("No conflicts; variant changes merged into the current model.\n");
    } else {
        out.push_str(&format!(
            "{} conflict(s); nothing was applied:\n",
            conflicts.len()
        ));
        for conflict in conflicts {
            out.push_str(&format!("  - {}\n", conflict.description));
        }
    }
    out
}
