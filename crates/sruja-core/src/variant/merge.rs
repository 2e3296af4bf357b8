//! Three-way merge of a variant into the current model.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::diff::engine::index;
use crate::diff::{field_changes, Conflict, ConflictKind, DiffResult, Diffable};
use crate::model::{Model, ModelRecord, RelationKey};

/// Outcome of a merge attempt
///
/// `success == false` means conflicts were found and nothing was applied;
/// `merged_model` then shows what the non-conflicted part would look like.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub success: bool,
    pub merged_model: Model,
    pub conflicts: Vec<Conflict>,
    pub explanation: String,
    /// Base → variant
    pub variant_diff: DiffResult,
    /// Base → current
    pub current_diff: DiffResult,
    /// Store version after the merge (unchanged when not applied)
    pub store_version: u64,
}

/// Merge one record family, starting from `current`
///
/// For each non-conflicted variant record:
/// - unchanged from base: keep current's version
/// - changed from base: copy the changed fields onto current's version
/// - in base but gone from current: restore the variant's version only if
///   the variant changed it, otherwise the deletion stands
/// - not in base: add it, replacing a same-key record in current
fn merge_family<T: Diffable>(
    base: &[T],
    variant: &[T],
    current: &[T],
    conflicted: &BTreeSet<String>,
) -> Vec<T> {
    let base_idx = index(base);
    let mut merged = current.to_vec();

    for (key, v) in index(variant) {
        if conflicted.contains(&key) {
            continue;
        }
        let slot = merged.iter().rposition(|r| r.diff_key() == key);
        match (base_idx.get(&key), slot) {
            (Some(b), Some(pos)) => {
                for change in field_changes(*b, v) {
                    merged[pos].copy_field(&change.field, v);
                }
            }
            (Some(b), None) => {
                if !field_changes(*b, v).is_empty() {
                    merged.push(v.clone());
                }
            }
            (None, None) => merged.push(v.clone()),
            (None, Some(pos)) => merged[pos] = v.clone(),
        }
    }
    merged
}

/// Add variant records that neither base nor current know about
fn merge_new_records<T: ModelRecord + Clone>(base: &[T], variant: &[T], current: &[T]) -> Vec<T> {
    let known: HashSet<String> = base
        .iter()
        .chain(current.iter())
        .map(ModelRecord::record_key)
        .collect();
    let mut merged = current.to_vec();
    merged.extend(
        variant
            .iter()
            .filter(|r| !known.contains(&r.record_key()))
            .cloned(),
    );
    merged
}

fn conflicted_ids(conflicts: &[Conflict], kind: ConflictKind) -> BTreeSet<String> {
    conflicts
        .iter()
        .filter(|c| c.kind == kind)
        .map(|c| c.id.clone())
        .collect()
}

/// Compute the merged model
///
/// Returns the merged model plus the store keys of current relations that
/// the merge replaced (a relation whose type changed keeps its endpoints but
/// gets a new store key). A current relation whose exact key the variant
/// still holds is never replaced. Conflicted ids keep current's value.
pub fn three_way_merge(
    base: &Model,
    variant: &Model,
    current: &Model,
    conflicts: &[Conflict],
) -> (Model, Vec<RelationKey>) {
    let mut merged = current.clone();
    let (b, v, c) = (
        &base.architecture,
        &variant.architecture,
        &current.architecture,
    );
    let m = &mut merged.architecture;

    m.elements = merge_family(
        &b.elements,
        &v.elements,
        &c.elements,
        &conflicted_ids(conflicts, ConflictKind::Element),
    );
    m.relations = merge_family(
        &b.relations,
        &v.relations,
        &c.relations,
        &conflicted_ids(conflicts, ConflictKind::Relation),
    );
    m.requirements = merge_family(
        &b.requirements,
        &v.requirements,
        &c.requirements,
        &conflicted_ids(conflicts, ConflictKind::Requirement),
    );
    m.adrs = merge_new_records(&b.adrs, &v.adrs, &c.adrs);
    m.journeys = merge_new_records(&b.journeys, &v.journeys, &c.journeys);

    let kept: HashSet<RelationKey> = m.relations.iter().map(|r| r.key()).collect();
    let held: HashSet<RelationKey> = v.relations.iter().map(|r| r.key()).collect();
    let mut superseded = Vec::new();
    for rel in &c.relations {
        let key = rel.key();
        if kept.contains(&key) {
            continue;
        }
        if held.contains(&key) {
            // Same endpoints, another type indexed over it
            m.relations.push(rel.clone());
        } else {
            superseded.push(key);
        }
    }

    (merged, superseded)
}
