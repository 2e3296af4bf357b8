//! Three-way conflict detection.

use serde_json::Value;

use crate::diff::engine::{index, Diffable};
use crate::diff::model::{Conflict, ConflictKind};
use crate::model::Model;

fn describe(kind: ConflictKind, id: &str, field: &str, base: &Value, variant: &Value, current: &Value) -> String {
    format!(
        "{} '{}' field '{}' changed to {} in the variant and to {} in the current model (base {})",
        kind.as_str(),
        id,
        field,
        variant,
        current,
        base
    )
}

fn detect<T: Diffable>(kind: ConflictKind, base: &[T], variant: &[T], current: &[T]) -> Vec<Conflict> {
    let variant_idx = index(variant);
    let current_idx = index(current);
    let mut conflicts = Vec::new();

    for (id, b) in index(base) {
        let (Some(v), Some(c)) = (variant_idx.get(&id), current_idx.get(&id)) else {
            continue;
        };
        let fields = b.fields().into_iter().zip(v.fields()).zip(c.fields());
        for (((field, bv), (_, vv)), (_, cv)) in fields {
            if vv != bv && cv != bv && vv != cv {
                conflicts.push(Conflict {
                    kind,
                    id: id.clone(),
                    field: field.to_string(),
                    description: describe(kind, &id, field, &bv, &vv, &cv),
                    base: bv,
                    variant: vv,
                    current: cv,
                });
            }
        }
    }
    conflicts
}

/// Find fields that `variant` and `current` both changed from `base`, to
/// different values.
///
/// Only records present in all three models are considered. A change on one
/// side only, or the same change on both sides, is not a conflict.
pub fn detect_conflicts(base: &Model, variant: &Model, current: &Model) -> Vec<Conflict> {
    let mut conflicts = detect(
        ConflictKind::Element,
        base.elements(),
        variant.elements(),
        current.elements(),
    );
    conflicts.extend(detect(
        ConflictKind::Relation,
        base.relations(),
        variant.relations(),
        current.relations(),
    ));
    conflicts.extend(detect(
        ConflictKind::Requirement,
        &base.architecture.requirements,
        &variant.architecture.requirements,
        &current.architecture.requirements,
    ));
    conflicts
}
