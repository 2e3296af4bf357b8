//! Patch records describing how a variant departs from its base.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::{DiffResult, Modification};
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOperation {
    Add,
    Update,
    Remove,
}

/// Record family a patch applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchTarget {
    Element,
    Relation,
    Requirement,
}

/// One change of a variant relative to its base snapshot
///
/// `payload` is the full record for `add`/`remove` and the list of field
/// changes for `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPatch {
    pub operation: PatchOperation,
    pub element_type: PatchTarget,
    pub element_id: String,
    pub payload: Value,
}

fn push_family<T: Serialize>(
    patches: &mut Vec<ModelPatch>,
    target: PatchTarget,
    added: &[T],
    modified: &[Modification],
    removed: &[T],
    key: impl Fn(&T) -> String,
) -> Result<()> {
    for record in added {
        patches.push(ModelPatch {
            operation: PatchOperation::Add,
            element_type: target,
            element_id: key(record),
            payload: serde_json::to_value(record)?,
        });
    }
    for m in modified {
        patches.push(ModelPatch {
            operation: PatchOperation::Update,
            element_type: target,
            element_id: m.id.clone(),
            payload: serde_json::to_value(&m.changes)?,
        });
    }
    for record in removed {
        patches.push(ModelPatch {
            operation: PatchOperation::Remove,
            element_type: target,
            element_id: key(record),
            payload: serde_json::to_value(record)?,
        });
    }
    Ok(())
}

/// Flatten a diff into an ordered patch list
///
/// Order: elements, relations, requirements; within each family adds,
/// then updates, then removes, each sorted by id.
///
/// # Errors
///
/// Returns `Serialization` if a record cannot be encoded.
pub fn patches_from_diff(diff: &DiffResult) -> Result<Vec<ModelPatch>> {
    let mut patches = Vec::with_capacity(diff.summary().total());
    push_family(
        &mut patches,
        PatchTarget::Element,
        &diff.added_elements,
        &diff.modified_elements,
        &diff.removed_elements,
        |e| e.id.clone(),
    )?;
    push_family(
        &mut patches,
        PatchTarget::Relation,
        &diff.added_relations,
        &diff.modified_relations,
        &diff.removed_relations,
        |r| r.endpoint_key(),
    )?;
    push_family(
        &mut patches,
        PatchTarget::Requirement,
        &diff.added_requirements,
        &diff.modified_requirements,
        &diff.removed_requirements,
        |r| r.id.clone(),
    )?;
    Ok(patches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_models;
    use crate::model::{Element, ElementType, Model, Relation, RelationType};

    #[test]
    fn test_patch_order_and_payloads() {
        let mut base = Model::new("T");
        base.architecture.elements = vec![
            Element::new(ElementType::System, "A", "A"),
            Element::new(ElementType::System, "B", "B"),
        ];
        let mut variant = base.clone();
        variant.architecture.elements.remove(1);
        variant.architecture.elements[0].name = "Renamed".into();
        variant
            .architecture
            .elements
            .push(Element::new(ElementType::Queue, "C", "C"));
        variant
            .architecture
            .relations
            .push(Relation::new("A", "C", RelationType::Publishes));

        let patches = patches_from_diff(&diff_models(&base, &variant)).unwrap();
        let summary: Vec<(PatchOperation, PatchTarget, &str)> = patches
            .iter()
            .map(|p| (p.operation, p.element_type, p.element_id.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (PatchOperation::Add, PatchTarget::Element, "C"),
                (PatchOperation::Update, PatchTarget::Element, "A"),
                (PatchOperation::Remove, PatchTarget::Element, "B"),
                (PatchOperation::Add, PatchTarget::Relation, "A->C"),
            ]
        );
        assert_eq!(patches[0].payload["type"], "queue");
        assert_eq!(patches[1].payload[0]["field"], "name");
    }

    #[test]
    fn test_wire_names() {
        let patch = ModelPatch {
            operation: PatchOperation::Remove,
            element_type: PatchTarget::Relation,
            element_id: "A->B".into(),
            payload: Value::Null,
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["operation"], "remove");
        assert_eq!(json["elementType"], "relation");
        assert_eq!(json["elementId"], "A->B");
    }
}
