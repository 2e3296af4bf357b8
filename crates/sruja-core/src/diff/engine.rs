//! Structural diff computation.
//!
//! The entry point is [`diff_models`]. Records are joined by identity key
//! and compared field by field; the comparison is pure and deterministic.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::diff::model::{DiffResult, FieldChange, Modification};
use crate::model::{Element, Model, Relation, Requirement};

/// A record the diff engine can join and compare
pub trait Diffable: Clone {
    /// Join key across the two sides
    fn diff_key(&self) -> String;

    /// Comparable fields as `(name, value)` in a fixed order
    fn fields(&self) -> Vec<(&'static str, Value)>;

    /// Overwrite `field` with the value held by `other`
    fn copy_field(&mut self, field: &str, other: &Self);
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Tags compare as a set: order and duplicates are not significant
fn tag_set(tags: &[String]) -> Value {
    let set: BTreeSet<&str> = tags.iter().map(String::as_str).collect();
    Value::Array(set.into_iter().map(string).collect())
}

impl Diffable for Element {
    fn diff_key(&self) -> String {
        self.id.clone()
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("type", string(self.kind.as_str())),
            ("name", string(&self.name)),
            ("description", string(&self.description)),
            ("technology", string(&self.technology)),
            ("tags", tag_set(&self.tags)),
            ("metadata", self.metadata.to_value()),
        ]
    }

    fn copy_field(&mut self, field: &str, other: &Self) {
        match field {
            "type" => self.kind = other.kind,
            "name" => self.name = other.name.clone(),
            "description" => self.description = other.description.clone(),
            "technology" => self.technology = other.technology.clone(),
            "tags" => self.tags = other.tags.clone(),
            "metadata" => self.metadata = other.metadata.clone(),
            _ => {}
        }
    }
}

/// Relations join on `from->to`: a type change on the same endpoints is a
/// modification rather than an add plus a remove.
impl Diffable for Relation {
    fn diff_key(&self) -> String {
        self.endpoint_key()
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("type", string(self.kind.as_str())),
            ("description", string(&self.description)),
        ]
    }

    fn copy_field(&mut self, field: &str, other: &Self) {
        match field {
            "type" => self.kind = other.kind,
            "description" => self.description = other.description.clone(),
            _ => {}
        }
    }
}

impl Diffable for Requirement {
    fn diff_key(&self) -> String {
        self.id.clone()
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("type", string(&self.kind)),
            ("description", string(&self.description)),
            ("tags", tag_set(&self.tags)),
        ]
    }

    fn copy_field(&mut self, field: &str, other: &Self) {
        match field {
            "type" => self.kind = other.kind.clone(),
            "description" => self.description = other.description.clone(),
            "tags" => self.tags = other.tags.clone(),
            _ => {}
        }
    }
}

/// Index records by join key; a later record with the same key wins
pub(crate) fn index<T: Diffable>(records: &[T]) -> BTreeMap<String, &T> {
    records.iter().map(|r| (r.diff_key(), r)).collect()
}

/// Fields whose values differ between `old` and `new`
pub fn field_changes<T: Diffable>(old: &T, new: &T) -> Vec<FieldChange> {
    old.fields()
        .into_iter()
        .zip(new.fields())
        .filter(|((_, a), (_, b))| a != b)
        .map(|((field, a), (_, b))| FieldChange {
            field: field.to_string(),
            old: a,
            new: b,
        })
        .collect()
}

/// Compute `(added, removed, modified)` for one record family
fn diff_records<T: Diffable>(left: &[T], right: &[T]) -> (Vec<T>, Vec<T>, Vec<Modification>) {
    let left_idx = index(left);
    let right_idx = index(right);

    let added = right_idx
        .iter()
        .filter(|(k, _)| !left_idx.contains_key(*k))
        .map(|(_, r)| (*r).clone())
        .collect();
    let removed = left_idx
        .iter()
        .filter(|(k, _)| !right_idx.contains_key(*k))
        .map(|(_, r)| (*r).clone())
        .collect();
    let modified = left_idx
        .iter()
        .filter_map(|(k, old)| {
            let new = right_idx.get(k)?;
            let changes = field_changes(*old, *new);
            (!changes.is_empty()).then(|| Modification {
                id: k.clone(),
                changes,
            })
        })
        .collect();

    (added, removed, modified)
}

/// Compute the structural diff from `base` to `other`.
///
/// Anything only in `other` is added, anything only in `base` is removed,
/// and records on both sides with differing fields are modified.
pub fn diff_models(base: &Model, other: &Model) -> DiffResult {
    let (added_elements, removed_elements, modified_elements) =
        diff_records(base.elements(), other.elements());
    let (added_relations, removed_relations, modified_relations) =
        diff_records(base.relations(), other.relations());
    let (added_requirements, removed_requirements, modified_requirements) = diff_records(
        &base.architecture.requirements,
        &other.architecture.requirements,
    );

    DiffResult {
        added_elements,
        removed_elements,
        modified_elements,
        added_relations,
        removed_relations,
        modified_relations,
        added_requirements,
        removed_requirements,
        modified_requirements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementType, RelationType};
    use serde_json::json;

    fn model(elements: Vec<Element>, relations: Vec<Relation>) -> Model {
        let mut m = Model::new("T");
        m.architecture.elements = elements;
        m.architecture.relations = relations;
        m
    }

    fn el(id: &str) -> Element {
        Element::new(ElementType::System, id, id)
    }

    #[test]
    fn test_identical_models_have_empty_diff() {
        let a = model(vec![el("A")], vec![Relation::new("A", "B", RelationType::Uses)]);
        assert!(diff_models(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_added_and_removed_are_sorted_by_id() {
        let a = model(vec![el("A"), el("B")], vec![]);
        let b = model(vec![el("D"), el("A"), el("C")], vec![]);
        let diff = diff_models(&a, &b);
        assert_eq!(diff.added_element_ids(), vec!["C", "D"]);
        assert_eq!(diff.removed_element_ids(), vec!["B"]);
    }

    #[test]
    fn test_modified_carries_old_and_new() {
        let a = model(vec![el("A").with_description("old")], vec![]);
        let b = model(vec![el("A").with_description("new")], vec![]);
        let diff = diff_models(&a, &b);
        let change = diff.modified_element("A").unwrap().change("description").unwrap();
        assert_eq!(change.old, json!("old"));
        assert_eq!(change.new, json!("new"));
    }

    #[test]
    fn test_tag_order_is_not_a_change() {
        let a = model(vec![el("A").with_tags(["x", "y"])], vec![]);
        let b = model(vec![el("A").with_tags(["y", "x", "x"])], vec![]);
        assert!(diff_models(&a, &b).is_empty());
    }

    #[test]
    fn test_metadata_change_is_detected() {
        let mut changed = el("A");
        changed.metadata.set("owner", json!("team-b"));
        let diff = diff_models(&model(vec![el("A")], vec![]), &model(vec![changed], vec![]));
        assert!(diff.modified_element("A").unwrap().change("metadata").is_some());
    }

    #[test]
    fn test_relation_type_change_is_a_modification() {
        let a = model(vec![], vec![Relation::new("A", "B", RelationType::Uses)]);
        let b = model(vec![], vec![Relation::new("A", "B", RelationType::Reads)]);
        let diff = diff_models(&a, &b);
        assert!(diff.added_relations.is_empty());
        assert!(diff.removed_relations.is_empty());
        assert_eq!(diff.modified_relations.len(), 1);
        assert_eq!(diff.modified_relations[0].id, "A->B");
        assert_eq!(diff.modified_relations[0].changes[0].field, "type");
    }

    #[test]
    fn test_requirements_are_diffed() {
        let mut a = Model::new("T");
        a.architecture.requirements.push(Requirement::new("R1", "fast"));
        let mut b = Model::new("T");
        b.architecture.requirements.push(Requirement::new("R1", "faster"));
        b.architecture.requirements.push(Requirement::new("R2", "secure"));
        let diff = diff_models(&a, &b);
        assert_eq!(diff.added_requirements.len(), 1);
        assert_eq!(diff.modified_requirements[0].id, "R1");
    }

    #[test]
    fn test_copy_field_moves_a_single_field() {
        let mut target = el("A").with_description("mine").with_technology("Go");
        let source = el("A").with_description("theirs").with_technology("Rust");
        target.copy_field("technology", &source);
        assert_eq!(target.technology, "Rust");
        assert_eq!(target.description, "mine");
    }
}
