//! Diff output types.
//!
//! Collections are ordered by identity key so identical inputs serialize
//! identically.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Element, Relation, Requirement};

/// Old/new values for one changed field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// A record present on both sides with at least one differing field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Modification {
    /// Identity key: element/requirement id, or `from->to` for relations
    pub id: String,
    pub changes: Vec<FieldChange>,
}

impl Modification {
    pub fn change(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }
}

/// Structural difference between two models (left = base, right = other).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub added_elements: Vec<Element>,
    pub removed_elements: Vec<Element>,
    pub modified_elements: Vec<Modification>,
    pub added_relations: Vec<Relation>,
    pub removed_relations: Vec<Relation>,
    pub modified_relations: Vec<Modification>,
    pub added_requirements: Vec<Requirement>,
    pub removed_requirements: Vec<Requirement>,
    pub modified_requirements: Vec<Modification>,
}

/// Per-category change counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffSummary {
    pub fn total(&self) -> usize {
        self.added + self.removed + self.modified
    }
}

impl DiffResult {
    /// True when the two models are structurally identical
    pub fn is_empty(&self) -> bool {
        self.summary().total() == 0
    }

    /// Counts across elements, relations and requirements
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            added: self.added_elements.len()
                + self.added_relations.len()
                + self.added_requirements.len(),
            removed: self.removed_elements.len()
                + self.removed_relations.len()
                + self.removed_requirements.len(),
            modified: self.modified_elements.len()
                + self.modified_relations.len()
                + self.modified_requirements.len(),
        }
    }

    pub fn added_element_ids(&self) -> Vec<&str> {
        self.added_elements.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn removed_element_ids(&self) -> Vec<&str> {
        self.removed_elements.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn modified_element(&self, id: &str) -> Option<&Modification> {
        self.modified_elements.iter().find(|m| m.id == id)
    }
}

/// Which record family a conflict belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Element,
    Relation,
    Requirement,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Element => "element",
            ConflictKind::Relation => "relation",
            ConflictKind::Requirement => "requirement",
        }
    }
}

/// A field that the variant and the current model both changed, differently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub id: String,
    pub field: String,
    pub base: Value,
    pub variant: Value,
    pub current: Value,
    pub description: String,
}
