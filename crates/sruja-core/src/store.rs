//! Architecture Store: the single source of truth for the current model
//!
//! Writers merge partial models keyed by record identity (last write wins)
//! and retract a cell's contributions by source file. Every read hands out
//! an owned copy, so callers never alias the held model.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::errors::Result;
use crate::model::{Element, Model, ModelRecord, RelationKey};
use crate::{log_op_end, log_op_error, log_op_start};

const DEFAULT_ARCHITECTURE_NAME: &str = "Architecture";

#[derive(Debug)]
struct StoreState {
    model: Model,
    version: u64,
}

impl StoreState {
    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

/// Thread-safe holder of the current [`Model`] and its version counter
///
/// The version increases on every call that changes the model, which makes
/// it usable as a cache-invalidation and optimistic-concurrency signal.
#[derive(Debug)]
pub struct ArchitectureStore {
    default_name: String,
    state: RwLock<StoreState>,
}

impl Default for ArchitectureStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Union-merge `incoming` into `existing` by record key
///
/// A colliding record is replaced in place so the declaration order of
/// untouched records is stable; new records are appended.
fn merge_records<T: ModelRecord + Clone>(existing: &mut Vec<T>, incoming: &[T]) {
    for record in incoming {
        let key = record.record_key();
        match existing.iter_mut().find(|r| r.record_key() == key) {
            Some(slot) => *slot = record.clone(),
            None => existing.push(record.clone()),
        }
    }
}

fn retract_records<T: ModelRecord>(records: &mut Vec<T>, cell_id: &str) -> usize {
    let before = records.len();
    records.retain(|r| !r.contributed_by(cell_id));
    before - records.len()
}

impl ArchitectureStore {
    /// Create a store holding an empty model named `Architecture`
    pub fn new() -> Self {
        Self::with_name(DEFAULT_ARCHITECTURE_NAME)
    }

    /// Create a store whose empty model carries `name`
    pub fn with_name(name: impl Into<String>) -> Self {
        let default_name = name.into();
        Self {
            state: RwLock::new(StoreState {
                model: Model::new(default_name.clone()),
                version: 0,
            }),
            default_name,
        }
    }

    /// Create a store seeded with `model` (version 0)
    pub fn from_model(model: Model) -> Self {
        Self {
            default_name: model.architecture.name.clone(),
            state: RwLock::new(StoreState { model, version: 0 }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Owned deep copy of the current model
    pub fn get_model(&self) -> Model {
        self.read().model.clone()
    }

    pub fn get_version(&self) -> u64 {
        self.read().version
    }

    /// Copy of a single element
    pub fn element(&self, id: &str) -> Option<Element> {
        self.read().model.element(id).cloned()
    }

    pub fn relation_count(&self) -> usize {
        self.read().model.relations().len()
    }

    /// Union-merge a partial model into the store
    ///
    /// Elements, relations, requirements, ADRs and journeys are combined by
    /// identity key; on collision the incoming record wins. A non-empty
    /// incoming architecture name renames the architecture.
    pub fn update_model(&self, partial: &Model) -> u64 {
        self.update_model_superseding(partial, &[])
    }

    /// Union-merge `partial` after dropping the relations in `superseded`
    ///
    /// Used when a relation changed type on the same endpoint pair: the old
    /// `(from, to, type)` record must go in the same write that adds the new
    /// one.
    pub fn update_model_superseding(&self, partial: &Model, superseded: &[RelationKey]) -> u64 {
        log_op_start!(
            "store_update_model",
            elements = partial.elements().len(),
            relations = partial.relations().len()
        );
        let start = std::time::Instant::now();

        let mut state = self.write();
        let target = &mut state.model.architecture;
        let incoming = &partial.architecture;

        if !superseded.is_empty() {
            let drop: HashSet<&RelationKey> = superseded.iter().collect();
            target.relations.retain(|r| !drop.contains(&r.key()));
        }
        if !incoming.name.is_empty() {
            target.name = incoming.name.clone();
        }
        merge_records(&mut target.elements, &incoming.elements);
        merge_records(&mut target.relations, &incoming.relations);
        merge_records(&mut target.requirements, &incoming.requirements);
        merge_records(&mut target.adrs, &incoming.adrs);
        merge_records(&mut target.journeys, &incoming.journeys);
        state.model.generated_at = Utc::now();
        let version = state.bump();

        log_op_end!(
            "store_update_model",
            duration_ms = start.elapsed().as_millis() as u64,
            store_version = version
        );
        version
    }

    /// Retract every record whose source file is `cell_id`
    ///
    /// Returns the number of records removed. The version only moves when
    /// something was actually removed.
    pub fn remove_elements_by_cell(&self, cell_id: &str) -> usize {
        let mut state = self.write();
        let a = &mut state.model.architecture;
        let removed = retract_records(&mut a.elements, cell_id)
            + retract_records(&mut a.relations, cell_id)
            + retract_records(&mut a.requirements, cell_id)
            + retract_records(&mut a.adrs, cell_id)
            + retract_records(&mut a.journeys, cell_id);
        if removed > 0 {
            let version = state.bump();
            tracing::debug!(cell_id, removed, store_version = version, "retracted cell");
        }
        removed
    }

    /// Replace the held model wholesale
    pub fn replace_model(&self, model: Model) -> u64 {
        let mut state = self.write();
        state.model = model;
        state.bump()
    }

    /// Serialize the current model to the IR JSON document
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the model cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        let mut model = self.get_model();
        model.generated_at = Utc::now();
        model.to_json()
    }

    /// Replace the held model with a decoded IR document (not a merge)
    ///
    /// # Errors
    ///
    /// Returns `InvalidIr` when `json` is not a valid IR document; the store
    /// is left untouched.
    pub fn from_json(&self, json: &str) -> Result<u64> {
        log_op_start!("store_from_json", bytes = json.len());
        let start = std::time::Instant::now();

        let model = Model::from_json(json).map_err(|e| {
            log_op_error!(
                "store_from_json",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;
        let version = self.replace_model(model);

        log_op_end!(
            "store_from_json",
            duration_ms = start.elapsed().as_millis() as u64,
            store_version = version
        );
        Ok(version)
    }

    /// Clear the model back to an empty architecture
    ///
    /// Snapshots and variants live in their own managers and are untouched.
    pub fn reset(&self) -> u64 {
        let mut state = self.write();
        state.model = Model::new(self.default_name.clone());
        state.bump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementType, Relation, RelationType, Requirement};

    fn partial(cell: &str, elements: &[&str]) -> Model {
        let mut model = Model::new("");
        model.architecture.elements = elements
            .iter()
            .map(|id| Element::new(ElementType::System, *id, *id).with_source(cell, 1, 1))
            .collect();
        model
    }

    #[test]
    fn test_new_store_is_empty_at_version_zero() {
        let store = ArchitectureStore::new();
        assert!(store.get_model().is_empty());
        assert_eq!(store.get_version(), 0);
        assert_eq!(store.get_model().architecture.name, "Architecture");
    }

    #[test]
    fn test_update_overwrites_on_key_collision() {
        let store = ArchitectureStore::new();
        store.update_model(&partial("c1", &["A", "B"]));

        let mut edit = partial("c2", &["A"]);
        edit.architecture.elements[0].description = "edited".into();
        store.update_model(&edit);

        let model = store.get_model();
        assert_eq!(model.elements().len(), 2);
        assert_eq!(model.elements()[0].id, "A");
        assert_eq!(model.elements()[0].description, "edited");
        assert_eq!(store.get_version(), 2);
    }

    #[test]
    fn test_empty_partial_name_keeps_architecture_name() {
        let store = ArchitectureStore::with_name("Shop");
        store.update_model(&partial("c1", &["A"]));
        assert_eq!(store.get_model().architecture.name, "Shop");

        store.update_model(&Model::new("Renamed"));
        assert_eq!(store.get_model().architecture.name, "Renamed");
    }

    #[test]
    fn test_get_model_is_an_independent_copy() {
        let store = ArchitectureStore::new();
        store.update_model(&partial("c1", &["A"]));

        let mut copy = store.get_model();
        copy.architecture.elements[0].name = "mutated".into();

        assert_eq!(store.element("A").unwrap().name, "A");
    }

    #[test]
    fn test_retraction_covers_all_record_kinds() {
        let store = ArchitectureStore::new();
        let mut model = partial("c1", &["A"]);
        model
            .architecture
            .relations
            .push(Relation::new("A", "B", RelationType::Uses).with_source("c1", 2, 1));
        let mut req = Requirement::new("R1", "fast");
        req.stamp_source_file("c1");
        model.architecture.requirements.push(req);
        store.update_model(&model);
        store.update_model(&partial("c2", &["B"]));

        assert_eq!(store.remove_elements_by_cell("c1"), 3);
        let model = store.get_model();
        assert_eq!(model.elements().len(), 1);
        assert_eq!(model.elements()[0].id, "B");
        assert!(model.relations().is_empty());
        assert!(model.architecture.requirements.is_empty());
    }

    #[test]
    fn test_noop_retraction_keeps_version() {
        let store = ArchitectureStore::new();
        store.update_model(&partial("c1", &["A"]));
        let version = store.get_version();

        assert_eq!(store.remove_elements_by_cell("unknown"), 0);
        assert_eq!(store.get_version(), version);
    }

    #[test]
    fn test_superseded_relation_is_dropped() {
        let store = ArchitectureStore::new();
        let mut model = Model::new("");
        model
            .architecture
            .relations
            .push(Relation::new("A", "B", RelationType::Uses));
        store.update_model(&model);

        let old_key = model.relations()[0].key();
        let mut next = Model::new("");
        next.architecture
            .relations
            .push(Relation::new("A", "B", RelationType::Reads));
        store.update_model_superseding(&next, &[old_key]);

        let relations = store.get_model().architecture.relations;
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].kind, RelationType::Reads);
    }

    #[test]
    fn test_from_json_replaces_and_bad_json_leaves_store_intact() {
        let store = ArchitectureStore::new();
        store.update_model(&partial("c1", &["A"]));
        let json = store.to_json().unwrap();

        store.update_model(&partial("c1", &["B"]));
        store.from_json(&json).unwrap();
        let ids: Vec<String> = store.get_model().elements().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["A".to_string()]);

        let version = store.get_version();
        assert!(store.from_json("{not json").is_err());
        assert_eq!(store.get_version(), version);
        assert!(store.element("A").is_some());
    }

    #[test]
    fn test_reset_clears_model_and_bumps_version() {
        let store = ArchitectureStore::with_name("Shop");
        store.update_model(&partial("c1", &["A"]));
        let version = store.get_version();

        store.reset();
        assert!(store.get_model().is_empty());
        assert_eq!(store.get_model().architecture.name, "Shop");
        assert!(store.get_version() > version);
    }
}
