use std::sync::Arc;

use sruja_core::model::{Element, ElementType, Model, Relation, RelationType};
use sruja_core::{ArchitectureStore, SnapshotManager, VariantManager};

/// Main store plus the snapshot and variant registries wired to it
#[allow(dead_code)]
pub struct Workspace {
    pub store: Arc<ArchitectureStore>,
    pub snapshots: Arc<SnapshotManager>,
    pub variants: VariantManager,
}

#[allow(dead_code)]
pub fn workspace() -> Workspace {
    let store = Arc::new(ArchitectureStore::new());
    let snapshots = Arc::new(SnapshotManager::new(Arc::clone(&store)));
    let variants = VariantManager::new(Arc::clone(&store), Arc::clone(&snapshots));
    Workspace {
        store,
        snapshots,
        variants,
    }
}

/// A system element with the given id and description
#[allow(dead_code)]
pub fn system(id: &str, description: &str) -> Element {
    Element::new(ElementType::System, id, id).with_description(description)
}

/// A partial model holding only `elements`
#[allow(dead_code)]
pub fn partial(elements: Vec<Element>) -> Model {
    let mut model = Model::new("");
    model.architecture.elements = elements;
    model
}

#[allow(dead_code)]
pub fn partial_relations(relations: Vec<Relation>) -> Model {
    let mut model = Model::new("");
    model.architecture.relations = relations;
    model
}

#[allow(dead_code)]
pub fn uses(from: &str, to: &str) -> Relation {
    Relation::new(from, to, RelationType::Uses)
}

/// Sorted element ids of a model
#[allow(dead_code)]
pub fn element_ids(model: &Model) -> Vec<String> {
    let mut ids: Vec<String> = model.elements().iter().map(|e| e.id.clone()).collect();
    ids.sort();
    ids
}
