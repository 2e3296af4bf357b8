//! Variants: independently evolving working copies seeded from a snapshot.
//!
//! Each variant owns a private [`ArchitectureStore`], so edits to it never
//! reach the main store until the variant is applied or merged.

pub mod manager;
pub mod merge;
pub mod patch;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::errors::Result;
use crate::model::Model;
use crate::store::ArchitectureStore;

pub use manager::VariantManager;
pub use merge::{three_way_merge, MergeResult};
pub use patch::{patches_from_diff, ModelPatch, PatchOperation, PatchTarget};

/// A named working copy of the architecture
///
/// Cloning a `Variant` shares its live store.
#[derive(Debug, Clone)]
pub struct Variant {
    pub id: String,
    pub name: String,
    /// Name of the snapshot the variant was seeded from
    pub base: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Patch log from the last `compute_variant_diff`
    pub patches: Vec<ModelPatch>,
    base_ir: String,
    store: Arc<ArchitectureStore>,
}

impl Variant {
    pub(crate) fn new(
        id: String,
        name: String,
        base: String,
        description: String,
        base_ir: String,
        store: Arc<ArchitectureStore>,
    ) -> Self {
        Self {
            id,
            name,
            base,
            description,
            created_at: Utc::now(),
            patches: Vec::new(),
            base_ir,
            store,
        }
    }

    /// The variant's private store
    pub fn store(&self) -> &Arc<ArchitectureStore> {
        &self.store
    }

    /// Copy of the variant's current model
    pub fn model(&self) -> Model {
        self.store.get_model()
    }

    /// The base model, decoded from the copy taken at creation
    ///
    /// # Errors
    ///
    /// Returns `InvalidIr` if the copy cannot be decoded.
    pub fn base_model(&self) -> Result<Model> {
        Model::from_json(&self.base_ir)
    }
}
