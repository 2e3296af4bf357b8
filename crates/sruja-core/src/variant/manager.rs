use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::merge::{three_way_merge, MergeResult};
use super::patch::{patches_from_diff, ModelPatch};
use super::Variant;
use crate::diff::{detect_conflicts, diff_models, render_merge_explanation};
use crate::errors::{KernelError, Result};
use crate::model::Model;
use crate::snapshot::SnapshotManager;
use crate::store::ArchitectureStore;
use crate::{log_op_end, log_op_error, log_op_start};

/// Registry of variants for one main store
///
/// Merge reads the variant, its base copy and the main store one after
/// another without a lock spanning all three; a concurrent writer to the
/// main store can make the result stale. Callers serialize per session.
#[derive(Debug)]
pub struct VariantManager {
    store: Arc<ArchitectureStore>,
    snapshots: Arc<SnapshotManager>,
    variants: RwLock<Vec<Variant>>,
}

impl VariantManager {
    pub fn new(store: Arc<ArchitectureStore>, snapshots: Arc<SnapshotManager>) -> Self {
        Self {
            store,
            snapshots,
            variants: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Variant>> {
        self.variants.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Variant>> {
        self.variants.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a variant seeded from snapshot `base`
    ///
    /// The variant keeps its own copy of the base IR.
    ///
    /// # Errors
    ///
    /// Returns `VariantAlreadyExists`, `BaseSnapshotMissing`, or `InvalidIr`
    /// if the snapshot no longer decodes.
    pub fn create_variant(&self, name: &str, base: &str, description: &str) -> Result<Variant> {
        log_op_start!("create_variant", variant = name, snapshot = base);
        let start = std::time::Instant::now();

        let result = self.create_variant_impl(name, base, description).map_err(|e| {
            log_op_error!(
                "create_variant",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                variant = name
            );
            e
        })?;

        log_op_end!(
            "create_variant",
            duration_ms = start.elapsed().as_millis() as u64,
            variant = name
        );
        Ok(result)
    }

    fn create_variant_impl(&self, name: &str, base: &str, description: &str) -> Result<Variant> {
        if name.trim().is_empty() {
            return Err(KernelError::InvalidCommand {
                message: "variant name must not be empty".to_string(),
            });
        }
        let snapshot = self.snapshots.get_snapshot(base).map_err(|_| {
            KernelError::BaseSnapshotMissing {
                variant: name.to_string(),
                snapshot: base.to_string(),
            }
        })?;
        let seed = snapshot.model()?;

        let mut variants = self.write();
        if variants.iter().any(|v| v.name == name) {
            return Err(KernelError::VariantAlreadyExists {
                name: name.to_string(),
            });
        }
        let variant = Variant::new(
            Uuid::now_v7().to_string(),
            name.to_string(),
            base.to_string(),
            description.to_string(),
            snapshot.ir,
            Arc::new(ArchitectureStore::from_model(seed)),
        );
        variants.push(variant.clone());
        Ok(variant)
    }

    /// # Errors
    ///
    /// Returns `VariantNotFound` for an unknown name.
    pub fn get_variant(&self, name: &str) -> Result<Variant> {
        self.read()
            .iter()
            .find(|v| v.name == name)
            .cloned()
            .ok_or_else(|| KernelError::VariantNotFound {
                name: name.to_string(),
            })
    }

    /// All variants in creation order
    pub fn list_variants(&self) -> Vec<Variant> {
        self.read().clone()
    }

    /// # Errors
    ///
    /// Returns `VariantNotFound` for an unknown name.
    pub fn delete_variant(&self, name: &str) -> Result<Variant> {
        let mut variants = self.write();
        let pos = variants
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| KernelError::VariantNotFound {
                name: name.to_string(),
            })?;
        Ok(variants.remove(pos))
    }

    /// Merge `partial` into the variant's private store
    ///
    /// # Errors
    ///
    /// Returns `VariantNotFound` for an unknown name.
    pub fn update_variant(&self, name: &str, partial: &Model) -> Result<u64> {
        let variant = self.get_variant(name)?;
        Ok(variant.store().update_model(partial))
    }

    /// Overwrite the main store with the variant's model
    ///
    /// Whatever the main store held is discarded; this is not a merge.
    ///
    /// # Errors
    ///
    /// Returns `VariantNotFound` for an unknown name.
    pub fn apply_variant(&self, name: &str) -> Result<u64> {
        log_op_start!("apply_variant", variant = name);
        let start = std::time::Instant::now();

        let variant = self.get_variant(name).map_err(|e| {
            log_op_error!(
                "apply_variant",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;
        let version = self.store.replace_model(variant.model());

        log_op_end!(
            "apply_variant",
            duration_ms = start.elapsed().as_millis() as u64,
            store_version = version
        );
        Ok(version)
    }

    /// Diff the variant against its base as an ordered patch list
    ///
    /// The patch list is also cached on the variant.
    ///
    /// # Errors
    ///
    /// Returns `VariantNotFound`, or `InvalidIr` / `Serialization` if the
    /// base copy or a record cannot be processed.
    pub fn compute_variant_diff(&self, name: &str) -> Result<Vec<ModelPatch>> {
        let variant = self.get_variant(name)?;
        let diff = diff_models(&variant.base_model()?, &variant.model());
        let patches = patches_from_diff(&diff)?;

        if let Some(slot) = self.write().iter_mut().find(|v| v.name == name) {
            slot.patches = patches.clone();
        }
        Ok(patches)
    }

    /// Three-way merge the variant into the main store
    ///
    /// With no conflicts the merged model is applied through the store's
    /// union merge. With conflicts nothing is applied and the result carries
    /// `success == false` and every conflict.
    ///
    /// # Errors
    ///
    /// Returns `VariantNotFound`, or `InvalidIr` if the base copy cannot be
    /// decoded. Conflicts are not errors.
    pub fn merge_variant(&self, name: &str) -> Result<MergeResult> {
        log_op_start!("merge_variant", variant = name);
        let start = std::time::Instant::now();

        let result = self.merge_variant_impl(name).map_err(|e| {
            log_op_error!(
                "merge_variant",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                variant = name
            );
            e
        })?;

        log_op_end!(
            "merge_variant",
            duration_ms = start.elapsed().as_millis() as u64,
            variant = name,
            conflicts = result.conflicts.len(),
            store_version = result.store_version
        );
        Ok(result)
    }

    fn merge_variant_impl(&self, name: &str) -> Result<MergeResult> {
        let variant = self.get_variant(name)?;
        let base = variant.base_model()?;
        let theirs = variant.model();
        let current = self.store.get_model();

        let conflicts = detect_conflicts(&base, &theirs, &current);
        let variant_diff = diff_models(&base, &theirs);
        let current_diff = diff_models(&base, &current);
        let (merged_model, superseded) = three_way_merge(&base, &theirs, &current, &conflicts);
        let explanation = render_merge_explanation(&variant_diff, &current_diff, &conflicts);

        let success = conflicts.is_empty();
        let store_version = if success {
            self.store.update_model_superseding(&merged_model, &superseded)
        } else {
            self.store.get_version()
        };

        Ok(MergeResult {
            success,
            merged_model,
            conflicts,
            explanation,
            variant_diff,
            current_diff,
            store_version,
        })
    }
}
