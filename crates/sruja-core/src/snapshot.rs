//! Named, immutable point-in-time captures of the Architecture Store.
//!
//! ## Responsibilities
//!
//! - Capture the store's IR document and version under a unique name
//! - Restore a capture by replacing the store's model wholesale
//!
//! ## Non-Responsibilities
//!
//! - Reference counting from variants (a variant keeps its own copy of the
//!   base IR, so deleting a snapshot never invalidates it)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::errors::{KernelError, Result};
use crate::model::Model;
use crate::store::ArchitectureStore;
use crate::{log_op_end, log_op_error, log_op_start};

/// An immutable capture of the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// IR JSON document at capture time
    pub ir: String,
    /// Store version at capture time
    pub store_version: u64,
}

impl Snapshot {
    /// Decode the captured IR
    ///
    /// # Errors
    ///
    /// Returns `InvalidIr` if the stored document cannot be decoded.
    pub fn model(&self) -> Result<Model> {
        Model::from_json(&self.ir)
    }
}

/// Registry of snapshots taken from one store
///
/// Snapshots are kept in creation order and survive a store reset.
#[derive(Debug)]
pub struct SnapshotManager {
    store: Arc<ArchitectureStore>,
    snapshots: RwLock<Vec<Snapshot>>,
}

impl SnapshotManager {
    pub fn new(store: Arc<ArchitectureStore>) -> Self {
        Self {
            store,
            snapshots: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Snapshot>> {
        self.snapshots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Snapshot>> {
        self.snapshots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capture the store's current model under `name`
    ///
    /// # Errors
    ///
    /// Returns `SnapshotAlreadyExists` if `name` is taken, or
    /// `InvalidCommand` if it is blank.
    pub fn create_snapshot(&self, name: &str, description: &str) -> Result<Snapshot> {
        log_op_start!("create_snapshot", snapshot = name);
        let start = std::time::Instant::now();

        let result = self.create_snapshot_impl(name, description).map_err(|e| {
            log_op_error!(
                "create_snapshot",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                snapshot = name
            );
            e
        })?;

        log_op_end!(
            "create_snapshot",
            duration_ms = start.elapsed().as_millis() as u64,
            snapshot = name,
            store_version = result.store_version
        );
        Ok(result)
    }

    fn create_snapshot_impl(&self, name: &str, description: &str) -> Result<Snapshot> {
        if name.trim().is_empty() {
            return Err(KernelError::InvalidCommand {
                message: "snapshot name must not be empty".to_string(),
            });
        }

        // Version first: a write landing between the two reads makes the
        // recorded version conservative rather than ahead of the IR.
        let store_version = self.store.get_version();
        let ir = self.store.to_json()?;

        let mut snapshots = self.write();
        if snapshots.iter().any(|s| s.name == name) {
            return Err(KernelError::SnapshotAlreadyExists {
                name: name.to_string(),
            });
        }
        let snapshot = Snapshot {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            timestamp: Utc::now(),
            ir,
            store_version,
        };
        snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    /// Replace the store's model with the snapshot's IR (not a merge)
    ///
    /// # Errors
    ///
    /// Returns `SnapshotNotFound` for an unknown name, or `InvalidIr` if the
    /// captured document no longer decodes.
    pub fn load_snapshot(&self, name: &str) -> Result<u64> {
        log_op_start!("load_snapshot", snapshot = name);
        let start = std::time::Instant::now();

        let result = self
            .get_snapshot(name)
            .and_then(|s| self.store.from_json(&s.ir))
            .map_err(|e| {
                log_op_error!(
                    "load_snapshot",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    snapshot = name
                );
                e
            })?;

        log_op_end!(
            "load_snapshot",
            duration_ms = start.elapsed().as_millis() as u64,
            snapshot = name,
            store_version = result
        );
        Ok(result)
    }

    /// Remove a snapshot
    ///
    /// # Errors
    ///
    /// Returns `SnapshotNotFound` for an unknown name.
    pub fn delete_snapshot(&self, name: &str) -> Result<Snapshot> {
        let mut snapshots = self.write();
        let pos = snapshots
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| KernelError::SnapshotNotFound {
                name: name.to_string(),
            })?;
        Ok(snapshots.remove(pos))
    }

    /// # Errors
    ///
    /// Returns `SnapshotNotFound` for an unknown name.
    pub fn get_snapshot(&self, name: &str) -> Result<Snapshot> {
        self.read()
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| KernelError::SnapshotNotFound {
                name: name.to_string(),
            })
    }

    /// Decoded model of a snapshot
    ///
    /// # Errors
    ///
    /// Returns `SnapshotNotFound` or `InvalidIr`.
    pub fn snapshot_model(&self, name: &str) -> Result<Model> {
        self.get_snapshot(name)?.model()
    }

    /// All snapshots in creation order
    pub fn list_snapshots(&self) -> Vec<Snapshot> {
        self.read().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
