//! Sruja Core - incremental architecture model management
//!
//! This crate holds the stateful heart of the architecture kernel:
//! - Canonical model (IR) and the AST collaborator contract
//! - Architecture Store with per-cell retraction and a version counter
//! - Structural diff engine and three-way conflict detection
//! - Named snapshots and independently evolving variants with merge
//! - Lifecycle FSM derivation and event replay
//!
//! Everything is in-memory and synchronous. Registries are guarded by
//! independent read/write locks and shared through `Arc`.

pub mod ast;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod simulation;
pub mod snapshot;
pub mod store;
pub mod variant;

pub use sruja_core_types as core_types;

// Re-export commonly used types
pub use diff::{detect_conflicts, diff_models, Conflict, DiffResult};
pub use errors::{ExError, ExErrorKind, KernelError, Result};
pub use model::{Element, ElementType, Metadata, Model, Relation, RelationType};
pub use simulation::{SimulationEngine, SimulationResult};
pub use snapshot::{Snapshot, SnapshotManager};
pub use store::ArchitectureStore;
pub use variant::{MergeResult, ModelPatch, Variant, VariantManager};
