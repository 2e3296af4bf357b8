//! Structural diff engine.
//!
//! Compares two models at element, relation and requirement granularity and
//! detects three-way conflicts for the variant merge.
//!
//! ## Entry points
//!
//! ```
//! use sruja_core::diff::{diff_models, render_diff_summary};
//! use sruja_core::model::Model;
//!
//! let diff = diff_models(&Model::new("a"), &Model::new("b"));
//! assert!(diff.is_empty());
//! let summary = render_diff_summary(&diff);
//! assert!(summary.starts_with("## Model Diff"));
//! ```
//!
//! ## Guarantees
//!
//! - **Pure**: inputs are borrowed and never modified.
//! - **Determinism**: results are ordered by identity key.
//! - **Endpoint identity for relations**: relations join on `from->to`, so a
//!   type change is reported as a modification.

pub mod conflicts;
pub mod engine;
pub mod human_summary;
pub mod model;

pub use conflicts::detect_conflicts;
pub use engine::{diff_models, field_changes, Diffable};
pub use human_summary::{render_diff_summary, render_merge_explanation};
pub use model::{Conflict, ConflictKind, DiffResult, DiffSummary, FieldChange, Modification};
