//! Sruja Kernel - notebook cell execution over the architecture model
//!
//! The kernel ties the pieces of `sruja-core` together behind one call,
//! [`Kernel::execute_cell`]:
//! - DSL cells are parsed, transformed and merged into the store, after the
//!   cell's previous contributions are retracted
//! - Diagram, query, validation and simulation cells read the model
//! - Magic commands (`%ir`, `%snapshot`, `%variant`, `%validate`, `%reset`)
//!   manage snapshots, variants and the store
//!
//! ```
//! use sruja_kernel::{CellType, Kernel};
//!
//! let kernel = Kernel::default();
//! let src = r#"{"architecture": {"systems": [{"id": "Shop"}]}}"#;
//! let result = kernel.execute_cell("cell-1", CellType::Dsl, src);
//! assert!(result.success);
//! assert!(kernel.store().element("Shop").is_some());
//! ```

pub mod cache;
pub mod cell;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod history;
pub mod kernel;
pub mod magic;
pub mod symbols;
pub mod validation;

pub use cell::{CellOutput, CellType, Diagnostic, ExecutionResult, Severity};
pub use collaborators::{DiagramCompiler, DiagramScope, QueryEngine};
pub use config::{ConfigError, KernelConfig};
pub use kernel::{Kernel, KernelBuilder};
pub use symbols::{Symbol, SymbolKind, SymbolReference};
