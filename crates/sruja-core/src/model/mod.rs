//! Canonical architecture model (IR)
//!
//! The IR is a plain value type: every type here is `Clone` and owns its
//! data, so a clone is a deep copy. The JSON shape produced by serde is the
//! persistence and wire format shared by the store, snapshots and variants.

pub mod element;
pub mod ir;
pub mod metadata;
pub mod records;
pub mod relation;

pub use element::{Element, ElementType};
pub use ir::{Architecture, Model, SourceLocation, IR_VERSION};
pub use metadata::Metadata;
pub use records::{Adr, Journey, Requirement};
pub use relation::{Relation, RelationKey, RelationType};

/// A record that can be merged into the store by identity key and retracted
/// by the cell that contributed it.
pub trait ModelRecord {
    /// Identity key used for last-write-wins merging in the store
    fn record_key(&self) -> String;

    fn source_location(&self) -> Option<&SourceLocation>;

    fn source_location_mut(&mut self) -> &mut Option<SourceLocation>;

    /// True when the record was contributed by the given cell
    fn contributed_by(&self, cell_id: &str) -> bool {
        self.source_location()
            .map(|loc| loc.file == cell_id)
            .unwrap_or(false)
    }

    /// Attribute this record to `file`, keeping any line/column already set
    fn stamp_source_file(&mut self, file: &str) {
        let slot = self.source_location_mut();
        let mut loc = slot.take().unwrap_or_default();
        loc.file = file.to_string();
        *slot = Some(loc);
    }
}
