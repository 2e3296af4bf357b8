use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Adr, Element, Journey, ModelRecord, Relation, Requirement};
use crate::errors::{KernelError, Result};

/// IR document version written by this crate
pub const IR_VERSION: &str = "1.0";

/// Position of a declaration in cell source
///
/// `file` is the id of the cell that produced the declaration; the store
/// uses it to retract a cell's contributions before re-execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SourceLocation {
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// The architecture graph held by a [`Model`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Architecture {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub adrs: Vec<Adr>,
    #[serde(default)]
    pub journeys: Vec<Journey>,
}

/// Versioned IR document
///
/// Serializes to `{version, generatedAt, architecture: {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub architecture: Architecture,
}

impl Model {
    /// Create an empty model with the given architecture name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: IR_VERSION.to_string(),
            generated_at: Utc::now(),
            architecture: Architecture {
                name: name.into(),
                ..Architecture::default()
            },
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.architecture.elements
    }

    pub fn relations(&self) -> &[Relation] {
        &self.architecture.relations
    }

    /// Find an element by id
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.architecture.elements.iter().find(|e| e.id == id)
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.architecture.elements.iter_mut().find(|e| e.id == id)
    }

    /// True when the model has no records of any kind
    pub fn is_empty(&self) -> bool {
        let a = &self.architecture;
        a.elements.is_empty()
            && a.relations.is_empty()
            && a.requirements.is_empty()
            && a.adrs.is_empty()
            && a.journeys.is_empty()
    }

    /// Attribute every record in the model to `file`
    pub fn stamp_source_file(&mut self, file: &str) {
        let a = &mut self.architecture;
        a.elements.iter_mut().for_each(|r| r.stamp_source_file(file));
        a.relations.iter_mut().for_each(|r| r.stamp_source_file(file));
        a.requirements
            .iter_mut()
            .for_each(|r| r.stamp_source_file(file));
        a.adrs.iter_mut().for_each(|r| r.stamp_source_file(file));
        a.journeys.iter_mut().for_each(|r| r.stamp_source_file(file));
    }

    /// Serialize to the IR JSON document
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if a metadata value cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode an IR JSON document
    ///
    /// # Errors
    ///
    /// Returns `InvalidIr` when the text is not a well-formed IR document or
    /// its major version is not 1.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Model = serde_json::from_str(json).map_err(|e| KernelError::InvalidIr {
            message: e.to_string(),
        })?;
        if model.version.split('.').next() != IR_VERSION.split('.').next() {
            return Err(KernelError::InvalidIr {
                message: format!(
                    "unsupported IR version '{}', expected {}",
                    model.version, IR_VERSION
                ),
            });
        }
        Ok(model)
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new("")
    }
}
