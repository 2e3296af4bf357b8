use serde::{Deserialize, Serialize};

use super::{ModelRecord, SourceLocation};

/// Semantic type of a relation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    #[default]
    Uses,
    DependsOn,
    Publishes,
    Subscribes,
    Reads,
    Writes,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Uses => "uses",
            RelationType::DependsOn => "depends_on",
            RelationType::Publishes => "publishes",
            RelationType::Subscribes => "subscribes",
            RelationType::Reads => "reads",
            RelationType::Writes => "writes",
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store identity of a relation: `(from, to, type)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationKey {
    pub from: String,
    pub to: String,
    pub kind: RelationType,
}

impl std::fmt::Display for RelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}#{}", self.from, self.to, self.kind)
    }
}

/// A directed edge between two elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default)]
    pub kind: RelationType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

impl Relation {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: RelationType) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            description: String::new(),
            source_location: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_source(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.source_location = Some(SourceLocation::new(file, line, column));
        self
    }

    /// Store identity (endpoints plus semantic type)
    pub fn key(&self) -> RelationKey {
        RelationKey {
            from: self.from.clone(),
            to: self.to.clone(),
            kind: self.kind,
        }
    }

    /// Diff/merge identity: endpoints only, rendered as `from->to`
    ///
    /// A type change on the same endpoint pair is a modification under this
    /// key, not an add plus a remove.
    pub fn endpoint_key(&self) -> String {
        format!("{}->{}", self.from, self.to)
    }

    /// The same relation pointing the other way
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            ..self.clone()
        }
    }
}

impl ModelRecord for Relation {
    fn record_key(&self) -> String {
        self.key().to_string()
    }

    fn source_location(&self) -> Option<&SourceLocation> {
        self.source_location.as_ref()
    }

    fn source_location_mut(&mut self) -> &mut Option<SourceLocation> {
        &mut self.source_location
    }
}
