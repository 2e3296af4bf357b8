use serde::{Deserialize, Serialize};

use super::{Metadata, ModelRecord, SourceLocation};

/// C4 element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Person,
    System,
    Container,
    Component,
    DataStore,
    Queue,
    ExternalService,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Person => "person",
            ElementType::System => "system",
            ElementType::Container => "container",
            ElementType::Component => "component",
            ElementType::DataStore => "data_store",
            ElementType::Queue => "queue",
            ElementType::ExternalService => "external_service",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the architecture graph
///
/// `id` is unique within a model and is the join key for merge and diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: ElementType,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub technology: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

impl Element {
    pub fn new(kind: ElementType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            description: String::new(),
            technology: String::new(),
            tags: Vec::new(),
            metadata: Metadata::new(),
            source_location: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = technology.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.source_location = Some(SourceLocation::new(file, line, column));
        self
    }
}

impl ModelRecord for Element {
    fn record_key(&self) -> String {
        self.id.clone()
    }

    fn source_location(&self) -> Option<&SourceLocation> {
        self.source_location.as_ref()
    }

    fn source_location_mut(&mut self) -> &mut Option<SourceLocation> {
        &mut self.source_location
    }
}
