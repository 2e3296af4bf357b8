//! Id-keyed auxiliary records: requirements, ADRs and journeys

use serde::{Deserialize, Serialize};

use super::{ModelRecord, Relation, SourceLocation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: String,
    /// Free-form classification, e.g. `functional`, `performance`
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

impl Requirement {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: String::new(),
            description: description.into(),
            tags: Vec::new(),
            source_location: None,
        }
    }
}

/// Architecture decision record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adr {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub decision: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub consequences: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

/// A user journey: an ordered sequence of relation steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

macro_rules! id_keyed_record {
    ($ty:ty) => {
        impl ModelRecord for $ty {
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
    };
}

id_keyed_record!(Requirement);
id_keyed_record!(Adr);
id_keyed_record!(Journey);
