//! Abstract syntax tree produced by the external DSL parser
//!
//! The kernel never parses DSL text itself. A [`DslParser`] hands it an
//! [`Ast`]; an [`IrTransformer`] turns that into the canonical model. The
//! AST also carries what the IR does not: entity lifecycles and domain
//! events, which feed the simulation engine.

pub mod parser;
pub mod transform;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{RelationType, SourceLocation};

pub use parser::{DslParser, JsonAstParser};
pub use transform::{AstTransformer, IrTransformer};

/// Access to the source position of a declaration
pub trait Located {
    fn location(&self) -> &SourceLocation;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Ast {
    #[serde(default)]
    pub architecture: ArchitectureDecl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArchitectureDecl {
    pub name: String,
    pub persons: Vec<ElementDecl>,
    pub systems: Vec<SystemDecl>,
    pub externals: Vec<ElementDecl>,
    pub entities: Vec<EntityDecl>,
    pub events: Vec<EventDecl>,
    pub relations: Vec<RelationDecl>,
    pub requirements: Vec<RequirementDecl>,
    pub adrs: Vec<AdrDecl>,
    pub journeys: Vec<JourneyDecl>,
}

/// Fields shared by every element-like declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ElementDecl {
    pub id: String,
    /// Display name; the id is used when empty
    pub name: String,
    pub description: String,
    pub technology: String,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SystemDecl {
    #[serde(flatten)]
    pub element: ElementDecl,
    #[serde(default)]
    pub containers: Vec<ContainerDecl>,
    #[serde(default)]
    pub data_stores: Vec<ElementDecl>,
    #[serde(default)]
    pub queues: Vec<ElementDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContainerDecl {
    #[serde(flatten)]
    pub element: ElementDecl,
    #[serde(default)]
    pub components: Vec<ElementDecl>,
    #[serde(default)]
    pub data_stores: Vec<ElementDecl>,
    #[serde(default)]
    pub queues: Vec<ElementDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A domain entity, optionally with a lifecycle state graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EntityDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub lifecycle: Option<LifecycleDecl>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LifecycleDecl {
    pub transitions: Vec<TransitionDecl>,
}

/// One `FROM -> TO` edge of a lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TransitionDecl {
    pub from: String,
    pub to: String,
    pub location: SourceLocation,
}

/// A domain event, optionally declaring the lifecycle transition it causes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EventDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub lifecycle_effect: Option<LifecycleEffectDecl>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LifecycleEffectDecl {
    pub entity: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelationDecl {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: Option<RelationType>,
    pub label: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RequirementDecl {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub tags: Vec<String>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdrDecl {
    pub id: String,
    pub title: String,
    pub status: String,
    pub context: String,
    pub decision: String,
    pub consequences: String,
    pub location: SourceLocation,
}

/// Arrow direction of a journey step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Arrow {
    #[default]
    #[serde(rename = "->")]
    Forward,
    #[serde(rename = "<-")]
    Backward,
    #[serde(rename = "<->")]
    Bidirectional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JourneyStepDecl {
    pub from: String,
    pub to: String,
    pub arrow: Arrow,
    pub label: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JourneyDecl {
    pub id: String,
    pub title: String,
    pub steps: Vec<JourneyStepDecl>,
    pub location: SourceLocation,
}

macro_rules! located {
    ($($ty:ty => $($path:ident).+;)*) => {
        $(
            impl Located for $ty {
                fn location(&self) -> &SourceLocation {
                    &self.$($path).+
                }
            }
        )*
    };
}

located! {
    ElementDecl => location;
    SystemDecl => element.location;
    ContainerDecl => element.location;
    EntityDecl => location;
    TransitionDecl => location;
    EventDecl => location;
    RelationDecl => location;
    RequirementDecl => location;
    AdrDecl => location;
    JourneyStepDecl => location;
    JourneyDecl => location;
}

impl Ast {
    /// Attribute every declaration to `file` (the cell id)
    pub fn stamp_file(&mut self, file: &str) {
        let a = &mut self.architecture;
        let stamp = |loc: &mut SourceLocation| loc.file = file.to_string();

        a.persons.iter_mut().for_each(|d| stamp(&mut d.location));
        a.externals.iter_mut().for_each(|d| stamp(&mut d.location));
        for system in &mut a.systems {
            stamp(&mut system.element.location);
            system
                .data_stores
                .iter_mut()
                .chain(system.queues.iter_mut())
                .for_each(|d| stamp(&mut d.location));
            for container in &mut system.containers {
                stamp(&mut container.element.location);
                container
                    .components
                    .iter_mut()
                    .chain(container.data_stores.iter_mut())
                    .chain(container.queues.iter_mut())
                    .for_each(|d| stamp(&mut d.location));
            }
        }
        for entity in &mut a.entities {
            stamp(&mut entity.location);
            if let Some(lifecycle) = &mut entity.lifecycle {
                lifecycle
                    .transitions
                    .iter_mut()
                    .for_each(|t| stamp(&mut t.location));
            }
        }
        a.events.iter_mut().for_each(|d| stamp(&mut d.location));
        a.relations.iter_mut().for_each(|d| stamp(&mut d.location));
        a.requirements.iter_mut().for_each(|d| stamp(&mut d.location));
        a.adrs.iter_mut().for_each(|d| stamp(&mut d.location));
        for journey in &mut a.journeys {
            stamp(&mut journey.location);
            journey.steps.iter_mut().for_each(|s| stamp(&mut s.location));
        }
    }

    pub fn entities(&self) -> &[EntityDecl] {
        &self.architecture.entities
    }

    pub fn events(&self) -> &[EventDecl] {
        &self.architecture.events
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDecl> {
        self.architecture.entities.iter().find(|e| e.name == name)
    }
}
