use std::collections::HashMap;

use super::{Arrow, Ast, ElementDecl, JourneyDecl};
use crate::errors::{KernelError, Result};
use crate::model::{
    Adr, Element, ElementType, Journey, Metadata, Model, Relation, Requirement, SourceLocation,
};

/// The external AST → IR transformer contract
pub trait IrTransformer: Send + Sync {
    /// Turn a parsed AST into a (partial) canonical model
    ///
    /// # Errors
    ///
    /// Returns `KernelError::Transform` when the AST cannot be represented,
    /// e.g. an element without an id or a duplicated id.
    fn transform(&self, ast: &Ast) -> Result<Model>;
}

/// Reference transformer
///
/// Nested declarations get ids qualified by their parent (`Shop.API.Auth`)
/// unless the declared id is already qualified. Journey arrows expand to
/// relations: `->` as written, `<-` reversed, `<->` as two opposite relations.
///
/// An undeclared architecture name stays empty so the partial model does not
/// rename the store's architecture when merged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AstTransformer;

/// Accumulates elements while rejecting duplicate ids
struct ElementSink {
    elements: Vec<Element>,
    seen: HashMap<String, SourceLocation>,
}

impl ElementSink {
    fn new() -> Self {
        Self {
            elements: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn push(&mut self, kind: ElementType, decl: &ElementDecl, parent: Option<&str>) -> Result<String> {
        if decl.id.trim().is_empty() {
            return Err(KernelError::Transform {
                message: format!("{} declared without an id at {}", kind, decl.location),
            });
        }

        let id = match parent {
            Some(p) if !decl.id.starts_with(&format!("{p}.")) => format!("{p}.{}", decl.id),
            _ => decl.id.clone(),
        };

        if let Some(first) = self.seen.get(&id) {
            return Err(KernelError::Transform {
                message: format!(
                    "duplicate element id '{}' at {} (first declared at {})",
                    id, decl.location, first
                ),
            });
        }
        self.seen.insert(id.clone(), decl.location.clone());

        let name = if decl.name.is_empty() {
            decl.id.clone()
        } else {
            decl.name.clone()
        };
        let mut element = Element::new(kind, id.clone(), name)
            .with_description(decl.description.clone())
            .with_technology(decl.technology.clone())
            .with_tags(decl.tags.iter().cloned());
        element.metadata = Metadata::from(decl.metadata.clone());
        element.source_location = Some(decl.location.clone());
        self.elements.push(element);
        Ok(id)
    }
}

fn journey_steps(journey: &JourneyDecl) -> Vec<Relation> {
    let mut steps = Vec::with_capacity(journey.steps.len());
    for step in &journey.steps {
        let forward = Relation::new(step.from.clone(), step.to.clone(), Default::default())
            .with_description(step.label.clone());
        let forward = Relation {
            source_location: Some(step.location.clone()),
            ..forward
        };
        match step.arrow {
            Arrow::Forward => steps.push(forward),
            Arrow::Backward => steps.push(forward.reversed()),
            Arrow::Bidirectional => {
                let back = forward.reversed();
                steps.push(forward);
                steps.push(back);
            }
        }
    }
    steps
}

impl IrTransformer for AstTransformer {
    fn transform(&self, ast: &Ast) -> Result<Model> {
        let decl = &ast.architecture;
        let mut model = Model::new(decl.name.as_str());
        let mut sink = ElementSink::new();

        for person in &decl.persons {
            sink.push(ElementType::Person, person, None)?;
        }
        for system in &decl.systems {
            let system_id = sink.push(ElementType::System, &system.element, None)?;
            for container in &system.containers {
                let container_id =
                    sink.push(ElementType::Container, &container.element, Some(&system_id))?;
                for component in &container.components {
                    sink.push(ElementType::Component, component, Some(&container_id))?;
                }
                for store in &container.data_stores {
                    sink.push(ElementType::DataStore, store, Some(&container_id))?;
                }
                for queue in &container.queues {
                    sink.push(ElementType::Queue, queue, Some(&container_id))?;
                }
            }
            for store in &system.data_stores {
                sink.push(ElementType::DataStore, store, Some(&system_id))?;
            }
            for queue in &system.queues {
                sink.push(ElementType::Queue, queue, Some(&system_id))?;
            }
        }
        for external in &decl.externals {
            sink.push(ElementType::ExternalService, external, None)?;
        }
        model.architecture.elements = sink.elements;

        model.architecture.relations = decl
            .relations
            .iter()
            .map(|r| Relation {
                from: r.from.clone(),
                to: r.to.clone(),
                kind: r.kind.unwrap_or_default(),
                description: r.label.clone(),
                source_location: Some(r.location.clone()),
            })
            .collect();

        model.architecture.requirements = decl
            .requirements
            .iter()
            .map(|r| Requirement {
                id: r.id.clone(),
                kind: r.kind.clone(),
                description: r.description.clone(),
                tags: r.tags.clone(),
                source_location: Some(r.location.clone()),
            })
            .collect();

        model.architecture.adrs = decl
            .adrs
            .iter()
            .map(|a| Adr {
                id: a.id.clone(),
                title: a.title.clone(),
                status: a.status.clone(),
                context: a.context.clone(),
                decision: a.decision.clone(),
                consequences: a.consequences.clone(),
                source_location: Some(a.location.clone()),
            })
            .collect();

        model.architecture.journeys = decl
            .journeys
            .iter()
            .map(|j| Journey {
                id: j.id.clone(),
                title: j.title.clone(),
                steps: journey_steps(j),
                source_location: Some(j.location.clone()),
            })
            .collect();

        Ok(model)
    }
}
