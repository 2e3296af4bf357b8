//! Symbol table of declarations, per contributing cell
//!
//! Rebuilt for a cell every time it executes, so lookups always reflect the
//! latest source of each cell.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use sruja_core::ast::{Ast, Located};
use sruja_core::model::{ElementType, Model, SourceLocation};
use sruja_core::simulation::EventLifecycleEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Person,
    System,
    Container,
    Component,
    DataStore,
    Queue,
    ExternalService,
    Entity,
    Event,
    Requirement,
    Adr,
    Journey,
}

impl From<ElementType> for SymbolKind {
    fn from(kind: ElementType) -> Self {
        match kind {
            ElementType::Person => SymbolKind::Person,
            ElementType::System => SymbolKind::System,
            ElementType::Container => SymbolKind::Container,
            ElementType::Component => SymbolKind::Component,
            ElementType::DataStore => SymbolKind::DataStore,
            ElementType::Queue => SymbolKind::Queue,
            ElementType::ExternalService => SymbolKind::ExternalService,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    /// Qualified id for elements, declared name otherwise
    pub name: String,
    pub kind: SymbolKind,
    pub cell_id: String,
    /// Display name or title
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

/// A place that refers to a symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolReference {
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

/// Symbols declared by one cell's model and AST
pub fn collect_symbols(cell_id: &str, model: &Model, ast: &Ast) -> Vec<Symbol> {
    let symbol = |name: &str, kind: SymbolKind, detail: &str, location: Option<SourceLocation>| {
        Symbol {
            name: name.to_string(),
            kind,
            cell_id: cell_id.to_string(),
            detail: detail.to_string(),
            location,
        }
    };

    let a = &model.architecture;
    let mut out: Vec<Symbol> = a
        .elements
        .iter()
        .map(|e| symbol(&e.id, e.kind.into(), &e.name, e.source_location.clone()))
        .collect();
    out.extend(a.requirements.iter().map(|r| {
        symbol(&r.id, SymbolKind::Requirement, &r.description, r.source_location.clone())
    }));
    out.extend(
        a.adrs
            .iter()
            .map(|r| symbol(&r.id, SymbolKind::Adr, &r.title, r.source_location.clone())),
    );
    out.extend(
        a.journeys
            .iter()
            .map(|r| symbol(&r.id, SymbolKind::Journey, &r.title, r.source_location.clone())),
    );

    let decls = &ast.architecture;
    out.extend(decls.entities.iter().map(|e| {
        symbol(&e.name, SymbolKind::Entity, "", Some(e.location().clone()))
    }));
    out.extend(
        decls
            .events
            .iter()
            .map(|e| symbol(&e.name, SymbolKind::Event, "", Some(e.location().clone()))),
    );
    out
}

/// Relations, journey steps and lifecycle effects that mention `name`
pub fn find_references(
    model: &Model,
    effects: &[EventLifecycleEffect],
    name: &str,
) -> Vec<SymbolReference> {
    let mut out = Vec::new();
    for rel in model.relations() {
        if rel.from == name || rel.to == name {
            out.push(SymbolReference {
                context: format!("relation {} -> {} ({})", rel.from, rel.to, rel.kind),
                location: rel.source_location.clone(),
            });
        }
    }
    for journey in &model.architecture.journeys {
        for step in journey.steps.iter().filter(|s| s.from == name || s.to == name) {
            out.push(SymbolReference {
                context: format!("journey {} step {} -> {}", journey.id, step.from, step.to),
                location: step
                    .source_location
                    .clone()
                    .or_else(|| journey.source_location.clone()),
            });
        }
    }
    for effect in effects.iter().filter(|e| e.entity_name == name) {
        out.push(SymbolReference {
            context: format!(
                "event {} moves {} from {} to {}",
                effect.event_name, effect.entity_name, effect.from_state, effect.to_state
            ),
            location: (!effect.source_file.is_empty())
                .then(|| SourceLocation::new(effect.source_file.clone(), 0, 0)),
        });
    }
    out
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    by_cell: RwLock<BTreeMap<String, Vec<Symbol>>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything `cell_id` declared
    pub fn replace_cell(&self, cell_id: &str, symbols: Vec<Symbol>) {
        let mut by_cell = self.by_cell.write().unwrap_or_else(PoisonError::into_inner);
        if symbols.is_empty() {
            by_cell.remove(cell_id);
        } else {
            by_cell.insert(cell_id.to_string(), symbols);
        }
    }

    pub fn remove_cell(&self, cell_id: &str) -> usize {
        let mut by_cell = self.by_cell.write().unwrap_or_else(PoisonError::into_inner);
        by_cell.remove(cell_id).map(|s| s.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        self.by_cell
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Exact lookup; the first cell in id order wins when several declare it
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        let by_cell = self.by_cell.read().unwrap_or_else(PoisonError::into_inner);
        by_cell
            .values()
            .flatten()
            .find(|s| s.name == name)
            .cloned()
    }

    /// Symbols whose name starts with `prefix`, sorted by name, one per name
    pub fn complete(&self, prefix: &str) -> Vec<Symbol> {
        let by_cell = self.by_cell.read().unwrap_or_else(PoisonError::into_inner);
        let mut found: BTreeMap<&str, &Symbol> = BTreeMap::new();
        for symbol in by_cell.values().flatten() {
            if symbol.name.starts_with(prefix) {
                found.entry(symbol.name.as_str()).or_insert(symbol);
            }
        }
        found.into_values().cloned().collect()
    }

    pub fn symbols_in_cell(&self, cell_id: &str) -> Vec<Symbol> {
        let by_cell = self.by_cell.read().unwrap_or_else(PoisonError::into_inner);
        by_cell.get(cell_id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        let by_cell = self.by_cell.read().unwrap_or_else(PoisonError::into_inner);
        by_cell.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
