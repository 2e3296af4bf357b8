//! Architecture validation rules
//!
//! Each rule inspects the model and the registered lifecycles and reports
//! diagnostics; none of them fails. The built-in rules:
//!
//! | Rule | Severity |
//! |---|---|
//! | `dangling-relation` | error |
//! | `self-relation` | warning |
//! | `empty-name` | warning |
//! | `isolated-element` | info |
//! | `lifecycle-effect` | error |
//! | `unreachable-state` | warning |

use std::collections::BTreeSet;

use sruja_core::model::{ElementType, Model};
use sruja_core::simulation::{EventLifecycleEffect, LifecycleFsm};

use crate::cell::{sort_diagnostics, Diagnostic};
use crate::collaborators::is_within;
use crate::commands::ValidateCommand;

/// What the rules look at
pub struct ValidationContext<'a> {
    pub model: &'a Model,
    pub fsms: &'a [LifecycleFsm],
    pub effects: &'a [EventLifecycleEffect],
}

impl ValidationContext<'_> {
    fn fsm(&self, entity: &str) -> Option<&LifecycleFsm> {
        self.fsms.iter().find(|f| f.entity_name == entity)
    }
}

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic>;
}

// ===== Finders =====

/// Relations whose endpoint is not an element, as (from, to, missing)
pub fn find_dangling_relations(model: &Model) -> Vec<(String, String, String)> {
    let ids: BTreeSet<&str> = model.elements().iter().map(|e| e.id.as_str()).collect();
    let mut found = Vec::new();
    for rel in model.relations() {
        for endpoint in [&rel.from, &rel.to] {
            if !ids.contains(endpoint.as_str()) {
                found.push((rel.from.clone(), rel.to.clone(), endpoint.clone()));
            }
        }
    }
    found
}

pub fn find_self_relations(model: &Model) -> Vec<String> {
    model
        .relations()
        .iter()
        .filter(|r| r.from == r.to)
        .map(|r| r.from.clone())
        .collect()
}

pub fn find_unnamed_elements(model: &Model) -> Vec<String> {
    model
        .elements()
        .iter()
        .filter(|e| e.name.trim().is_empty())
        .map(|e| e.id.clone())
        .collect()
}

/// Elements with no relation in or out
///
/// Systems and containers with nested children are not isolated when a
/// child is connected.
pub fn find_isolated_elements(model: &Model) -> Vec<String> {
    let connected: BTreeSet<&str> = model
        .relations()
        .iter()
        .flat_map(|r| [r.from.as_str(), r.to.as_str()])
        .collect();

    model
        .elements()
        .iter()
        .filter(|e| !connected.iter().any(|c| is_within(c, &e.id)))
        .map(|e| e.id.clone())
        .collect()
}

// ===== Rules =====

struct DanglingRelation;

impl ValidationRule for DanglingRelation {
    fn name(&self) -> &'static str {
        "dangling-relation"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        find_dangling_relations(ctx.model)
            .into_iter()
            .map(|(from, to, missing)| {
                let location = ctx
                    .model
                    .relations()
                    .iter()
                    .find(|r| r.from == from && r.to == to)
                    .and_then(|r| r.source_location.clone());
                Diagnostic::error(format!(
                    "relation {from} -> {to} references unknown element '{missing}'"
                ))
                .with_element(missing)
                .with_location(location)
            })
            .collect()
    }
}

struct SelfRelation;

impl ValidationRule for SelfRelation {
    fn name(&self) -> &'static str {
        "self-relation"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        find_self_relations(ctx.model)
            .into_iter()
            .map(|id| Diagnostic::warning(format!("'{id}' has a relation to itself")).with_element(id))
            .collect()
    }
}

struct EmptyName;

impl ValidationRule for EmptyName {
    fn name(&self) -> &'static str {
        "empty-name"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        find_unnamed_elements(ctx.model)
            .into_iter()
            .map(|id| {
                let location = ctx.model.element(&id).and_then(|e| e.source_location.clone());
                Diagnostic::warning(format!("element '{id}' has an empty name"))
                    .with_element(id)
                    .with_location(location)
            })
            .collect()
    }
}

struct IsolatedElement;

impl ValidationRule for IsolatedElement {
    fn name(&self) -> &'static str {
        "isolated-element"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        find_isolated_elements(ctx.model)
            .into_iter()
            .map(|id| {
                Diagnostic::info(format!("element '{id}' has no relations")).with_element(id)
            })
            .collect()
    }
}

struct LifecycleEffectRule;

impl ValidationRule for LifecycleEffectRule {
    fn name(&self) -> &'static str {
        "lifecycle-effect"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for effect in ctx.effects {
            let event = &effect.event_name;
            let Some(fsm) = ctx.fsm(&effect.entity_name) else {
                out.push(
                    Diagnostic::error(format!(
                        "event '{event}' affects '{}', which has no lifecycle",
                        effect.entity_name
                    ))
                    .with_element(event.clone()),
                );
                continue;
            };
            for state in [&effect.from_state, &effect.to_state] {
                if !fsm.has_state(state) {
                    out.push(
                        Diagnostic::error(format!(
                            "event '{event}' uses state '{state}', which is not in the lifecycle of '{}'",
                            fsm.entity_name
                        ))
                        .with_element(event.clone()),
                    );
                }
            }
            if fsm.has_state(&effect.from_state)
                && fsm.has_state(&effect.to_state)
                && !fsm.can_transition(&effect.from_state, &effect.to_state)
            {
                out.push(
                    Diagnostic::error(format!(
                        "event '{event}' moves '{}' from {} to {}, which is not a declared transition",
                        fsm.entity_name, effect.from_state, effect.to_state
                    ))
                    .with_element(event.clone()),
                );
            }
        }
        out
    }
}

struct UnreachableState;

impl ValidationRule for UnreachableState {
    fn name(&self) -> &'static str {
        "unreachable-state"
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        ctx.fsms
            .iter()
            .flat_map(|fsm| {
                fsm.unreachable_states().into_iter().map(move |state| {
                    Diagnostic::warning(format!(
                        "state '{state}' of '{}' is unreachable from {}",
                        fsm.entity_name, fsm.initial_state
                    ))
                    .with_element(fsm.entity_name.clone())
                })
            })
            .collect()
    }
}

// ===== Validator =====

/// Ordered set of rules
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(DanglingRelation),
                Box::new(SelfRelation),
                Box::new(EmptyName),
                Box::new(IsolatedElement),
                Box::new(LifecycleEffectRule),
                Box::new(UnreachableState),
            ],
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule after the built-in ones
    pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule; each diagnostic is tagged with its rule name
    pub fn run_all(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let mut out: Vec<Diagnostic> = self
            .rules
            .iter()
            .flat_map(|rule| tagged(rule.as_ref(), ctx))
            .collect();
        sort_diagnostics(&mut out);
        out
    }

    /// Run one rule by name; `None` if no rule has that name
    pub fn run_rule(&self, name: &str, ctx: &ValidationContext<'_>) -> Option<Vec<Diagnostic>> {
        let rule = self.rules.iter().find(|r| r.name() == name)?;
        let mut out = tagged(rule.as_ref(), ctx);
        sort_diagnostics(&mut out);
        Some(out)
    }

    /// Run the validation a `validate` command asks for
    ///
    /// Scoped forms run every rule and keep the diagnostics about the named
    /// element (and its nested children), entity or event. A scope naming
    /// something that does not exist yields a single error.
    pub fn run(&self, command: &ValidateCommand, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        match command {
            ValidateCommand::All => self.run_all(ctx),
            ValidateCommand::Rule(name) => self.run_rule(name, ctx).unwrap_or_else(|| {
                vec![Diagnostic::error(format!(
                    "unknown validation rule '{name}'; available: {}",
                    self.rule_names().join(", ")
                ))]
            }),
            ValidateCommand::System(id) => self.run_element(ElementType::System, id, ctx),
            ValidateCommand::Container(id) => self.run_element(ElementType::Container, id, ctx),
            ValidateCommand::Component(id) => self.run_element(ElementType::Component, id, ctx),
            ValidateCommand::Entity(name) => {
                if ctx.fsm(name).is_none() && !ctx.effects.iter().any(|e| &e.entity_name == name) {
                    return vec![Diagnostic::error(format!("entity '{name}' not found"))
                        .with_element(name.clone())];
                }
                self.filtered(ctx, |id| id == name.as_str())
            }
            ValidateCommand::Event(name) => {
                if !ctx.effects.iter().any(|e| &e.event_name == name) {
                    return vec![Diagnostic::error(format!(
                        "event '{name}' not found or has no lifecycle effect"
                    ))
                    .with_element(name.clone())];
                }
                self.filtered(ctx, |id| id == name.as_str())
            }
        }
    }

    fn run_element(
        &self,
        kind: ElementType,
        id: &str,
        ctx: &ValidationContext<'_>,
    ) -> Vec<Diagnostic> {
        match ctx.model.element(id) {
            Some(el) if el.kind == kind => self.filtered(ctx, |e| is_within(e, id)),
            _ => vec![Diagnostic::error(format!("{kind} '{id}' not found")).with_element(id)],
        }
    }

    fn filtered<F>(&self, ctx: &ValidationContext<'_>, keep: F) -> Vec<Diagnostic>
    where
        F: Fn(&str) -> bool,
    {
        self.run_all(ctx)
            .into_iter()
            .filter(|d| d.element_id.as_deref().is_some_and(&keep))
            .collect()
    }
}

fn tagged(rule: &dyn ValidationRule, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
    rule.check(ctx)
        .into_iter()
        .map(|d| d.with_code(rule.name()))
        .collect()
}
