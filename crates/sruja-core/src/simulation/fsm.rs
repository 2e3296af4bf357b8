use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::ast::{EntityDecl, EventDecl};
use crate::errors::{KernelError, Result};

/// Lifecycle state graph of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleFsm {
    pub entity_name: String,
    /// Distinct states in order of first mention
    pub states: Vec<String>,
    /// from-state → to-states, each list in declaration order without repeats
    pub transitions: BTreeMap<String, Vec<String>>,
    pub initial_state: String,
    /// Cell that declared the entity
    #[serde(default)]
    pub source_file: String,
}

/// Pick the initial state
///
/// The first state (in order of mention) with no incoming transition. When
/// every state has one, the lexicographically smallest state, so cyclic
/// lifecycles get a result independent of declaration order.
fn pick_initial(states: &[String], targets: &BTreeSet<&str>) -> Option<String> {
    states
        .iter()
        .find(|s| !targets.contains(s.as_str()))
        .or_else(|| states.iter().min())
        .cloned()
}

impl LifecycleFsm {
    /// Derive the FSM from an entity's lifecycle block
    ///
    /// # Errors
    ///
    /// Returns `NoLifecycle` if the entity declares no lifecycle or the
    /// lifecycle has no transitions.
    pub fn from_entity(entity: &EntityDecl) -> Result<Self> {
        let lifecycle = entity
            .lifecycle
            .as_ref()
            .filter(|l| !l.transitions.is_empty())
            .ok_or_else(|| KernelError::NoLifecycle {
                entity: entity.name.clone(),
            })?;

        let edges: Vec<(&str, &str)> = lifecycle
            .transitions
            .iter()
            .map(|t| (t.from.as_str(), t.to.as_str()))
            .collect();
        let mut fsm = Self::from_edges(&entity.name, &edges).ok_or_else(|| {
            KernelError::NoLifecycle {
                entity: entity.name.clone(),
            }
        })?;
        fsm.source_file = entity.location.file.clone();
        Ok(fsm)
    }

    /// Build from `(from, to)` edges; `None` when there are no edges
    pub fn from_edges(entity_name: &str, edges: &[(&str, &str)]) -> Option<Self> {
        let mut states: Vec<String> = Vec::new();
        let mut transitions: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (from, to) in edges {
            for state in [from, to] {
                if !states.iter().any(|s| s == state) {
                    states.push(state.to_string());
                }
            }
            let targets = transitions.entry(from.to_string()).or_default();
            if !targets.iter().any(|t| t == to) {
                targets.push(to.to_string());
            }
        }

        let incoming: BTreeSet<&str> = edges.iter().map(|(_, to)| *to).collect();
        let initial_state = pick_initial(&states, &incoming)?;

        Some(Self {
            entity_name: entity_name.to_string(),
            states,
            transitions,
            initial_state,
            source_file: String::new(),
        })
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    /// States directly reachable from `state`
    pub fn targets(&self, state: &str) -> &[String] {
        self.transitions
            .get(state)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn can_transition(&self, from: &str, to: &str) -> bool {
        self.targets(from).iter().any(|t| t == to)
    }

    /// States with no outgoing transition
    pub fn terminal_states(&self) -> Vec<&str> {
        self.states
            .iter()
            .filter(|s| self.targets(s).is_empty())
            .map(String::as_str)
            .collect()
    }

    /// Every state reachable from `start`, including `start`
    pub fn reachable_from(&self, start: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start.to_string()]);
        while let Some(state) = queue.pop_front() {
            if seen.insert(state.clone()) {
                queue.extend(self.targets(&state).iter().cloned());
            }
        }
        seen
    }

    /// Declared states the initial state can never reach
    pub fn unreachable_states(&self) -> Vec<&str> {
        let reachable = self.reachable_from(&self.initial_state);
        self.states
            .iter()
            .filter(|s| !reachable.contains(*s))
            .map(String::as_str)
            .collect()
    }
}

/// The lifecycle transition a domain event triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLifecycleEffect {
    pub entity_name: String,
    pub from_state: String,
    pub to_state: String,
    pub event_name: String,
    #[serde(default)]
    pub source_file: String,
}

impl EventLifecycleEffect {
    /// The effect declared by `event`, if any
    pub fn from_event(event: &EventDecl) -> Option<Self> {
        let effect = event.lifecycle_effect.as_ref()?;
        Some(Self {
            entity_name: effect.entity.clone(),
            from_state: effect.from.clone(),
            to_state: effect.to.clone(),
            event_name: event.name.clone(),
            source_file: event.location.file.clone(),
        })
    }
}
