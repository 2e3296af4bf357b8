use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::fsm::{EventLifecycleEffect, LifecycleFsm};
use crate::ast::{Ast, EntityDecl, EventDecl};
use crate::errors::{KernelError, Result};

/// State reached at one step of a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub state: String,
    /// Event that produced this state; `None` for the starting state
    pub event: Option<String>,
    /// 0 for the starting state, otherwise the 1-based event position
    pub step: usize,
}

/// Why an event could not advance the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidReason {
    /// The effect expects a different current state
    FromStateMismatch,
    /// The current state has no outgoing transition
    NoOutgoingTransition,
    /// The lifecycle has no edge from the current state to the target
    TargetNotReachable,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::FromStateMismatch => "from-state-mismatch",
            InvalidReason::NoOutgoingTransition => "no-outgoing-transition",
            InvalidReason::TargetNotReachable => "target-not-reachable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidTransition {
    pub event: String,
    pub from_state: String,
    pub to_state: String,
    pub reason: InvalidReason,
    pub step: usize,
}

/// Full report of a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub entity_name: String,
    pub initial_state: String,
    pub final_state: String,
    pub state_history: Vec<StateSnapshot>,
    pub invalid_transitions: Vec<InvalidTransition>,
    pub warnings: Vec<String>,
}

impl SimulationResult {
    /// True when every event was either applied or only warned about
    pub fn is_valid(&self) -> bool {
        self.invalid_transitions.is_empty()
    }
}

/// Registry of lifecycle FSMs and event effects, plus the replay engine
///
/// FSMs are keyed by entity name and effects by event name; a later
/// registration under the same key replaces the earlier one.
#[derive(Debug, Default)]
pub struct SimulationEngine {
    fsms: RwLock<BTreeMap<String, LifecycleFsm>>,
    effects: RwLock<BTreeMap<String, EventLifecycleEffect>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive and register the FSM of `entity`
    ///
    /// # Errors
    ///
    /// Returns `NoLifecycle` if the entity declares no lifecycle.
    pub fn build_fsm_from_entity(&self, entity: &EntityDecl) -> Result<LifecycleFsm> {
        let fsm = LifecycleFsm::from_entity(entity)?;
        self.register_fsm(fsm.clone());
        Ok(fsm)
    }

    pub fn register_fsm(&self, fsm: LifecycleFsm) {
        write(&self.fsms).insert(fsm.entity_name.clone(), fsm);
    }

    /// Register the lifecycle effect declared by `event`
    ///
    /// Returns `false` (and registers nothing) for an event without one.
    pub fn register_event_effect(&self, event: &EventDecl) -> bool {
        match EventLifecycleEffect::from_event(event) {
            Some(effect) => {
                self.register_effect(effect);
                true
            }
            None => false,
        }
    }

    pub fn register_effect(&self, effect: EventLifecycleEffect) {
        write(&self.effects).insert(effect.event_name.clone(), effect);
    }

    /// Register every lifecycle and effect found in `ast`
    ///
    /// Entities without a lifecycle are skipped. Returns the number of FSMs
    /// and effects registered.
    pub fn load_ast(&self, ast: &Ast) -> (usize, usize) {
        let fsms = ast
            .entities()
            .iter()
            .filter(|e| self.build_fsm_from_entity(e).is_ok())
            .count();
        let effects = ast
            .events()
            .iter()
            .filter(|e| self.register_event_effect(e))
            .count();
        (fsms, effects)
    }

    /// Drop FSMs and effects declared by `cell_id`
    pub fn retract_cell(&self, cell_id: &str) -> usize {
        let mut fsms = write(&self.fsms);
        let mut effects = write(&self.effects);
        let before = fsms.len() + effects.len();
        fsms.retain(|_, f| f.source_file != cell_id);
        effects.retain(|_, e| e.source_file != cell_id);
        before - fsms.len() - effects.len()
    }

    pub fn fsm(&self, entity: &str) -> Option<LifecycleFsm> {
        read(&self.fsms).get(entity).cloned()
    }

    /// All FSMs ordered by entity name
    pub fn list_fsms(&self) -> Vec<LifecycleFsm> {
        read(&self.fsms).values().cloned().collect()
    }

    pub fn effect(&self, event: &str) -> Option<EventLifecycleEffect> {
        read(&self.effects).get(event).cloned()
    }

    /// All effects ordered by event name
    pub fn list_effects(&self) -> Vec<EventLifecycleEffect> {
        read(&self.effects).values().cloned().collect()
    }

    pub fn clear(&self) {
        write(&self.fsms).clear();
        write(&self.effects).clear();
    }

    /// Replay `events` in order against `entity`'s lifecycle
    ///
    /// Starts from `initial_state`, or the FSM's initial state when `None`
    /// or empty. The whole event list is always consumed: events with no
    /// effect or an effect for another entity become warnings, events that
    /// cannot fire become invalid transitions and leave the state as is.
    ///
    /// # Errors
    ///
    /// Returns `FsmNotFound` if no FSM is registered for `entity`, or
    /// `UnknownState` if an explicit start state is not in its lifecycle.
    pub fn simulate<S: AsRef<str>>(
        &self,
        entity: &str,
        initial_state: Option<&str>,
        events: &[S],
    ) -> Result<SimulationResult> {
        let fsm = self.fsm(entity).ok_or_else(|| KernelError::FsmNotFound {
            entity: entity.to_string(),
        })?;

        let start = match initial_state.map(str::trim).filter(|s| !s.is_empty()) {
            Some(state) if !fsm.has_state(state) => {
                return Err(KernelError::UnknownState {
                    entity: entity.to_string(),
                    state: state.to_string(),
                })
            }
            Some(state) => state.to_string(),
            None => fsm.initial_state.clone(),
        };

        let effects = read(&self.effects).clone();
        let mut current = start.clone();
        let mut result = SimulationResult {
            entity_name: entity.to_string(),
            initial_state: start.clone(),
            final_state: String::new(),
            state_history: vec![StateSnapshot {
                state: start,
                event: None,
                step: 0,
            }],
            invalid_transitions: Vec::new(),
            warnings: Vec::new(),
        };

        for (i, event) in events.iter().enumerate() {
            let event = event.as_ref();
            let step = i + 1;

            let Some(effect) = effects.get(event) else {
                result
                    .warnings
                    .push(format!("step {step}: event '{event}' has no lifecycle effect"));
                continue;
            };
            if effect.entity_name != entity {
                result.warnings.push(format!(
                    "step {step}: event '{event}' affects '{}', not '{entity}'",
                    effect.entity_name
                ));
                continue;
            }

            let reason = if effect.from_state != current {
                Some(InvalidReason::FromStateMismatch)
            } else if fsm.targets(&current).is_empty() {
                Some(InvalidReason::NoOutgoingTransition)
            } else if !fsm.can_transition(&current, &effect.to_state) {
                Some(InvalidReason::TargetNotReachable)
            } else {
                None
            };

            match reason {
                Some(reason) => result.invalid_transitions.push(InvalidTransition {
                    event: event.to_string(),
                    from_state: current.clone(),
                    to_state: effect.to_state.clone(),
                    reason,
                    step,
                }),
                None => {
                    current = effect.to_state.clone();
                    result.state_history.push(StateSnapshot {
                        state: current.clone(),
                        event: Some(event.to_string()),
                        step,
                    });
                }
            }
        }

        result.final_state = current;
        tracing::debug!(
            entity,
            final_state = %result.final_state,
            invalid = result.invalid_transitions.len(),
            warnings = result.warnings.len(),
            "simulation finished"
        );
        Ok(result)
    }
}
