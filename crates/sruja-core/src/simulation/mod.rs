//! Lifecycle simulation.
//!
//! FSMs are derived from entity lifecycle declarations in the AST; events
//! declaring a lifecycle effect are registered against them, and
//! [`SimulationEngine::simulate`] replays an event sequence, collecting
//! warnings and invalid transitions instead of stopping at the first one.

pub mod engine;
pub mod fsm;

pub use engine::{
    InvalidReason, InvalidTransition, SimulationEngine, SimulationResult, StateSnapshot,
};
pub use fsm::{EventLifecycleEffect, LifecycleFsm};
