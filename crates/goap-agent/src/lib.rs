//! Reactive agent controller running GOAP plans against a shared world store.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod handle;
pub mod simulation;

pub use config::{
    ActionConfig, AgentConfig, EmergencyConfig, GoalConfig, PlannerSection, ScenarioConfig,
    TickSection,
};
pub use controller::{AgentBuilder, AgentController, AgentState, AgentStats, EmergencyGoal};
pub use error::AgentError;
pub use handle::AgentHandle;
pub use simulation::Simulation;
