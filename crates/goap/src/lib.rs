//! Umbrella crate that re-exports the `goap-*` building blocks.
//!
//! - [`core`]: world state store, actions, goals, behaviors
//! - [`planner`]: the greedy forward planner
//! - [`agent`]: the reactive agent controller and the multi-agent simulation runner
//! - [`tools`]: trace events and sinks

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use goap_core as core;

#[cfg(feature = "planner")]
#[cfg_attr(docsrs, doc(cfg(feature = "planner")))]
pub use goap_planner as planner;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use goap_tools as tools;

#[cfg(feature = "agent")]
#[cfg_attr(docsrs, doc(cfg(feature = "agent")))]
pub use goap_agent as agent;

/// The types most programs need.
#[cfg(feature = "agent")]
#[cfg_attr(docsrs, doc(cfg(feature = "agent")))]
pub mod prelude {
    pub use goap_agent::{AgentController, AgentHandle, AgentState, ScenarioConfig, Simulation};
    pub use goap_core::{
        Action, Behavior, BehaviorStatus, CancelToken, Goal, TickContext, Value, WorldState,
        WorldStore,
    };
    pub use goap_planner::Planner;
}
