//! World state store, action/goal model and cooperative behaviors for reactive GOAP agents.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod behavior;
pub mod behaviors;
pub mod error;
pub mod goal;
pub mod plan;
pub mod state;
pub mod store;
pub mod tick;
pub mod value;

pub use action::Action;
pub use behavior::{
    ActionOutcome, Behavior, BehaviorFactory, BehaviorStatus, CancelToken, ExecutionHandle,
};
pub use behaviors::{FnBehavior, Instant, Timed, WaitUntil};
pub use error::ModelError;
pub use goal::{rank_goals, Goal};
pub use plan::Plan;
pub use state::WorldState;
pub use store::{SubscriptionId, WorldStore};
pub use tick::TickContext;
pub use value::Value;
