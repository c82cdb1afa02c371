//! Deterministic greedy forward-chaining GOAP planner.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod planner;

pub use planner::{Planner, PlannerConfig, PlanningFailure, DEFAULT_MAX_ITERATIONS};
