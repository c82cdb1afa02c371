//! Tooling primitives for reactive GOAP agents.
//!
//! Trace events are plain data recorded during simulation and rendered later (the CLI's `--trace`
//! dump, test assertions).

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{NullTraceSink, TraceEvent, TraceLog, TraceSink, VecTraceSink};
