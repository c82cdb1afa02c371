//! Stock behaviors.
//!
//! Engines plug their own movement/animation behaviors in through [`Behavior`]; these cover the
//! timing-only cases and tests.

use std::rc::Rc;

use crate::{Behavior, BehaviorFactory, BehaviorStatus, CancelToken, TickContext, WorldStore};

/// Completes on its first checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct Instant;

impl Instant {
    pub fn factory() -> impl BehaviorFactory {
        |_: &str, _: &WorldStore| -> Box<dyn Behavior> { Box::new(Instant) }
    }
}

impl Behavior for Instant {
    fn tick(
        &mut self,
        _ctx: &TickContext,
        _world: &WorldStore,
        _cancel: &CancelToken,
    ) -> BehaviorStatus {
        BehaviorStatus::Completed
    }
}

/// Completes once `duration_secs` of simulated time (summed `dt_seconds`) has elapsed.
///
/// A zero duration completes on the first checkpoint.
#[derive(Debug, Clone, Copy)]
pub struct Timed {
    duration_secs: f32,
    elapsed_secs: f32,
}

impl Timed {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration_secs: duration_secs.max(0.0),
            elapsed_secs: 0.0,
        }
    }

    pub fn factory(duration_secs: f32) -> impl BehaviorFactory {
        move |_: &str, _: &WorldStore| -> Box<dyn Behavior> { Box::new(Timed::new(duration_secs)) }
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed_secs
    }
}

impl Behavior for Timed {
    fn tick(
        &mut self,
        ctx: &TickContext,
        _world: &WorldStore,
        _cancel: &CancelToken,
    ) -> BehaviorStatus {
        if self.elapsed_secs >= self.duration_secs {
            return BehaviorStatus::Completed;
        }
        self.elapsed_secs += ctx.dt_seconds.max(0.0);
        if self.elapsed_secs >= self.duration_secs {
            BehaviorStatus::Completed
        } else {
            BehaviorStatus::Running
        }
    }
}

/// Runs until `predicate` holds against the live store.
pub struct WaitUntil {
    predicate: Rc<dyn Fn(&WorldStore) -> bool>,
}

impl WaitUntil {
    pub fn new(predicate: impl Fn(&WorldStore) -> bool + 'static) -> Self {
        Self {
            predicate: Rc::new(predicate),
        }
    }

    pub fn factory(predicate: impl Fn(&WorldStore) -> bool + 'static) -> impl BehaviorFactory {
        let predicate: Rc<dyn Fn(&WorldStore) -> bool> = Rc::new(predicate);
        move |_: &str, _: &WorldStore| -> Box<dyn Behavior> {
            Box::new(WaitUntil {
                predicate: Rc::clone(&predicate),
            })
        }
    }

    /// Wait until `key` holds `Bool(true)`.
    pub fn flag(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |world| world.is_true(&key))
    }
}

impl Behavior for WaitUntil {
    fn tick(
        &mut self,
        _ctx: &TickContext,
        world: &WorldStore,
        _cancel: &CancelToken,
    ) -> BehaviorStatus {
        if (self.predicate)(world) {
            BehaviorStatus::Completed
        } else {
            BehaviorStatus::Running
        }
    }
}

/// Adapts a closure into a [`Behavior`].
pub struct FnBehavior<F>(pub F);

impl<F> Behavior for FnBehavior<F>
where
    F: FnMut(&TickContext, &WorldStore, &CancelToken) -> BehaviorStatus + 'static,
{
    fn tick(
        &mut self,
        ctx: &TickContext,
        world: &WorldStore,
        cancel: &CancelToken,
    ) -> BehaviorStatus {
        (self.0)(ctx, world, cancel)
    }
}
