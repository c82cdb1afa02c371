use core::cell::Cell;
use std::rc::Rc;

use crate::{TickContext, WorldStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorStatus {
    Running,
    Completed,
}

/// Terminal outcome of an [`ExecutionHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Cancelled,
}

/// Shared cancellation flag.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// The external capability an action drives to do its real-world work (movement, animation,
/// timers).
///
/// A behavior is ticked once per control-loop tick. Each tick is a checkpoint: long-running work
/// should also consult `cancel` at its own suspension points and stop early once it is set.
pub trait Behavior: 'static {
    fn tick(
        &mut self,
        ctx: &TickContext,
        world: &WorldStore,
        cancel: &CancelToken,
    ) -> BehaviorStatus;

    /// Called once, when cancellation is first requested on a running behavior.
    fn cancel(&mut self, _world: &WorldStore) {}
}

/// Builds a fresh [`Behavior`] each time an action starts executing.
pub trait BehaviorFactory: 'static {
    fn build(&self, action: &str, world: &WorldStore) -> Box<dyn Behavior>;
}

impl<F> BehaviorFactory for F
where
    F: Fn(&str, &WorldStore) -> Box<dyn Behavior> + 'static,
{
    fn build(&self, action: &str, world: &WorldStore) -> Box<dyn Behavior> {
        self(action, world)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Finished(ActionOutcome),
}

/// A started behavior.
///
/// The handle reports its outcome exactly once through [`checkpoint`](Self::checkpoint): either
/// `Completed` or `Cancelled`, never both. Once cancellation has been requested (through
/// [`request_cancel`](Self::request_cancel) or any clone of the token) a completion is never
/// reported, even if the behavior itself finishes on the same tick.
pub struct ExecutionHandle {
    behavior: Box<dyn Behavior>,
    token: CancelToken,
    phase: Phase,
}

impl ExecutionHandle {
    pub fn new(behavior: Box<dyn Behavior>) -> Self {
        Self {
            behavior,
            token: CancelToken::new(),
            phase: Phase::Running,
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    pub fn outcome(&self) -> Option<ActionOutcome> {
        match self.phase {
            Phase::Running => None,
            Phase::Finished(outcome) => Some(outcome),
        }
    }

    /// Ask the behavior to stop. The behavior's cancel hook runs once; requesting again, or after the
    /// handle finished, does nothing.
    pub fn request_cancel(&mut self, world: &WorldStore) {
        if self.is_finished() || self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        self.behavior.cancel(world);
    }

    /// Run one checkpoint.
    ///
    /// Returns `Some(outcome)` on the checkpoint where the handle finishes and `None` otherwise.
    pub fn checkpoint(&mut self, ctx: &TickContext, world: &WorldStore) -> Option<ActionOutcome> {
        if self.is_finished() {
            return None;
        }

        if self.token.is_cancelled() {
            return Some(self.finish(ActionOutcome::Cancelled));
        }

        match self.behavior.tick(ctx, world, &self.token) {
            BehaviorStatus::Running => None,
            BehaviorStatus::Completed if self.token.is_cancelled() => {
                Some(self.finish(ActionOutcome::Cancelled))
            }
            BehaviorStatus::Completed => Some(self.finish(ActionOutcome::Completed)),
        }
    }

    fn finish(&mut self, outcome: ActionOutcome) -> ActionOutcome {
        self.phase = Phase::Finished(outcome);
        outcome
    }
}

impl core::fmt::Debug for ExecutionHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("cancel_requested", &self.token.is_cancelled())
            .field("phase", &self.phase)
            .finish()
    }
}
