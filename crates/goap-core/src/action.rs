use core::fmt;
use std::rc::Rc;

use crate::behaviors::{Instant, Timed};
use crate::{BehaviorFactory, ExecutionHandle, Goal, ModelError, Value, WorldState, WorldStore};

/// An action descriptor: preconditions, effects and cost, plus the behavior that performs it.
///
/// Preconditions and effects are fixed once the action is handed to an agent (agents hold actions
/// behind `Rc`). Effects are applied by the agent, not by the behavior, and only after the behavior
/// completes uncancelled.
pub struct Action {
    name: String,
    cost: f32,
    preconditions: WorldState,
    effects: WorldState,
    behavior: Rc<dyn BehaviorFactory>,
}

impl Action {
    pub fn new(name: impl Into<String>, behavior: impl BehaviorFactory) -> Self {
        Self {
            name: name.into(),
            cost: 1.0,
            preconditions: WorldState::new(),
            effects: WorldState::new(),
            behavior: Rc::new(behavior),
        }
    }

    /// An action whose behavior completes on its first checkpoint.
    pub fn instant(name: impl Into<String>) -> Self {
        Self::new(name, Instant::factory())
    }

    /// An action whose behavior completes after `duration_secs` of simulated time.
    pub fn timed(name: impl Into<String>, duration_secs: f32) -> Self {
        Self::new(name, Timed::factory(duration_secs))
    }

    pub fn with_cost(mut self, cost: f32) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_precondition(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.preconditions.insert(key, value);
        self
    }

    pub fn with_effect(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.effects.insert(key, value);
        self
    }

    pub fn with_preconditions(mut self, preconditions: WorldState) -> Self {
        self.preconditions = preconditions;
        self
    }

    pub fn with_effects(mut self, effects: WorldState) -> Self {
        self.effects = effects;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cost(&self) -> f32 {
        self.cost
    }

    pub fn preconditions(&self) -> &WorldState {
        &self.preconditions
    }

    pub fn effects(&self) -> &WorldState {
        &self.effects
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.is_empty() {
            return Err(ModelError::EmptyName { kind: "action" });
        }
        if !self.cost.is_finite() || self.cost <= 0.0 {
            return Err(ModelError::InvalidCost {
                action: self.name.clone(),
                cost: self.cost,
            });
        }
        Ok(())
    }

    /// Every precondition is present in `state` with an equal value. Missing keys are simply
    /// unsatisfied.
    pub fn preconditions_satisfied(&self, state: &WorldState) -> bool {
        state.satisfies(&self.preconditions)
    }

    /// Applying the effects to `state` would change at least one key.
    pub fn would_change_state(&self, state: &WorldState) -> bool {
        state.would_change(&self.effects)
    }

    /// Some effect pair equals a desired pair of `goal`.
    pub fn improves_goal(&self, goal: &Goal) -> bool {
        self.effects.shares_pair_with(goal.desired())
    }

    /// Apply the effects to a detached state (planning scratch, replay).
    pub fn apply_to(&self, state: &mut WorldState) {
        state.apply(&self.effects);
    }

    /// Start the behavior against the live store.
    pub fn begin_execution(&self, world: &WorldStore) -> ExecutionHandle {
        tracing::trace!(action = %self.name, "begin execution");
        ExecutionHandle::new(self.behavior.build(&self.name, world))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("cost", &self.cost)
            .field("preconditions", &self.preconditions)
            .field("effects", &self.effects)
            .finish_non_exhaustive()
    }
}
