use std::rc::Rc;

use goap_core::{Action, Goal, Plan, WorldState};
use thiserror::Error;

pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// No plan toward `goal` was found.
///
/// Raised both when the search runs out of applicable actions and when it exhausts the iteration
/// budget; callers cannot tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no plan found for goal `{goal}`")]
pub struct PlanningFailure {
    pub goal: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Maximum number of actions selected in one search.
    pub max_iterations: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Greedy forward-chaining planner.
///
/// Starting from a clone of the live state, each iteration picks one applicable action that
/// changes the state, preferring actions with an effect that matches a desired pair of the goal,
/// then lower cost, then earlier position in `actions`. The pick is applied to the scratch state
/// and the loop stops as soon as the goal holds. There is no backtracking: the first plan found is
/// returned, which is not necessarily the cheapest.
///
/// Actions whose effects are already in place are never picked, so a plan that needs to re-assert
/// a value the scratch state already holds cannot be found.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> PlannerConfig {
        self.config
    }

    /// Plan toward `goal` from a snapshot of the live state.
    ///
    /// An already-satisfied goal yields an empty plan, not a failure.
    pub fn plan(
        &self,
        live: &WorldState,
        actions: &[Rc<Action>],
        goal: &Goal,
    ) -> Result<Plan, PlanningFailure> {
        let mut scratch = live.clone();
        let mut plan = Plan::empty();

        if goal.is_satisfied_by(&scratch) {
            tracing::debug!(goal = goal.name(), "goal already satisfied");
            return Ok(plan);
        }

        for iteration in 1..=self.config.max_iterations {
            let Some(action) = self.select_next(&scratch, actions, goal) else {
                tracing::warn!(
                    goal = goal.name(),
                    iteration,
                    "no applicable action; planning failed"
                );
                return Err(self.failure(goal));
            };

            action.apply_to(&mut scratch);
            plan.push(Rc::clone(action));

            if goal.is_satisfied_by(&scratch) {
                tracing::debug!(
                    goal = goal.name(),
                    steps = plan.len(),
                    plan = ?plan.names(),
                    "plan found"
                );
                return Ok(plan);
            }
        }

        tracing::warn!(
            goal = goal.name(),
            max_iterations = self.config.max_iterations,
            "iteration cap reached; planning failed"
        );
        Err(self.failure(goal))
    }

    /// The action the search would pick next from `state`, if any.
    pub fn select_next<'a>(
        &self,
        state: &WorldState,
        actions: &'a [Rc<Action>],
        goal: &Goal,
    ) -> Option<&'a Rc<Action>> {
        let mut best_improving: Option<&'a Rc<Action>> = None;
        let mut best_neutral: Option<&'a Rc<Action>> = None;

        for action in actions {
            if !action.preconditions_satisfied(state) || !action.would_change_state(state) {
                continue;
            }

            let slot = if action.improves_goal(goal) {
                &mut best_improving
            } else {
                &mut best_neutral
            };

            // Strict less-than: on equal cost the earlier action stays selected.
            let replace = match *slot {
                Some(best) => action.cost() < best.cost(),
                None => true,
            };
            if replace {
                *slot = Some(action);
            }
        }

        best_improving.or(best_neutral)
    }

    fn failure(&self, goal: &Goal) -> PlanningFailure {
        PlanningFailure {
            goal: goal.name().to_owned(),
        }
    }
}
