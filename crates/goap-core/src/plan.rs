use std::collections::VecDeque;
use std::rc::Rc;

use crate::{Action, WorldState};

/// An ordered sequence of actions toward one goal.
///
/// Plans are produced fresh for each planning cycle and never reused: an agent turns the plan into
/// its execution queue and drops it on completion, cancellation or replanning.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    steps: Vec<Rc<Action>>,
}

impl Plan {
    pub fn new(steps: Vec<Rc<Action>>) -> Self {
        Self { steps }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Rc<Action>] {
        &self.steps
    }

    pub fn push(&mut self, action: Rc<Action>) {
        self.steps.push(action);
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|a| a.name()).collect()
    }

    pub fn total_cost(&self) -> f32 {
        self.steps.iter().map(|a| a.cost()).sum()
    }

    /// Replay every step's effects, in order, on a clone of `start`.
    pub fn simulate(&self, start: &WorldState) -> WorldState {
        let mut state = start.clone();
        for action in &self.steps {
            action.apply_to(&mut state);
        }
        state
    }

    pub fn into_queue(self) -> VecDeque<Rc<Action>> {
        self.steps.into()
    }
}

impl PartialEq for Plan {
    /// Plans are equal when they name the same actions in the same order.
    fn eq(&self, other: &Self) -> bool {
        self.steps.len() == other.steps.len()
            && self
                .steps
                .iter()
                .zip(&other.steps)
                .all(|(a, b)| Rc::ptr_eq(a, b) || a.name() == b.name())
    }
}
