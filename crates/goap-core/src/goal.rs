use crate::{ModelError, Value, WorldState};

/// A named, prioritized desired-state target. Higher priority is preferred.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    name: String,
    priority: f32,
    desired: WorldState,
}

impl Goal {
    pub fn new(name: impl Into<String>, priority: f32) -> Self {
        Self {
            name: name.into(),
            priority,
            desired: WorldState::new(),
        }
    }

    pub fn with_desired(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.desired.insert(key, value);
        self
    }

    pub fn with_desired_state(mut self, desired: WorldState) -> Self {
        self.desired = desired;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> f32 {
        self.priority
    }

    pub fn desired(&self) -> &WorldState {
        &self.desired
    }

    pub fn is_satisfied_by(&self, state: &WorldState) -> bool {
        state.satisfies(&self.desired)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.is_empty() {
            return Err(ModelError::EmptyName { kind: "goal" });
        }
        Ok(())
    }
}

/// Indices into `goals`, highest priority first. Ties keep their order in `goals`.
pub fn rank_goals(goals: &[Goal]) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..goals.len()).collect();
    ranked.sort_by(|&a, &b| goals[b].priority.total_cmp(&goals[a].priority));
    ranked
}
