//! Scenario configuration loading.

use std::path::Path;

use anyhow::{Context, Result};
use goap_core::{Action, Goal, WorldState, WorldStore};
use goap_planner::{Planner, PlannerConfig, DEFAULT_MAX_ITERATIONS};
use goap_tools::TraceLog;
use serde::{Deserialize, Serialize};

use crate::{AgentBuilder, AgentController, AgentError, Simulation};

/// A complete scenario: planner settings, the initial store seed and the agents sharing it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub planner: PlannerSection,

    pub tick: TickSection,

    /// Initial store contents, written before any agent subscribes.
    pub seed: WorldState,

    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSection {
    /// Simulated seconds per tick
    #[serde(default = "default_dt_seconds")]
    pub dt_seconds: f32,
}

impl Default for TickSection {
    fn default() -> Self {
        Self {
            dt_seconds: default_dt_seconds(),
        }
    }
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}
fn default_dt_seconds() -> f32 {
    0.1
}
fn default_cost() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,

    /// Goals in declaration order; ties in priority keep this order.
    #[serde(default)]
    pub goals: Vec<GoalConfig>,

    #[serde(default)]
    pub actions: Vec<ActionConfig>,

    #[serde(default)]
    pub reactive_keys: Vec<String>,

    #[serde(default)]
    pub emergency: Option<EmergencyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    pub name: String,
    #[serde(default)]
    pub priority: f32,
    #[serde(default)]
    pub desired: WorldState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    pub name: String,

    #[serde(default = "default_cost")]
    pub cost: f32,

    #[serde(default)]
    pub preconditions: WorldState,

    #[serde(default)]
    pub effects: WorldState,

    /// Simulated seconds the action takes; zero completes on the first tick.
    #[serde(default)]
    pub duration_secs: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    pub alarm_key: String,
    pub goal: String,
}

impl GoalConfig {
    pub fn to_goal(&self) -> Goal {
        Goal::new(self.name.clone(), self.priority).with_desired_state(self.desired.clone())
    }
}

impl ActionConfig {
    pub fn to_action(&self) -> Action {
        Action::timed(self.name.clone(), self.duration_secs)
            .with_cost(self.cost)
            .with_preconditions(self.preconditions.clone())
            .with_effects(self.effects.clone())
    }
}

impl AgentConfig {
    pub fn goals(&self) -> Vec<Goal> {
        self.goals.iter().map(GoalConfig::to_goal).collect()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.iter().map(ActionConfig::to_action).collect()
    }

    pub fn builder(&self, store: &WorldStore, planner: Planner) -> AgentBuilder {
        let mut builder = AgentBuilder::new(self.name.clone(), store)
            .planner(planner)
            .actions(self.actions())
            .goals(self.goals());
        for key in &self.reactive_keys {
            builder = builder.reactive_key(key.clone());
        }
        if let Some(emergency) = &self.emergency {
            builder = builder.emergency(emergency.alarm_key.clone(), emergency.goal.clone());
        }
        builder
    }
}

impl ScenarioConfig {
    /// Load a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario from {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse scenario from {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn planner(&self) -> Planner {
        Planner::new().with_config(PlannerConfig {
            max_iterations: self.planner.max_iterations,
        })
    }

    pub fn agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// A fresh store holding the seed.
    pub fn store(&self) -> WorldStore {
        WorldStore::with_seed(self.seed.clone())
    }

    /// Build one agent against `store` without spawning it.
    pub fn controller(
        &self,
        agent: &AgentConfig,
        store: &WorldStore,
    ) -> Result<AgentController, AgentError> {
        agent.builder(store, self.planner()).build()
    }

    /// Seed a store and spawn every agent, in declaration order.
    pub fn build(&self) -> Result<Simulation, AgentError> {
        self.build_with(|builder| builder)
    }

    /// Like [`build`](Self::build), recording every agent's trace events into `log`.
    pub fn build_traced(&self, log: &TraceLog) -> Result<Simulation, AgentError> {
        self.build_with(|builder| builder.trace(log.clone()))
    }

    fn build_with(
        &self,
        mut customize: impl FnMut(AgentBuilder) -> AgentBuilder,
    ) -> Result<Simulation, AgentError> {
        let store = self.store();
        let mut simulation = Simulation::new(store.clone(), self.tick.dt_seconds);
        for agent in &self.agents {
            let controller = customize(agent.builder(&store, self.planner())).build()?;
            simulation.spawn(controller)?;
        }
        tracing::debug!(agents = self.agents.len(), "scenario built");
        Ok(simulation)
    }
}
