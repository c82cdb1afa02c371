use goap_core::{TickContext, WorldStore};

use crate::{AgentController, AgentError, AgentHandle};

/// Drives a set of agents sharing one [`WorldStore`] with a fixed step.
///
/// Agents are ticked in spawn order. Store writes made during a tick reach every subscribed agent
/// before the writing agent's tick returns.
#[derive(Debug)]
pub struct Simulation {
    store: WorldStore,
    agents: Vec<AgentHandle>,
    ctx: TickContext,
}

impl Simulation {
    pub fn new(store: WorldStore, dt_seconds: f32) -> Self {
        Self {
            store,
            agents: Vec::new(),
            ctx: TickContext::new(0, dt_seconds),
        }
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    /// The number of completed steps.
    pub fn tick(&self) -> u64 {
        self.ctx.tick
    }

    pub fn dt_seconds(&self) -> f32 {
        self.ctx.dt_seconds
    }

    pub fn agents(&self) -> &[AgentHandle] {
        &self.agents
    }

    pub fn agent(&self, name: &str) -> Option<&AgentHandle> {
        self.agents.iter().find(|a| a.name() == name)
    }

    /// Subscribe `controller` and make its first planning pass.
    pub fn spawn(&mut self, controller: AgentController) -> Result<&AgentHandle, AgentError> {
        if !controller.store().same_store(&self.store) {
            return Err(AgentError::ForeignStore {
                agent: controller.name().to_owned(),
            });
        }
        if self.agent(controller.name()).is_some() {
            return Err(AgentError::DuplicateAgent(controller.name().to_owned()));
        }

        tracing::debug!(agent = controller.name(), tick = self.ctx.tick, "spawning agent");
        let index = self.agents.len();
        self.agents.push(AgentHandle::spawn(controller));
        Ok(&self.agents[index])
    }

    /// Tick every agent once. Returns the context the agents saw.
    pub fn step(&mut self) -> TickContext {
        let ctx = self.ctx;
        for agent in &self.agents {
            agent.tick(&ctx);
        }
        self.ctx = ctx.next();
        ctx
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Step until `done` holds for the store, at most `max_ticks` times. Returns the number of steps
    /// taken, or `None` if `done` never held.
    pub fn run_until(
        &mut self,
        max_ticks: u64,
        mut done: impl FnMut(&WorldStore) -> bool,
    ) -> Option<u64> {
        for taken in 0..=max_ticks {
            if done(&self.store) {
                return Some(taken);
            }
            if taken == max_ticks {
                break;
            }
            self.step();
        }
        None
    }
}
