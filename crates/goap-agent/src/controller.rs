use core::cell::RefCell;
use core::fmt;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

use goap_core::{
    rank_goals, Action, ActionOutcome, ExecutionHandle, Goal, ModelError, Plan, TickContext, Value,
    WorldState, WorldStore,
};
use goap_planner::Planner;
use goap_tools::{TraceEvent, TraceSink};

use crate::AgentError;

/// Controller states. `Planning` and `Replanning` are pass-through: the controller never rests in
/// them between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Planning,
    Executing,
    Replanning,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentState::Idle => "Idle",
            AgentState::Planning => "Planning",
            AgentState::Executing => "Executing",
            AgentState::Replanning => "Replanning",
        })
    }
}

/// While `alarm_key` holds `true`, `goal` is tried before any priority ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyGoal {
    pub alarm_key: String,
    pub goal: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentStats {
    /// Number of times the planner was invoked.
    pub plan_calls: u64,
    pub plans_adopted: u64,
    pub planning_failures: u64,
    pub interrupts: u64,
    pub actions_completed: u64,
    pub actions_cancelled: u64,
}

struct RunningAction {
    action: Rc<Action>,
    handle: ExecutionHandle,
}

pub(crate) type Inbox = Rc<RefCell<VecDeque<(String, Value)>>>;

/// Finite-state controller for one agent.
///
/// The controller picks a goal, plans toward it against a snapshot of the shared store, and runs
/// the plan one action at a time against the live store. Each [`tick`](Self::tick) is one
/// checkpoint for the in-flight action; when it completes uncancelled its effects are written to
/// the store (one `set` per key, in key order) and the next action starts.
///
/// Store changes reach the controller through [`handle_change`](Self::handle_change), normally
/// wired up by [`AgentHandle`](crate::AgentHandle):
/// - while `Executing`, a change to a reactive key whose value differs from the one last observed
///   cancels the in-flight action (its effects are never applied), discards the plan and replans;
/// - while `Idle`, any change wakes the agent into `Planning`.
///
/// Actions are not re-validated against the live store before they start; stale plans are only
/// corrected through reactive keys.
pub struct AgentController {
    name: String,
    store: WorldStore,
    planner: Planner,
    actions: Vec<Rc<Action>>,
    goals: Vec<Goal>,
    reactive_keys: BTreeSet<String>,
    emergency: Option<EmergencyGoal>,

    state: AgentState,
    current_goal: Option<String>,
    queue: VecDeque<Rc<Action>>,
    running: Option<RunningAction>,
    last_observed: BTreeMap<String, Value>,
    inbox: Inbox,

    tick: u64,
    trace: Option<Box<dyn TraceSink>>,
    stats: AgentStats,
}

impl AgentController {
    pub fn builder(name: impl Into<String>, store: &WorldStore) -> AgentBuilder {
        AgentBuilder::new(name, store)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn actions(&self) -> &[Rc<Action>] {
        &self.actions
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn reactive_keys(&self) -> impl Iterator<Item = &str> {
        self.reactive_keys.iter().map(String::as_str)
    }

    pub fn emergency(&self) -> Option<&EmergencyGoal> {
        self.emergency.as_ref()
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn stats(&self) -> AgentStats {
        self.stats
    }

    /// Name of the goal the current plan works toward.
    pub fn current_goal(&self) -> Option<&str> {
        self.current_goal.as_deref()
    }

    /// Name of the in-flight action.
    pub fn current_action(&self) -> Option<&str> {
        self.running.as_ref().map(|r| r.action.name())
    }

    /// Names of the queued actions after the in-flight one.
    pub fn remaining_plan(&self) -> Vec<&str> {
        self.queue.iter().map(|a| a.name()).collect()
    }

    /// Value last observed for a reactive key.
    pub fn last_observed(&self, key: &str) -> Option<&Value> {
        self.last_observed.get(key)
    }

    pub(crate) fn inbox(&self) -> Inbox {
        Rc::clone(&self.inbox)
    }

    /// Record the current values of the reactive keys and make the first planning pass.
    pub fn start(&mut self) {
        let snapshot = self.store.snapshot();
        self.last_observed = self
            .reactive_keys
            .iter()
            .filter_map(|key| snapshot.get(key).map(|v| (key.clone(), v.clone())))
            .collect();
        tracing::debug!(agent = %self.name, "agent started");
        self.enter_planning();
    }

    /// Idle -> Planning. Does nothing in any other state.
    pub fn wake(&mut self) {
        if self.state == AgentState::Idle {
            self.trace("agent.wake", "");
            self.enter_planning();
        }
    }

    /// Cancel whatever is in flight, drop the plan and go Idle.
    ///
    /// Notifications raised by the cancelled behavior's cleanup are dropped rather than waking the
    /// agent again.
    pub fn stop(&mut self) {
        self.cancel_running();
        self.queue.clear();
        self.inbox.borrow_mut().clear();
        self.current_goal = None;
        if self.state != AgentState::Idle {
            self.set_state(AgentState::Idle);
        }
    }

    /// One control-loop tick: a checkpoint for the in-flight action.
    pub fn tick(&mut self, ctx: &TickContext) {
        self.tick = ctx.tick;

        if self.state == AgentState::Executing {
            if let Some(running) = self.running.as_mut() {
                match running.handle.checkpoint(ctx, &self.store) {
                    None => {}
                    Some(ActionOutcome::Completed) => {
                        // A reactive change queued during the final checkpoint cancels the action
                        // before any effect is written.
                        if !self.drain_inbox() {
                            self.complete_running();
                        }
                    }
                    Some(ActionOutcome::Cancelled) => self.abandon_cancelled(),
                }
            }
        }

        self.drain_inbox();
    }

    /// React to a store change, then to anything that queued up while this agent was busy.
    pub fn handle_change(&mut self, key: &str, value: &Value) {
        self.observe(key, value);
        self.drain_inbox();
    }

    /// Returns whether the change moved the agent out of its state.
    fn observe(&mut self, key: &str, value: &Value) -> bool {
        let reactive_change = self.reactive_keys.contains(key)
            && self.last_observed.insert(key.to_owned(), value.clone()).as_ref() != Some(value);

        match self.state {
            AgentState::Executing if reactive_change => {
                self.interrupt(key, value);
                true
            }
            AgentState::Idle => {
                self.trace("agent.wake", key);
                self.enter_planning();
                true
            }
            _ => false,
        }
    }

    fn drain_inbox(&mut self) -> bool {
        let mut moved = false;
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            let Some((key, value)) = next else {
                break;
            };
            moved |= self.observe(&key, &value);
        }
        moved
    }

    fn interrupt(&mut self, key: &str, value: &Value) {
        self.stats.interrupts += 1;
        tracing::info!(agent = %self.name, key, value = %value, "reactive key changed; replanning");
        self.trace("agent.interrupt", format!("{key}={value}"));

        self.cancel_running();
        self.queue.clear();
        self.current_goal = None;
        self.set_state(AgentState::Replanning);
        self.enter_planning();
    }

    fn cancel_running(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        running.handle.request_cancel(&self.store);
        self.stats.actions_cancelled += 1;
        tracing::debug!(agent = %self.name, action = running.action.name(), "action cancelled");
        self.trace("agent.action.cancel", running.action.name());
    }

    /// The handle finished as cancelled without the controller asking (someone else holds the
    /// token). Treated like an interrupt: nothing is applied and the agent replans.
    fn abandon_cancelled(&mut self) {
        if let Some(running) = self.running.take() {
            self.stats.actions_cancelled += 1;
            self.trace("agent.action.cancel", running.action.name());
        }
        self.queue.clear();
        self.current_goal = None;
        self.set_state(AgentState::Replanning);
        self.enter_planning();
    }

    fn complete_running(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let action = running.action;

        // Our own notifications land in the inbox while we are borrowed; other agents react
        // synchronously inside each `set`.
        for (key, value) in action.effects() {
            self.store.set(key.clone(), value.clone());
        }

        self.stats.actions_completed += 1;
        tracing::info!(agent = %self.name, action = action.name(), "action completed");
        self.trace("agent.action.complete", action.name());

        if self.drain_inbox() {
            return;
        }

        if self.queue.is_empty() {
            self.current_goal = None;
            self.enter_planning();
        } else {
            self.begin_next();
        }
    }

    fn enter_planning(&mut self) {
        self.set_state(AgentState::Planning);

        let snapshot = self.store.snapshot();
        match self.select_plan(&snapshot) {
            Some((goal, plan)) => self.adopt(goal, plan),
            None => {
                self.current_goal = None;
                self.trace("agent.plan.none", "");
                self.set_state(AgentState::Idle);
            }
        }
    }

    fn select_plan(&mut self, snapshot: &WorldState) -> Option<(usize, Plan)> {
        if let Some(found) = self.emergency_plan(snapshot) {
            return Some(found);
        }

        for goal in rank_goals(&self.goals) {
            if let Some(plan) = self.try_plan(goal, snapshot) {
                return Some((goal, plan));
            }
        }
        None
    }

    fn emergency_plan(&mut self, snapshot: &WorldState) -> Option<(usize, Plan)> {
        let goal = {
            let emergency = self.emergency.as_ref()?;
            if !snapshot
                .get(&emergency.alarm_key)
                .is_some_and(Value::is_true)
            {
                return None;
            }
            self.goals
                .iter()
                .position(|g| g.name() == emergency.goal)?
        };

        let name = self.goals[goal].name().to_owned();
        tracing::info!(agent = %self.name, goal = %name, "alarm raised; trying emergency goal");
        self.trace("agent.emergency", name);
        self.try_plan(goal, snapshot).map(|plan| (goal, plan))
    }

    /// A usable plan is non-empty; a satisfied goal has nothing to execute.
    fn try_plan(&mut self, goal: usize, snapshot: &WorldState) -> Option<Plan> {
        self.stats.plan_calls += 1;
        let name = self.goals[goal].name().to_owned();
        self.trace("agent.plan.call", name.clone());

        match self.planner.plan(snapshot, &self.actions, &self.goals[goal]) {
            Ok(plan) if !plan.is_empty() => Some(plan),
            Ok(_) => {
                tracing::debug!(agent = %self.name, goal = %name, "goal already satisfied");
                None
            }
            Err(err) => {
                self.stats.planning_failures += 1;
                tracing::debug!(agent = %self.name, error = %err, "goal skipped");
                None
            }
        }
    }

    fn adopt(&mut self, goal: usize, plan: Plan) {
        let name = self.goals[goal].name().to_owned();
        let steps = plan.names().join(", ");
        self.stats.plans_adopted += 1;
        tracing::info!(agent = %self.name, goal = %name, plan = %steps, "plan adopted");
        self.trace("agent.plan.adopt", format!("{name}: [{steps}]"));

        self.current_goal = Some(name);
        self.queue = plan.into_queue();
        self.set_state(AgentState::Executing);
        self.begin_next();
    }

    fn begin_next(&mut self) {
        let Some(action) = self.queue.pop_front() else {
            self.enter_planning();
            return;
        };
        self.trace("agent.action.begin", action.name());
        let handle = action.begin_execution(&self.store);
        self.running = Some(RunningAction { action, handle });
    }

    fn set_state(&mut self, next: AgentState) {
        let prev = self.state;
        self.state = next;
        tracing::debug!(agent = %self.name, from = %prev, to = %next, "state transition");
        self.trace("agent.state", format!("{prev}->{next}"));
    }

    fn trace(&mut self, tag: &'static str, detail: impl Into<String>) {
        if let Some(sink) = self.trace.as_mut() {
            sink.emit(
                TraceEvent::new(self.tick, tag)
                    .with_agent(self.name.clone())
                    .with_detail(detail),
            );
        }
    }
}

impl fmt::Debug for AgentController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentController")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("current_goal", &self.current_goal)
            .field("current_action", &self.current_action())
            .field("remaining_plan", &self.remaining_plan())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Assembles and validates an [`AgentController`].
pub struct AgentBuilder {
    name: String,
    store: WorldStore,
    planner: Planner,
    actions: Vec<Action>,
    goals: Vec<Goal>,
    reactive_keys: BTreeSet<String>,
    emergency: Option<EmergencyGoal>,
    trace: Option<Box<dyn TraceSink>>,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>, store: &WorldStore) -> Self {
        Self {
            name: name.into(),
            store: store.clone(),
            planner: Planner::new(),
            actions: Vec::new(),
            goals: Vec::new(),
            reactive_keys: BTreeSet::new(),
            emergency: None,
            trace: None,
        }
    }

    pub fn planner(mut self, planner: Planner) -> Self {
        self.planner = planner;
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn goal(mut self, goal: Goal) -> Self {
        self.goals.push(goal);
        self
    }

    pub fn goals(mut self, goals: impl IntoIterator<Item = Goal>) -> Self {
        self.goals.extend(goals);
        self
    }

    pub fn reactive_key(mut self, key: impl Into<String>) -> Self {
        self.reactive_keys.insert(key.into());
        self
    }

    pub fn emergency(mut self, alarm_key: impl Into<String>, goal: impl Into<String>) -> Self {
        self.emergency = Some(EmergencyGoal {
            alarm_key: alarm_key.into(),
            goal: goal.into(),
        });
        self
    }

    pub fn trace(mut self, sink: impl TraceSink + 'static) -> Self {
        self.trace = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Result<AgentController, AgentError> {
        if self.name.is_empty() {
            return Err(ModelError::EmptyName { kind: "agent" }.into());
        }

        let mut action_names = BTreeSet::new();
        for action in &self.actions {
            action.validate()?;
            if !action_names.insert(action.name()) {
                return Err(ModelError::DuplicateAction(action.name().to_owned()).into());
            }
        }

        let mut goal_names = BTreeSet::new();
        for goal in &self.goals {
            goal.validate()?;
            if !goal_names.insert(goal.name()) {
                return Err(ModelError::DuplicateGoal(goal.name().to_owned()).into());
            }
        }

        if let Some(emergency) = &self.emergency {
            if !goal_names.contains(emergency.goal.as_str()) {
                return Err(AgentError::UnknownEmergencyGoal {
                    agent: self.name,
                    goal: emergency.goal.clone(),
                });
            }
        }

        Ok(AgentController {
            name: self.name,
            store: self.store,
            planner: self.planner,
            actions: self.actions.into_iter().map(Rc::new).collect(),
            goals: self.goals,
            reactive_keys: self.reactive_keys,
            emergency: self.emergency,
            state: AgentState::Idle,
            current_goal: None,
            queue: VecDeque::new(),
            running: None,
            last_observed: BTreeMap::new(),
            inbox: Rc::default(),
            tick: 0,
            trace: self.trace,
            stats: AgentStats::default(),
        })
    }
}
