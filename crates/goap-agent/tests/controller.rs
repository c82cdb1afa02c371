use std::cell::Cell;
use std::rc::Rc;

use goap_agent::{AgentBuilder, AgentController, AgentError, AgentHandle, AgentState};
use goap_core::{
    Action, Behavior, BehaviorStatus, CancelToken, Goal, ModelError, TickContext, Value,
    WorldState, WorldStore,
};
use goap_tools::TraceLog;

fn ctx(tick: u64) -> TickContext {
    TickContext::new(tick, 0.1)
}

fn spawn(builder: AgentBuilder) -> AgentHandle {
    AgentHandle::spawn(builder.build().expect("valid agent"))
}

/// Never finishes on its own; counts cancel hook calls.
struct Digging {
    cancels: Rc<Cell<u32>>,
}

impl Behavior for Digging {
    fn tick(
        &mut self,
        _ctx: &TickContext,
        _world: &WorldStore,
        _cancel: &CancelToken,
    ) -> BehaviorStatus {
        BehaviorStatus::Running
    }

    fn cancel(&mut self, world: &WorldStore) {
        self.cancels.set(self.cancels.get() + 1);
        world.set("shovelDropped", true);
    }
}

fn dig(cancels: &Rc<Cell<u32>>) -> Action {
    let cancels = Rc::clone(cancels);
    Action::new("Dig", move |_: &str, _: &WorldStore| -> Box<dyn Behavior> {
        Box::new(Digging {
            cancels: Rc::clone(&cancels),
        })
    })
    .with_effect("dug", true)
}

#[test]
fn runs_plan_to_completion_then_idles() {
    let store = WorldStore::with_seed(
        WorldState::new()
            .with("hasFood", false)
            .with("hungry", true),
    );
    let log = TraceLog::new();
    let agent = spawn(
        AgentController::builder("eater", &store)
            .action(Action::instant("GetFood").with_effect("hasFood", true))
            .action(
                Action::instant("Eat")
                    .with_precondition("hasFood", true)
                    .with_effect("hungry", false),
            )
            .goal(Goal::new("Eat", 1.0).with_desired("hungry", false))
            .trace(log.clone()),
    );

    assert_eq!(agent.state(), AgentState::Executing);
    assert_eq!(agent.borrow().current_goal(), Some("Eat"));
    assert_eq!(agent.borrow().current_action(), Some("GetFood"));
    assert_eq!(agent.borrow().remaining_plan(), vec!["Eat"]);

    agent.tick(&ctx(0));
    assert_eq!(store.get("hasFood"), Some(Value::Bool(true)));
    assert_eq!(agent.borrow().current_action(), Some("Eat"));

    agent.tick(&ctx(1));
    assert_eq!(store.get("hungry"), Some(Value::Bool(false)));
    assert_eq!(agent.state(), AgentState::Idle);
    assert_eq!(agent.borrow().current_goal(), None);

    let stats = agent.borrow().stats();
    assert_eq!(stats.actions_completed, 2);
    assert_eq!(stats.plans_adopted, 1);
    assert_eq!(stats.plan_calls, 2);

    let transitions: Vec<String> = log
        .events()
        .into_iter()
        .filter(|e| e.tag == "agent.state")
        .map(|e| e.detail)
        .collect();
    assert_eq!(
        transitions,
        vec![
            "Idle->Planning",
            "Planning->Executing",
            "Executing->Planning",
            "Planning->Idle",
        ]
    );
}

#[test]
fn non_reactive_change_leaves_execution_alone() {
    let store = WorldStore::with_seed(WorldState::new().with("danger", false));
    let agent = spawn(
        AgentController::builder("guard", &store)
            .action(Action::timed("Patrol", 10.0).with_effect("patrolled", true))
            .goal(Goal::new("Patrol", 1.0).with_desired("patrolled", true))
            .reactive_key("danger"),
    );
    agent.tick(&ctx(0));

    store.set("weather", "rain");
    store.set("danger", false);

    assert_eq!(agent.state(), AgentState::Executing);
    assert_eq!(agent.borrow().current_action(), Some("Patrol"));
    assert_eq!(agent.borrow().stats().interrupts, 0);
}

#[test]
fn reactive_change_cancels_and_replans_without_effects() {
    let store = WorldStore::with_seed(WorldState::new().with("danger", false));
    let log = TraceLog::new();
    let agent = spawn(
        AgentController::builder("villager", &store)
            .action(Action::timed("Patrol", 10.0).with_effect("patrolled", true))
            .action(
                Action::instant("Flee")
                    .with_precondition("danger", true)
                    .with_effect("safe", true),
            )
            .goal(Goal::new("Patrol", 1.0).with_desired("patrolled", true))
            .goal(Goal::new("Flee", 10.0).with_desired("safe", true))
            .reactive_key("danger")
            .trace(log.clone()),
    );

    // Flee is ranked first but unreachable until danger appears.
    assert_eq!(agent.borrow().current_goal(), Some("Patrol"));
    assert_eq!(agent.borrow().stats().planning_failures, 1);
    agent.tick(&ctx(0));

    store.set("danger", true);

    {
        let controller = agent.borrow();
        assert_eq!(controller.state(), AgentState::Executing);
        assert_eq!(controller.current_goal(), Some("Flee"));
        assert_eq!(controller.current_action(), Some("Flee"));
        assert_eq!(controller.last_observed("danger"), Some(&Value::Bool(true)));
        let stats = controller.stats();
        assert_eq!(stats.interrupts, 1);
        assert_eq!(stats.actions_cancelled, 1);
    }
    assert!(log.contains_tag("agent.interrupt"));
    assert!(log.contains_tag("agent.action.cancel"));

    agent.tick(&ctx(1));
    assert!(store.is_true("safe"));
    assert_eq!(store.get("patrolled"), None);
}

#[test]
fn emergency_goal_bypasses_priority_order() {
    let store = WorldStore::with_seed(WorldState::new().with("alarm", true));
    let log = TraceLog::new();
    let agent = spawn(
        AgentController::builder("worker", &store)
            .action(Action::instant("Work").with_effect("worked", true))
            .action(Action::instant("Hide").with_effect("hidden", true))
            .goal(Goal::new("Work", 5.0).with_desired("worked", true))
            .goal(Goal::new("Hide", 1.0).with_desired("hidden", true))
            .emergency("alarm", "Hide")
            .trace(log.clone()),
    );

    assert_eq!(agent.borrow().current_goal(), Some("Hide"));
    assert_eq!(agent.borrow().stats().plan_calls, 1);
    assert!(log.contains_tag("agent.emergency"));
}

#[test]
fn satisfied_emergency_goal_falls_back_to_normal_selection() {
    let store = WorldStore::with_seed(
        WorldState::new()
            .with("alarm", true)
            .with("hidden", true),
    );
    let agent = spawn(
        AgentController::builder("worker", &store)
            .action(Action::instant("Work").with_effect("worked", true))
            .action(Action::instant("Hide").with_effect("hidden", true))
            .goal(Goal::new("Work", 5.0).with_desired("worked", true))
            .goal(Goal::new("Hide", 1.0).with_desired("hidden", true))
            .emergency("alarm", "Hide"),
    );

    assert_eq!(agent.borrow().current_goal(), Some("Work"));
    assert_eq!(agent.borrow().stats().plan_calls, 2);
}

#[test]
fn quiet_alarm_uses_priority_order() {
    let store = WorldStore::with_seed(WorldState::new().with("alarm", false));
    let log = TraceLog::new();
    let agent = spawn(
        AgentController::builder("worker", &store)
            .action(Action::instant("Work").with_effect("worked", true))
            .action(Action::instant("Hide").with_effect("hidden", true))
            .goal(Goal::new("Work", 5.0).with_desired("worked", true))
            .goal(Goal::new("Hide", 1.0).with_desired("hidden", true))
            .emergency("alarm", "Hide")
            .trace(log.clone()),
    );

    assert_eq!(agent.borrow().current_goal(), Some("Work"));
    assert!(!log.contains_tag("agent.emergency"));
}

#[test]
fn idle_agent_wakes_on_any_change() {
    let store = WorldStore::with_seed(WorldState::new().with("door", "closed"));
    let agent = spawn(
        AgentController::builder("visitor", &store)
            .action(
                Action::instant("Enter")
                    .with_precondition("door", "open")
                    .with_effect("inside", true),
            )
            .goal(Goal::new("Enter", 1.0).with_desired("inside", true)),
    );
    assert_eq!(agent.state(), AgentState::Idle);

    agent.wake();
    assert_eq!(agent.state(), AgentState::Idle);
    assert_eq!(agent.borrow().stats().plan_calls, 2);

    store.set("door", "open");
    assert_eq!(agent.state(), AgentState::Executing);
    assert_eq!(agent.borrow().current_action(), Some("Enter"));
}

#[test]
fn own_effect_on_reactive_key_interrupts_after_completion() {
    let store = WorldStore::with_seed(WorldState::new().with("noise", false));
    let agent = spawn(
        AgentController::builder("sleeper", &store)
            .action(
                Action::instant("Stretch")
                    .with_effect("noise", true)
                    .with_effect("stretched", true),
            )
            .action(
                Action::instant("Sleep")
                    .with_precondition("stretched", true)
                    .with_effect("rested", true),
            )
            .goal(Goal::new("Rest", 1.0).with_desired("rested", true))
            .reactive_key("noise"),
    );
    assert_eq!(agent.borrow().remaining_plan(), vec!["Sleep"]);

    agent.tick(&ctx(0));

    let controller = agent.borrow();
    let stats = controller.stats();
    assert!(store.is_true("stretched"));
    assert_eq!(stats.actions_completed, 1);
    assert_eq!(stats.actions_cancelled, 0);
    assert_eq!(stats.interrupts, 1);
    assert_eq!(stats.plans_adopted, 2);
    assert_eq!(controller.current_action(), Some("Sleep"));
    assert!(controller.remaining_plan().is_empty());
}

#[test]
fn stop_cancels_in_flight_action() {
    let store = WorldStore::new();
    let cancels = Rc::new(Cell::new(0));
    let agent = spawn(
        AgentController::builder("miner", &store)
            .action(dig(&cancels))
            .goal(Goal::new("Dig", 1.0).with_desired("dug", true)),
    );
    agent.tick(&ctx(0));
    assert_eq!(agent.borrow().current_action(), Some("Dig"));

    agent.stop();
    assert_eq!(agent.state(), AgentState::Idle);
    assert_eq!(cancels.get(), 1);
    assert!(store.is_true("shovelDropped"));

    for tick in 1..5 {
        agent.tick(&ctx(tick));
    }
    assert_eq!(agent.state(), AgentState::Idle);
    assert_eq!(store.get("dug"), None);
    assert_eq!(agent.borrow().stats().actions_cancelled, 1);
}

#[test]
fn cancel_hook_runs_once_on_interrupt() {
    let store = WorldStore::with_seed(WorldState::new().with("quake", false));
    let cancels = Rc::new(Cell::new(0));
    let agent = spawn(
        AgentController::builder("miner", &store)
            .action(dig(&cancels).with_precondition("quake", false))
            .goal(Goal::new("Dig", 1.0).with_desired("dug", true))
            .reactive_key("quake"),
    );

    store.set("quake", true);

    assert_eq!(cancels.get(), 1);
    assert_eq!(agent.state(), AgentState::Idle);
    assert_eq!(store.get("dug"), None);
}

#[test]
fn externally_cancelled_action_is_discarded() {
    let store = WorldStore::new();
    let agent = spawn(
        AgentController::builder("flaky", &store)
            .action(
                Action::new("Flake", |_: &str, _: &WorldStore| -> Box<dyn Behavior> {
                    Box::new(goap_core::FnBehavior(
                        |_: &TickContext, _: &WorldStore, cancel: &CancelToken| {
                            cancel.cancel();
                            BehaviorStatus::Running
                        },
                    ))
                })
                .with_effect("done", true),
            )
            .goal(Goal::new("Done", 1.0).with_desired("done", true)),
    );

    agent.tick(&ctx(0));
    assert_eq!(agent.borrow().stats().actions_cancelled, 0);

    agent.tick(&ctx(1));
    let stats = agent.borrow().stats();
    assert_eq!(stats.actions_cancelled, 1);
    assert_eq!(stats.plans_adopted, 2);
    assert_eq!(agent.state(), AgentState::Executing);
    assert_eq!(store.get("done"), None);
}

#[test]
fn reactive_change_during_final_checkpoint_suppresses_effects() {
    let store = WorldStore::with_seed(WorldState::new().with("danger", false));
    let agent = spawn(
        AgentController::builder("sentry", &store)
            .action(
                Action::new("Patrol", |_: &str, _: &WorldStore| -> Box<dyn Behavior> {
                    Box::new(goap_core::FnBehavior(
                        |_: &TickContext, world: &WorldStore, _: &CancelToken| {
                            world.set("footstep", true);
                            BehaviorStatus::Completed
                        },
                    ))
                })
                .with_precondition("danger", false)
                .with_effect("patrolled", true),
            )
            .goal(Goal::new("Patrol", 1.0).with_desired("patrolled", true))
            .reactive_key("danger"),
    );

    // Raises the alarm in response to the footstep, while the sentry is still mid-tick.
    let alarm = store.clone();
    store.subscribe(move |key, _| {
        if key == "footstep" {
            alarm.set("danger", true);
        }
    });

    agent.tick(&ctx(0));

    assert!(store.is_true("danger"));
    assert_eq!(store.get("patrolled"), None);
    let stats = agent.borrow().stats();
    assert_eq!(stats.interrupts, 1);
    assert_eq!(stats.actions_completed, 0);
    assert_eq!(stats.actions_cancelled, 1);
    assert_eq!(agent.state(), AgentState::Idle);
}

#[test]
fn wake_and_stop_from_own_notification_are_skipped() {
    let store = WorldStore::new();
    let agent = Rc::new(spawn(
        AgentController::builder("bellringer", &store)
            .action(
                Action::new("Ring", |_: &str, _: &WorldStore| -> Box<dyn Behavior> {
                    Box::new(goap_core::FnBehavior(
                        |_: &TickContext, world: &WorldStore, _: &CancelToken| {
                            world.set("bell", true);
                            BehaviorStatus::Running
                        },
                    ))
                })
                .with_effect("rung", true),
            )
            .goal(Goal::new("Ring", 1.0).with_desired("rung", true)),
    ));

    let weak = Rc::downgrade(&agent);
    store.subscribe(move |key, _| {
        if key == "bell" {
            if let Some(agent) = weak.upgrade() {
                agent.stop();
                agent.wake();
            }
        }
    });

    agent.tick(&ctx(0));

    assert_eq!(agent.state(), AgentState::Executing);
    assert_eq!(agent.borrow().current_action(), Some("Ring"));
    assert_eq!(agent.borrow().stats().actions_cancelled, 0);
}

#[test]
fn dropping_the_handle_unsubscribes() {
    let store = WorldStore::new();
    let agent = spawn(AgentController::builder("ghost", &store));
    assert_eq!(store.subscriber_count(), 1);
    drop(agent);
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn builder_rejects_invalid_models() {
    let store = WorldStore::new();

    let err = AgentController::builder("a", &store)
        .action(Action::instant("Dup"))
        .action(Action::instant("Dup"))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Model(ModelError::DuplicateAction(ref name)) if name == "Dup"
    ));

    let err = AgentController::builder("a", &store)
        .action(Action::instant("Free").with_cost(0.0))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Model(ModelError::InvalidCost { .. })
    ));

    let err = AgentController::builder("a", &store)
        .goal(Goal::new("Rest", 1.0))
        .emergency("alarm", "Panic")
        .build()
        .unwrap_err();
    assert!(matches!(err, AgentError::UnknownEmergencyGoal { .. }));

    let err = AgentController::builder("", &store).build().unwrap_err();
    assert!(matches!(
        err,
        AgentError::Model(ModelError::EmptyName { kind: "agent" })
    ));
}
