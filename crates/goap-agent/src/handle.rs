use core::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use goap_core::{SubscriptionId, TickContext, WorldStore};

use crate::{AgentController, AgentState};

/// A running agent: a controller subscribed to its store.
///
/// Notifications are delivered synchronously. If the controller is already borrowed when one
/// arrives (it is ticking, or the write came from its own effects), the change is queued on the
/// controller's inbox and handled as soon as the controller finishes what it is doing.
///
/// Dropping the handle unsubscribes the agent.
pub struct AgentHandle {
    controller: Rc<RefCell<AgentController>>,
    store: WorldStore,
    subscription: SubscriptionId,
}

impl AgentHandle {
    /// Subscribe `controller` to its store and make its first planning pass.
    pub fn spawn(controller: AgentController) -> Self {
        let store = controller.store().clone();
        let inbox = controller.inbox();
        let controller = Rc::new(RefCell::new(controller));

        let weak: Weak<RefCell<AgentController>> = Rc::downgrade(&controller);
        let subscription = store.subscribe(move |key, value| {
            let Some(controller) = weak.upgrade() else {
                return;
            };
            match controller.try_borrow_mut() {
                Ok(mut controller) => controller.handle_change(key, value),
                Err(_) => inbox
                    .borrow_mut()
                    .push_back((key.to_owned(), value.clone())),
            };
        });

        controller.borrow_mut().start();

        Self {
            controller,
            store,
            subscription,
        }
    }

    pub fn name(&self) -> String {
        self.controller.borrow().name().to_owned()
    }

    pub fn state(&self) -> AgentState {
        self.controller.borrow().state()
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Read access to the controller.
    ///
    /// # Panics
    ///
    /// Panics if called from inside one of this agent's own callbacks.
    pub fn borrow(&self) -> Ref<'_, AgentController> {
        self.controller.borrow()
    }

    pub fn tick(&self, ctx: &TickContext) {
        match self.controller.try_borrow_mut() {
            Ok(mut controller) => controller.tick(ctx),
            Err(_) => tracing::warn!(tick = ctx.tick, "agent ticked re-entrantly; skipped"),
        }
    }

    pub fn wake(&self) {
        match self.controller.try_borrow_mut() {
            Ok(mut controller) => controller.wake(),
            Err(_) => tracing::warn!("agent woken re-entrantly; skipped"),
        }
    }

    pub fn stop(&self) {
        match self.controller.try_borrow_mut() {
            Ok(mut controller) => controller.stop(),
            Err(_) => tracing::warn!("agent stopped re-entrantly; skipped"),
        }
    }
}

impl Drop for AgentHandle {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

impl core::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.controller.try_borrow() {
            Ok(controller) => core::fmt::Debug::fmt(&*controller, f),
            Err(_) => f.write_str("AgentHandle { <busy> }"),
        }
    }
}
