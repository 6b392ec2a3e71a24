//! A deterministic in-process host for tests and examples: a mock
//! scheduler with a manually advanced clock, routing events back into an
//! attached [`GraphManager`].
//!
//! Everything is single-threaded; `advance` plays the role of the host
//! executor, running due callbacks strictly outside any manager borrow.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use bluegraph_common::{GraphError, GraphErrorKind, Literal};

use crate::host::{Host, TimerCallback, TimerHandle};
use crate::manager::{GraphId, GraphManager};
use crate::template::EntranceId;

struct Pending {
    handle: TimerHandle,
    due: Duration,
    cb: TimerCallback,
}

#[derive(Default)]
struct State {
    now: Duration,
    next_handle: TimerHandle,
    pending: Vec<Pending>,
    events: Vec<(GraphId, EntranceId, Vec<Literal>)>,
}

#[derive(Default)]
pub struct MockHost {
    state: RefCell<State>,
    manager: RefCell<Option<Weak<RefCell<GraphManager>>>>,
}

impl MockHost {
    pub fn new() -> Arc<MockHost> {
        Arc::new(MockHost::default())
    }

    /// Wire events and routed cancels back into a manager. Without this,
    /// `trigger_event` reports "no manager attached" and routed cancels
    /// fall back to raw scheduler cancellation.
    pub fn attach(&self, manager: &Rc<RefCell<GraphManager>>) {
        *self.manager.borrow_mut() = Some(Rc::downgrade(manager));
    }

    /// Move the clock forward and fire every timer that comes due, in due
    /// order. Callbacks run after the scheduler borrow is released, so
    /// they are free to reenter the host and the manager.
    pub fn advance(&self, delta: Duration) {
        let deadline = {
            let mut state = self.state.borrow_mut();
            state.now += delta;
            state.now
        };

        loop {
            let fired = {
                let mut state = self.state.borrow_mut();
                let next = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= deadline)
                    .min_by_key(|(_, p)| (p.due, p.handle))
                    .map(|(i, _)| i);
                next.map(|i| state.pending.remove(i))
            };
            match fired {
                Some(timer) => (timer.cb)(timer.handle),
                None => break,
            }
        }
    }

    /// Number of timers scheduled but not yet fired or cancelled.
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Every `trigger_event` the host has seen, in order — including ones
    /// the manager subsequently rejected.
    pub fn events(&self) -> Vec<(GraphId, EntranceId, Vec<Literal>)> {
        self.state.borrow().events.clone()
    }

    fn attached(&self) -> Option<Rc<RefCell<GraphManager>>> {
        self.manager.borrow().as_ref().and_then(Weak::upgrade)
    }
}

impl Host for MockHost {
    fn schedule_after(&self, delay: Duration, cb: TimerCallback) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = state.next_handle;
        let due = state.now + delay;
        state.pending.push(Pending { handle, due, cb });
        handle
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.pending.len();
        state.pending.retain(|p| p.handle != handle);
        state.pending.len() != before
    }

    fn trigger_event(
        &self,
        graph_id: GraphId,
        event_id: EntranceId,
        args: &[Literal],
    ) -> Result<(), GraphError> {
        self.state
            .borrow_mut()
            .events
            .push((graph_id, event_id, args.to_vec()));

        let manager = self.attached().ok_or_else(|| {
            GraphError::new(GraphErrorKind::NotFound).with_message("no manager attached")
        })?;
        let result = manager.borrow_mut().trigger_event(graph_id, event_id, args);
        result
    }

    fn cancel_timer(&self, graph_id: GraphId, handle: TimerHandle) -> bool {
        match self.attached() {
            Some(manager) => manager.borrow_mut().cancel_timer(graph_id, handle),
            None => self.cancel(handle),
        }
    }
}
