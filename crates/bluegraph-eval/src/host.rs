//! The contract between the engine and its embedding host.

use std::time::Duration;

use bluegraph_common::{GraphError, Literal};

use crate::manager::GraphId;
use crate::template::EntranceId;

/// Opaque handle for a scheduled timer, owned by the host scheduler.
pub type TimerHandle = u64;

/// Callback invoked by the host scheduler when a timer fires. Receives the
/// handle the scheduler assigned at `schedule_after` time.
pub type TimerCallback = Box<dyn FnOnce(TimerHandle)>;

/// Everything the engine asks of its host.
///
/// The engine is single-threaded cooperative (one `Do` is one synchronous
/// stack), so none of these methods require `Send`. `schedule_after` and
/// `cancel` are the raw scheduler primitives; `trigger_event` and
/// `cancel_timer` are manager operations that a timer callback reaches
/// *through* the host, which must post them onto the same executor that
/// serializes all other calls into the [`GraphManager`] — a callback must
/// never reenter the engine concurrently.
///
/// [`GraphManager`]: crate::manager::GraphManager
pub trait Host {
    /// Schedule `cb` to run once after `delay`. Returns the handle that
    /// will also be passed to `cb` when it fires.
    fn schedule_after(&self, delay: Duration, cb: TimerCallback) -> TimerHandle;

    /// Cancel a scheduled timer. Returns `false` when the handle is
    /// unknown (already fired, already cancelled); callers treat that as a
    /// no-op.
    fn cancel(&self, handle: TimerHandle) -> bool;

    /// Route an event invocation to `GraphManager::trigger_event` on the
    /// serializing executor. Event ids are entrance ids.
    fn trigger_event(
        &self,
        graph_id: GraphId,
        event_id: EntranceId,
        args: &[Literal],
    ) -> Result<(), GraphError>;

    /// Route a timer cancellation to `GraphManager::cancel_timer` on the
    /// serializing executor. Safe on released graphs.
    fn cancel_timer(&self, graph_id: GraphId, handle: TimerHandle) -> bool;
}
