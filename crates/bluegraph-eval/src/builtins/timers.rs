//! Timer nodes: the only asynchronous boundary in the engine.

use std::sync::Arc;
use std::time::Duration;

use bluegraph_common::GraphError;
use tracing::warn;

use crate::engine::NodeCtx;
use crate::executable::Executable;
use crate::registry::NodeRegistry;

/* ─────────────────────────── CreateTimer ────────────────────── */

/// Schedules a host callback after `delay_ms` (port 1) carrying the
/// argument array (port 2). When it fires, the callback triggers this
/// graph's timer entrance with that array and then cancels its own
/// handle. The handle is published on data out-port 1 and recorded in the
/// instance's live-timer set.
pub struct CreateTimer;

impl Executable for CreateTimer {
    fn name(&self) -> &str {
        "CreateTimer"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let delay_ms = ctx.in_int(1)?;
        let args = ctx.in_array(2)?;

        let delay = Duration::from_millis(delay_ms.max(0) as u64);
        let handle = ctx.schedule_timer(delay, args);
        ctx.set_out_int(1, handle as i64)?;
        Ok(0)
    }
}

/* ─────────────────────────── CloseTimer ─────────────────────── */

/// Cancels the handle on port 1 with the host and drops it from the
/// live-timer set. An unknown handle is logged and otherwise ignored.
pub struct CloseTimer;

impl Executable for CloseTimer {
    fn name(&self) -> &str {
        "CloseTimer"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let handle = ctx.in_int(1)? as u64;
        if !ctx.cancel_timer(handle) {
            warn!(graph_id = ctx.graph_id(), handle, "CloseTimer: handle unknown to host");
        }
        Ok(0)
    }
}

pub fn register_builtins(reg: &mut NodeRegistry) -> Result<(), GraphError> {
    reg.register_if_declared(Arc::new(CreateTimer))?;
    reg.register_if_declared(Arc::new(CloseTimer))?;
    Ok(())
}
