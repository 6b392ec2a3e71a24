//! Entrance nodes and the `Output` sink.
//!
//! Entrances do nothing themselves: they exist to publish caller arguments
//! on their data out-ports and fall through branch 0. Their entrance ids
//! come from the schema name suffix; the well-known system ids live here.

use std::sync::Arc;

use bluegraph_common::GraphError;
use tracing::info;

use crate::engine::NodeCtx;
use crate::executable::Executable;
use crate::registry::NodeRegistry;
use crate::template::EntranceId;

/// System entrance ids (reserved below 1000).
pub const ENTRANCE_INT_PARAM: EntranceId = 1;
pub const ENTRANCE_ARRAY_PARAM: EntranceId = 2;
/// The entrance every timer callback triggers.
pub const ENTRANCE_TIMER: EntranceId = 3;

pub struct EntranceIntParam;

impl Executable for EntranceIntParam {
    fn name(&self) -> &str {
        "Entrance_IntParam"
    }

    fn execute(&self, _ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        Ok(0)
    }
}

pub struct EntranceArrayParam;

impl Executable for EntranceArrayParam {
    fn name(&self) -> &str {
        "Entrance_ArrayParam"
    }

    fn execute(&self, _ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        Ok(0)
    }
}

pub struct EntranceTimer;

impl Executable for EntranceTimer {
    fn name(&self) -> &str {
        "Entrance_Timer"
    }

    fn execute(&self, _ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        Ok(0)
    }
}

/// Debug sink: emits its int, string, and array inputs through the logging
/// layer, then falls through branch 0.
pub struct Output;

impl Executable for Output {
    fn name(&self) -> &str {
        "Output"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let int_val = ctx.in_int(1)?;
        let str_val = ctx.in_str(2)?;
        let array_val = ctx.in_array(3)?;
        info!(
            node = %ctx.node_id(),
            int_val,
            str_val = %str_val,
            array = ?array_val,
            "output node"
        );
        Ok(0)
    }
}

pub fn register_builtins(reg: &mut NodeRegistry) -> Result<(), GraphError> {
    reg.register_if_declared(Arc::new(EntranceIntParam))?;
    reg.register_if_declared(Arc::new(EntranceArrayParam))?;
    reg.register_if_declared(Arc::new(EntranceTimer))?;
    reg.register_if_declared(Arc::new(Output))?;
    Ok(())
}
