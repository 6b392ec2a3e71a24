//! Array access and construction nodes. All pure data nodes.

use std::sync::Arc;

use bluegraph_common::{ArrayElem, GraphError, GraphErrorKind};

use crate::engine::NodeCtx;
use crate::executable::Executable;
use crate::registry::NodeRegistry;

fn check_index(ctx: &NodeCtx<'_, '_>, idx: i64, len: usize) -> Result<usize, GraphError> {
    if idx < 0 || idx as usize >= len {
        return Err(GraphError::new(GraphErrorKind::Range)
            .with_message(format!("index {idx} out of range, len {len}"))
            .with_node(ctx.node_id()));
    }
    Ok(idx as usize)
}

/* ───────────────────────── GetArrayInt ──────────────────────── */

pub struct GetArrayInt;

impl Executable for GetArrayInt {
    fn name(&self) -> &str {
        "GetArrayInt"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let array = ctx.in_array(0)?;
        let idx = ctx.in_int(1)?;
        let idx = check_index(ctx, idx, array.len())?;
        ctx.set_out_int(0, array[idx].int_val)?;
        Ok(-1)
    }
}

/* ──────────────────────── GetArrayString ────────────────────── */

pub struct GetArrayString;

impl Executable for GetArrayString {
    fn name(&self) -> &str {
        "GetArrayString"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let array = ctx.in_array(0)?;
        let idx = ctx.in_int(1)?;
        let idx = check_index(ctx, idx, array.len())?;
        let val = array[idx].str_val.clone();
        ctx.set_out_str(0, val)?;
        Ok(-1)
    }
}

/* ───────────────────────── GetArrayLen ──────────────────────── */

pub struct GetArrayLen;

impl Executable for GetArrayLen {
    fn name(&self) -> &str {
        "GetArrayLen"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let len = ctx.in_array(0)?.len();
        ctx.set_out_int(0, len as i64)?;
        Ok(-1)
    }
}

/* ──────────────────────── CreateIntArray ────────────────────── */

/// Builds an array out-port from the node's literal array default on
/// input port 0 (the port is default-only; it is never wired).
pub struct CreateIntArray;

impl Executable for CreateIntArray {
    fn name(&self) -> &str {
        "CreateIntArray"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let vals = ctx.default_int_array(0).ok_or_else(|| {
            GraphError::new(GraphErrorKind::NotFound)
                .with_message("CreateIntArray default 0 not found")
                .with_node(ctx.node_id())
        })?;
        for v in vals {
            ctx.push_out_int(0, v)?;
        }
        Ok(-1)
    }
}

/* ─────────────────────── CreateStringArray ──────────────────── */

pub struct CreateStringArray;

impl Executable for CreateStringArray {
    fn name(&self) -> &str {
        "CreateStringArray"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let vals = ctx.default_str_array(0).ok_or_else(|| {
            GraphError::new(GraphErrorKind::NotFound)
                .with_message("CreateStringArray default 0 not found")
                .with_node(ctx.node_id())
        })?;
        for v in vals {
            ctx.push_out_str(0, v)?;
        }
        Ok(-1)
    }
}

/* ──────────────────── AppendIntegerToArray ──────────────────── */

/// Out array = input array (port 0) extended with the int value (port 1).
/// The input is copied element-wise, both slots preserved.
pub struct AppendIntegerToArray;

impl Executable for AppendIntegerToArray {
    fn name(&self) -> &str {
        "AppendIntegerToArray"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let mut array = ctx.in_array(0)?;
        let val = ctx.in_int(1)?;
        array.push(ArrayElem::from_int(val));
        ctx.set_out_array(0, array)?;
        Ok(-1)
    }
}

/* ───────────────────── AppendStringToArray ──────────────────── */

pub struct AppendStringToArray;

impl Executable for AppendStringToArray {
    fn name(&self) -> &str {
        "AppendStringToArray"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let mut array = ctx.in_array(0)?;
        let val = ctx.in_str(1)?;
        array.push(ArrayElem::from_str(val));
        ctx.set_out_array(0, array)?;
        Ok(-1)
    }
}

pub fn register_builtins(reg: &mut NodeRegistry) -> Result<(), GraphError> {
    reg.register_if_declared(Arc::new(GetArrayInt))?;
    reg.register_if_declared(Arc::new(GetArrayString))?;
    reg.register_if_declared(Arc::new(GetArrayLen))?;
    reg.register_if_declared(Arc::new(CreateIntArray))?;
    reg.register_if_declared(Arc::new(CreateStringArray))?;
    reg.register_if_declared(Arc::new(AppendIntegerToArray))?;
    reg.register_if_declared(Arc::new(AppendStringToArray))?;
    Ok(())
}
