//! Integer arithmetic nodes.
//!
//! All of these are pure data nodes: no exec ports, evaluated on demand
//! when a consumer pulls their output, returning -1 so the engine never
//! dispatches from them.

use std::sync::Arc;

use bluegraph_common::{GraphError, GraphErrorKind};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::engine::NodeCtx;
use crate::executable::Executable;
use crate::registry::NodeRegistry;

/* ─────────────────────────── AddInt ─────────────────────────── */

pub struct AddInt;

impl Executable for AddInt {
    fn name(&self) -> &str {
        "AddInt"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let a = ctx.in_int(0)?;
        let b = ctx.in_int(1)?;
        ctx.set_out_int(0, a.wrapping_add(b))?;
        Ok(-1)
    }
}

/* ─────────────────────────── SubInt ─────────────────────────── */

/// `a - b`, negated to its absolute value when the `abs` flag (port 2) is
/// set.
pub struct SubInt;

impl Executable for SubInt {
    fn name(&self) -> &str {
        "SubInt"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let a = ctx.in_int(0)?;
        let b = ctx.in_int(1)?;
        let abs = ctx.in_bool(2)?;
        let mut ret = a.wrapping_sub(b);
        if abs && ret < 0 {
            ret = ret.wrapping_neg();
        }
        ctx.set_out_int(0, ret)?;
        Ok(-1)
    }
}

/* ─────────────────────────── MulInt ─────────────────────────── */

pub struct MulInt;

impl Executable for MulInt {
    fn name(&self) -> &str {
        "MulInt"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let a = ctx.in_int(0)?;
        let b = ctx.in_int(1)?;
        ctx.set_out_int(0, a.wrapping_mul(b))?;
        Ok(-1)
    }
}

/* ─────────────────────────── DivInt ─────────────────────────── */

/// `a / b`. The `round` flag (port 2) selects rounding half to nearest
/// instead of truncation. Division by zero fails.
pub struct DivInt;

impl Executable for DivInt {
    fn name(&self) -> &str {
        "DivInt"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let a = ctx.in_int(0)?;
        let b = ctx.in_int(1)?;
        let round = ctx.in_bool(2)?;
        if b == 0 {
            return Err(GraphError::new(GraphErrorKind::Div)
                .with_message("div zero error")
                .with_node(ctx.node_id()));
        }
        let ret = if round {
            a.wrapping_add(b / 2).wrapping_div(b)
        } else {
            a.wrapping_div(b)
        };
        ctx.set_out_int(0, ret)?;
        Ok(-1)
    }
}

/* ─────────────────────────── ModInt ─────────────────────────── */

pub struct ModInt;

impl Executable for ModInt {
    fn name(&self) -> &str {
        "ModInt"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let a = ctx.in_int(0)?;
        let b = ctx.in_int(1)?;
        if b == 0 {
            return Err(GraphError::new(GraphErrorKind::Div)
                .with_message("mod zero error")
                .with_node(ctx.node_id()));
        }
        ctx.set_out_int(0, a.wrapping_rem(b))?;
        Ok(-1)
    }
}

/* ───────────────────────── RandNumber ───────────────────────── */

/// Uniform integer in `[min, max]`. A positive seed (port 0) selects a
/// reproducible stream; otherwise the instance's own stream is used.
pub struct RandNumber;

impl Executable for RandNumber {
    fn name(&self) -> &str {
        "RandNumber"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let seed = ctx.in_int(0)?;
        let min = ctx.in_int(1)?;
        let max = ctx.in_int(2)?;
        if max < min {
            return Err(GraphError::new(GraphErrorKind::Range)
                .with_message(format!("rand bounds [{min}, {max}] are empty"))
                .with_node(ctx.node_id()));
        }

        let ret = if seed > 0 {
            SmallRng::seed_from_u64(seed as u64).gen_range(min..=max)
        } else {
            ctx.rng().gen_range(min..=max)
        };
        ctx.set_out_int(0, ret)?;
        Ok(-1)
    }
}

pub fn register_builtins(reg: &mut NodeRegistry) -> Result<(), GraphError> {
    reg.register_if_declared(Arc::new(AddInt))?;
    reg.register_if_declared(Arc::new(SubInt))?;
    reg.register_if_declared(Arc::new(MulInt))?;
    reg.register_if_declared(Arc::new(DivInt))?;
    reg.register_if_declared(Arc::new(ModInt))?;
    reg.register_if_declared(Arc::new(RandNumber))?;
    Ok(())
}
