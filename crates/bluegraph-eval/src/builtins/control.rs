//! Control-flow nodes: sequencing, loops, branches, comparators.
//!
//! The multi-dispatch nodes (`Sequence`, the foreach loops) drive their
//! successors through `NodeCtx::do_next` and return -1; the branch nodes
//! return the chosen out-exec ordinal and let the engine dispatch.

use std::sync::Arc;

use bluegraph_common::GraphError;
use rand::Rng;

use crate::engine::NodeCtx;
use crate::executable::Executable;
use crate::registry::NodeRegistry;

/* ────────────────────────── Sequence ────────────────────────── */

/// Dispatches each of its out-exec ports in order.
pub struct Sequence;

impl Executable for Sequence {
    fn name(&self) -> &str {
        "Sequence"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        for branch in 0..ctx.out_exec_count() {
            ctx.do_next(branch)?;
        }
        Ok(-1)
    }
}

/* ────────────────────────── Foreach ─────────────────────────── */

/// Counts `i` over `[start, end)` (ports 1 and 2), publishing `i` on data
/// out-port 2 and dispatching branch 0 per iteration, then branch 1 when
/// done.
pub struct Foreach;

impl Executable for Foreach {
    fn name(&self) -> &str {
        "Foreach"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let start = ctx.in_int(1)?;
        let end = ctx.in_int(2)?;
        for i in start..end {
            ctx.set_out_int(2, i)?;
            ctx.do_next(0)?;
        }
        ctx.do_next(1)?;
        Ok(-1)
    }
}

/* ─────────────────────── ForeachIntArray ────────────────────── */

/// As `Foreach`, but yielding each element's int slot from the array on
/// port 1.
pub struct ForeachIntArray;

impl Executable for ForeachIntArray {
    fn name(&self) -> &str {
        "ForeachIntArray"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let array = ctx.in_array(1)?;
        for elem in array {
            ctx.set_out_int(2, elem.int_val)?;
            ctx.do_next(0)?;
        }
        ctx.do_next(1)?;
        Ok(-1)
    }
}

/* ─────────────────────────── BoolIf ─────────────────────────── */

/// Branch 1 when the condition (port 1) is true, branch 0 otherwise.
pub struct BoolIf;

impl Executable for BoolIf {
    fn name(&self) -> &str {
        "BoolIf"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        Ok(if ctx.in_bool(1)? { 1 } else { 0 })
    }
}

/* ─────────────────────── integer compares ───────────────────── */

/// `a > b` (or `a >= b` with the `eq` flag on port 1); branch 1 on true.
pub struct GreaterThanInteger;

impl Executable for GreaterThanInteger {
    fn name(&self) -> &str {
        "GreaterThanInteger"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let eq = ctx.in_bool(1)?;
        let a = ctx.in_int(2)?;
        let b = ctx.in_int(3)?;
        let hit = if eq { a >= b } else { a > b };
        Ok(if hit { 1 } else { 0 })
    }
}

/// `a < b` (or `a <= b` with the `eq` flag on port 1); branch 1 on true.
pub struct LessThanInteger;

impl Executable for LessThanInteger {
    fn name(&self) -> &str {
        "LessThanInteger"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let eq = ctx.in_bool(1)?;
        let a = ctx.in_int(2)?;
        let b = ctx.in_int(3)?;
        let hit = if eq { a <= b } else { a < b };
        Ok(if hit { 1 } else { 0 })
    }
}

pub struct EqualInteger;

impl Executable for EqualInteger {
    fn name(&self) -> &str {
        "EqualInteger"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let a = ctx.in_int(1)?;
        let b = ctx.in_int(2)?;
        Ok(if a == b { 1 } else { 0 })
    }
}

/* ──────────────────────── RangeCompare ──────────────────────── */

/// Finds the smallest `i` with `x <= thresholds[i]` (thresholds come from
/// the literal array default on port 2) and returns branch `i + 2`;
/// branch 0 when no threshold matches or none are configured.
pub struct RangeCompare;

impl Executable for RangeCompare {
    fn name(&self) -> &str {
        "RangeCompare"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let x = ctx.in_int(1)?;
        let Some(thresholds) = ctx.default_int_array(2) else {
            return Ok(0);
        };

        let branches = ctx.out_exec_count().saturating_sub(2);
        for (i, threshold) in thresholds.iter().take(branches).enumerate() {
            if x <= *threshold {
                return Ok(i as i64 + 2);
            }
        }
        Ok(0)
    }
}

/* ──────────────────────── Probability ───────────────────────── */

/// Branch 1 with probability `p / 10000` (port 1, in basis points),
/// branch 0 otherwise.
pub struct Probability;

impl Executable for Probability {
    fn name(&self) -> &str {
        "Probability"
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let p = ctx.in_int(1)?;
        let roll = ctx.rng().gen_range(0..10_000);
        Ok(if p > roll { 1 } else { 0 })
    }
}

pub fn register_builtins(reg: &mut NodeRegistry) -> Result<(), GraphError> {
    reg.register_if_declared(Arc::new(Sequence))?;
    reg.register_if_declared(Arc::new(Foreach))?;
    reg.register_if_declared(Arc::new(ForeachIntArray))?;
    reg.register_if_declared(Arc::new(BoolIf))?;
    reg.register_if_declared(Arc::new(GreaterThanInteger))?;
    reg.register_if_declared(Arc::new(LessThanInteger))?;
    reg.register_if_declared(Arc::new(EqualInteger))?;
    reg.register_if_declared(Arc::new(RangeCompare))?;
    reg.register_if_declared(Arc::new(Probability))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::tests::fixtures::{int_return, run_graph};

    /// Set_hits is dispatched once per Sequence branch that is wired;
    /// branch 1 is left unwired on purpose.
    #[test]
    fn sequence_skips_unwired_branches() {
        let graph = r#"{
          "graph_name": "seq",
          "nodes": [
            { "id": "n1", "class": "Entrance_IntParam_1" },
            { "id": "seq", "class": "Sequence" },
            { "id": "s1", "class": "Set_hits", "port_defaultv": { "1": 1 } },
            { "id": "s2", "class": "Set_hits", "port_defaultv": { "1": 2 } },
            { "id": "wrap", "class": "AppendIntegerToArray" },
            { "id": "get", "class": "Get_hits" },
            { "id": "ret", "class": "Set_g_Return" }
          ],
          "edges": [
            { "source_node_id": "n1", "source_port_id": 0, "des_node_id": "seq", "des_port_id": 0 },
            { "source_node_id": "seq", "source_port_id": 0, "des_node_id": "s1", "des_port_id": 0 },
            { "source_node_id": "seq", "source_port_id": 2, "des_node_id": "s2", "des_port_id": 0 },
            { "source_node_id": "s2", "source_port_id": 0, "des_node_id": "ret", "des_port_id": 0 },
            { "source_node_id": "get", "source_port_id": 0, "des_node_id": "wrap", "des_port_id": 1 },
            { "source_node_id": "wrap", "source_port_id": 0, "des_node_id": "ret", "des_port_id": 1 }
          ],
          "variables": [
            { "name": "g_Return", "type": "array", "value": [] },
            { "name": "hits", "type": "int", "value": 0 }
          ]
        }"#;
        assert_eq!(int_return(run_graph(graph, 1, &[]).unwrap()), vec![2]);
    }

    #[test]
    fn range_compare_selects_threshold_branch() {
        // thresholds [10, 20, 30]; x = 15 -> second threshold -> branch 3
        let graph = r#"{
          "graph_name": "range",
          "nodes": [
            { "id": "n1", "class": "Entrance_IntParam_1" },
            { "id": "cmp", "class": "RangeCompare",
              "port_defaultv": { "1": 15, "2": [10, 20, 30] } },
            { "id": "lo", "class": "Set_g_Return" },
            { "id": "mid", "class": "Set_g_Return" },
            { "id": "mk_lo", "class": "CreateIntArray", "port_defaultv": { "0": [1] } },
            { "id": "mk_mid", "class": "CreateIntArray", "port_defaultv": { "0": [2] } }
          ],
          "edges": [
            { "source_node_id": "n1", "source_port_id": 0, "des_node_id": "cmp", "des_port_id": 0 },
            { "source_node_id": "cmp", "source_port_id": 2, "des_node_id": "lo", "des_port_id": 0 },
            { "source_node_id": "cmp", "source_port_id": 3, "des_node_id": "mid", "des_port_id": 0 },
            { "source_node_id": "mk_lo", "source_port_id": 0, "des_node_id": "lo", "des_port_id": 1 },
            { "source_node_id": "mk_mid", "source_port_id": 0, "des_node_id": "mid", "des_port_id": 1 }
          ],
          "variables": [ { "name": "g_Return", "type": "array", "value": [] } ]
        }"#;
        assert_eq!(int_return(run_graph(graph, 1, &[]).unwrap()), vec![2]);
    }

    #[test]
    fn foreach_int_array_visits_every_element() {
        // sum of [5, 6, 7] via the loop body
        let graph = r#"{
          "graph_name": "fe_arr",
          "nodes": [
            { "id": "n1", "class": "Entrance_IntParam_1" },
            { "id": "init", "class": "Set_sum", "port_defaultv": { "1": 0 } },
            { "id": "mk", "class": "CreateIntArray", "port_defaultv": { "0": [5, 6, 7] } },
            { "id": "fe", "class": "ForeachIntArray" },
            { "id": "add", "class": "AddInt" },
            { "id": "gsum", "class": "Get_sum" },
            { "id": "store", "class": "Set_sum" },
            { "id": "gsum2", "class": "Get_sum" },
            { "id": "wrap", "class": "AppendIntegerToArray" },
            { "id": "ret", "class": "Set_g_Return" }
          ],
          "edges": [
            { "source_node_id": "n1", "source_port_id": 0, "des_node_id": "init", "des_port_id": 0 },
            { "source_node_id": "init", "source_port_id": 0, "des_node_id": "fe", "des_port_id": 0 },
            { "source_node_id": "mk", "source_port_id": 0, "des_node_id": "fe", "des_port_id": 1 },
            { "source_node_id": "fe", "source_port_id": 0, "des_node_id": "store", "des_port_id": 0 },
            { "source_node_id": "gsum", "source_port_id": 0, "des_node_id": "add", "des_port_id": 0 },
            { "source_node_id": "fe", "source_port_id": 2, "des_node_id": "add", "des_port_id": 1 },
            { "source_node_id": "add", "source_port_id": 0, "des_node_id": "store", "des_port_id": 1 },
            { "source_node_id": "fe", "source_port_id": 1, "des_node_id": "ret", "des_port_id": 0 },
            { "source_node_id": "gsum2", "source_port_id": 0, "des_node_id": "wrap", "des_port_id": 1 },
            { "source_node_id": "wrap", "source_port_id": 0, "des_node_id": "ret", "des_port_id": 1 }
          ],
          "variables": [
            { "name": "g_Return", "type": "array", "value": [] },
            { "name": "sum", "type": "int", "value": 0 }
          ]
        }"#;
        assert_eq!(int_return(run_graph(graph, 1, &[]).unwrap()), vec![18]);
    }

    #[test]
    fn probability_extremes() {
        let graph = |p: i64| {
            format!(
                r#"{{
          "graph_name": "prob",
          "nodes": [
            {{ "id": "n1", "class": "Entrance_IntParam_1" }},
            {{ "id": "prob", "class": "Probability", "port_defaultv": {{ "1": {p} }} }},
            {{ "id": "no", "class": "Set_g_Return" }},
            {{ "id": "yes", "class": "Set_g_Return" }},
            {{ "id": "mk_no", "class": "CreateIntArray", "port_defaultv": {{ "0": [0] }} }},
            {{ "id": "mk_yes", "class": "CreateIntArray", "port_defaultv": {{ "0": [1] }} }}
          ],
          "edges": [
            {{ "source_node_id": "n1", "source_port_id": 0, "des_node_id": "prob", "des_port_id": 0 }},
            {{ "source_node_id": "prob", "source_port_id": 0, "des_node_id": "no", "des_port_id": 0 }},
            {{ "source_node_id": "prob", "source_port_id": 1, "des_node_id": "yes", "des_port_id": 0 }},
            {{ "source_node_id": "mk_no", "source_port_id": 0, "des_node_id": "no", "des_port_id": 1 }},
            {{ "source_node_id": "mk_yes", "source_port_id": 0, "des_node_id": "yes", "des_port_id": 1 }}
          ],
          "variables": [ {{ "name": "g_Return", "type": "array", "value": [] }} ]
        }}"#
            )
        };
        // p = 10000 always hits branch 1; p = 0 never does.
        assert_eq!(int_return(run_graph(&graph(10_000), 1, &[]).unwrap()), vec![1]);
        assert_eq!(int_return(run_graph(&graph(0), 1, &[]).unwrap()), vec![0]);
    }
}
