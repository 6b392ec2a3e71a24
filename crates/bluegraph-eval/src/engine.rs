//! The execution engine: pull-based data-port evaluation interleaved with
//! push-based exec dispatch.
//!
//! One `Do` is one synchronous stack. Visiting a node realizes a fresh
//! context, pulls its input data ports (recursively visiting producers
//! that have not executed), runs the bound executable, then follows the
//! exec successor the executable selected.

use std::sync::Arc;
use std::time::Duration;

use bluegraph_common::{ArrayElem, GraphError, GraphErrorKind, Literal, PortValue};
use bluegraph_parse::{RETURN_VARIABLE, is_global_var};
use rand::rngs::SmallRng;
use tracing::{debug, trace, warn};

use crate::builtins::entrances::ENTRANCE_TIMER;
use crate::host::{Host, TimerHandle};
use crate::instance::{ExecContext, GraphInstance};
use crate::manager::GraphId;
use crate::template::{EntranceId, GraphTemplate, NodeIdx, TemplateNode};

/// Runtime bound on nested node visits (exec dispatch and data pulls
/// combined). The preparation bound of 100 exec edges already rejects deep
/// authored chains; this guard converts anything that slips past it —
/// notably deep data-pull chains — into an error instead of a stack
/// overflow.
pub const MAX_VISIT_DEPTH: usize = 256;

/// Run one entrance of an instance to completion.
///
/// Local variables and contexts are reset first; the global table
/// persists. Caller arguments are injected into the entrance node's data
/// out-ports in order. After the exec flow returns, the well-known global
/// `g_Return` provides the call's array result.
pub fn do_entrance(
    inst: &mut GraphInstance,
    host: &Arc<dyn Host>,
    entrance: EntranceId,
    args: &[Literal],
) -> Result<Option<Vec<ArrayElem>>, GraphError> {
    let template = Arc::clone(&inst.template);
    debug!(graph = %template.name, graph_id = inst.graph_id, entrance, "graph do");

    let Some(&entry) = template.entrances.get(&entrance) else {
        return Err(GraphError::new(GraphErrorKind::NotFound)
            .with_message(format!("entranceID {entrance} not found"))
            .with_graph(&template.name));
    };

    inst.locals.clear();
    inst.contexts.clear();

    let mut walker = Walker {
        inst: &mut *inst,
        template: &template,
        host,
        depth: 0,
    };
    walker.visit(entry, Some(args))?;

    Ok(match inst.globals.get(RETURN_VARIABLE) {
        Some(PortValue::Array(elems)) => Some(elems.clone()),
        _ => None,
    })
}

pub(crate) struct Walker<'g> {
    pub(crate) inst: &'g mut GraphInstance,
    pub(crate) template: &'g GraphTemplate,
    pub(crate) host: &'g Arc<dyn Host>,
    depth: usize,
}

impl<'g> Walker<'g> {
    fn visit(&mut self, idx: NodeIdx, entrance_args: Option<&[Literal]>) -> Result<(), GraphError> {
        self.depth += 1;
        if self.depth > MAX_VISIT_DEPTH {
            self.depth -= 1;
            return Err(GraphError::new(GraphErrorKind::Recursion)
                .with_message("node visit recursion too deep")
                .with_node(&self.template.nodes[idx].node_id));
        }
        let result = self.visit_inner(idx, entrance_args);
        self.depth -= 1;
        result
    }

    fn visit_inner(
        &mut self,
        idx: NodeIdx,
        entrance_args: Option<&[Literal]>,
    ) -> Result<(), GraphError> {
        let template = self.template;
        let node = &template.nodes[idx];

        // (a) realize a fresh context for this visit
        self.inst
            .contexts
            .insert(idx, ExecContext::from_proto(&node.proto));

        // (b) caller-argument injection, entrance visit only
        if let Some(args) = entrance_args {
            self.inject_args(node, idx, args)?;
        }

        // (c) pull input data ports
        for port in 0..node.producers.len() {
            let is_data = matches!(
                node.proto.inputs[port],
                Some(ref slot) if !slot.value.is_exec()
            );
            if !is_data {
                continue;
            }
            self.pull_input(node, idx, port)?;
        }

        // (d) execute the bound implementation
        let exec = Arc::clone(&node.exec);
        let branch = {
            let mut ctx = NodeCtx { walker: self, idx };
            exec.execute(&mut ctx)?
        };
        trace!(
            node = %node.node_id,
            name = %node.proto.name,
            branch,
            ports = ?self.inst.contexts.get(&idx),
            "node executed"
        );

        // (e) push along the selected exec successor
        if branch == -1 || node.next.is_empty() {
            return Ok(());
        }
        let slot = usize::try_from(branch)
            .ok()
            .and_then(|b| node.next.get(b))
            .ok_or_else(|| {
                GraphError::new(GraphErrorKind::NotFound)
                    .with_message(format!("next index {branch} not found"))
                    .with_node(&node.node_id)
            })?;
        match slot {
            Some(succ) => self.visit(*succ, None),
            None => Ok(()),
        }
    }

    /// Positional caller arguments land in the entrance's data out-ports,
    /// starting at the first data slot.
    fn inject_args(
        &mut self,
        node: &TemplateNode,
        idx: NodeIdx,
        args: &[Literal],
    ) -> Result<(), GraphError> {
        let targets: Vec<usize> = node
            .proto
            .outputs
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Some(s) if !s.value.is_exec() => Some(i),
                _ => None,
            })
            .collect();

        for (i, arg) in args.iter().enumerate() {
            let Some(&port) = targets.get(i) else {
                return Err(GraphError::new(GraphErrorKind::NotFound)
                    .with_message(format!("args {i} not found in node {}", node.proto.name)));
            };
            self.output_mut(idx, port)?
                .assign_literal(arg)
                .map_err(|e| e.with_node(&node.node_id).with_port(port))?;
        }
        Ok(())
    }

    /// Fill one input data port: from its pre-resolved producer when
    /// wired, otherwise from the author's default literal (or the zero
    /// value when there is neither).
    fn pull_input(
        &mut self,
        node: &TemplateNode,
        idx: NodeIdx,
        port: usize,
    ) -> Result<(), GraphError> {
        let Some(producer) = node.producers[port] else {
            if let Some(lit) = node.defaults.get(&port) {
                self.input_mut(idx, port)?
                    .assign_literal(lit)
                    .map_err(|e| e.with_node(&node.node_id).with_port(port))?;
            }
            return Ok(());
        };

        // A producer that has not executed yet — or a pure data node that
        // exec flow will never reach — is evaluated on demand.
        let pnode = &self.template.nodes[producer.node];
        let realized = self.inst.contexts.contains_key(&producer.node);
        if !realized || (!pnode.be_connect && !pnode.is_entrance) {
            self.visit(producer.node, None)?;
        }

        let value = self
            .inst
            .contexts
            .get(&producer.node)
            .and_then(|c| c.outputs.get(producer.out_port))
            .and_then(|v| v.as_ref())
            .cloned()
            .ok_or_else(|| {
                GraphError::new(GraphErrorKind::NotFound)
                    .with_message(format!(
                        "pre node {} out port {} not found",
                        pnode.node_id, producer.out_port
                    ))
                    .with_node(&node.node_id)
            })?;

        let input = self.input_mut(idx, port)?;
        if !input.assign_from(&value) {
            return Err(GraphError::new(GraphErrorKind::Type)
                .with_message(format!(
                    "in port expects {}, producer delivers {}",
                    input.port_type(),
                    value.port_type()
                ))
                .with_node(&node.node_id)
                .with_port(port));
        }
        Ok(())
    }

    fn input_mut(&mut self, idx: NodeIdx, port: usize) -> Result<&mut PortValue, GraphError> {
        let node_id = &self.template.nodes[idx].node_id;
        self.inst
            .contexts
            .get_mut(&idx)
            .and_then(|c| c.inputs.get_mut(port))
            .and_then(|v| v.as_mut())
            .ok_or_else(|| {
                GraphError::new(GraphErrorKind::NotFound)
                    .with_message(format!("in port {port} not found"))
                    .with_node(node_id)
            })
    }

    fn output_mut(&mut self, idx: NodeIdx, port: usize) -> Result<&mut PortValue, GraphError> {
        let node_id = &self.template.nodes[idx].node_id;
        self.inst
            .contexts
            .get_mut(&idx)
            .and_then(|c| c.outputs.get_mut(port))
            .and_then(|v| v.as_mut())
            .ok_or_else(|| {
                GraphError::new(GraphErrorKind::NotFound)
                    .with_message(format!("out port {port} not found"))
                    .with_node(node_id)
            })
    }
}

/// What an [`Executable`](crate::executable::Executable) sees while it
/// runs: typed access to the current node's realized ports, the template
/// defaults, the variable tables, exec dispatch, and timers.
pub struct NodeCtx<'w, 'g> {
    walker: &'w mut Walker<'g>,
    idx: NodeIdx,
}

impl NodeCtx<'_, '_> {
    fn node(&self) -> &TemplateNode {
        &self.walker.template.nodes[self.idx]
    }

    pub fn node_id(&self) -> &str {
        &self.node().node_id
    }

    pub fn node_name(&self) -> &str {
        &self.node().proto.name
    }

    pub fn graph_id(&self) -> GraphId {
        self.walker.inst.graph_id
    }

    /* ─────────────────────── input reads ─────────────────────── */

    fn input(&self, port: usize) -> Result<&PortValue, GraphError> {
        self.walker
            .inst
            .contexts
            .get(&self.idx)
            .and_then(|c| c.inputs.get(port))
            .and_then(|v| v.as_ref())
            .ok_or_else(|| {
                GraphError::new(GraphErrorKind::NotFound)
                    .with_message(format!("{} in port {port} not found", self.node_name()))
            })
    }

    fn typed_in<T>(
        &self,
        port: usize,
        read: impl FnOnce(&PortValue) -> Option<T>,
        what: &str,
    ) -> Result<T, GraphError> {
        let value = self.input(port)?;
        read(value).ok_or_else(|| {
            GraphError::new(GraphErrorKind::Type)
                .with_message(format!("{} in port {port} is not {what}", self.node_name()))
                .with_port(port)
        })
    }

    pub fn in_int(&self, port: usize) -> Result<i64, GraphError> {
        self.typed_in(port, PortValue::as_int, "int")
    }

    pub fn in_float(&self, port: usize) -> Result<f64, GraphError> {
        self.typed_in(port, PortValue::as_float, "float")
    }

    pub fn in_str(&self, port: usize) -> Result<String, GraphError> {
        self.typed_in(port, |v| v.as_str().map(str::to_string), "string")
    }

    pub fn in_bool(&self, port: usize) -> Result<bool, GraphError> {
        self.typed_in(port, PortValue::as_bool, "bool")
    }

    pub fn in_array(&self, port: usize) -> Result<Vec<ArrayElem>, GraphError> {
        self.typed_in(port, |v| v.as_array().map(<[ArrayElem]>::to_vec), "array")
    }

    /// Clone the whole input port value, whatever its subtype.
    pub fn in_value(&self, port: usize) -> Result<PortValue, GraphError> {
        self.input(port).cloned()
    }

    /* ─────────────────────── output writes ───────────────────── */

    fn typed_out(
        &mut self,
        port: usize,
        write: impl FnOnce(&mut PortValue) -> bool,
        what: &str,
    ) -> Result<(), GraphError> {
        let name = self.node_name().to_string();
        let value = self.walker.output_mut(self.idx, port)?;
        if !write(value) {
            return Err(GraphError::new(GraphErrorKind::Type)
                .with_message(format!("{name} out port {port} is not {what}"))
                .with_port(port));
        }
        Ok(())
    }

    pub fn set_out_int(&mut self, port: usize, v: i64) -> Result<(), GraphError> {
        self.typed_out(port, |p| p.set_int(v), "int")
    }

    pub fn set_out_float(&mut self, port: usize, v: f64) -> Result<(), GraphError> {
        self.typed_out(port, |p| p.set_float(v), "float")
    }

    pub fn set_out_str(&mut self, port: usize, v: String) -> Result<(), GraphError> {
        self.typed_out(port, |p| p.set_str(v), "string")
    }

    pub fn set_out_bool(&mut self, port: usize, v: bool) -> Result<(), GraphError> {
        self.typed_out(port, |p| p.set_bool(v), "bool")
    }

    pub fn set_out_array(&mut self, port: usize, elems: Vec<ArrayElem>) -> Result<(), GraphError> {
        self.typed_out(
            port,
            |p| p.assign_from(&PortValue::Array(elems)),
            "array",
        )
    }

    pub fn push_out_int(&mut self, port: usize, v: i64) -> Result<(), GraphError> {
        self.typed_out(port, |p| p.push_array_int(v), "array")
    }

    pub fn push_out_str(&mut self, port: usize, v: String) -> Result<(), GraphError> {
        self.typed_out(port, |p| p.push_array_str(v), "array")
    }

    /// Copy an arbitrary value into an output port; the variant tags must
    /// match.
    pub fn set_out_value(&mut self, port: usize, value: &PortValue) -> Result<(), GraphError> {
        self.typed_out(port, |p| p.assign_from(value), value.port_type().as_str())
    }

    /* ─────────────────── defaults and variables ──────────────── */

    /// The author's default literal for an input port, if set.
    pub fn default_literal(&self, port: usize) -> Option<&Literal> {
        self.node().defaults.get(&port)
    }

    pub fn default_int_array(&self, port: usize) -> Option<Vec<i64>> {
        self.default_literal(port)?.as_int_array()
    }

    pub fn default_str_array(&self, port: usize) -> Option<Vec<String>> {
        self.default_literal(port)?.as_str_array()
    }

    /// The variable name attached to this template node (accessor nodes
    /// only).
    pub fn variable_name(&self) -> Result<&str, GraphError> {
        self.node().variable.as_deref().ok_or_else(|| {
            GraphError::new(GraphErrorKind::NotFound)
                .with_message(format!("{} has no variable name", self.node_name()))
        })
    }

    /// Read a variable; the `g_` prefix selects the global table.
    pub fn var_get(&self, name: &str) -> Option<PortValue> {
        if is_global_var(name) {
            self.walker.inst.globals.get(name).cloned()
        } else {
            self.walker.inst.locals.get(name).cloned()
        }
    }

    /// Store a variable; the `g_` prefix selects the global table.
    pub fn var_set(&mut self, name: &str, value: PortValue) {
        if is_global_var(name) {
            self.walker.inst.globals.insert(name.to_string(), value);
        } else {
            self.walker.inst.locals.insert(name.to_string(), value);
        }
    }

    /* ─────────────────── dispatch and timers ─────────────────── */

    /// Number of out-exec successor slots on this node.
    pub fn out_exec_count(&self) -> usize {
        self.node().next.len()
    }

    /// Dispatch one exec successor directly (multi-dispatch nodes).
    /// Unwired slots are skipped; out-of-range branches are an error.
    pub fn do_next(&mut self, branch: usize) -> Result<(), GraphError> {
        let slot = self.node().next.get(branch).copied().ok_or_else(|| {
            GraphError::new(GraphErrorKind::NotFound)
                .with_message(format!("next index {branch} not found"))
        })?;
        match slot {
            Some(succ) => self.walker.visit(succ, None),
            None => Ok(()),
        }
    }

    /// The instance's deterministic random stream.
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.walker.inst.rng
    }

    /// Schedule a host timer that will trigger the timer entrance of this
    /// graph with `args`, then cancel its own handle. The handle joins the
    /// instance's live-timer set.
    pub fn schedule_timer(&mut self, delay: Duration, args: Vec<ArrayElem>) -> TimerHandle {
        let host = Arc::clone(self.walker.host);
        let graph_id = self.graph_id();
        let handle = self.walker.host.schedule_after(
            delay,
            Box::new(move |handle| {
                if let Err(err) = host.trigger_event(graph_id, ENTRANCE_TIMER, &[Literal::Array(args)])
                {
                    warn!(graph_id, handle, %err, "timer event dropped");
                }
                host.cancel_timer(graph_id, handle);
            }),
        );
        self.walker.inst.timers.insert(handle);
        handle
    }

    /// Cancel a timer handle with the host and drop it from the live set.
    /// Returns the host's answer; `false` means the handle was unknown.
    pub fn cancel_timer(&mut self, handle: TimerHandle) -> bool {
        let ok = self.walker.host.cancel(handle);
        self.walker.inst.timers.remove(&handle);
        ok
    }
}
