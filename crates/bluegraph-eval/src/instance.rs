//! Per-run mutable state of one created graph.

use std::sync::Arc;

use bluegraph_common::PortValue;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::host::TimerHandle;
use crate::manager::GraphId;
use crate::registry::NodeProto;
use crate::template::{GraphTemplate, NodeIdx};

/// The realized ports of one node for the current `Do`: cloned input and
/// output values, `None` at exec ports and port-id gaps.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub inputs: Vec<Option<PortValue>>,
    pub outputs: Vec<Option<PortValue>>,
}

impl ExecContext {
    /// Clone the prototype's port slots with zero payloads.
    pub fn from_proto(proto: &NodeProto) -> Self {
        let clone_slots = |slots: &crate::registry::PortSlots| {
            slots
                .iter()
                .map(|slot| match slot {
                    Some(s) if !s.value.is_exec() => Some(s.value.clone()),
                    _ => None,
                })
                .collect()
        };
        ExecContext {
            inputs: clone_slots(&proto.inputs),
            outputs: clone_slots(&proto.outputs),
        }
    }
}

/// One live graph: the unit the manager owns.
///
/// The context map and local-variable table are scratch state reset at the
/// start of every `Do`; the global-variable table and the live-timer set
/// persist until the graph is released.
pub struct GraphInstance {
    pub graph_id: GraphId,
    pub(crate) template: Arc<GraphTemplate>,
    pub(crate) contexts: FxHashMap<NodeIdx, ExecContext>,
    pub(crate) locals: FxHashMap<String, PortValue>,
    pub(crate) globals: FxHashMap<String, PortValue>,
    pub(crate) timers: FxHashSet<TimerHandle>,
    pub(crate) rng: SmallRng,
}

impl GraphInstance {
    pub fn new(graph_id: GraphId, template: Arc<GraphTemplate>) -> Self {
        GraphInstance {
            graph_id,
            template,
            contexts: FxHashMap::default(),
            locals: FxHashMap::default(),
            globals: FxHashMap::default(),
            timers: FxHashSet::default(),
            // Deterministic per instance; nodes that want a caller-chosen
            // stream seed their own generator.
            rng: SmallRng::seed_from_u64(graph_id as u64),
        }
    }

    pub fn template(&self) -> &Arc<GraphTemplate> {
        &self.template
    }

    /// Handles of timers issued by this instance that have neither fired
    /// nor been cancelled.
    pub fn live_timers(&self) -> impl Iterator<Item = TimerHandle> + '_ {
        self.timers.iter().copied()
    }

    /// Swap in a new template version, keeping the global-variable table
    /// and in-flight timers. Contexts and locals are dropped: they are
    /// per-`Do` scratch and their node indices belong to the old topology.
    pub(crate) fn rebind(&mut self, template: Arc<GraphTemplate>) {
        self.template = template;
        self.contexts.clear();
        self.locals.clear();
    }

    /// Current input port value of a node, by author node id. Populated
    /// only for nodes visited during the most recent `Do`.
    pub fn node_in_port(&self, node_id: &str, port: usize) -> Option<&PortValue> {
        let idx = self.template.node_index(node_id)?;
        self.contexts.get(&idx)?.inputs.get(port)?.as_ref()
    }

    /// Current output port value of a node, by author node id.
    pub fn node_out_port(&self, node_id: &str, port: usize) -> Option<&PortValue> {
        let idx = self.template.node_index(node_id)?;
        self.contexts.get(&idx)?.outputs.get(port)?.as_ref()
    }

    /// Read a global variable (survives across `Do` calls).
    pub fn global(&self, name: &str) -> Option<&PortValue> {
        self.globals.get(name)
    }
}
