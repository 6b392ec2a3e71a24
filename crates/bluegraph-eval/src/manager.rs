//! The graph manager: owns live instances, routes invocations and timer
//! events, and swaps definitions atomically on hot reload.
//!
//! The manager is not internally synchronized; callers serialize every
//! entry point on one executor (the host contract in [`crate::host`]
//! spells out how timer callbacks reenter).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use bluegraph_common::{ArrayElem, GraphError, GraphErrorKind, Literal};
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::builtins;
use crate::engine;
use crate::host::{Host, TimerHandle};
use crate::instance::GraphInstance;
use crate::registry::NodeRegistry;
use crate::template::{self, EntranceId, GraphTemplate, TemplateSet};

/// Stable identifier of a created graph instance. Never 0.
pub type GraphId = i64;

/// Extension hook run against a freshly loaded registry, both at init and
/// on every hot reload: the host binds its own executables to
/// schema-declared prototypes here.
pub type RegisterFn = Box<dyn Fn(&mut NodeRegistry) -> Result<(), GraphError>>;

pub struct GraphManager {
    registry: NodeRegistry,
    templates: TemplateSet,
    graphs: FxHashMap<GraphId, GraphInstance>,
    next_graph_id: AtomicI64,
    host: Arc<dyn Host>,
    def_dir: PathBuf,
    graph_dir: PathBuf,
    on_register: RegisterFn,
}

impl GraphManager {
    /// Load node definitions, bind the built-in executables plus whatever
    /// `on_register` adds, then load every graph template.
    pub fn init(
        def_dir: &Path,
        graph_dir: &Path,
        host: Arc<dyn Host>,
        on_register: RegisterFn,
    ) -> Result<Self, GraphError> {
        let (registry, templates) = Self::load(def_dir, graph_dir, &on_register)?;
        Ok(GraphManager {
            registry,
            templates,
            graphs: FxHashMap::default(),
            next_graph_id: AtomicI64::new(0),
            host,
            def_dir: def_dir.to_path_buf(),
            graph_dir: graph_dir.to_path_buf(),
            on_register,
        })
    }

    fn load(
        def_dir: &Path,
        graph_dir: &Path,
        on_register: &RegisterFn,
    ) -> Result<(NodeRegistry, TemplateSet), GraphError> {
        let mut registry = NodeRegistry::load_dir(def_dir)?;
        builtins::register_all(&mut registry)?;
        on_register(&mut registry)?;
        let templates = template::load_dir(&registry, graph_dir)?;
        Ok((registry, templates))
    }

    /// Instantiate the named template. Returns `None` for unknown names.
    pub fn create_graph(&mut self, name: &str) -> Option<GraphId> {
        let template = self.templates.get(name)?;
        let graph_id = self.next_graph_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.graphs
            .insert(graph_id, GraphInstance::new(graph_id, Arc::clone(template)));
        Some(graph_id)
    }

    /// Run one entrance of a live instance.
    pub fn do_graph(
        &mut self,
        graph_id: GraphId,
        entrance: EntranceId,
        args: &[Literal],
    ) -> Result<Option<Vec<ArrayElem>>, GraphError> {
        let host = Arc::clone(&self.host);
        let inst = self.instance_mut(graph_id)?;
        engine::do_entrance(inst, &host, entrance, args)
    }

    /// Route an event into a graph. Event ids are entrance ids; this is
    /// `do_graph` with the return array discarded, and it is how timer
    /// callbacks reenter the engine.
    pub fn trigger_event(
        &mut self,
        graph_id: GraphId,
        event_id: EntranceId,
        args: &[Literal],
    ) -> Result<(), GraphError> {
        self.do_graph(graph_id, event_id, args).map(|_| ())
    }

    /// Drop an instance: cancel its outstanding timers with the host and
    /// free all of its state. Unknown ids are a no-op.
    pub fn release_graph(&mut self, graph_id: GraphId) {
        let Some(inst) = self.graphs.remove(&graph_id) else {
            return;
        };
        for handle in inst.live_timers() {
            if !self.host.cancel(handle) {
                warn!(graph_id, handle, "cancel of released graph timer refused");
            }
        }
    }

    /// Cancel one timer: host cancellation first, then removal from the
    /// instance's live set. Safe on already-released instances.
    pub fn cancel_timer(&mut self, graph_id: GraphId, handle: TimerHandle) -> bool {
        let ok = self.host.cancel(handle);
        if !ok {
            warn!(graph_id, handle, "host refused timer cancel");
        }
        if let Some(inst) = self.graphs.get_mut(&graph_id) {
            inst.timers.remove(&handle);
        }
        ok
    }

    /// Reload definitions and graphs from the directories given at init,
    /// then rebind every live instance to the same-named new template.
    /// Variable tables and in-flight timers survive; instances whose
    /// template vanished get an empty one, so their next `Do` reports
    /// "entrance not found" instead of crashing.
    ///
    /// Must be called between `Do`s; nothing is swapped until both loads
    /// succeed.
    pub fn hot_reload(&mut self) -> Result<(), GraphError> {
        let (registry, templates) = Self::load(&self.def_dir, &self.graph_dir, &self.on_register)?;

        for inst in self.graphs.values_mut() {
            let name = inst.template().name.clone();
            match templates.get(&name) {
                Some(t) => inst.rebind(Arc::clone(t)),
                None => {
                    warn!(graph = %name, graph_id = inst.graph_id, "template vanished on hot reload");
                    inst.rebind(Arc::new(GraphTemplate::empty(name)));
                }
            }
        }

        self.registry = registry;
        self.templates = templates;
        Ok(())
    }

    /// Inspect a live instance.
    pub fn graph(&self, graph_id: GraphId) -> Option<&GraphInstance> {
        self.graphs.get(&graph_id)
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    fn instance_mut(&mut self, graph_id: GraphId) -> Result<&mut GraphInstance, GraphError> {
        self.graphs.get_mut(&graph_id).ok_or_else(|| {
            GraphError::new(GraphErrorKind::NotFound)
                .with_message(format!("graph not found, graphID:{graph_id}"))
        })
    }
}
