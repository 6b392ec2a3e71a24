//! Graph templates: the shared, immutable topology an instance executes.
//!
//! The original pointer graph is re-architected as an arena — all template
//! nodes live in one vector and refer to each other by index — so ownership
//! stays acyclic and per-run context cloning is trivial.

use std::path::Path;
use std::sync::Arc;

use bluegraph_common::{GraphError, GraphErrorKind, Literal, PortType};
use bluegraph_parse::{
    GRAPH_EXT, GraphDoc, decode_graph, get_accessor_var, get_var_node_name, set_accessor_var,
    set_var_node_name, split_entrance_name,
};
use rustc_hash::FxHashMap;

use crate::executable::Executable;
use crate::registry::{NodeProto, NodeRegistry};

/// Externally addressable id of an entrance (also the event id timers
/// trigger).
pub type EntranceId = i64;

/// Index of a template node within its template's arena.
pub type NodeIdx = usize;

/// Preparation bound: the exec walk from one entrance may traverse at most
/// this many edges. Exceeding it (including via a cycle) fails the load.
pub const MAX_PREPARE_VISITS: u32 = 100;

/// The pre-resolved producer feeding one input data port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Producer {
    pub node: NodeIdx,
    pub out_port: usize,
}

/// A declared graph variable. Only the declared subtype participates at
/// runtime (accessor resolution); tables start empty every `Do`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub var_type: PortType,
    pub initial: Literal,
}

/// One authored node, resolved against the registry.
pub struct TemplateNode {
    /// Author-assigned node id (unique within the graph file).
    pub node_id: String,
    pub proto: Arc<NodeProto>,
    pub exec: Arc<dyn Executable>,
    /// Per-port default literal overrides, keyed by input port id.
    pub defaults: FxHashMap<usize, Literal>,
    /// Exec successor per out-exec port; `None` when unwired.
    pub next: Vec<Option<NodeIdx>>,
    /// Producer per input port; `None` for exec inputs, id gaps, and
    /// ports that fall back to their default literal.
    pub producers: Vec<Option<Producer>>,
    /// Variable name, for `Get_`/`Set_` accessor nodes.
    pub variable: Option<String>,
    /// True iff some exec edge enters this node.
    pub be_connect: bool,
    pub is_entrance: bool,
}

impl std::fmt::Debug for TemplateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateNode")
            .field("node_id", &self.node_id)
            .field("proto", &self.proto)
            .field("defaults", &self.defaults)
            .field("next", &self.next)
            .field("producers", &self.producers)
            .field("variable", &self.variable)
            .field("be_connect", &self.be_connect)
            .field("is_entrance", &self.is_entrance)
            .finish()
    }
}

/// The immutable topology for one graph name.
pub struct GraphTemplate {
    pub name: String,
    pub nodes: Vec<TemplateNode>,
    pub entrances: FxHashMap<EntranceId, NodeIdx>,
    pub variables: Vec<VarDecl>,
    index: FxHashMap<String, NodeIdx>,
}

impl std::fmt::Debug for GraphTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphTemplate")
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .field("entrances", &self.entrances)
            .field("variables", &self.variables)
            .field("index", &self.index)
            .finish()
    }
}

impl GraphTemplate {
    /// A template with no nodes and no entrances. Instances rebound to a
    /// vanished graph name during hot reload get one of these, so later
    /// `Do` calls report "entrance not found" instead of crashing.
    pub fn empty<S: Into<String>>(name: S) -> Self {
        GraphTemplate {
            name: name.into(),
            nodes: Vec::new(),
            entrances: FxHashMap::default(),
            variables: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn node_index(&self, node_id: &str) -> Option<NodeIdx> {
        self.index.get(node_id).copied()
    }
}

/// All templates loaded from one graph directory.
pub struct TemplateSet {
    templates: FxHashMap<String, Arc<GraphTemplate>>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("templates", &self.templates)
            .finish()
    }
}

impl TemplateSet {
    pub fn get(&self, name: &str) -> Option<&Arc<GraphTemplate>> {
        self.templates.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Walk `graph_dir` recursively and build a template per `.vgf` file; the
/// template name is the file stem. Any resolution or preparation error
/// fails the whole load.
pub fn load_dir(registry: &NodeRegistry, graph_dir: &Path) -> Result<TemplateSet, GraphError> {
    let mut templates = FxHashMap::default();

    crate::walk::walk_files(graph_dir, GRAPH_EXT, &mut |path, bytes| {
        let doc = decode_graph(&bytes)
            .map_err(|e| e.with_message(format!("{}: decode failed", path.display())))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let template = build_template(registry, &name, &doc).map_err(|e| e.with_graph(&name))?;
        if templates
            .insert(name.clone(), Arc::new(template))
            .is_some()
        {
            return Err(GraphError::new(GraphErrorKind::Load)
                .with_message(format!("graph {name} defined twice")));
        }
        Ok(())
    })?;

    Ok(TemplateSet { templates })
}

fn build_template(
    registry: &NodeRegistry,
    name: &str,
    doc: &GraphDoc,
) -> Result<GraphTemplate, GraphError> {
    let mut nodes = Vec::with_capacity(doc.nodes.len());
    let mut index = FxHashMap::default();

    // 1. Resolve every authored node to its bound prototype.
    for node_doc in &doc.nodes {
        let (proto, exec, variable) = resolve_class(registry, &node_doc.class, doc)?;

        let mut defaults = FxHashMap::default();
        for (key, lit) in &node_doc.port_defaults {
            let port_id: usize = key.parse().map_err(|_| {
                GraphError::new(GraphErrorKind::Load)
                    .with_message(format!("invalid default port id '{key}'"))
                    .with_node(&node_doc.id)
            })?;
            defaults.insert(port_id, lit.clone());
        }

        let idx = nodes.len();
        if index.insert(node_doc.id.clone(), idx).is_some() {
            return Err(GraphError::new(GraphErrorKind::Load)
                .with_message(format!("node id {} used twice", node_doc.id)));
        }
        nodes.push(TemplateNode {
            node_id: node_doc.id.clone(),
            next: vec![None; proto.out_exec_count()],
            producers: vec![None; proto.inputs.len()],
            proto,
            exec,
            defaults,
            variable,
            be_connect: false,
            is_entrance: false,
        });
    }

    // 2. Collect entrances.
    let mut entrances = FxHashMap::default();
    for node_doc in &doc.nodes {
        let Some((_, entrance_id)) = split_entrance_name(&node_doc.class) else {
            continue;
        };
        let idx = index[node_doc.id.as_str()];
        nodes[idx].is_entrance = true;
        if entrances.insert(entrance_id, idx).is_some() {
            return Err(GraphError::new(GraphErrorKind::Load)
                .with_message(format!("entrance id {entrance_id} used twice")));
        }
    }

    // 3. Wire exec successors by bounded walk from each entrance.
    for &entry in entrances.values() {
        let mut visits = 0u32;
        prepare_exec(&mut nodes, &index, entry, doc, &mut visits)?;
    }

    // 4. Pre-resolve the producer of every input data port.
    for idx in 0..nodes.len() {
        for port_id in 0..nodes[idx].producers.len() {
            let is_data = matches!(
                nodes[idx].proto.inputs[port_id],
                Some(ref slot) if !slot.value.is_exec()
            );
            if !is_data {
                continue;
            }
            let Some(edge) = doc.edge_into(&nodes[idx].node_id, port_id as u32) else {
                continue;
            };
            let src = *index.get(edge.source_node_id.as_str()).ok_or_else(|| {
                GraphError::new(GraphErrorKind::Load)
                    .with_message(format!("edge source node {} not found", edge.source_node_id))
            })?;
            nodes[idx].producers[port_id] = Some(Producer {
                node: src,
                out_port: edge.source_port_id as usize,
            });
        }
    }

    Ok(GraphTemplate {
        name: name.to_string(),
        nodes,
        entrances,
        variables: resolve_variables(doc)?,
        index,
    })
}

type Resolved = (Arc<NodeProto>, Arc<dyn Executable>, Option<String>);

fn resolve_class(
    registry: &NodeRegistry,
    class: &str,
    doc: &GraphDoc,
) -> Result<Resolved, GraphError> {
    // (a) entrance classes canonicalize to their aliased prototype name
    let canonical = match split_entrance_name(class) {
        Some((stem, _)) => stem,
        None => class,
    };

    // (b) direct lookup
    if let Some((proto, exec)) = registry.get(canonical) {
        return Ok((proto, exec, None));
    }

    // (c) variable accessors resolve through the declared subtype
    let (var_name, node_name) = if let Some(var) = get_accessor_var(class) {
        (var, declared_type(doc, class, var).map(get_var_node_name)?)
    } else if let Some(var) = set_accessor_var(class) {
        (var, declared_type(doc, class, var).map(set_var_node_name)?)
    } else {
        return Err(GraphError::new(GraphErrorKind::NotFound)
            .with_message(format!("{class} node has not been registered")));
    };

    let (proto, exec) = registry.get(&node_name).ok_or_else(|| {
        GraphError::new(GraphErrorKind::NotFound)
            .with_message(format!("{node_name} node has not been registered"))
    })?;
    Ok((proto, exec, Some(var_name.to_string())))
}

fn declared_type<'d>(doc: &'d GraphDoc, class: &str, var: &str) -> Result<&'d str, GraphError> {
    doc.variable_by_name(var)
        .map(|decl| decl.var_type.as_str())
        .ok_or_else(|| {
            GraphError::new(GraphErrorKind::NotFound)
                .with_message(format!("{class}: variable {var} is not declared"))
        })
}

fn resolve_variables(doc: &GraphDoc) -> Result<Vec<VarDecl>, GraphError> {
    doc.variables
        .iter()
        .map(|v| {
            let var_type = PortType::parse(&v.var_type).ok_or_else(|| {
                GraphError::new(GraphErrorKind::Load)
                    .with_message(format!("variable {}: invalid type {}", v.name, v.var_type))
            })?;
            Ok(VarDecl {
                name: v.name.clone(),
                var_type,
                initial: v.value.clone(),
            })
        })
        .collect()
}

fn prepare_exec(
    nodes: &mut [TemplateNode],
    index: &FxHashMap<String, NodeIdx>,
    idx: NodeIdx,
    doc: &GraphDoc,
    visits: &mut u32,
) -> Result<(), GraphError> {
    *visits += 1;
    if *visits > MAX_PREPARE_VISITS {
        return Err(GraphError::new(GraphErrorKind::Recursion)
            .with_message("exec preparation recursion too deep")
            .with_node(&nodes[idx].node_id));
    }

    for out_port in 0..nodes[idx].next.len() {
        let Some(edge) = doc.edge_from(&nodes[idx].node_id, out_port as u32) else {
            continue;
        };
        let succ = *index.get(edge.des_node_id.as_str()).ok_or_else(|| {
            GraphError::new(GraphErrorKind::Load)
                .with_message(format!("edge target node {} not found", edge.des_node_id))
        })?;
        nodes[idx].next[out_port] = Some(succ);
        nodes[succ].be_connect = true;
        prepare_exec(nodes, index, succ, doc, visits)?;
    }
    Ok(())
}
