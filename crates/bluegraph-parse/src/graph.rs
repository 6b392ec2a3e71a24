//! Graph documents.
//!
//! One `.vgf` file describes one authored graph: its nodes (with per-port
//! default literals), its exec and data edges, and its declared variables.
//! Edge port ids are the schema-assigned port ids, not array indices.

use std::collections::HashMap;

use bluegraph_common::{GraphError, GraphErrorKind, Literal};
use serde::Deserialize;

/// File extension for graph files. Non-JSON by convention even though the
/// payload is JSON, so schema files and graphs can share a directory root
/// without colliding.
pub const GRAPH_EXT: &str = "vgf";

#[derive(Debug, Clone, Deserialize)]
pub struct NodeDoc {
    pub id: String,
    pub class: String,
    #[serde(default)]
    pub module: String,
    /// Per-port default literal overrides, keyed by decimal port id.
    #[serde(default, rename = "port_defaultv")]
    pub port_defaults: HashMap<String, Literal>,
}

impl NodeDoc {
    /// Default literal for a port id, if the author set one.
    pub fn port_default(&self, port_id: usize) -> Option<&Literal> {
        self.port_defaults.get(&port_id.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeDoc {
    #[serde(default)]
    pub edge_id: String,
    pub source_node_id: String,
    pub des_node_id: String,
    pub source_port_id: u32,
    pub des_port_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub value: Literal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphDoc {
    #[serde(default)]
    pub graph_name: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
    #[serde(default)]
    pub edges: Vec<EdgeDoc>,
    #[serde(default)]
    pub variables: Vec<VariableDoc>,
}

impl GraphDoc {
    pub fn node_by_id(&self, node_id: &str) -> Option<&NodeDoc> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn variable_by_name(&self, name: &str) -> Option<&VariableDoc> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// The edge leaving `(source node, source port)`, if wired.
    pub fn edge_from(&self, source_node_id: &str, source_port_id: u32) -> Option<&EdgeDoc> {
        self.edges
            .iter()
            .find(|e| e.source_node_id == source_node_id && e.source_port_id == source_port_id)
    }

    /// The edge entering `(dest node, dest port)`, if wired.
    pub fn edge_into(&self, des_node_id: &str, des_port_id: u32) -> Option<&EdgeDoc> {
        self.edges
            .iter()
            .find(|e| e.des_node_id == des_node_id && e.des_port_id == des_port_id)
    }
}

/// Decode one graph file.
pub fn decode_graph(bytes: &[u8]) -> Result<GraphDoc, GraphError> {
    serde_json::from_slice(bytes).map_err(|e| {
        GraphError::new(GraphErrorKind::Load).with_message(format!("failed to decode graph: {e}"))
    })
}
