//! Node-schema documents.
//!
//! A schema file is a JSON array of node descriptions exported by the
//! authoring editor; one file usually covers a cluster of related node
//! kinds. The registry walks a directory tree and decodes every `.json`
//! file it finds.

use bluegraph_common::{GraphError, GraphErrorKind};
use serde::Deserialize;

/// File extension for node-schema files.
pub const SCHEMA_EXT: &str = "json";

/// One port declaration inside a node schema.
///
/// `port_id` is the stable ordinal the editor assigns; edges reference it
/// directly, so it is an identifier, not an array index.
#[derive(Debug, Clone, Deserialize)]
pub struct PortDef {
    pub name: String,
    #[serde(rename = "type")]
    pub port_type: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub has_input: bool,
    #[serde(default)]
    pub pin_widget: String,
    pub port_id: u32,
}

impl PortDef {
    pub fn is_exec(&self) -> bool {
        self.port_type.eq_ignore_ascii_case("exec")
    }

    pub fn is_data(&self) -> bool {
        self.port_type.eq_ignore_ascii_case("data")
    }
}

/// One node kind as declared by the editor.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSchema {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_pure: bool,
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    #[serde(default)]
    pub outputs: Vec<PortDef>,
}

/// Decode one schema file (a JSON array of node schemas).
pub fn decode_schemas(bytes: &[u8]) -> Result<Vec<NodeSchema>, GraphError> {
    serde_json::from_slice(bytes).map_err(|e| {
        GraphError::new(GraphErrorKind::Schema)
            .with_message(format!("failed to decode node schemas: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_schema_cluster() {
        let doc = br#"[
          {
            "name": "AddInt", "title": "Add", "package": "math",
            "description": "integer addition", "is_pure": true,
            "inputs": [
              { "name": "a", "type": "data", "data_type": "int", "has_input": true,
                "pin_widget": "spin", "port_id": 0 },
              { "name": "b", "type": "data", "data_type": "int", "has_input": true,
                "pin_widget": "spin", "port_id": 1 }
            ],
            "outputs": [
              { "name": "ret", "type": "data", "data_type": "int", "has_input": false,
                "port_id": 0 }
            ]
          }
        ]"#;
        let schemas = decode_schemas(doc).unwrap();
        assert_eq!(schemas.len(), 1);
        let s = &schemas[0];
        assert_eq!(s.name, "AddInt");
        assert!(s.is_pure);
        assert_eq!(s.inputs.len(), 2);
        assert!(s.inputs[0].is_data());
        assert_eq!(s.outputs[0].port_id, 0);
    }

    #[test]
    fn bad_json_reports_schema_kind() {
        let err = decode_schemas(b"{ not json").unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::Schema);
    }
}
