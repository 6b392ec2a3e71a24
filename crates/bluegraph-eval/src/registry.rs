//! The node-definition registry: schema-declared prototypes bound to
//! executable implementations.

use std::path::Path;
use std::sync::Arc;

use bluegraph_common::{GraphError, GraphErrorKind, PortType, PortValue};
use bluegraph_parse::{
    NodeSchema, PortDef, SCHEMA_EXT, decode_schemas, get_var_node_name, set_var_node_name,
    split_entrance_name,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::builtins::variables::{GetVarNode, SetVarNode};
use crate::executable::Executable;
use crate::walk::walk_files;

/// One port slot of a prototype. Slot position equals the schema port id;
/// gaps in the id space stay `None`.
#[derive(Debug, Clone)]
pub struct PortSlot {
    pub name: String,
    /// The zero value of the declared subtype; contexts clone from it.
    pub value: PortValue,
}

pub type PortSlots = SmallVec<[Option<PortSlot>; 4]>;

/// A node kind: canonical name, display attributes, and ordered port
/// slots. Prototypes are shared by every template node that references
/// them and never mutate after registry load.
#[derive(Debug, Clone)]
pub struct NodeProto {
    pub name: String,
    pub title: String,
    pub package: String,
    pub description: String,
    pub is_pure: bool,
    pub inputs: PortSlots,
    pub outputs: PortSlots,
}

impl NodeProto {
    /// Number of leading out-exec ports (the dispatchable branches).
    pub fn out_exec_count(&self) -> usize {
        self.outputs
            .iter()
            .take_while(|slot| matches!(slot, Some(s) if s.value.is_exec()))
            .count()
    }
}

/// Registry of prototypes plus the executables bound to them.
///
/// Loading is all-or-nothing at file granularity: a schema-level error
/// aborts the whole `load_dir`. Binding rejects unknown prototypes and
/// double registration.
pub struct NodeRegistry {
    protos: FxHashMap<String, Arc<NodeProto>>,
    execs: FxHashMap<String, Arc<dyn Executable>>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("protos", &self.protos)
            .field("execs", &self.execs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeRegistry {
    /// Walk `def_dir` recursively, decode every `.json` schema file, build
    /// prototypes, then synthesize the `GetVar_<T>` / `SetVar_<T>`
    /// variable accessors for every data subtype spelling.
    pub fn load_dir(def_dir: &Path) -> Result<Self, GraphError> {
        let mut reg = NodeRegistry {
            protos: FxHashMap::default(),
            execs: FxHashMap::default(),
        };

        walk_files(def_dir, SCHEMA_EXT, &mut |path, bytes| {
            let schemas = decode_schemas(&bytes)
                .map_err(|e| e.with_message(format!("{}: decode failed", path.display())))?;
            for schema in schemas {
                reg.insert_schema(schema)?;
            }
            Ok(())
        })?;

        reg.load_variable_accessors()?;
        Ok(reg)
    }

    /// Associate a host-provided executable with the prototype of the same
    /// name. The prototype must exist and not yet be bound.
    pub fn register(&mut self, exec: Arc<dyn Executable>) -> Result<(), GraphError> {
        let name = exec.name().to_string();
        if !self.protos.contains_key(&name) {
            return Err(GraphError::new(GraphErrorKind::NotFound)
                .with_message(format!("prototype {name} not found")));
        }
        if self.execs.contains_key(&name) {
            return Err(GraphError::new(GraphErrorKind::Schema)
                .with_message(format!("exec {name} already registered")));
        }
        self.execs.insert(name, exec);
        Ok(())
    }

    /// Bind a built-in executable if its prototype was declared by the
    /// schema directory; definition directories only declare the node
    /// kinds the editor exposes, so absent prototypes are skipped.
    pub(crate) fn register_if_declared(
        &mut self,
        exec: Arc<dyn Executable>,
    ) -> Result<(), GraphError> {
        if !self.protos.contains_key(exec.name()) {
            return Ok(());
        }
        self.register(exec)
    }

    /// The bound prototype for a canonical name, or nothing when the name
    /// is unknown or no executable has been registered for it.
    pub fn get(&self, name: &str) -> Option<(Arc<NodeProto>, Arc<dyn Executable>)> {
        let proto = self.protos.get(name)?;
        let exec = self.execs.get(name)?;
        Some((Arc::clone(proto), Arc::clone(exec)))
    }

    /// The prototype for a canonical name, bound or not.
    pub fn proto(&self, name: &str) -> Option<&Arc<NodeProto>> {
        self.protos.get(name)
    }

    pub fn len(&self) -> usize {
        self.protos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }

    /* ─────────────────── schema → prototype ─────────────────── */

    fn insert_schema(&mut self, schema: NodeSchema) -> Result<(), GraphError> {
        // Entrance aliasing: Entrance_<Kind>_<N> registers under
        // Entrance_<Kind>; the numeric suffix becomes an entrance id at
        // graph-load time.
        let name = match split_entrance_name(&schema.name) {
            Some((stem, _)) => stem.to_string(),
            None => schema.name.clone(),
        };

        let mut inputs = schema.inputs;
        let mut outputs = schema.outputs;
        inputs.sort_by_key(|p| p.port_id);
        outputs.sort_by_key(|p| p.port_id);

        Self::check_input_exec_placement(&name, &inputs)?;
        Self::check_output_exec_placement(&name, &outputs)?;

        let proto = NodeProto {
            name: name.clone(),
            title: schema.title,
            package: schema.package,
            description: schema.description,
            is_pure: schema.is_pure,
            inputs: Self::build_slots(&name, &inputs)?,
            outputs: Self::build_slots(&name, &outputs)?,
        };

        if self.protos.contains_key(&name) {
            return Err(GraphError::new(GraphErrorKind::Schema)
                .with_message(format!("exec {name} already registered")));
        }
        self.protos.insert(name, Arc::new(proto));
        Ok(())
    }

    fn check_input_exec_placement(name: &str, inputs: &[PortDef]) -> Result<(), GraphError> {
        let mut seen_exec = false;
        for (pos, port) in inputs.iter().enumerate() {
            if !port.is_exec() {
                continue;
            }
            if seen_exec {
                return Err(GraphError::new(GraphErrorKind::Schema)
                    .with_message(format!("node {name}: inputs allow only one exec port")));
            }
            if pos != 0 || port.port_id != 0 {
                return Err(GraphError::new(GraphErrorKind::Schema).with_message(format!(
                    "node {name}: the input exec port must be first, with port id 0"
                )));
            }
            seen_exec = true;
        }
        Ok(())
    }

    fn check_output_exec_placement(name: &str, outputs: &[PortDef]) -> Result<(), GraphError> {
        let mut seen_data = false;
        for port in outputs {
            if port.is_exec() {
                if seen_data {
                    return Err(GraphError::new(GraphErrorKind::Schema).with_message(format!(
                        "node {name}: output exec ports must precede data ports"
                    )));
                }
            } else {
                seen_data = true;
            }
        }
        Ok(())
    }

    fn build_slots(name: &str, ports: &[PortDef]) -> Result<PortSlots, GraphError> {
        let len = ports.iter().map(|p| p.port_id as usize + 1).max().unwrap_or(0);
        let mut slots: PortSlots = SmallVec::from_elem(None, len);

        for port in ports {
            let ty = if port.is_exec() {
                PortType::Exec
            } else if port.is_data() {
                PortType::parse(&port.data_type).ok_or_else(|| {
                    GraphError::new(GraphErrorKind::Schema).with_message(format!(
                        "invalid data type {}, node {name} port {}",
                        port.data_type, port.name
                    ))
                })?
            } else {
                return Err(GraphError::new(GraphErrorKind::Schema).with_message(format!(
                    "port type {} not supported, node {name} port {}",
                    port.port_type, port.name
                )));
            };

            let slot = &mut slots[port.port_id as usize];
            if slot.is_some() {
                return Err(GraphError::new(GraphErrorKind::Schema).with_message(format!(
                    "node {name}: duplicate port id {}",
                    port.port_id
                )));
            }
            *slot = Some(PortSlot {
                name: port.name.clone(),
                value: PortValue::new(ty),
            });
        }
        Ok(slots)
    }

    /* ─────────────── synthesized variable accessors ─────────────── */

    /// For each data subtype spelling, synthesize `GetVar_<T>` (typed data
    /// out only) and `SetVar_<T>` (exec in + typed in, exec out + typed
    /// out) and bind them to the internal variable-table executables.
    fn load_variable_accessors(&mut self) -> Result<(), GraphError> {
        for spelling in PortType::DATA_SPELLINGS {
            let ty = PortType::parse(spelling)
                .expect("DATA_SPELLINGS entries are valid subtype spellings");

            let get_name = get_var_node_name(spelling);
            let proto = NodeProto {
                name: get_name.clone(),
                title: String::new(),
                package: String::new(),
                description: String::new(),
                is_pure: true,
                inputs: SmallVec::new(),
                outputs: SmallVec::from_vec(vec![Some(PortSlot {
                    name: "value".into(),
                    value: PortValue::new(ty),
                })]),
            };
            self.insert_synthesized(proto, Arc::new(GetVarNode::new(get_name)))?;

            let set_name = set_var_node_name(spelling);
            let proto = NodeProto {
                name: set_name.clone(),
                title: String::new(),
                package: String::new(),
                description: String::new(),
                is_pure: false,
                inputs: SmallVec::from_vec(vec![
                    Some(PortSlot {
                        name: "exec".into(),
                        value: PortValue::Exec,
                    }),
                    Some(PortSlot {
                        name: "value".into(),
                        value: PortValue::new(ty),
                    }),
                ]),
                outputs: SmallVec::from_vec(vec![
                    Some(PortSlot {
                        name: "exec".into(),
                        value: PortValue::Exec,
                    }),
                    Some(PortSlot {
                        name: "value".into(),
                        value: PortValue::new(ty),
                    }),
                ]),
            };
            self.insert_synthesized(proto, Arc::new(SetVarNode::new(set_name)))?;
        }
        Ok(())
    }

    fn insert_synthesized(
        &mut self,
        proto: NodeProto,
        exec: Arc<dyn Executable>,
    ) -> Result<(), GraphError> {
        let name = proto.name.clone();
        if self.protos.contains_key(&name) {
            return Err(GraphError::new(GraphErrorKind::Schema)
                .with_message(format!("exec {name} already registered")));
        }
        self.protos.insert(name, Arc::new(proto));
        self.register(exec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    const MINIMAL: &str = r#"[
      { "name": "AddInt", "is_pure": true,
        "inputs": [
          { "name": "a", "type": "data", "data_type": "int", "port_id": 0 },
          { "name": "b", "type": "data", "data_type": "int", "port_id": 1 } ],
        "outputs": [
          { "name": "ret", "type": "data", "data_type": "int", "port_id": 0 } ] }
    ]"#;

    #[test]
    fn loads_and_synthesizes_accessors() {
        let dir = defs_dir(&[("math.json", MINIMAL)]);
        let reg = NodeRegistry::load_dir(dir.path()).unwrap();
        assert!(reg.proto("AddInt").is_some());
        // one accessor pair per subtype spelling, both spellings included
        for spelling in ["int", "integer", "float", "string", "bool", "boolean", "array"] {
            assert!(reg.get(&get_var_node_name(spelling)).is_some(), "{spelling}");
            assert!(reg.get(&set_var_node_name(spelling)).is_some(), "{spelling}");
        }
    }

    #[test]
    fn entrance_names_are_aliased() {
        let dir = defs_dir(&[(
            "sys.json",
            r#"[ { "name": "Entrance_IntParam_1",
                  "outputs": [
                    { "name": "then", "type": "exec", "port_id": 0 },
                    { "name": "value", "type": "data", "data_type": "int", "port_id": 1 } ] } ]"#,
        )]);
        let reg = NodeRegistry::load_dir(dir.path()).unwrap();
        assert!(reg.proto("Entrance_IntParam").is_some());
        assert!(reg.proto("Entrance_IntParam_1").is_none());
    }

    #[test]
    fn rejects_duplicate_names() {
        let dir = defs_dir(&[("a.json", MINIMAL), ("b.json", MINIMAL)]);
        let err = NodeRegistry::load_dir(dir.path()).unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::Schema);
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn rejects_second_input_exec() {
        let dir = defs_dir(&[(
            "bad.json",
            r#"[ { "name": "Bad",
                  "inputs": [
                    { "name": "e1", "type": "exec", "port_id": 0 },
                    { "name": "e2", "type": "exec", "port_id": 1 } ] } ]"#,
        )]);
        let err = NodeRegistry::load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("only one exec"));
    }

    #[test]
    fn rejects_misplaced_input_exec() {
        let dir = defs_dir(&[(
            "bad.json",
            r#"[ { "name": "Bad",
                  "inputs": [
                    { "name": "a", "type": "data", "data_type": "int", "port_id": 0 },
                    { "name": "e", "type": "exec", "port_id": 1 } ] } ]"#,
        )]);
        let err = NodeRegistry::load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("port id 0"));
    }

    #[test]
    fn rejects_output_exec_after_data() {
        let dir = defs_dir(&[(
            "bad.json",
            r#"[ { "name": "Bad",
                  "outputs": [
                    { "name": "v", "type": "data", "data_type": "int", "port_id": 0 },
                    { "name": "e", "type": "exec", "port_id": 1 } ] } ]"#,
        )]);
        let err = NodeRegistry::load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("precede data ports"));
    }

    #[test]
    fn rejects_non_directory_path() {
        let dir = defs_dir(&[("math.json", MINIMAL)]);
        let file = dir.path().join("math.json");
        let err = NodeRegistry::load_dir(&file).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[test]
    fn slots_are_sized_to_max_port_id() {
        let dir = defs_dir(&[(
            "gap.json",
            r#"[ { "name": "Gappy",
                  "inputs": [
                    { "name": "late", "type": "data", "data_type": "string", "port_id": 3 } ] } ]"#,
        )]);
        let reg = NodeRegistry::load_dir(dir.path()).unwrap();
        let proto = reg.proto("Gappy").unwrap();
        assert_eq!(proto.inputs.len(), 4);
        assert!(proto.inputs[0].is_none());
        assert!(proto.inputs[3].is_some());
    }
}
