//! Shared test scaffolding: a schema directory covering the builtin
//! catalogue, written to disk the way an editor would export it, plus a
//! manager + mock-host harness.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use bluegraph_common::{ArrayElem, GraphError, Literal};
use tempfile::TempDir;

use crate::host::Host;
use crate::manager::{GraphId, GraphManager};
use crate::template::EntranceId;
use crate::test_host::MockHost;

/// Node schemas for every builtin the tests exercise. Exec ports always
/// come first on both sides; data port ids continue the numbering.
pub(crate) const BUILTIN_DEFS: &str = r#"[
  { "name": "Entrance_IntParam_1", "title": "Int Entrance", "package": "sys",
    "outputs": [
      { "name": "then", "type": "exec", "port_id": 0 },
      { "name": "value", "type": "data", "data_type": "int", "port_id": 1 } ] },

  { "name": "Entrance_ArrayParam_2", "title": "Array Entrance", "package": "sys",
    "outputs": [
      { "name": "then", "type": "exec", "port_id": 0 },
      { "name": "value", "type": "data", "data_type": "array", "port_id": 1 } ] },

  { "name": "Entrance_Timer_3", "title": "Timer Entrance", "package": "sys",
    "outputs": [
      { "name": "then", "type": "exec", "port_id": 0 },
      { "name": "args", "type": "data", "data_type": "array", "port_id": 1 } ] },

  { "name": "Output", "package": "sys",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "int", "type": "data", "data_type": "int", "port_id": 1 },
      { "name": "text", "type": "data", "data_type": "string", "port_id": 2 },
      { "name": "array", "type": "data", "data_type": "array", "port_id": 3 } ],
    "outputs": [ { "name": "then", "type": "exec", "port_id": 0 } ] },

  { "name": "AddInt", "package": "math", "is_pure": true,
    "inputs": [
      { "name": "a", "type": "data", "data_type": "int", "has_input": true, "port_id": 0 },
      { "name": "b", "type": "data", "data_type": "int", "has_input": true, "port_id": 1 } ],
    "outputs": [ { "name": "ret", "type": "data", "data_type": "int", "port_id": 0 } ] },

  { "name": "SubInt", "package": "math", "is_pure": true,
    "inputs": [
      { "name": "a", "type": "data", "data_type": "int", "port_id": 0 },
      { "name": "b", "type": "data", "data_type": "int", "port_id": 1 },
      { "name": "abs", "type": "data", "data_type": "bool", "port_id": 2 } ],
    "outputs": [ { "name": "ret", "type": "data", "data_type": "int", "port_id": 0 } ] },

  { "name": "MulInt", "package": "math", "is_pure": true,
    "inputs": [
      { "name": "a", "type": "data", "data_type": "int", "port_id": 0 },
      { "name": "b", "type": "data", "data_type": "int", "port_id": 1 } ],
    "outputs": [ { "name": "ret", "type": "data", "data_type": "int", "port_id": 0 } ] },

  { "name": "DivInt", "package": "math", "is_pure": true,
    "inputs": [
      { "name": "a", "type": "data", "data_type": "int", "port_id": 0 },
      { "name": "b", "type": "data", "data_type": "int", "port_id": 1 },
      { "name": "round", "type": "data", "data_type": "bool", "port_id": 2 } ],
    "outputs": [ { "name": "ret", "type": "data", "data_type": "int", "port_id": 0 } ] },

  { "name": "ModInt", "package": "math", "is_pure": true,
    "inputs": [
      { "name": "a", "type": "data", "data_type": "int", "port_id": 0 },
      { "name": "b", "type": "data", "data_type": "int", "port_id": 1 } ],
    "outputs": [ { "name": "ret", "type": "data", "data_type": "int", "port_id": 0 } ] },

  { "name": "RandNumber", "package": "math", "is_pure": true,
    "inputs": [
      { "name": "seed", "type": "data", "data_type": "int", "port_id": 0 },
      { "name": "min", "type": "data", "data_type": "int", "port_id": 1 },
      { "name": "max", "type": "data", "data_type": "int", "port_id": 2 } ],
    "outputs": [ { "name": "ret", "type": "data", "data_type": "int", "port_id": 0 } ] },

  { "name": "Sequence", "package": "flow",
    "inputs": [ { "name": "exec", "type": "exec", "port_id": 0 } ],
    "outputs": [
      { "name": "then_0", "type": "exec", "port_id": 0 },
      { "name": "then_1", "type": "exec", "port_id": 1 },
      { "name": "then_2", "type": "exec", "port_id": 2 } ] },

  { "name": "Foreach", "package": "flow",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "start", "type": "data", "data_type": "int", "port_id": 1 },
      { "name": "end", "type": "data", "data_type": "int", "port_id": 2 } ],
    "outputs": [
      { "name": "loop", "type": "exec", "port_id": 0 },
      { "name": "done", "type": "exec", "port_id": 1 },
      { "name": "index", "type": "data", "data_type": "int", "port_id": 2 } ] },

  { "name": "ForeachIntArray", "package": "flow",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "array", "type": "data", "data_type": "array", "port_id": 1 } ],
    "outputs": [
      { "name": "loop", "type": "exec", "port_id": 0 },
      { "name": "done", "type": "exec", "port_id": 1 },
      { "name": "elem", "type": "data", "data_type": "int", "port_id": 2 } ] },

  { "name": "GetArrayInt", "package": "array", "is_pure": true,
    "inputs": [
      { "name": "array", "type": "data", "data_type": "array", "port_id": 0 },
      { "name": "index", "type": "data", "data_type": "int", "port_id": 1 } ],
    "outputs": [ { "name": "value", "type": "data", "data_type": "int", "port_id": 0 } ] },

  { "name": "GetArrayString", "package": "array", "is_pure": true,
    "inputs": [
      { "name": "array", "type": "data", "data_type": "array", "port_id": 0 },
      { "name": "index", "type": "data", "data_type": "int", "port_id": 1 } ],
    "outputs": [ { "name": "value", "type": "data", "data_type": "string", "port_id": 0 } ] },

  { "name": "GetArrayLen", "package": "array", "is_pure": true,
    "inputs": [ { "name": "array", "type": "data", "data_type": "array", "port_id": 0 } ],
    "outputs": [ { "name": "len", "type": "data", "data_type": "int", "port_id": 0 } ] },

  { "name": "CreateIntArray", "package": "array", "is_pure": true,
    "inputs": [ { "name": "values", "type": "data", "data_type": "array", "port_id": 0 } ],
    "outputs": [ { "name": "array", "type": "data", "data_type": "array", "port_id": 0 } ] },

  { "name": "CreateStringArray", "package": "array", "is_pure": true,
    "inputs": [ { "name": "values", "type": "data", "data_type": "array", "port_id": 0 } ],
    "outputs": [ { "name": "array", "type": "data", "data_type": "array", "port_id": 0 } ] },

  { "name": "AppendIntegerToArray", "package": "array", "is_pure": true,
    "inputs": [
      { "name": "array", "type": "data", "data_type": "array", "port_id": 0 },
      { "name": "value", "type": "data", "data_type": "int", "port_id": 1 } ],
    "outputs": [ { "name": "array", "type": "data", "data_type": "array", "port_id": 0 } ] },

  { "name": "AppendStringToArray", "package": "array", "is_pure": true,
    "inputs": [
      { "name": "array", "type": "data", "data_type": "array", "port_id": 0 },
      { "name": "value", "type": "data", "data_type": "string", "port_id": 1 } ],
    "outputs": [ { "name": "array", "type": "data", "data_type": "array", "port_id": 0 } ] },

  { "name": "BoolIf", "package": "flow",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "cond", "type": "data", "data_type": "bool", "port_id": 1 } ],
    "outputs": [
      { "name": "false", "type": "exec", "port_id": 0 },
      { "name": "true", "type": "exec", "port_id": 1 } ] },

  { "name": "GreaterThanInteger", "package": "flow",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "eq", "type": "data", "data_type": "bool", "port_id": 1 },
      { "name": "a", "type": "data", "data_type": "int", "port_id": 2 },
      { "name": "b", "type": "data", "data_type": "int", "port_id": 3 } ],
    "outputs": [
      { "name": "false", "type": "exec", "port_id": 0 },
      { "name": "true", "type": "exec", "port_id": 1 } ] },

  { "name": "LessThanInteger", "package": "flow",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "eq", "type": "data", "data_type": "bool", "port_id": 1 },
      { "name": "a", "type": "data", "data_type": "int", "port_id": 2 },
      { "name": "b", "type": "data", "data_type": "int", "port_id": 3 } ],
    "outputs": [
      { "name": "false", "type": "exec", "port_id": 0 },
      { "name": "true", "type": "exec", "port_id": 1 } ] },

  { "name": "EqualInteger", "package": "flow",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "a", "type": "data", "data_type": "int", "port_id": 1 },
      { "name": "b", "type": "data", "data_type": "int", "port_id": 2 } ],
    "outputs": [
      { "name": "false", "type": "exec", "port_id": 0 },
      { "name": "true", "type": "exec", "port_id": 1 } ] },

  { "name": "RangeCompare", "package": "flow",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "value", "type": "data", "data_type": "int", "port_id": 1 },
      { "name": "thresholds", "type": "data", "data_type": "array", "port_id": 2 } ],
    "outputs": [
      { "name": "none", "type": "exec", "port_id": 0 },
      { "name": "spare", "type": "exec", "port_id": 1 },
      { "name": "le_0", "type": "exec", "port_id": 2 },
      { "name": "le_1", "type": "exec", "port_id": 3 },
      { "name": "le_2", "type": "exec", "port_id": 4 } ] },

  { "name": "Probability", "package": "flow",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "p", "type": "data", "data_type": "int", "port_id": 1 } ],
    "outputs": [
      { "name": "miss", "type": "exec", "port_id": 0 },
      { "name": "hit", "type": "exec", "port_id": 1 } ] },

  { "name": "CreateTimer", "package": "timer",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "delay_ms", "type": "data", "data_type": "int", "port_id": 1 },
      { "name": "args", "type": "data", "data_type": "array", "port_id": 2 } ],
    "outputs": [
      { "name": "then", "type": "exec", "port_id": 0 },
      { "name": "handle", "type": "data", "data_type": "int", "port_id": 1 } ] },

  { "name": "CloseTimer", "package": "timer",
    "inputs": [
      { "name": "exec", "type": "exec", "port_id": 0 },
      { "name": "handle", "type": "data", "data_type": "int", "port_id": 1 } ],
    "outputs": [ { "name": "then", "type": "exec", "port_id": 0 } ] }
]"#;

pub(crate) struct Harness {
    pub dir: TempDir,
    pub host: Arc<MockHost>,
    pub manager: Rc<RefCell<GraphManager>>,
}

impl Harness {
    pub fn def_dir(&self) -> PathBuf {
        self.dir.path().join("defs")
    }

    pub fn graph_dir(&self) -> PathBuf {
        self.dir.path().join("graphs")
    }

    pub fn create(&self, name: &str) -> GraphId {
        self.manager
            .borrow_mut()
            .create_graph(name)
            .unwrap_or_else(|| panic!("graph {name} not loaded"))
    }

    pub fn do_graph(
        &self,
        graph_id: GraphId,
        entrance: EntranceId,
        args: &[Literal],
    ) -> Result<Option<Vec<ArrayElem>>, GraphError> {
        self.manager.borrow_mut().do_graph(graph_id, entrance, args)
    }

    /// Replace a graph file on disk (the template name stays the file
    /// stem); pair with `hot_reload`.
    pub fn rewrite_graph(&self, name: &str, body: &str) {
        fs::write(self.graph_dir().join(format!("{name}.vgf")), body).unwrap();
    }
}

pub(crate) fn write_defs(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("builtins.json"), BUILTIN_DEFS).unwrap();
}

/// Build a harness with the builtin defs and the given `(name, body)`
/// graph files, then init a manager wired to a mock host.
pub(crate) fn setup(graphs: &[(&str, &str)]) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let def_dir = dir.path().join("defs");
    let graph_dir = dir.path().join("graphs");
    write_defs(&def_dir);
    fs::create_dir_all(&graph_dir).unwrap();
    for (name, body) in graphs {
        fs::write(graph_dir.join(format!("{name}.vgf")), body).unwrap();
    }

    let host = MockHost::new();
    let manager = GraphManager::init(
        &def_dir,
        &graph_dir,
        Arc::clone(&host) as Arc<dyn Host>,
        Box::new(|_| Ok(())),
    )
    .expect("init");
    let manager = Rc::new(RefCell::new(manager));
    host.attach(&manager);

    Harness { dir, host, manager }
}

/// One-shot convenience: load `body` as graph "main", create it, run one
/// entrance.
pub(crate) fn run_graph(
    body: &str,
    entrance: EntranceId,
    args: &[Literal],
) -> Result<Option<Vec<ArrayElem>>, GraphError> {
    let harness = setup(&[("main", body)]);
    let graph_id = harness.create("main");
    harness.do_graph(graph_id, entrance, args)
}

/// The int slots of a `Do` return array; panics when the call returned
/// nothing.
pub(crate) fn int_return(ret: Option<Vec<ArrayElem>>) -> Vec<i64> {
    ret.expect("expected a g_Return array")
        .iter()
        .map(|e| e.int_val)
        .collect()
}
