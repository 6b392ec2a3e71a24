//! Variable accessor nodes.
//!
//! These back the synthesized `GetVar_<T>` / `SetVar_<T>` prototypes; the
//! loader attaches the variable name to the template node when it resolves
//! a `Get_<name>` / `Set_<name>` class. The `g_` name prefix selects the
//! instance's global table, everything else the per-`Do` local table.

use bluegraph_common::{GraphError, GraphErrorKind};

use crate::engine::NodeCtx;
use crate::executable::Executable;

/// Publishes the variable's current value on data out-port 0. Fails when
/// the variable has not been set in the selected table.
pub struct GetVarNode {
    node_name: String,
}

impl GetVarNode {
    pub fn new(node_name: String) -> Self {
        GetVarNode { node_name }
    }
}

impl Executable for GetVarNode {
    fn name(&self) -> &str {
        &self.node_name
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let var = ctx.variable_name()?.to_string();
        let value = ctx.var_get(&var).ok_or_else(|| {
            GraphError::new(GraphErrorKind::NotFound)
                .with_message(format!("variable {var} not found, node name {}", self.node_name))
        })?;
        ctx.set_out_value(0, &value)?;
        Ok(0)
    }
}

/// Stores a clone of input port 1 into the variable and republishes it on
/// data out-port 1.
pub struct SetVarNode {
    node_name: String,
}

impl SetVarNode {
    pub fn new(node_name: String) -> Self {
        SetVarNode { node_name }
    }
}

impl Executable for SetVarNode {
    fn name(&self) -> &str {
        &self.node_name
    }

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError> {
        let var = ctx.variable_name()?.to_string();
        let value = ctx.in_value(1)?;
        ctx.var_set(&var, value.clone());
        ctx.set_out_value(1, &value)?;
        Ok(0)
    }
}
