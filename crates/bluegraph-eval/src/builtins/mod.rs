//! The built-in node catalogue.
//!
//! Every module binds its executables against prototypes the schema
//! directory declares; a definition directory that does not declare a
//! given node kind simply does not get that node.

pub mod arrays;
pub mod control;
pub mod entrances;
pub mod math;
pub mod timers;
pub mod variables;

use bluegraph_common::GraphError;

use crate::registry::NodeRegistry;

/// Bind all built-in executables. Runs at engine init and again on every
/// hot reload, before the host's own registration hook.
pub fn register_all(reg: &mut NodeRegistry) -> Result<(), GraphError> {
    entrances::register_builtins(reg)?;
    math::register_builtins(reg)?;
    arrays::register_builtins(reg)?;
    control::register_builtins(reg)?;
    timers::register_builtins(reg)?;
    Ok(())
}
