//! The capability every runnable node kind exposes.

use bluegraph_common::GraphError;

use crate::engine::NodeCtx;

/// A runnable node implementation, bound to a schema-declared prototype by
/// name.
///
/// `execute` reads its pulled input ports and writes its output ports
/// through the [`NodeCtx`], then returns the out-exec port ordinal the
/// engine should follow next, or `-1` to end the exec flow at this node.
///
/// Multi-dispatch nodes (`Sequence`, the foreach loops, timers) walk their
/// successors themselves via [`NodeCtx::do_next`] and return `-1` so the
/// engine does not double-dispatch.
pub trait Executable {
    /// The prototype name this implementation binds to.
    fn name(&self) -> &str;

    fn execute(&self, ctx: &mut NodeCtx<'_, '_>) -> Result<i64, GraphError>;
}
