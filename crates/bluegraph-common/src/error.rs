//! Engine-wide error representation.
//!
//! - **`GraphErrorKind`** : the canonical set of engine failure classes
//! - **`ErrorContext`**   : lightweight location info (graph / node / port)
//! - **`GraphError`**     : one struct that glues the two together
//!
//! Every fallible operation in the loader and the engine returns
//! `Result<_, GraphError>`; internal invariant violations are converted
//! into errors rather than panics, so nothing unwinds out of `Do`.

use std::{error::Error, fmt};

/// All recognised engine failure classes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GraphErrorKind {
    /// Node-schema validation or decoding failed during registry load.
    Schema,
    /// Graph resolution or template preparation failed during graph load.
    Load,
    /// Exec or data-pull recursion exceeded its bound.
    Recursion,
    /// A port read, write, or literal coercion did not match the port's
    /// variant tag.
    Type,
    /// Array index out of range.
    Range,
    /// Integer division or modulo by zero.
    Div,
    /// A named thing (graph, entrance, node, prototype, variable, port)
    /// does not exist.
    NotFound,
    /// Filesystem access failed while walking a definition directory.
    Io,
}

impl fmt::Display for GraphErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Schema => "schema",
            Self::Load => "load",
            Self::Recursion => "recursion",
            Self::Type => "type",
            Self::Range => "range",
            Self::Div => "div-by-zero",
            Self::NotFound => "not-found",
            Self::Io => "io",
        })
    }
}

/// Generic, lightweight location info that any error may carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ErrorContext {
    pub graph: Option<String>,
    pub node: Option<String>,
    pub port: Option<usize>,
}

/// The single error struct the whole workspace passes around.
///
/// * **kind**    – the mandatory failure class
/// * **message** – optional human explanation
/// * **context** – optional graph/node/port location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphError {
    pub kind: GraphErrorKind,
    pub message: Option<String>,
    pub context: Option<ErrorContext>,
}

impl From<GraphErrorKind> for GraphError {
    fn from(kind: GraphErrorKind) -> Self {
        Self {
            kind,
            message: None,
            context: None,
        }
    }
}

impl GraphError {
    /// Basic constructor (no message, no location).
    pub fn new(kind: GraphErrorKind) -> Self {
        kind.into()
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Attach the graph name the error occurred in.
    pub fn with_graph<S: Into<String>>(mut self, graph: S) -> Self {
        self.context_mut().graph = Some(graph.into());
        self
    }

    /// Attach the author-assigned node id the error occurred at.
    pub fn with_node<S: Into<String>>(mut self, node: S) -> Self {
        self.context_mut().node = Some(node.into());
        self
    }

    /// Attach the port id the error occurred at.
    pub fn with_port(mut self, port: usize) -> Self {
        self.context_mut().port = Some(port);
        self
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        self.context.get_or_insert_with(ErrorContext::default)
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(ref ctx) = self.context {
            if let Some(ref graph) = ctx.graph {
                write!(f, " (graph {graph})")?;
            }
            if let Some(ref node) = ctx.node {
                write!(f, " (node {node})")?;
            }
            if let Some(port) = ctx.port {
                write!(f, " (port {port})")?;
            }
        }
        Ok(())
    }
}

impl Error for GraphError {}

impl From<std::io::Error> for GraphError {
    fn from(err: std::io::Error) -> Self {
        GraphError::new(GraphErrorKind::Io).with_message(err.to_string())
    }
}

impl From<GraphError> for String {
    fn from(error: GraphError) -> Self {
        format!("{error}")
    }
}
