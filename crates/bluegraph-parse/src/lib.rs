pub mod graph;
pub mod names;
pub mod schema;

pub use graph::*;
pub use names::*;
pub use schema::*;
