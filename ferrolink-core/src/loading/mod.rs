//! Build-time linking of a complete street graph.

mod annotations;
mod builder;

pub use annotations::BuildAnnotation;
pub use builder::link_street_graph;
