//! Dependency graph construction and validation.
//!
//! Converts the declarations in a `DeclarationStore` into a directed graph,
//! checks that every dependency name resolves and rejects cycles.

pub mod errors;
pub mod graph;

pub use errors::GraphError;
pub use graph::DependencyGraph;
