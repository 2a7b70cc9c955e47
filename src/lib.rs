//! archflow library: dependency graph, request-flow reconstruction and change impact for
//! object-oriented codebases.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;

pub use error::EngineError;
