pub mod descriptor;
pub mod node;
pub mod edge;
pub mod type_registry;
pub mod graph;
pub mod classifier;
pub mod builder;
pub mod flow;
pub mod impact;
pub mod state;
pub mod tracker;
pub mod ports;
