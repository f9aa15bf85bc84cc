pub mod force_graph;
pub mod knowledge_graph;
pub mod measure;
pub mod tooltip;
