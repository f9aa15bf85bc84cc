//! Radial query → sources → entities diagram.

mod component;
pub mod labels;
pub mod layout;

pub use component::KnowledgeGraph;
pub use layout::{QueryMeta, SourceRef};
