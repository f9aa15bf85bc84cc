//! Force-directed entity graph: data model, hyperedge decomposition,
//! importance filtering, layout, highlight state and the canvas component.

mod component;
pub mod decompose;
pub mod explorer;
pub mod filter;
pub mod highlight;
pub mod model;
mod render;
pub mod simulation;
pub mod state;
pub mod types;

pub use component::{ForceGraphCanvas, GraphRuntime};
pub use explorer::{GraphExplorer, GraphOutcome, GraphStatus, ViewMode};
pub use types::{EntityNode, EntityType, GraphData, GraphLink, Hyperedge};
