//! Host-facing state for the two graph views.
//!
//! The "context" view is rebuilt from each response; the "sector" view is
//! loaded from the backend. Switching between them never touches the other
//! view's data, and filters re-run without discarding anything.

use std::collections::HashSet;

use log::{debug, info, warn};

use super::decompose::decompose;
use super::filter::{FilterCriteria, TypeFilter, importance_filter};
use super::model::{ExtractedEntity, context_graph, edge_from_dto, node_from_dto};
use super::types::{EntityNode, EntityType, GraphData, Hyperedge};
use crate::api::{EdgeDto, EntityNodeDto, Neighborhood};
use crate::error::GraphError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewMode {
	#[default]
	Context,
	Sector,
}

impl ViewMode {
	pub fn as_str(self) -> &'static str {
		match self {
			ViewMode::Context => "context",
			ViewMode::Sector => "sector",
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
enum LoadState {
	#[default]
	Idle,
	Loading,
	Loaded,
	Failed(String),
}

/// Data resident for one view.
#[derive(Clone, Debug, Default)]
pub struct GraphViewState {
	pub entities: Vec<EntityNode>,
	pub edges: Vec<Hyperedge>,
	pub search_filter: String,
	generation: u64,
	load: LoadState,
}

impl GraphViewState {
	pub fn is_populated(&self) -> bool {
		matches!(self.load, LoadState::Loaded | LoadState::Loading)
	}

	fn reset(&mut self) {
		self.entities.clear();
		self.edges.clear();
		self.generation += 1;
		self.load = LoadState::Idle;
	}
}

/// Proof that a fetch was started for a particular generation of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
	mode: ViewMode,
	generation: u64,
}

/// What the canvas should show right now.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphStatus {
	Loading,
	Ready,
	NothingExtracted,
	NothingIndexed,
	NoMatches,
	Error(String),
}

impl GraphStatus {
	/// Placeholder copy, `None` when the graph itself is shown.
	pub fn message(&self) -> Option<String> {
		match self {
			GraphStatus::Ready => None,
			GraphStatus::Loading => Some("Loading entity graph…".into()),
			GraphStatus::NothingExtracted => {
				Some("No entities extracted yet. Ask a question to build the context graph.".into())
			}
			GraphStatus::NothingIndexed => {
				Some("No entities indexed yet. Upload documents to populate the sector graph.".into())
			}
			GraphStatus::NoMatches => Some("No entities match the current filters.".into()),
			GraphStatus::Error(message) => Some(message.clone()),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphOutcome {
	pub status: GraphStatus,
	pub data: GraphData,
	/// Nodes loaded for the view before filtering.
	pub total: usize,
}

impl GraphOutcome {
	pub fn node_count(&self) -> usize {
		self.data.nodes.len()
	}
}

/// Both views plus the shared filter settings.
#[derive(Clone, Debug)]
pub struct GraphExplorer {
	context: GraphViewState,
	sector: GraphViewState,
	mode: ViewMode,
	types: TypeFilter,
	node_limit: usize,
}

impl GraphExplorer {
	pub fn new(node_limit: usize) -> Self {
		Self {
			context: GraphViewState::default(),
			sector: GraphViewState::default(),
			mode: ViewMode::default(),
			types: TypeFilter::all(),
			node_limit: node_limit.max(1),
		}
	}

	pub fn mode(&self) -> ViewMode {
		self.mode
	}

	pub fn node_limit(&self) -> usize {
		self.node_limit
	}

	pub fn types(&self) -> &TypeFilter {
		&self.types
	}

	pub fn view(&self, mode: ViewMode) -> &GraphViewState {
		match mode {
			ViewMode::Context => &self.context,
			ViewMode::Sector => &self.sector,
		}
	}

	fn view_mut(&mut self, mode: ViewMode) -> &mut GraphViewState {
		match mode {
			ViewMode::Context => &mut self.context,
			ViewMode::Sector => &mut self.sector,
		}
	}

	pub fn set_view(&mut self, mode: ViewMode) {
		self.mode = mode;
	}

	pub fn set_type_filter<I, S>(&mut self, enabled: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.types = TypeFilter::from_raw(enabled);
	}

	pub fn toggle_type(&mut self, kind: EntityType) {
		self.types.toggle(kind);
	}

	/// Applies to the active view only.
	pub fn set_search_filter(&mut self, text: &str) {
		let mode = self.mode;
		self.view_mut(mode).search_filter = text.to_string();
	}

	pub fn set_node_limit(&mut self, limit: usize) {
		self.node_limit = limit.max(1);
	}

	/// Replace the context view with the graph derived from a new response.
	pub fn load_context(&mut self, entities: &[ExtractedEntity], response: &str) {
		let (nodes, edges) = context_graph(entities, response);
		info!("context graph: {} entities, {} relationships", nodes.len(), edges.len());
		let view = &mut self.context;
		view.generation += 1;
		view.entities = nodes;
		view.edges = edges;
		view.load = LoadState::Loaded;
	}

	/// Mark a view as loading and hand out a ticket for the result.
	pub fn begin_load(&mut self, mode: ViewMode) -> LoadTicket {
		let view = self.view_mut(mode);
		view.generation += 1;
		view.load = LoadState::Loading;
		LoadTicket {
			mode,
			generation: view.generation,
		}
	}

	/// Ticket for the view as it stands, for fetches that extend rather than
	/// replace it.
	pub fn snapshot(&self, mode: ViewMode) -> LoadTicket {
		LoadTicket {
			mode,
			generation: self.view(mode).generation,
		}
	}

	fn is_current(&self, ticket: LoadTicket) -> bool {
		self.view(ticket.mode).generation == ticket.generation
	}

	/// Install fetched data unless the view was cleared or reloaded since.
	pub fn apply_load(&mut self, ticket: LoadTicket, nodes: &[EntityNodeDto], edges: &[EdgeDto]) -> bool {
		if !self.is_current(ticket) {
			debug!("dropping stale {} graph load", ticket.mode.as_str());
			return false;
		}
		let view = self.view_mut(ticket.mode);
		view.entities = nodes.iter().filter_map(node_from_dto).collect();
		view.edges = edges.iter().map(edge_from_dto).collect();
		view.load = LoadState::Loaded;
		info!(
			"{} graph loaded: {} entities, {} relationships",
			ticket.mode.as_str(),
			view.entities.len(),
			view.edges.len()
		);
		true
	}

	pub fn fail_load(&mut self, ticket: LoadTicket, error: &GraphError) -> bool {
		if !self.is_current(ticket) {
			return false;
		}
		warn!("{} graph load failed: {error}", ticket.mode.as_str());
		self.view_mut(ticket.mode).load = LoadState::Failed(error.inline_message());
		true
	}

	/// Merge a node's neighbourhood into a view. Returns how many nodes were new,
	/// zero when the view was cleared or reloaded after the ticket was taken.
	pub fn merge_neighbors(&mut self, ticket: LoadTicket, hood: &Neighborhood) -> usize {
		if !self.is_current(ticket) {
			debug!("dropping stale {} neighbour merge", ticket.mode.as_str());
			return 0;
		}
		let mode = ticket.mode;
		let view = self.view_mut(mode);
		let mut known: HashSet<String> = view.entities.iter().map(|n| n.id.clone()).collect();
		let mut added = 0;
		for node in hood.nodes.iter().filter_map(node_from_dto) {
			if known.insert(node.id.clone()) {
				view.entities.push(node);
				added += 1;
			}
		}
		let known_edges: HashSet<String> = view.edges.iter().map(|e| e.id.clone()).collect();
		view.edges.extend(
			hood.edges
				.iter()
				.filter(|e| !known_edges.contains(&e.id))
				.map(edge_from_dto),
		);
		debug!("merged {added} neighbours into {} graph", mode.as_str());
		added
	}

	pub fn clear(&mut self, mode: ViewMode) {
		self.view_mut(mode).reset();
	}

	/// Filter, cull and decompose the active view.
	pub fn visible(&self) -> GraphOutcome {
		let view = self.view(self.mode);
		let total = view.entities.len();
		let empty = |status| GraphOutcome {
			status,
			data: GraphData::default(),
			total,
		};

		match &view.load {
			LoadState::Failed(message) => return empty(GraphStatus::Error(message.clone())),
			LoadState::Loading if view.entities.is_empty() => return empty(GraphStatus::Loading),
			_ => {}
		}

		let criteria = FilterCriteria {
			types: &self.types,
			search: &view.search_filter,
			limit: self.node_limit,
		};
		let Some(nodes) = importance_filter(&view.entities, &criteria) else {
			return empty(match self.mode {
				ViewMode::Context => GraphStatus::NothingExtracted,
				ViewMode::Sector => GraphStatus::NothingIndexed,
			});
		};
		if nodes.is_empty() {
			return empty(GraphStatus::NoMatches);
		}

		let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
		let links = decompose(&ids, &view.edges);
		GraphOutcome {
			status: GraphStatus::Ready,
			data: GraphData { nodes, links },
			total,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn dto(id: &str, kind: &str, refs: i64) -> EntityNodeDto {
		EntityNodeDto {
			id: id.into(),
			value: id.to_uppercase(),
			entity_type: Some(kind.into()),
			reference_count: refs,
			..Default::default()
		}
	}

	fn edge(id: &str, members: &[&str]) -> EdgeDto {
		EdgeDto {
			id: id.into(),
			node_ids: members.iter().map(|s| s.to_string()).collect(),
			..Default::default()
		}
	}

	#[test]
	fn empty_context_reports_nothing_extracted() {
		let mut explorer = GraphExplorer::new(50);
		explorer.load_context(&[], "");
		let outcome = explorer.visible();
		assert_eq!(outcome.node_count(), 0);
		assert_eq!(outcome.status, GraphStatus::NothingExtracted);
		assert_ne!(outcome.status, GraphStatus::NoMatches);
	}

	#[test]
	fn empty_sector_reports_nothing_indexed() {
		let mut explorer = GraphExplorer::new(50);
		explorer.set_view(ViewMode::Sector);
		let ticket = explorer.begin_load(ViewMode::Sector);
		assert_eq!(explorer.visible().status, GraphStatus::Loading);
		assert!(explorer.apply_load(ticket, &[], &[]));
		assert_eq!(explorer.visible().status, GraphStatus::NothingIndexed);
	}

	#[test]
	fn filtered_to_empty_reports_no_matches() {
		let mut explorer = GraphExplorer::new(50);
		explorer.load_context(&[ExtractedEntity::new("Acme Corp", "organization")], "Acme Corp.");
		explorer.set_type_filter(["PERSON"]);
		assert_eq!(explorer.visible().status, GraphStatus::NoMatches);
	}

	#[test]
	fn stale_loads_are_ignored_after_clear() {
		let mut explorer = GraphExplorer::new(50);
		explorer.set_view(ViewMode::Sector);
		let ticket = explorer.begin_load(ViewMode::Sector);
		explorer.clear(ViewMode::Sector);
		assert!(!explorer.apply_load(ticket, &[dto("a", "PERSON", 1)], &[]));
		assert!(explorer.view(ViewMode::Sector).entities.is_empty());

		let first = explorer.begin_load(ViewMode::Sector);
		let second = explorer.begin_load(ViewMode::Sector);
		assert!(!explorer.apply_load(first, &[dto("a", "PERSON", 1)], &[]));
		assert!(explorer.apply_load(second, &[dto("b", "PERSON", 1)], &[]));
		assert_eq!(explorer.view(ViewMode::Sector).entities[0].id, "b");
	}

	#[test]
	fn neighbour_merge_is_dropped_after_clear() {
		let mut explorer = GraphExplorer::new(50);
		explorer.set_view(ViewMode::Sector);
		let ticket = explorer.begin_load(ViewMode::Sector);
		assert!(explorer.apply_load(ticket, &[dto("a", "PERSON", 1)], &[]));
		let hood = Neighborhood {
			nodes: vec![dto("b", "PERSON", 1)],
			edges: vec![edge("e1", &["a", "b"])],
		};

		let snapshot = explorer.snapshot(ViewMode::Sector);
		explorer.clear(ViewMode::Sector);
		assert_eq!(explorer.merge_neighbors(snapshot, &hood), 0);
		let view = explorer.view(ViewMode::Sector);
		assert!(view.entities.is_empty());
		assert!(view.edges.is_empty());
		assert_eq!(explorer.visible().status, GraphStatus::NothingIndexed);

		let reload = explorer.begin_load(ViewMode::Sector);
		let stale = explorer.snapshot(ViewMode::Sector);
		let newer = explorer.begin_load(ViewMode::Sector);
		assert!(explorer.apply_load(newer, &[dto("c", "PERSON", 1)], &[]));
		assert_eq!(explorer.merge_neighbors(stale, &hood), 0);
		assert!(!explorer.apply_load(reload, &[], &[]));
		assert_eq!(explorer.view(ViewMode::Sector).entities.len(), 1);
	}

	#[test]
	fn failures_render_inline() {
		let mut explorer = GraphExplorer::new(50);
		explorer.set_view(ViewMode::Sector);
		let ticket = explorer.begin_load(ViewMode::Sector);
		assert!(explorer.fail_load(ticket, &GraphError::Http(500)));
		assert!(matches!(explorer.visible().status, GraphStatus::Error(_)));
	}

	#[test]
	fn switching_views_leaves_the_other_untouched() {
		let mut explorer = GraphExplorer::new(50);
		explorer.load_context(&[ExtractedEntity::new("Berlin", "location")], "Berlin.");
		explorer.set_search_filter("ber");
		explorer.set_view(ViewMode::Sector);
		let ticket = explorer.begin_load(ViewMode::Sector);
		explorer.apply_load(ticket, &[dto("x", "PERSON", 3)], &[]);
		explorer.set_search_filter("zzz");

		explorer.set_view(ViewMode::Context);
		let outcome = explorer.visible();
		assert_eq!(outcome.status, GraphStatus::Ready);
		assert_eq!(outcome.data.nodes[0].label, "Berlin");
		assert_eq!(explorer.view(ViewMode::Context).search_filter, "ber");
		assert_eq!(explorer.view(ViewMode::Sector).search_filter, "zzz");
	}

	#[test]
	fn visible_decomposes_only_kept_nodes() {
		let mut explorer = GraphExplorer::new(2);
		explorer.set_view(ViewMode::Sector);
		let ticket = explorer.begin_load(ViewMode::Sector);
		explorer.apply_load(
			ticket,
			&[dto("a", "PERSON", 5), dto("b", "PERSON", 4), dto("c", "PERSON", 1)],
			&[edge("e1", &["a", "b", "c"])],
		);
		let outcome = explorer.visible();
		assert_eq!(outcome.total, 3);
		assert_eq!(outcome.data.nodes.len(), 2);
		assert_eq!(outcome.data.links.len(), 1);
		assert_eq!(outcome.data.links[0].key(), "a|b");
	}

	#[test]
	fn neighbours_merge_without_duplicates() {
		let mut explorer = GraphExplorer::new(50);
		let ticket = explorer.begin_load(ViewMode::Sector);
		explorer.apply_load(ticket, &[dto("a", "PERSON", 5)], &[]);
		let hood = Neighborhood {
			nodes: vec![dto("a", "PERSON", 5), dto("b", "ORGANIZATION", 2)],
			edges: vec![edge("e1", &["a", "b"])],
		};
		let snapshot = explorer.snapshot(ViewMode::Sector);
		assert_eq!(explorer.merge_neighbors(snapshot, &hood), 1);
		assert_eq!(explorer.merge_neighbors(snapshot, &hood), 0);
		let view = explorer.view(ViewMode::Sector);
		assert_eq!(view.entities.len(), 2);
		assert_eq!(view.edges.len(), 1);
	}
}
