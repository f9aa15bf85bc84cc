//! Deterministic query → sources → entities diagram.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::labels::LabelAnchor;
use crate::components::force_graph::model::{ExtractedEntity, count_mentions};
use crate::components::force_graph::types::EntityType;
use crate::components::tooltip::{TooltipRow, add_row, add_row_with_class};
use crate::config::RadialConfig;

static MARKDOWN_LINK: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("static pattern"));
static DOC_EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(pdf|txt|md)$").expect("static pattern"));

const ACTION_CLASS: &str = "graph-tooltip-value--action";

/// A retrieved document as reported alongside an answer.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceRef {
	pub filename: String,
	pub similarity: Option<f64>,
	pub chunk_count: Option<u32>,
	pub last_updated: Option<String>,
	pub doc_id: Option<String>,
	pub classification: Option<String>,
	pub owner: Option<String>,
}

impl SourceRef {
	pub fn new(filename: impl Into<String>) -> Self {
		Self {
			filename: filename.into(),
			..Self::default()
		}
	}
}

/// What is known about the query that produced the answer.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryMeta {
	pub query_text: String,
	pub sector: Option<String>,
	pub retrieval_mode: Option<String>,
	pub routing_decision: Option<String>,
	pub routing_reason: Option<String>,
	pub routing_confidence: Option<f64>,
	pub active_file_count: Option<u32>,
	pub top_k: Option<u32>,
	pub retrieval_ms: Option<f64>,
	pub latency_ms: Option<f64>,
	pub documents_retrieved: Option<u32>,
	pub sub_queries: Option<u32>,
}

impl QueryMeta {
	pub fn intent(&self) -> &'static str {
		match self.routing_decision.as_deref() {
			Some("NO_RETRIEVAL") => "Conversational",
			Some("SYSTEM_TIME") => "System",
			_ => "Informational",
		}
	}

	fn scope(&self) -> String {
		match self.active_file_count {
			Some(1) => "1 uploaded file".to_string(),
			Some(n) if n > 0 => format!("{n} uploaded files"),
			_ => "All sector documents".to_string(),
		}
	}

	fn retrieved(&self) -> Option<String> {
		self.documents_retrieved.map(|n| format!("{n} docs"))
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RadialKind {
	Query,
	Source { filename: String },
	Entity { name: String },
}

impl RadialKind {
	pub fn css(&self) -> &'static str {
		match self {
			RadialKind::Query => "query",
			RadialKind::Source { .. } => "source",
			RadialKind::Entity { .. } => "entity",
		}
	}

	pub fn display_name(&self) -> &'static str {
		match self {
			RadialKind::Query => "Query",
			RadialKind::Source { .. } => "Source",
			RadialKind::Entity { .. } => "Entity",
		}
	}

	/// One of each kind, in legend order.
	pub fn legend() -> [RadialKind; 3] {
		[
			RadialKind::Query,
			RadialKind::Source { filename: String::new() },
			RadialKind::Entity { name: String::new() },
		]
	}

	/// Sources and entities can be clicked or activated from the keyboard.
	pub fn is_actionable(&self) -> bool {
		!matches!(self, RadialKind::Query)
	}

	/// Labels of these nodes are never hidden.
	pub fn label_required(&self) -> bool {
		!matches!(self, RadialKind::Entity { .. })
	}

	fn render_rank(&self) -> u8 {
		match self {
			RadialKind::Source { .. } => 0,
			RadialKind::Entity { .. } => 1,
			RadialKind::Query => 2,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct RadialNode {
	pub id: String,
	pub kind: RadialKind,
	pub label: String,
	pub x: f64,
	pub y: f64,
	pub radius: f64,
	pub preferred: LabelAnchor,
	pub tooltip_title: &'static str,
	pub tooltip_rows: Vec<TooltipRow>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RadialLink {
	pub source: usize,
	pub target: usize,
}

impl RadialLink {
	pub fn key(&self, nodes: &[RadialNode]) -> String {
		crate::components::force_graph::types::pair_key(&nodes[self.source].id, &nodes[self.target].id)
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RadialLayout {
	pub nodes: Vec<RadialNode>,
	pub links: Vec<RadialLink>,
}

impl RadialLayout {
	/// Indices in label placement order: sources, entities, then the query.
	pub fn render_order(&self) -> Vec<usize> {
		let mut order: Vec<usize> = (0..self.nodes.len()).collect();
		order.sort_by_key(|&i| self.nodes[i].kind.render_rank());
		order
	}
}

/// Strip link markup, brackets, document extensions and hyphens, then cut at
/// a word boundary so the result is at most `max` characters.
pub fn short_label(text: &str, max: usize) -> String {
	let clean = MARKDOWN_LINK.replace_all(text, "$1");
	let clean = clean.replace(['[', ']'], "");
	let clean = DOC_EXTENSION.replace(&clean, "").replace('-', " ");
	let clean = clean.trim();
	if clean.chars().count() <= max {
		return clean.to_string();
	}
	let mut result = String::new();
	for word in clean.split(' ') {
		let next = format!("{result} {word}");
		if next.trim().chars().count() <= max.saturating_sub(1) {
			result = next.trim().to_string();
		} else {
			break;
		}
	}
	if result.is_empty() {
		clean.chars().take(max.saturating_sub(1)).collect()
	} else {
		result
	}
}

fn confidence(mentions: usize) -> Option<String> {
	match mentions {
		0 => None,
		1 => Some("0.60".into()),
		2 => Some("0.75".into()),
		_ => Some("0.90".into()),
	}
}

fn date_prefix(value: &str) -> String {
	// ISO timestamps reduce to their date; anything else passes through
	match value.get(..10) {
		Some(date) if value.len() > 10 && date.as_bytes()[4] == b'-' && date.as_bytes()[7] == b'-' => date.to_string(),
		_ => value.to_string(),
	}
}

fn extension(filename: &str) -> String {
	filename
		.rsplit_once('.')
		.map(|(_, ext)| ext.to_ascii_uppercase())
		.filter(|ext| !ext.is_empty())
		.unwrap_or_else(|| "DOC".to_string())
}

fn query_rows(meta: &QueryMeta, shown: usize) -> Vec<TooltipRow> {
	let mut rows = Vec::new();
	add_row(&mut rows, "Query", Some(&meta.query_text));
	add_row(&mut rows, "Intent", Some(meta.intent()));
	add_row(&mut rows, "Sector", meta.sector.as_ref());
	add_row(&mut rows, "Scope", Some(meta.scope()));
	add_row(&mut rows, "Retrieval", meta.retrieval_mode.as_ref());
	add_row(&mut rows, "Routing", meta.routing_decision.as_ref());
	add_row(&mut rows, "Routing reason", meta.routing_reason.as_ref());
	add_row(&mut rows, "Routing conf", meta.routing_confidence.map(|c| format!("{c:.2}")));
	add_row(&mut rows, "TopK", meta.top_k);
	add_row(&mut rows, "Retrieval time", meta.retrieval_ms.map(|ms| format!("{}ms", ms.round())));
	add_row(&mut rows, "Total time", meta.latency_ms.map(|ms| format!("{}ms", ms.round())));
	add_row(&mut rows, "Docs retrieved", meta.documents_retrieved);
	add_row(&mut rows, "Sources shown", Some(shown));
	add_row(&mut rows, "Sub-queries", meta.sub_queries);
	rows
}

fn source_rows(source: &SourceRef, rank: usize, meta: &QueryMeta) -> Vec<TooltipRow> {
	let mut rows = Vec::new();
	add_row(&mut rows, "Source", Some(&source.filename));
	add_row(&mut rows, "Type", Some(format!("{} document", extension(&source.filename))));
	add_row(&mut rows, "Sector", meta.sector.as_ref());
	let top_k = meta.top_k.map_or_else(|| "?".to_string(), |k| k.to_string());
	add_row(&mut rows, "Rank", Some(format!("#{rank} of {top_k}")));
	add_row(&mut rows, "Retrieval", meta.retrieval_mode.as_ref());
	add_row(&mut rows, "Similarity", source.similarity.filter(|s| s.is_finite()).map(|s| format!("{s:.2}")));
	add_row(&mut rows, "Chunks", source.chunk_count);
	add_row(&mut rows, "Last updated", source.last_updated.as_deref().map(date_prefix));
	add_row(&mut rows, "Doc ID", source.doc_id.as_ref());
	add_row(&mut rows, "Classification", source.classification.as_ref());
	add_row(&mut rows, "Owner", source.owner.as_ref());
	add_row(&mut rows, "Retrieved", meta.retrieved());
	add_row_with_class(&mut rows, "Action", Some("Click node to open source"), Some(ACTION_CLASS));
	rows
}

fn entity_rows(entity: &ExtractedEntity, response: &str, meta: &QueryMeta) -> Vec<TooltipRow> {
	let mut rows = Vec::new();
	let kind = if entity.kind.trim().is_empty() { "entity" } else { entity.kind.as_str() };
	let mentions = count_mentions(response, &entity.name);
	add_row(&mut rows, "Entity", Some(&entity.name));
	add_row(&mut rows, "Type", Some(kind));
	add_row(&mut rows, "Definition", Some(entity.description.as_str()).filter(|d| *d != kind));
	add_row(&mut rows, "Confidence", confidence(mentions));
	add_row(&mut rows, "Mentions", (mentions > 0).then(|| format!("{mentions} in answer")));
	add_row(&mut rows, "Sources", Some(meta.retrieved().unwrap_or_else(|| "Answer text".to_string())));
	add_row_with_class(&mut rows, "Action", Some("Click node to ask about entity"), Some(ACTION_CLASS));
	rows
}

/// Up to two entities, people and organisations first, never documents.
fn pick_entities(entities: &[ExtractedEntity]) -> Vec<&ExtractedEntity> {
	let preferred = |e: &ExtractedEntity| {
		matches!(EntityType::canonical(&e.kind), EntityType::Person | EntityType::Organization)
	};
	entities
		.iter()
		.filter(|e| preferred(e))
		.chain(entities.iter().filter(|e| !preferred(e) && !e.is_document()))
		.take(2)
		.collect()
}

/// Build the diagram. Returns `None` when there is no source to show.
pub fn radial_layout(
	sources: &[SourceRef],
	entities: &[ExtractedEntity],
	response: &str,
	meta: &QueryMeta,
	config: &RadialConfig,
) -> Option<RadialLayout> {
	let mut seen = HashSet::new();
	let sources: Vec<&SourceRef> = sources
		.iter()
		.filter(|s| seen.insert(s.filename.to_lowercase()))
		.take(4)
		.collect();
	if sources.is_empty() {
		return None;
	}

	let d = config.source_distance;
	// screen y grows downward: north sits at negative y
	let cardinals = [
		(0.0, -d, LabelAnchor::TopCenter),
		(d, 0.0, LabelAnchor::MiddleRight),
		(0.0, d, LabelAnchor::BottomCenter),
		(-d, 0.0, LabelAnchor::MiddleLeft),
	];
	let e = config.entity_offset;
	let diagonals = [(e, -e, LabelAnchor::TopRight), (-e, e, LabelAnchor::BottomLeft)];

	let mut nodes = vec![RadialNode {
		id: "query".into(),
		kind: RadialKind::Query,
		label: "Query".into(),
		x: 0.0,
		y: 0.0,
		radius: 1.0,
		preferred: LabelAnchor::BottomCenter,
		tooltip_title: "Query Node",
		tooltip_rows: query_rows(meta, sources.len()),
	}];
	let mut links = Vec::new();

	for (i, (source, &(x, y, preferred))) in sources.iter().zip(cardinals.iter()).enumerate() {
		nodes.push(RadialNode {
			id: format!("source-{i}"),
			kind: RadialKind::Source {
				filename: source.filename.clone(),
			},
			label: short_label(&source.filename, config.source_label_max),
			x,
			y,
			radius: 0.65,
			preferred,
			tooltip_title: "Source Node",
			tooltip_rows: source_rows(source, i + 1, meta),
		});
		links.push(RadialLink {
			source: 0,
			target: nodes.len() - 1,
		});
	}

	let source_count = sources.len();
	for (i, (entity, &(x, y, preferred))) in pick_entities(entities).into_iter().zip(diagonals.iter()).enumerate() {
		nodes.push(RadialNode {
			id: format!("entity-{i}"),
			kind: RadialKind::Entity {
				name: entity.name.clone(),
			},
			label: short_label(&entity.name, config.entity_label_max),
			x,
			y,
			radius: 0.35,
			preferred,
			tooltip_title: "Entity Node",
			tooltip_rows: entity_rows(entity, response, meta),
		});
		links.push(RadialLink {
			source: 1 + i % source_count,
			target: nodes.len() - 1,
		});
	}

	Some(RadialLayout { nodes, links })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entity(name: &str, kind: &str) -> ExtractedEntity {
		ExtractedEntity::new(name, kind)
	}

	fn sources(names: &[&str]) -> Vec<SourceRef> {
		names.iter().map(|n| SourceRef::new(*n)).collect()
	}

	#[test]
	fn no_sources_means_no_diagram() {
		let layout = radial_layout(&[], &[entity("Alice", "person")], "", &QueryMeta::default(), &RadialConfig::default());
		assert!(layout.is_none());
	}

	#[test]
	fn sources_are_deduplicated_and_capped_at_four() {
		let list = sources(&["a.pdf", "A.PDF", "b.pdf", "c.pdf", "d.pdf", "e.pdf"]);
		let layout = radial_layout(&list, &[], "", &QueryMeta::default(), &RadialConfig::default()).unwrap();
		let shown: Vec<&str> = layout.nodes[1..].iter().map(|n| n.label.as_str()).collect();
		assert_eq!(shown, ["a", "b", "c", "d"]);
		assert_eq!(layout.links.len(), 4);
		assert!(layout.links.iter().all(|l| l.source == 0));
		assert_eq!((layout.nodes[1].x, layout.nodes[1].y), (0.0, -8.5));
		assert_eq!((layout.nodes[2].x, layout.nodes[2].y), (8.5, 0.0));
	}

	#[test]
	fn entities_prefer_people_and_organisations_and_skip_documents() {
		let list = sources(&["a.pdf", "b.pdf", "c.pdf"]);
		let ents = [
			entity("Report.pdf", "document"),
			entity("Paris", "location"),
			entity("Acme", "organization"),
			entity("Alice", "person"),
		];
		let layout = radial_layout(&list, &ents, "", &QueryMeta::default(), &RadialConfig::default()).unwrap();
		let names: Vec<_> = layout
			.nodes
			.iter()
			.filter_map(|n| match &n.kind {
				RadialKind::Entity { name } => Some(name.as_str()),
				_ => None,
			})
			.collect();
		assert_eq!(names, ["Acme", "Alice"]);
		// round robin over the shown sources
		let entity_links: Vec<_> = layout.links[3..].iter().map(|l| l.source).collect();
		assert_eq!(entity_links, [1, 2]);
	}

	#[test]
	fn fallback_entities_fill_in_when_no_people() {
		let ents = [entity("Memo", "document"), entity("Paris", "location")];
		let layout = radial_layout(&sources(&["a.pdf"]), &ents, "", &QueryMeta::default(), &RadialConfig::default()).unwrap();
		assert_eq!(layout.nodes.len(), 3);
		assert_eq!(layout.nodes[2].label, "Paris");
		assert_eq!(layout.links[1].source, 1);
	}

	#[test]
	fn render_order_puts_query_last() {
		let ents = [entity("Alice", "person")];
		let layout = radial_layout(&sources(&["a.pdf", "b.pdf"]), &ents, "", &QueryMeta::default(), &RadialConfig::default()).unwrap();
		let order = layout.render_order();
		assert_eq!(order.last(), Some(&0));
		assert_eq!(order, [1, 2, 3, 0]);
	}

	#[test]
	fn short_labels_strip_markup_and_cut_at_words() {
		assert_eq!(short_label("[Annual-Report](http://x/y).pdf", 40), "Annual Report");
		assert_eq!(short_label("budget-summary-2024.PDF", 40), "budget summary 2024");
		assert_eq!(short_label("International Business Machines", 12), "Internation");
		assert_eq!(short_label("Supercalifragilistic", 12), "Supercalifr");
		assert_eq!(short_label("Big Blue Corporation", 12), "Big Blue");
	}

	#[test]
	fn label_patterns_are_compiled_once() {
		let first: *const Regex = &*MARKDOWN_LINK;
		for name in ["a.md", "[b](c)", "d-e.txt"] {
			short_label(name, 40);
		}
		assert!(std::ptr::eq(first, &*MARKDOWN_LINK));
		assert!(DOC_EXTENSION.is_match("notes.TXT"));
		assert!(!DOC_EXTENSION.is_match("notes.txt.bak"));
	}

	#[test]
	fn tooltip_rows_skip_unknown_values() {
		let meta = QueryMeta {
			query_text: "who runs acme".into(),
			routing_decision: Some("NO_RETRIEVAL".into()),
			sector: Some("n/a".into()),
			documents_retrieved: Some(7),
			top_k: Some(5),
			..QueryMeta::default()
		};
		let mut source = SourceRef::new("acme-annual.pdf");
		source.similarity = Some(0.8765);
		source.owner = Some("Unavailable".into());
		source.last_updated = Some("2024-03-01T10:00:00Z".into());
		let ents = [ExtractedEntity {
			name: "Acme".into(),
			kind: "organization".into(),
			description: "organization".into(),
		}];
		let response = "Acme is led by Alice. Acme grew.";
		let layout = radial_layout(&[source], &ents, response, &meta, &RadialConfig::default()).unwrap();

		let row = |node: usize, key: &str| {
			layout.nodes[node]
				.tooltip_rows
				.iter()
				.find(|r| r.key == key)
				.map(|r| r.value.clone())
		};
		assert_eq!(row(0, "Intent").as_deref(), Some("Conversational"));
		assert_eq!(row(0, "Sector"), None);
		assert_eq!(row(0, "Scope").as_deref(), Some("All sector documents"));
		assert_eq!(row(1, "Type").as_deref(), Some("PDF document"));
		assert_eq!(row(1, "Rank").as_deref(), Some("#1 of 5"));
		assert_eq!(row(1, "Similarity").as_deref(), Some("0.88"));
		assert_eq!(row(1, "Last updated").as_deref(), Some("2024-03-01"));
		assert_eq!(row(1, "Owner"), None);
		assert_eq!(row(2, "Definition"), None);
		assert_eq!(row(2, "Mentions").as_deref(), Some("2 in answer"));
		assert_eq!(row(2, "Confidence").as_deref(), Some("0.75"));
		assert_eq!(row(2, "Sources").as_deref(), Some("7 docs"));
	}
}
