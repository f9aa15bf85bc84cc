//! Normalisation of raw records into [`EntityNode`]s and [`Hyperedge`]s.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use super::types::{EntityNode, EntityType, Hyperedge};
use crate::api::{EdgeDto, EntityNodeDto};

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?\n]+").expect("static pattern"));

/// One record produced by upstream entity extraction.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ExtractedEntity {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub description: String,
}

impl ExtractedEntity {
	pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind: kind.into(),
			description: String::new(),
		}
	}

	pub fn is_document(&self) -> bool {
		self.kind.trim().eq_ignore_ascii_case("document")
	}
}

/// Backend node → engine node. Records without an id are dropped.
pub fn node_from_dto(dto: &EntityNodeDto) -> Option<EntityNode> {
	if dto.id.trim().is_empty() {
		return None;
	}
	let kind = dto
		.entity_type
		.as_deref()
		.filter(|t| !t.trim().is_empty())
		.map(EntityType::canonical)
		.unwrap_or(EntityType::Reference);
	let label = if dto.value.trim().is_empty() {
		dto.id.clone()
	} else {
		dto.value.trim().to_string()
	};
	let weight = dto.reference_count.clamp(1, u32::MAX as i64) as u32;
	let mut node = EntityNode::new(dto.id.clone(), label, kind, weight);
	node.source_doc = dto.source_doc.clone().filter(|d| !d.trim().is_empty());
	Some(node)
}

pub fn edge_from_dto(dto: &EdgeDto) -> Hyperedge {
	Hyperedge {
		id: dto.id.clone(),
		node_ids: dto.node_ids.clone(),
		relation: dto.relation.clone().filter(|r| !r.trim().is_empty()),
	}
}

fn mention_pattern(name: &str) -> Option<Regex> {
	RegexBuilder::new(&format!(r"\b{}\b", regex::escape(name.trim())))
		.case_insensitive(true)
		.build()
		.ok()
}

/// Case-insensitive whole-word occurrences of `name` in `text`.
pub fn count_mentions(text: &str, name: &str) -> usize {
	if name.trim().is_empty() {
		return 0;
	}
	mention_pattern(name).map_or(0, |re| re.find_iter(text).count())
}

fn context_id(entity: &ExtractedEntity, kind: EntityType) -> String {
	format!("ctx:{}:{}", kind.as_str().to_ascii_lowercase(), entity.name.trim().to_lowercase())
}

/// Build the per-response graph from extracted entities.
///
/// Weights are mention counts in `response`; every sentence naming two or
/// more entities becomes one hyperedge.
pub fn context_graph(entities: &[ExtractedEntity], response: &str) -> (Vec<EntityNode>, Vec<Hyperedge>) {
	let mut nodes: Vec<EntityNode> = Vec::new();
	let mut patterns: Vec<Regex> = Vec::new();
	let mut seen = HashSet::new();

	for entity in entities {
		let name = entity.name.trim();
		if name.is_empty() {
			continue;
		}
		let kind = EntityType::canonical(&entity.kind);
		let id = context_id(entity, kind);
		if !seen.insert(id.clone()) {
			continue;
		}
		let Some(pattern) = mention_pattern(name) else {
			continue;
		};
		let mentions = pattern.find_iter(response).count() as u32;
		let mut node = EntityNode::new(id, name, kind, mentions);
		let description = entity.description.trim();
		if !description.is_empty() && !description.eq_ignore_ascii_case(kind.display_name()) {
			node.description = Some(description.to_string());
		}
		nodes.push(node);
		patterns.push(pattern);
	}

	let mut edges = Vec::new();
	for (i, sentence) in SENTENCE_BREAK.split(response).enumerate() {
		let mut members: Vec<(usize, String)> = nodes
			.iter()
			.zip(&patterns)
			.filter_map(|(node, re)| re.find(sentence).map(|m| (m.start(), node.id.clone())))
			.collect();
		if members.len() < 2 {
			continue;
		}
		members.sort_by_key(|(pos, _)| *pos);
		edges.push(Hyperedge::new(
			format!("ctx-s{i}"),
			members.into_iter().map(|(_, id)| id),
		));
	}

	(nodes, edges)
}
