//! Type, search and top-N culling applied before layout.

use std::collections::HashSet;

use super::types::{EntityNode, EntityType};

/// Set of entity types currently shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeFilter {
	enabled: HashSet<EntityType>,
}

impl Default for TypeFilter {
	fn default() -> Self {
		Self::all()
	}
}

impl TypeFilter {
	pub fn all() -> Self {
		Self {
			enabled: EntityType::ALL.into_iter().collect(),
		}
	}

	/// Build from raw type tags; aliases collapse through canonicalisation.
	pub fn from_raw<I, S>(raw: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self {
			enabled: raw.into_iter().map(|s| EntityType::canonical(s.as_ref())).collect(),
		}
	}

	pub fn allows(&self, kind: EntityType) -> bool {
		self.enabled.contains(&kind)
	}

	pub fn toggle(&mut self, kind: EntityType) {
		if !self.enabled.remove(&kind) {
			self.enabled.insert(kind);
		}
	}
}

/// Criteria for the importance filter.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterCriteria<'a> {
	pub types: &'a TypeFilter,
	pub search: &'a str,
	pub limit: usize,
}

/// Keep the `limit` heaviest nodes that pass the type and search filters.
///
/// Returns `None` when there were no nodes to begin with, so callers can tell
/// "nothing loaded" from "everything filtered out".
pub fn importance_filter(nodes: &[EntityNode], criteria: &FilterCriteria<'_>) -> Option<Vec<EntityNode>> {
	if nodes.is_empty() {
		return None;
	}
	let needle = criteria.search.trim().to_lowercase();
	let mut kept: Vec<EntityNode> = nodes
		.iter()
		.filter(|n| criteria.types.allows(n.kind))
		.filter(|n| needle.is_empty() || n.label.to_lowercase().contains(&needle))
		.cloned()
		.collect();
	// stable: ties keep load order
	kept.sort_by(|a, b| b.weight.cmp(&a.weight));
	kept.truncate(criteria.limit);
	Some(kept)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn node(id: &str, kind: EntityType, weight: u32) -> EntityNode {
		EntityNode::new(id, id, kind, weight)
	}

	fn criteria<'a>(types: &'a TypeFilter, search: &'a str, limit: usize) -> FilterCriteria<'a> {
		FilterCriteria { types, search, limit }
	}

	#[test]
	fn keeps_heaviest_in_descending_order() {
		let nodes: Vec<_> = [3, 1, 4, 1, 5]
			.iter()
			.enumerate()
			.map(|(i, w)| node(&format!("n{i}"), EntityType::Person, *w))
			.collect();
		let types = TypeFilter::all();
		let kept = importance_filter(&nodes, &criteria(&types, "", 3)).unwrap();
		let weights: Vec<u32> = kept.iter().map(|n| n.weight).collect();
		assert_eq!(weights, vec![5, 4, 3]);
	}

	#[test]
	fn ties_keep_input_order() {
		let nodes = vec![
			node("first", EntityType::Person, 2),
			node("second", EntityType::Person, 2),
			node("third", EntityType::Person, 2),
		];
		let types = TypeFilter::all();
		let kept = importance_filter(&nodes, &criteria(&types, "", 2)).unwrap();
		assert_eq!(kept[0].id, "first");
		assert_eq!(kept[1].id, "second");
	}

	#[test]
	fn technology_and_technical_are_interchangeable() {
		let nodes = vec![
			EntityNode::new("k8s", "Kubernetes", EntityType::canonical("TECHNICAL"), 1),
			node("bob", EntityType::Person, 1),
		];
		let types = TypeFilter::from_raw(["TECHNOLOGY"]);
		let kept = importance_filter(&nodes, &criteria(&types, "", 50)).unwrap();
		assert_eq!(kept.len(), 1);
		assert_eq!(kept[0].id, "k8s");

		let nodes = vec![EntityNode::new("tf", "Terraform", EntityType::canonical("technology"), 1)];
		let types = TypeFilter::from_raw(["TECHNICAL"]);
		assert_eq!(importance_filter(&nodes, &criteria(&types, "", 50)).unwrap().len(), 1);
	}

	#[test]
	fn search_is_case_insensitive_substring() {
		let nodes = vec![
			EntityNode::new("a", "Acme Corporation", EntityType::Organization, 1),
			EntityNode::new("b", "Globex", EntityType::Organization, 9),
		];
		let types = TypeFilter::all();
		let kept = importance_filter(&nodes, &criteria(&types, "  CORP ", 50)).unwrap();
		assert_eq!(kept.len(), 1);
		assert_eq!(kept[0].id, "a");
	}

	#[test]
	fn empty_input_differs_from_filtered_to_empty() {
		let types = TypeFilter::all();
		assert!(importance_filter(&[], &criteria(&types, "", 50)).is_none());

		let nodes = vec![node("a", EntityType::Date, 1)];
		let types = TypeFilter::from_raw(["PERSON"]);
		assert_eq!(importance_filter(&nodes, &criteria(&types, "", 50)), Some(vec![]));
	}

	#[test]
	fn toggle_flips_membership() {
		let mut types = TypeFilter::all();
		types.toggle(EntityType::Date);
		assert!(!types.allows(EntityType::Date));
		types.toggle(EntityType::Date);
		assert!(types.allows(EntityType::Date));
	}
}
