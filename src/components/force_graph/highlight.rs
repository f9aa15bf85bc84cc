//! Hover/selection state machine and the per-frame highlight animation.

use std::collections::{HashMap, HashSet};

use super::types::GraphLink;
use crate::config::HighlightConfig;

/// Which interaction, if any, drives the highlight sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HighlightMode {
	#[default]
	Idle,
	Hovering(String),
	Selected(String),
}

/// Result of a click, for side effects the host cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
	Selected(String),
	Deselected(String),
}

impl ClickOutcome {
	/// The node that was clicked, in either case.
	pub fn node_id(&self) -> &str {
		match self {
			ClickOutcome::Selected(id) | ClickOutcome::Deselected(id) => id,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct Highlight {
	mode: HighlightMode,
	/// Node whose tooltip is showing; follows the pointer even while locked.
	hover_node: Option<String>,
	nodes: HashSet<String>,
	links: HashSet<String>,
}

impl Highlight {
	pub fn mode(&self) -> &HighlightMode {
		&self.mode
	}

	pub fn hover_node(&self) -> Option<&str> {
		self.hover_node.as_deref()
	}

	pub fn selected(&self) -> Option<&str> {
		match &self.mode {
			HighlightMode::Selected(id) => Some(id),
			_ => None,
		}
	}

	pub fn is_active(&self) -> bool {
		self.mode != HighlightMode::Idle
	}

	pub fn highlight_nodes(&self) -> &HashSet<String> {
		&self.nodes
	}

	pub fn highlight_links(&self) -> &HashSet<String> {
		&self.links
	}

	pub fn node_highlighted(&self, id: &str) -> bool {
		self.nodes.contains(id)
	}

	pub fn link_highlighted(&self, key: &str) -> bool {
		self.links.contains(key)
	}

	pub fn pointer_enter(&mut self, id: &str, links: &[GraphLink]) {
		self.hover_node = Some(id.to_string());
		if matches!(self.mode, HighlightMode::Selected(_)) {
			return;
		}
		if self.mode == HighlightMode::Hovering(id.to_string()) {
			return;
		}
		self.mode = HighlightMode::Hovering(id.to_string());
		self.recompute(id, links);
	}

	pub fn pointer_leave(&mut self) {
		self.hover_node = None;
		if matches!(self.mode, HighlightMode::Hovering(_)) {
			self.mode = HighlightMode::Idle;
			self.nodes.clear();
			self.links.clear();
		}
	}

	pub fn click_node(&mut self, id: &str, links: &[GraphLink]) -> ClickOutcome {
		if self.selected() == Some(id) {
			self.clear_selection();
			return ClickOutcome::Deselected(id.to_string());
		}
		self.mode = HighlightMode::Selected(id.to_string());
		self.recompute(id, links);
		ClickOutcome::Selected(id.to_string())
	}

	pub fn click_background(&mut self) {
		if self.selected().is_some() {
			self.clear_selection();
		}
	}

	/// Drop state referring to nodes no longer drawn.
	pub fn retain(&mut self, live: &HashSet<&str>, links: &[GraphLink]) {
		if self.hover_node.as_deref().is_some_and(|id| !live.contains(id)) {
			self.hover_node = None;
		}
		match self.mode.clone() {
			HighlightMode::Idle => {}
			HighlightMode::Hovering(id) | HighlightMode::Selected(id) if !live.contains(id.as_str()) => {
				self.mode = HighlightMode::Idle;
				self.nodes.clear();
				self.links.clear();
			}
			HighlightMode::Hovering(id) | HighlightMode::Selected(id) => self.recompute(&id, links),
		}
	}

	fn clear_selection(&mut self) {
		self.mode = HighlightMode::Idle;
		self.nodes.clear();
		self.links.clear();
	}

	fn recompute(&mut self, id: &str, links: &[GraphLink]) {
		self.nodes.clear();
		self.links.clear();
		self.nodes.insert(id.to_string());
		for link in links {
			if let Some(other) = link.other(id) {
				self.nodes.insert(other.to_string());
				self.links.insert(link.key());
			}
		}
	}
}

/// Per-node and per-link draw intensity in `[-1, 1]`, kept apart from the
/// graph itself. −1 dimmed, 0 neutral, 1 highlighted.
#[derive(Clone, Debug, Default)]
pub struct HighlightAnimator {
	nodes: HashMap<String, f64>,
	links: HashMap<String, f64>,
}

fn target(active: bool, member: bool) -> f64 {
	match (active, member) {
		(false, _) => 0.0,
		(true, true) => 1.0,
		(true, false) => -1.0,
	}
}

impl HighlightAnimator {
	pub fn node(&self, id: &str) -> f64 {
		self.nodes.get(id).copied().unwrap_or(0.0)
	}

	pub fn link(&self, key: &str) -> f64 {
		self.links.get(key).copied().unwrap_or(0.0)
	}

	/// Blend every value toward its target. `dt` is in seconds; the blend is
	/// exponential and scaled so one reference frame covers `config.blend`.
	pub fn advance<'a, N, L>(&mut self, highlight: &Highlight, node_ids: N, link_keys: L, dt: f64, config: &HighlightConfig)
	where
		N: IntoIterator<Item = &'a str>,
		L: IntoIterator<Item = &'a str>,
	{
		let frames = (dt / config.reference_frame).max(0.0);
		let k = 1.0 - (1.0 - config.blend).powf(frames);
		let active = highlight.is_active();

		let mut live_nodes = HashSet::new();
		for id in node_ids {
			let goal = target(active, highlight.node_highlighted(id));
			let value = self.nodes.entry(id.to_string()).or_insert(0.0);
			*value = settle(*value + (goal - *value) * k, goal);
			live_nodes.insert(id);
		}
		self.nodes.retain(|id, _| live_nodes.contains(id.as_str()));

		let mut live_links = HashSet::new();
		for key in link_keys {
			let goal = target(active, highlight.link_highlighted(key));
			let value = self.links.entry(key.to_string()).or_insert(0.0);
			*value = settle(*value + (goal - *value) * k, goal);
			live_links.insert(key);
		}
		self.links.retain(|key, _| live_links.contains(key.as_str()));
	}

	/// True while any value is still moving.
	pub fn is_animating(&self, highlight: &Highlight) -> bool {
		let active = highlight.is_active();
		self.nodes
			.iter()
			.any(|(id, v)| *v != target(active, highlight.node_highlighted(id)))
			|| self
				.links
				.iter()
				.any(|(key, v)| *v != target(active, highlight.link_highlighted(key)))
	}
}

fn settle(value: f64, goal: f64) -> f64 {
	if (value - goal).abs() < 1e-3 { goal } else { value.clamp(-1.0, 1.0) }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn link(a: &str, b: &str) -> GraphLink {
		GraphLink {
			source: a.into(),
			target: b.into(),
			edge_id: None,
			relation: None,
		}
	}

	fn sample() -> Vec<GraphLink> {
		vec![link("a", "b"), link("b", "c"), link("c", "d")]
	}

	fn set(items: &[&str]) -> HashSet<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn hover_highlights_node_and_neighbours() {
		let links = sample();
		let mut h = Highlight::default();
		h.pointer_enter("b", &links);
		assert_eq!(h.mode(), &HighlightMode::Hovering("b".into()));
		assert_eq!(h.highlight_nodes(), &set(&["a", "b", "c"]));
		assert_eq!(h.highlight_links(), &set(&["a|b", "b|c"]));
		h.pointer_leave();
		assert_eq!(h.mode(), &HighlightMode::Idle);
		assert!(h.highlight_nodes().is_empty());
	}

	#[test]
	fn click_while_hovering_another_node_selects_it_cleanly() {
		let links = sample();
		let mut h = Highlight::default();
		h.pointer_enter("a", &links);
		assert_eq!(h.click_node("d", &links), ClickOutcome::Selected("d".into()));
		assert_eq!(h.mode(), &HighlightMode::Selected("d".into()));
		assert_eq!(h.highlight_nodes(), &set(&["c", "d"]));
		assert_eq!(h.highlight_links(), &set(&["c|d"]));
	}

	#[test]
	fn selection_is_sticky_against_hover() {
		let links = sample();
		let mut h = Highlight::default();
		h.click_node("a", &links);
		h.pointer_enter("d", &links);
		assert_eq!(h.hover_node(), Some("d"));
		assert_eq!(h.highlight_nodes(), &set(&["a", "b"]));
		h.pointer_leave();
		assert_eq!(h.mode(), &HighlightMode::Selected("a".into()));
	}

	#[test]
	fn clicking_selected_node_or_background_clears() {
		let links = sample();
		let mut h = Highlight::default();
		h.click_node("a", &links);
		assert_eq!(h.click_node("a", &links), ClickOutcome::Deselected("a".into()));
		assert!(!h.is_active());

		h.click_node("b", &links);
		h.click_node("c", &links);
		assert_eq!(h.selected(), Some("c"));
		h.click_background();
		assert_eq!(h.mode(), &HighlightMode::Idle);
		assert!(h.highlight_links().is_empty());
	}

	#[test]
	fn retain_drops_vanished_selection() {
		let links = sample();
		let mut h = Highlight::default();
		h.click_node("d", &links);
		let live: HashSet<&str> = ["a", "b"].into_iter().collect();
		h.retain(&live, &links[..1]);
		assert!(!h.is_active());
	}

	#[test]
	fn animation_approaches_targets_exponentially() {
		let links = sample();
		let config = HighlightConfig::default();
		let mut h = Highlight::default();
		h.pointer_enter("a", &links);
		let mut anim = HighlightAnimator::default();
		let ids = ["a", "b", "c", "d"];
		let keys: Vec<String> = links.iter().map(GraphLink::key).collect();

		anim.advance(&h, ids, keys.iter().map(String::as_str), config.reference_frame, &config);
		assert!((anim.node("a") - 0.18).abs() < 1e-9);
		assert!((anim.node("d") + 0.18).abs() < 1e-9);
		assert!((anim.link("a|b") - 0.18).abs() < 1e-9);

		// two half frames land where one full frame does
		let mut split = HighlightAnimator::default();
		split.advance(&h, ids, keys.iter().map(String::as_str), config.reference_frame / 2.0, &config);
		split.advance(&h, ids, keys.iter().map(String::as_str), config.reference_frame / 2.0, &config);
		assert!((split.node("a") - anim.node("a")).abs() < 1e-9);

		for _ in 0..200 {
			anim.advance(&h, ids, keys.iter().map(String::as_str), config.reference_frame, &config);
		}
		assert_eq!(anim.node("a"), 1.0);
		assert_eq!(anim.node("d"), -1.0);
		assert!(!anim.is_animating(&h));

		h.pointer_leave();
		assert!(anim.is_animating(&h));
		for _ in 0..200 {
			anim.advance(&h, ids, keys.iter().map(String::as_str), config.reference_frame, &config);
		}
		assert_eq!(anim.node("a"), 0.0);
	}
}
