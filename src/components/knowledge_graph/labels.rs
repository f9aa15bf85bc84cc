//! Greedy label placement for the radial diagram.
//!
//! Nodes are visited in render order. Each tries its candidate anchors in
//! turn and keeps the first box that is in bounds and clear of every node and
//! every label already committed. A second pass allows shortening the text.
//! Query and source labels that still do not fit are forced at their
//! preferred anchor; entity labels are hidden instead.

use super::layout::{RadialLayout, RadialNode};
use crate::components::measure::{TextMeasure, truncate_to_width};
use crate::components::tooltip::Rect;
use crate::config::RadialConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LabelAnchor {
	TopCenter,
	BottomCenter,
	MiddleRight,
	MiddleLeft,
	TopRight,
	TopLeft,
	BottomRight,
	BottomLeft,
}

/// SVG `text-anchor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAnchor {
	Start,
	Middle,
	End,
}

impl TextAnchor {
	pub fn as_str(self) -> &'static str {
		match self {
			TextAnchor::Start => "start",
			TextAnchor::Middle => "middle",
			TextAnchor::End => "end",
		}
	}
}

/// SVG `dominant-baseline`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Baseline {
	Alphabetic,
	Hanging,
	Middle,
}

impl Baseline {
	pub fn as_str(self) -> &'static str {
		match self {
			Baseline::Alphabetic => "baseline",
			Baseline::Hanging => "hanging",
			Baseline::Middle => "middle",
		}
	}
}

impl LabelAnchor {
	/// Unit direction from the node center plus text alignment.
	fn geometry(self) -> (f64, f64, TextAnchor, Baseline) {
		use LabelAnchor::*;
		match self {
			TopCenter => (0.0, -1.0, TextAnchor::Middle, Baseline::Alphabetic),
			BottomCenter => (0.0, 1.0, TextAnchor::Middle, Baseline::Hanging),
			MiddleRight => (1.0, 0.0, TextAnchor::Start, Baseline::Middle),
			MiddleLeft => (-1.0, 0.0, TextAnchor::End, Baseline::Middle),
			TopRight => (1.0, -1.0, TextAnchor::Start, Baseline::Alphabetic),
			TopLeft => (-1.0, -1.0, TextAnchor::End, Baseline::Alphabetic),
			BottomRight => (1.0, 1.0, TextAnchor::Start, Baseline::Hanging),
			BottomLeft => (-1.0, 1.0, TextAnchor::End, Baseline::Hanging),
		}
	}
}

/// Anchors to try for a node at `(x, y)`: the preferred one first, then an
/// order biased away from the center along the node's dominant axis.
pub fn candidate_keys(x: f64, y: f64, preferred: LabelAnchor) -> Vec<LabelAnchor> {
	use LabelAnchor::*;
	let biased = if x.abs() >= y.abs() {
		if x >= 0.0 {
			[MiddleLeft, TopLeft, BottomLeft, TopCenter, BottomCenter, MiddleRight, TopRight, BottomRight]
		} else {
			[MiddleRight, TopRight, BottomRight, TopCenter, BottomCenter, MiddleLeft, TopLeft, BottomLeft]
		}
	} else if y >= 0.0 {
		[BottomCenter, BottomLeft, BottomRight, MiddleRight, MiddleLeft, TopCenter, TopLeft, TopRight]
	} else {
		[TopCenter, TopLeft, TopRight, MiddleRight, MiddleLeft, BottomCenter, BottomLeft, BottomRight]
	};
	let mut keys = vec![preferred];
	keys.extend(biased.into_iter().filter(|k| *k != preferred));
	keys
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLabel {
	pub text: String,
	pub x: f64,
	pub y: f64,
	pub anchor: TextAnchor,
	pub baseline: Baseline,
	pub bbox: Rect,
	/// Placed over whatever it overlaps because nothing else fit.
	pub forced: bool,
}

/// True when the boxes are not separated by more than `padding` on some axis.
fn boxes_overlap(a: &Rect, b: &Rect, padding: f64) -> bool {
	!(a.right() + padding < b.left
		|| b.right() + padding < a.left
		|| a.bottom() + padding < b.top
		|| b.bottom() + padding < a.top)
}

struct Bounds {
	min_x: f64,
	max_x: f64,
	min_y: f64,
	max_y: f64,
}

impl Bounds {
	fn new(config: &RadialConfig) -> Self {
		let inner = config.half_extent - config.label_inset;
		Self {
			min_x: -inner - config.label_overflow_x,
			max_x: inner + config.label_overflow_x,
			min_y: -inner,
			max_y: inner,
		}
	}

	fn contains(&self, r: &Rect) -> bool {
		r.left >= self.min_x && r.top >= self.min_y && r.right() <= self.max_x && r.bottom() <= self.max_y
	}

	fn max_width(&self, x: f64, anchor: TextAnchor) -> f64 {
		match anchor {
			TextAnchor::Start => self.max_x - x,
			TextAnchor::End => x - self.min_x,
			TextAnchor::Middle => (x - self.min_x).min(self.max_x - x) * 2.0,
		}
	}
}

fn node_box(node: &RadialNode, padding: f64) -> Rect {
	let r = node.radius + padding;
	Rect::new(node.x - r, node.y - r, 2.0 * r, 2.0 * r)
}

struct Solver<'a> {
	config: &'a RadialConfig,
	measure: &'a dyn TextMeasure,
	bounds: Bounds,
	node_boxes: Vec<Rect>,
	committed: Vec<Rect>,
}

impl Solver<'_> {
	fn layout_text(&self, node: &RadialNode, key: LabelAnchor, text: String) -> PlacedLabel {
		let (ux, uy, anchor, baseline) = key.geometry();
		let gap = node.radius + self.config.node_padding + self.config.label_padding + 0.05;
		let (x, y) = (node.x + ux * gap, node.y + uy * gap);
		let (w, h) = self.measure.measure(&text, self.config.font_size);
		let left = match anchor {
			TextAnchor::Start => x,
			TextAnchor::Middle => x - w / 2.0,
			TextAnchor::End => x - w,
		};
		let top = match baseline {
			Baseline::Alphabetic => y - h,
			Baseline::Hanging => y,
			Baseline::Middle => y - h / 2.0,
		};
		PlacedLabel {
			text,
			x,
			y,
			anchor,
			baseline,
			bbox: Rect::new(left, top, w, h),
			forced: false,
		}
	}

	fn fitted_text(&self, node: &RadialNode, key: LabelAnchor) -> Option<String> {
		let (ux, _, anchor, _) = key.geometry();
		let gap = node.radius + self.config.node_padding + self.config.label_padding + 0.05;
		let max_width = self.bounds.max_width(node.x + ux * gap, anchor) - 0.1;
		truncate_to_width(&node.label, max_width, self.config.font_size, self.measure)
	}

	fn is_clear(&self, bbox: &Rect) -> bool {
		let padding = self.config.label_padding;
		self.bounds.contains(bbox)
			&& !self.committed.iter().any(|b| boxes_overlap(bbox, b, padding))
			&& !self.node_boxes.iter().any(|b| boxes_overlap(bbox, b, padding))
	}

	fn try_place(&self, node: &RadialNode, keys: &[LabelAnchor], allow_truncate: bool) -> Option<PlacedLabel> {
		keys.iter().find_map(|&key| {
			let text = if allow_truncate {
				self.fitted_text(node, key)?
			} else {
				node.label.clone()
			};
			let placed = self.layout_text(node, key, text);
			self.is_clear(&placed.bbox).then_some(placed)
		})
	}

	fn place(&mut self, node: &RadialNode) -> Option<PlacedLabel> {
		if node.label.is_empty() {
			return None;
		}
		let keys = candidate_keys(node.x, node.y, node.preferred);
		if let Some(placed) = self.try_place(node, &keys, false).or_else(|| self.try_place(node, &keys, true)) {
			self.committed.push(placed.bbox);
			return Some(placed);
		}
		if !node.kind.label_required() {
			return None;
		}
		let text = self
			.fitted_text(node, node.preferred)
			.unwrap_or_else(|| node.label.clone());
		let mut placed = self.layout_text(node, node.preferred, text);
		placed.forced = true;
		Some(placed)
	}
}

/// Place every label. The result is indexed like `layout.nodes`; `None`
/// means the label is hidden.
pub fn place_labels(layout: &RadialLayout, measure: &dyn TextMeasure, config: &RadialConfig) -> Vec<Option<PlacedLabel>> {
	let mut solver = Solver {
		config,
		measure,
		bounds: Bounds::new(config),
		node_boxes: layout.nodes.iter().map(|n| node_box(n, config.node_padding)).collect(),
		committed: Vec::new(),
	};
	let mut placed = vec![None; layout.nodes.len()];
	for i in layout.render_order() {
		placed[i] = solver.place(&layout.nodes[i]);
	}
	placed
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::model::ExtractedEntity;
	use crate::components::knowledge_graph::layout::{QueryMeta, RadialKind, SourceRef, radial_layout};
	use crate::components::measure::EstimatedTextMeasure;

	fn node(id: &str, kind: RadialKind, label: &str, x: f64, y: f64, radius: f64, preferred: LabelAnchor) -> RadialNode {
		RadialNode {
			id: id.into(),
			kind,
			label: label.into(),
			x,
			y,
			radius,
			preferred,
			tooltip_title: "",
			tooltip_rows: Vec::new(),
		}
	}

	#[test]
	fn preferred_anchor_comes_first_and_keys_are_unique() {
		let keys = candidate_keys(8.5, 0.0, LabelAnchor::MiddleRight);
		assert_eq!(keys[0], LabelAnchor::MiddleRight);
		assert_eq!(keys[1], LabelAnchor::MiddleLeft);
		assert_eq!(keys.len(), 8);

		let keys = candidate_keys(1.0, 5.0, LabelAnchor::TopRight);
		assert_eq!(&keys[..3], &[LabelAnchor::TopRight, LabelAnchor::BottomCenter, LabelAnchor::BottomLeft]);
	}

	#[test]
	fn committed_labels_never_overlap() {
		let config = RadialConfig::default();
		let sources: Vec<SourceRef> = ["annual-report-2023.pdf", "board-minutes.pdf", "risk-register.txt", "policy.md"]
			.into_iter()
			.map(SourceRef::new)
			.collect();
		let entities = [ExtractedEntity::new("Alice Example", "person"), ExtractedEntity::new("Acme Corp", "organization")];
		let layout = radial_layout(&sources, &entities, "", &QueryMeta::default(), &config).unwrap();
		let placed = place_labels(&layout, &EstimatedTextMeasure::default(), &config);

		let committed: Vec<&PlacedLabel> = placed.iter().flatten().filter(|p| !p.forced).collect();
		for (i, a) in committed.iter().enumerate() {
			for b in &committed[i + 1..] {
				assert_eq!(a.bbox.overlap_area(&b.bbox), 0.0, "{a:?} / {b:?}");
			}
			for n in &layout.nodes {
				assert_eq!(a.bbox.overlap_area(&node_box(n, config.node_padding)), 0.0);
			}
		}
		// query and source labels are always drawn
		for (n, p) in layout.nodes.iter().zip(&placed) {
			if n.kind.label_required() {
				assert!(p.is_some(), "{} lost its label", n.id);
			}
		}
	}

	#[test]
	fn long_label_is_shortened_rather_than_forced() {
		let config = RadialConfig::default();
		let layout = RadialLayout {
			nodes: vec![
				node("query", RadialKind::Query, "Query", 0.0, 0.0, 1.0, LabelAnchor::BottomCenter),
				node(
					"source-0",
					RadialKind::Source { filename: "x".into() },
					"abcdefghij abcdefghij abcdefghij abcdefg",
					8.5,
					0.0,
					0.65,
					LabelAnchor::MiddleRight,
				),
			],
			links: Vec::new(),
		};
		let placed = place_labels(&layout, &EstimatedTextMeasure::default(), &config);
		let source = placed[1].as_ref().unwrap();
		assert!(!source.forced);
		assert!(source.text.ends_with('…'));
		assert_eq!(source.anchor, TextAnchor::Start);
	}

	#[test]
	fn crowded_entity_is_hidden_but_query_is_forced() {
		let config = RadialConfig {
			half_extent: 2.0,
			label_overflow_x: 0.0,
			..RadialConfig::default()
		};
		let layout = RadialLayout {
			nodes: vec![
				node("query", RadialKind::Query, "Query", 0.0, 0.0, 1.0, LabelAnchor::BottomCenter),
				node(
					"entity-0",
					RadialKind::Entity { name: "Alice".into() },
					"Alice",
					1.5,
					1.5,
					0.35,
					LabelAnchor::TopRight,
				),
			],
			links: Vec::new(),
		};
		let placed = place_labels(&layout, &EstimatedTextMeasure::default(), &config);
		assert!(placed[1].is_none());
		let query = placed[0].as_ref().unwrap();
		assert!(query.forced);
		assert_eq!(query.text, "Query");
	}
}
