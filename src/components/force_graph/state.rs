use std::collections::HashSet;

use force_graph::DefaultNodeIdx;
use log::debug;

use super::highlight::{ClickOutcome, Highlight, HighlightAnimator};
use super::simulation::{ForceLayout, NodeInfo, Phase, StepOutcome};
use super::types::{EntityNode, GraphData};
use crate::components::measure::TextMeasure;
use crate::components::tooltip::{Rect, TooltipContent, add_row};
use crate::config::GraphConfig;

/// Extra hit slop around a node glyph, in graph units.
pub const HIT_SLOP: f64 = 3.0;
const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 10.0;
/// Largest frame delta fed to animations, in seconds.
const MAX_FRAME_DT: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

impl ViewTransform {
	fn lerp(&self, to: &ViewTransform, t: f64) -> ViewTransform {
		ViewTransform {
			x: self.x + (to.x - self.x) * t,
			y: self.y + (to.y - self.y) * t,
			k: self.k + (to.k - self.k) * t,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
	pub moved: bool,
}

/// The one-off zoom-to-fit after a fresh layout settles.
#[derive(Clone, Debug, PartialEq)]
enum Fit {
	Pending,
	Animating {
		from: ViewTransform,
		to: ViewTransform,
		start_ms: f64,
	},
	Done,
}

/// Pointer movement below this many pixels still counts as a click.
const CLICK_SLOP: f64 = 3.0;

pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub struct ForceGraphState {
	pub layout: ForceLayout,
	pub data: GraphData,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub highlight: Highlight,
	pub animator: HighlightAnimator,
	pub width: f64,
	pub height: f64,
	config: GraphConfig,
	fit: Fit,
	last_frame_ms: Option<f64>,
	dirty: bool,
}

impl ForceGraphState {
	pub fn new(config: GraphConfig, width: f64, height: f64) -> Self {
		Self {
			layout: ForceLayout::new(config.force.clone(), width, height),
			data: GraphData::default(),
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			highlight: Highlight::default(),
			animator: HighlightAnimator::default(),
			width,
			height,
			config,
			fit: Fit::Done,
			last_frame_ms: None,
			dirty: true,
		}
	}

	/// Swap in a new node/link set. Surviving nodes keep their place; a
	/// layout built from scratch is warmed up and fitted once it settles.
	pub fn set_data(&mut self, data: GraphData, measure: &dyn TextMeasure) {
		self.layout.rebuild(&data, measure);
		if self.layout.phase() == Phase::Warmup {
			self.layout.warmup();
			self.fit = Fit::Pending;
		}
		let live: HashSet<&str> = data.nodes.iter().map(|n| n.id.as_str()).collect();
		self.highlight.retain(&live, &data.links);
		self.drag = DragState::default();
		self.data = data;
		self.dirty = true;
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		(
			gx * self.transform.k + self.transform.x,
			gy * self.transform.k + self.transform.y,
		)
	}

	/// Topmost node under a screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.layout.graph().visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			let reach = node.data.user_data.radius + HIT_SLOP;
			if dx * dx + dy * dy < reach * reach {
				found = Some(node.index());
			}
		});
		found
	}

	pub fn node_info(&self, idx: DefaultNodeIdx) -> Option<NodeInfo> {
		let mut found = None;
		self.layout.graph().visit_nodes(|node| {
			if node.index() == idx {
				found = Some(node.data.user_data.clone());
			}
		});
		found
	}

	/// On-screen bounds of a node's glyph.
	pub fn node_screen_rect(&self, idx: DefaultNodeIdx) -> Option<Rect> {
		let (x, y) = self.layout.position(idx)?;
		let radius = self.node_info(idx)?.radius * self.transform.k;
		let (sx, sy) = self.graph_to_screen(x, y);
		Some(Rect::new(sx - radius, sy - radius, 2.0 * radius, 2.0 * radius))
	}

	pub fn tooltip_content(&self, id: &str) -> Option<TooltipContent> {
		let node = self.data.node(id)?;
		let mut rows = Vec::new();
		add_row(&mut rows, "Entity", Some(&node.label));
		add_row(&mut rows, "Type", Some(node.kind.display_name()));
		add_row(&mut rows, "References", Some(node.weight));
		add_row(&mut rows, "Description", node.description.as_ref());
		add_row(&mut rows, "Source doc", node.source_doc.as_ref());
		Some(TooltipContent {
			title: node.label.clone(),
			rows,
		})
	}

	pub fn hover(&mut self, idx: Option<DefaultNodeIdx>) {
		match idx.and_then(|i| self.node_info(i)) {
			Some(info) => self.highlight.pointer_enter(&info.id, &self.data.links),
			None => self.highlight.pointer_leave(),
		}
		self.dirty = true;
	}

	/// Click on a node, or on the background when `idx` is `None`.
	pub fn click(&mut self, idx: Option<DefaultNodeIdx>) -> Option<ClickOutcome> {
		self.dirty = true;
		match idx.and_then(|i| self.node_info(i)) {
			Some(info) => Some(self.highlight.click_node(&info.id, &self.data.links)),
			None => {
				self.highlight.click_background();
				None
			}
		}
	}

	/// The node a click landed on, whether it selected or cleared it.
	pub fn clicked_node(&self, outcome: &ClickOutcome) -> Option<&EntityNode> {
		self.data.node(outcome.node_id())
	}

	pub fn begin_drag(&mut self, idx: DefaultNodeIdx, sx: f64, sy: f64) {
		let Some((x, y)) = self.layout.position(idx) else {
			return;
		};
		self.layout.pin(idx);
		self.drag = DragState {
			node: Some(idx),
			start_x: sx,
			start_y: sy,
			node_start_x: x,
			node_start_y: y,
			moved: false,
		};
	}

	pub fn drag_to(&mut self, sx: f64, sy: f64) {
		let Some(idx) = self.drag.node else {
			return;
		};
		let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
		if dx.abs() + dy.abs() > CLICK_SLOP {
			self.drag.moved = true;
		}
		let k = self.transform.k;
		self.layout
			.move_node(idx, self.drag.node_start_x + dx / k, self.drag.node_start_y + dy / k);
		self.dirty = true;
	}

	/// Finish a drag, leaving the node pinned where it was dropped. Returns
	/// the node when the gesture never moved, i.e. it was a click.
	pub fn end_drag(&mut self) -> Option<DefaultNodeIdx> {
		let drag = std::mem::take(&mut self.drag);
		let idx = drag.node?;
		if drag.moved {
			debug!("node dropped and pinned");
			None
		} else {
			Some(idx)
		}
	}

	pub fn is_dragging(&self) -> bool {
		self.drag.node.is_some()
	}

	pub fn begin_pan(&mut self, sx: f64, sy: f64) {
		self.pan = PanState {
			active: true,
			start_x: sx,
			start_y: sy,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
			moved: false,
		};
	}

	pub fn pan_to(&mut self, sx: f64, sy: f64) {
		if !self.pan.active {
			return;
		}
		let (dx, dy) = (sx - self.pan.start_x, sy - self.pan.start_y);
		if dx.abs() + dy.abs() > CLICK_SLOP {
			self.pan.moved = true;
			self.fit = Fit::Done;
		}
		self.transform.x = self.pan.transform_start_x + dx;
		self.transform.y = self.pan.transform_start_y + dy;
		self.dirty = true;
	}

	/// Returns true when the gesture never moved (a background click).
	pub fn end_pan(&mut self) -> bool {
		let pan = std::mem::take(&mut self.pan);
		pan.active && !pan.moved
	}

	pub fn zoom_at(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
		// the user has taken over the camera
		self.fit = Fit::Done;
		self.dirty = true;
	}

	/// Transform that frames every node's glyph and label.
	pub fn fit_transform(&self) -> Option<ViewTransform> {
		let (min_x, min_y, max_x, max_y) = self.layout.bounds()?;
		let padding = self.config.force.fit_padding;
		let (bw, bh) = ((max_x - min_x).max(1.0), (max_y - min_y).max(1.0));
		let avail_w = (self.width - 2.0 * padding).max(1.0);
		let avail_h = (self.height - 2.0 * padding).max(1.0);
		let k = (avail_w / bw).min(avail_h / bh).clamp(MIN_ZOOM, 2.0);
		let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
		Some(ViewTransform {
			x: self.width / 2.0 - cx * k,
			y: self.height / 2.0 - cy * k,
			k,
		})
	}

	/// Advance simulation, fit and highlight animations to `now_ms`.
	/// Returns true when the frame needs repainting.
	pub fn tick(&mut self, now_ms: f64) -> bool {
		let dt = self
			.last_frame_ms
			.map_or(0.0, |last| ((now_ms - last) / 1000.0).clamp(0.0, MAX_FRAME_DT));
		self.last_frame_ms = Some(now_ms);

		let mut changed = std::mem::take(&mut self.dirty);
		match self.layout.step(now_ms) {
			StepOutcome::Idle => {}
			StepOutcome::Moved => changed = true,
			StepOutcome::Settled => {
				changed = true;
				if self.fit == Fit::Pending {
					if let Some(to) = self.fit_transform() {
						self.fit = Fit::Animating {
							from: self.transform,
							to,
							start_ms: now_ms,
						};
					}
				}
			}
		}

		if let Fit::Animating { from, to, start_ms } = self.fit.clone() {
			let t = ((now_ms - start_ms) / self.config.force.fit_duration_ms.max(1.0)).clamp(0.0, 1.0);
			self.transform = from.lerp(&to, ease_out_cubic(t));
			if t >= 1.0 {
				self.fit = Fit::Done;
			}
			changed = true;
		}

		let animating = self.animator.is_animating(&self.highlight);
		if animating || changed {
			let ids: Vec<&str> = self.data.nodes.iter().map(|n| n.id.as_str()).collect();
			let keys: Vec<String> = self.layout.links().iter().map(|l| l.key.clone()).collect();
			self.animator.advance(
				&self.highlight,
				ids,
				keys.iter().map(String::as_str),
				dt,
				&self.config.highlight,
			);
		}
		changed || animating
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.layout.set_center(width, height);
		self.dirty = true;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::types::{EntityNode, EntityType, GraphLink};
	use crate::components::measure::EstimatedTextMeasure;

	fn sample() -> GraphData {
		GraphData {
			nodes: vec![
				EntityNode::new("a", "Alice", EntityType::Person, 3),
				EntityNode::new("b", "Acme", EntityType::Organization, 1),
				EntityNode::new("c", "Paris", EntityType::Location, 2),
			],
			links: vec![GraphLink {
				source: "a".into(),
				target: "b".into(),
				edge_id: Some("e1".into()),
				relation: Some("works at".into()),
			}],
		}
	}

	fn settled_state() -> (ForceGraphState, f64) {
		let mut state = ForceGraphState::new(GraphConfig::default(), 800.0, 600.0);
		state.set_data(sample(), &EstimatedTextMeasure::default());
		let mut now = 0.0;
		while !state.layout.is_stable() {
			state.tick(now);
			now += 16.0;
		}
		(state, now)
	}

	#[test]
	fn fits_once_after_settling() {
		let (mut state, mut now) = settled_state();
		let target = state.fit_transform().unwrap();
		for _ in 0..40 {
			state.tick(now);
			now += 16.0;
		}
		let t = state.transform;
		assert!((t.k - target.k).abs() < 1e-9);
		assert!((t.x - target.x).abs() < 1e-9);

		// panning afterwards is never undone
		state.begin_pan(100.0, 100.0);
		state.pan_to(150.0, 100.0);
		state.end_pan();
		let panned = state.transform;
		for _ in 0..40 {
			state.tick(now);
			now += 16.0;
		}
		assert_eq!(state.transform, panned);
	}

	#[test]
	fn zoom_during_fit_cancels_it() {
		let (mut state, now) = settled_state();
		state.tick(now + 16.0);
		state.zoom_at(400.0, 300.0, -1.0);
		let zoomed = state.transform;
		state.tick(now + 500.0);
		assert_eq!(state.transform, zoomed);
	}

	#[test]
	fn hit_testing_finds_nodes_through_the_transform() {
		let (state, _) = settled_state();
		let idx = state.layout.node_index("a").unwrap();
		let (x, y) = state.layout.position(idx).unwrap();
		let (sx, sy) = state.graph_to_screen(x, y);
		assert_eq!(state.node_at_position(sx, sy), Some(idx));
		let rect = state.node_screen_rect(idx).unwrap();
		assert!((rect.left + rect.width / 2.0 - sx).abs() < 1e-6);
	}

	#[test]
	fn click_without_movement_selects() {
		let (mut state, _) = settled_state();
		let idx = state.layout.node_index("a").unwrap();
		state.begin_drag(idx, 10.0, 10.0);
		state.drag_to(11.0, 10.0);
		let clicked = state.end_drag();
		assert_eq!(clicked, Some(idx));
		assert_eq!(state.click(clicked), Some(ClickOutcome::Selected("a".into())));
		assert!(state.highlight.node_highlighted("b"));
		assert!(!state.highlight.node_highlighted("c"));
	}

	#[test]
	fn clicking_a_selected_node_still_reports_it() {
		let (mut state, _) = settled_state();
		let idx = state.layout.node_index("a").unwrap();
		let first = state.click(Some(idx)).unwrap();
		assert_eq!(state.clicked_node(&first).map(|n| n.id.as_str()), Some("a"));

		let second = state.click(Some(idx)).unwrap();
		assert_eq!(second, ClickOutcome::Deselected("a".into()));
		assert_eq!(state.clicked_node(&second).map(|n| n.id.as_str()), Some("a"));
		assert!(!state.highlight.is_active());
		assert_eq!(state.click(None), None);
	}

	#[test]
	fn dragging_pins_at_the_drop_point() {
		let (mut state, now) = settled_state();
		let idx = state.layout.node_index("c").unwrap();
		let (x, y) = state.layout.position(idx).unwrap();
		state.begin_drag(idx, 0.0, 0.0);
		let k = state.transform.k;
		state.drag_to(40.0 * k, 20.0 * k);
		assert_eq!(state.end_drag(), None);
		state.tick(now + 16.0);
		let (nx, ny) = state.layout.position(idx).unwrap();
		assert!((nx - (x + 40.0)).abs() < 1e-3 && (ny - (y + 20.0)).abs() < 1e-3);
	}

	#[test]
	fn tooltip_lists_known_fields_only() {
		let (state, _) = settled_state();
		let content = state.tooltip_content("a").unwrap();
		let keys: Vec<&str> = content.rows.iter().map(|r| r.key.as_str()).collect();
		assert_eq!(keys, ["Entity", "Type", "References"]);
	}
}
