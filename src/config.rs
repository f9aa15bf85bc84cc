//! Tuned constants for layout, animation, tooltips and the radial diagram.
//!
//! Every value has a default that matches the shipped look. Hosts may override
//! any subset through [`GraphConfig::from_json`].

use serde::Deserialize;

use crate::error::{GraphError, Result};

/// Top-level configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
	/// Force layout tuning.
	pub force: ForceConfig,
	/// Highlight transition tuning.
	pub highlight: HighlightConfig,
	/// Tooltip placement tuning.
	pub tooltip: TooltipConfig,
	/// Knowledge graph geometry.
	pub radial: RadialConfig,
	/// How many nodes the importance filter keeps by default.
	pub default_node_limit: usize,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			force: ForceConfig::default(),
			highlight: HighlightConfig::default(),
			tooltip: TooltipConfig::default(),
			radial: RadialConfig::default(),
			default_node_limit: 50,
		}
	}
}

impl GraphConfig {
	/// Parse a (possibly partial) JSON document on top of the defaults.
	pub fn from_json(json: &str) -> Result<Self> {
		let config: GraphConfig = serde_json::from_str(json)?;
		if config.default_node_limit == 0 {
			return Err(GraphError::Config("default_node_limit must be at least 1".into()));
		}
		if !(0.0..=1.0).contains(&config.highlight.blend) {
			return Err(GraphError::Config("highlight.blend must be within 0..=1".into()));
		}
		if config.force.charge_distance_max <= config.force.charge_distance_min {
			return Err(GraphError::Config("force.charge_distance_max must exceed charge_distance_min".into()));
		}
		Ok(config)
	}
}

/// Force simulation parameters.
///
/// The shape of each formula is what matters: charge grows with node count,
/// spring length grows with the heavier endpoint's weight.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForceConfig {
	/// Charge strength with no nodes (negative repels).
	pub charge_base: f64,
	/// Additional charge per node.
	pub charge_per_node: f64,
	/// Strongest charge ever applied.
	pub charge_floor: f64,
	/// Repulsion stops growing once two nodes are closer than this.
	pub charge_distance_min: f64,
	/// Nodes farther apart than this do not repel at all.
	pub charge_distance_max: f64,
	/// Spring rest length before weight is considered.
	pub link_distance_base: f64,
	/// Extra rest length per unit of the heavier endpoint's weight.
	pub link_distance_per_weight: f64,
	/// Spring stiffness.
	pub link_strength: f64,
	/// Pull of the two axis-aligned centering forces.
	pub center_strength: f64,
	/// Clearance added around each node's bounding box.
	pub collision_padding: f64,
	/// Fraction of an overlap resolved per collision pass.
	pub collision_strength: f64,
	/// Collision passes per tick.
	pub collision_iterations: usize,
	/// Ticks run before the first paint.
	pub warmup_ticks: usize,
	/// Tick budget after the first paint.
	pub cooldown_ticks: usize,
	/// Wall-clock budget after the first paint.
	pub cooldown_ms: f64,
	/// Per-tick alpha decay.
	pub alpha_decay: f64,
	/// Alpha below which the layout counts as settled.
	pub alpha_min: f64,
	/// Velocity retained per integration step.
	pub damping: f64,
	/// Upper bound on node speed.
	pub max_speed: f64,
	/// Integration step per tick, in seconds.
	pub tick_dt: f64,
	/// Duration of the one-off zoom-to-fit animation.
	pub fit_duration_ms: f64,
	/// Screen padding kept around fitted content.
	pub fit_padding: f64,
}

impl Default for ForceConfig {
	fn default() -> Self {
		Self {
			charge_base: -700.0,
			charge_per_node: -35.0,
			charge_floor: -3500.0,
			charge_distance_min: 20.0,
			charge_distance_max: 600.0,
			link_distance_base: 180.0,
			link_distance_per_weight: 15.0,
			link_strength: 0.2,
			center_strength: 0.015,
			collision_padding: 6.0,
			collision_strength: 0.9,
			collision_iterations: 3,
			warmup_ticks: 60,
			cooldown_ticks: 240,
			cooldown_ms: 4000.0,
			alpha_decay: 0.0228,
			alpha_min: 0.001,
			damping: 0.6,
			max_speed: 3000.0,
			tick_dt: 0.016,
			fit_duration_ms: 400.0,
			fit_padding: 40.0,
		}
	}
}

impl ForceConfig {
	/// Repulsion strength for a graph of `node_count` nodes.
	pub fn charge_strength(&self, node_count: usize) -> f64 {
		(self.charge_base + self.charge_per_node * node_count as f64).max(self.charge_floor)
	}

	/// Spring rest length between two endpoints of the given weights.
	pub fn link_distance(&self, weight_a: u32, weight_b: u32) -> f64 {
		self.link_distance_base + self.link_distance_per_weight * weight_a.max(weight_b) as f64
	}
}

/// Highlight transition tuning.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HighlightConfig {
	/// Fraction of the remaining distance covered per reference frame.
	pub blend: f64,
	/// Length of the reference frame, in seconds.
	pub reference_frame: f64,
}

impl Default for HighlightConfig {
	fn default() -> Self {
		Self {
			blend: 0.18,
			reference_frame: 1.0 / 60.0,
		}
	}
}

/// Tooltip placement tuning, in CSS pixels.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TooltipConfig {
	/// Distance kept from the container edges.
	pub margin: f64,
	/// Distance kept from the anchor.
	pub gap: f64,
	/// Offset from the pointer when there is no anchor rectangle.
	pub pointer_offset: f64,
}

impl Default for TooltipConfig {
	fn default() -> Self {
		Self {
			margin: 8.0,
			gap: 16.0,
			pointer_offset: 12.0,
		}
	}
}

/// Knowledge graph geometry, in view box units.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RadialConfig {
	/// The view box spans `-half_extent..half_extent` on both axes.
	pub half_extent: f64,
	/// Labels stay this far inside the view box vertically.
	pub label_inset: f64,
	/// Labels may spill this far past the view box horizontally.
	pub label_overflow_x: f64,
	/// Minimum clearance between committed boxes.
	pub label_padding: f64,
	/// Clearance added around each node's hit box.
	pub node_padding: f64,
	/// Label font size.
	pub font_size: f64,
	/// Distance of source nodes from the query node.
	pub source_distance: f64,
	/// Offset of entity nodes along both axes.
	pub entity_offset: f64,
	/// Longest source label before word truncation.
	pub source_label_max: usize,
	/// Longest entity label before word truncation.
	pub entity_label_max: usize,
}

impl Default for RadialConfig {
	fn default() -> Self {
		Self {
			half_extent: 14.0,
			label_inset: 0.3,
			label_overflow_x: 6.0,
			label_padding: 0.15,
			node_padding: 0.25,
			font_size: 0.8,
			source_distance: 8.5,
			entity_offset: 5.5,
			source_label_max: 40,
			entity_label_max: 12,
		}
	}
}
