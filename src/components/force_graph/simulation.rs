//! Force layout driver.
//!
//! `force_graph` holds the nodes, their indices and anchors. Its own integrator
//! applies charge between every pair with no distance limit, so each tick
//! runs here instead: range-limited charge into a damped velocity, then
//! weight-dependent springs, two weak axis-aligned centering pulls and
//! multi-pass collision resolution. The run
//! is bounded by a tick budget and a wall-clock budget; once either runs out,
//! or alpha cools below its floor, every node is anchored in place.

use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, ForceGraph, NodeData, SimulationParameters};
use log::{debug, info};

use super::types::{EntityNode, EntityType, GraphData};
use crate::components::measure::TextMeasure;
use crate::config::ForceConfig;

pub const LABEL_FONT: f64 = 11.0;
const LABEL_GAP: f64 = 4.0;
const LABEL_MAX_CHARS: usize = 24;

/// Per-node data carried inside the force graph.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: String,
	pub label: String,
	pub kind: EntityType,
	pub weight: u32,
	pub radius: f64,
	/// Width and height of glyph plus label.
	pub bbox: (f64, f64),
	pub collide: f64,
}

/// Derived link with its resolved endpoints and spring length.
#[derive(Clone, Debug)]
pub struct LayoutLink {
	pub key: String,
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
	pub relation: Option<String>,
	distance: f64,
	bias: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	Warmup,
	Running,
	Stable,
}

/// What a single call to [`ForceLayout::step`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
	Moved,
	Settled,
	Idle,
}

pub fn glyph_radius(weight: u32) -> f64 {
	(6.0 + 2.5 * (weight as f64).sqrt()).min(26.0)
}

pub fn display_label(label: &str) -> String {
	if label.chars().count() <= LABEL_MAX_CHARS {
		label.to_string()
	} else {
		label.chars().take(LABEL_MAX_CHARS - 1).collect::<String>() + "…"
	}
}

fn node_info(node: &EntityNode, padding: f64, measure: &dyn TextMeasure) -> NodeInfo {
	let radius = glyph_radius(node.weight);
	let label = display_label(&node.label);
	let (text_w, text_h) = measure.measure(&label, LABEL_FONT);
	let bbox = ((2.0 * radius).max(text_w), 2.0 * radius + LABEL_GAP + text_h);
	NodeInfo {
		id: node.id.clone(),
		label,
		kind: node.kind,
		weight: node.weight,
		radius,
		bbox,
		collide: bbox.0.max(bbox.1) / 2.0 + padding,
	}
}

#[derive(Clone, Copy, Default)]
struct Body {
	x: f64,
	y: f64,
	vx: f64,
	vy: f64,
	anchored: bool,
	collide: f64,
}

pub struct ForceLayout {
	graph: ForceGraph<NodeInfo, ()>,
	index: HashMap<String, DefaultNodeIdx>,
	order: Vec<DefaultNodeIdx>,
	links: Vec<LayoutLink>,
	velocity: HashMap<DefaultNodeIdx, (f64, f64)>,
	config: ForceConfig,
	center: (f64, f64),
	alpha: f64,
	ticks: usize,
	started_ms: Option<f64>,
	phase: Phase,
}

impl ForceLayout {
	pub fn new(config: ForceConfig, width: f64, height: f64) -> Self {
		Self {
			graph: ForceGraph::new(parameters()),
			index: HashMap::new(),
			order: Vec::new(),
			links: Vec::new(),
			velocity: HashMap::new(),
			config,
			center: (width / 2.0, height / 2.0),
			alpha: 1.0,
			ticks: 0,
			started_ms: None,
			phase: Phase::Stable,
		}
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn is_stable(&self) -> bool {
		self.phase == Phase::Stable
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn graph(&self) -> &ForceGraph<NodeInfo, ()> {
		&self.graph
	}

	pub fn links(&self) -> &[LayoutLink] {
		&self.links
	}

	pub fn node_index(&self, id: &str) -> Option<DefaultNodeIdx> {
		self.index.get(id).copied()
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	pub fn set_center(&mut self, width: f64, height: f64) {
		self.center = (width / 2.0, height / 2.0);
	}

	/// Replace the node/link set. Nodes that survive keep their position and
	/// pin; new nodes start next to an already-placed neighbour when possible.
	/// Returns how many previous positions were carried over.
	pub fn rebuild(&mut self, data: &GraphData, measure: &dyn TextMeasure) -> usize {
		let previous = self.positions();
		let mut graph = ForceGraph::new(parameters());
		let mut index = HashMap::new();
		let mut order = Vec::new();
		let mut placed: HashMap<&str, (f64, f64)> = HashMap::new();
		let mut retained = 0;
		let mut fresh = 0;

		let neighbours = |id: &str| {
			data.links.iter().filter_map(move |l| l.other(id)).collect::<Vec<_>>()
		};

		for (i, node) in data.nodes.iter().enumerate() {
			let info = node_info(node, self.config.collision_padding, measure);
			let (x, y, is_anchor) = match previous.get(&node.id) {
				Some(&(x, y, anchored)) => {
					retained += 1;
					(x, y, anchored)
				}
				None => {
					fresh += 1;
					let seed = neighbours(&node.id)
						.into_iter()
						.find_map(|n| {
							placed
								.get(n)
								.copied()
								.or_else(|| previous.get(n).map(|&(x, y, _)| (x, y)))
						});
					let (x, y) = match seed {
						Some((sx, sy)) => {
							let angle = i as f64 * 2.399963;
							(sx + 40.0 * angle.cos(), sy + 40.0 * angle.sin())
						}
						None => spiral(i, self.center),
					};
					(x, y, false)
				}
			};
			placed.insert(node.id.as_str(), (x, y));
			let idx = graph.add_node(NodeData {
				x: x as f32,
				y: y as f32,
				is_anchor,
				user_data: info,
				..Default::default()
			});
			index.insert(node.id.clone(), idx);
			order.push(idx);
		}

		let mut degree: HashMap<DefaultNodeIdx, usize> = HashMap::new();
		let mut resolved = Vec::new();
		for link in &data.links {
			let (Some(&s), Some(&t)) = (index.get(&link.source), index.get(&link.target)) else {
				continue;
			};
			*degree.entry(s).or_default() += 1;
			*degree.entry(t).or_default() += 1;
			let weight = |id: &str| data.node(id).map_or(1, |n| n.weight);
			resolved.push((link, s, t, self.config.link_distance(weight(&link.source), weight(&link.target))));
		}
		self.links = resolved
			.into_iter()
			.map(|(link, s, t, distance)| {
				let (ds, dt) = (degree[&s] as f64, degree[&t] as f64);
				LayoutLink {
					key: link.key(),
					source: s,
					target: t,
					relation: link.relation.clone(),
					distance,
					bias: ds / (ds + dt),
				}
			})
			.collect();

		self.graph = graph;
		self.index = index;
		self.order = order;
		self.velocity.clear();
		self.ticks = 0;
		self.started_ms = None;
		self.phase = match (fresh, retained) {
			(0, 0) => Phase::Stable,
			// nothing new: a settled layout stays settled, a running one carries on
			(0, _) if self.phase == Phase::Stable => Phase::Stable,
			(0, _) => Phase::Running,
			(_, 0) => {
				self.alpha = 1.0;
				Phase::Warmup
			}
			_ => {
				self.alpha = 0.5;
				Phase::Running
			}
		};
		info!(
			"layout rebuilt: {} nodes ({retained} kept, {fresh} new), {} links",
			self.order.len(),
			self.links.len()
		);
		retained
	}

	/// Run the pre-paint ticks. Does nothing outside the warmup phase.
	pub fn warmup(&mut self) {
		if self.phase != Phase::Warmup {
			return;
		}
		for _ in 0..self.config.warmup_ticks {
			self.tick();
		}
		self.phase = Phase::Running;
		debug!("warmup done, alpha {:.3}", self.alpha);
	}

	/// Advance one tick of the active phase. `now_ms` is a monotonic clock.
	pub fn step(&mut self, now_ms: f64) -> StepOutcome {
		match self.phase {
			Phase::Stable => return StepOutcome::Idle,
			Phase::Warmup => self.warmup(),
			Phase::Running => {}
		}
		let started = *self.started_ms.get_or_insert(now_ms);
		self.tick();
		self.ticks += 1;

		let out_of_ticks = self.ticks >= self.config.cooldown_ticks;
		let out_of_time = now_ms - started >= self.config.cooldown_ms;
		if self.alpha < self.config.alpha_min || out_of_ticks || out_of_time {
			self.pin_all();
			self.phase = Phase::Stable;
			info!("layout stable after {} ticks (alpha {:.4})", self.ticks, self.alpha);
			return StepOutcome::Settled;
		}
		StepOutcome::Moved
	}

	/// Pin one node where it is; used when a drag starts.
	pub fn pin(&mut self, idx: DefaultNodeIdx) {
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.is_anchor = true;
			}
		});
	}

	/// Move and pin one node; used while dragging and on drop.
	pub fn move_node(&mut self, idx: DefaultNodeIdx, x: f64, y: f64) {
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = x as f32;
				node.data.y = y as f32;
				node.data.is_anchor = true;
			}
		});
	}

	pub fn position(&self, idx: DefaultNodeIdx) -> Option<(f64, f64)> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some((node.x() as f64, node.y() as f64));
			}
		});
		found
	}

	/// Id → (x, y, pinned) for every node.
	pub fn positions(&self) -> HashMap<String, (f64, f64, bool)> {
		let mut out = HashMap::with_capacity(self.order.len());
		self.graph.visit_nodes(|node| {
			out.insert(
				node.data.user_data.id.clone(),
				(node.x() as f64, node.y() as f64, node.data.is_anchor),
			);
		});
		out
	}

	/// Bounding box of every node's glyph+label box: (min_x, min_y, max_x, max_y).
	pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
		let mut bounds: Option<(f64, f64, f64, f64)> = None;
		self.graph.visit_nodes(|node| {
			let info = &node.data.user_data;
			let (x, y) = (node.x() as f64, node.y() as f64);
			let half_w = info.bbox.0 / 2.0;
			let (top, bottom) = (y - info.radius, y - info.radius + info.bbox.1);
			bounds = Some(match bounds {
				None => (x - half_w, top, x + half_w, bottom),
				Some((a, b, c, d)) => (a.min(x - half_w), b.min(top), c.max(x + half_w), d.max(bottom)),
			});
		});
		bounds
	}

	fn pin_all(&mut self) {
		self.graph.visit_nodes_mut(|node| {
			node.data.is_anchor = true;
		});
	}

	fn tick(&mut self) {
		if self.order.is_empty() {
			return;
		}
		let alpha = self.alpha;

		let mut slot = HashMap::with_capacity(self.order.len());
		let mut bodies = Vec::with_capacity(self.order.len());
		self.graph.visit_nodes(|node| {
			let (vx, vy) = self.velocity.get(&node.index()).copied().unwrap_or_default();
			slot.insert(node.index(), bodies.len());
			bodies.push(Body {
				x: node.x() as f64,
				y: node.y() as f64,
				vx,
				vy,
				anchored: node.data.is_anchor,
				collide: node.data.user_data.collide,
			});
		});

		self.apply_charge(&mut bodies, alpha);
		self.integrate(&mut bodies);
		self.apply_links(&mut bodies, &slot, alpha);
		self.apply_centering(&mut bodies, alpha);
		self.apply_collisions(&mut bodies);

		let velocity = &mut self.velocity;
		self.graph.visit_nodes_mut(|node| {
			let body = bodies[slot[&node.index()]];
			if !body.anchored && body.x.is_finite() && body.y.is_finite() {
				node.data.x = body.x as f32;
				node.data.y = body.y as f32;
				velocity.insert(node.index(), (body.vx, body.vy));
			} else {
				velocity.remove(&node.index());
			}
		});

		self.alpha += (0.0 - self.alpha) * self.config.alpha_decay;
	}

	/// Many-body repulsion, cut off beyond `charge_distance_max` and flattened
	/// inside `charge_distance_min`.
	fn apply_charge(&self, bodies: &mut [Body], alpha: f64) {
		let strength = self.config.charge_strength(bodies.len()) * alpha;
		let min2 = self.config.charge_distance_min * self.config.charge_distance_min;
		let max2 = self.config.charge_distance_max * self.config.charge_distance_max;
		for i in 0..bodies.len() {
			for j in (i + 1)..bodies.len() {
				let (a, b) = (bodies[i], bodies[j]);
				if a.anchored && b.anchored {
					continue;
				}
				let (dx, dy) = (b.x - a.x, b.y - a.y);
				let dist2 = dx * dx + dy * dy;
				// coincident pairs are left to collision
				if dist2 >= max2 || dist2 < 1e-9 {
					continue;
				}
				let k = strength / dist2.max(min2);
				if !a.anchored {
					bodies[i].vx += dx * k;
					bodies[i].vy += dy * k;
				}
				if !b.anchored {
					bodies[j].vx -= dx * k;
					bodies[j].vy -= dy * k;
				}
			}
		}
	}

	fn integrate(&self, bodies: &mut [Body]) {
		let max_step = self.config.max_speed * self.config.tick_dt;
		for body in bodies.iter_mut() {
			if body.anchored {
				(body.vx, body.vy) = (0.0, 0.0);
				continue;
			}
			body.vx *= self.config.damping;
			body.vy *= self.config.damping;
			let speed = (body.vx * body.vx + body.vy * body.vy).sqrt();
			if speed > max_step {
				body.vx *= max_step / speed;
				body.vy *= max_step / speed;
			}
			body.x += body.vx;
			body.y += body.vy;
		}
	}

	fn apply_links(&self, bodies: &mut [Body], slot: &HashMap<DefaultNodeIdx, usize>, alpha: f64) {
		for link in &self.links {
			let (si, ti) = (slot[&link.source], slot[&link.target]);
			let (s, t) = (bodies[si], bodies[ti]);
			let (mut dx, mut dy) = (t.x - s.x, t.y - s.y);
			let len = (dx * dx + dy * dy).sqrt().max(1e-6);
			let k = (len - link.distance) / len * alpha * self.config.link_strength;
			dx *= k;
			dy *= k;
			let (mut to_target, mut to_source) = (link.bias, 1.0 - link.bias);
			match (s.anchored, t.anchored) {
				(true, true) => continue,
				(true, false) => (to_target, to_source) = (1.0, 0.0),
				(false, true) => (to_target, to_source) = (0.0, 1.0),
				(false, false) => {}
			}
			bodies[ti].x -= dx * to_target;
			bodies[ti].y -= dy * to_target;
			bodies[si].x += dx * to_source;
			bodies[si].y += dy * to_source;
		}
	}

	fn apply_centering(&self, bodies: &mut [Body], alpha: f64) {
		let strength = self.config.center_strength * alpha;
		for body in bodies.iter_mut().filter(|b| !b.anchored) {
			body.x += (self.center.0 - body.x) * strength;
			body.y += (self.center.1 - body.y) * strength;
		}
	}

	fn apply_collisions(&self, bodies: &mut [Body]) {
		let strength = self.config.collision_strength;
		for _ in 0..self.config.collision_iterations {
			for i in 0..bodies.len() {
				for j in (i + 1)..bodies.len() {
					let (a, b) = (bodies[i], bodies[j]);
					if a.anchored && b.anchored {
						continue;
					}
					let reach = a.collide + b.collide;
					let (mut dx, mut dy) = (b.x - a.x, b.y - a.y);
					let mut dist2 = dx * dx + dy * dy;
					if dist2 >= reach * reach {
						continue;
					}
					if dist2 < 1e-9 {
						// coincident: separate along a deterministic direction
						let angle = (i * 7 + j * 13) as f64;
						dx = angle.cos() * 1e-3;
						dy = angle.sin() * 1e-3;
						dist2 = dx * dx + dy * dy;
					}
					let dist = dist2.sqrt();
					let push = (reach - dist) / dist * strength;
					let (ra, rb) = (a.collide * a.collide, b.collide * b.collide);
					let (mut share_a, mut share_b) = (rb / (ra + rb), ra / (ra + rb));
					if a.anchored {
						(share_a, share_b) = (0.0, 1.0);
					} else if b.anchored {
						(share_a, share_b) = (1.0, 0.0);
					}
					bodies[i].x -= dx * push * share_a;
					bodies[i].y -= dy * push * share_a;
					bodies[j].x += dx * push * share_b;
					bodies[j].y += dy * push * share_b;
				}
			}
		}
	}
}

/// The built-in forces stay off; [`ForceLayout::tick`] applies its own.
fn parameters() -> SimulationParameters {
	SimulationParameters {
		force_charge: 0.0,
		force_spring: 0.0,
		..SimulationParameters::default()
	}
}

/// Phyllotaxis seeding around the center, so nodes never start stacked.
fn spiral(i: usize, center: (f64, f64)) -> (f64, f64) {
	let radius = 10.0 * (0.5 + i as f64).sqrt() * 3.0;
	let angle = i as f64 * PI * (3.0 - 5f64.sqrt());
	(center.0 + radius * angle.cos(), center.1 + radius * angle.sin())
}
