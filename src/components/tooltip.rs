//! Tooltip placement and the overlay shared by both diagrams.

use leptos::prelude::*;

use crate::config::TooltipConfig;

/// Axis-aligned rectangle in container coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
	pub left: f64,
	pub top: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
		Self { left, top, width, height }
	}

	pub fn right(&self) -> f64 {
		self.left + self.width
	}

	pub fn bottom(&self) -> f64 {
		self.top + self.height
	}

	pub fn overlap_area(&self, other: &Rect) -> f64 {
		let x = (self.right().min(other.right()) - self.left.max(other.left)).max(0.0);
		let y = (self.bottom().min(other.bottom()) - self.top.max(other.top)).max(0.0);
		x * y
	}
}

/// What the tooltip is attached to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Anchor {
	/// On-screen bounds of the hovered element.
	Rect(Rect),
	/// Raw pointer position.
	Pointer(f64, f64),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlacementHint {
	#[default]
	None,
	Horizontal,
	Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
	Above,
	Below,
	Right,
	Left,
	Corner,
	Pointer,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
	pub left: f64,
	pub top: f64,
	pub side: Side,
}

struct Scored {
	placement: Placement,
	overlap: f64,
	in_bounds: bool,
}

// Not `f64::clamp`: a tooltip larger than its container yields max < min.
fn clamp(value: f64, min: f64, max: f64) -> f64 {
	value.max(min).min(max)
}

/// Pick where a `size` tooltip goes inside a `container` sized box so it
/// stays clear of `anchor`.
pub fn place_tooltip(
	anchor: Anchor,
	size: (f64, f64),
	container: (f64, f64),
	hint: PlacementHint,
	config: &TooltipConfig,
) -> Placement {
	let (w, h) = size;
	let (cw, ch) = container;
	let margin = config.margin;
	let max_left = cw - w - margin;
	let max_top = ch - h - margin;

	let anchor = match anchor {
		Anchor::Rect(rect) => rect,
		Anchor::Pointer(x, y) => {
			return Placement {
				left: clamp(x + config.pointer_offset, margin, max_left),
				top: clamp(y + config.pointer_offset, margin, max_top),
				side: Side::Pointer,
			};
		}
	};

	let score = |left: f64, top: f64, side: Side| {
		let left = clamp(left, margin, max_left);
		let top = clamp(top, margin, max_top);
		let boxed = Rect::new(left, top, w, h);
		Scored {
			placement: Placement { left, top, side },
			overlap: boxed.overlap_area(&anchor),
			in_bounds: left >= margin && top >= margin && boxed.right() <= cw - margin && boxed.bottom() <= ch - margin,
		}
	};

	let center_x = anchor.left + anchor.width / 2.0;
	let center_y = anchor.top + anchor.height / 2.0;
	let gap = config.gap;
	let mut sides = [
		(Side::Above, center_x - w / 2.0, anchor.top - h - gap),
		(Side::Below, center_x - w / 2.0, anchor.bottom() + gap),
		(Side::Right, anchor.right() + gap, center_y - h / 2.0),
		(Side::Left, anchor.left - w - gap, center_y - h / 2.0),
	];
	let rank = |side: Side| match (hint, side) {
		(PlacementHint::Horizontal, Side::Right) | (PlacementHint::Vertical, Side::Above) => 0,
		(PlacementHint::Horizontal, Side::Left) | (PlacementHint::Vertical, Side::Below) => 1,
		(PlacementHint::Horizontal, Side::Below) | (PlacementHint::Vertical, Side::Right) => 2,
		(PlacementHint::Horizontal, Side::Above) | (PlacementHint::Vertical, Side::Left) => 3,
		_ => 0,
	};
	sides.sort_by_key(|&(side, _, _)| rank(side));

	let candidates: Vec<Scored> = sides.iter().map(|&(side, left, top)| score(left, top, side)).collect();
	let best = pick(candidates);
	if best.overlap == 0.0 {
		return best.placement;
	}

	let corners = vec![
		score(margin, margin, Side::Corner),
		score(cw - w - margin, margin, Side::Corner),
		score(margin, ch - h - margin, Side::Corner),
		score(cw - w - margin, ch - h - margin, Side::Corner),
	];
	let corner = pick(corners);
	if corner.overlap <= best.overlap {
		corner.placement
	} else {
		best.placement
	}
}

/// First clear in-bounds candidate, else least overlap (in-bounds breaks ties).
fn pick(mut candidates: Vec<Scored>) -> Scored {
	if let Some(i) = candidates.iter().position(|c| c.overlap == 0.0 && c.in_bounds) {
		return candidates.swap_remove(i);
	}
	candidates.sort_by(|a, b| {
		a.overlap
			.total_cmp(&b.overlap)
			.then_with(|| b.in_bounds.cmp(&a.in_bounds))
	});
	candidates.swap_remove(0)
}

/// One label/value line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TooltipRow {
	pub key: String,
	pub value: String,
	pub class: Option<&'static str>,
}

/// Title plus rows, ready to show.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TooltipContent {
	pub title: String,
	pub rows: Vec<TooltipRow>,
}

const UNAVAILABLE: [&str; 4] = ["unavailable", "n/a", "na", "none"];

/// True for values that carry no information.
pub fn is_unavailable(value: &str) -> bool {
	let trimmed = value.trim();
	trimmed.is_empty() || UNAVAILABLE.iter().any(|s| trimmed.eq_ignore_ascii_case(s))
}

/// Append a row unless the value is missing or a placeholder.
pub fn add_row(rows: &mut Vec<TooltipRow>, key: &str, value: Option<impl ToString>) {
	add_row_with_class(rows, key, value, None);
}

pub fn add_row_with_class(rows: &mut Vec<TooltipRow>, key: &str, value: Option<impl ToString>, class: Option<&'static str>) {
	let Some(value) = value.map(|v| v.to_string()) else {
		return;
	};
	if is_unavailable(&value) {
		return;
	}
	rows.push(TooltipRow {
		key: key.to_string(),
		value,
		class,
	});
}

/// Floating tooltip box.
///
/// Content and position are separate signals: moving the pointer only
/// rewrites `left`/`top`, so a running opacity transition is never restarted.
#[component]
pub fn GraphTooltip(
	#[prop(into)] content: Signal<Option<TooltipContent>>,
	#[prop(into)] position: Signal<(f64, f64)>,
	node_ref: NodeRef<leptos::html::Div>,
) -> impl IntoView {
	// keep the last content around so the fade-out has something to show
	let last = RwSignal::new(TooltipContent::default());
	Effect::new(move |_| {
		if let Some(c) = content.get() {
			last.set(c);
		}
	});

	view! {
		<div
			node_ref=node_ref
			class="graph-tooltip"
			class:visible=move || content.with(Option::is_some)
			style:left=move || format!("{}px", position.get().0)
			style:top=move || format!("{}px", position.get().1)
		>
			<div class="graph-tooltip-title">{move || last.with(|c| c.title.clone())}</div>
			{move || {
				last.with(|c| {
					c.rows
						.iter()
						.map(|row| {
							let class = match row.class {
								Some(extra) => format!("graph-tooltip-row {extra}"),
								None => "graph-tooltip-row".to_string(),
							};
							view! {
								<div class=class>
									<span class="graph-tooltip-key">{row.key.clone()}</span>
									<span class="graph-tooltip-value">{row.value.clone()}</span>
								</div>
							}
						})
						.collect_view()
				})
			}}
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> TooltipConfig {
		TooltipConfig::default()
	}

	fn inside(p: &Placement, size: (f64, f64), container: (f64, f64), margin: f64) -> bool {
		p.left >= margin && p.top >= margin && p.left + size.0 <= container.0 - margin && p.top + size.1 <= container.1 - margin
	}

	#[test]
	fn prefers_above_when_there_is_room() {
		let anchor = Rect::new(190.0, 190.0, 20.0, 20.0);
		let p = place_tooltip(Anchor::Rect(anchor), (100.0, 50.0), (400.0, 400.0), PlacementHint::None, &config());
		assert_eq!(p.side, Side::Above);
		assert_eq!((p.left, p.top), (150.0, 124.0));
	}

	#[test]
	fn near_top_edge_falls_through_to_below() {
		let anchor = Rect::new(190.0, 10.0, 20.0, 20.0);
		let p = place_tooltip(Anchor::Rect(anchor), (100.0, 50.0), (400.0, 400.0), PlacementHint::None, &config());
		assert_eq!(p.side, Side::Below);
		assert_eq!(Rect::new(p.left, p.top, 100.0, 50.0).overlap_area(&anchor), 0.0);
	}

	#[test]
	fn hints_reorder_candidates() {
		let anchor = Rect::new(190.0, 190.0, 20.0, 20.0);
		let size = (100.0, 50.0);
		let h = place_tooltip(Anchor::Rect(anchor), size, (400.0, 400.0), PlacementHint::Horizontal, &config());
		assert_eq!(h.side, Side::Right);
		let v = place_tooltip(Anchor::Rect(anchor), size, (400.0, 400.0), PlacementHint::Vertical, &config());
		assert_eq!(v.side, Side::Above);
	}

	#[test]
	fn stays_in_container_for_anchors_everywhere() {
		let size = (120.0, 60.0);
		let container = (300.0, 200.0);
		for x in (0..280).step_by(20) {
			for y in (0..180).step_by(20) {
				let anchor = Rect::new(x as f64, y as f64, 20.0, 20.0);
				for hint in [PlacementHint::None, PlacementHint::Horizontal, PlacementHint::Vertical] {
					let p = place_tooltip(Anchor::Rect(anchor), size, container, hint, &config());
					assert!(inside(&p, size, container, 8.0), "{anchor:?} -> {p:?}");
				}
			}
		}
	}

	#[test]
	fn corner_fallback_picked_when_sides_overlap() {
		// every side candidate gets clamped back onto the anchor
		let anchor = Rect::new(20.0, 20.0, 160.0, 160.0);
		let p = place_tooltip(Anchor::Rect(anchor), (60.0, 20.0), (200.0, 200.0), PlacementHint::None, &config());
		assert_eq!(p.side, Side::Corner);
		assert_eq!((p.left, p.top), (8.0, 8.0));
	}

	#[test]
	fn pointer_mode_offsets_and_clamps() {
		let c = config();
		let p = place_tooltip(Anchor::Pointer(50.0, 40.0), (100.0, 30.0), (400.0, 300.0), PlacementHint::None, &c);
		assert_eq!((p.left, p.top), (62.0, 52.0));
		let edge = place_tooltip(Anchor::Pointer(390.0, 290.0), (100.0, 30.0), (400.0, 300.0), PlacementHint::None, &c);
		assert_eq!((edge.left, edge.top), (292.0, 262.0));
	}

	#[test]
	fn rows_skip_placeholder_values() {
		let mut rows = Vec::new();
		add_row(&mut rows, "Owner", Some("  "));
		add_row(&mut rows, "Owner", Some("N/A"));
		add_row(&mut rows, "Owner", Some("None"));
		add_row(&mut rows, "Owner", None::<&str>);
		add_row(&mut rows, "Chunks", Some(3));
		add_row(&mut rows, "Owner", Some("Legal"));
		let keys: Vec<_> = rows.iter().map(|r| (r.key.as_str(), r.value.as_str())).collect();
		assert_eq!(keys, [("Chunks", "3"), ("Owner", "Legal")]);
	}
}
