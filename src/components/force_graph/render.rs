use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::DefaultNodeIdx;
use web_sys::CanvasRenderingContext2d;

use super::simulation::LABEL_FONT;
use super::state::ForceGraphState;
use super::types::EntityType;

const BACKGROUND: &str = "#1a1a2e";
const LINK_RGB: &str = "100, 180, 255";
const FONT_FAMILY: &str = "sans-serif";

/// Link opacity and width factor for an intensity in `[-1, 1]`.
fn link_style(v: f64) -> (f64, f64) {
	if v >= 0.0 {
		(0.45 + 0.5 * v, 1.0 + 0.6 * v)
	} else {
		(0.45 + 0.35 * v, 1.0 + 0.3 * v)
	}
}

/// Node opacity for an intensity in `[-1, 1]`.
fn node_alpha(v: f64) -> f64 {
	if v >= 0.0 { 1.0 } else { 1.0 + 0.75 * v }
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);

	let mut positions: HashMap<DefaultNodeIdx, (f64, f64)> = HashMap::new();
	state.layout.graph().visit_nodes(|node| {
		positions.insert(node.index(), (node.x() as f64, node.y() as f64));
	});
	draw_links(state, ctx, &positions);
	draw_nodes(state, ctx);
	draw_relation_labels(state, ctx, &positions);
	ctx.restore();
}

fn draw_links(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, positions: &HashMap<DefaultNodeIdx, (f64, f64)>) {
	let k = state.transform.k;
	for link in state.layout.links() {
		let (Some(&(x1, y1)), Some(&(x2, y2))) = (positions.get(&link.source), positions.get(&link.target)) else {
			continue;
		};
		let (alpha, width) = link_style(state.animator.link(&link.key));
		ctx.set_stroke_style_str(&format!("rgba({LINK_RGB}, {alpha})"));
		ctx.set_line_width(1.2 * width / k.max(0.5));
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x2, y2);
		ctx.stroke();
	}
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let selected = state.highlight.selected();
	state.layout.graph().visit_nodes(|node| {
		let info = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);
		let v = state.animator.node(&info.id);
		let color = info.kind.color();

		if v > 0.01 {
			draw_glow(ctx, x, y, info.radius, v);
		}

		ctx.set_global_alpha(node_alpha(v));
		ctx.begin_path();
		let _ = ctx.arc(x, y, info.radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(color);
		ctx.fill();

		if selected == Some(info.id.as_str()) {
			ctx.begin_path();
			let _ = ctx.arc(x, y, info.radius + 3.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.9)");
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}

		draw_icon(ctx, info.kind, x, y, info.radius);

		ctx.set_fill_style_str("rgba(255, 255, 255, 0.85)");
		ctx.set_font(&format!("{LABEL_FONT}px {FONT_FAMILY}"));
		ctx.set_text_align("center");
		ctx.set_text_baseline("top");
		let _ = ctx.fill_text(&info.label, x, y + info.radius + 4.0);
		ctx.set_global_alpha(1.0);
	});
}

fn draw_glow(ctx: &CanvasRenderingContext2d, x: f64, y: f64, radius: f64, v: f64) {
	let outer = radius * (1.4 + 0.8 * v);
	let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, outer) else {
		return;
	};
	let alpha = 0.3 * v;
	let stops = [
		(0.0, format!("rgba(255, 255, 255, {alpha})")),
		(0.6, format!("rgba(200, 220, 255, {})", alpha * 0.3)),
		(1.0, "rgba(255, 255, 255, 0)".to_string()),
	];
	for (offset, color) in &stops {
		if gradient.add_color_stop(*offset as f32, color).is_err() {
			return;
		}
	}
	ctx.begin_path();
	let _ = ctx.arc(x, y, outer, 0.0, 2.0 * PI);
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill();
}

fn draw_icon(ctx: &CanvasRenderingContext2d, kind: EntityType, x: f64, y: f64, radius: f64) {
	ctx.set_fill_style_str("rgba(255, 255, 255, 0.95)");
	ctx.set_font(&format!("bold {}px {FONT_FAMILY}", radius.max(6.0)));
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let _ = ctx.fill_text(kind.icon(), x, y);
}

/// Relation names sit at the midpoint of highlighted links only.
fn draw_relation_labels(
	state: &ForceGraphState,
	ctx: &CanvasRenderingContext2d,
	positions: &HashMap<DefaultNodeIdx, (f64, f64)>,
) {
	let k = state.transform.k;
	ctx.set_font(&format!("{}px {FONT_FAMILY}", 10.0 / k.max(0.5)));
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	for link in state.layout.links() {
		let Some(relation) = &link.relation else {
			continue;
		};
		let v = state.animator.link(&link.key);
		if v <= 0.05 || !state.highlight.link_highlighted(&link.key) {
			continue;
		}
		let (Some(&(x1, y1)), Some(&(x2, y2))) = (positions.get(&link.source), positions.get(&link.target)) else {
			continue;
		};
		ctx.set_fill_style_str(&format!("rgba(220, 235, 255, {})", v.min(1.0)));
		let _ = ctx.fill_text(relation, (x1 + x2) / 2.0, (y1 + y2) / 2.0);
	}
}
