use leptos::prelude::*;
use log::debug;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Element, EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent};

use super::labels::{PlacedLabel, place_labels};
use super::layout::{QueryMeta, RadialKind, RadialLayout, SourceRef, radial_layout};
use crate::components::force_graph::highlight::Highlight;
use crate::components::force_graph::model::ExtractedEntity;
use crate::components::force_graph::types::GraphLink;
use crate::components::measure::{CanvasTextMeasure, EstimatedTextMeasure, TextMeasure};
use crate::components::tooltip::{Anchor, GraphTooltip, PlacementHint, Rect, TooltipContent, place_tooltip};
use crate::config::GraphConfig;

/// A laid-out diagram with its labels and the links the highlight follows.
#[derive(Clone, Debug, PartialEq)]
struct Diagram {
	layout: RadialLayout,
	labels: Vec<Option<PlacedLabel>>,
	links: Vec<GraphLink>,
}

impl Diagram {
	fn build(
		sources: &[SourceRef],
		entities: &[ExtractedEntity],
		response: &str,
		meta: &QueryMeta,
		config: &GraphConfig,
	) -> Option<Self> {
		let layout = radial_layout(sources, entities, response, meta, &config.radial)?;
		let measure = text_measure();
		let labels = place_labels(&layout, measure.as_ref(), &config.radial);
		let links = layout
			.links
			.iter()
			.map(|l| GraphLink {
				source: layout.nodes[l.source].id.clone(),
				target: layout.nodes[l.target].id.clone(),
				edge_id: None,
				relation: None,
			})
			.collect();
		debug!("knowledge graph: {} nodes, {} labels hidden", layout.nodes.len(), labels.iter().filter(|l| l.is_none()).count());
		Some(Self { layout, labels, links })
	}
}

/// Canvas-backed measurement on a detached canvas, or the estimate when no
/// document is around.
fn text_measure() -> Box<dyn TextMeasure> {
	let ctx = web_sys::window()
		.and_then(|w| w.document())
		.and_then(|d| d.create_element("canvas").ok())
		.and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
		.and_then(|canvas| canvas.get_context("2d").ok().flatten())
		.and_then(|obj| obj.dyn_into::<CanvasRenderingContext2d>().ok());
	match ctx {
		Some(ctx) => Box::new(CanvasTextMeasure::new(ctx, "sans-serif")),
		None => Box::new(EstimatedTextMeasure::default()),
	}
}

fn emphasis(active: bool, member: bool) -> &'static str {
	match (active, member) {
		(false, _) => "",
		(true, true) => " highlighted",
		(true, false) => " dimmed",
	}
}

fn fmt(v: f64) -> String {
	format!("{v:.3}")
}

fn is_activation_key(key: &str) -> bool {
	matches!(key, "Enter" | " " | "Spacebar")
}

/// Focus and ARIA attributes for a node: `(tabindex, role, aria-label)`.
fn node_access(kind: &RadialKind, label: &str) -> Option<(&'static str, &'static str, String)> {
	kind.is_actionable()
		.then(|| ("0", "button", format!("{}: {label}", kind.display_name())))
}

fn legend() -> impl IntoView {
	let items = RadialKind::legend()
		.iter()
		.map(|kind| {
			view! {
				<div class="legend-item">
					<span class=format!("legend-dot legend-dot--{}", kind.css())></span>
					<span>{kind.display_name()}</span>
				</div>
			}
		})
		.collect_view();
	view! { <div class="graph-legend">{items}</div> }
}

/// Deterministic query → sources → entities diagram drawn as SVG.
#[component]
pub fn KnowledgeGraph(
	#[prop(into)] sources: Signal<Vec<SourceRef>>,
	#[prop(into)] entities: Signal<Vec<ExtractedEntity>>,
	/// Answer text; entity mention counts come from it.
	#[prop(optional, into)]
	response: Option<Signal<String>>,
	#[prop(optional, into)] meta: Option<Signal<QueryMeta>>,
	#[prop(optional)] config: Option<GraphConfig>,
	/// Fired with the entity name when an entity node is clicked.
	#[prop(optional, into)]
	on_entity_activated: Option<Callback<String>>,
	/// Fired with the filename when a source node is clicked.
	#[prop(optional, into)]
	on_source_activated: Option<Callback<String>>,
) -> impl IntoView {
	let config = config.unwrap_or_default();
	let half = config.radial.half_extent;
	let view_box = format!("{} {} {} {}", -half, -half, 2.0 * half, 2.0 * half);
	let font_size = fmt(config.radial.font_size);
	let tooltip_config = StoredValue::new(config.tooltip.clone());

	let diagram = Memo::new(move |_| {
		let response = response.map(|r| r.get()).unwrap_or_default();
		let meta = meta.map(|m| m.get()).unwrap_or_default();
		sources.with(|s| entities.with(|e| Diagram::build(s, e, &response, &meta, &config)))
	});

	let highlight = RwSignal::new(Highlight::default());
	let container_ref = NodeRef::<leptos::html::Div>::new();
	let tooltip_ref = NodeRef::<leptos::html::Div>::new();
	let tooltip_content = RwSignal::new(None::<TooltipContent>);
	let tooltip_pos = RwSignal::new((0.0, 0.0));

	// Anchor on the node's element when there is one, else on the pointer.
	let place = move |kind: &RadialKind, target: Option<EventTarget>, pointer: Option<(f64, f64)>| {
		let Some(container) = container_ref.get_untracked() else {
			return;
		};
		let bounds = container.get_bounding_client_rect();
		let anchor = target
			.and_then(|t| t.dyn_into::<Element>().ok())
			.map(|el| {
				let r = el.get_bounding_client_rect();
				Anchor::Rect(Rect::new(r.left() - bounds.left(), r.top() - bounds.top(), r.width(), r.height()))
			})
			.or_else(|| pointer.map(|(x, y)| Anchor::Pointer(x - bounds.left(), y - bounds.top())));
		let Some(anchor) = anchor else {
			return;
		};
		let size = tooltip_ref
			.get_untracked()
			.map(|el| (el.offset_width() as f64, el.offset_height() as f64))
			.unwrap_or((200.0, 120.0));
		let hint = match kind {
			RadialKind::Query => PlacementHint::Vertical,
			_ => PlacementHint::None,
		};
		let placed = tooltip_config.with_value(|c| place_tooltip(anchor, size, (bounds.width(), bounds.height()), hint, c));
		tooltip_pos.set((placed.left, placed.top));
	};

	let enter = move |idx: usize, target: Option<EventTarget>, pointer: Option<(f64, f64)>| {
		let Some(d) = diagram.get_untracked() else {
			return;
		};
		let node = &d.layout.nodes[idx];
		highlight.update(|h| h.pointer_enter(&node.id, &d.links));
		tooltip_content.set(Some(TooltipContent {
			title: node.tooltip_title.to_string(),
			rows: node.tooltip_rows.clone(),
		}));
		place(&node.kind, target, pointer);
	};

	let track = move |idx: usize, ev: MouseEvent| {
		if tooltip_content.with_untracked(Option::is_none) {
			return;
		}
		let Some(d) = diagram.get_untracked() else {
			return;
		};
		place(
			&d.layout.nodes[idx].kind,
			ev.current_target(),
			Some((ev.client_x() as f64, ev.client_y() as f64)),
		);
	};

	let leave = move || {
		highlight.update(Highlight::pointer_leave);
		tooltip_content.set(None);
	};

	let activate = move |idx: usize| {
		let Some(d) = diagram.get_untracked() else {
			return;
		};
		match &d.layout.nodes[idx].kind {
			RadialKind::Entity { name } => {
				if let Some(cb) = on_entity_activated {
					cb.run(name.clone());
				}
			}
			RadialKind::Source { filename } => {
				if let Some(cb) = on_source_activated {
					cb.run(filename.clone());
				}
			}
			RadialKind::Query => {}
		}
	};

	let draw = move |d: Diagram| {
		let links = d
			.layout
			.links
			.iter()
			.map(|l| {
				let (a, b) = (&d.layout.nodes[l.source], &d.layout.nodes[l.target]);
				let key = l.key(&d.layout.nodes);
				let class = move || highlight.with(|h| format!("kg-link{}", emphasis(h.is_active(), h.link_highlighted(&key))));
				view! { <line class=class x1=fmt(a.x) y1=fmt(a.y) x2=fmt(b.x) y2=fmt(b.y) /> }
			})
			.collect_view();

		let nodes = d
			.layout
			.nodes
			.iter()
			.enumerate()
			.map(|(idx, n)| {
				let id = n.id.clone();
				let clickable = if n.kind.is_actionable() { " is-clickable" } else { "" };
				let base = format!("kg-node kg-{}{clickable}", n.kind.css());
				let class = move || highlight.with(|h| format!("{base}{}", emphasis(h.is_active(), h.node_highlighted(&id))));
				let access = node_access(&n.kind, &n.label);
				let actionable = access.is_some();
				let (tabindex, role, aria_label) = match access {
					Some((t, r, l)) => (Some(t), Some(r), Some(l)),
					None => (None, None, None),
				};
				view! {
					<circle
						class=class
						cx=fmt(n.x)
						cy=fmt(n.y)
						r=fmt(n.radius)
						tabindex=tabindex
						role=role
						aria-label=aria_label
						on:mouseenter=move |ev: MouseEvent| {
							enter(idx, ev.current_target(), Some((ev.client_x() as f64, ev.client_y() as f64)))
						}
						on:mousemove=move |ev: MouseEvent| track(idx, ev)
						on:mouseleave=move |_| leave()
						on:focus=move |ev| enter(idx, ev.current_target(), None)
						on:blur=move |_| leave()
						on:click=move |_| activate(idx)
						on:keydown=move |ev: KeyboardEvent| {
							if actionable && is_activation_key(&ev.key()) {
								ev.prevent_default();
								activate(idx);
							}
						}
					/>
				}
			})
			.collect_view();

		let labels = d
			.labels
			.iter()
			.flatten()
			.map(|label| {
				let class = if label.forced { "kg-label forced" } else { "kg-label" };
				view! {
					<text
						class=class
						x=fmt(label.x)
						y=fmt(label.y)
						text-anchor=label.anchor.as_str()
						dominant-baseline=label.baseline.as_str()
					>
						{label.text.clone()}
					</text>
				}
			})
			.collect_view();

		view! {
			<g class="kg-links">{links}</g>
			<g class="kg-nodes">{nodes}</g>
			<g class="kg-labels">{labels}</g>
		}
	};

	view! {
		<div class="knowledge-graph" node_ref=container_ref style="position: relative;">
			{move || match diagram.get() {
				Some(d) => {
					view! {
						<svg viewBox=view_box.clone() font-size=font_size.clone() preserveAspectRatio="xMidYMid meet">
							{draw(d)}
						</svg>
					}
						.into_any()
				}
				None => view! { <div class="graph-placeholder">"Knowledge graph will appear here"</div> }.into_any(),
			}}
			{move || diagram.with(Option::is_some).then(legend)}
			<GraphTooltip content=tooltip_content position=tooltip_pos node_ref=tooltip_ref />
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_sources_and_entities_take_focus() {
		let source = RadialKind::Source { filename: "report.pdf".into() };
		let (tabindex, role, label) = node_access(&source, "report").unwrap();
		assert_eq!((tabindex, role), ("0", "button"));
		assert_eq!(label, "Source: report");

		let entity = RadialKind::Entity { name: "Acme Corp".into() };
		assert_eq!(node_access(&entity, "Acme Corp").unwrap().2, "Entity: Acme Corp");
		assert_eq!(node_access(&RadialKind::Query, "Query"), None);
	}

	#[test]
	fn enter_and_space_activate() {
		assert!(is_activation_key("Enter"));
		assert!(is_activation_key(" "));
		assert!(!is_activation_key("Tab"));
		assert!(!is_activation_key("Escape"));
	}

	#[test]
	fn legend_lists_every_kind_once() {
		let kinds = RadialKind::legend();
		let names: Vec<_> = kinds.iter().map(RadialKind::display_name).collect();
		assert_eq!(names, ["Query", "Source", "Entity"]);
		let classes: Vec<_> = kinds.iter().map(RadialKind::css).collect();
		assert_eq!(classes, ["query", "source", "entity"]);
		assert!(!kinds[0].is_actionable());
		assert!(kinds[1..].iter().all(RadialKind::is_actionable));
	}

	#[test]
	fn emphasis_only_applies_while_active() {
		assert_eq!(emphasis(false, true), "");
		assert_eq!(emphasis(true, true), " highlighted");
		assert_eq!(emphasis(true, false), " dimmed");
	}
}
