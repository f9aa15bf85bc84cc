use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent, WheelEvent, Window};

use super::explorer::GraphStatus;
use super::render;
use super::state::ForceGraphState;
use super::types::EntityNode;
use super::types::GraphData;
use crate::components::measure::{CanvasTextMeasure, EstimatedTextMeasure, TextMeasure};
use crate::components::tooltip::{Anchor, GraphTooltip, PlacementHint, TooltipContent, place_tooltip};
use crate::config::GraphConfig;

type Shared<T> = Rc<RefCell<T>>;

/// Everything one mounted canvas owns: its simulation state, the animation
/// frame callback and the window listeners it registered.
#[derive(Default)]
pub struct GraphRuntime {
	state: Shared<Option<ForceGraphState>>,
	measure: Option<Rc<dyn TextMeasure>>,
	frame: Shared<Option<Closure<dyn FnMut()>>>,
	frame_id: Rc<Cell<Option<i32>>>,
	listeners: Vec<(&'static str, Closure<dyn FnMut()>)>,
	torn_down: Rc<Cell<bool>>,
}

impl GraphRuntime {
	fn is_mounted(&self) -> bool {
		self.state.borrow().is_some()
	}

	fn set_data(&self, data: GraphData) {
		let fallback = EstimatedTextMeasure::default();
		let measure: &dyn TextMeasure = match &self.measure {
			Some(m) => m.as_ref(),
			None => &fallback,
		};
		if let Some(s) = self.state.borrow_mut().as_mut() {
			s.set_data(data, measure);
		}
	}

	fn listen(&mut self, window: &Window, event: &'static str, callback: Closure<dyn FnMut()>) {
		if window
			.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
			.is_err()
		{
			warn!("could not register window {event} listener");
			return;
		}
		self.listeners.push((event, callback));
	}

	/// Cancel the pending animation frame and remove every window listener.
	/// Safe to call more than once.
	pub fn teardown(&mut self) {
		if self.torn_down.replace(true) {
			return;
		}
		if let Some(window) = web_sys::window() {
			if let Some(id) = self.frame_id.take() {
				let _ = window.cancel_animation_frame(id);
			}
			for (event, callback) in self.listeners.drain(..) {
				let _ = window.remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
			}
		}
		// breaks the frame closure's reference to itself
		self.frame.borrow_mut().take();
		self.state.borrow_mut().take();
		info!("force graph torn down");
	}
}

fn request_frame(frame: &Shared<Option<Closure<dyn FnMut()>>>, frame_id: &Cell<Option<i32>>) {
	let Some(window) = web_sys::window() else {
		return;
	};
	if let Some(cb) = frame.borrow().as_ref() {
		frame_id.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
	}
}

fn container_size(canvas: &HtmlCanvasElement, fullscreen: bool, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
	if fullscreen {
		if let Some(window) = web_sys::window() {
			let w = window.inner_width().ok().and_then(|v| v.as_f64());
			let h = window.inner_height().ok().and_then(|v| v.as_f64());
			return (w.unwrap_or(800.0), h.unwrap_or(600.0));
		}
	}
	let parent = canvas.parent_element();
	(
		width.unwrap_or_else(|| parent.as_ref().map(|p| p.client_width() as f64).unwrap_or(800.0)),
		height.unwrap_or_else(|| parent.as_ref().map(|p| p.client_height() as f64).unwrap_or(600.0)),
	)
}

fn local_point(canvas: &HtmlCanvasElement, client_x: f64, client_y: f64) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(client_x - rect.left(), client_y - rect.top())
}

/// Interactive force-directed entity graph drawn on a canvas.
#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphData>,
	/// Placeholder state; the canvas is hidden behind it unless `Ready`.
	#[prop(optional, into)]
	status: Option<Signal<GraphStatus>>,
	#[prop(optional)] config: Option<GraphConfig>,
	/// Fired with the clicked entity, on selecting and on deselecting it.
	#[prop(optional, into)]
	on_entity_activated: Option<Callback<EntityNode>>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let config = config.unwrap_or_default();
	let tooltip_config = config.tooltip.clone();
	let status = status.unwrap_or_else(|| Signal::derive(|| GraphStatus::Ready));
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let tooltip_ref = NodeRef::<leptos::html::Div>::new();
	let tooltip_content = RwSignal::new(None::<TooltipContent>);
	let tooltip_pos = RwSignal::new((0.0, 0.0));

	let runtime: Shared<GraphRuntime> = Rc::new(RefCell::new(GraphRuntime::default()));
	let handle = StoredValue::new_local(runtime.clone());
	on_cleanup(move || {
		let _ = handle.try_with_value(|rt| rt.borrow_mut().teardown());
	});

	let (runtime_mount, config_mount) = (runtime.clone(), config.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let mut rt = runtime_mount.borrow_mut();
		if rt.is_mounted() || rt.torn_down.get() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			warn!("no window; force graph not mounted");
			return;
		};
		let ctx = match canvas.get_context("2d") {
			Ok(Some(obj)) => match obj.dyn_into::<CanvasRenderingContext2d>() {
				Ok(ctx) => ctx,
				Err(_) => {
					warn!("canvas context is not 2d");
					return;
				}
			},
			_ => {
				warn!("2d canvas context unavailable");
				return;
			}
		};

		let (w, h) = container_size(&canvas, fullscreen, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		*rt.state.borrow_mut() = Some(ForceGraphState::new(config_mount.clone(), w, h));
		rt.measure = Some(Rc::new(CanvasTextMeasure::new(ctx.clone(), "sans-serif")));
		rt.set_data(data.get_untracked());
		info!("force graph mounted at {w}x{h}");

		let (state_resize, canvas_resize) = (rt.state.clone(), canvas.clone());
		rt.listen(
			&window,
			"resize",
			Closure::new(move || {
				let (nw, nh) = container_size(&canvas_resize, fullscreen, width, height);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(s) = state_resize.borrow_mut().as_mut() {
					s.resize(nw, nh);
				}
			}),
		);

		// releases outside the canvas still end a drag or pan
		let state_up = rt.state.clone();
		rt.listen(
			&window,
			"mouseup",
			Closure::new(move || {
				if let Some(s) = state_up.borrow_mut().as_mut() {
					s.end_drag();
					s.end_pan();
				}
			}),
		);

		let (state_anim, frame_inner, frame_id_inner, torn_down) = (
			rt.state.clone(),
			rt.frame.clone(),
			rt.frame_id.clone(),
			rt.torn_down.clone(),
		);
		*rt.frame.borrow_mut() = Some(Closure::new(move || {
			if torn_down.get() {
				return;
			}
			if let Some(s) = state_anim.borrow_mut().as_mut() {
				if s.tick(js_sys::Date::now()) {
					render::render(s, &ctx);
				}
			}
			request_frame(&frame_inner, &frame_id_inner);
		}));
		request_frame(&rt.frame, &rt.frame_id);
	});

	let runtime_data = runtime.clone();
	Effect::new(move |_| {
		let next = data.get();
		let rt = runtime_data.borrow();
		if rt.is_mounted() {
			debug!("graph data changed: {} nodes", next.nodes.len());
			rt.set_data(next);
		}
	});

	let state = runtime.borrow().state.clone();

	let show_tooltip = {
		let state = state.clone();
		move |x: f64, y: f64| {
			let guard = state.borrow();
			let Some(s) = guard.as_ref() else {
				return;
			};
			let hovered = s.highlight.hover_node().map(str::to_string);
			let Some(id) = hovered else {
				tooltip_content.set(None);
				return;
			};
			let next = s.tooltip_content(&id);
			if tooltip_content.with_untracked(|c| c != &next) {
				tooltip_content.set(next);
			}
			let size = tooltip_ref
				.get_untracked()
				.map(|el| (el.offset_width() as f64, el.offset_height() as f64))
				.unwrap_or((160.0, 80.0));
			let anchor = s
				.layout
				.node_index(&id)
				.and_then(|idx| s.node_screen_rect(idx))
				.map_or(Anchor::Pointer(x, y), Anchor::Rect);
			let placed = place_tooltip(anchor, size, (s.width, s.height), PlacementHint::None, &tooltip_config);
			tooltip_pos.set((placed.left, placed.top));
		}
	};

	let pointer_down = {
		let state = state.clone();
		move |x: f64, y: f64| {
			if let Some(s) = state.borrow_mut().as_mut() {
				match s.node_at_position(x, y) {
					Some(idx) => s.begin_drag(idx, x, y),
					None => s.begin_pan(x, y),
				}
			}
		}
	};

	let pointer_move = {
		let (state, show_tooltip) = (state.clone(), show_tooltip.clone());
		move |x: f64, y: f64| {
			{
				let mut guard = state.borrow_mut();
				let Some(s) = guard.as_mut() else {
					return;
				};
				if s.is_dragging() {
					s.drag_to(x, y);
				} else if s.pan.active {
					s.pan_to(x, y);
				} else {
					let hovered = s.node_at_position(x, y);
					let current = s.highlight.hover_node().and_then(|id| s.layout.node_index(id));
					if hovered != current {
						s.hover(hovered);
					}
				}
			}
			show_tooltip(x, y);
		}
	};

	let pointer_up = {
		let state = state.clone();
		move || {
			let activated = {
				let mut guard = state.borrow_mut();
				let Some(s) = guard.as_mut() else {
					return;
				};
				let outcome = if let Some(idx) = s.end_drag() {
					s.click(Some(idx))
				} else if s.end_pan() {
					s.click(None)
				} else {
					None
				};
				outcome.and_then(|o| s.clicked_node(&o).cloned())
			};
			if let (Some(node), Some(cb)) = (activated, on_entity_activated) {
				cb.run(node);
			}
		}
	};

	let on_mousedown = {
		let pointer_down = pointer_down.clone();
		move |ev: MouseEvent| {
			let Some(canvas) = canvas_ref.get_untracked() else {
				return;
			};
			let (x, y) = local_point(&canvas, ev.client_x() as f64, ev.client_y() as f64);
			pointer_down(x, y);
		}
	};

	let on_mousemove = {
		let pointer_move = pointer_move.clone();
		move |ev: MouseEvent| {
			let Some(canvas) = canvas_ref.get_untracked() else {
				return;
			};
			let (x, y) = local_point(&canvas, ev.client_x() as f64, ev.client_y() as f64);
			pointer_move(x, y);
		}
	};

	let on_mouseup = {
		let pointer_up = pointer_up.clone();
		move |_: MouseEvent| pointer_up()
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(s) = state_ml.borrow_mut().as_mut() {
			if !s.is_dragging() {
				s.hover(None);
			}
		}
		tooltip_content.set(None);
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let (x, y) = local_point(&canvas, ev.client_x() as f64, ev.client_y() as f64);
		if let Some(s) = state_wh.borrow_mut().as_mut() {
			s.zoom_at(x, y, ev.delta_y());
		}
	};

	let state_kd = state.clone();
	let on_keydown = move |ev: KeyboardEvent| {
		if ev.key() == "Escape" {
			if let Some(s) = state_kd.borrow_mut().as_mut() {
				s.click(None);
			}
		}
	};

	let touch_point = move |ev: &TouchEvent| {
		let touch = ev.touches().get(0)?;
		let canvas = canvas_ref.get_untracked()?;
		Some(local_point(&canvas, touch.client_x() as f64, touch.client_y() as f64))
	};
	let on_touchstart = move |ev: TouchEvent| {
		if let Some((x, y)) = touch_point(&ev) {
			pointer_down(x, y);
		}
	};
	let on_touchmove = move |ev: TouchEvent| {
		ev.prevent_default();
		if let Some((x, y)) = touch_point(&ev) {
			pointer_move(x, y);
		}
	};
	let on_touchend = move |_: TouchEvent| pointer_up();

	view! {
		<div class="force-graph" style="position: relative; width: 100%; height: 100%;">
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				tabindex="0"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				on:keydown=on_keydown
				on:touchstart=on_touchstart
				on:touchmove=on_touchmove
				on:touchend=on_touchend
				style=move || {
					let display = if status.with(|s| *s == GraphStatus::Ready) { "block" } else { "none" };
					format!("display: {display}; cursor: grab;")
				}
			/>
			<GraphTooltip content=tooltip_content position=tooltip_pos node_ref=tooltip_ref />
			{move || {
				status
					.get()
					.message()
					.map(|message| {
						let class = match status.get() {
							GraphStatus::Error(_) => "graph-placeholder graph-error",
							_ => "graph-placeholder",
						};
						view! { <div class=class>{message}</div> }
					})
			}}
		</div>
	}
}
