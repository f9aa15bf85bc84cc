use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen_futures::spawn_local;

use crate::api::SectorGraphClient;
use crate::components::force_graph::model::ExtractedEntity;
use crate::components::force_graph::{EntityNode, EntityType, ForceGraphCanvas, GraphExplorer, ViewMode};
use crate::components::knowledge_graph::{KnowledgeGraph, QueryMeta, SourceRef};
use crate::config::GraphConfig;
use crate::error::GraphError;

const SECTOR: &str = "enterprise";

const SAMPLE_RESPONSE: &str = "Acme Corp appointed Alice Example as chief risk officer in Berlin. \
	Alice Example reports to Bob Stone. The Risk Register lists Kubernetes as a critical platform for Acme Corp. \
	Bob Stone signed the 2024 audit plan with Acme Corp.";

fn sample_entities() -> Vec<ExtractedEntity> {
	vec![
		ExtractedEntity::new("Acme Corp", "organization"),
		ExtractedEntity::new("Alice Example", "person"),
		ExtractedEntity::new("Bob Stone", "person"),
		ExtractedEntity::new("Berlin", "location"),
		ExtractedEntity::new("Kubernetes", "technology"),
		ExtractedEntity::new("Risk Register", "document"),
		ExtractedEntity::new("2024", "date"),
	]
}

fn sample_sources() -> Vec<SourceRef> {
	let mut report = SourceRef::new("annual-report-2023.pdf");
	report.similarity = Some(0.91);
	report.chunk_count = Some(12);
	report.last_updated = Some("2024-02-11T09:30:00Z".into());
	let mut register = SourceRef::new("[Risk Register](risk-register.md)");
	register.similarity = Some(0.84);
	vec![report, register, SourceRef::new("board-minutes-q4.txt")]
}

fn sample_meta() -> QueryMeta {
	QueryMeta {
		query_text: "Who manages risk at Acme Corp?".into(),
		sector: Some(SECTOR.to_uppercase()),
		retrieval_mode: Some("hybrid".into()),
		routing_decision: Some("RAG".into()),
		top_k: Some(5),
		documents_retrieved: Some(3),
		..QueryMeta::default()
	}
}

/// Fetch the sector graph into the explorer, dropping results that arrive
/// after the view was cleared or reloaded.
fn load_sector(explorer: RwSignal<GraphExplorer>) {
	let Some(ticket) = explorer.try_update(|e| e.begin_load(ViewMode::Sector)) else {
		return;
	};
	let limit = explorer.with_untracked(GraphExplorer::node_limit);
	spawn_local(async move {
		let client = SectorGraphClient::new("");
		let result = async {
			let stats = client.fetch_stats(SECTOR).await?;
			if !stats.enabled {
				return Err(GraphError::Disabled);
			}
			let nodes = client.fetch_nodes(SECTOR, limit).await?;
			let edges = client.fetch_edges(SECTOR, limit * 2).await?;
			Ok::<_, GraphError>((nodes, edges))
		}
		.await;
		match result {
			Ok((nodes, edges)) => explorer.update(|e| {
				e.apply_load(ticket, &nodes, &edges);
			}),
			Err(err) => explorer.update(|e| {
				e.fail_load(ticket, &err);
			}),
		}
	});
}

/// Pull a node's neighbourhood into the sector view, unless the view is
/// cleared or reloaded before the response lands.
fn expand_neighbors(explorer: RwSignal<GraphExplorer>, node_id: String) {
	let ticket = explorer.with_untracked(|e| e.snapshot(ViewMode::Sector));
	spawn_local(async move {
		match SectorGraphClient::new("").fetch_neighbors(&node_id, SECTOR).await {
			Ok(hood) => explorer.update(|e| {
				let added = e.merge_neighbors(ticket, &hood);
				info!("expanded {node_id}: {added} new entities");
			}),
			Err(err) => warn!("neighbour fetch for {node_id} failed: {err}"),
		}
	});
}

fn type_toggles(explorer: RwSignal<GraphExplorer>) -> impl IntoView {
	EntityType::ALL
		.into_iter()
		.map(|kind| {
			let checked = move || explorer.with(|e| e.types().allows(kind));
			view! {
				<label class="type-toggle" style:color=kind.color()>
					<input type="checkbox" prop:checked=checked on:change=move |_| explorer.update(|e| e.toggle_type(kind)) />
					{kind.display_name()}
				</label>
			}
		})
		.collect_view()
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let config = GraphConfig::default();
	let explorer = RwSignal::new(GraphExplorer::new(config.default_node_limit));
	explorer.update(|e| e.load_context(&sample_entities(), SAMPLE_RESPONSE));

	let outcome = Memo::new(move |_| explorer.with(GraphExplorer::visible));
	let data = Signal::derive(move || outcome.with(|o| o.data.clone()));
	let status = Signal::derive(move || outcome.with(|o| o.status.clone()));
	let mode = Signal::derive(move || explorer.with(GraphExplorer::mode));

	let show_radial = RwSignal::new(false);
	let follow_up = RwSignal::new(None::<String>);

	let switch_view = move |next: ViewMode| {
		explorer.update(|e| e.set_view(next));
		if next == ViewMode::Sector && !explorer.with_untracked(|e| e.view(ViewMode::Sector).is_populated()) {
			load_sector(explorer);
		}
	};

	let on_entity = Callback::new(move |name: String| {
		follow_up.set(Some(format!("Tell me more about \"{name}\"")));
	});
	let on_node = Callback::new(move |node: EntityNode| {
		if mode.get_untracked() == ViewMode::Sector {
			expand_neighbors(explorer, node.id.clone());
		}
		on_entity.run(node.label);
	});
	let on_source = Callback::new(move |filename: String| {
		info!("open source document {filename}");
	});

	let radial_config = config.clone();

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="graph-page">
				<nav class="graph-tabs">
					<button class:active=move || !show_radial.get() on:click=move |_| show_radial.set(false)>
						"Entity graph"
					</button>
					<button class:active=move || show_radial.get() on:click=move |_| show_radial.set(true)>
						"Knowledge graph"
					</button>
				</nav>

				// unmounting the canvas tears its simulation down
				<Show when=move || !show_radial.get()>
					<div class="graph-panel" style="display: flex;">
						<div class="graph-controls">
							<button
								class:active=move || mode.get() == ViewMode::Context
								on:click=move |_| switch_view(ViewMode::Context)
							>
								"Context"
							</button>
							<button
								class:active=move || mode.get() == ViewMode::Sector
								on:click=move |_| switch_view(ViewMode::Sector)
							>
								"Sector"
							</button>
							<input
								type="search"
								placeholder="Filter entities"
								on:input=move |ev| explorer.update(|e| e.set_search_filter(&event_target_value(&ev)))
							/>
							<input
								type="number"
								min="1"
								prop:value=move || explorer.with(|e| e.node_limit().to_string())
								on:change=move |ev| {
									if let Ok(limit) = event_target_value(&ev).parse::<usize>() {
										explorer.update(|e| e.set_node_limit(limit));
									}
								}
							/>
							<span class="graph-count">
								{move || outcome.with(|o| format!("{} of {} entities", o.node_count(), o.total))}
							</span>
						</div>
						<div class="type-toggles">{type_toggles(explorer)}</div>
						<div class="graph-canvas-host">
							<ForceGraphCanvas data=data status=status config=config.clone() on_entity_activated=on_node />
						</div>
					</div>
				</Show>

				<div class="graph-panel" style:display=move || if show_radial.get() { "flex" } else { "none" }>
					<KnowledgeGraph
						sources=Signal::derive(sample_sources)
						entities=Signal::derive(sample_entities)
						response=Signal::derive(|| SAMPLE_RESPONSE.to_string())
						meta=Signal::derive(sample_meta)
						config=radial_config
						on_entity_activated=on_entity
						on_source_activated=on_source
					/>
				</div>

				{move || follow_up.get().map(|q| view! { <p class="graph-follow-up">{q}</p> })}
			</div>
		</ErrorBoundary>
	}
}
