//! Client for the sector-wide entity graph store.
//!
//! Uses browser `fetch` through web-sys; bodies are decoded with serde_json so
//! the wire types can be exercised natively in tests.

use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::error::{GraphError, Result};

/// Cheap existence probe returned before the full graph is loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
	pub enabled: bool,
	pub node_count: u64,
	pub edge_count: u64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphStatsResponse {
	pub total_nodes: u64,
	pub total_edges: u64,
	pub entity_count: u64,
	pub chunk_count: u64,
	pub enabled: bool,
	pub error: Option<String>,
}

/// Entity node as stored by the backend.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityNodeDto {
	pub id: String,
	pub value: String,
	/// Entity category. The record's `type` field is the node kind
	/// (ENTITY or CHUNK) and is not read.
	pub entity_type: Option<String>,
	pub reference_count: i64,
	pub source_doc: Option<String>,
}

/// Hyperedge as stored by the backend.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeDto {
	pub id: String,
	pub node_ids: Vec<String>,
	pub relation: Option<String>,
	pub weight: f64,
	pub source_doc: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EntityListResponse {
	pub entities: Vec<EntityNodeDto>,
	pub total: usize,
	pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EdgeListResponse {
	pub edges: Vec<EdgeDto>,
	pub total: usize,
	pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct NeighborResponse {
	pub neighbors: Vec<EntityNodeDto>,
	pub edges: Vec<EdgeDto>,
	pub error: Option<String>,
}

/// A single node's neighbourhood, used for incremental expansion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Neighborhood {
	pub nodes: Vec<EntityNodeDto>,
	pub edges: Vec<EdgeDto>,
}

fn check_error(error: Option<String>) -> Result<()> {
	match error {
		Some(message) if message.contains("disabled") => Err(GraphError::Disabled),
		Some(message) if !message.trim().is_empty() => Err(GraphError::Backend(message)),
		_ => Ok(()),
	}
}

impl GraphStatsResponse {
	pub fn into_stats(self) -> Result<GraphStats> {
		check_error(self.error)?;
		Ok(GraphStats {
			enabled: self.enabled,
			node_count: self.entity_count,
			edge_count: self.total_edges,
		})
	}
}

impl EntityListResponse {
	pub fn into_nodes(self) -> Result<Vec<EntityNodeDto>> {
		check_error(self.error)?;
		Ok(self.entities)
	}
}

impl EdgeListResponse {
	pub fn into_edges(self) -> Result<Vec<EdgeDto>> {
		check_error(self.error)?;
		Ok(self.edges)
	}
}

impl NeighborResponse {
	pub fn into_neighborhood(self) -> Result<Neighborhood> {
		check_error(self.error)?;
		Ok(Neighborhood {
			nodes: self.neighbors,
			edges: self.edges,
		})
	}
}

/// Thin request/response wrapper around the graph REST endpoints.
#[derive(Clone, Debug)]
pub struct SectorGraphClient {
	base_url: String,
}

impl SectorGraphClient {
	pub fn new(base_url: &str) -> Self {
		Self {
			base_url: base_url.trim_end_matches('/').to_string(),
		}
	}

	pub fn stats_url(&self, scope: &str) -> String {
		format!("{}/api/graph/stats?dept={}", self.base_url, encode(&scope.to_uppercase()))
	}

	pub fn nodes_url(&self, scope: &str, limit: usize) -> String {
		format!(
			"{}/api/graph/entities?dept={}&limit={limit}",
			self.base_url,
			encode(&scope.to_uppercase())
		)
	}

	pub fn edges_url(&self, scope: &str, limit: usize) -> String {
		format!(
			"{}/api/graph/edges?dept={}&limit={limit}",
			self.base_url,
			encode(&scope.to_uppercase())
		)
	}

	pub fn neighbors_url(&self, node_id: &str, scope: &str) -> String {
		format!(
			"{}/api/graph/neighbors?nodeId={}&dept={}",
			self.base_url,
			encode(node_id),
			encode(&scope.to_uppercase())
		)
	}

	pub async fn fetch_stats(&self, scope: &str) -> Result<GraphStats> {
		self.get::<GraphStatsResponse>(&self.stats_url(scope))
			.await?
			.into_stats()
	}

	pub async fn fetch_nodes(&self, scope: &str, limit: usize) -> Result<Vec<EntityNodeDto>> {
		self.get::<EntityListResponse>(&self.nodes_url(scope, limit))
			.await?
			.into_nodes()
	}

	pub async fn fetch_edges(&self, scope: &str, limit: usize) -> Result<Vec<EdgeDto>> {
		self.get::<EdgeListResponse>(&self.edges_url(scope, limit))
			.await?
			.into_edges()
	}

	pub async fn fetch_neighbors(&self, node_id: &str, scope: &str) -> Result<Neighborhood> {
		self.get::<NeighborResponse>(&self.neighbors_url(node_id, scope))
			.await?
			.into_neighborhood()
	}

	async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
		debug!("GET {url}");
		let opts = RequestInit::new();
		opts.set_method("GET");
		opts.set_mode(RequestMode::SameOrigin);

		let request = Request::new_with_str_and_init(url, &opts)
			.map_err(|e| GraphError::Request(format!("{e:?}")))?;
		let window = web_sys::window().ok_or_else(|| GraphError::Request("no window".into()))?;
		let resp_value = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(|e| GraphError::Request(format!("{e:?}")))?;
		let resp: Response = resp_value
			.dyn_into()
			.map_err(|_| GraphError::Request("response is not a Response".into()))?;

		if !resp.ok() {
			warn!("GET {url} failed with HTTP {}", resp.status());
			return Err(GraphError::Http(resp.status()));
		}

		let text = JsFuture::from(resp.text().map_err(|e| GraphError::Request(format!("{e:?}")))?)
			.await
			.map_err(|e| GraphError::Request(format!("{e:?}")))?
			.as_string()
			.unwrap_or_default();
		Ok(serde_json::from_str(&text)?)
	}
}

fn encode(value: &str) -> String {
	urlencoding::encode(value).into_owned()
}
