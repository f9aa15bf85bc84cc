//! Error type shared by the graph client, configuration and components.

use thiserror::Error;

/// Anything that can go wrong between the backend graph store and the canvas.
#[derive(Debug, Error)]
pub enum GraphError {
	/// The browser refused to build or send the request.
	#[error("request failed: {0}")]
	Request(String),

	/// The backend answered with a non-success status.
	#[error("HTTP {0}")]
	Http(u16),

	/// The response body was not the JSON we expected.
	#[error("decode error: {0}")]
	Decode(#[from] serde_json::Error),

	/// The backend answered but reported an error of its own.
	#[error("{0}")]
	Backend(String),

	/// Graph memory is switched off for this deployment.
	#[error("entity graph is disabled")]
	Disabled,

	/// A configuration document could not be applied.
	#[error("invalid configuration: {0}")]
	Config(String),
}

impl GraphError {
	/// Short message for the inline error state shown in place of the graph.
	pub fn inline_message(&self) -> String {
		match self {
			GraphError::Disabled => "Entity graph is disabled for this deployment.".into(),
			GraphError::Http(status) => format!("Graph service unavailable (HTTP {status})."),
			other => format!("Could not load graph: {other}"),
		}
	}
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
