use std::fmt;

/// Canonical entity type. Raw strings pass through [`EntityType::canonical`]
/// once at ingestion; nothing downstream compares raw type strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
	Person,
	Organization,
	Location,
	Date,
	Reference,
	Technical,
	#[default]
	Unknown,
}

impl EntityType {
	pub const ALL: [EntityType; 7] = [
		EntityType::Person,
		EntityType::Organization,
		EntityType::Location,
		EntityType::Date,
		EntityType::Reference,
		EntityType::Technical,
		EntityType::Unknown,
	];

	/// Map any raw type tag onto its canonical type.
	///
	/// `TECHNICAL` and `TECHNOLOGY` (and `TECH`) are the same type.
	pub fn canonical(raw: &str) -> Self {
		match raw.trim().to_ascii_uppercase().as_str() {
			"PERSON" | "PEOPLE" | "PER" => EntityType::Person,
			"ORGANIZATION" | "ORGANISATION" | "ORG" => EntityType::Organization,
			"LOCATION" | "PLACE" | "GPE" | "LOC" => EntityType::Location,
			"DATE" | "TIME" => EntityType::Date,
			"REFERENCE" | "DOCUMENT" | "CITATION" => EntityType::Reference,
			"TECHNICAL" | "TECHNOLOGY" | "TECH" => EntityType::Technical,
			_ => EntityType::Unknown,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			EntityType::Person => "PERSON",
			EntityType::Organization => "ORGANIZATION",
			EntityType::Location => "LOCATION",
			EntityType::Date => "DATE",
			EntityType::Reference => "REFERENCE",
			EntityType::Technical => "TECHNICAL",
			EntityType::Unknown => "UNKNOWN",
		}
	}

	pub fn display_name(self) -> &'static str {
		match self {
			EntityType::Person => "Person",
			EntityType::Organization => "Organization",
			EntityType::Location => "Location",
			EntityType::Date => "Date",
			EntityType::Reference => "Reference",
			EntityType::Technical => "Technical",
			EntityType::Unknown => "Entity",
		}
	}

	pub fn color(self) -> &'static str {
		match self {
			EntityType::Person => "#4e9af1",
			EntityType::Organization => "#a370f7",
			EntityType::Location => "#2fbf71",
			EntityType::Date => "#f2a93b",
			EntityType::Reference => "#8c9bab",
			EntityType::Technical => "#18b6c9",
			EntityType::Unknown => "#7f7f7f",
		}
	}

	/// Single glyph drawn inside the node.
	pub fn icon(self) -> &'static str {
		match self {
			EntityType::Person => "P",
			EntityType::Organization => "O",
			EntityType::Location => "L",
			EntityType::Date => "D",
			EntityType::Reference => "R",
			EntityType::Technical => "T",
			EntityType::Unknown => "?",
		}
	}
}

impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A normalised entity, independent of where it was loaded from.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityNode {
	pub id: String,
	pub label: String,
	pub kind: EntityType,
	/// Reference or mention count, never below 1.
	pub weight: u32,
	pub source_doc: Option<String>,
	pub description: Option<String>,
}

impl EntityNode {
	pub fn new(id: impl Into<String>, label: impl Into<String>, kind: EntityType, weight: u32) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			kind,
			weight: weight.max(1),
			source_doc: None,
			description: None,
		}
	}

	pub fn color(&self) -> &'static str {
		self.kind.color()
	}
}

/// An n-ary relationship record.
#[derive(Clone, Debug, PartialEq)]
pub struct Hyperedge {
	pub id: String,
	pub node_ids: Vec<String>,
	pub relation: Option<String>,
}

impl Hyperedge {
	pub fn new<I, S>(id: impl Into<String>, node_ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			id: id.into(),
			node_ids: node_ids.into_iter().map(Into::into).collect(),
			relation: None,
		}
	}

	pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
		self.relation = Some(relation.into());
		self
	}
}

/// A pairwise link derived from a hyperedge.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
	pub source: String,
	pub target: String,
	pub edge_id: Option<String>,
	pub relation: Option<String>,
}

impl GraphLink {
	/// Order-independent identity of the endpoint pair.
	pub fn key(&self) -> String {
		pair_key(&self.source, &self.target)
	}

	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}

	/// The endpoint opposite `id`, if `id` is an endpoint.
	pub fn other(&self, id: &str) -> Option<&str> {
		if self.source == id {
			Some(&self.target)
		} else if self.target == id {
			Some(&self.source)
		} else {
			None
		}
	}
}

pub fn pair_key(a: &str, b: &str) -> String {
	if a <= b {
		format!("{a}|{b}")
	} else {
		format!("{b}|{a}")
	}
}

/// What the canvas draws: filtered nodes and their derived links.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	pub nodes: Vec<EntityNode>,
	pub links: Vec<GraphLink>,
}

impl GraphData {
	pub fn node(&self, id: &str) -> Option<&EntityNode> {
		self.nodes.iter().find(|n| n.id == id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn technical_aliases_share_a_type() {
		assert_eq!(EntityType::canonical("TECHNOLOGY"), EntityType::Technical);
		assert_eq!(EntityType::canonical("technical"), EntityType::Technical);
		assert_eq!(EntityType::canonical(" Tech "), EntityType::Technical);
	}

	#[test]
	fn unknown_types_fall_back_to_neutral() {
		let kind = EntityType::canonical("acronym");
		assert_eq!(kind, EntityType::Unknown);
		assert_eq!(kind.color(), "#7f7f7f");
		assert_eq!(kind.icon(), "?");
	}

	#[test]
	fn pair_key_is_order_independent() {
		assert_eq!(pair_key("b", "a"), pair_key("a", "b"));
		let link = GraphLink {
			source: "x".into(),
			target: "y".into(),
			edge_id: None,
			relation: None,
		};
		assert_eq!(link.other("x"), Some("y"));
		assert_eq!(link.other("z"), None);
	}

	#[test]
	fn weight_never_drops_below_one() {
		assert_eq!(EntityNode::new("a", "A", EntityType::Person, 0).weight, 1);
	}
}
