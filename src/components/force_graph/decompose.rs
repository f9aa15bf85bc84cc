//! Hyperedge → pairwise link decomposition.

use std::collections::HashSet;

use super::types::{GraphLink, Hyperedge};

/// Groups larger than this are drawn as a star around their first member.
pub const STAR_THRESHOLD: usize = 4;

/// Decompose `edges` over the nodes in `node_ids`.
///
/// Members missing from `node_ids` are dropped first; edges left with fewer
/// than two members vanish. Small groups become a full mesh, larger ones a
/// star from the first surviving member. The first link for an unordered
/// endpoint pair wins.
pub fn decompose<'a, I>(node_ids: &HashSet<&str>, edges: I) -> Vec<GraphLink>
where
	I: IntoIterator<Item = &'a Hyperedge>,
{
	let mut links = Vec::new();
	let mut seen = HashSet::new();

	for edge in edges {
		let mut members: Vec<&str> = Vec::with_capacity(edge.node_ids.len());
		for id in &edge.node_ids {
			let id = id.as_str();
			if node_ids.contains(id) && !members.contains(&id) {
				members.push(id);
			}
		}
		if members.len() < 2 {
			continue;
		}

		let mut push = |a: &str, b: &str| {
			let link = GraphLink {
				source: a.to_string(),
				target: b.to_string(),
				edge_id: Some(edge.id.clone()),
				relation: edge.relation.clone(),
			};
			if seen.insert(link.key()) {
				links.push(link);
			}
		};

		if members.len() > STAR_THRESHOLD {
			let hub = members[0];
			for other in &members[1..] {
				push(hub, *other);
			}
		} else {
			for (i, a) in members.iter().enumerate() {
				for b in &members[i + 1..] {
					push(*a, *b);
				}
			}
		}
	}

	links
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ids<'a>(list: &[&'a str]) -> HashSet<&'a str> {
		list.iter().copied().collect()
	}

	fn pairs(links: &[GraphLink]) -> Vec<(String, String)> {
		links.iter().map(|l| (l.source.clone(), l.target.clone())).collect()
	}

	#[test]
	fn four_members_make_a_full_mesh() {
		let edges = [Hyperedge::new("e1", ["a", "b", "c", "d"])];
		let links = decompose(&ids(&["a", "b", "c", "d"]), &edges);
		assert_eq!(links.len(), 6);
	}

	#[test]
	fn five_members_make_a_star_from_the_first() {
		let edges = [Hyperedge::new("e1", ["a", "b", "c", "d", "e"])];
		let links = decompose(&ids(&["a", "b", "c", "d", "e"]), &edges);
		assert_eq!(
			pairs(&links),
			vec![
				("a".into(), "b".into()),
				("a".into(), "c".into()),
				("a".into(), "d".into()),
				("a".into(), "e".into()),
			]
		);
		assert!(links.iter().all(|l| l.edge_id.as_deref() == Some("e1")));
	}

	#[test]
	fn unknown_members_are_dropped_before_counting() {
		// Five listed, four known: full mesh over the survivors.
		let edges = [Hyperedge::new("e1", ["a", "b", "ghost", "c", "d"])];
		let links = decompose(&ids(&["a", "b", "c", "d"]), &edges);
		assert_eq!(links.len(), 6);
		assert!(links.iter().all(|l| !l.touches("ghost")));
	}

	#[test]
	fn edges_with_one_survivor_vanish() {
		let edges = [Hyperedge::new("e1", ["a", "ghost"]), Hyperedge::new("e2", ["a"])];
		assert!(decompose(&ids(&["a"]), &edges).is_empty());
	}

	#[test]
	fn duplicate_pairs_collapse_first_wins() {
		let edges = [
			Hyperedge::new("e1", ["a", "b"]).with_relation("WORKS_AT"),
			Hyperedge::new("e2", ["b", "a"]),
			Hyperedge::new("e3", ["a", "b", "c"]),
		];
		let links = decompose(&ids(&["a", "b", "c"]), &edges);
		let keys: HashSet<String> = links.iter().map(GraphLink::key).collect();
		assert_eq!(keys.len(), links.len());
		assert_eq!(links.len(), 3);
		assert_eq!(links[0].edge_id.as_deref(), Some("e1"));
		assert_eq!(links[0].relation.as_deref(), Some("WORKS_AT"));
	}

	#[test]
	fn dedup_holds_across_many_overlapping_edges() {
		let all = ["a", "b", "c", "d", "e", "f", "g"];
		let mut edges = Vec::new();
		for (i, window) in all.windows(3).enumerate() {
			edges.push(Hyperedge::new(format!("w{i}"), window.iter().copied()));
		}
		edges.push(Hyperedge::new("big", all));
		edges.push(Hyperedge::new("rev", all.iter().rev().copied()));
		let links = decompose(&ids(&all), &edges);
		let keys: HashSet<String> = links.iter().map(GraphLink::key).collect();
		assert_eq!(keys.len(), links.len());
	}
}
