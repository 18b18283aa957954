//! Location graph construction and reachability.
//!
//! The world map is a directed graph: each [`Location`] carries an adjacency
//! list that is not required to be symmetric. Adjacency targets that are not
//! themselves valid location ids are dropped while building the graph rather
//! than treated as errors -- authored specs reject them at validation time,
//! but LLM-regenerated worlds occasionally carry dangling edges and movement
//! checks must stay total.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use fable_types::{Location, LocationId};

/// Directed adjacency map over valid location ids.
#[derive(Debug, Clone, Default)]
pub struct LocationGraph {
    edges: BTreeMap<LocationId, BTreeSet<LocationId>>,
}

impl LocationGraph {
    /// Build the graph from a location list, dropping dangling edges.
    pub fn build(locations: &[Location]) -> Self {
        let valid: BTreeSet<&LocationId> =
            locations.iter().map(|loc| &loc.location_id).collect();
        let mut edges = BTreeMap::new();
        for loc in locations {
            let targets: BTreeSet<LocationId> = loc
                .connected_to
                .iter()
                .filter(|target| valid.contains(target))
                .cloned()
                .collect();
            edges.insert(loc.location_id.clone(), targets);
        }
        Self { edges }
    }

    /// Whether the given id is a node in the graph.
    pub fn contains(&self, location_id: &LocationId) -> bool {
        self.edges.contains_key(location_id)
    }

    /// Direct neighbors of a node, empty when unknown.
    pub fn neighbors(&self, location_id: &LocationId) -> impl Iterator<Item = &LocationId> {
        self.edges
            .get(location_id)
            .into_iter()
            .flat_map(BTreeSet::iter)
    }

    /// Breadth-first reachability from `from` to `to`.
    ///
    /// A self-loop (`from == to`) is reachable iff the node exists; there is
    /// no requirement for an explicit self-edge.
    pub fn is_reachable(&self, from: &LocationId, to: &LocationId) -> bool {
        if !self.contains(from) {
            return false;
        }
        if from == to {
            return true;
        }

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(current) {
                if next == to {
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }
}
