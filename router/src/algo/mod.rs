//! Graph routers: the `GraphRouter` seam and the default negotiated router.

pub mod pathfinder;
pub mod search;

use crate::conflicts::{ConflictSet, ReservedNodes};
use crate::error::RoutingError;
use crate::graph::{GridEdge, GridNode, RoutingGraph};
use crate::virtual_terminals::Signals;
use petgraph::graphmap::UnGraphMap;
use std::collections::{BTreeMap, BTreeSet};
use stdcell_common::db::indices::NetId;

/// Subgraph of the routing graph connecting all signals of one net.
#[derive(Clone, Debug, Default)]
pub struct RoutingTree {
    graph: UnGraphMap<GridNode, GridEdge>,
}

impl RoutingTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, n: GridNode) {
        self.graph.add_node(n);
    }

    /// Adds the edges of `path` with their data from `graph`. Consecutive
    /// nodes must be adjacent in `graph`.
    pub fn add_path(&mut self, path: &[GridNode], graph: &RoutingGraph) {
        if let [single] = path {
            self.graph.add_node(*single);
        }
        for w in path.windows(2) {
            if let Some(e) = graph.edge_weight(w[0], w[1]) {
                self.graph.add_edge(w[0], w[1], *e);
            }
        }
    }

    pub fn contains(&self, n: GridNode) -> bool {
        self.graph.contains_node(n)
    }

    pub fn nodes(&self) -> impl Iterator<Item = GridNode> + '_ {
        self.graph.nodes()
    }

    pub fn real_nodes(&self) -> impl Iterator<Item = GridNode> + '_ {
        self.graph.nodes().filter(|n| !n.is_virtual())
    }

    pub fn edges(&self) -> impl Iterator<Item = (GridNode, GridNode, &GridEdge)> + '_ {
        self.graph.all_edges()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn graph(&self) -> &UnGraphMap<GridNode, GridEdge> {
        &self.graph
    }
}

#[derive(Debug, Default)]
pub struct RouterOutput {
    pub trees: BTreeMap<NetId, RoutingTree>,
    /// Nets the router could not connect without violating exclusivity.
    pub failed: BTreeSet<NetId>,
}

/// Computes one routing tree per net.
///
/// A returned tree spans all signals of its net using only edges of
/// `graph` and never enters a node reserved for another net. Using
/// conflicting nodes for two nets is penalized, not forbidden.
pub trait GraphRouter: Sync {
    fn route(
        &self,
        graph: &RoutingGraph,
        signals: &Signals,
        reserved: &ReservedNodes,
        node_conflict: &ConflictSet,
        is_virtual_node: &dyn Fn(&GridNode) -> bool,
    ) -> Result<RouterOutput, RoutingError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use stdcell_common::db::indices::LayerId;
    use stdcell_common::db::tech::Orientation;

    #[test]
    fn tree_copies_edge_data_from_the_graph() {
        let l = LayerId(0);
        let (a, b, c) = (
            GridNode::real(l, 0, 0),
            GridNode::real(l, 10, 0),
            GridNode::real(l, 20, 0),
        );
        let mut g = RoutingGraph::new();
        g.add_edge(a, b, GridEdge::wire(l, Orientation::Horizontal, 3.0));
        g.add_edge(b, c, GridEdge::wire(l, Orientation::Horizontal, 4.0));

        let mut tree = RoutingTree::new();
        tree.add_path(&[a, b, c], &g);
        assert_eq!(tree.node_count(), 3);
        let total: f64 = tree.edges().map(|(_, _, e)| e.weight).sum();
        assert_eq!(total, 7.0);

        let mut single = RoutingTree::new();
        single.add_path(&[a], &g);
        assert!(single.contains(a));
    }
}
