use petgraph::algo::connected_components;
use petgraph::graphmap::UnGraphMap;
use stdcell_common::db::indices::{LayerId, NetId};
use stdcell_common::db::tech::Orientation;
use stdcell_common::geom::point::Point;

/// Node of the routing graph. Virtual nodes have no geometry and are never
/// subject to spacing rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GridNode {
    Real { layer: LayerId, pos: Point<i64> },
    /// Hub joining all nodes of one terminal of `net`.
    Virtual { net: NetId, id: u32 },
    /// Hub joining every free pin-layer node, one per I/O pin.
    VirtualPin { net: NetId, id: u32 },
}

impl GridNode {
    pub const fn real(layer: LayerId, x: i64, y: i64) -> Self {
        GridNode::Real {
            layer,
            pos: Point::new(x, y),
        }
    }

    pub fn is_virtual(&self) -> bool {
        !matches!(self, GridNode::Real { .. })
    }

    pub fn layer(&self) -> Option<LayerId> {
        match self {
            GridNode::Real { layer, .. } => Some(*layer),
            _ => None,
        }
    }

    pub fn pos(&self) -> Option<Point<i64>> {
        match self {
            GridNode::Real { pos, .. } => Some(*pos),
            _ => None,
        }
    }

    pub fn on_layer(&self, l: LayerId) -> bool {
        self.layer() == Some(l)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridEdge {
    pub weight: f64,
    /// `None` for via and virtual edges.
    pub orientation: Option<Orientation>,
    /// Wire layer, or the via layer for via edges. `None` for virtual edges.
    pub layer: Option<LayerId>,
    pub multi_via: u32,
}

impl GridEdge {
    pub fn wire(layer: LayerId, orientation: Orientation, weight: f64) -> Self {
        Self {
            weight,
            orientation: Some(orientation),
            layer: Some(layer),
            multi_via: 1,
        }
    }

    pub fn via(via_layer: LayerId, weight: f64, multi_via: u32) -> Self {
        Self {
            weight,
            orientation: None,
            layer: Some(via_layer),
            multi_via,
        }
    }

    pub fn virtual_link(weight: f64) -> Self {
        Self {
            weight,
            orientation: None,
            layer: None,
            multi_via: 1,
        }
    }
}

/// Undirected routing graph. Parallel edges between the same pair of nodes
/// collapse into one.
pub type RoutingGraph = UnGraphMap<GridNode, GridEdge>;

/// Number of connected components (0 for an empty graph).
pub fn component_count(graph: &RoutingGraph) -> usize {
    connected_components(graph)
}

pub fn is_connected(graph: &RoutingGraph) -> bool {
    component_count(graph) == 1
}

pub fn total_weight(graph: &RoutingGraph) -> f64 {
    graph.all_edges().map(|(_, _, e)| e.weight).sum()
}

/// Repeatedly removes real nodes of degree <= 1. Returns the number removed.
pub fn prune_dead_ends(graph: &mut RoutingGraph) -> usize {
    let mut removed = 0;
    let mut work: Vec<GridNode> = graph.nodes().filter(|n| !n.is_virtual()).collect();
    while let Some(n) = work.pop() {
        if !graph.contains_node(n) || graph.neighbors(n).count() > 1 {
            continue;
        }
        let neighbors: Vec<GridNode> = graph.neighbors(n).collect();
        graph.remove_node(n);
        removed += 1;
        work.extend(neighbors.into_iter().filter(|m| !m.is_virtual()));
    }
    removed
}

/// Removes nodes without any edge. Returns the number removed.
pub fn remove_isolated_nodes(graph: &mut RoutingGraph) -> usize {
    let isolated: Vec<GridNode> = graph
        .nodes()
        .filter(|&n| graph.neighbors(n).next().is_none())
        .collect();
    for &n in &isolated {
        graph.remove_node(n);
    }
    isolated.len()
}
