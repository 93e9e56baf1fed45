use crate::graph::{GridEdge, GridNode, RoutingGraph};
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

/// Fixed point factor for edge and node costs.
pub const COST_SCALE: f64 = 100.0;

#[inline]
pub fn scaled(cost: f64) -> i64 {
    (cost * COST_SCALE).round() as i64
}

/// Multi-source Dijkstra from `sources` to the cheapest node of `targets`.
///
/// `step_cost(u, v, edge)` returns the cost of moving from `u` to `v`, or
/// `None` if `v` must not be entered. Nodes for which `expandable` is false
/// are never expanded; they can still be reached as targets.
/// Returns the path from a source to the reached target, both included.
pub fn shortest_path<C, E>(
    graph: &RoutingGraph,
    sources: impl IntoIterator<Item = GridNode>,
    targets: &HashSet<GridNode>,
    mut step_cost: C,
    expandable: E,
) -> Option<Vec<GridNode>>
where
    C: FnMut(GridNode, GridNode, &GridEdge) -> Option<i64>,
    E: Fn(GridNode) -> bool,
{
    let mut dist: HashMap<GridNode, i64> = HashMap::new();
    let mut parent: HashMap<GridNode, GridNode> = HashMap::new();
    let mut queue: PriorityQueue<GridNode, Reverse<i64>> = PriorityQueue::new();

    for s in sources {
        dist.insert(s, 0);
        queue.push(s, Reverse(0));
    }

    while let Some((u, Reverse(d))) = queue.pop() {
        if targets.contains(&u) {
            return Some(reconstruct(u, &parent));
        }
        if !expandable(u) {
            continue;
        }
        for (_, v, e) in graph.edges(u) {
            let Some(c) = step_cost(u, v, e) else {
                continue;
            };
            let nd = d + c;
            if dist.get(&v).map_or(true, |&old| nd < old) {
                dist.insert(v, nd);
                parent.insert(v, u);
                queue.push_increase(v, Reverse(nd));
            }
        }
    }
    None
}

fn reconstruct(end: GridNode, parent: &HashMap<GridNode, GridNode>) -> Vec<GridNode> {
    let mut path = vec![end];
    let mut cur = end;
    while let Some(&p) = parent.get(&cur) {
        path.push(p);
        cur = p;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use stdcell_common::db::indices::{LayerId, NetId};
    use stdcell_common::db::tech::Orientation;

    fn wire(w: f64) -> GridEdge {
        GridEdge::wire(LayerId(0), Orientation::Horizontal, w)
    }

    fn n(x: i64) -> GridNode {
        GridNode::real(LayerId(0), x, 0)
    }

    fn plain(_: GridNode, _: GridNode, e: &GridEdge) -> Option<i64> {
        Some(scaled(e.weight))
    }

    #[test]
    fn finds_the_cheaper_of_two_routes() {
        let mut g = RoutingGraph::new();
        g.add_edge(n(0), n(1), wire(1.0));
        g.add_edge(n(1), n(3), wire(1.0));
        g.add_edge(n(0), n(2), wire(5.0));
        g.add_edge(n(2), n(3), wire(5.0));
        let path = shortest_path(&g, [n(0)], &HashSet::from([n(3)]), plain, |_| true).unwrap();
        assert_eq!(path, vec![n(0), n(1), n(3)]);
    }

    #[test]
    fn refused_nodes_force_a_detour() {
        let mut g = RoutingGraph::new();
        g.add_edge(n(0), n(1), wire(1.0));
        g.add_edge(n(1), n(3), wire(1.0));
        g.add_edge(n(0), n(2), wire(5.0));
        g.add_edge(n(2), n(3), wire(5.0));
        let path = shortest_path(
            &g,
            [n(0)],
            &HashSet::from([n(3)]),
            |u, v, e| (v != n(1)).then(|| plain(u, v, e)).flatten(),
            |_| true,
        )
        .unwrap();
        assert_eq!(path, vec![n(0), n(2), n(3)]);
    }

    #[test]
    fn unexpandable_nodes_are_dead_ends() {
        let hub = GridNode::Virtual { net: NetId(0), id: 0 };
        let mut g = RoutingGraph::new();
        g.add_edge(n(0), hub, wire(1.0));
        g.add_edge(hub, n(5), wire(1.0));
        let targets = HashSet::from([n(5)]);
        assert!(shortest_path(&g, [n(0)], &targets, plain, |v| !v.is_virtual()).is_none());
        assert!(shortest_path(&g, [n(0)], &targets, plain, |_| true).is_some());
    }

    #[test]
    fn source_inside_targets_is_a_single_node_path() {
        let g = RoutingGraph::new();
        let path = shortest_path(&g, [n(0)], &HashSet::from([n(0)]), plain, |_| true).unwrap();
        assert_eq!(path, vec![n(0)]);
    }
}
