use crate::graph::{GridEdge, GridNode, RoutingGraph};

/// Returns a copy of `graph` where every inter-layer edge `a - b` is split
/// into `a - via - b` with a node on the via layer. Each half carries half
/// of the original weight.
pub fn insert(graph: &RoutingGraph) -> RoutingGraph {
    let mut out = graph.clone();
    let via_edges: Vec<(GridNode, GridNode, GridEdge)> = graph
        .all_edges()
        .filter(|(a, b, _)| match (a.layer(), b.layer()) {
            (Some(la), Some(lb)) => la != lb,
            _ => false,
        })
        .map(|(a, b, e)| (a, b, *e))
        .collect();

    for (a, b, edge) in &via_edges {
        let (Some(via_layer), Some(pos)) = (edge.layer, a.pos()) else {
            continue;
        };
        let via = GridNode::Real {
            layer: via_layer,
            pos,
        };
        let half = GridEdge {
            weight: edge.weight / 2.0,
            ..*edge
        };
        out.remove_edge(*a, *b);
        out.add_edge(*a, via, half);
        out.add_edge(via, *b, half);
    }
    log::debug!("Inserted {} via nodes", via_edges.len());
    out
}
