use crate::error::RoutingError;
use crate::graph::{GridEdge, GridNode, RoutingGraph, component_count};
use crate::utils::conversion::GridAxes;
use stdcell_common::db::indices::LayerId;
use stdcell_common::db::tech::{Orientation, Technology};

/// Builds the multi-layer base grid: one node per layer and grid position,
/// wire edges between grid-adjacent positions and via edges between the
/// layers of every via definition.
///
/// Layers that are only landing layers of a via (diffusion, poly) get nodes
/// but no wire edges.
pub fn build(axes: &GridAxes, tech: &Technology) -> Result<RoutingGraph, RoutingError> {
    let mut graph = RoutingGraph::new();

    let mut node_layers: Vec<LayerId> = tech.routing_layers().map(|(l, _, _)| l).collect();
    for via in &tech.via_defs {
        for l in [via.bottom, via.top] {
            if !node_layers.contains(&l) {
                node_layers.push(l);
            }
        }
    }
    for &layer in &node_layers {
        for &x in &axes.xs {
            for &y in &axes.ys {
                graph.add_node(GridNode::real(layer, x, y));
            }
        }
    }

    for via in &tech.via_defs {
        let weight = match tech.via_weight(via.bottom, via.top) {
            Some(w) => w,
            None => {
                log::warn!(
                    "No via weight for {} - {}, using 0",
                    tech.layer_name(via.bottom),
                    tech.layer_name(via.top)
                );
                0.0
            }
        };
        let edge = GridEdge::via(via.via, weight, tech.multi_via(via.bottom, via.top));
        for &x in &axes.xs {
            for &y in &axes.ys {
                graph.add_edge(
                    GridNode::real(via.bottom, x, y),
                    GridNode::real(via.top, x, y),
                    edge,
                );
            }
        }
    }

    for (layer, horizontal, vertical) in tech.routing_layers() {
        if horizontal {
            let w = tech.wire_weight(layer, Orientation::Horizontal);
            for &y in &axes.ys {
                for pair in axes.xs.windows(2) {
                    let (x0, x1) = (pair[0], pair[1]);
                    graph.add_edge(
                        GridNode::real(layer, x0, y),
                        GridNode::real(layer, x1, y),
                        GridEdge::wire(layer, Orientation::Horizontal, w * (x1 - x0) as f64),
                    );
                }
            }
        }
        if vertical {
            let w = tech.wire_weight(layer, Orientation::Vertical);
            for &x in &axes.xs {
                for pair in axes.ys.windows(2) {
                    let (y0, y1) = (pair[0], pair[1]);
                    graph.add_edge(
                        GridNode::real(layer, x, y0),
                        GridNode::real(layer, x, y1),
                        GridEdge::wire(layer, Orientation::Vertical, w * (y1 - y0) as f64),
                    );
                }
            }
        }
    }

    let components = component_count(&graph);
    log::debug!(
        "Base grid: {} nodes, {} edges, {} components",
        graph.node_count(),
        graph.edge_count(),
        components
    );
    if components != 1 {
        return Err(RoutingError::BaseGridDisconnected { components });
    }
    Ok(graph)
}
