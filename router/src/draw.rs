//! Conversion of routing trees into wire, via and pin geometry.

use crate::algo::RoutingTree;
use crate::graph::{GridEdge, GridNode, RoutingGraph};
use crate::spacing::{SpacingGraph, spacing};
use std::collections::{HashMap, HashSet, VecDeque};
use stdcell_common::db::core::ShapeCollection;
use stdcell_common::db::indices::{LayerId, NetId};
use stdcell_common::db::tech::{Orientation, Technology};
use stdcell_common::geom::point::Point;
use stdcell_common::geom::rect::Rect;
use stdcell_common::util::config::RoutingConfig;

/// Straight wire between two grid nodes of one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct WireRun {
    pub layer: LayerId,
    pub orientation: Orientation,
    pub start: Point<i64>,
    pub end: Point<i64>,
}

type Adjacency = HashMap<GridNode, Vec<(GridNode, Orientation)>>;

fn edge_key(a: GridNode, b: GridNode) -> (GridNode, GridNode) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Merges chains of collinear wire edges into straight runs. A run stops at
/// nodes that branch, end, or turn.
pub fn wire_runs<'a>(edges: impl IntoIterator<Item = (GridNode, GridNode, &'a GridEdge)>) -> Vec<WireRun> {
    let mut adjacency: Adjacency = HashMap::new();
    let mut wires: Vec<(GridNode, GridNode, LayerId, Orientation)> = Vec::new();
    for (a, b, e) in edges {
        let (Some(layer), Some(o)) = (e.layer, e.orientation) else {
            continue;
        };
        if !(a.on_layer(layer) && b.on_layer(layer)) {
            continue;
        }
        adjacency.entry(a).or_default().push((b, o));
        adjacency.entry(b).or_default().push((a, o));
        wires.push((a, b, layer, o));
    }
    wires.sort_unstable_by_key(|&(a, b, _, _)| edge_key(a, b));

    let mut visited: HashSet<(GridNode, GridNode)> = HashSet::new();
    let mut runs = Vec::new();
    for (a, b, layer, o) in wires {
        if !visited.insert(edge_key(a, b)) {
            continue;
        }
        let mut chain: VecDeque<GridNode> = VecDeque::from([a, b]);
        while let Some(next) = extend(&adjacency, chain[chain.len() - 1], chain[chain.len() - 2], o, &mut visited) {
            chain.push_back(next);
        }
        while let Some(next) = extend(&adjacency, chain[0], chain[1], o, &mut visited) {
            chain.push_front(next);
        }
        let (Some(start), Some(end)) = (chain[0].pos(), chain[chain.len() - 1].pos()) else {
            continue;
        };
        runs.push(WireRun {
            layer,
            orientation: o,
            start,
            end,
        });
    }
    runs
}

fn extend(
    adjacency: &Adjacency,
    cur: GridNode,
    prev: GridNode,
    o: Orientation,
    visited: &mut HashSet<(GridNode, GridNode)>,
) -> Option<GridNode> {
    let neighbours = adjacency.get(&cur)?;
    if neighbours.len() != 2 {
        return None;
    }
    let &(next, next_o) = neighbours.iter().find(|(n, _)| *n != prev)?;
    if next_o != o || !visited.insert(edge_key(cur, next)) {
        return None;
    }
    Some(next)
}

/// Via cuts of one via node, in a row along x centred on `pos`.
pub fn via_cuts(pos: Point<i64>, size: i64, count: u32, pitch: i64) -> Vec<Rect> {
    let count = count.max(1) as i64;
    let first = -(count - 1) * pitch / 2;
    (0..count)
        .map(|i| Rect::centered(Point::new(pos.x + first + i * pitch, pos.y), size / 2))
        .collect()
}

/// Emits the geometry of one routed net: merged wire runs, via cuts with
/// enclosure patches on the adjacent routing layers, and a labelled pin box
/// where the tree touches an I/O pin hub.
pub fn draw_routing_tree(
    tree: &RoutingTree,
    net: NetId,
    label: &str,
    tech: &Technology,
    spacing_graph: &SpacingGraph,
    shapes: &mut ShapeCollection,
) {
    for run in wire_runs(tree.edges()) {
        let width = tech.wire_width(run.layer, Some(run.orientation));
        shapes.insert_path(run.layer, vec![run.start, run.end], width, Some(net));
    }

    for n in tree.real_nodes() {
        let GridNode::Real { layer, pos } = n else {
            continue;
        };
        let Some(via) = tech.via_def(layer) else {
            continue;
        };
        let count = tree
            .graph()
            .edges(n)
            .map(|(_, _, e)| e.multi_via)
            .max()
            .unwrap_or(1);
        let size = tech.via_size(layer);
        let pitch = size + spacing(spacing_graph, layer, layer).unwrap_or(0);
        let cuts = via_cuts(pos, size, count, pitch);
        let Some(bbox) = cuts.iter().copied().reduce(|a, b| a.union(&b)) else {
            continue;
        };
        for cut in cuts {
            shapes.insert_box(layer, cut, Some(net));
        }
        for metal in [via.bottom, via.top] {
            if tech.is_routing(metal) {
                shapes.insert_box(metal, bbox.enlarged(tech.enclosure(metal, layer)), Some(net));
            }
        }
    }

    for (a, b, _) in tree.edges() {
        let pin_node = match (a, b) {
            (GridNode::VirtualPin { .. }, real) | (real, GridNode::VirtualPin { .. }) => real,
            _ => continue,
        };
        let GridNode::Real { layer, pos } = pin_node else {
            continue;
        };
        let half = tech.half_width(layer);
        shapes.insert_label(layer, Rect::centered(pos, half), net, label.to_string());
    }
}

/// Draws every edge and via node of `graph` with thin debug widths, so a
/// disconnected or congested graph can be inspected.
pub fn draw_routing_graph(
    graph: &RoutingGraph,
    tech: &Technology,
    config: &RoutingConfig,
    shapes: &mut ShapeCollection,
) {
    for run in wire_runs(graph.all_edges()) {
        shapes.insert_path(run.layer, vec![run.start, run.end], config.debug_wire_width, None);
    }
    for n in graph.nodes() {
        if let GridNode::Real { layer, pos } = n {
            if tech.is_via(layer) {
                shapes.insert_box(layer, Rect::centered(pos, config.debug_via_size / 2), None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stdcell_common::db::core::Geometry;
    use stdcell_common::util::config::{LayerPairValue, TechConfig};

    fn tech() -> Technology {
        let mut cfg = TechConfig::default();
        cfg.wire_width = [("metal1".to_string(), 4), ("metal2".to_string(), 4)].into();
        cfg.via_size = [("via1".to_string(), 4)].into();
        cfg.minimum_enclosure = vec![
            LayerPairValue::new("metal1", "via1", 1),
            LayerPairValue::new("metal2", "via1", 2),
        ];
        cfg.multi_via = vec![LayerPairValue::new("metal1", "metal2", 2)];
        Technology::from_config(&cfg).unwrap()
    }

    fn wire(layer: LayerId, o: Orientation) -> GridEdge {
        GridEdge::wire(layer, o, 1.0)
    }

    #[test]
    fn collinear_edges_merge_into_one_run() {
        let l = LayerId(0);
        let h = wire(l, Orientation::Horizontal);
        let v = wire(l, Orientation::Vertical);
        let (a, b, c, d) = (
            GridNode::real(l, 0, 0),
            GridNode::real(l, 10, 0),
            GridNode::real(l, 20, 0),
            GridNode::real(l, 20, 10),
        );
        let edges = vec![(a, b, &h), (b, c, &h), (c, d, &v)];
        let mut runs = wire_runs(edges);
        runs.sort_by_key(|r| r.orientation);
        assert_eq!(runs.len(), 2);
        let hr = &runs[0];
        assert_eq!(
            (hr.start.min(hr.end), hr.start.max(hr.end)),
            (Point::new(0, 0), Point::new(20, 0))
        );
        assert_eq!(runs[1].orientation, Orientation::Vertical);
    }

    #[test]
    fn branches_split_runs() {
        let l = LayerId(0);
        let h = wire(l, Orientation::Horizontal);
        let v = wire(l, Orientation::Vertical);
        let (a, b, c, d) = (
            GridNode::real(l, 0, 0),
            GridNode::real(l, 10, 0),
            GridNode::real(l, 20, 0),
            GridNode::real(l, 10, 10),
        );
        let runs = wire_runs(vec![(a, b, &h), (b, c, &h), (b, d, &v)]);
        assert_eq!(runs.len(), 3);
    }

    #[test]
    fn via_node_emits_cuts_and_enclosures() {
        let tech = tech();
        let (m1, m2, v1) = (
            tech.layer("metal1").unwrap(),
            tech.layer("metal2").unwrap(),
            tech.layer("via1").unwrap(),
        );
        let sp = crate::spacing::build(&[(v1, v1, 6)]);
        let mut g = RoutingGraph::new();
        let (a, via, b) = (
            GridNode::real(m1, 0, 0),
            GridNode::real(v1, 0, 0),
            GridNode::real(m2, 0, 0),
        );
        g.add_edge(a, via, GridEdge::via(v1, 1.0, 2));
        g.add_edge(via, b, GridEdge::via(v1, 1.0, 2));
        let mut tree = RoutingTree::new();
        tree.add_path(&[a, via, b], &g);

        let mut shapes = ShapeCollection::new();
        draw_routing_tree(&tree, NetId(0), "A", &tech, &sp, &mut shapes);

        let cuts: Vec<Rect> = shapes.on_layer(v1).map(|s| s.geometry.bbox()).collect();
        // pitch = 4 + 6
        assert_eq!(
            cuts,
            vec![Rect::from_sides(-7, -2, -3, 2), Rect::from_sides(3, -2, 7, 2)]
        );
        let m1_patch = shapes.on_layer(m1).next().unwrap();
        assert_eq!(m1_patch.geometry, Geometry::Box(Rect::from_sides(-8, -3, 8, 3)));
        let m2_patch = shapes.on_layer(m2).next().unwrap();
        assert_eq!(m2_patch.geometry, Geometry::Box(Rect::from_sides(-9, -4, 9, 4)));
        assert!(shapes.iter().all(|s| s.net == Some(NetId(0))));
    }

    #[test]
    fn pin_hub_marks_the_pin_location() {
        let tech = tech();
        let m2 = tech.layer("metal2").unwrap();
        let net = NetId(3);
        let p = GridNode::real(m2, 10, 20);
        let hub = GridNode::VirtualPin { net, id: 0 };
        let mut g = RoutingGraph::new();
        g.add_edge(hub, p, GridEdge::virtual_link(5.0));
        let mut tree = RoutingTree::new();
        tree.add_path(&[hub, p], &g);

        let mut shapes = ShapeCollection::new();
        draw_routing_tree(&tree, net, "Y", &tech, &SpacingGraph::new(), &mut shapes);
        assert_eq!(shapes.len(), 1);
        let pin = shapes.iter().next().unwrap();
        assert_eq!(pin.label.as_deref(), Some("Y"));
        assert_eq!(pin.geometry, Geometry::Box(Rect::from_sides(8, 18, 12, 22)));
    }
}
