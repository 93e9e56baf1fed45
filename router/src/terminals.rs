//! Mapping of net-bearing shapes onto grid nodes.

use crate::graph::{GridEdge, GridNode, RoutingGraph};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use stdcell_common::db::core::TransistorData;
use stdcell_common::db::extract::NetCluster;
use stdcell_common::db::indices::{LayerId, NetId};
use stdcell_common::db::tech::{LayerKind, Orientation, Technology};
use stdcell_common::geom::point::Point;
use stdcell_common::geom::rect::Rect;
use stdcell_common::geom::rtree::PointIndex;

/// One access point of a net: grid nodes already joined by geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Terminal {
    pub net: NetId,
    pub nodes: Vec<GridNode>,
}

/// Provides the terminal positions of a placed transistor.
pub trait TransistorLayout {
    fn terminal_nodes(&self) -> BTreeMap<NetId, Vec<(LayerId, Point<i64>)>>;
}

impl TransistorLayout for TransistorData {
    fn terminal_nodes(&self) -> BTreeMap<NetId, Vec<(LayerId, Point<i64>)>> {
        let mut out: BTreeMap<NetId, Vec<(LayerId, Point<i64>)>> = BTreeMap::new();
        for t in &self.terminals {
            out.entry(t.net).or_default().push((t.layer, t.position));
        }
        out
    }
}

/// Finds the grid nodes a shape gives access to.
pub struct NodeLocator<'a> {
    tech: &'a Technology,
    by_layer: HashMap<LayerId, PointIndex<GridNode>>,
}

impl<'a> NodeLocator<'a> {
    pub fn new(graph: &RoutingGraph, tech: &'a Technology) -> Self {
        let mut points: HashMap<LayerId, Vec<(Point<i64>, GridNode)>> = HashMap::new();
        for n in graph.nodes() {
            if let GridNode::Real { layer, pos } = n {
                points.entry(layer).or_default().push((pos, n));
            }
        }
        let by_layer = points
            .into_iter()
            .map(|(layer, pts)| (layer, PointIndex::bulk_load(pts)))
            .collect();
        Self { tech, by_layer }
    }

    /// Nodes on `layer` that touch `rect` (routing layers) or whose
    /// enclosure box fits inside it (all other layers). Sorted.
    pub fn nodes_for_shape(&self, layer: LayerId, rect: &Rect) -> Vec<GridNode> {
        let Some(index) = self.by_layer.get(&layer) else {
            return Vec::new();
        };
        let query = if self.tech.is_routing(layer) {
            rect.enlarged(1)
        } else {
            let m = self.inside_margin(layer);
            let shrunk = Rect::new(
                Point::new(rect.min.x + m, rect.min.y + m),
                Point::new(rect.max.x - m, rect.max.y - m),
            );
            if !shrunk.is_valid() {
                return Vec::new();
            }
            shrunk
        };
        let mut found: Vec<GridNode> = index.within(query).map(|(_, n)| *n).collect();
        found.sort_unstable();
        found
    }

    fn inside_margin(&self, layer: LayerId) -> i64 {
        match self.tech.kind(layer) {
            LayerKind::Via { .. } => self.tech.via_size(layer) / 2,
            _ => self
                .tech
                .via_defs
                .iter()
                .filter(|v| v.bottom == layer || v.top == layer)
                .map(|v| self.tech.via_size(v.via) / 2 + self.tech.enclosure(layer, v.via))
                .max()
                .unwrap_or(0),
        }
    }
}

/// One terminal per labelled shape. A node is claimed by at most one
/// terminal; shapes that find no unclaimed node yield no terminal.
pub fn extract_terminal_nodes(
    locator: &NodeLocator,
    shapes: impl IntoIterator<Item = (NetId, LayerId, Rect)>,
) -> Vec<Terminal> {
    let mut claimed: HashSet<GridNode> = HashSet::new();
    let mut terminals = Vec::new();
    for (net, layer, rect) in shapes {
        let nodes: Vec<GridNode> = locator
            .nodes_for_shape(layer, &rect)
            .into_iter()
            .filter(|n| claimed.insert(*n))
            .collect();
        if !nodes.is_empty() {
            terminals.push(Terminal { net, nodes });
        }
    }
    terminals
}

/// One terminal per extracted cluster of a routed net. Shapes joined by
/// existing geometry end up in the same terminal.
pub fn extract_terminal_nodes_by_lvs(
    locator: &NodeLocator,
    clusters: &[NetCluster],
    nets: &BTreeSet<NetId>,
) -> Vec<Terminal> {
    let mut claimed: HashSet<GridNode> = HashSet::new();
    let mut terminals = Vec::new();
    for cluster in clusters {
        let Some(net) = cluster.labels.iter().copied().find(|n| nets.contains(n)) else {
            continue;
        };
        let mut nodes = Vec::new();
        for (layer, rect) in &cluster.shapes {
            nodes.extend(
                locator
                    .nodes_for_shape(*layer, rect)
                    .into_iter()
                    .filter(|n| claimed.insert(*n)),
            );
        }
        if !nodes.is_empty() {
            nodes.sort_unstable();
            terminals.push(Terminal { net, nodes });
        }
    }
    terminals
}

/// Replaces shape terminals by the extracted cluster they belong to, so
/// terminals already joined by geometry are routed as one.
///
/// A terminal touching several clusters, or a cluster of another net, is a
/// short circuit: it is logged and routing continues. A terminal in a
/// cluster of another net keeps its own nodes, and a merged cluster never
/// takes over nodes of another net's terminal.
pub fn merge_terminals(shape_terminals: Vec<Terminal>, lvs_terminals: &[Terminal]) -> Vec<Terminal> {
    let mut cluster_of: HashMap<GridNode, usize> = HashMap::new();
    for (i, t) in lvs_terminals.iter().enumerate() {
        for &n in &t.nodes {
            cluster_of.insert(n, i);
        }
    }
    let mut net_of: HashMap<GridNode, NetId> = HashMap::new();
    for t in &shape_terminals {
        for &n in &t.nodes {
            net_of.entry(n).or_insert(t.net);
        }
    }

    let mut used: HashSet<(NetId, usize)> = HashSet::new();
    let mut merged = Vec::with_capacity(shape_terminals.len());
    for terminal in shape_terminals {
        let mut ids: Vec<usize> = Vec::new();
        for n in &terminal.nodes {
            if let Some(&id) = cluster_of.get(n) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        let Some(&first) = ids.first() else {
            merged.push(terminal);
            continue;
        };
        if ids.len() > 1 {
            log::error!(
                "Short circuit of nets detected: terminal of {:?} touches {} clusters",
                terminal.net,
                ids.len()
            );
        }
        let cluster = &lvs_terminals[first];
        if cluster.net != terminal.net {
            log::error!(
                "Short circuit of nets detected: {:?} and {:?}",
                terminal.net,
                cluster.net
            );
            merged.push(terminal);
            continue;
        }
        if used.insert((terminal.net, first)) {
            let nodes = cluster
                .nodes
                .iter()
                .copied()
                .filter(|n| !net_of.get(n).is_some_and(|&owner| owner != terminal.net))
                .collect();
            merged.push(Terminal {
                net: terminal.net,
                nodes,
            });
        }
    }
    merged
}

/// Connects off-grid transistor terminals to the nearest node on the same
/// layer and x coordinate. Returns one terminal per connected position.
pub fn embed_transistor_terminals(
    graph: &mut RoutingGraph,
    transistors: &[&dyn TransistorLayout],
    nets: &BTreeSet<NetId>,
    weight: f64,
) -> Vec<Terminal> {
    let mut columns: HashMap<(LayerId, i64), Vec<i64>> = HashMap::new();
    for n in graph.nodes() {
        if let GridNode::Real { layer, pos } = n {
            columns.entry((layer, pos.x)).or_default().push(pos.y);
        }
    }

    let mut terminals = Vec::new();
    for t in transistors {
        for (net, points) in t.terminal_nodes() {
            if !nets.contains(&net) {
                continue;
            }
            for (layer, pos) in points {
                let node = GridNode::Real { layer, pos };
                if !graph.contains_node(node) {
                    let nearest = columns
                        .get(&(layer, pos.x))
                        .and_then(|ys| ys.iter().copied().min_by_key(|y| ((y - pos.y).abs(), *y)));
                    let Some(y) = nearest else {
                        log::warn!(
                            "No grid node on layer {:?} at x = {} for transistor terminal of {:?}",
                            layer,
                            pos.x,
                            net
                        );
                        continue;
                    };
                    graph.add_edge(
                        node,
                        GridNode::Real {
                            layer,
                            pos: Point::new(pos.x, y),
                        },
                        GridEdge::wire(layer, Orientation::Vertical, weight),
                    );
                }
                terminals.push(Terminal {
                    net,
                    nodes: vec![node],
                });
            }
        }
    }
    terminals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{builder, via_nodes};
    use crate::utils::conversion::GridAxes;
    use stdcell_common::db::core::TransistorTerminal;
    use stdcell_common::util::config::{LayerPairValue, TechConfig, ViaLayerConfig};

    fn tech() -> Technology {
        let mut cfg = TechConfig::default();
        cfg.routing_grid_pitch_x = 10;
        cfg.routing_grid_pitch_y = 10;
        cfg.grid_offset_x = 0;
        cfg.grid_offset_y = 0;
        cfg.other_layers = vec!["ndiff".to_string()];
        cfg.via_layers.push(ViaLayerConfig {
            bottom: "ndiff".to_string(),
            top: "metal1".to_string(),
            via: "contact".to_string(),
        });
        cfg.via_size.insert("contact".to_string(), 4);
        cfg.minimum_enclosure
            .push(LayerPairValue::new("ndiff", "contact", 1));
        Technology::from_config(&cfg).unwrap()
    }

    fn graph(tech: &Technology) -> RoutingGraph {
        let axes = GridAxes::for_cell(&Rect::from_sides(0, 0, 40, 20), tech);
        via_nodes::insert(&builder::build(&axes, tech).unwrap())
    }

    #[test]
    fn routing_layer_shapes_claim_touching_nodes_once() {
        let tech = tech();
        let g = graph(&tech);
        let locator = NodeLocator::new(&g, &tech);
        let m1 = tech.layer("metal1").unwrap();
        let a = NetId(0);
        let terminals = extract_terminal_nodes(
            &locator,
            [
                (a, m1, Rect::from_sides(-2, -2, 11, 2)),
                (a, m1, Rect::from_sides(9, -2, 21, 2)),
            ],
        );
        assert_eq!(terminals.len(), 2);
        assert_eq!(
            terminals[0].nodes,
            vec![GridNode::real(m1, 0, 0), GridNode::real(m1, 10, 0)]
        );
        assert_eq!(terminals[1].nodes, vec![GridNode::real(m1, 20, 0)]);

        let all: Vec<_> = terminals.iter().flat_map(|t| t.nodes.iter()).collect();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn landing_layer_shapes_need_room_for_the_contact() {
        let tech = tech();
        let g = graph(&tech);
        let locator = NodeLocator::new(&g, &tech);
        let diff = tech.layer("ndiff").unwrap();
        // margin = 4 / 2 + 1 = 3
        let nodes = locator.nodes_for_shape(diff, &Rect::from_sides(-3, -3, 13, 3));
        assert_eq!(nodes, vec![GridNode::real(diff, 0, 0), GridNode::real(diff, 10, 0)]);
        assert!(locator
            .nodes_for_shape(diff, &Rect::from_sides(-2, -3, 2, 3))
            .is_empty());
    }

    #[test]
    fn merge_uses_the_cluster_once_per_net() {
        let m1 = LayerId(0);
        let a = NetId(0);
        let (p, q, r) = (
            GridNode::real(m1, 0, 0),
            GridNode::real(m1, 0, 10),
            GridNode::real(m1, 20, 0),
        );
        let shape_terms = vec![
            Terminal { net: a, nodes: vec![p] },
            Terminal { net: a, nodes: vec![q] },
            Terminal { net: a, nodes: vec![r] },
        ];
        let lvs = vec![
            Terminal { net: a, nodes: vec![p, q] },
            Terminal { net: a, nodes: vec![r] },
        ];
        let merged = merge_terminals(shape_terms, &lvs);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].nodes, vec![p, q]);
        assert_eq!(merged[1].nodes, vec![r]);
    }

    #[test]
    fn shorted_terminals_keep_their_own_nodes() {
        let m1 = LayerId(0);
        let (a, b) = (NetId(0), NetId(1));
        let (p, q, r) = (
            GridNode::real(m1, 0, 0),
            GridNode::real(m1, 0, 10),
            GridNode::real(m1, 0, 20),
        );
        // one cluster labelled A joins the pads of A and B
        let shape_terms = vec![
            Terminal { net: a, nodes: vec![p] },
            Terminal { net: b, nodes: vec![q] },
        ];
        let lvs = vec![Terminal { net: a, nodes: vec![p, q, r] }];
        let merged = merge_terminals(shape_terms, &lvs);
        assert_eq!(
            merged,
            vec![
                Terminal { net: a, nodes: vec![p, r] },
                Terminal { net: b, nodes: vec![q] },
            ]
        );
    }

    #[test]
    fn merge_keeps_terminals_without_cluster() {
        let m1 = LayerId(0);
        let t = Terminal {
            net: NetId(1),
            nodes: vec![GridNode::real(m1, 5, 5)],
        };
        assert_eq!(merge_terminals(vec![t.clone()], &[]), vec![t]);
    }

    #[test]
    fn transistor_terminal_joins_nearest_node_in_its_column() {
        let tech = tech();
        let mut g = graph(&tech);
        let m1 = tech.layer("metal1").unwrap();
        let a = NetId(0);
        let t = TransistorData {
            name: "MN0".to_string(),
            terminals: vec![TransistorTerminal {
                net: a,
                layer: m1,
                position: Point::new(10, 13),
            }],
        };
        let nets = BTreeSet::from([a]);
        let terms = embed_transistor_terminals(&mut g, &[&t], &nets, 1000.0);
        let node = GridNode::real(m1, 10, 13);
        assert_eq!(terms, vec![Terminal { net: a, nodes: vec![node] }]);
        let e = g.edge_weight(node, GridNode::real(m1, 10, 10)).unwrap();
        assert_eq!(e.weight, 1000.0);
    }
}
