//! Node conflicts from spacing rules and per-net node reservations.

use crate::graph::{GridNode, RoutingGraph};
use crate::spacing::{SpacingGraph, rules_of};
use crate::terminals::Terminal;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use stdcell_common::db::indices::{LayerId, NetId};
use stdcell_common::db::tech::Technology;
use stdcell_common::geom::point::Point;
use stdcell_common::geom::rect::Rect;
use stdcell_common::geom::rtree::PointIndex;

/// Nodes that must not be used by two different nets at the same time.
pub type ConflictSet = HashMap<GridNode, BTreeSet<GridNode>>;

/// Nodes each net may use exclusively.
pub type ReservedNodes = BTreeMap<NetId, HashSet<GridNode>>;

fn chebyshev(a: Point<i64>, b: Point<i64>) -> i64 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// For every real node, all real nodes closer than
/// `half_width(layer) + half_width(other) + spacing(layer, other)`.
/// Only nodes with at least one conflict get an entry.
pub fn build_conflicts(graph: &RoutingGraph, spacing: &SpacingGraph, tech: &Technology) -> ConflictSet {
    let nodes: Vec<(LayerId, Point<i64>, GridNode)> = graph
        .nodes()
        .filter_map(|n| match n {
            GridNode::Real { layer, pos } => Some((layer, pos, n)),
            _ => None,
        })
        .collect();
    let mut points: HashMap<LayerId, Vec<(Point<i64>, GridNode)>> = HashMap::new();
    for &(layer, pos, n) in &nodes {
        points.entry(layer).or_default().push((pos, n));
    }
    let indices: HashMap<LayerId, PointIndex<GridNode>> = points
        .into_iter()
        .map(|(layer, pts)| (layer, PointIndex::bulk_load(pts)))
        .collect();

    nodes
        .par_iter()
        .filter_map(|&(layer, p, n)| {
            let mut hits = BTreeSet::new();
            for (other, s) in rules_of(spacing, layer) {
                let Some(index) = indices.get(&other) else {
                    continue;
                };
                let margin = tech.half_width(layer) + tech.half_width(other) + s;
                hits.extend(
                    index
                        .within(Rect::centered(p, margin))
                        .filter(|(q, m)| **m != n && chebyshev(p, *q) < margin)
                        .map(|(_, m)| *m),
                );
            }
            (!hits.is_empty()).then_some((n, hits))
        })
        .collect()
}

/// Reserves each net's terminal nodes and their conflict neighbours.
///
/// A terminal node belongs to the first net listing it. A neighbour that is
/// a terminal node of another net, or that several nets would claim, is
/// reserved for nobody, so reserved sets never overlap.
pub fn reserve_nodes(terminals: &[Terminal], conflicts: &ConflictSet) -> ReservedNodes {
    let mut owner: HashMap<GridNode, NetId> = HashMap::new();
    for t in terminals {
        for &n in &t.nodes {
            owner.entry(n).or_insert(t.net);
        }
    }

    let mut reserved: ReservedNodes = BTreeMap::new();
    let mut claims: HashMap<GridNode, BTreeSet<NetId>> = HashMap::new();
    let mut warned: HashSet<(NetId, NetId)> = HashSet::new();
    for t in terminals {
        let own = reserved.entry(t.net).or_default();
        for n in &t.nodes {
            if owner.get(n) != Some(&t.net) {
                log::warn!("Terminal node {:?} of {:?} already belongs to another net", n, t.net);
                continue;
            }
            own.insert(*n);
            let Some(neighbours) = conflicts.get(n) else {
                continue;
            };
            for m in neighbours {
                match owner.get(m) {
                    Some(&other) if other != t.net => {
                        if warned.insert((t.net.min(other), t.net.max(other))) {
                            log::warn!("Terminals of {:?} and {:?} violate spacing", t.net, other);
                        }
                    }
                    Some(_) => {}
                    None => {
                        claims.entry(*m).or_default().insert(t.net);
                    }
                }
            }
        }
    }

    for (node, nets) in claims {
        if let (Some(&net), 1) = (nets.first(), nets.len()) {
            reserved.entry(net).or_default().insert(node);
        }
    }
    reserved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GridEdge;
    use crate::spacing;
    use stdcell_common::db::tech::Orientation;
    use stdcell_common::util::config::{LayerPairValue, TechConfig};

    fn tech() -> Technology {
        let mut cfg = TechConfig::default();
        cfg.wire_width = [("metal1".to_string(), 4), ("metal2".to_string(), 4)].into();
        cfg.min_spacing = vec![LayerPairValue::new("metal1", "metal1", 4)];
        Technology::from_config(&cfg).unwrap()
    }

    fn row(layer: LayerId, xs: &[i64]) -> RoutingGraph {
        let mut g = RoutingGraph::new();
        for w in xs.windows(2) {
            g.add_edge(
                GridNode::real(layer, w[0], 0),
                GridNode::real(layer, w[1], 0),
                GridEdge::wire(layer, Orientation::Horizontal, 1.0),
            );
        }
        g
    }

    #[test]
    fn conflicts_are_strict_and_symmetric() {
        let tech = tech();
        let m1 = tech.layer("metal1").unwrap();
        let sp = spacing::build(&tech.min_spacing);
        // margin = 2 + 2 + 4 = 8
        let g = row(m1, &[0, 7, 15, 30]);
        let c = build_conflicts(&g, &sp, &tech);
        let a = GridNode::real(m1, 0, 0);
        let b = GridNode::real(m1, 7, 0);
        let d = GridNode::real(m1, 15, 0);
        assert_eq!(c[&a], BTreeSet::from([b]));
        assert_eq!(c[&b], BTreeSet::from([a]));
        // 8 apart is exactly the margin
        assert!(!c.get(&d).is_some_and(|hits| hits.contains(&b)));
        assert!(!c.contains_key(&GridNode::real(m1, 30, 0)));

        for (n, hits) in &c {
            for m in hits {
                assert!(c[m].contains(n));
            }
        }
    }

    #[test]
    fn layers_without_rule_never_conflict() {
        let tech = tech();
        let m2 = tech.layer("metal2").unwrap();
        let sp = spacing::build(&tech.min_spacing);
        let g = row(m2, &[0, 1, 2]);
        assert!(build_conflicts(&g, &sp, &tech).is_empty());
    }

    #[test]
    fn reservations_are_exclusive() {
        let l = LayerId(0);
        let n = |x| GridNode::real(l, x, 0);
        let (a, b) = (NetId(0), NetId(1));
        let mut conflicts = ConflictSet::new();
        // n(10) is contested, n(0) and n(20) are terminals
        conflicts.insert(n(0), BTreeSet::from([n(5), n(10)]));
        conflicts.insert(n(20), BTreeSet::from([n(10), n(25)]));
        let terminals = vec![
            Terminal { net: a, nodes: vec![n(0)] },
            Terminal { net: b, nodes: vec![n(20)] },
        ];
        let reserved = reserve_nodes(&terminals, &conflicts);
        assert_eq!(reserved[&a], HashSet::from([n(0), n(5)]));
        assert_eq!(reserved[&b], HashSet::from([n(20), n(25)]));
        assert!(reserved[&a].is_disjoint(&reserved[&b]));
    }

    #[test]
    fn shared_terminal_node_is_reserved_once() {
        let l = LayerId(0);
        let n = |x| GridNode::real(l, x, 0);
        let (a, b) = (NetId(0), NetId(1));
        let conflicts = ConflictSet::from([(n(10), BTreeSet::from([n(15)]))]);
        let terminals = vec![
            Terminal { net: a, nodes: vec![n(0), n(10)] },
            Terminal { net: b, nodes: vec![n(10), n(20)] },
        ];
        let reserved = reserve_nodes(&terminals, &conflicts);
        assert_eq!(reserved[&a], HashSet::from([n(0), n(10), n(15)]));
        assert_eq!(reserved[&b], HashSet::from([n(20)]));
    }

    #[test]
    fn terminal_of_another_net_is_not_reserved() {
        let l = LayerId(0);
        let n = |x| GridNode::real(l, x, 0);
        let (a, b) = (NetId(0), NetId(1));
        let mut conflicts = ConflictSet::new();
        conflicts.insert(n(0), BTreeSet::from([n(3)]));
        conflicts.insert(n(3), BTreeSet::from([n(0)]));
        let terminals = vec![
            Terminal { net: a, nodes: vec![n(0)] },
            Terminal { net: b, nodes: vec![n(3)] },
        ];
        let reserved = reserve_nodes(&terminals, &conflicts);
        assert_eq!(reserved[&a], HashSet::from([n(0)]));
        assert_eq!(reserved[&b], HashSet::from([n(3)]));
    }
}
