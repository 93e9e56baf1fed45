//! Minimum spacing rules as a graph over layers.

use petgraph::graphmap::UnGraphMap;
use stdcell_common::db::indices::LayerId;
use stdcell_common::db::tech::{Technology, ViaDef};

/// Edge weight is the minimum spacing between shapes on the two layers.
/// Self loops hold same-layer spacing.
pub type SpacingGraph = UnGraphMap<LayerId, i64>;

pub fn build(rules: &[(LayerId, LayerId, i64)]) -> SpacingGraph {
    let mut g = SpacingGraph::new();
    for &(a, b, s) in rules {
        set_max(&mut g, a, b, s);
    }
    g
}

pub fn spacing(g: &SpacingGraph, a: LayerId, b: LayerId) -> Option<i64> {
    g.edge_weight(a, b).copied()
}

/// Largest spacing rule `layer` has to any layer.
pub fn max_spacing(g: &SpacingGraph, layer: LayerId) -> Option<i64> {
    if !g.contains_node(layer) {
        return None;
    }
    g.edges(layer).map(|(_, _, &s)| s).max()
}

/// Layers that have a spacing rule to `layer`, with the rule.
pub fn rules_of(g: &SpacingGraph, layer: LayerId) -> Vec<(LayerId, i64)> {
    if !g.contains_node(layer) {
        return Vec::new();
    }
    g.edges(layer)
        .map(|(a, b, &s)| (if a == layer { b } else { a }, s))
        .collect()
}

/// Derives via-to-metal and via-to-via spacing from the metal rules and the
/// via enclosure. Returns a new graph; `base` is left untouched.
pub fn extend_with_via_rules(base: &SpacingGraph, vias: &[ViaDef], tech: &Technology) -> SpacingGraph {
    let mut g = base.clone();
    for via in vias {
        let half = tech.via_size(via.via) / 2;
        for l in [via.bottom, via.top] {
            let w_ext = half + tech.enclosure(l, via.via);
            for (l_next, s) in rules_of(base, l) {
                set_max(&mut g, via.via, l_next, s + w_ext);
            }
            if let Some(s) = spacing(base, l, l) {
                set_max(&mut g, via.via, l, s + w_ext);
                set_max(&mut g, via.via, via.via, s + 2 * w_ext);
            }
        }
    }
    g
}

fn set_max(g: &mut SpacingGraph, a: LayerId, b: LayerId, s: i64) {
    let value = match g.edge_weight(a, b) {
        Some(&old) => old.max(s),
        None => s,
    };
    g.add_edge(a, b, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use stdcell_common::util::config::{LayerPairValue, TechConfig};

    fn tech() -> Technology {
        let mut cfg = TechConfig::default();
        cfg.min_spacing = vec![
            LayerPairValue::new("metal1", "metal1", 100),
            LayerPairValue::new("metal2", "metal2", 120),
            LayerPairValue::new("metal1", "metal2", 30),
            LayerPairValue::new("via1", "via1", 500),
        ];
        Technology::from_config(&cfg).unwrap()
    }

    #[test]
    fn build_is_symmetric_and_keeps_strictest_rule() {
        let t = tech();
        let (m1, m2) = (t.layer("metal1").unwrap(), t.layer("metal2").unwrap());
        let g = build(&[(m1, m2, 10), (m2, m1, 30), (m1, m1, 100)]);
        assert_eq!(spacing(&g, m1, m2), Some(30));
        assert_eq!(spacing(&g, m2, m1), Some(30));
        assert_eq!(max_spacing(&g, m1), Some(100));
    }

    #[test]
    fn via_extension_is_monotonic_and_symmetric() {
        let t = tech();
        let base = build(&t.min_spacing);
        let ext = extend_with_via_rules(&base, &t.via_defs, &t);

        let (m1, m2, v1) = (
            t.layer("metal1").unwrap(),
            t.layer("metal2").unwrap(),
            t.layer("via1").unwrap(),
        );
        // via 80 wide, 10 enclosure: w_ext = 50
        assert_eq!(spacing(&ext, v1, m1), Some(150));
        assert_eq!(spacing(&ext, v1, m2), Some(170));
        // derived via-to-via is at most 220, the explicit rule wins
        assert_eq!(spacing(&ext, v1, v1), Some(500));
        assert_eq!(spacing(&base, v1, m1), None);

        for (a, b, &s) in base.all_edges() {
            assert!(spacing(&ext, a, b).unwrap() >= s);
        }
        for a in ext.nodes() {
            for b in ext.nodes() {
                assert_eq!(spacing(&ext, a, b), spacing(&ext, b, a));
            }
        }
    }
}
