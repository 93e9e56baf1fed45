use crate::graph::{GridEdge, GridNode, RoutingGraph, remove_isolated_nodes};
use crate::spacing::{SpacingGraph, max_spacing, rules_of};
use rayon::prelude::*;
use std::collections::HashMap;
use stdcell_common::db::core::Shape;
use stdcell_common::db::indices::LayerId;
use stdcell_common::db::tech::Technology;
use stdcell_common::geom::rect::Rect;
use stdcell_common::geom::region::Region;
use stdcell_common::geom::rtree::SpatialIndex;

/// Existing geometry per layer that routing must keep its distance from.
pub type ObstacleMap = HashMap<LayerId, Region>;

/// Ring around the cell that stands in for an unknown abutting neighbour.
/// It starts `half_spacing` outside the cell box and is `margin` wide.
pub fn keep_out_ring(cell_box: &Rect, half_spacing: i64, margin: i64) -> Region {
    let cell = Region::from_rect(*cell_box);
    cell.sized(margin + half_spacing)
        .subtract(&cell.sized(half_spacing))
}

/// Adds a keep-out ring to every layer of `obstacles`, sized by half of the
/// largest spacing rule of that layer.
pub fn add_keep_out_rings(
    obstacles: &mut ObstacleMap,
    cell_box: &Rect,
    spacing: &SpacingGraph,
    margin: i64,
) {
    for (&layer, region) in obstacles.iter_mut() {
        let half = max_spacing(spacing, layer).unwrap_or(0) / 2;
        region.union_with(&keep_out_ring(cell_box, half, margin));
    }
}

/// Removes edges whose nodes would be closer to an obstacle than the spacing
/// rules allow, then drops nodes left without edges. Returns the number of
/// removed edges. Applying it twice removes nothing the second time.
pub fn remove_illegal_edges(
    graph: &mut RoutingGraph,
    obstacles: &ObstacleMap,
    spacing: &SpacingGraph,
    tech: &Technology,
) -> usize {
    let indices: HashMap<LayerId, SpatialIndex> = obstacles
        .iter()
        .map(|(&layer, region)| {
            let index = SpatialIndex::bulk_load(
                region.rects().iter().enumerate().map(|(i, r)| (*r, i)),
            );
            (layer, index)
        })
        .collect();

    let blocked = |layer: LayerId, half_width: i64, points: &[GridNode]| {
        rules_of(spacing, layer).into_iter().any(|(other, s)| {
            let Some(index) = indices.get(&other) else {
                return false;
            };
            let margin = half_width + s;
            points
                .iter()
                .filter_map(|n| n.pos())
                .any(|p| index.any_within(p, margin))
        })
    };

    let edges: Vec<(GridNode, GridNode, GridEdge)> =
        graph.all_edges().map(|(a, b, e)| (a, b, *e)).collect();
    let illegal: Vec<(GridNode, GridNode)> = edges
        .par_iter()
        .filter(|(a, b, e)| {
            let (Some(la), Some(lb)) = (a.layer(), b.layer()) else {
                return false;
            };
            if la == lb {
                let hw = tech.wire_width(la, e.orientation) / 2;
                blocked(la, hw, &[*a, *b])
            } else {
                debug_assert_eq!(a.pos(), b.pos(), "via edge endpoints must share a position");
                match e.layer {
                    Some(via) => blocked(via, tech.via_size(via) / 2, &[*a]),
                    None => false,
                }
            }
        })
        .map(|(a, b, _)| (*a, *b))
        .collect();

    for &(a, b) in &illegal {
        graph.remove_edge(a, b);
    }
    let isolated = remove_isolated_nodes(graph);
    log::debug!(
        "Legalization removed {} edges and {} isolated nodes",
        illegal.len(),
        isolated
    );
    illegal.len()
}

/// Removes wire edges that lie completely inside existing shapes of their
/// layer: those positions are already connected. Returns the number removed.
pub fn remove_preexisting_routed_edges(
    graph: &mut RoutingGraph,
    shapes: &[Shape],
    tech: &Technology,
) -> usize {
    let mut removed = 0;
    for (layer, _, _) in tech.routing_layers() {
        let region = Region::from_rects(shapes.iter().filter(|s| s.layer == layer).map(|s| s.rect));
        if region.is_empty() {
            continue;
        }
        let covered: Vec<(GridNode, GridNode)> = graph
            .all_edges()
            .filter_map(|(a, b, _)| {
                let (pa, pb) = (a.pos()?, b.pos()?);
                (a.on_layer(layer) && b.on_layer(layer)).then_some((a, b, pa, pb))
            })
            .filter(|(_, _, pa, pb)| region.contains_rect(&Rect::from_points(*pa, *pb)))
            .map(|(a, b, _, _)| (a, b))
            .collect();
        for (a, b) in covered {
            graph.remove_edge(a, b);
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::builder;
    use crate::spacing;
    use crate::utils::conversion::GridAxes;
    use stdcell_common::geom::point::Point;
    use stdcell_common::util::config::{LayerPairValue, TechConfig};

    fn tech() -> Technology {
        let mut cfg = TechConfig::default();
        cfg.routing_grid_pitch_x = 10;
        cfg.routing_grid_pitch_y = 10;
        cfg.grid_offset_x = 0;
        cfg.grid_offset_y = 0;
        cfg.wire_width = [("metal1".to_string(), 4), ("metal2".to_string(), 4)].into();
        cfg.via_size = [("via1".to_string(), 4)].into();
        cfg.min_spacing = vec![
            LayerPairValue::new("metal1", "metal1", 4),
            LayerPairValue::new("metal2", "metal2", 4),
        ];
        Technology::from_config(&cfg).unwrap()
    }

    fn grid(tech: &Technology) -> RoutingGraph {
        let axes = GridAxes::for_cell(&Rect::from_sides(0, 0, 20, 10), tech);
        builder::build(&axes, tech).unwrap()
    }

    #[test]
    fn obstacle_removes_nearby_edges_only_on_its_layer() {
        let tech = tech();
        let (m1, m2) = (tech.layer("metal1").unwrap(), tech.layer("metal2").unwrap());
        let sp = spacing::build(&tech.min_spacing);
        let mut g = grid(&tech);
        let obstacles: ObstacleMap =
            [(m1, Region::from_rect(Rect::from_sides(5, -2, 15, 2)))].into();

        let removed = remove_illegal_edges(&mut g, &obstacles, &sp, &tech);
        assert!(removed > 0);
        assert!(!g.contains_edge(GridNode::real(m1, 0, 0), GridNode::real(m1, 10, 0)));
        assert!(!g.contains_edge(GridNode::real(m1, 10, 0), GridNode::real(m1, 20, 0)));
        assert!(g.contains_edge(GridNode::real(m2, 0, 0), GridNode::real(m2, 10, 0)));
        // (0, 10) is 8 away from the obstacle, margin is 2 + 4
        assert!(g.contains_edge(GridNode::real(m1, 0, 10), GridNode::real(m1, 10, 10)));
        // vias have no spacing rule here
        assert!(g.contains_edge(GridNode::real(m1, 10, 0), GridNode::real(m2, 10, 0)));

        assert_eq!(remove_illegal_edges(&mut g, &obstacles, &sp, &tech), 0);
    }

    #[test]
    fn spacing_equal_to_the_rule_is_legal() {
        let tech = tech();
        let m1 = tech.layer("metal1").unwrap();
        let sp = spacing::build(&tech.min_spacing);
        let mut g = grid(&tech);
        // exactly 6 away from every node at y = 0 and 10
        let obstacles: ObstacleMap =
            [(m1, Region::from_rect(Rect::from_sides(0, 16, 20, 20)))].into();
        assert_eq!(remove_illegal_edges(&mut g, &obstacles, &sp, &tech), 0);
    }

    #[test]
    fn keep_out_ring_surrounds_the_cell() {
        let ring = keep_out_ring(&Rect::from_sides(0, 0, 20, 10), 2, 10);
        assert!(!ring.contains_point(Point::new(10, 5)));
        assert!(!ring.contains_point(Point::new(21, 5)));
        assert!(ring.contains_point(Point::new(23, 5)));
        assert!(ring.contains_point(Point::new(-12, -12)));
    }

    #[test]
    fn preexisting_wire_edges_are_removed() {
        let tech = tech();
        let m1 = tech.layer("metal1").unwrap();
        let mut g = grid(&tech);
        let shapes = vec![Shape {
            layer: m1,
            rect: Rect::from_sides(-2, -2, 2, 12),
            net: None,
        }];
        assert_eq!(remove_preexisting_routed_edges(&mut g, &shapes, &tech), 1);
        assert!(!g.contains_edge(GridNode::real(m1, 0, 0), GridNode::real(m1, 0, 10)));
        assert!(g.contains_edge(GridNode::real(m1, 0, 0), GridNode::real(m1, 10, 0)));
    }
}
