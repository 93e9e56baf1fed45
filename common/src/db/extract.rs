//! Geometric netlist extraction.
//!
//! Connectivity is derived from the drawn shapes alone. Net labels are only
//! used afterwards to name the resulting clusters.

use crate::db::core::Shape;
use crate::db::indices::{LayerId, NetId};
use crate::db::tech::{LayerKind, Technology};
use crate::geom::rect::Rect;
use crate::geom::rtree::SpatialIndex;
use std::collections::{HashMap, VecDeque};

/// One electrically connected group of shapes.
#[derive(Clone, Debug, Default)]
pub struct NetCluster {
    /// First label found in the cluster.
    pub net: Option<NetId>,
    /// Every distinct label in the cluster. More than one means a short.
    pub labels: Vec<NetId>,
    pub shapes: Vec<(LayerId, Rect)>,
}

impl NetCluster {
    pub fn is_short(&self) -> bool {
        self.labels.len() > 1
    }
}

pub trait NetlistExtractor: Sync {
    fn extract(&self, shapes: &[Shape], tech: &Technology) -> Vec<NetCluster>;
}

/// Shapes on one layer are connected when they touch; a via shape connects
/// the shapes of its bottom and top layers that it overlaps.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeometricExtractor;

impl NetlistExtractor for GeometricExtractor {
    fn extract(&self, shapes: &[Shape], tech: &Technology) -> Vec<NetCluster> {
        let mut by_layer: HashMap<LayerId, SpatialIndex> = HashMap::new();
        for (i, s) in shapes.iter().enumerate() {
            by_layer.entry(s.layer).or_default().insert(s.rect, i);
        }

        let n = shapes.len();
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, s) in shapes.iter().enumerate() {
            if let Some(index) = by_layer.get(&s.layer) {
                for j in index.query(s.rect) {
                    if j > i {
                        adj[i].push(j);
                        adj[j].push(i);
                    }
                }
            }
            if let LayerKind::Via { bottom, top } = *tech.kind(s.layer) {
                for metal in [bottom, top] {
                    let Some(index) = by_layer.get(&metal) else {
                        continue;
                    };
                    for j in index.query(s.rect) {
                        if shapes[j].rect.overlaps(&s.rect) {
                            adj[i].push(j);
                            adj[j].push(i);
                        }
                    }
                }
            }
        }

        let mut visited = vec![false; n];
        let mut clusters = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut queue = VecDeque::from([start]);
            let mut members = Vec::new();
            while let Some(u) = queue.pop_front() {
                members.push(u);
                for &v in &adj[u] {
                    if !visited[v] {
                        visited[v] = true;
                        queue.push_back(v);
                    }
                }
            }
            members.sort_unstable();

            let mut labels: Vec<NetId> = Vec::new();
            for &m in &members {
                if let Some(net) = shapes[m].net {
                    if !labels.contains(&net) {
                        labels.push(net);
                    }
                }
            }
            if labels.len() > 1 {
                log::error!("Short circuit of nets detected: {:?}", labels);
            }
            clusters.push(NetCluster {
                net: labels.first().copied(),
                labels,
                shapes: members
                    .iter()
                    .map(|&m| (shapes[m].layer, shapes[m].rect))
                    .collect(),
            });
        }
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::config::TechConfig;

    fn shape(tech: &Technology, layer: &str, r: [i64; 4], net: Option<u32>) -> Shape {
        Shape {
            layer: tech.layer(layer).unwrap(),
            rect: Rect::from_sides(r[0], r[1], r[2], r[3]),
            net: net.map(NetId),
        }
    }

    #[test]
    fn touching_shapes_form_one_cluster() {
        let tech = Technology::from_config(&TechConfig::default()).unwrap();
        let shapes = vec![
            shape(&tech, "metal1", [0, 0, 10, 10], Some(0)),
            shape(&tech, "metal1", [10, 0, 20, 10], None),
            shape(&tech, "metal1", [30, 0, 40, 10], Some(0)),
        ];
        let clusters = GeometricExtractor.extract(&shapes, &tech);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].shapes.len(), 2);
        assert_eq!(clusters[0].net, Some(NetId(0)));
        assert!(!clusters[0].is_short());
    }

    #[test]
    fn via_joins_layers_and_reports_short() {
        let tech = Technology::from_config(&TechConfig::default()).unwrap();
        let shapes = vec![
            shape(&tech, "metal1", [0, 0, 100, 20], Some(0)),
            shape(&tech, "via1", [40, 0, 60, 20], None),
            shape(&tech, "metal2", [40, 0, 60, 200], Some(1)),
        ];
        let clusters = GeometricExtractor.extract(&shapes, &tech);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].is_short());
        assert_eq!(clusters[0].labels, vec![NetId(0), NetId(1)]);
    }

    #[test]
    fn different_layers_without_via_stay_apart() {
        let tech = Technology::from_config(&TechConfig::default()).unwrap();
        let shapes = vec![
            shape(&tech, "metal1", [0, 0, 100, 20], Some(0)),
            shape(&tech, "metal2", [0, 0, 100, 20], Some(1)),
        ];
        assert_eq!(GeometricExtractor.extract(&shapes, &tech).len(), 2);
    }
}
