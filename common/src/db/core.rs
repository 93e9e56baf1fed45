use crate::db::indices::*;
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use std::collections::HashMap;

/// One rectangle of input geometry. `net` is the label attached to the
/// shape; unlabelled shapes are obstacles unless extraction connects them.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub layer: LayerId,
    pub rect: Rect,
    pub net: Option<NetId>,
}

#[derive(Clone, Debug)]
pub struct NetData {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct TransistorTerminal {
    pub net: NetId,
    pub layer: LayerId,
    pub position: Point<i64>,
}

#[derive(Clone, Debug)]
pub struct TransistorData {
    pub name: String,
    pub terminals: Vec<TransistorTerminal>,
}

/// Input of one routing invocation: the placed cell with its terminal shapes.
#[derive(Clone, Debug)]
pub struct CellLayout {
    pub name: String,
    pub abutment_box: Rect,
    pub nets: Vec<NetData>,
    pub net_name_map: HashMap<String, NetId>,
    pub shapes: Vec<Shape>,
    pub io_pins: Vec<NetId>,
    /// Restricts routing to these nets when set.
    pub route_nets: Option<Vec<NetId>>,
    pub transistors: Vec<TransistorData>,
}

impl CellLayout {
    pub fn new(name: impl Into<String>, abutment_box: Rect) -> Self {
        Self {
            name: name.into(),
            abutment_box,
            nets: Vec::new(),
            net_name_map: HashMap::new(),
            shapes: Vec::new(),
            io_pins: Vec::new(),
            route_nets: None,
            transistors: Vec::new(),
        }
    }

    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    pub fn add_net(&mut self, name: &str) -> NetId {
        if let Some(&id) = self.net_name_map.get(name) {
            return id;
        }
        let id = NetId::new(self.nets.len());
        self.nets.push(NetData {
            name: name.to_string(),
        });
        self.net_name_map.insert(name.to_string(), id);
        id
    }

    pub fn net_id(&self, name: &str) -> Option<NetId> {
        self.net_name_map.get(name).copied()
    }

    pub fn net_name(&self, net: NetId) -> &str {
        net.lookup(&self.nets).map_or("<unknown>", |n| n.name.as_str())
    }

    pub fn add_shape(&mut self, layer: LayerId, rect: Rect, net: Option<NetId>) -> ShapeId {
        let id = ShapeId::new(self.shapes.len());
        self.shapes.push(Shape { layer, rect, net });
        id
    }

    pub fn add_io_pin(&mut self, net: NetId) {
        if !self.io_pins.contains(&net) {
            self.io_pins.push(net);
        }
    }

    /// Nets that must be routed: the explicit subset if one was given,
    /// otherwise every declared net.
    pub fn expected_nets(&self) -> Vec<NetId> {
        match &self.route_nets {
            Some(nets) => nets.clone(),
            None => (0..self.nets.len()).map(NetId::new).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// Manhattan polyline. Every vertex is covered by a `width` x `width`
    /// square, so the ends extend half the width beyond the end points.
    Path { points: Vec<Point<i64>>, width: i64 },
    Box(Rect),
}

impl Geometry {
    /// Rectangle decomposition of the drawn area.
    pub fn to_rects(&self) -> Vec<Rect> {
        match self {
            Geometry::Box(r) => vec![*r],
            Geometry::Path { points, width } => {
                let hw = width / 2;
                if points.len() == 1 {
                    return vec![Rect::centered(points[0], hw)];
                }
                points
                    .windows(2)
                    .map(|w| Rect::from_points(w[0], w[1]).enlarged(hw))
                    .collect()
            }
        }
    }

    pub fn bbox(&self) -> Rect {
        self.to_rects()
            .into_iter()
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawnShape {
    pub layer: LayerId,
    pub geometry: Geometry,
    pub net: Option<NetId>,
    pub label: Option<String>,
}

/// Output sink for routed geometry.
#[derive(Clone, Debug, Default)]
pub struct ShapeCollection {
    shapes: Vec<DrawnShape>,
}

impl ShapeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_path(
        &mut self,
        layer: LayerId,
        points: Vec<Point<i64>>,
        width: i64,
        net: Option<NetId>,
    ) {
        self.shapes.push(DrawnShape {
            layer,
            geometry: Geometry::Path { points, width },
            net,
            label: None,
        });
    }

    pub fn insert_box(&mut self, layer: LayerId, rect: Rect, net: Option<NetId>) {
        self.shapes.push(DrawnShape {
            layer,
            geometry: Geometry::Box(rect),
            net,
            label: None,
        });
    }

    /// Pin box carrying a text label.
    pub fn insert_label(&mut self, layer: LayerId, rect: Rect, net: NetId, label: String) {
        self.shapes.push(DrawnShape {
            layer,
            geometry: Geometry::Box(rect),
            net: Some(net),
            label: Some(label),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawnShape> + '_ {
        self.shapes.iter()
    }

    pub fn on_layer(&self, layer: LayerId) -> impl Iterator<Item = &DrawnShape> + '_ {
        self.shapes.iter().filter(move |s| s.layer == layer)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Flattens the drawn geometry into labelled input shapes, e.g. to run
    /// extraction over input plus routing.
    pub fn to_shapes(&self) -> Vec<Shape> {
        self.shapes
            .iter()
            .flat_map(|s| {
                s.geometry.to_rects().into_iter().map(|rect| Shape {
                    layer: s.layer,
                    rect,
                    net: s.net,
                })
            })
            .collect()
    }
}
