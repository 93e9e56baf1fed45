use crate::db::indices::LayerId;
use crate::error::ConfigError;
use crate::util::config::{LayerPairValue, TechConfig};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayerKind {
    Routing { horizontal: bool, vertical: bool },
    Via { bottom: LayerId, top: LayerId },
    Other,
}

#[derive(Clone, Debug)]
pub struct LayerData {
    pub name: String,
    pub index: LayerId,
    pub kind: LayerKind,
}

/// A via layer and the two layers it connects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViaDef {
    pub bottom: LayerId,
    pub top: LayerId,
    pub via: LayerId,
}

/// Technology rules resolved to layer ids. Read-only during routing.
#[derive(Clone, Debug)]
pub struct Technology {
    pub layers: Vec<LayerData>,
    pub layer_name_map: HashMap<String, LayerId>,
    pub via_defs: Vec<ViaDef>,
    pub wire_width: HashMap<LayerId, i64>,
    pub wire_width_horizontal: HashMap<LayerId, i64>,
    pub via_size: HashMap<LayerId, i64>,
    pub via_weights: HashMap<(LayerId, LayerId), f64>,
    pub multi_via: HashMap<(LayerId, LayerId), u32>,
    pub weights_horizontal: HashMap<LayerId, f64>,
    pub weights_vertical: HashMap<LayerId, f64>,
    pub min_spacing: Vec<(LayerId, LayerId, i64)>,
    pub minimum_enclosure: HashMap<(LayerId, LayerId), i64>,
    pub pitch_x: i64,
    pub pitch_y: i64,
    pub offset_x: i64,
    pub offset_y: i64,
    pub pin_layer: LayerId,
    /// Channel length. Gate terminals of a cell file sit at its center.
    pub gate_length: i64,
}

impl Technology {
    pub fn from_config(cfg: &TechConfig) -> Result<Self, ConfigError> {
        if cfg.routing_grid_pitch_x <= 0 || cfg.routing_grid_pitch_y <= 0 {
            return Err(ConfigError::InvalidPitch {
                x: cfg.routing_grid_pitch_x,
                y: cfg.routing_grid_pitch_y,
            });
        }

        let mut layers: Vec<LayerData> = Vec::new();
        let mut layer_name_map: HashMap<String, LayerId> = HashMap::new();

        for (name, dirs) in &cfg.routing_layers {
            let horizontal = dirs.contains('h');
            let vertical = dirs.contains('v');
            if (!horizontal && !vertical) || dirs.chars().any(|c| c != 'h' && c != 'v') {
                return Err(ConfigError::InvalidDirection {
                    layer: name.clone(),
                    direction: dirs.clone(),
                });
            }
            register_layer(
                &mut layers,
                &mut layer_name_map,
                name,
                LayerKind::Routing { horizontal, vertical },
            )?;
        }
        for name in &cfg.other_layers {
            register_layer(&mut layers, &mut layer_name_map, name, LayerKind::Other)?;
        }

        let mut via_defs = Vec::with_capacity(cfg.via_layers.len());
        for via in &cfg.via_layers {
            let bottom = lookup(&layer_name_map, &via.bottom)?;
            let top = lookup(&layer_name_map, &via.top)?;
            let id = register_layer(
                &mut layers,
                &mut layer_name_map,
                &via.via,
                LayerKind::Via { bottom, top },
            )?;
            via_defs.push(ViaDef {
                bottom,
                top,
                via: id,
            });
        }

        let resolve = |name: &str| lookup(&layer_name_map, name);
        let per_layer = |map: &std::collections::BTreeMap<String, i64>| {
            map.iter()
                .map(|(k, v)| Ok((resolve(k)?, *v)))
                .collect::<Result<HashMap<_, _>, ConfigError>>()
        };
        let per_layer_f = |map: &std::collections::BTreeMap<String, f64>| {
            map.iter()
                .map(|(k, v)| Ok((resolve(k)?, *v)))
                .collect::<Result<HashMap<_, _>, ConfigError>>()
        };
        let tech = Self {
            via_defs,
            wire_width: per_layer(&cfg.wire_width)?,
            wire_width_horizontal: per_layer(&cfg.wire_width_horizontal)?,
            via_size: per_layer(&cfg.via_size)?,
            via_weights: pairs(&cfg.via_weights, &resolve)?
                .into_iter()
                .map(|(a, b, w)| ((a, b), w))
                .collect(),
            multi_via: pairs(&cfg.multi_via, &resolve)?
                .into_iter()
                .map(|(a, b, n)| ((a, b), n))
                .collect(),
            weights_horizontal: per_layer_f(&cfg.weights_horizontal)?,
            weights_vertical: per_layer_f(&cfg.weights_vertical)?,
            min_spacing: pairs(&cfg.min_spacing, &resolve)?,
            minimum_enclosure: pairs(&cfg.minimum_enclosure, &resolve)?
                .into_iter()
                .map(|(a, b, e)| ((a, b), e))
                .collect(),
            pitch_x: cfg.routing_grid_pitch_x,
            pitch_y: cfg.routing_grid_pitch_y,
            offset_x: cfg.grid_offset_x,
            offset_y: cfg.grid_offset_y,
            pin_layer: resolve(&cfg.pin_layer)?,
            gate_length: cfg.gate_length,
            layers,
            layer_name_map,
        };
        Ok(tech)
    }

    pub fn layer(&self, name: &str) -> Result<LayerId, ConfigError> {
        lookup(&self.layer_name_map, name)
    }

    pub fn layer_name(&self, id: LayerId) -> &str {
        &self.layers[id.index()].name
    }

    pub fn kind(&self, id: LayerId) -> &LayerKind {
        &self.layers[id.index()].kind
    }

    pub fn is_routing(&self, id: LayerId) -> bool {
        matches!(self.kind(id), LayerKind::Routing { .. })
    }

    pub fn is_via(&self, id: LayerId) -> bool {
        matches!(self.kind(id), LayerKind::Via { .. })
    }

    /// Routing layers with their allowed (horizontal, vertical) directions.
    pub fn routing_layers(&self) -> impl Iterator<Item = (LayerId, bool, bool)> + '_ {
        self.layers.iter().filter_map(|l| match l.kind {
            LayerKind::Routing {
                horizontal,
                vertical,
            } => Some((l.index, horizontal, vertical)),
            _ => None,
        })
    }

    pub fn via_def(&self, via: LayerId) -> Option<&ViaDef> {
        self.via_defs.iter().find(|d| d.via == via)
    }

    pub fn wire_width(&self, layer: LayerId, orientation: Option<Orientation>) -> i64 {
        let horizontal = match orientation {
            Some(Orientation::Horizontal) => self.wire_width_horizontal.get(&layer),
            _ => None,
        };
        horizontal
            .or_else(|| self.wire_width.get(&layer))
            .copied()
            .unwrap_or(0)
    }

    pub fn via_size(&self, via: LayerId) -> i64 {
        self.via_size.get(&via).copied().unwrap_or(0)
    }

    /// Half of the widest shape a grid node on `layer` may carry.
    pub fn half_width(&self, layer: LayerId) -> i64 {
        match self.kind(layer) {
            LayerKind::Via { .. } => self.via_size(layer) / 2,
            LayerKind::Routing { .. } => {
                let w = self.wire_width(layer, None);
                let wh = self.wire_width(layer, Some(Orientation::Horizontal));
                w.max(wh) / 2
            }
            LayerKind::Other => 0,
        }
    }

    pub fn via_weight(&self, a: LayerId, b: LayerId) -> Option<f64> {
        self.via_weights
            .get(&(a, b))
            .or_else(|| self.via_weights.get(&(b, a)))
            .copied()
    }

    pub fn multi_via(&self, a: LayerId, b: LayerId) -> u32 {
        self.multi_via
            .get(&(a, b))
            .or_else(|| self.multi_via.get(&(b, a)))
            .copied()
            .unwrap_or(1)
    }

    pub fn enclosure(&self, metal: LayerId, via: LayerId) -> i64 {
        self.minimum_enclosure
            .get(&(metal, via))
            .copied()
            .unwrap_or(0)
    }

    /// Cost per unit of wire length.
    pub fn wire_weight(&self, layer: LayerId, orientation: Orientation) -> f64 {
        let table = match orientation {
            Orientation::Horizontal => &self.weights_horizontal,
            Orientation::Vertical => &self.weights_vertical,
        };
        table.get(&layer).copied().unwrap_or(1.0)
    }
}

fn lookup(map: &HashMap<String, LayerId>, name: &str) -> Result<LayerId, ConfigError> {
    map.get(name)
        .copied()
        .ok_or_else(|| ConfigError::UnknownLayer(name.to_string()))
}

/// Adds a layer, or returns the existing id if it was declared with the same role.
fn register_layer(
    layers: &mut Vec<LayerData>,
    names: &mut HashMap<String, LayerId>,
    name: &str,
    kind: LayerKind,
) -> Result<LayerId, ConfigError> {
    if let Some(&id) = names.get(name) {
        if layers[id.index()].kind != kind {
            return Err(ConfigError::ConflictingLayer(name.to_string()));
        }
        return Ok(id);
    }
    let id = LayerId::new(layers.len());
    names.insert(name.to_string(), id);
    layers.push(LayerData {
        name: name.to_string(),
        index: id,
        kind,
    });
    Ok(id)
}

fn pairs<T: Copy>(
    list: &[LayerPairValue<T>],
    resolve: &dyn Fn(&str) -> Result<LayerId, ConfigError>,
) -> Result<Vec<(LayerId, LayerId, T)>, ConfigError> {
    list.iter()
        .map(|p| Ok((resolve(&p.a)?, resolve(&p.b)?, p.value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_resolves() {
        let tech = Technology::from_config(&TechConfig::default()).unwrap();
        let m1 = tech.layer("metal1").unwrap();
        let m2 = tech.layer("metal2").unwrap();
        let v1 = tech.layer("via1").unwrap();
        assert!(tech.is_routing(m1));
        assert!(tech.is_via(v1));
        assert_eq!(tech.via_weight(m2, m1), Some(400.0));
        assert_eq!(tech.half_width(v1), 40);
        assert_eq!(tech.pin_layer, m2);
    }

    #[test]
    fn unknown_layer_is_rejected() {
        let mut cfg = TechConfig::default();
        cfg.min_spacing
            .push(LayerPairValue::new("metal1", "metal9", 100));
        assert!(matches!(
            Technology::from_config(&cfg),
            Err(ConfigError::UnknownLayer(name)) if name == "metal9"
        ));
    }

    #[test]
    fn bad_direction_is_rejected() {
        let mut cfg = TechConfig::default();
        cfg.routing_layers
            .insert("metal1".to_string(), "x".to_string());
        assert!(Technology::from_config(&cfg).is_err());
    }
}
