//! TOML cell files.
//!
//! ```toml
//! name = "INV"
//! abutment_box = [0, 0, 400, 2000]
//! io_pins = ["A", "Y"]
//!
//! [[shapes]]
//! layer = "metal1"
//! rect = [80, 100, 120, 400]
//! net = "A"
//!
//! [[transistors]]
//! name = "MN0"
//! terminals = [{ net = "Y", layer = "ndiff", x = 250, y = 500 }]
//! gates = [{ net = "A", layer = "poly", x = 100, y = 500 }]
//! ```
//!
//! A gate is given by the left edge of its channel; the terminal sits at the
//! channel center, `x + gate_length / 2`.

use crate::db::core::{CellLayout, TransistorData, TransistorTerminal};
use crate::db::tech::Technology;
use crate::error::ConfigError;
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CellFile {
    name: String,
    abutment_box: Vec<i64>,
    /// When present, every referenced net must be listed here.
    #[serde(default)]
    nets: Option<Vec<String>>,
    #[serde(default)]
    io_pins: Vec<String>,
    #[serde(default)]
    route_nets: Option<Vec<String>>,
    #[serde(default)]
    shapes: Vec<ShapeEntry>,
    #[serde(default)]
    transistors: Vec<TransistorEntry>,
}

#[derive(Debug, Deserialize)]
struct ShapeEntry {
    layer: String,
    rect: Vec<i64>,
    #[serde(default)]
    net: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransistorEntry {
    name: String,
    #[serde(default)]
    terminals: Vec<TerminalEntry>,
    #[serde(default)]
    gates: Vec<TerminalEntry>,
}

#[derive(Debug, Deserialize)]
struct TerminalEntry {
    net: String,
    layer: String,
    x: i64,
    y: i64,
}

pub fn parse(filename: &str, tech: &Technology) -> Result<CellLayout> {
    let text = std::fs::read_to_string(filename)
        .with_context(|| format!("failed to read cell file {}", filename))?;
    parse_str(&text, tech).with_context(|| format!("invalid cell file {}", filename))
}

pub fn parse_str(text: &str, tech: &Technology) -> Result<CellLayout> {
    let file: CellFile = toml::from_str(text)?;
    let abutment_box = to_rect("abutment_box", &file.abutment_box)?;
    let mut cell = CellLayout::new(file.name, abutment_box);

    if let Some(nets) = &file.nets {
        for n in nets {
            cell.add_net(n);
        }
    }
    let declared = file.nets.is_some();
    let net = |cell: &mut CellLayout, name: &str| {
        if declared {
            cell.net_id(name)
                .ok_or_else(|| ConfigError::UnknownNet(name.to_string()))
        } else {
            Ok(cell.add_net(name))
        }
    };

    for s in &file.shapes {
        let layer = tech.layer(&s.layer)?;
        let rect = to_rect(&s.layer, &s.rect)?;
        let id = match &s.net {
            Some(n) => Some(net(&mut cell, n)?),
            None => None,
        };
        cell.add_shape(layer, rect, id);
    }
    for p in &file.io_pins {
        let id = net(&mut cell, p)?;
        cell.add_io_pin(id);
    }
    for t in &file.transistors {
        let mut terminals = Vec::with_capacity(t.terminals.len());
        for term in &t.terminals {
            terminals.push(TransistorTerminal {
                net: net(&mut cell, &term.net)?,
                layer: tech.layer(&term.layer)?,
                position: Point::new(term.x, term.y),
            });
        }
        for gate in &t.gates {
            terminals.push(TransistorTerminal {
                net: net(&mut cell, &gate.net)?,
                layer: tech.layer(&gate.layer)?,
                position: Point::new(gate.x + tech.gate_length / 2, gate.y),
            });
        }
        cell.transistors.push(TransistorData {
            name: t.name.clone(),
            terminals,
        });
    }
    if let Some(subset) = &file.route_nets {
        let mut ids = Vec::with_capacity(subset.len());
        for n in subset {
            ids.push(net(&mut cell, n)?);
        }
        cell.route_nets = Some(ids);
    }

    log::info!(
        "Parsed cell '{}': {} shapes, {} nets, {} transistors",
        cell.name,
        cell.shapes.len(),
        cell.num_nets(),
        cell.transistors.len()
    );
    Ok(cell)
}

fn to_rect(layer: &str, coords: &[i64]) -> Result<Rect, ConfigError> {
    match coords {
        [x0, y0, x1, y1] => Ok(Rect::from_sides(*x0, *y0, *x1, *y1)),
        _ => Err(ConfigError::MalformedRect {
            layer: layer.to_string(),
            coords: coords.to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::config::TechConfig;

    #[test]
    fn parses_shapes_and_pins() {
        let tech = Technology::from_config(&TechConfig::default()).unwrap();
        let text = r#"
            name = "INV"
            abutment_box = [0, 0, 400, 2000]
            io_pins = ["A"]
            route_nets = ["A", "Y"]

            [[shapes]]
            layer = "metal1"
            rect = [120, 100, 80, 400]
            net = "A"

            [[shapes]]
            layer = "metal2"
            rect = [0, 0, 10, 10]
        "#;
        let cell = parse_str(text, &tech).unwrap();
        assert_eq!(cell.shapes.len(), 2);
        assert_eq!(cell.shapes[0].rect, Rect::from_sides(80, 100, 120, 400));
        assert_eq!(cell.shapes[1].net, None);
        let a = cell.net_id("A").unwrap();
        assert_eq!(cell.io_pins, vec![a]);
        assert_eq!(cell.route_nets.as_ref().map(|n| n.len()), Some(2));
    }

    #[test]
    fn gate_terminal_sits_at_the_channel_center() {
        let mut cfg = TechConfig::default();
        cfg.other_layers = vec!["poly".to_string()];
        cfg.gate_length = 60;
        let tech = Technology::from_config(&cfg).unwrap();
        let text = r#"
            name = "INV"
            abutment_box = [0, 0, 400, 2000]

            [[transistors]]
            name = "MN0"
            terminals = [{ net = "Y", layer = "metal1", x = 250, y = 500 }]
            gates = [{ net = "A", layer = "poly", x = 100, y = 500 }]
        "#;
        let cell = parse_str(text, &tech).unwrap();
        let terminals = &cell.transistors[0].terminals;
        assert_eq!(terminals.len(), 2);
        assert_eq!(terminals[0].position, Point::new(250, 500));
        assert_eq!(terminals[1].net, cell.net_id("A").unwrap());
        assert_eq!(terminals[1].layer, tech.layer("poly").unwrap());
        assert_eq!(terminals[1].position, Point::new(130, 500));
    }

    #[test]
    fn undeclared_net_is_rejected() {
        let tech = Technology::from_config(&TechConfig::default()).unwrap();
        let text = r#"
            name = "X"
            abutment_box = [0, 0, 10, 10]
            nets = ["A"]
            io_pins = ["B"]
        "#;
        assert!(parse_str(text, &tech).is_err());
    }

    #[test]
    fn short_rect_is_rejected() {
        let tech = Technology::from_config(&TechConfig::default()).unwrap();
        let text = r#"
            name = "X"
            abutment_box = [0, 0, 10]
        "#;
        assert!(parse_str(text, &tech).is_err());
    }
}
