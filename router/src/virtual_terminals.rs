//! Virtual hubs that turn multi-terminal nets into single-graph targets.

use crate::error::RoutingError;
use crate::graph::{GridEdge, GridNode, RoutingGraph, total_weight};
use crate::terminals::Terminal;
use std::collections::{BTreeMap, HashSet};
use stdcell_common::db::indices::{LayerId, NetId};
use stdcell_common::geom::rect::Rect;
use stdcell_common::util::config::RoutingConfig;

/// Virtual nodes each net has to connect, terminal hubs first.
pub type Signals = BTreeMap<NetId, Vec<GridNode>>;

/// A virtual edge must cost more than any physical path, otherwise the
/// router could shortcut through a hub.
pub fn check_virtual_weight(graph: &RoutingGraph, weight: f64) -> Result<(), RoutingError> {
    let grid_weight = total_weight(graph);
    if weight > grid_weight {
        Ok(())
    } else {
        Err(RoutingError::VirtualWeightTooLow {
            weight,
            grid_weight,
        })
    }
}

/// Adds one `Virtual` node per terminal and one `VirtualPin` node per I/O
/// pin. Pin hubs connect to every pin-layer node not used by a terminal,
/// preferring nodes close to the vertical center of the cell.
pub fn embed(
    graph: &mut RoutingGraph,
    terminals: &[Terminal],
    io_pins: &[NetId],
    pin_layer: LayerId,
    cell_box: &Rect,
    config: &RoutingConfig,
) -> Signals {
    let mut signals: Signals = BTreeMap::new();
    let terminal_link = GridEdge::virtual_link(config.virtual_terminal_weight);

    for t in terminals {
        let hubs = signals.entry(t.net).or_default();
        let hub = GridNode::Virtual {
            net: t.net,
            id: hubs.len() as u32,
        };
        hubs.push(hub);
        for &n in &t.nodes {
            graph.add_edge(hub, n, terminal_link);
        }
    }

    let used: HashSet<GridNode> = terminals.iter().flat_map(|t| t.nodes.iter().copied()).collect();
    let free: Vec<GridNode> = graph
        .nodes()
        .filter(|n| n.on_layer(pin_layer) && !used.contains(n))
        .collect();
    let center_y = cell_box.center().y;

    for (id, &net) in io_pins.iter().enumerate() {
        let hub = GridNode::VirtualPin { net, id: id as u32 };
        for &n in &free {
            let Some(pos) = n.pos() else {
                continue;
            };
            let w = config.virtual_pin_weight + config.pin_center_weight * (pos.y - center_y).abs() as f64;
            graph.add_edge(hub, n, GridEdge::virtual_link(w));
        }
        if free.is_empty() {
            log::warn!("No free node on the pin layer for I/O pin {:?}", net);
        }
        signals.entry(net).or_default().push(hub);
    }

    log::debug!(
        "Embedded virtual terminals for {} nets ({} I/O pins)",
        signals.len(),
        io_pins.len()
    );
    signals
}
