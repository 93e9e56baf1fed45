//! Routing of one cell, from input shapes to drawn wires.

use crate::algo::{GraphRouter, RoutingTree};
use crate::conflicts::{self, ConflictSet, ReservedNodes};
use crate::draw;
use crate::error::RoutingError;
use crate::graph::{self, GridNode, RoutingGraph};
use crate::grid::legalize::{self, ObstacleMap};
use crate::grid::{builder, via_nodes};
use crate::spacing::{self, SpacingGraph};
use crate::terminals::{self, NodeLocator, Terminal, TransistorLayout};
use crate::utils::conversion::GridAxes;
use crate::virtual_terminals::{self, Signals};
use std::collections::{BTreeMap, BTreeSet};
use stdcell_common::db::core::{CellLayout, ShapeCollection};
use stdcell_common::db::extract::{NetCluster, NetlistExtractor};
use stdcell_common::db::indices::NetId;
use stdcell_common::db::tech::Technology;
use stdcell_common::util::config::RoutingConfig;
use stdcell_common::util::profiler::ScopedTimer;

/// Counters of one routing invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoutingStats {
    pub illegal_edges_removed: usize,
    pub preexisting_edges_removed: usize,
    pub via_nodes_inserted: usize,
    pub terminals_found: usize,
    pub nodes_pruned: usize,
    pub conflicts_indexed: usize,
    pub nets_routed: usize,
    pub nets_failed: usize,
}

/// Everything derived for one cell before routing.
#[derive(Debug)]
pub struct RoutingContext {
    pub graph: RoutingGraph,
    pub spacing: SpacingGraph,
    /// `spacing` extended with via-to-metal and via-to-via rules.
    pub via_spacing: SpacingGraph,
    pub terminals: Vec<Terminal>,
    pub signals: Signals,
    pub reserved: ReservedNodes,
    pub conflicts: ConflictSet,
    pub stats: RoutingStats,
}

#[derive(Debug)]
pub enum RouteOutcome {
    Routed {
        trees: BTreeMap<NetId, RoutingTree>,
        failed: BTreeSet<NetId>,
        shapes: ShapeCollection,
        context: Box<RoutingContext>,
    },
    /// Debug mode: the routing graph drawn for inspection, nothing routed.
    GraphDump {
        graph: RoutingGraph,
        shapes: ShapeCollection,
        reason: String,
    },
}

impl RouteOutcome {
    pub fn shapes(&self) -> &ShapeCollection {
        match self {
            RouteOutcome::Routed { shapes, .. } | RouteOutcome::GraphDump { shapes, .. } => shapes,
        }
    }
}

pub struct RoutingEngine<'a> {
    pub tech: &'a Technology,
    pub config: &'a RoutingConfig,
}

impl<'a> RoutingEngine<'a> {
    pub fn new(tech: &'a Technology, config: &'a RoutingConfig) -> Self {
        Self { tech, config }
    }

    fn dump(&self, graph: RoutingGraph, reason: String) -> RouteOutcome {
        log::error!("{}", reason);
        let mut shapes = ShapeCollection::new();
        draw::draw_routing_graph(&graph, self.tech, self.config, &mut shapes);
        RouteOutcome::GraphDump {
            graph,
            shapes,
            reason,
        }
    }

    /// Obstacles are the shapes of clusters not carrying any routed net.
    /// Every layer with shapes gets an entry, so it also gets a keep-out ring.
    fn obstacles(&self, cell: &CellLayout, clusters: &[NetCluster], nets: &BTreeSet<NetId>) -> ObstacleMap {
        let mut obstacles = ObstacleMap::new();
        for s in &cell.shapes {
            obstacles.entry(s.layer).or_default();
        }
        for cluster in clusters {
            if cluster.labels.iter().any(|l| nets.contains(l)) {
                continue;
            }
            for (layer, rect) in &cluster.shapes {
                obstacles.entry(*layer).or_default().insert(*rect);
            }
        }
        obstacles
    }

    pub fn route_cell(
        &self,
        cell: &CellLayout,
        extractor: &dyn NetlistExtractor,
        router: &dyn GraphRouter,
    ) -> Result<RouteOutcome, RoutingError> {
        let _timer = ScopedTimer::new("Cell routing");
        let tech = self.tech;
        let debug = self.config.debug_routing_graph;
        let mut stats = RoutingStats::default();

        // Collect
        let mut nets = BTreeSet::new();
        for net in cell.expected_nets() {
            if net.lookup(&cell.nets).is_none() {
                return Err(RoutingError::UnknownNet(format!("{:?}", net)));
            }
            nets.insert(net);
        }
        log::info!("Routing cell '{}' ({} nets)", cell.name, nets.len());
        let clusters = extractor.extract(&cell.shapes, tech);

        // Build grid
        let transistors: Vec<&dyn TransistorLayout> =
            cell.transistors.iter().map(|t| t as &dyn TransistorLayout).collect();
        let extra_xs: Vec<i64> = transistors
            .iter()
            .flat_map(|t| t.terminal_nodes().into_iter())
            .filter(|(net, _)| nets.contains(net))
            .flat_map(|(_, points)| points.into_iter().map(|(_, p)| p.x))
            .collect();
        let axes = GridAxes::for_cell(&cell.abutment_box, tech).with_extra_xs(extra_xs);
        let mut graph = builder::build(&axes, tech)?;

        // Legalize
        let spacing_graph = spacing::build(&tech.min_spacing);
        let mut obstacles = self.obstacles(cell, &clusters, &nets);
        if self.config.abutment_keep_out {
            legalize::add_keep_out_rings(
                &mut obstacles,
                &cell.abutment_box,
                &spacing_graph,
                self.config.keep_out_margin,
            );
        }
        stats.illegal_edges_removed =
            legalize::remove_illegal_edges(&mut graph, &obstacles, &spacing_graph, tech);
        stats.preexisting_edges_removed =
            legalize::remove_preexisting_routed_edges(&mut graph, &cell.shapes, tech);

        // Insert vias
        let before = graph.node_count();
        let mut graph = via_nodes::insert(&graph);
        stats.via_nodes_inserted = graph.node_count() - before;

        // Extract terminals
        let mut terminal_list = {
            let locator = NodeLocator::new(&graph, tech);
            let labelled = cell
                .shapes
                .iter()
                .filter_map(|s| Some((s.net?, s.layer, s.rect)))
                .filter(|(net, _, _)| nets.contains(net));
            let by_shape = terminals::extract_terminal_nodes(&locator, labelled);
            let by_lvs = terminals::extract_terminal_nodes_by_lvs(&locator, &clusters, &nets);
            terminals::merge_terminals(by_shape, &by_lvs)
        };

        // Transistor terminals
        terminal_list.extend(terminals::embed_transistor_terminals(
            &mut graph,
            &transistors,
            &nets,
            self.config.transistor_terminal_weight,
        ));
        stats.terminals_found = terminal_list.len();
        log::debug!("Found {} terminals", terminal_list.len());

        // Completeness
        let missing: Vec<String> = nets
            .iter()
            .filter(|&&net| !terminal_list.iter().any(|t| t.net == net))
            .map(|&net| cell.net_name(net).to_string())
            .collect();
        if !missing.is_empty() {
            if debug {
                return Ok(self.dump(graph, format!("Nets without terminals: {:?}", missing)));
            }
            return Err(RoutingError::MissingTerminals(missing));
        }

        // Virtual terminals
        virtual_terminals::check_virtual_weight(&graph, self.config.virtual_terminal_weight)?;
        let io_pins: Vec<NetId> = cell
            .io_pins
            .iter()
            .copied()
            .filter(|n| nets.contains(n))
            .collect();
        let signals = virtual_terminals::embed(
            &mut graph,
            &terminal_list,
            &io_pins,
            tech.pin_layer,
            &cell.abutment_box,
            self.config,
        );

        // Prune and check connectivity
        stats.nodes_pruned = graph::prune_dead_ends(&mut graph);
        let components = graph::component_count(&graph);
        if components != 1 {
            if debug {
                return Ok(self.dump(
                    graph,
                    format!("Routing graph has {} components", components),
                ));
            }
            return Err(RoutingError::Disconnected { components });
        }
        if debug {
            return Ok(self.dump(graph, "Debug mode: routing skipped".to_string()));
        }

        // Conflicts and reservations
        let via_spacing = spacing::extend_with_via_rules(&spacing_graph, &tech.via_defs, tech);
        let conflict_set = {
            let _timer = ScopedTimer::new("Conflict indexing");
            conflicts::build_conflicts(&graph, &via_spacing, tech)
        };
        stats.conflicts_indexed = conflict_set.values().map(|c| c.len()).sum();
        let reserved = conflicts::reserve_nodes(&terminal_list, &conflict_set);

        log::info!(
            "Routing graph: {} nodes, {} edges, {} terminals, {} conflicts",
            graph.node_count(),
            graph.edge_count(),
            stats.terminals_found,
            stats.conflicts_indexed
        );

        // Route
        let output = {
            let _timer = ScopedTimer::new("Graph routing");
            router.route(&graph, &signals, &reserved, &conflict_set, &|n: &GridNode| n.is_virtual())?
        };
        stats.nets_routed = output.trees.len();
        stats.nets_failed = output.failed.len();
        for net in &output.failed {
            log::error!("Net '{}' could not be routed", cell.net_name(*net));
        }

        // Draw
        let mut shapes = ShapeCollection::new();
        for (&net, tree) in &output.trees {
            draw::draw_routing_tree(tree, net, cell.net_name(net), tech, &via_spacing, &mut shapes);
        }
        log::info!(
            "Cell '{}': {} nets routed, {} failed, {} shapes drawn",
            cell.name,
            stats.nets_routed,
            stats.nets_failed,
            shapes.len()
        );

        Ok(RouteOutcome::Routed {
            trees: output.trees,
            failed: output.failed,
            shapes,
            context: Box::new(RoutingContext {
                graph,
                spacing: spacing_graph,
                via_spacing,
                terminals: terminal_list,
                signals,
                reserved,
                conflicts: conflict_set,
                stats,
            }),
        })
    }
}
