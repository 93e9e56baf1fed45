use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use stdcell_common::db::core::{CellLayout, ShapeCollection};
use stdcell_common::db::extract::GeometricExtractor;
use stdcell_common::db::parser::cell;
use stdcell_common::db::tech::Technology;
use stdcell_common::util::config::Config;
use stdcell_common::util::{check, generator, logger, visualization};
use stdcell_router::algo::pathfinder::PathFinderRouter;
use stdcell_router::engine::{RouteOutcome, RoutingStats};
use stdcell_router::route_cells;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Route every cell file listed in the config (or given on the command line).
    Route {
        #[arg(value_name = "CELL")]
        cells: Vec<String>,
    },
    /// Write a random benchmark cell file.
    Generate {
        #[arg(long, default_value_t = 4)]
        nets: usize,
        #[arg(long, default_value_t = 12)]
        tracks: i64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "inputs/random_cell.toml")]
        output: String,
    },
}

#[derive(Serialize)]
struct CellReport {
    cell: String,
    status: &'static str,
    failed_nets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<StatsReport>,
    shapes: Vec<ShapeRecord>,
}

#[derive(Serialize)]
struct StatsReport {
    illegal_edges_removed: usize,
    preexisting_edges_removed: usize,
    via_nodes_inserted: usize,
    terminals_found: usize,
    nodes_pruned: usize,
    conflicts_indexed: usize,
    nets_routed: usize,
    nets_failed: usize,
}

impl From<&RoutingStats> for StatsReport {
    fn from(s: &RoutingStats) -> Self {
        Self {
            illegal_edges_removed: s.illegal_edges_removed,
            preexisting_edges_removed: s.preexisting_edges_removed,
            via_nodes_inserted: s.via_nodes_inserted,
            terminals_found: s.terminals_found,
            nodes_pruned: s.nodes_pruned,
            conflicts_indexed: s.conflicts_indexed,
            nets_routed: s.nets_routed,
            nets_failed: s.nets_failed,
        }
    }
}

#[derive(Serialize)]
struct ShapeRecord {
    layer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    net: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    rects: Vec<[i64; 4]>,
}

fn shape_records(cell: &CellLayout, shapes: &ShapeCollection, tech: &Technology) -> Vec<ShapeRecord> {
    shapes
        .iter()
        .map(|s| ShapeRecord {
            layer: tech.layer_name(s.layer).to_string(),
            net: s.net.map(|n| cell.net_name(n).to_string()),
            label: s.label.clone(),
            rects: s
                .geometry
                .to_rects()
                .iter()
                .map(|r| [r.min.x, r.min.y, r.max.x, r.max.y])
                .collect(),
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config: Config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .with_context(|| format!("Failed to read config file {:?}", args.config))?;
        toml::from_str(&config_str).context("Failed to parse config TOML")?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    let command = args.command.unwrap_or(Commands::Route { cells: Vec::new() });

    match command {
        Commands::Generate {
            nets,
            tracks,
            seed,
            output,
        } => {
            prepare_output_dir(&output)?;
            generator::generate_random_cell(
                &output,
                nets,
                tracks,
                config.tech.routing_grid_pitch_x,
                seed,
            )?;
            log::info!("Generated: {}", output);
        }
        Commands::Route { cells } => {
            let files = if cells.is_empty() {
                config.input.cell_files.clone()
            } else {
                cells
            };
            if files.is_empty() {
                return Err(anyhow::anyhow!(
                    "No cell files given. List them in [input] cell_files or on the command line."
                ));
            }
            let failures = run_routing(&config, &files)?;
            if failures > 0 {
                log::error!("{} of {} cells failed", failures, files.len());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Routes all cells and writes one report per cell. Returns the number of
/// cells that failed to route or verify.
fn run_routing(config: &Config, files: &[String]) -> anyhow::Result<usize> {
    let tech = Technology::from_config(&config.tech).context("Invalid technology configuration")?;

    let mut cells = Vec::with_capacity(files.len());
    for f in files {
        log::info!("Parsing cell: {}", f);
        cells.push(cell::parse(f, &tech)?);
    }

    let out_dir = Path::new(&config.input.output_dir);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;

    let router = PathFinderRouter::new(&config.routing);
    let results = route_cells(&cells, &tech, &config.routing, &GeometricExtractor, &router);

    let mut failures = 0;
    for (cell, result) in cells.iter().zip(results) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Cell '{}' failed: {}", cell.name, e);
                failures += 1;
                continue;
            }
        };

        let report = match &outcome {
            RouteOutcome::Routed {
                trees,
                failed,
                shapes,
                context,
            } => {
                let routed: Vec<_> = trees.keys().copied().collect();
                if !failed.is_empty() {
                    failures += 1;
                } else if let Err(e) = check::run(cell, shapes, &tech, &GeometricExtractor, &routed) {
                    log::error!("Verification of '{}' failed: {}", cell.name, e);
                    failures += 1;
                }
                CellReport {
                    cell: cell.name.clone(),
                    status: "routed",
                    failed_nets: failed.iter().map(|n| cell.net_name(*n).to_string()).collect(),
                    reason: None,
                    stats: Some(StatsReport::from(&context.stats)),
                    shapes: shape_records(cell, shapes, &tech),
                }
            }
            RouteOutcome::GraphDump { shapes, reason, .. } => CellReport {
                cell: cell.name.clone(),
                status: "graph_dump",
                failed_nets: Vec::new(),
                reason: Some(reason.clone()),
                stats: None,
                shapes: shape_records(cell, shapes, &tech),
            },
        };

        let report_path = out_dir.join(format!("{}.routed.toml", cell.name));
        let text = toml::to_string_pretty(&report).context("Failed to serialize routing report")?;
        std::fs::write(&report_path, text)
            .with_context(|| format!("Failed to write {:?}", report_path))?;
        log::info!("Wrote {:?}", report_path);

        if config.input.write_images {
            let image_path = out_dir.join(format!("{}.png", cell.name));
            log::info!("Generating routed visualization {:?}", image_path);
            visualization::draw_routed_cell(
                cell,
                outcome.shapes(),
                &tech,
                &image_path.to_string_lossy(),
                1000,
                1000,
            )
            .with_context(|| format!("Failed to write {:?}", image_path))?;
        }
    }
    Ok(failures)
}
