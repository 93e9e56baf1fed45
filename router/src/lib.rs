pub mod algo;
pub mod conflicts;
pub mod draw;
pub mod engine;
pub mod error;
pub mod graph;
pub mod grid;
pub mod spacing;
pub mod terminals;
pub mod utils;
pub mod virtual_terminals;

pub use error::RoutingError;

use algo::GraphRouter;
use engine::{RouteOutcome, RoutingEngine};
use rayon::prelude::*;
use stdcell_common::db::core::CellLayout;
use stdcell_common::db::extract::NetlistExtractor;
use stdcell_common::db::tech::Technology;
use stdcell_common::util::config::RoutingConfig;

/// Routes independent cells in parallel. Results keep the order of `cells`.
pub fn route_cells(
    cells: &[CellLayout],
    tech: &Technology,
    config: &RoutingConfig,
    extractor: &dyn NetlistExtractor,
    router: &dyn GraphRouter,
) -> Vec<Result<RouteOutcome, RoutingError>> {
    let engine = RoutingEngine::new(tech, config);
    cells
        .par_iter()
        .map(|cell| engine.route_cell(cell, extractor, router))
        .collect()
}
