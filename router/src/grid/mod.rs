//! Construction and legalization of the routing grid.

pub mod builder;
pub mod legalize;
pub mod via_nodes;
