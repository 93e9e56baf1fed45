pub mod point;
pub mod rect;
pub mod region;
pub mod rtree;
