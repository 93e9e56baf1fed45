pub mod core;
pub mod extract;
pub mod indices;
pub mod parser;
pub mod tech;
