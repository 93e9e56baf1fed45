pub mod db;
pub mod error;
pub mod geom;
pub mod util;

pub use error::ConfigError;
