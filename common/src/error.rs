use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    #[error("layer '{0}' is declared more than once with different roles")]
    ConflictingLayer(String),

    #[error("invalid direction '{direction}' for routing layer '{layer}' (expected h, v or hv)")]
    InvalidDirection { layer: String, direction: String },

    #[error("grid pitch must be positive (x: {x}, y: {y})")]
    InvalidPitch { x: i64, y: i64 },

    #[error("unknown net '{0}'")]
    UnknownNet(String),

    #[error("malformed rectangle on layer '{layer}': {coords:?}")]
    MalformedRect { layer: String, coords: Vec<i64> },
}
