use stdcell_common::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("base routing grid is not connected ({components} components)")]
    BaseGridDisconnected { components: usize },

    #[error("routing graph is not connected after legalization and pruning ({components} components)")]
    Disconnected { components: usize },

    #[error("nets without any terminal: {0:?}")]
    MissingTerminals(Vec<String>),

    #[error("virtual terminal weight {weight} must exceed the total grid weight {grid_weight}")]
    VirtualWeightTooLow { weight: f64, grid_weight: f64 },

    #[error("unknown net '{0}'")]
    UnknownNet(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("graph router failed: {0}")]
    Router(String),
}
