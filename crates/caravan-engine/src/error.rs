//! Error types for the engine host.

use caravan_core::{ConfigError, CoreError};
use caravan_world::WorldError;

/// Errors that stop the engine from starting or shutting down cleanly.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration file could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The starting world failed validation.
    #[error("world error: {0}")]
    World(#[from] WorldError),

    /// A simulation operation failed.
    #[error("simulation error: {0}")]
    Core(#[from] CoreError),

    /// The logging subscriber could not be installed.
    #[error("logging error: {0}")]
    Logging(String),

    /// The companion HTTP client could not be built.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}
