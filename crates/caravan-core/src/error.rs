//! Error taxonomy of the simulation core.
//!
//! Subsystem errors convert into [`CoreError`] with `?`. None of them is
//! fatal to the frame loop: the scheduler logs a failing step and skips it
//! for that frame.

use caravan_market::MarketError;
use caravan_survival::SurvivalError;

use crate::clock::ClockError;
use crate::config::ConfigError;
use crate::persistence::PersistenceError;
use crate::world_state::WorldStateError;

/// Errors surfaced by [`SimulationContext`](crate::SimulationContext)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A capability was not supplied and its null object cannot serve the
    /// request.
    #[error("missing dependency: {capability}")]
    MissingDependency {
        /// Name of the absent capability.
        capability: &'static str,
    },

    /// An id does not refer to anything the core knows.
    #[error("invalid {kind} reference: {id}")]
    InvalidReference {
        /// What kind of id it was.
        kind: &'static str,
        /// The id.
        id: String,
    },

    /// A death sequence was triggered while one was already running.
    #[error("death sequence already in progress")]
    ReentrancyViolation,

    /// A save could not be encoded, decoded or stored.
    #[error("persistence error: {source}")]
    Persistence {
        /// The underlying persistence error.
        #[from]
        source: PersistenceError,
    },

    /// A decoded save holds values the simulation cannot run with.
    #[error("invalid save snapshot: {reason}")]
    InvalidSnapshot {
        /// What is wrong with it.
        reason: String,
    },

    /// Clock failure.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// World-mode transition failure.
    #[error("world state error: {source}")]
    WorldState {
        /// The underlying transition error.
        #[from]
        source: WorldStateError,
    },

    /// Survival computation failure.
    #[error("survival error: {source}")]
    Survival {
        /// The underlying survival error.
        #[from]
        source: SurvivalError,
    },

    /// Trade failure.
    #[error("market error: {source}")]
    Market {
        /// The underlying market error.
        #[from]
        source: MarketError,
    },

    /// Configuration failure.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },
}
