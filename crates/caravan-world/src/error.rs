//! Error types for the `caravan-world` crate.
//!
//! Building the world graph is the only fallible operation here; lookups
//! return `Option` and unknown ids are the caller's policy decision.

use caravan_types::{LocationId, WorldMode};

/// Errors that can occur while assembling a world graph.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A location id was inserted twice into the same layer.
    #[error("duplicate location id {id} in {mode} world")]
    DuplicateLocation {
        /// Layer the duplicate was inserted into.
        mode: WorldMode,
        /// The duplicated id.
        id: LocationId,
    },

    /// A connection points at a location missing from the layer.
    #[error("location {from} connects to unknown location {to} in {mode} world")]
    DanglingConnection {
        /// Layer being validated.
        mode: WorldMode,
        /// Location declaring the connection.
        from: LocationId,
        /// Missing target.
        to: LocationId,
    },

    /// The configured starting location is not part of the layer.
    #[error("starting location {id} not found in {mode} world")]
    MissingStart {
        /// Layer being validated.
        mode: WorldMode,
        /// The missing id.
        id: LocationId,
    },
}
