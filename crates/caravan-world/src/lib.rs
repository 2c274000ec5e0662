//! World graph for the Caravan simulation core.
//!
//! The world is a static map of locations in two layers: the normal trading
//! world and the doom overlay. The simulation core reads it through the
//! [`WorldGraph`] capability and never mutates it at runtime.
//!
//! # Modules
//!
//! - [`error`] -- Error types for world-graph construction.
//! - [`world_map`] -- [`WorldGraph`] trait, the [`WorldAtlas`] implementation
//!   and the [`EmptyWorld`] null object.
//! - [`starting_world`] -- Default map used for new games.

pub mod error;
pub mod starting_world;
pub mod world_map;

pub use error::WorldError;
pub use starting_world::{DOOM_START, NORMAL_START, create_starting_world};
pub use world_map::{EmptyWorld, WorldAtlas, WorldGraph};
