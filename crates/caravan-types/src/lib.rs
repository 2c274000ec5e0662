//! Shared type definitions for the Caravan simulation core.
//!
//! This crate is the single source of truth for the data that flows between
//! the survival, market and world-state subsystems. Types defined here are
//! exported to `TypeScript` via `ts-rs` for the browser UI.
//!
//! # Modules
//!
//! - [`ids`] -- Location/item keys and UUID-based runtime identifiers
//! - [`enums`] -- World mode, seasons, change reasons, death causes, attributes
//! - [`structs`] -- Vitals, attributes, buffs, location and price records, time readings

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::{Attribute, ChangeReason, DeathCause, LocationKind, Season, WorldMode};
pub use ids::{ItemId, LocationId, SnapshotId, SubscriptionId};
pub use structs::{
    Attributes, LocationRecord, MarketPriceRecord, PlayerVitals, SeasonEffects, TimeInfo,
    TimedBuff, clamp_stat,
};
