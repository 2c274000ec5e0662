//! World-state authority: the single writer of "where is the player, and in
//! which world".
//!
//! Every location change in the game goes through
//! [`WorldStateAuthority::set_current_location`] (or one of the doom
//! transitions built on it). Other subsystems only read.
//!
//! # Atomicity
//!
//! The world mode, the current location and the previous location live in
//! one [`WorldPosition`] value. A transition computes the new position in
//! full and then replaces the old one in a single assignment, so a reader can
//! never observe a new mode paired with an old location.
//!
//! # Visited sets
//!
//! Each mode has its own visited set. Ids are only meaningful relative to
//! the mode they were recorded under, so the doom layer's `"market"` and the
//! normal layer's `"market"` are tracked separately.

use std::collections::{BTreeMap, BTreeSet};

use caravan_types::{ChangeReason, LocationId, LocationRecord, WorldMode};
use caravan_world::WorldGraph;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::events::{EventBus, GameEvent};

/// Errors from world-mode transitions.
#[derive(Debug, thiserror::Error)]
pub enum WorldStateError {
    /// The requested transition targets the mode the player is already in.
    #[error("already in {mode} world")]
    AlreadyInMode {
        /// The current mode.
        mode: WorldMode,
    },

    /// No explicit target and the world graph has no start for the layer.
    #[error("no entry point for the {mode} world")]
    NoEntryPoint {
        /// The mode being entered.
        mode: WorldMode,
    },
}

/// A location given either as a bare id or as an already-canonical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationTarget {
    /// Resolve against the world graph layer of the current mode.
    Id(LocationId),
    /// Use as-is.
    Record(LocationRecord),
}

impl From<LocationId> for LocationTarget {
    fn from(id: LocationId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for LocationTarget {
    fn from(id: &str) -> Self {
        Self::Id(LocationId::new(id))
    }
}

impl From<LocationRecord> for LocationTarget {
    fn from(record: LocationRecord) -> Self {
        Self::Record(record)
    }
}

impl LocationTarget {
    fn resolve(self, mode: WorldMode, world: &dyn WorldGraph) -> LocationRecord {
        match self {
            Self::Id(id) => world.resolve(mode, &id),
            Self::Record(record) => record,
        }
    }
}

/// Mode plus current and previous location, replaced as one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldPosition {
    mode: WorldMode,
    current: Option<LocationRecord>,
    previous: Option<LocationRecord>,
}

impl WorldPosition {
    /// The world mode.
    pub const fn mode(&self) -> WorldMode {
        self.mode
    }

    /// The current location, if one was ever set.
    pub const fn current(&self) -> Option<&LocationRecord> {
        self.current.as_ref()
    }

    /// The location before the current one, within the same mode.
    pub const fn previous(&self) -> Option<&LocationRecord> {
        self.previous.as_ref()
    }
}

/// Persisted form of the authority (location fields of the save).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldStateSnapshot {
    /// The current location, as it was held.
    pub current_location: Option<LocationRecord>,
    /// The previous location.
    pub previous_location: Option<LocationRecord>,
    /// Current world mode.
    pub current_world: WorldMode,
    /// Locations reached in the normal world.
    pub visited_locations: Vec<LocationId>,
    /// Locations reached in the doom world.
    pub doom_visited_locations: Vec<LocationId>,
    /// Normal-world location to return to when leaving the doom world.
    pub normal_return_location: Option<LocationRecord>,
}

/// Single-writer owner of the player's location and world mode.
#[derive(Debug, Clone, Default)]
pub struct WorldStateAuthority {
    position: WorldPosition,
    visited: BTreeMap<WorldMode, BTreeSet<LocationId>>,
    normal_return: Option<LocationRecord>,
}

impl WorldStateAuthority {
    /// An authority with no location set, in the normal world.
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    /// The full position (mode, current, previous) as one consistent value.
    pub const fn position(&self) -> &WorldPosition {
        &self.position
    }

    /// The current location. `None` only before any location was set.
    pub const fn current_location(&self) -> Option<&LocationRecord> {
        self.position.current.as_ref()
    }

    /// The previous location within the current mode.
    pub const fn previous_location(&self) -> Option<&LocationRecord> {
        self.position.previous.as_ref()
    }

    /// The current world mode.
    pub const fn current_world(&self) -> WorldMode {
        self.position.mode
    }

    /// Whether the player is in the doom world.
    pub const fn is_doom(&self) -> bool {
        self.position.mode.is_doom()
    }

    /// The normal-world location remembered on doom entry.
    pub const fn normal_return(&self) -> Option<&LocationRecord> {
        self.normal_return.as_ref()
    }

    /// Whether `id` was reached in `mode`.
    pub fn has_visited(&self, mode: WorldMode, id: &LocationId) -> bool {
        self.visited.get(&mode).is_some_and(|set| set.contains(id))
    }

    /// Locations reached in `mode`, in id order.
    pub fn visited(&self, mode: WorldMode) -> impl Iterator<Item = &LocationId> {
        self.visited.get(&mode).into_iter().flatten()
    }

    /// Number of locations reached in `mode`.
    pub fn visited_count(&self, mode: WorldMode) -> usize {
        self.visited.get(&mode).map_or(0, BTreeSet::len)
    }

    // -------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------

    /// Move the player. The only location mutator.
    ///
    /// Bare ids are resolved in the current mode's layer; unknown ids become
    /// opaque records. The prior location is kept for [`go_back`], the id is
    /// marked visited and one `location:changed` event is published.
    ///
    /// [`go_back`]: Self::go_back
    pub fn set_current_location(
        &mut self,
        target: impl Into<LocationTarget>,
        reason: ChangeReason,
        world: &dyn WorldGraph,
        bus: &mut EventBus,
    ) -> LocationRecord {
        let mode = self.position.mode;
        let record = target.into().resolve(mode, world);
        let old = self.position.current.clone();

        let previous = match &old {
            Some(current) if current.id == record.id => self.position.previous.clone(),
            _ => old.clone(),
        };
        let next = WorldPosition {
            mode,
            current: Some(record.clone()),
            previous,
        };

        self.mark_visited(mode, &record.id);
        self.position = next;

        debug!(
            location = %record.id,
            world = %mode,
            reason = %reason,
            "location changed"
        );
        bus.publish(&GameEvent::LocationChanged {
            location: record.clone(),
            previous_location: old,
            reason,
            world: mode,
        });
        record
    }

    /// Return to the previous location in the current mode.
    ///
    /// Returns `None` (and does nothing) if there is no previous location.
    pub fn go_back(
        &mut self,
        world: &dyn WorldGraph,
        bus: &mut EventBus,
    ) -> Option<LocationRecord> {
        let previous = self.position.previous.clone()?;
        Some(self.set_current_location(previous, ChangeReason::Back, world, bus))
    }

    /// Enter the doom world.
    ///
    /// Remembers the exact normal-world location for [`exit_doom`]. The entry
    /// point is `entry` resolved in the doom layer, or the layer's start.
    /// Publishes `world:changed` then `location:changed`.
    ///
    /// # Errors
    ///
    /// [`WorldStateError::AlreadyInMode`] if already in the doom world;
    /// [`WorldStateError::NoEntryPoint`] if no entry could be determined.
    /// State is unchanged on error.
    ///
    /// [`exit_doom`]: Self::exit_doom
    pub fn enter_doom(
        &mut self,
        entry: Option<LocationTarget>,
        world: &dyn WorldGraph,
        bus: &mut EventBus,
    ) -> Result<LocationRecord, WorldStateError> {
        if self.is_doom() {
            return Err(WorldStateError::AlreadyInMode {
                mode: WorldMode::Doom,
            });
        }
        let entry = entry
            .or_else(|| {
                world
                    .starting_location(WorldMode::Doom)
                    .cloned()
                    .map(LocationTarget::Id)
            })
            .ok_or(WorldStateError::NoEntryPoint {
                mode: WorldMode::Doom,
            })?;

        let normal_location = self.position.current.clone();
        self.switch_mode(
            WorldMode::Doom,
            entry,
            ChangeReason::DoomEnter,
            normal_location.clone(),
            world,
            bus,
        )
        .map(|record| {
            info!(
                entry = %record.id,
                return_to = ?normal_location.as_ref().map(|r| r.id.as_str()),
                "entered doom world"
            );
            record
        })
    }

    /// Leave the doom world for the remembered normal-world location.
    ///
    /// Falls back to the normal layer's start if nothing was remembered.
    /// Publishes `world:changed` then `location:changed`.
    ///
    /// # Errors
    ///
    /// [`WorldStateError::AlreadyInMode`] if not in the doom world;
    /// [`WorldStateError::NoEntryPoint`] if there is nowhere to return to.
    /// State is unchanged on error.
    pub fn exit_doom(
        &mut self,
        world: &dyn WorldGraph,
        bus: &mut EventBus,
    ) -> Result<LocationRecord, WorldStateError> {
        if !self.is_doom() {
            return Err(WorldStateError::AlreadyInMode {
                mode: WorldMode::Normal,
            });
        }
        let target = self
            .normal_return
            .clone()
            .map(LocationTarget::Record)
            .or_else(|| {
                world
                    .starting_location(WorldMode::Normal)
                    .cloned()
                    .map(LocationTarget::Id)
            })
            .ok_or(WorldStateError::NoEntryPoint {
                mode: WorldMode::Normal,
            })?;

        let record = self.switch_mode(
            WorldMode::Normal,
            target,
            ChangeReason::DoomExit,
            None,
            world,
            bus,
        )?;
        info!(location = %record.id, "left doom world");
        Ok(record)
    }

    /// Publish the current position without moving.
    ///
    /// Used after a load so subscribers can refresh: `world:changed` first
    /// when the mode differs from `previous_world`, then `location:changed`.
    pub fn announce(&self, reason: ChangeReason, previous_world: WorldMode, bus: &mut EventBus) {
        if self.position.mode != previous_world {
            bus.publish(&GameEvent::WorldChanged {
                world: self.position.mode,
                previous_world,
                reason: reason.clone(),
            });
        }
        if let Some(location) = &self.position.current {
            bus.publish(&GameEvent::LocationChanged {
                location: location.clone(),
                previous_location: self.position.previous.clone(),
                reason,
                world: self.position.mode,
            });
        }
    }

    /// Forget everything (new game).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // -------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------

    /// Persisted form of the authority.
    pub fn snapshot(&self) -> WorldStateSnapshot {
        let ids = |mode| -> Vec<LocationId> { self.visited(mode).cloned().collect() };
        WorldStateSnapshot {
            current_location: self.position.current.clone(),
            previous_location: self.position.previous.clone(),
            current_world: self.position.mode,
            visited_locations: ids(WorldMode::Normal),
            doom_visited_locations: ids(WorldMode::Doom),
            normal_return_location: self.normal_return.clone(),
        }
    }

    /// Rebuild an authority from a snapshot.
    ///
    /// Records are taken as saved, so canonical records that the world graph
    /// does not know keep their names and descriptions. Publishes nothing.
    pub fn from_snapshot(snapshot: &WorldStateSnapshot) -> Self {
        let mut visited: BTreeMap<WorldMode, BTreeSet<LocationId>> = BTreeMap::new();
        visited.insert(
            WorldMode::Normal,
            snapshot.visited_locations.iter().cloned().collect(),
        );
        visited.insert(
            WorldMode::Doom,
            snapshot.doom_visited_locations.iter().cloned().collect(),
        );

        Self {
            position: WorldPosition {
                mode: snapshot.current_world,
                current: snapshot.current_location.clone(),
                previous: snapshot.previous_location.clone(),
            },
            visited,
            normal_return: snapshot.normal_return_location.clone(),
        }
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn mark_visited(&mut self, mode: WorldMode, id: &LocationId) {
        self.visited.entry(mode).or_default().insert(id.clone());
    }

    fn switch_mode(
        &mut self,
        mode: WorldMode,
        target: LocationTarget,
        reason: ChangeReason,
        normal_return: Option<LocationRecord>,
        world: &dyn WorldGraph,
        bus: &mut EventBus,
    ) -> Result<LocationRecord, WorldStateError> {
        let previous_world = self.position.mode;
        if previous_world == mode {
            return Err(WorldStateError::AlreadyInMode { mode });
        }
        let record = target.resolve(mode, world);
        let old_location = self.position.current.clone();
        let next = WorldPosition {
            mode,
            current: Some(record.clone()),
            previous: None,
        };

        self.mark_visited(mode, &record.id);
        self.position = next;
        self.normal_return = normal_return;

        bus.publish(&GameEvent::WorldChanged {
            world: mode,
            previous_world,
            reason: reason.clone(),
        });
        bus.publish(&GameEvent::LocationChanged {
            location: record.clone(),
            previous_location: old_location,
            reason,
            world: mode,
        });
        Ok(record)
    }
}
