//! World graph: locations as nodes, connections as edges, one layer per mode.
//!
//! The [`WorldGraph`] trait is the capability the simulation core consumes.
//! [`WorldAtlas`] is the concrete static map loaded at game start;
//! [`EmptyWorld`] is the null object used when no graph was supplied, in which
//! case every id resolves to an opaque record.
//!
//! Location ids are scoped by [`WorldMode`]: `"market_square"` in the normal
//! layer and `"market_square"` in the doom layer are different places.

use std::collections::BTreeMap;

use caravan_types::{LocationId, LocationRecord, WorldMode};
use tracing::debug;

use crate::error::WorldError;

/// Read-only access to the static world map.
pub trait WorldGraph: Send {
    /// Look up a location in the layer for `mode`.
    fn lookup(&self, mode: WorldMode, id: &LocationId) -> Option<&LocationRecord>;

    /// The location a new game (or a doom entry without an explicit target)
    /// starts at in the layer for `mode`.
    fn starting_location(&self, mode: WorldMode) -> Option<&LocationId>;

    /// Resolve an id to a canonical record, falling back to an opaque
    /// placeholder when the layer does not know it.
    fn resolve(&self, mode: WorldMode, id: &LocationId) -> LocationRecord {
        if let Some(record) = self.lookup(mode, id) {
            return record.clone();
        }
        debug!(%mode, location = %id, "unknown location id, using opaque record");
        LocationRecord::opaque(id.clone())
    }
}

/// One layer of the atlas.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct WorldLayer {
    /// All locations indexed by id.
    locations: BTreeMap<LocationId, LocationRecord>,
    /// Default arrival point for this layer.
    start: Option<LocationId>,
}

/// The static world map with a normal and a doom layer.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct WorldAtlas {
    layers: BTreeMap<WorldMode, WorldLayer>,
}

impl WorldAtlas {
    /// Create an atlas with two empty layers.
    pub fn new() -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(WorldMode::Normal, WorldLayer::default());
        layers.insert(WorldMode::Doom, WorldLayer::default());
        Self { layers }
    }

    // -------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------

    /// Add a location to the layer for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateLocation`] if the id already exists in
    /// that layer.
    pub fn add_location(
        &mut self,
        mode: WorldMode,
        record: LocationRecord,
    ) -> Result<(), WorldError> {
        let layer = self.layers.entry(mode).or_default();
        if layer.locations.contains_key(&record.id) {
            return Err(WorldError::DuplicateLocation {
                mode,
                id: record.id,
            });
        }
        layer.locations.insert(record.id.clone(), record);
        Ok(())
    }

    /// Set the default arrival point for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::MissingStart`] if the id is not in that layer.
    pub fn set_start(&mut self, mode: WorldMode, id: LocationId) -> Result<(), WorldError> {
        let layer = self.layers.entry(mode).or_default();
        if !layer.locations.contains_key(&id) {
            return Err(WorldError::MissingStart { mode, id });
        }
        layer.start = Some(id);
        Ok(())
    }

    /// Check that every connection in every layer points at a known location.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorldError::DanglingConnection`] found.
    pub fn validate(&self) -> Result<(), WorldError> {
        for (mode, layer) in &self.layers {
            for record in layer.locations.values() {
                for target in &record.connections {
                    if !layer.locations.contains_key(target) {
                        return Err(WorldError::DanglingConnection {
                            mode: *mode,
                            from: record.id.clone(),
                            to: target.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Number of locations in the layer for `mode`.
    pub fn location_count(&self, mode: WorldMode) -> usize {
        self.layers.get(&mode).map_or(0, |l| l.locations.len())
    }

    /// Whether the layer for `mode` contains `id`.
    pub fn contains(&self, mode: WorldMode, id: &LocationId) -> bool {
        self.layers
            .get(&mode)
            .is_some_and(|l| l.locations.contains_key(id))
    }

    /// Iterate over the locations of one layer.
    pub fn locations(&self, mode: WorldMode) -> impl Iterator<Item = &LocationRecord> {
        self.layers
            .get(&mode)
            .into_iter()
            .flat_map(|l| l.locations.values())
    }

    /// Records directly reachable from `id` in the layer for `mode`.
    ///
    /// Connections to ids missing from the layer are skipped.
    pub fn neighbors(&self, mode: WorldMode, id: &LocationId) -> Vec<&LocationRecord> {
        let Some(layer) = self.layers.get(&mode) else {
            return Vec::new();
        };
        let Some(record) = layer.locations.get(id) else {
            return Vec::new();
        };
        record
            .connections
            .iter()
            .filter_map(|target| layer.locations.get(target))
            .collect()
    }

    /// Whether `to` is directly reachable from `from`.
    pub fn is_connected(&self, mode: WorldMode, from: &LocationId, to: &LocationId) -> bool {
        self.lookup(mode, from)
            .is_some_and(|r| r.connections.iter().any(|c| c == to))
    }
}

impl WorldGraph for WorldAtlas {
    fn lookup(&self, mode: WorldMode, id: &LocationId) -> Option<&LocationRecord> {
        self.layers.get(&mode).and_then(|l| l.locations.get(id))
    }

    fn starting_location(&self, mode: WorldMode) -> Option<&LocationId> {
        self.layers.get(&mode).and_then(|l| l.start.as_ref())
    }
}

/// Null-object world graph: knows no locations.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyWorld;

impl WorldGraph for EmptyWorld {
    fn lookup(&self, _mode: WorldMode, _id: &LocationId) -> Option<&LocationRecord> {
        None
    }

    fn starting_location(&self, _mode: WorldMode) -> Option<&LocationId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use caravan_types::LocationKind;

    use super::*;

    fn record(id: &str, connections: &[&str]) -> LocationRecord {
        LocationRecord {
            id: LocationId::from(id),
            name: id.to_uppercase(),
            description: format!("The {id}."),
            kind: LocationKind::Town,
            region: String::from("test"),
            connections: connections.iter().map(|c| LocationId::from(*c)).collect(),
        }
    }

    fn small_atlas() -> WorldAtlas {
        let mut atlas = WorldAtlas::new();
        let _ = atlas.add_location(WorldMode::Normal, record("a", &["b"]));
        let _ = atlas.add_location(WorldMode::Normal, record("b", &["a"]));
        let _ = atlas.add_location(WorldMode::Doom, record("a", &[]));
        atlas
    }

    #[test]
    fn duplicate_location_rejected() {
        let mut atlas = small_atlas();
        let result = atlas.add_location(WorldMode::Normal, record("a", &[]));
        assert!(matches!(result, Err(WorldError::DuplicateLocation { .. })));
    }

    #[test]
    fn same_id_in_different_layers_is_allowed() {
        let atlas = small_atlas();
        assert!(atlas.contains(WorldMode::Normal, &LocationId::from("a")));
        assert!(atlas.contains(WorldMode::Doom, &LocationId::from("a")));
        assert!(!atlas.contains(WorldMode::Doom, &LocationId::from("b")));
    }

    #[test]
    fn resolve_unknown_id_is_opaque() {
        let atlas = small_atlas();
        let rec = atlas.resolve(WorldMode::Normal, &LocationId::from("nowhere"));
        assert!(rec.is_opaque());
        assert_eq!(rec.name, "nowhere");
    }

    #[test]
    fn resolve_known_id_is_canonical() {
        let atlas = small_atlas();
        let rec = atlas.resolve(WorldMode::Normal, &LocationId::from("b"));
        assert_eq!(rec.name, "B");
        assert!(!rec.is_opaque());
    }

    #[test]
    fn neighbors_follow_connections() {
        let atlas = small_atlas();
        let n = atlas.neighbors(WorldMode::Normal, &LocationId::from("a"));
        assert_eq!(n.len(), 1);
        assert_eq!(n.first().map(|r| r.id.as_str()), Some("b"));
        assert!(atlas.is_connected(
            WorldMode::Normal,
            &LocationId::from("a"),
            &LocationId::from("b")
        ));
    }

    #[test]
    fn validate_detects_dangling_connection() {
        let mut atlas = small_atlas();
        let _ = atlas.add_location(WorldMode::Normal, record("c", &["zzz"]));
        assert!(matches!(
            atlas.validate(),
            Err(WorldError::DanglingConnection { .. })
        ));
    }

    #[test]
    fn start_must_exist() {
        let mut atlas = small_atlas();
        assert!(atlas.set_start(WorldMode::Normal, LocationId::from("a")).is_ok());
        assert!(atlas.set_start(WorldMode::Doom, LocationId::from("b")).is_err());
        assert_eq!(
            atlas.starting_location(WorldMode::Normal).map(LocationId::as_str),
            Some("a")
        );
    }

    #[test]
    fn empty_world_knows_nothing() {
        let world = EmptyWorld;
        assert!(world.starting_location(WorldMode::Normal).is_none());
        assert!(world.resolve(WorldMode::Doom, &LocationId::from("x")).is_opaque());
    }
}
