//! Save snapshots and the storage capability they are written through.
//!
//! A [`SaveSnapshot`] holds everything this core must restore: location and
//! world mode, visited sets, vitals, attributes, buffs, survival and market
//! baselines, market records and clock state. It is encoded as JSON.
//!
//! Decoding is strict about the version and never touches live state; the
//! context rebuilds every subsystem from a decoded snapshot and only then
//! swaps them in.

use std::collections::BTreeMap;

use caravan_market::PriceTable;
use caravan_types::{Attributes, PlayerVitals, SnapshotId, TimedBuff};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::ClockState;
use crate::world_state::WorldStateSnapshot;

/// Format version written by this build.
pub const SAVE_VERSION: u32 = 1;

/// Errors from encoding, decoding or storing saves.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The snapshot could not be encoded.
    #[error("failed to encode save: {source}")]
    Encode {
        /// The underlying serializer error.
        source: serde_json::Error,
    },

    /// The payload is not a valid save.
    #[error("malformed save data: {source}")]
    Decode {
        /// The underlying deserializer error.
        source: serde_json::Error,
    },

    /// The payload was written by an incompatible version.
    #[error("unsupported save version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the payload.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },

    /// The slot holds no save.
    #[error("no save in slot '{slot}'")]
    EmptySlot {
        /// Slot name.
        slot: String,
    },

    /// The storage backend failed.
    #[error("storage failure for slot '{slot}': {reason}")]
    Storage {
        /// Slot name.
        slot: String,
        /// Backend error description.
        reason: String,
    },
}

/// Player portion of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Vitals.
    pub stats: PlayerVitals,
    /// Base attributes.
    pub attributes: Attributes,
    /// Active timed buffs.
    pub buffs: Vec<TimedBuff>,
}

/// Survival baseline portion of a save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivalSnapshot {
    /// Last game minute the survival simulator processed.
    pub last_processed_minutes: Option<u64>,
}

/// Everything needed to restore a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    /// Format version.
    pub version: u32,
    /// Unique id of this save.
    pub snapshot_id: SnapshotId,
    /// When the save was taken.
    pub saved_at: DateTime<Utc>,
    /// Location, world mode and visited sets.
    #[serde(flatten)]
    pub world: WorldStateSnapshot,
    /// Vitals, attributes and buffs.
    pub player: PlayerSnapshot,
    /// Survival baseline.
    pub survival: SurvivalSnapshot,
    /// Market records by location and item.
    pub market_prices: PriceTable,
    /// Last game minute the market processed.
    pub market_last_processed_minutes: Option<u64>,
    /// Clock accumulator and pause flag.
    pub time_state: ClockState,
    /// Clock speed multiplier.
    pub time_speed: u32,
}

/// Encode a snapshot as JSON.
///
/// # Errors
///
/// Returns [`PersistenceError::Encode`] if serialization fails.
pub fn encode(snapshot: &SaveSnapshot) -> Result<String, PersistenceError> {
    serde_json::to_string(snapshot).map_err(|source| PersistenceError::Encode { source })
}

/// Decode and version-check a snapshot.
///
/// # Errors
///
/// Returns [`PersistenceError::Decode`] for malformed JSON or missing
/// fields, [`PersistenceError::UnsupportedVersion`] for another version.
pub fn decode(payload: &str) -> Result<SaveSnapshot, PersistenceError> {
    let snapshot: SaveSnapshot =
        serde_json::from_str(payload).map_err(|source| PersistenceError::Decode { source })?;
    if snapshot.version != SAVE_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: snapshot.version,
            expected: SAVE_VERSION,
        });
    }
    Ok(snapshot)
}

/// Capability that stores encoded saves in named slots.
pub trait PersistenceSink: Send {
    /// Write `payload` to `slot`, replacing what was there.
    fn store(&mut self, slot: &str, payload: &str) -> Result<(), PersistenceError>;

    /// Read the payload in `slot`, or `None` if the slot is empty.
    fn fetch(&self, slot: &str) -> Result<Option<String>, PersistenceError>;
}

/// In-memory sink for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    slots: BTreeMap<String, String>,
}

impl MemorySink {
    /// An empty sink.
    pub const fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl PersistenceSink for MemorySink {
    fn store(&mut self, slot: &str, payload: &str) -> Result<(), PersistenceError> {
        self.slots.insert(slot.to_owned(), payload.to_owned());
        Ok(())
    }

    fn fetch(&self, slot: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.slots.get(slot).cloned())
    }
}

/// Sink used when no storage is wired in. Discards writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PersistenceSink for NullSink {
    fn store(&mut self, _slot: &str, _payload: &str) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn fetch(&self, _slot: &str) -> Result<Option<String>, PersistenceError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SaveSnapshot {
        SaveSnapshot {
            version: SAVE_VERSION,
            snapshot_id: SnapshotId::new(),
            saved_at: Utc::now(),
            world: WorldStateSnapshot::default(),
            player: PlayerSnapshot {
                stats: caravan_survival::VitalsConfig::default().starting_vitals(),
                attributes: Attributes::default(),
                buffs: Vec::new(),
            },
            survival: SurvivalSnapshot::default(),
            market_prices: PriceTable::new(),
            market_last_processed_minutes: None,
            time_state: ClockState::default(),
            time_speed: 1,
        }
    }

    #[test]
    fn encode_decode_preserves_snapshot() {
        let original = snapshot();
        let decoded = encode(&original).and_then(|json| decode(&json));
        assert_eq!(decoded.ok(), Some(original));
    }

    #[test]
    fn world_fields_are_top_level() {
        let json = encode(&snapshot()).unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap_or_default();
        assert!(value.get("current_world").is_some());
        assert!(value.get("visited_locations").is_some());
        assert!(value.get("doom_visited_locations").is_some());
        assert!(value["player"].get("stats").is_some());
    }

    #[test]
    fn malformed_payload_rejected() {
        assert!(matches!(decode("{not json"), Err(PersistenceError::Decode { .. })));
        assert!(matches!(decode("{}"), Err(PersistenceError::Decode { .. })));
    }

    #[test]
    fn wrong_version_rejected() {
        let mut old = snapshot();
        old.version = 0;
        let json = encode(&old).unwrap_or_default();
        assert!(matches!(
            decode(&json),
            Err(PersistenceError::UnsupportedVersion { found: 0, .. })
        ));
    }

    #[test]
    fn memory_sink_stores_and_fetches() {
        let mut sink = MemorySink::new();
        assert!(sink.store("slot1", "payload").is_ok());
        assert_eq!(sink.fetch("slot1").ok().flatten().as_deref(), Some("payload"));
        assert_eq!(sink.fetch("slot2").ok().flatten(), None);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn null_sink_discards() {
        let mut sink = NullSink;
        assert!(sink.store("slot1", "payload").is_ok());
        assert_eq!(sink.fetch("slot1").ok().flatten(), None);
    }
}
