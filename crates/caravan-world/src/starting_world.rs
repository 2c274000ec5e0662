//! Default world map used when a new game starts.
//!
//! Seven normal locations across two regions (the Vale and the Coast) and
//! four doom-overlay locations reached through the Shattered Gate.

use caravan_types::{LocationId, LocationKind, LocationRecord, WorldMode};

use crate::error::WorldError;
use crate::world_map::WorldAtlas;

/// Default arrival point in the normal world.
pub const NORMAL_START: &str = "millford";

/// Default arrival point in the doom overlay.
pub const DOOM_START: &str = "shattered_gate";

/// Helper to build a [`LocationRecord`].
fn loc(
    id: &str,
    name: &str,
    kind: LocationKind,
    region: &str,
    desc: &str,
    connections: &[&str],
) -> LocationRecord {
    LocationRecord {
        id: LocationId::from(id),
        name: name.to_owned(),
        description: desc.to_owned(),
        kind,
        region: region.to_owned(),
        connections: connections.iter().map(|c| LocationId::from(*c)).collect(),
    }
}

/// Build the default two-layer world atlas.
///
/// # Errors
///
/// Returns a [`WorldError`] if the built-in data is inconsistent (duplicate
/// ids, dangling connections or a missing start), which only happens if
/// this table is edited incorrectly.
pub fn create_starting_world() -> Result<WorldAtlas, WorldError> {
    let mut atlas = WorldAtlas::new();

    // --- The Vale ---
    atlas.add_location(
        WorldMode::Normal,
        loc(
            "millford",
            "Millford",
            LocationKind::Town,
            "vale",
            "A mill town on the river, busy with grain carts.",
            &["riverbank", "greenwood", "kingsport"],
        ),
    )?;
    atlas.add_location(
        WorldMode::Normal,
        loc(
            "riverbank",
            "Riverbank",
            LocationKind::Village,
            "vale",
            "Fishing huts along the slow brown river.",
            &["millford", "saltmarsh"],
        ),
    )?;
    atlas.add_location(
        WorldMode::Normal,
        loc(
            "greenwood",
            "Greenwood",
            LocationKind::Wilds,
            "vale",
            "Old forest where herbs and game can be gathered.",
            &["millford", "stonewatch"],
        ),
    )?;
    atlas.add_location(
        WorldMode::Normal,
        loc(
            "stonewatch",
            "Stonewatch",
            LocationKind::Outpost,
            "vale",
            "A border fort guarding the mountain pass.",
            &["greenwood", "highcrest"],
        ),
    )?;

    // --- The Coast ---
    atlas.add_location(
        WorldMode::Normal,
        loc(
            "kingsport",
            "Kingsport",
            LocationKind::City,
            "coast",
            "The royal harbour, where every trade road ends.",
            &["millford", "saltmarsh", "highcrest"],
        ),
    )?;
    atlas.add_location(
        WorldMode::Normal,
        loc(
            "saltmarsh",
            "Saltmarsh",
            LocationKind::Village,
            "coast",
            "Salt pans and reed roofs on the tidal flats.",
            &["riverbank", "kingsport"],
        ),
    )?;
    atlas.add_location(
        WorldMode::Normal,
        loc(
            "highcrest",
            "Highcrest",
            LocationKind::City,
            "coast",
            "A cliff-top city of merchant guilds.",
            &["kingsport", "stonewatch"],
        ),
    )?;

    // --- Doom overlay ---
    atlas.add_location(
        WorldMode::Doom,
        loc(
            "shattered_gate",
            "The Shattered Gate",
            LocationKind::Ruin,
            "doom",
            "Where the old world tore open.",
            &["ashen_market", "bone_fields"],
        ),
    )?;
    atlas.add_location(
        WorldMode::Doom,
        loc(
            "ashen_market",
            "Ashen Market",
            LocationKind::Ruin,
            "doom",
            "Desperate traders barter under a grey sky.",
            &["shattered_gate", "the_maw"],
        ),
    )?;
    atlas.add_location(
        WorldMode::Doom,
        loc(
            "bone_fields",
            "Bone Fields",
            LocationKind::Wilds,
            "doom",
            "Nothing grows here any more.",
            &["shattered_gate", "the_maw"],
        ),
    )?;
    atlas.add_location(
        WorldMode::Doom,
        loc(
            "the_maw",
            "The Maw",
            LocationKind::Ruin,
            "doom",
            "The heart of the doom.",
            &["ashen_market", "bone_fields"],
        ),
    )?;

    atlas.set_start(WorldMode::Normal, LocationId::from(NORMAL_START))?;
    atlas.set_start(WorldMode::Doom, LocationId::from(DOOM_START))?;
    atlas.validate()?;

    Ok(atlas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_map::WorldGraph;

    #[test]
    fn starting_world_builds() {
        let atlas = create_starting_world();
        assert!(atlas.is_ok());
    }

    #[test]
    fn starting_world_layer_sizes() {
        let Ok(atlas) = create_starting_world() else {
            return;
        };
        assert_eq!(atlas.location_count(WorldMode::Normal), 7);
        assert_eq!(atlas.location_count(WorldMode::Doom), 4);
    }

    #[test]
    fn starts_are_set() {
        let Ok(atlas) = create_starting_world() else {
            return;
        };
        assert_eq!(
            atlas.starting_location(WorldMode::Normal).map(LocationId::as_str),
            Some(NORMAL_START)
        );
        assert_eq!(
            atlas.starting_location(WorldMode::Doom).map(LocationId::as_str),
            Some(DOOM_START)
        );
    }

    #[test]
    fn connections_are_symmetric() {
        let Ok(atlas) = create_starting_world() else {
            return;
        };
        for mode in [WorldMode::Normal, WorldMode::Doom] {
            for record in atlas.locations(mode) {
                for target in &record.connections {
                    assert!(
                        atlas.is_connected(mode, target, &record.id),
                        "{target} does not connect back to {}",
                        record.id
                    );
                }
            }
        }
    }

    #[test]
    fn atlas_survives_json() {
        let Ok(atlas) = create_starting_world() else {
            return;
        };
        let json = serde_json::to_string(&atlas).unwrap_or_default();
        let restored = serde_json::from_str::<WorldAtlas>(&json);
        assert!(restored.is_ok(), "atlas did not decode: {restored:?}");
        let Ok(restored) = restored else {
            return;
        };
        assert!(restored.validate().is_ok());
        assert_eq!(restored.location_count(WorldMode::Doom), 4);
        assert_eq!(
            restored.starting_location(WorldMode::Normal).map(LocationId::as_str),
            Some(NORMAL_START)
        );
    }
}
