//! Enumeration types shared across the simulation core.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// World mode
// ---------------------------------------------------------------------------

/// Which world overlay the player is in.
///
/// The mode selects the world-graph layer used to resolve location ids, the
/// visited set that grows on arrival, and the survival decay multiplier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum WorldMode {
    /// The regular trading world.
    #[default]
    Normal,
    /// The doom overlay: different locations, doubled survival decay.
    Doom,
}

impl WorldMode {
    /// Whether this is the doom overlay.
    pub const fn is_doom(self) -> bool {
        matches!(self, Self::Doom)
    }
}

impl core::fmt::Display for WorldMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Doom => write!(f, "doom"),
        }
    }
}

// ---------------------------------------------------------------------------
// Location kind
// ---------------------------------------------------------------------------

/// Broad category of a location, used for market stocking and display.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LocationKind {
    /// Large trade hub.
    City,
    /// Mid-sized settlement.
    Town,
    /// Small settlement with a limited market.
    Village,
    /// Frontier post.
    Outpost,
    /// Wilderness gathering spot without a market.
    Wilds,
    /// Ruined place in the doom overlay.
    Ruin,
    /// Anything not described by the world graph.
    #[default]
    Unknown,
}

// ---------------------------------------------------------------------------
// Seasons
// ---------------------------------------------------------------------------

/// Season of the in-game year.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Season {
    /// Mild hunger, mild thirst.
    #[default]
    Spring,
    /// Thirst drains faster.
    Summer,
    /// Hunger drains slightly faster.
    Autumn,
    /// Hunger drains faster, travel slows.
    Winter,
}

// ---------------------------------------------------------------------------
// Change reasons
// ---------------------------------------------------------------------------

/// Why the player's location or world mode changed.
///
/// Carried on every `location:changed` and `world:changed` notification so
/// subscribers can tell travel apart from loads and scripted moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ChangeReason {
    /// Placement at the start of a new game.
    NewGame,
    /// Arrival after travelling along a connection.
    Travel,
    /// Return to the previously visited location.
    Back,
    /// Entering the doom overlay.
    DoomEnter,
    /// Leaving the doom overlay.
    DoomExit,
    /// State restored from a save.
    Load,
    /// Moved by a quest, event or other scripted source.
    Scripted(String),
}

impl core::fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NewGame => write!(f, "new_game"),
            Self::Travel => write!(f, "travel"),
            Self::Back => write!(f, "back"),
            Self::DoomEnter => write!(f, "doom_enter"),
            Self::DoomExit => write!(f, "doom_exit"),
            Self::Load => write!(f, "load"),
            Self::Scripted(tag) => write!(f, "scripted:{tag}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Death
// ---------------------------------------------------------------------------

/// The cause of the player's death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DeathCause {
    /// Health reached 0 while hunger was empty.
    Starvation,
    /// Health reached 0 while thirst was empty.
    Dehydration,
    /// Health reached 0 for any other reason (combat, events).
    Injury,
}

impl core::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Starvation => write!(f, "starvation"),
            Self::Dehydration => write!(f, "dehydration"),
            Self::Injury => write!(f, "injury"),
        }
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// A character attribute that timed buffs can raise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Attribute {
    /// Carry weight and gathering yield.
    Strength,
    /// Health regeneration.
    Endurance,
    /// Trade prices.
    Charisma,
    /// Crafting and quest dialogue.
    Intelligence,
    /// Random event outcomes.
    Luck,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_mode_defaults_to_normal() {
        assert_eq!(WorldMode::default(), WorldMode::Normal);
        assert!(WorldMode::Doom.is_doom());
        assert!(!WorldMode::Normal.is_doom());
    }

    #[test]
    fn change_reason_display() {
        assert_eq!(ChangeReason::Travel.to_string(), "travel");
        assert_eq!(
            ChangeReason::Scripted(String::from("quest")).to_string(),
            "scripted:quest"
        );
    }

    #[test]
    fn death_cause_display() {
        assert_eq!(DeathCause::Starvation.to_string(), "starvation");
        assert_eq!(DeathCause::Dehydration.to_string(), "dehydration");
        assert_eq!(DeathCause::Injury.to_string(), "injury");
    }

    #[test]
    fn world_mode_serializes_snake_case() {
        let json = serde_json::to_string(&WorldMode::Doom).ok();
        assert_eq!(json.as_deref(), Some("\"doom\""));
    }
}
