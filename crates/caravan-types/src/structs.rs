//! Core data structs shared by the survival, market and world crates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Attribute, LocationKind};
use crate::ids::LocationId;

// ---------------------------------------------------------------------------
// Vitals
// ---------------------------------------------------------------------------

/// The player's survival quadruple.
///
/// Every current value stays within `[0, max]`. Values are [`Decimal`] so that
/// catch-up decay over many intervals is exact: one step scaled by N equals N
/// single steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerVitals {
    /// Current health.
    #[ts(as = "String")]
    pub health: Decimal,
    /// Maximum health.
    #[ts(as = "String")]
    pub max_health: Decimal,
    /// Current satiation (0 = starving).
    #[ts(as = "String")]
    pub hunger: Decimal,
    /// Maximum satiation.
    #[ts(as = "String")]
    pub max_hunger: Decimal,
    /// Current hydration (0 = dehydrated).
    #[ts(as = "String")]
    pub thirst: Decimal,
    /// Maximum hydration.
    #[ts(as = "String")]
    pub max_thirst: Decimal,
    /// Current stamina.
    #[ts(as = "String")]
    pub stamina: Decimal,
    /// Maximum stamina.
    #[ts(as = "String")]
    pub max_stamina: Decimal,
}

impl PlayerVitals {
    /// Create vitals with every stat at its maximum.
    pub const fn full(
        max_health: Decimal,
        max_hunger: Decimal,
        max_thirst: Decimal,
        max_stamina: Decimal,
    ) -> Self {
        Self {
            health: max_health,
            max_health,
            hunger: max_hunger,
            max_hunger,
            thirst: max_thirst,
            max_thirst,
            stamina: max_stamina,
            max_stamina,
        }
    }

    /// Clamp every current value into `[0, max]`.
    pub fn clamp_all(&mut self) {
        self.health = clamp_stat(self.health, self.max_health);
        self.hunger = clamp_stat(self.hunger, self.max_hunger);
        self.thirst = clamp_stat(self.thirst, self.max_thirst);
        self.stamina = clamp_stat(self.stamina, self.max_stamina);
    }

    /// Whether every current value lies within `[0, max]`.
    pub fn is_within_bounds(&self) -> bool {
        in_range(self.health, self.max_health)
            && in_range(self.hunger, self.max_hunger)
            && in_range(self.thirst, self.max_thirst)
            && in_range(self.stamina, self.max_stamina)
    }

    /// Whether health has run out.
    pub fn is_depleted(&self) -> bool {
        self.health <= Decimal::ZERO
    }
}

/// Clamp a stat value into `[0, max]`.
pub fn clamp_stat(value: Decimal, max: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(max.max(Decimal::ZERO))
}

fn in_range(value: Decimal, max: Decimal) -> bool {
    value >= Decimal::ZERO && value <= max
}

// ---------------------------------------------------------------------------
// Attributes and buffs
// ---------------------------------------------------------------------------

/// Base character attributes chosen at character creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Attributes {
    /// Carry weight and gathering yield.
    pub strength: u32,
    /// Health regeneration.
    pub endurance: u32,
    /// Trade prices.
    pub charisma: u32,
    /// Crafting and dialogue.
    pub intelligence: u32,
    /// Random outcomes.
    pub luck: u32,
}

impl Attributes {
    /// Return the base value of one attribute.
    pub const fn get(&self, attribute: Attribute) -> u32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Endurance => self.endurance,
            Attribute::Charisma => self.charisma,
            Attribute::Intelligence => self.intelligence,
            Attribute::Luck => self.luck,
        }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 10,
            endurance: 10,
            charisma: 10,
            intelligence: 10,
            luck: 10,
        }
    }
}

/// A temporary attribute bonus.
///
/// Buffs expire on wall-clock time, not game time: a potion that lasts ten
/// minutes lasts ten real minutes regardless of game speed or pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimedBuff {
    /// Attribute raised by the buff.
    pub attribute: Attribute,
    /// Flat bonus added to the base attribute.
    pub amount: u32,
    /// Wall-clock instant after which the buff no longer applies.
    pub expires_at: DateTime<Utc>,
    /// Where the buff came from (item id, event name).
    pub source: String,
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// Canonical record of a place the player can be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LocationRecord {
    /// Stable identifier.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Flavour text.
    pub description: String,
    /// Broad category.
    pub kind: LocationKind,
    /// Region the location belongs to.
    pub region: String,
    /// Locations reachable directly from here.
    pub connections: Vec<LocationId>,
}

impl LocationRecord {
    /// Build a placeholder record for an id the world graph does not know.
    ///
    /// The id doubles as the display name so procedurally-named locations
    /// still render something meaningful.
    pub fn opaque(id: LocationId) -> Self {
        Self {
            name: id.as_str().to_owned(),
            id,
            description: String::new(),
            kind: LocationKind::Unknown,
            region: String::new(),
            connections: Vec::new(),
        }
    }

    /// Whether this record was synthesised for an unknown id.
    pub fn is_opaque(&self) -> bool {
        self.kind == LocationKind::Unknown && self.description.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Price and stock of one item at one location.
///
/// `base_price` is fixed at seeding time and every tick's price is derived
/// from it, never from the previous tick's price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketPriceRecord {
    /// Immutable anchor price.
    pub base_price: u32,
    /// Current price, never below 1.
    pub price: u32,
    /// Units available for purchase.
    pub stock: u32,
}

impl MarketPriceRecord {
    /// Seed a record at its base price.
    pub fn seeded(base_price: u32, stock: u32) -> Self {
        Self {
            base_price,
            price: base_price.max(1),
            stock,
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Seasonal modifiers published by the time source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SeasonEffects {
    /// Multiplier on hunger decay.
    #[ts(as = "String")]
    pub hunger_drain: Decimal,
    /// Multiplier on thirst decay.
    #[ts(as = "String")]
    pub thirst_drain: Decimal,
    /// Multiplier on travel speed.
    #[ts(as = "String")]
    pub travel_speed: Decimal,
}

impl SeasonEffects {
    /// Effects that change nothing.
    pub const NEUTRAL: Self = Self {
        hunger_drain: Decimal::ONE,
        thirst_drain: Decimal::ONE,
        travel_speed: Decimal::ONE,
    };
}

impl Default for SeasonEffects {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Clock reading broken down for display and price bias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimeInfo {
    /// Hour of day, 0..24.
    pub hour: u32,
    /// Minute of hour, 0..60.
    pub minute: u32,
    /// Inside the morning market window.
    pub is_morning: bool,
    /// Inside the evening market window.
    pub is_evening: bool,
    /// Night time.
    pub is_night: bool,
}
