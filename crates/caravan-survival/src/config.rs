//! Configuration constants and defaults for survival mechanics.
//!
//! These values live under the `vitals` key of `caravan-config.yaml`. The
//! [`VitalsConfig`] struct bundles every tunable so that callers (the frame
//! scheduler, tests) can override defaults.

use caravan_types::PlayerVitals;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::SurvivalError;

/// Configuration for survival mechanics applied once per game interval.
///
/// Rates are per interval. Thresholds are fractions of the stat's maximum so
/// the same configuration works for any character build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    /// Length of one survival interval in game minutes (default: 5).
    pub interval_minutes: u64,

    /// Hunger lost per interval before modifiers (default: 0.35).
    pub hunger_rate: Decimal,

    /// Thirst lost per interval before modifiers (default: 0.5).
    pub thirst_rate: Decimal,

    /// Stamina regained per idle interval (default: 2).
    pub stamina_regen: Decimal,

    /// Base health regained per interval when not hungry or thirsty (default: 0.1).
    pub health_regen: Decimal,

    /// Extra health per interval when well fed and watered (default: 0.1).
    pub well_fed_bonus: Decimal,

    /// Health per interval per point of endurance (default: 0.01).
    pub endurance_regen_factor: Decimal,

    /// Fraction of max hunger/thirst both must exceed for any regen (default: 0.25).
    pub critical_threshold: Decimal,

    /// Fraction of max hunger/thirst both must exceed for the bonus (default: 0.75).
    pub well_fed_threshold: Decimal,

    /// Fraction of max health lost per interval while starving or
    /// dehydrated (default: 0.00347).
    pub starvation_drain_percent: Decimal,

    /// Decay multiplier while in the doom overlay (default: 2).
    pub doom_decay_multiplier: Decimal,

    /// Starting maximum health (default: 100).
    pub max_health: Decimal,

    /// Starting maximum hunger (default: 100).
    pub max_hunger: Decimal,

    /// Starting maximum thirst (default: 100).
    pub max_thirst: Decimal,

    /// Starting maximum stamina (default: 100).
    pub max_stamina: Decimal,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            hunger_rate: Decimal::new(35, 2),
            thirst_rate: Decimal::new(5, 1),
            stamina_regen: Decimal::TWO,
            health_regen: Decimal::new(1, 1),
            well_fed_bonus: Decimal::new(1, 1),
            endurance_regen_factor: Decimal::new(1, 2),
            critical_threshold: Decimal::new(25, 2),
            well_fed_threshold: Decimal::new(75, 2),
            starvation_drain_percent: Decimal::new(347, 5),
            doom_decay_multiplier: Decimal::TWO,
            max_health: Decimal::ONE_HUNDRED,
            max_hunger: Decimal::ONE_HUNDRED,
            max_thirst: Decimal::ONE_HUNDRED,
            max_stamina: Decimal::ONE_HUNDRED,
        }
    }
}

impl VitalsConfig {
    /// Vitals for a freshly created character: every stat full.
    pub const fn starting_vitals(&self) -> PlayerVitals {
        PlayerVitals::full(
            self.max_health,
            self.max_hunger,
            self.max_thirst,
            self.max_stamina,
        )
    }

    /// Check the configuration for values that would break the simulation.
    ///
    /// # Errors
    ///
    /// Returns [`SurvivalError::InvalidConfig`] for a zero interval, negative
    /// rates, thresholds outside `[0, 1]` or non-positive maxima.
    pub fn validate(&self) -> Result<(), SurvivalError> {
        if self.interval_minutes == 0 {
            return Err(invalid("interval_minutes must be at least 1"));
        }
        let rates = [
            ("hunger_rate", self.hunger_rate),
            ("thirst_rate", self.thirst_rate),
            ("stamina_regen", self.stamina_regen),
            ("health_regen", self.health_regen),
            ("well_fed_bonus", self.well_fed_bonus),
            ("endurance_regen_factor", self.endurance_regen_factor),
            ("starvation_drain_percent", self.starvation_drain_percent),
            ("doom_decay_multiplier", self.doom_decay_multiplier),
        ];
        for (name, value) in rates {
            if value < Decimal::ZERO {
                return Err(invalid(&format!("{name} must not be negative")));
            }
        }
        for (name, value) in [
            ("critical_threshold", self.critical_threshold),
            ("well_fed_threshold", self.well_fed_threshold),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(invalid(&format!("{name} must be within [0, 1]")));
            }
        }
        for (name, value) in [
            ("max_health", self.max_health),
            ("max_hunger", self.max_hunger),
            ("max_thirst", self.max_thirst),
            ("max_stamina", self.max_stamina),
        ] {
            if value <= Decimal::ZERO {
                return Err(invalid(&format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> SurvivalError {
    SurvivalError::InvalidConfig {
        reason: reason.to_owned(),
    }
}
