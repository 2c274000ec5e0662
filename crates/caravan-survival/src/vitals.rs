//! Survival mechanics applied to the player's vitals.
//!
//! Decay and regeneration are computed per fixed game interval
//! ([`VitalsConfig::interval_minutes`]), never per frame:
//!
//! - `intervals = floor(total / interval) - floor(last / interval)`
//! - Zero intervals is a no-op, so a 240 Hz display never double-decays.
//! - N missed intervals are applied as one computation scaled by N. Because
//!   every term is linear in N and all arithmetic is exact [`Decimal`], the
//!   catch-up result equals N single-interval applications whenever no
//!   threshold is crossed along the way.
//!
//! # Order of operations (per tick)
//!
//! 1. Hunger and thirst decay (season and doom multipliers)
//! 2. Stamina regen when idle
//! 3. Health regen if hunger and thirst are above the critical threshold
//! 4. Starvation/dehydration damage as a fraction of max health
//! 5. Clamp everything into `[0, max]`
//! 6. Death check
//!
//! All arithmetic uses checked operations. No panics, no silent overflow.

use caravan_types::{DeathCause, PlayerVitals, SeasonEffects, WorldMode, clamp_stat};
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::config::VitalsConfig;
use crate::death::check_death;
use crate::error::SurvivalError;

/// What the player is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Activity {
    /// Gathering resources (no stamina regen).
    pub gathering: bool,
    /// Travelling between locations (no stamina regen).
    pub traveling: bool,
}

impl Activity {
    /// Whether the player is resting in place.
    pub const fn is_idle(self) -> bool {
        !self.gathering && !self.traveling
    }
}

/// Everything one survival tick reads from the rest of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurvivalInputs {
    /// Total elapsed game minutes (monotonic).
    pub total_minutes: u64,
    /// Whether the game clock is paused.
    pub paused: bool,
    /// Current activity flags.
    pub activity: Activity,
    /// Seasonal decay modifiers.
    pub season: SeasonEffects,
    /// Current world mode (doom doubles decay).
    pub world_mode: WorldMode,
    /// Effective endurance, buffs included.
    pub endurance: u32,
}

/// Result of one survival tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurvivalOutcome {
    /// Number of intervals applied (0 for a no-op tick).
    pub intervals: u64,
    /// If health ran out during this tick, the cause.
    pub death: Option<DeathCause>,
}

/// Converts elapsed game time into catch-up vitals decay and regen.
///
/// The simulator remembers the last game minute it processed. The first
/// tick after construction or [`reset`](Self::reset) only records that
/// baseline, so time that passed before the simulator existed is never
/// charged to the player.
#[derive(Debug, Clone)]
pub struct SurvivalSimulator {
    config: VitalsConfig,
    last_processed_minutes: Option<u64>,
}

impl SurvivalSimulator {
    /// Create a simulator with no baseline yet.
    pub const fn new(config: VitalsConfig) -> Self {
        Self {
            config,
            last_processed_minutes: None,
        }
    }

    /// The configuration in use.
    pub const fn config(&self) -> &VitalsConfig {
        &self.config
    }

    /// The last game minute that was processed, if any.
    pub const fn last_processed_minutes(&self) -> Option<u64> {
        self.last_processed_minutes
    }

    /// Restore the baseline from a save.
    pub const fn restore(&mut self, last_processed_minutes: Option<u64>) {
        self.last_processed_minutes = last_processed_minutes;
    }

    /// Forget the baseline (new game).
    pub const fn reset(&mut self) {
        self.last_processed_minutes = None;
    }

    /// Number of whole intervals between two minute readings.
    ///
    /// Returns 0 when `total` is not past `last` or the interval is zero.
    pub fn intervals_between(&self, last: u64, total: u64) -> u64 {
        let Some(now) = total.checked_div(self.config.interval_minutes) else {
            return 0;
        };
        let Some(then) = last.checked_div(self.config.interval_minutes) else {
            return 0;
        };
        now.saturating_sub(then)
    }

    /// Apply all intervals elapsed since the last processed minute.
    ///
    /// Paused clocks and ticks within the same interval are no-ops. The
    /// vitals are only written if the whole computation succeeds; on error
    /// they are left untouched and the baseline is not advanced, so the next
    /// frame retries.
    ///
    /// # Errors
    ///
    /// Returns [`SurvivalError::ArithmeticOverflow`] if a checked operation
    /// fails.
    pub fn tick(
        &mut self,
        vitals: &mut PlayerVitals,
        inputs: &SurvivalInputs,
    ) -> Result<SurvivalOutcome, SurvivalError> {
        if inputs.paused {
            return Ok(SurvivalOutcome::default());
        }

        let Some(last) = self.last_processed_minutes else {
            debug!(
                total_minutes = inputs.total_minutes,
                "survival baseline recorded"
            );
            self.last_processed_minutes = Some(inputs.total_minutes);
            return Ok(SurvivalOutcome::default());
        };

        if inputs.total_minutes < last {
            // The clock moved backwards (restored save): re-anchor without decay.
            debug!(
                last,
                total_minutes = inputs.total_minutes,
                "survival baseline moved backwards, re-anchoring"
            );
            self.last_processed_minutes = Some(inputs.total_minutes);
            return Ok(SurvivalOutcome::default());
        }

        let intervals = self.intervals_between(last, inputs.total_minutes);
        if intervals == 0 {
            return Ok(SurvivalOutcome::default());
        }

        let mut next = vitals.clone();
        apply_intervals(&mut next, &self.config, inputs, intervals)?;
        *vitals = next;
        self.last_processed_minutes = Some(inputs.total_minutes);

        trace!(
            intervals,
            health = %vitals.health,
            hunger = %vitals.hunger,
            thirst = %vitals.thirst,
            stamina = %vitals.stamina,
            "survival tick applied"
        );

        Ok(SurvivalOutcome {
            intervals,
            death: check_death(vitals),
        })
    }
}

/// Apply `intervals` survival intervals to `vitals` in one step.
///
/// This is the pure catch-up computation behind [`SurvivalSimulator::tick`].
///
/// # Errors
///
/// Returns [`SurvivalError::ArithmeticOverflow`] if a checked operation
/// fails. `vitals` may be partially updated in that case; callers that need
/// atomicity work on a copy.
pub fn apply_intervals(
    vitals: &mut PlayerVitals,
    config: &VitalsConfig,
    inputs: &SurvivalInputs,
    intervals: u64,
) -> Result<(), SurvivalError> {
    let n = Decimal::from(intervals);
    let doom = if inputs.world_mode.is_doom() {
        config.doom_decay_multiplier
    } else {
        Decimal::ONE
    };

    // 1. Hunger and thirst decay
    let hunger_decay = product(
        &[config.hunger_rate, inputs.season.hunger_drain, doom, n],
        "hunger decay",
    )?;
    vitals.hunger = clamp_stat(sub(vitals.hunger, hunger_decay, "hunger")?, vitals.max_hunger);

    let thirst_decay = product(
        &[config.thirst_rate, inputs.season.thirst_drain, doom, n],
        "thirst decay",
    )?;
    vitals.thirst = clamp_stat(sub(vitals.thirst, thirst_decay, "thirst")?, vitals.max_thirst);

    // 2. Stamina regen while idle
    if inputs.activity.is_idle() {
        let regen = product(&[config.stamina_regen, n], "stamina regen")?;
        vitals.stamina = clamp_stat(add(vitals.stamina, regen, "stamina")?, vitals.max_stamina);
    }

    // 3. Health regen
    let regen = health_regen_per_interval(vitals, config, inputs.endurance)?;
    let regen = product(&[regen, n], "health regen")?;

    // 4. Starvation / dehydration damage
    let damage = if vitals.hunger <= Decimal::ZERO || vitals.thirst <= Decimal::ZERO {
        product(
            &[vitals.max_health, config.starvation_drain_percent, n],
            "starvation damage",
        )?
    } else {
        Decimal::ZERO
    };

    // 5. Clamp
    let health = sub(add(vitals.health, regen, "health regen")?, damage, "health damage")?;
    vitals.health = clamp_stat(health, vitals.max_health);

    Ok(())
}

/// Health regenerated in one interval given the current vitals.
///
/// Zero unless hunger and thirst are both above the critical fraction of
/// their maxima. The well-fed bonus applies when both are above the higher
/// fraction. Endurance adds a linear term.
fn health_regen_per_interval(
    vitals: &PlayerVitals,
    config: &VitalsConfig,
    endurance: u32,
) -> Result<Decimal, SurvivalError> {
    let hunger_critical = product(&[vitals.max_hunger, config.critical_threshold], "threshold")?;
    let thirst_critical = product(&[vitals.max_thirst, config.critical_threshold], "threshold")?;
    if vitals.hunger <= hunger_critical || vitals.thirst <= thirst_critical {
        return Ok(Decimal::ZERO);
    }

    let mut regen = config.health_regen;

    let hunger_fed = product(&[vitals.max_hunger, config.well_fed_threshold], "threshold")?;
    let thirst_fed = product(&[vitals.max_thirst, config.well_fed_threshold], "threshold")?;
    if vitals.hunger > hunger_fed && vitals.thirst > thirst_fed {
        regen = add(regen, config.well_fed_bonus, "well fed bonus")?;
    }

    let endurance_term = product(
        &[Decimal::from(endurance), config.endurance_regen_factor],
        "endurance regen",
    )?;
    add(regen, endurance_term, "endurance regen")
}

// ---------------------------------------------------------------------------
// Explicit actions
// ---------------------------------------------------------------------------

/// Recover stamina by resting. Clamped to max stamina.
///
/// # Errors
///
/// Returns [`SurvivalError::ArithmeticOverflow`] on overflow.
pub fn apply_rest(vitals: &mut PlayerVitals, stamina: Decimal) -> Result<(), SurvivalError> {
    vitals.stamina = clamp_stat(add(vitals.stamina, stamina, "rest")?, vitals.max_stamina);
    Ok(())
}

/// Eat food: restore hunger and optionally some health. Both clamped.
///
/// # Errors
///
/// Returns [`SurvivalError::ArithmeticOverflow`] on overflow.
pub fn apply_eat(
    vitals: &mut PlayerVitals,
    hunger: Decimal,
    health: Decimal,
) -> Result<(), SurvivalError> {
    vitals.hunger = clamp_stat(add(vitals.hunger, hunger, "eat")?, vitals.max_hunger);
    vitals.health = clamp_stat(add(vitals.health, health, "eat health")?, vitals.max_health);
    Ok(())
}

/// Drink: restore thirst. Clamped to max thirst.
///
/// # Errors
///
/// Returns [`SurvivalError::ArithmeticOverflow`] on overflow.
pub fn apply_drink(vitals: &mut PlayerVitals, thirst: Decimal) -> Result<(), SurvivalError> {
    vitals.thirst = clamp_stat(add(vitals.thirst, thirst, "drink")?, vitals.max_thirst);
    Ok(())
}

/// Heal (or, with a negative amount, damage) the player directly.
///
/// # Errors
///
/// Returns [`SurvivalError::ArithmeticOverflow`] on overflow.
pub fn apply_heal(
    vitals: &mut PlayerVitals,
    amount: Decimal,
) -> Result<(), SurvivalError> {
    vitals.health = clamp_stat(add(vitals.health, amount, "health change")?, vitals.max_health);
    Ok(())
}

/// Spend stamina on an action.
///
/// Returns `false` without changing anything if the player does not have
/// enough stamina.
pub fn spend_stamina(vitals: &mut PlayerVitals, cost: Decimal) -> bool {
    if cost > vitals.stamina {
        return false;
    }
    let Some(remaining) = vitals.stamina.checked_sub(cost) else {
        return false;
    };
    vitals.stamina = clamp_stat(remaining, vitals.max_stamina);
    true
}

// ---------------------------------------------------------------------------
// Checked helpers
// ---------------------------------------------------------------------------

fn overflow(context: &str) -> SurvivalError {
    SurvivalError::ArithmeticOverflow {
        context: context.to_owned(),
    }
}

fn add(a: Decimal, b: Decimal, context: &str) -> Result<Decimal, SurvivalError> {
    a.checked_add(b).ok_or_else(|| overflow(context))
}

fn sub(a: Decimal, b: Decimal, context: &str) -> Result<Decimal, SurvivalError> {
    a.checked_sub(b).ok_or_else(|| overflow(context))
}

fn product(factors: &[Decimal], context: &str) -> Result<Decimal, SurvivalError> {
    factors.iter().try_fold(Decimal::ONE, |acc, f| {
        acc.checked_mul(*f).ok_or_else(|| overflow(context))
    })
}
