//! Price formulas.
//!
//! ```text
//! price = base_price * (1 + fluctuation) * time_of_day_bias * event_multiplier
//! ```
//!
//! The fluctuation is always applied to the immutable base price, never to
//! the previous price, so prices cannot drift. Results are rounded half away
//! from zero and floored at 1.

use caravan_types::TimeInfo;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Largest fluctuation magnitude in basis points (5%).
pub const MAX_FLUCTUATION_BPS: i64 = 500;

const MIN_FLUCTUATION_BPS: i64 = -500;

/// Lowest price any formula can produce.
pub const PRICE_FLOOR: u32 = 1;

/// Largest magnitude of the charisma trade modifier (50%).
pub const CHARISMA_MODIFIER_CAP: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

const CHARISMA_MODIFIER_MIN: Decimal = Decimal::from_parts(5, 0, 0, true, 1);

/// Charisma at which trades are neither cheaper nor dearer.
pub const NEUTRAL_CHARISMA: u32 = 10;

/// Convert a fluctuation in basis points into a fraction.
///
/// Values outside `[-500, 500]` are clamped.
pub fn fluctuation_from_bps(bps: i64) -> Decimal {
    Decimal::new(bps.clamp(MIN_FLUCTUATION_BPS, MAX_FLUCTUATION_BPS), 4)
}

/// Market bias for the time of day: +2% in the morning, -2% in the evening.
pub fn time_of_day_bias(time: &TimeInfo) -> Decimal {
    if time.is_morning {
        Decimal::new(102, 2)
    } else if time.is_evening {
        Decimal::new(98, 2)
    } else {
        Decimal::ONE
    }
}

/// Compute a live price from its base and the current multipliers.
///
/// Never returns less than [`PRICE_FLOOR`], whatever the multipliers.
pub fn compute_price(
    base_price: u32,
    fluctuation: Decimal,
    bias: Decimal,
    event_multiplier: Decimal,
) -> u32 {
    Decimal::ONE
        .checked_add(fluctuation)
        .and_then(|swing| {
            [swing, bias, event_multiplier]
                .into_iter()
                .try_fold(Decimal::from(base_price), Decimal::checked_mul)
        })
        .map_or(u32::MAX, to_price)
}

/// Charisma trade modifier: `(charisma - 10) * 2%`, clamped to +/-50%.
pub fn charisma_modifier(charisma: u32) -> Decimal {
    let delta = i64::from(charisma).saturating_sub(i64::from(NEUTRAL_CHARISMA));
    Decimal::from(delta)
        .checked_mul(Decimal::new(2, 2))
        .unwrap_or_default()
        .clamp(CHARISMA_MODIFIER_MIN, CHARISMA_MODIFIER_CAP)
}

/// Unit price the player pays when buying.
pub fn buy_price(price: u32, charisma: u32) -> u32 {
    Decimal::ONE
        .checked_sub(charisma_modifier(charisma))
        .and_then(|factor| Decimal::from(price).checked_mul(factor))
        .map_or(u32::MAX, to_price)
}

/// Unit price the player receives when selling.
pub fn sell_price(price: u32, sell_ratio: Decimal, charisma: u32) -> u32 {
    Decimal::ONE
        .checked_add(charisma_modifier(charisma))
        .and_then(|factor| {
            [sell_ratio, factor]
                .into_iter()
                .try_fold(Decimal::from(price), Decimal::checked_mul)
        })
        .map_or(PRICE_FLOOR, to_price)
}

/// Round half away from zero, floor at [`PRICE_FLOOR`], saturate at `u32::MAX`.
fn to_price(raw: Decimal) -> u32 {
    let rounded = raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    if rounded < Decimal::from(PRICE_FLOOR) {
        return PRICE_FLOOR;
    }
    rounded.to_u32().unwrap_or(u32::MAX)
}
