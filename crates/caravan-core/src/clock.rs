//! Game clock and the [`TimeSource`] capability.
//!
//! The clock is the single source of truth for game time. Real elapsed
//! milliseconds are scaled by the speed multiplier into an accumulator of
//! game milliseconds; everything else (minutes, hour of day, season) is
//! derived from that accumulator and never stored independently.
//!
//! Subsystems never hold the clock. Each frame the scheduler advances it and
//! then takes one [`TimeSnapshot`] that every subsystem reads for that frame.

use std::collections::BTreeMap;

use caravan_types::{Season, SeasonEffects, TimeInfo};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MILLIS_PER_MINUTE: u64 = 60_000;
const MINUTES_PER_HOUR: u64 = 60;
const MINUTES_PER_DAY: u64 = 1_440;
const SEASON_CYCLE: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The game-time accumulator would overflow.
    #[error("game time overflow: cannot advance by {real_ms} ms")]
    Overflow {
        /// Real milliseconds that were being applied.
        real_ms: u64,
    },

    /// Invalid clock configuration or restored state.
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong.
        reason: String,
    },
}

/// Clock tunables, the `clock` section of `caravan-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Game seconds that pass per real second at speed 1 (default: 60).
    pub game_seconds_per_real_second: u64,
    /// Game minute of day a new game starts at (default: 480, 08:00).
    pub start_minute: u64,
    /// In-game days per season (default: 7).
    pub days_per_season: u64,
    /// Initial speed multiplier (default: 1).
    pub speed: u32,
    /// Largest allowed speed multiplier (default: 8).
    pub max_speed: u32,
    /// Hunger, thirst and travel modifiers per season.
    pub season_effects: BTreeMap<Season, SeasonEffects>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            game_seconds_per_real_second: 60,
            start_minute: 480,
            days_per_season: 7,
            speed: 1,
            max_speed: 8,
            season_effects: default_season_effects(),
        }
    }
}

fn default_season_effects() -> BTreeMap<Season, SeasonEffects> {
    let effects = |hunger: Decimal, thirst: Decimal, travel: Decimal| SeasonEffects {
        hunger_drain: hunger,
        thirst_drain: thirst,
        travel_speed: travel,
    };
    BTreeMap::from([
        (Season::Spring, SeasonEffects::NEUTRAL),
        (
            Season::Summer,
            effects(Decimal::ONE, Decimal::new(125, 2), Decimal::ONE),
        ),
        (
            Season::Autumn,
            effects(Decimal::new(110, 2), Decimal::ONE, Decimal::ONE),
        ),
        (
            Season::Winter,
            effects(Decimal::new(125, 2), Decimal::new(90, 2), Decimal::new(80, 2)),
        ),
    ])
}

/// Persisted clock state (`time_state` in the save).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    /// Total game milliseconds elapsed since the start of day 0.
    pub game_millis: u64,
    /// Whether the clock was paused.
    pub paused: bool,
}

/// Read-only view of the clock taken once per frame after it advanced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeSnapshot {
    /// Total elapsed game minutes, or `None` without a time source.
    pub total_minutes: Option<u64>,
    /// Whether the clock is paused.
    pub paused: bool,
    /// Current season.
    pub season: Season,
    /// Seasonal modifiers.
    pub season_effects: SeasonEffects,
    /// Hour and time-of-day windows.
    pub time_info: TimeInfo,
}

impl TimeSnapshot {
    /// Read every value a frame needs from a time source at once.
    pub fn capture(source: &dyn TimeSource) -> Self {
        Self {
            total_minutes: source.total_minutes(),
            paused: source.is_paused(),
            season: source.season(),
            season_effects: source.season_effects(),
            time_info: source.time_info(),
        }
    }
}

/// Capability that supplies game time to the simulation.
pub trait TimeSource: Send {
    /// Advance by `real_ms` real milliseconds. No-op while paused.
    fn advance(&mut self, real_ms: u64) -> Result<(), ClockError>;

    /// Total elapsed game minutes, or `None` if time is unavailable.
    fn total_minutes(&self) -> Option<u64>;

    /// Whether game time is frozen.
    fn is_paused(&self) -> bool;

    /// Freeze or resume game time.
    fn set_paused(&mut self, paused: bool);

    /// Current season.
    fn season(&self) -> Season;

    /// Modifiers for the current season.
    fn season_effects(&self) -> SeasonEffects;

    /// Hour of day and market windows.
    fn time_info(&self) -> TimeInfo;

    /// Current speed multiplier.
    fn speed(&self) -> u32;

    /// Change the speed multiplier.
    fn set_speed(&mut self, speed: u32) -> Result<(), ClockError>;

    /// State to persist.
    fn snapshot_state(&self) -> ClockState;

    /// Replace state from a save.
    fn restore_state(&mut self, state: ClockState, speed: u32) -> Result<(), ClockError>;

    /// Return to the start of a new game.
    fn reset(&mut self);
}

/// Speed-multiplied, pausable game clock with seasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameClock {
    config: ClockConfig,
    game_millis: u64,
    speed: u32,
    paused: bool,
}

impl GameClock {
    /// Create a clock at the configured start minute of day 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] for a zero season length, a
    /// zero time scale or an out-of-range starting speed.
    pub fn new(config: ClockConfig) -> Result<Self, ClockError> {
        if config.days_per_season == 0 {
            return Err(invalid("days_per_season must be at least 1"));
        }
        if config.game_seconds_per_real_second == 0 {
            return Err(invalid("game_seconds_per_real_second must be at least 1"));
        }
        validate_speed(config.speed, config.max_speed)?;
        let game_millis = start_millis(&config)?;
        Ok(Self {
            speed: config.speed,
            config,
            game_millis,
            paused: false,
        })
    }

    /// Total elapsed game minutes.
    pub const fn minutes(&self) -> u64 {
        self.game_millis / MILLIS_PER_MINUTE
    }

    /// Zero-based in-game day.
    pub const fn day(&self) -> u64 {
        self.minutes() / MINUTES_PER_DAY
    }

    /// Jump forward by whole game minutes (sleeping, waiting).
    ///
    /// Unlike [`TimeSource::advance`] this ignores pause and speed.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Overflow`] on overflow.
    pub fn skip_minutes(&mut self, minutes: u64) -> Result<(), ClockError> {
        self.game_millis = minutes
            .checked_mul(MILLIS_PER_MINUTE)
            .and_then(|ms| self.game_millis.checked_add(ms))
            .ok_or(ClockError::Overflow { real_ms: 0 })?;
        Ok(())
    }

    fn season_index(&self) -> usize {
        let index = self
            .day()
            .checked_div(self.config.days_per_season)
            .unwrap_or(0)
            .checked_rem(4)
            .unwrap_or(0);
        usize::try_from(index).unwrap_or(0)
    }
}

impl TimeSource for GameClock {
    fn advance(&mut self, real_ms: u64) -> Result<(), ClockError> {
        if self.paused || real_ms == 0 {
            return Ok(());
        }
        // real_ms * speed * (game seconds per real second) game milliseconds
        let delta = real_ms
            .checked_mul(u64::from(self.speed))
            .and_then(|ms| ms.checked_mul(self.config.game_seconds_per_real_second))
            .ok_or(ClockError::Overflow { real_ms })?;
        self.game_millis = self
            .game_millis
            .checked_add(delta)
            .ok_or(ClockError::Overflow { real_ms })?;
        Ok(())
    }

    fn total_minutes(&self) -> Option<u64> {
        Some(self.minutes())
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            debug!(paused, minutes = self.minutes(), "clock pause toggled");
        }
        self.paused = paused;
    }

    fn season(&self) -> Season {
        SEASON_CYCLE
            .get(self.season_index())
            .copied()
            .unwrap_or_default()
    }

    fn season_effects(&self) -> SeasonEffects {
        self.config
            .season_effects
            .get(&self.season())
            .copied()
            .unwrap_or(SeasonEffects::NEUTRAL)
    }

    fn time_info(&self) -> TimeInfo {
        time_info_at(self.minutes())
    }

    fn speed(&self) -> u32 {
        self.speed
    }

    fn set_speed(&mut self, speed: u32) -> Result<(), ClockError> {
        validate_speed(speed, self.config.max_speed)?;
        debug!(from = self.speed, to = speed, "clock speed changed");
        self.speed = speed;
        Ok(())
    }

    fn snapshot_state(&self) -> ClockState {
        ClockState {
            game_millis: self.game_millis,
            paused: self.paused,
        }
    }

    fn restore_state(&mut self, state: ClockState, speed: u32) -> Result<(), ClockError> {
        validate_speed(speed, self.config.max_speed)?;
        self.game_millis = state.game_millis;
        self.paused = state.paused;
        self.speed = speed;
        Ok(())
    }

    fn reset(&mut self) {
        self.game_millis = start_millis(&self.config).unwrap_or(0);
        self.speed = self.config.speed;
        self.paused = false;
    }
}

/// Break a total-minute count down into hour, minute and market windows.
///
/// Morning is 06:00-11:59, evening 17:00-20:59, night 21:00-05:59.
pub fn time_info_at(total_minutes: u64) -> TimeInfo {
    let of_day = total_minutes.checked_rem(MINUTES_PER_DAY).unwrap_or(0);
    let hour = u32::try_from(of_day.checked_div(MINUTES_PER_HOUR).unwrap_or(0)).unwrap_or(0);
    let minute = u32::try_from(of_day.checked_rem(MINUTES_PER_HOUR).unwrap_or(0)).unwrap_or(0);
    TimeInfo {
        hour,
        minute,
        is_morning: (6..12).contains(&hour),
        is_evening: (17..21).contains(&hour),
        is_night: !(6..21).contains(&hour),
    }
}

/// Time source used when no clock is wired in. Time never passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTimeSource;

impl TimeSource for NullTimeSource {
    fn advance(&mut self, _real_ms: u64) -> Result<(), ClockError> {
        Ok(())
    }

    fn total_minutes(&self) -> Option<u64> {
        None
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn set_paused(&mut self, _paused: bool) {}

    fn season(&self) -> Season {
        Season::default()
    }

    fn season_effects(&self) -> SeasonEffects {
        SeasonEffects::NEUTRAL
    }

    fn time_info(&self) -> TimeInfo {
        TimeInfo::default()
    }

    fn speed(&self) -> u32 {
        1
    }

    fn set_speed(&mut self, _speed: u32) -> Result<(), ClockError> {
        Ok(())
    }

    fn snapshot_state(&self) -> ClockState {
        ClockState::default()
    }

    fn restore_state(&mut self, _state: ClockState, _speed: u32) -> Result<(), ClockError> {
        Ok(())
    }

    fn reset(&mut self) {}
}

fn start_millis(config: &ClockConfig) -> Result<u64, ClockError> {
    config
        .start_minute
        .checked_mul(MILLIS_PER_MINUTE)
        .ok_or_else(|| invalid("start_minute out of range"))
}

fn validate_speed(speed: u32, max_speed: u32) -> Result<(), ClockError> {
    if speed == 0 || speed > max_speed {
        return Err(ClockError::InvalidConfig {
            reason: format!("speed {speed} outside 1..={max_speed}"),
        });
    }
    Ok(())
}

fn invalid(reason: &str) -> ClockError {
    ClockError::InvalidConfig {
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn clock() -> GameClock {
        GameClock::new(ClockConfig::default()).unwrap_or_else(|_| fallback_clock())
    }

    fn fallback_clock() -> GameClock {
        GameClock {
            config: ClockConfig::default(),
            game_millis: 0,
            speed: 1,
            paused: false,
        }
    }

    #[test]
    fn starts_at_eight_in_the_morning() {
        let c = clock();
        assert_eq!(c.total_minutes(), Some(480));
        let info = c.time_info();
        assert_eq!(info.hour, 8);
        assert!(info.is_morning);
        assert!(!info.is_night);
    }

    #[test]
    fn one_real_second_is_one_game_minute_at_speed_one() {
        let mut c = clock();
        assert!(c.advance(1_000).is_ok());
        assert_eq!(c.total_minutes(), Some(481));
    }

    #[test]
    fn speed_multiplies_advance() {
        let mut c = clock();
        assert!(c.set_speed(4).is_ok());
        assert!(c.advance(1_000).is_ok());
        assert_eq!(c.total_minutes(), Some(484));
    }

    #[test]
    fn sub_minute_frames_accumulate() {
        let mut c = clock();
        for _ in 0..60 {
            assert!(c.advance(16).is_ok());
        }
        // 60 * 16ms = 960ms real = 57.6 game seconds: still minute 480.
        assert_eq!(c.total_minutes(), Some(480));
        assert!(c.advance(40).is_ok());
        assert_eq!(c.total_minutes(), Some(481));
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let mut c = clock();
        c.set_paused(true);
        assert!(c.advance(60_000).is_ok());
        assert_eq!(c.total_minutes(), Some(480));
    }

    #[test]
    fn invalid_speed_rejected() {
        let mut c = clock();
        assert!(c.set_speed(0).is_err());
        assert!(c.set_speed(9).is_err());
        assert_eq!(c.speed(), 1);
    }

    #[test]
    fn seasons_cycle() {
        let mut c = clock();
        assert_eq!(c.season(), Season::Spring);
        assert!(c.skip_minutes(7 * MINUTES_PER_DAY).is_ok());
        assert_eq!(c.season(), Season::Summer);
        assert!(c.skip_minutes(21 * MINUTES_PER_DAY).is_ok());
        assert_eq!(c.season(), Season::Spring);
        assert!(c.skip_minutes(21 * MINUTES_PER_DAY).is_ok());
        assert_eq!(c.season(), Season::Winter);
        assert!(c.season_effects().hunger_drain > Decimal::ONE);
    }

    #[test]
    fn time_windows() {
        assert!(time_info_at(6 * 60).is_morning);
        assert!(!time_info_at(12 * 60).is_morning);
        assert!(time_info_at(17 * 60).is_evening);
        assert!(time_info_at(21 * 60).is_night);
        assert!(time_info_at(3 * 60).is_night);
        let info = time_info_at(MINUTES_PER_DAY + 13 * 60 + 37);
        assert_eq!((info.hour, info.minute), (13, 37));
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut c = clock();
        assert!(c.advance(90_000).is_ok());
        assert!(c.set_speed(2).is_ok());
        let state = c.snapshot_state();

        let mut other = clock();
        assert!(other.restore_state(state, c.speed()).is_ok());
        assert_eq!(other.total_minutes(), c.total_minutes());
        assert_eq!(other.speed(), 2);
    }

    #[test]
    fn reset_returns_to_start() {
        let mut c = clock();
        assert!(c.advance(600_000).is_ok());
        c.set_paused(true);
        c.reset();
        assert_eq!(c.total_minutes(), Some(480));
        assert!(!c.is_paused());
    }

    #[test]
    fn zero_season_length_rejected() {
        let config = ClockConfig {
            days_per_season: 0,
            ..ClockConfig::default()
        };
        assert!(GameClock::new(config).is_err());
    }

    #[test]
    fn null_source_has_no_time() {
        let mut null = NullTimeSource;
        assert!(null.advance(1_000).is_ok());
        assert_eq!(null.total_minutes(), None);
        assert_eq!(TimeSnapshot::capture(&null).total_minutes, None);
    }
}
