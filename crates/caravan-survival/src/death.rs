//! Death detection and the once-only death sequence.
//!
//! When health reaches zero the death sequence (game-over screen, save
//! wipe, whatever the host wires in) must run exactly once. A second trigger
//! arriving while the first is still running is suppressed and logged.

use caravan_types::{DeathCause, PlayerVitals};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Determine whether the player is dead and why.
///
/// Returns `None` while health is above zero. Starvation takes precedence
/// over dehydration; if neither stat is empty the cause is an injury.
pub fn check_death(vitals: &PlayerVitals) -> Option<DeathCause> {
    if !vitals.is_depleted() {
        return None;
    }
    if vitals.hunger <= Decimal::ZERO {
        Some(DeathCause::Starvation)
    } else if vitals.thirst <= Decimal::ZERO {
        Some(DeathCause::Dehydration)
    } else {
        Some(DeathCause::Injury)
    }
}

/// Guard that lets the death sequence run only once per life.
#[derive(Debug, Clone, Default)]
pub struct DeathGuard {
    in_progress: Option<DeathCause>,
}

impl DeathGuard {
    /// A guard with no death in progress.
    pub const fn new() -> Self {
        Self { in_progress: None }
    }

    /// Whether a death sequence has started and not been reset.
    pub const fn is_in_progress(&self) -> bool {
        self.in_progress.is_some()
    }

    /// The cause of the death in progress, if any.
    pub const fn cause(&self) -> Option<DeathCause> {
        self.in_progress
    }

    /// Mark a death as started. Returns `false` if one already is.
    pub fn begin(&mut self, cause: DeathCause) -> bool {
        if let Some(current) = self.in_progress {
            warn!(
                current = %current,
                suppressed = %cause,
                "death sequence already in progress, trigger suppressed"
            );
            return false;
        }
        info!(cause = %cause, "death sequence started");
        self.in_progress = Some(cause);
        true
    }

    /// Run `handler` for `cause` unless a death is already in progress.
    ///
    /// Returns whether the handler ran.
    pub fn run<F>(&mut self, cause: DeathCause, handler: F) -> bool
    where
        F: FnOnce(DeathCause),
    {
        if !self.begin(cause) {
            return false;
        }
        handler(cause);
        true
    }

    /// Clear the guard (new game or load).
    pub const fn reset(&mut self) {
        self.in_progress = None;
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::VitalsConfig;

    fn dead(hunger: Decimal, thirst: Decimal) -> PlayerVitals {
        let mut v = VitalsConfig::default().starting_vitals();
        v.health = Decimal::ZERO;
        v.hunger = hunger;
        v.thirst = thirst;
        v
    }

    #[test]
    fn alive_player_has_no_cause() {
        let v = VitalsConfig::default().starting_vitals();
        assert_eq!(check_death(&v), None);
    }

    #[test]
    fn cause_priority() {
        assert_eq!(
            check_death(&dead(Decimal::ZERO, Decimal::ZERO)),
            Some(DeathCause::Starvation)
        );
        assert_eq!(
            check_death(&dead(dec!(40), Decimal::ZERO)),
            Some(DeathCause::Dehydration)
        );
        assert_eq!(
            check_death(&dead(dec!(40), dec!(40))),
            Some(DeathCause::Injury)
        );
    }

    #[test]
    fn handler_runs_once_until_reset() {
        let mut guard = DeathGuard::new();
        let mut calls = 0_u32;

        assert!(guard.run(DeathCause::Starvation, |_| calls = calls.saturating_add(1)));
        assert!(!guard.run(DeathCause::Injury, |_| calls = calls.saturating_add(1)));
        assert!(!guard.run(DeathCause::Starvation, |_| calls = calls.saturating_add(1)));
        assert_eq!(calls, 1);
        assert_eq!(guard.cause(), Some(DeathCause::Starvation));

        guard.reset();
        assert!(!guard.is_in_progress());
        assert!(guard.run(DeathCause::Dehydration, |_| calls = calls.saturating_add(1)));
        assert_eq!(calls, 2);
    }

    #[test]
    fn reentrant_trigger_from_inside_handler_is_suppressed() {
        let mut guard = DeathGuard::new();
        assert!(guard.begin(DeathCause::Injury));
        // The handler of the first death tries to start another.
        assert!(!guard.begin(DeathCause::Injury));
        assert!(guard.is_in_progress());
    }
}
