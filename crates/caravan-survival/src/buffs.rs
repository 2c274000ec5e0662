//! Timed attribute buffs.
//!
//! Buffs expire on wall-clock time, not game time: a potion that lasts ten
//! minutes lasts ten real minutes even at 4x game speed or while paused.

use caravan_types::{Attribute, Attributes, TimedBuff};
use chrono::{DateTime, Utc};
use tracing::debug;

/// The set of active timed buffs on the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuffLedger {
    buffs: Vec<TimedBuff>,
}

impl BuffLedger {
    /// An empty ledger.
    pub const fn new() -> Self {
        Self { buffs: Vec::new() }
    }

    /// Rebuild a ledger from saved buffs.
    pub const fn from_buffs(buffs: Vec<TimedBuff>) -> Self {
        Self { buffs }
    }

    /// Active (not yet swept) buffs.
    pub fn buffs(&self) -> &[TimedBuff] {
        &self.buffs
    }

    /// Number of buffs held.
    pub fn len(&self) -> usize {
        self.buffs.len()
    }

    /// Whether the ledger holds no buffs.
    pub fn is_empty(&self) -> bool {
        self.buffs.is_empty()
    }

    /// Add a buff. Stacking is allowed; each buff expires on its own.
    pub fn add(&mut self, buff: TimedBuff) {
        debug!(
            attribute = ?buff.attribute,
            amount = buff.amount,
            expires_at = %buff.expires_at,
            source = %buff.source,
            "buff added"
        );
        self.buffs.push(buff);
    }

    /// Remove every buff whose expiry is at or before `now` and return them.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Vec<TimedBuff> {
        let (expired, active): (Vec<_>, Vec<_>) = self
            .buffs
            .drain(..)
            .partition(|buff| buff.expires_at <= now);
        self.buffs = active;
        for buff in &expired {
            debug!(
                attribute = ?buff.attribute,
                amount = buff.amount,
                source = %buff.source,
                "buff expired"
            );
        }
        expired
    }

    /// Total bonus to `attribute` from buffs still active at `now`.
    pub fn bonus(&self, attribute: Attribute, now: DateTime<Utc>) -> u32 {
        self.buffs
            .iter()
            .filter(|buff| buff.attribute == attribute && buff.expires_at > now)
            .fold(0_u32, |acc, buff| acc.saturating_add(buff.amount))
    }

    /// Base attribute plus active buffs.
    pub fn effective(&self, base: &Attributes, attribute: Attribute, now: DateTime<Utc>) -> u32 {
        base.get(attribute)
            .saturating_add(self.bonus(attribute, now))
    }

    /// Drop every buff.
    pub fn clear(&mut self) {
        self.buffs.clear();
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000_i64.saturating_add(seconds), 0)
            .single()
            .unwrap_or_default()
    }

    fn buff(attribute: Attribute, amount: u32, expires_at: DateTime<Utc>) -> TimedBuff {
        TimedBuff {
            attribute,
            amount,
            expires_at,
            source: "test".to_owned(),
        }
    }

    #[test]
    fn bonus_sums_matching_active_buffs() {
        let mut ledger = BuffLedger::new();
        ledger.add(buff(Attribute::Charisma, 3, at(60)));
        ledger.add(buff(Attribute::Charisma, 2, at(120)));
        ledger.add(buff(Attribute::Strength, 7, at(120)));

        assert_eq!(ledger.bonus(Attribute::Charisma, at(0)), 5);
        assert_eq!(ledger.bonus(Attribute::Charisma, at(90)), 2);
        assert_eq!(ledger.bonus(Attribute::Luck, at(0)), 0);
    }

    #[test]
    fn effective_adds_base() {
        let mut ledger = BuffLedger::new();
        ledger.add(buff(Attribute::Endurance, 4, at(60)));
        let base = Attributes::default();
        assert_eq!(ledger.effective(&base, Attribute::Endurance, at(0)), 14);
        assert_eq!(ledger.effective(&base, Attribute::Endurance, at(61)), 10);
    }

    #[test]
    fn expire_removes_only_elapsed() {
        let mut ledger = BuffLedger::new();
        ledger.add(buff(Attribute::Luck, 1, at(10)));
        ledger.add(buff(Attribute::Luck, 1, at(100)));

        let expired = ledger.expire(at(10));
        assert_eq!(expired.len(), 1);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.expire(at(50)).is_empty());
        assert_eq!(ledger.expire(at(100)).len(), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn expiry_uses_wall_clock_duration() {
        let now = at(0);
        let mut ledger = BuffLedger::new();
        ledger.add(buff(Attribute::Strength, 5, now + Duration::minutes(10)));
        assert_eq!(ledger.bonus(Attribute::Strength, now + Duration::minutes(9)), 5);
        assert_eq!(ledger.bonus(Attribute::Strength, now + Duration::minutes(10)), 0);
    }
}
