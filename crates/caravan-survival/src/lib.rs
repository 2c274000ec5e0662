//! Survival mechanics for the Caravan simulation core.
//!
//! Vitals decay and regenerate once per fixed game interval regardless of
//! how often the frame loop calls in. Missed intervals are applied in one
//! linear catch-up step.
//!
//! # Modules
//!
//! - [`config`] -- [`VitalsConfig`] tunables and defaults.
//! - [`vitals`] -- [`SurvivalSimulator`] and the explicit vitals actions.
//! - [`death`] -- Death cause detection and the once-only [`DeathGuard`].
//! - [`buffs`] -- Wall-clock timed attribute buffs.
//! - [`error`] -- Error types.

pub mod buffs;
pub mod config;
pub mod death;
pub mod error;
pub mod vitals;

pub use buffs::BuffLedger;
pub use config::VitalsConfig;
pub use death::{DeathGuard, check_death};
pub use error::SurvivalError;
pub use vitals::{
    Activity, SurvivalInputs, SurvivalOutcome, SurvivalSimulator, apply_drink, apply_eat,
    apply_heal, apply_intervals, apply_rest, spend_stamina,
};
