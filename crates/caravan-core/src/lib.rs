//! Simulation core of the Caravan trading game.
//!
//! This crate owns game time, the world-state authority, the event bus,
//! save snapshots and the per-frame update scheduler. The survival and
//! market rules live in `caravan-survival` and `caravan-market`; this crate
//! wires them together inside one [`SimulationContext`].
//!
//! # Modules
//!
//! - [`clock`]: speed-multiplied game clock and the [`TimeSource`] capability
//! - [`world_state`]: the single authority over location and world mode
//! - [`events`]: synchronous topic-based event bus
//! - [`persistence`]: save snapshots and the [`PersistenceSink`] capability
//! - [`companion`]: non-blocking availability probe for the dialogue service
//! - [`context`]: the [`SimulationContext`] and its builder
//! - [`scheduler`]: the ordered per-frame update loop
//! - [`config`]: YAML configuration with environment overrides

pub mod clock;
pub mod companion;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod persistence;
pub mod scheduler;
pub mod world_state;

pub use clock::{ClockConfig, ClockError, ClockState, GameClock, NullTimeSource, TimeSnapshot, TimeSource};
pub use companion::{CompanionProbe, ProbeStatus};
pub use config::{ConfigError, LogFormat, SimulationConfig};
pub use context::{ContextBuilder, NoticeLevel, SimulationContext, UserNotice};
pub use error::CoreError;
pub use events::{EventBus, GameEvent, Topic};
pub use persistence::{MemorySink, NullSink, PersistenceError, PersistenceSink, SaveSnapshot};
pub use scheduler::{FrameClock, FrameReport, FrameStep, ManualFrameClock, SystemFrameClock, UpdateScheduler};
pub use world_state::{LocationTarget, WorldStateAuthority, WorldStateError};
