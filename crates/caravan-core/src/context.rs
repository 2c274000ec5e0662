//! The simulation context: every piece of live game state in one place.
//!
//! There are no globals. The host builds one [`SimulationContext`] with the
//! capabilities it has (time source, world graph, save storage, companion
//! probe), missing ones are replaced by null objects, and the context is
//! passed by reference to the scheduler and the UI layer.
//!
//! # Lifecycle
//!
//! - [`new_game`](SimulationContext::new_game) resets everything and places
//!   the player at the starting location.
//! - [`save_state`](SimulationContext::save_state) /
//!   [`load_state`](SimulationContext::load_state) snapshot and restore.
//!   Loading rebuilds every subsystem from the snapshot before touching live
//!   state, so a bad save leaves the running game unchanged.

use std::collections::VecDeque;

use caravan_market::{ItemCatalog, MarketPriceEngine, MarketTickReport, TradeReceipt};
use caravan_survival::{
    Activity, BuffLedger, DeathGuard, SurvivalError, SurvivalInputs, SurvivalOutcome,
    SurvivalSimulator, apply_drink, apply_eat, apply_heal, apply_rest, spend_stamina,
};
use caravan_types::{
    Attribute, Attributes, ChangeReason, DeathCause, ItemId, LocationId, LocationRecord,
    PlayerVitals, SnapshotId, TimedBuff, WorldMode,
};
use caravan_world::{EmptyWorld, WorldGraph};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{ClockError, NullTimeSource, TimeSnapshot, TimeSource};
use crate::companion::{CompanionProbe, ProbeStatus};
use crate::config::SimulationConfig;
use crate::error::CoreError;
use crate::events::{EventBus, GameEvent, Topic};
use crate::persistence::{
    self, NullSink, PersistenceSink, PlayerSnapshot, SAVE_VERSION, SaveSnapshot,
    SurvivalSnapshot,
};
use crate::world_state::{LocationTarget, WorldStateAuthority};

// ---------------------------------------------------------------------------
// Notices and requests
// ---------------------------------------------------------------------------

/// Severity of a [`UserNotice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something went wrong but the game continues.
    Warning,
    /// An operation failed.
    Error,
}

/// A message for the player, queued without blocking the frame loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserNotice {
    /// Severity.
    pub level: NoticeLevel,
    /// Human-readable text.
    pub message: String,
    /// When the notice was raised.
    pub raised_at: DateTime<Utc>,
}

/// A location change queued by a subsystem that does not own the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRequest {
    /// Where to go.
    pub target: LocationTarget,
    /// Why.
    pub reason: ChangeReason,
}

/// What the polling step of a frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Buffs that expired.
    pub expired_buffs: usize,
    /// Queued location requests applied.
    pub location_changes: usize,
    /// Companion status after polling.
    pub companion: ProbeStatus,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`SimulationContext`] from whichever capabilities exist.
pub struct ContextBuilder {
    config: SimulationConfig,
    time: Option<Box<dyn TimeSource>>,
    world: Option<Box<dyn WorldGraph>>,
    sink: Option<Box<dyn PersistenceSink>>,
    catalog: Option<ItemCatalog>,
    companion: Option<CompanionProbe>,
}

impl ContextBuilder {
    /// Supply the time source.
    #[must_use]
    pub fn time_source(mut self, time: Box<dyn TimeSource>) -> Self {
        self.time = Some(time);
        self
    }

    /// Supply the world graph.
    #[must_use]
    pub fn world_graph(mut self, world: Box<dyn WorldGraph>) -> Self {
        self.world = Some(world);
        self
    }

    /// Supply save storage.
    #[must_use]
    pub fn persistence(mut self, sink: Box<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Supply the item catalog (defaults to the standard goods).
    #[must_use]
    pub fn catalog(mut self, catalog: ItemCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Supply a running companion probe.
    #[must_use]
    pub fn companion(mut self, probe: CompanionProbe) -> Self {
        self.companion = Some(probe);
        self
    }

    /// Build the context. Absent capabilities become null objects, each
    /// logged once at warn.
    pub fn build(self) -> SimulationContext {
        let time = self.time.unwrap_or_else(|| {
            warn!(capability = "time_source", "missing dependency, using null object");
            Box::new(NullTimeSource)
        });
        let world_graph = self.world.unwrap_or_else(|| {
            warn!(capability = "world_graph", "missing dependency, using null object");
            Box::new(EmptyWorld)
        });
        let sink = self.sink.unwrap_or_else(|| {
            warn!(capability = "persistence", "missing dependency, using null object");
            Box::new(NullSink)
        });
        let companion = self.companion.unwrap_or_else(CompanionProbe::idle);
        let catalog = self.catalog.unwrap_or_else(ItemCatalog::standard);

        let config = self.config;
        SimulationContext {
            vitals: config.vitals.starting_vitals(),
            survival: SurvivalSimulator::new(config.vitals.clone()),
            market: MarketPriceEngine::new(config.market_config(), catalog),
            companion_seen: companion.status(),
            config,
            time,
            world_graph,
            sink,
            companion,
            bus: EventBus::new(),
            world: WorldStateAuthority::new(),
            attributes: Attributes::default(),
            buffs: BuffLedger::new(),
            activity: Activity::default(),
            death: DeathGuard::new(),
            pending_locations: VecDeque::new(),
            notices: VecDeque::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// All live simulation state and the capabilities it runs against.
pub struct SimulationContext {
    config: SimulationConfig,
    time: Box<dyn TimeSource>,
    world_graph: Box<dyn WorldGraph>,
    sink: Box<dyn PersistenceSink>,
    companion: CompanionProbe,
    companion_seen: ProbeStatus,
    bus: EventBus,
    world: WorldStateAuthority,
    vitals: PlayerVitals,
    attributes: Attributes,
    buffs: BuffLedger,
    activity: Activity,
    survival: SurvivalSimulator,
    death: DeathGuard,
    market: MarketPriceEngine,
    pending_locations: VecDeque<LocationRequest>,
    notices: VecDeque<UserNotice>,
}

impl core::fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulationContext")
            .field("world", &self.world)
            .field("vitals", &self.vitals)
            .field("attributes", &self.attributes)
            .field("total_minutes", &self.time.total_minutes())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl SimulationContext {
    /// Start building a context.
    pub fn builder(config: SimulationConfig) -> ContextBuilder {
        ContextBuilder {
            config,
            time: None,
            world: None,
            sink: None,
            catalog: None,
            companion: None,
        }
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Return every subsystem to its initial state. The player has no
    /// location afterwards.
    pub fn reset(&mut self) {
        self.time.reset();
        self.vitals = self.config.vitals.starting_vitals();
        self.attributes = Attributes::default();
        self.buffs.clear();
        self.activity = Activity::default();
        self.survival.reset();
        self.death.reset();
        self.market.reset();
        self.world.reset();
        self.pending_locations.clear();
        debug!("simulation reset");
    }

    /// Reset and place the player at the starting location.
    ///
    /// The start is `world.starting_location` from the configuration, or the
    /// world graph's normal-layer start.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingDependency`] if neither is available;
    /// the game is reset but the player has no location.
    pub fn new_game(&mut self, attributes: Attributes) -> Result<&LocationRecord, CoreError> {
        self.reset();
        self.attributes = attributes;
        let start = self
            .config
            .world
            .starting_location
            .clone()
            .map(LocationId::from)
            .or_else(|| self.world_graph.starting_location(WorldMode::Normal).cloned())
            .ok_or(CoreError::MissingDependency {
                capability: "starting location",
            })?;

        let record = self.world.set_current_location(
            start,
            ChangeReason::NewGame,
            self.world_graph.as_ref(),
            &mut self.bus,
        );
        info!(location = %record.id, "new game started");
        self.world
            .current_location()
            .ok_or(CoreError::MissingDependency {
                capability: "starting location",
            })
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    /// The configuration the context was built with.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Player vitals.
    pub const fn vitals(&self) -> &PlayerVitals {
        &self.vitals
    }

    /// Base attributes.
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Active buffs.
    pub const fn buffs(&self) -> &BuffLedger {
        &self.buffs
    }

    /// Attribute value including buffs active at `now`.
    pub fn effective_attribute(&self, attribute: Attribute, now: DateTime<Utc>) -> u32 {
        self.buffs.effective(&self.attributes, attribute, now)
    }

    /// Read-only view of the world-state authority.
    pub const fn world_state(&self) -> &WorldStateAuthority {
        &self.world
    }

    /// The player's current location.
    pub const fn current_location(&self) -> Option<&LocationRecord> {
        self.world.current_location()
    }

    /// The current world mode.
    pub const fn current_world(&self) -> WorldMode {
        self.world.current_world()
    }

    /// Look up a location in the current mode's layer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidReference`] if the graph does not know
    /// the id. Travel still accepts such ids as opaque records.
    pub fn lookup_location(&self, id: &LocationId) -> Result<&LocationRecord, CoreError> {
        self.world_graph
            .lookup(self.world.current_world(), id)
            .ok_or_else(|| CoreError::InvalidReference {
                kind: "location",
                id: id.to_string(),
            })
    }

    /// The world graph in use.
    pub fn world_graph(&self) -> &dyn WorldGraph {
        self.world_graph.as_ref()
    }

    /// The time source in use.
    pub fn time(&self) -> &dyn TimeSource {
        self.time.as_ref()
    }

    /// Mutable access to the time source (pause, speed).
    pub fn time_mut(&mut self) -> &mut dyn TimeSource {
        self.time.as_mut()
    }

    /// The market engine.
    pub const fn market(&self) -> &MarketPriceEngine {
        &self.market
    }

    /// Mutable access to the market engine (events).
    pub const fn market_mut(&mut self) -> &mut MarketPriceEngine {
        &mut self.market
    }

    /// The survival simulator.
    pub const fn survival(&self) -> &SurvivalSimulator {
        &self.survival
    }

    /// Whether a death sequence is running.
    pub const fn is_dead(&self) -> bool {
        self.death.is_in_progress()
    }

    /// Companion status last seen by the polling step.
    pub const fn companion_status(&self) -> ProbeStatus {
        self.companion_seen
    }

    /// Location requests waiting for the next polling step.
    pub fn pending_location_requests(&self) -> usize {
        self.pending_locations.len()
    }

    // -------------------------------------------------------------------
    // Events and notices
    // -------------------------------------------------------------------

    /// Subscribe to a topic.
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> caravan_types::SubscriptionId
    where
        F: FnMut(&GameEvent) + Send + 'static,
    {
        self.bus.subscribe(topic, handler)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: caravan_types::SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Queue a notice for the player.
    pub fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push_back(UserNotice {
            level,
            message: message.into(),
            raised_at: Utc::now(),
        });
    }

    /// Take every queued notice.
    pub fn drain_notices(&mut self) -> Vec<UserNotice> {
        self.notices.drain(..).collect()
    }

    // -------------------------------------------------------------------
    // Location
    // -------------------------------------------------------------------

    /// Move the player now.
    pub fn travel_to(
        &mut self,
        target: impl Into<LocationTarget>,
        reason: ChangeReason,
    ) -> LocationRecord {
        let record = self.world.set_current_location(
            target,
            reason,
            self.world_graph.as_ref(),
            &mut self.bus,
        );
        self.market.ensure_market(&record.id);
        record
    }

    /// Queue a move for the next frame's polling step.
    pub fn request_location(&mut self, target: impl Into<LocationTarget>, reason: ChangeReason) {
        self.pending_locations.push_back(LocationRequest {
            target: target.into(),
            reason,
        });
    }

    /// Return to the previous location.
    pub fn go_back(&mut self) -> Option<LocationRecord> {
        self.world.go_back(self.world_graph.as_ref(), &mut self.bus)
    }

    /// Enter the doom world.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WorldState`] if already there or no entry exists.
    pub fn enter_doom(&mut self, entry: Option<LocationTarget>) -> Result<LocationRecord, CoreError> {
        Ok(self
            .world
            .enter_doom(entry, self.world_graph.as_ref(), &mut self.bus)?)
    }

    /// Leave the doom world.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WorldState`] if not there or nowhere to return.
    pub fn exit_doom(&mut self) -> Result<LocationRecord, CoreError> {
        Ok(self
            .world
            .exit_doom(self.world_graph.as_ref(), &mut self.bus)?)
    }

    // -------------------------------------------------------------------
    // Player actions
    // -------------------------------------------------------------------

    /// Set what the player is doing.
    pub const fn set_activity(&mut self, activity: Activity) {
        self.activity = activity;
    }

    /// Eat: restore hunger and some health.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Survival`] on arithmetic overflow.
    pub fn eat(&mut self, hunger: Decimal, health: Decimal) -> Result<(), CoreError> {
        Ok(apply_eat(&mut self.vitals, hunger, health)?)
    }

    /// Drink: restore thirst.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Survival`] on arithmetic overflow.
    pub fn drink(&mut self, thirst: Decimal) -> Result<(), CoreError> {
        Ok(apply_drink(&mut self.vitals, thirst)?)
    }

    /// Rest: restore stamina.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Survival`] on arithmetic overflow.
    pub fn rest(&mut self, stamina: Decimal) -> Result<(), CoreError> {
        Ok(apply_rest(&mut self.vitals, stamina)?)
    }

    /// Heal (or, with a negative amount, hurt). Triggers death at zero health.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Survival`] on arithmetic overflow.
    pub fn heal(&mut self, amount: Decimal) -> Result<(), CoreError> {
        apply_heal(&mut self.vitals, amount)?;
        if let Some(cause) = caravan_survival::check_death(&self.vitals) {
            let _ = self.trigger_death(cause);
        }
        Ok(())
    }

    /// Spend stamina. Returns `false` if the player has too little.
    pub fn spend_stamina(&mut self, cost: Decimal) -> bool {
        spend_stamina(&mut self.vitals, cost)
    }

    /// Add a timed buff.
    pub fn add_buff(&mut self, buff: TimedBuff) {
        self.buffs.add(buff);
    }

    /// Start the death sequence and publish `vitals:death`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReentrancyViolation`] if a death sequence is
    /// already running. The trigger is suppressed and nothing is published.
    pub fn trigger_death(&mut self, cause: DeathCause) -> Result<(), CoreError> {
        let bus = &mut self.bus;
        if self
            .death
            .run(cause, |cause| bus.publish(&GameEvent::Death { cause }))
        {
            Ok(())
        } else {
            Err(CoreError::ReentrancyViolation)
        }
    }

    // -------------------------------------------------------------------
    // Market
    // -------------------------------------------------------------------

    /// Live price of an item at a location. `None` for unknown items.
    pub fn price(&mut self, location: &LocationId, item: &ItemId) -> Option<u32> {
        self.market.price(location, item)
    }

    /// Stock of an item at a location. `None` for unknown items.
    pub fn stock(&mut self, location: &LocationId, item: &ItemId) -> Option<u32> {
        self.market.stock(location, item)
    }

    /// Buy at the current location using buff-inclusive charisma.
    ///
    /// Returns `Ok(None)` for unknown items or when the player has no
    /// location.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Market`] if the trade cannot execute.
    pub fn purchase(
        &mut self,
        item: &ItemId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<TradeReceipt>, CoreError> {
        let Some(location) = self.world.current_location().map(|r| r.id.clone()) else {
            return Ok(None);
        };
        let charisma = self.effective_attribute(Attribute::Charisma, now);
        Ok(self.market.purchase(&location, item, quantity, charisma)?)
    }

    /// Sell at the current location using buff-inclusive charisma.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Market`] if the trade cannot execute.
    pub fn sell(
        &mut self,
        item: &ItemId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<TradeReceipt>, CoreError> {
        let Some(location) = self.world.current_location().map(|r| r.id.clone()) else {
            return Ok(None);
        };
        let charisma = self.effective_attribute(Attribute::Charisma, now);
        Ok(self.market.sell(&location, item, quantity, charisma)?)
    }

    // -------------------------------------------------------------------
    // Frame steps (driven by the scheduler, in this order)
    // -------------------------------------------------------------------

    /// Step 1: advance game time by a clamped real delta.
    pub(crate) fn advance_time(&mut self, real_ms: u64) -> Result<(), ClockError> {
        self.time.advance(real_ms)
    }

    /// Step 2: one consistent reading of the clock for the rest of the frame.
    pub fn time_snapshot(&self) -> TimeSnapshot {
        TimeSnapshot::capture(self.time.as_ref())
    }

    /// Step 3: survival decay and regen.
    pub(crate) fn survival_step(
        &mut self,
        snapshot: &TimeSnapshot,
        now: DateTime<Utc>,
    ) -> Result<SurvivalOutcome, SurvivalError> {
        let Some(total_minutes) = snapshot.total_minutes else {
            return Ok(SurvivalOutcome::default());
        };
        if self.death.is_in_progress() {
            return Ok(SurvivalOutcome::default());
        }
        let inputs = SurvivalInputs {
            total_minutes,
            paused: snapshot.paused,
            activity: self.activity,
            season: snapshot.season_effects,
            world_mode: self.world.current_world(),
            endurance: self.effective_attribute(Attribute::Endurance, now),
        };
        let outcome = self.survival.tick(&mut self.vitals, &inputs)?;
        if let Some(cause) = outcome.death {
            let _ = self.trigger_death(cause);
        }
        Ok(outcome)
    }

    /// Step 4: market resample and restock.
    pub(crate) fn market_step(&mut self, snapshot: &TimeSnapshot) -> MarketTickReport {
        match snapshot.total_minutes {
            Some(total) if !snapshot.paused => self.market.tick(total, &snapshot.time_info),
            _ => MarketTickReport::default(),
        }
    }

    /// Step 5: buff expiry, queued location requests, companion status.
    pub(crate) fn poll(&mut self, now: DateTime<Utc>) -> PollReport {
        let expired_buffs = self.buffs.expire(now).len();

        let mut location_changes: usize = 0;
        while let Some(request) = self.pending_locations.pop_front() {
            self.travel_to(request.target, request.reason);
            location_changes = location_changes.saturating_add(1);
        }

        let companion = self.companion.status();
        if companion != self.companion_seen {
            info!(from = %self.companion_seen, to = %companion, "companion status changed");
            if companion == ProbeStatus::Unavailable {
                self.push_notice(NoticeLevel::Info, "The companion is unavailable right now.");
            }
            self.companion_seen = companion;
        }

        PollReport {
            expired_buffs,
            location_changes,
            companion,
        }
    }

    // -------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------

    /// Snapshot all persisted state.
    pub fn save_state(&self) -> SaveSnapshot {
        SaveSnapshot {
            version: SAVE_VERSION,
            snapshot_id: SnapshotId::new(),
            saved_at: Utc::now(),
            world: self.world.snapshot(),
            player: PlayerSnapshot {
                stats: self.vitals.clone(),
                attributes: self.attributes,
                buffs: self.buffs.buffs().to_vec(),
            },
            survival: SurvivalSnapshot {
                last_processed_minutes: self.survival.last_processed_minutes(),
            },
            market_prices: self.market.prices().clone(),
            market_last_processed_minutes: self.market.last_processed_minutes(),
            time_state: self.time.snapshot_state(),
            time_speed: self.time.speed(),
        }
    }

    /// Replace all live state from a snapshot.
    ///
    /// Everything is validated and rebuilt first; live state is only
    /// replaced once nothing else can fail. Publishes `world:changed` (if the
    /// mode differs) and `location:changed` with [`ChangeReason::Load`]
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSnapshot`] for out-of-range vitals or
    /// market records, or [`CoreError::Clock`] for unusable clock state.
    /// Live state is unchanged on error.
    pub fn load_state(&mut self, snapshot: SaveSnapshot) -> Result<(), CoreError> {
        let stats = snapshot.player.stats;
        if !stats.is_within_bounds() {
            return Err(CoreError::InvalidSnapshot {
                reason: "player stats outside [0, max]".to_owned(),
            });
        }
        self.market
            .validate_prices(&snapshot.market_prices)
            .map_err(|e| CoreError::InvalidSnapshot {
                reason: e.to_string(),
            })?;
        let world = WorldStateAuthority::from_snapshot(&snapshot.world);
        let buffs = BuffLedger::from_buffs(snapshot.player.buffs);

        // The clock validates before mutating, so it is the last fallible step.
        self.time
            .restore_state(snapshot.time_state, snapshot.time_speed)?;

        let previous_world = self.world.current_world();
        self.world = world;
        self.vitals = stats;
        self.attributes = snapshot.player.attributes;
        self.buffs = buffs;
        self.activity = Activity::default();
        self.survival
            .restore(snapshot.survival.last_processed_minutes);
        self.market.restore(
            snapshot.market_prices,
            snapshot.market_last_processed_minutes,
        );
        self.death.reset();
        self.pending_locations.clear();

        info!(
            snapshot_id = %snapshot.snapshot_id,
            world = %self.world.current_world(),
            location = ?self.world.current_location().map(|r| r.id.as_str()),
            "game loaded"
        );
        self.world
            .announce(ChangeReason::Load, previous_world, &mut self.bus);
        Ok(())
    }

    /// Encode and store a snapshot in `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Persistence`] if encoding or storage fails.
    pub fn save_to_sink(&mut self, slot: &str) -> Result<SnapshotId, CoreError> {
        let snapshot = self.save_state();
        let payload = persistence::encode(&snapshot)?;
        self.sink.store(slot, &payload)?;
        debug!(slot, snapshot_id = %snapshot.snapshot_id, "game saved");
        Ok(snapshot.snapshot_id)
    }

    /// Fetch, decode and load the snapshot in `slot`.
    ///
    /// A malformed save is reported as a notice as well as an error; the
    /// running game is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Persistence`] for empty slots, storage failures
    /// or malformed data, and whatever [`load_state`](Self::load_state)
    /// returns.
    pub fn load_from_sink(&mut self, slot: &str) -> Result<(), CoreError> {
        let result = self
            .sink
            .fetch(slot)
            .and_then(|payload| {
                payload.ok_or_else(|| persistence::PersistenceError::EmptySlot {
                    slot: slot.to_owned(),
                })
            })
            .and_then(|payload| persistence::decode(&payload))
            .map_err(CoreError::from)
            .and_then(|snapshot| self.load_state(snapshot));

        if let Err(err) = &result {
            warn!(slot, error = %err, "load failed");
            self.push_notice(NoticeLevel::Error, format!("Could not load save '{slot}': {err}"));
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use std::sync::{Arc, Mutex};

    use caravan_world::{NORMAL_START, create_starting_world};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::clock::{ClockConfig, GameClock};
    use crate::persistence::MemorySink;

    fn context() -> SimulationContext {
        let mut builder = SimulationContext::builder(SimulationConfig::default())
            .persistence(Box::new(MemorySink::new()));
        if let Ok(world) = create_starting_world() {
            builder = builder.world_graph(Box::new(world));
        }
        if let Ok(clock) = GameClock::new(ClockConfig::default()) {
            builder = builder.time_source(Box::new(clock));
        }
        builder.build()
    }

    #[test]
    fn builder_without_capabilities_uses_null_objects() {
        let mut ctx = SimulationContext::builder(SimulationConfig::default()).build();
        assert_eq!(ctx.time().total_minutes(), None);
        assert!(matches!(
            ctx.new_game(Attributes::default()),
            Err(CoreError::MissingDependency { .. })
        ));
        let record = ctx.travel_to("anywhere", ChangeReason::Travel);
        assert!(record.is_opaque());
        assert!(ctx.save_to_sink("slot").is_ok());
        assert!(ctx.load_from_sink("slot").is_err());
    }

    #[test]
    fn new_game_places_player_at_start() {
        let mut ctx = context();
        let location = ctx.new_game(Attributes::default()).map(|r| r.id.clone());
        assert_eq!(location.ok(), Some(LocationId::new(NORMAL_START)));
        assert_eq!(ctx.vitals(), &ctx.config().vitals.starting_vitals());
        assert_eq!(ctx.current_world(), WorldMode::Normal);
    }

    #[test]
    fn configured_start_overrides_graph() {
        let mut config = SimulationConfig::default();
        config.world.starting_location = Some("kingsport".to_owned());
        let mut builder = SimulationContext::builder(config);
        if let Ok(world) = create_starting_world() {
            builder = builder.world_graph(Box::new(world));
        }
        let mut ctx = builder.build();
        let location = ctx.new_game(Attributes::default()).map(|r| r.id.clone());
        assert_eq!(location.ok(), Some(LocationId::new("kingsport")));
    }

    #[test]
    fn death_publishes_once() {
        let mut ctx = context();
        let deaths = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&deaths);
        ctx.subscribe(Topic::Death, move |_| {
            if let Ok(mut n) = counter.lock() {
                *n = n.saturating_add(1);
            }
        });

        assert!(ctx.heal(dec!(-500)).is_ok());
        assert!(ctx.is_dead());
        assert!(matches!(
            ctx.trigger_death(DeathCause::Injury),
            Err(CoreError::ReentrancyViolation)
        ));
        assert!(ctx.heal(dec!(-1)).is_ok());
        assert_eq!(deaths.lock().map(|n| *n).unwrap_or(0), 1);

        let _ = ctx.new_game(Attributes::default());
        assert!(!ctx.is_dead());
    }

    #[test]
    fn lookup_is_scoped_to_current_mode() {
        let mut ctx = context();
        let _ = ctx.new_game(Attributes::default());
        assert!(ctx.lookup_location(&LocationId::new("kingsport")).is_ok());
        assert!(matches!(
            ctx.lookup_location(&LocationId::new("the_maw")),
            Err(CoreError::InvalidReference { kind: "location", .. })
        ));
        let _ = ctx.enter_doom(None);
        assert!(ctx.lookup_location(&LocationId::new("the_maw")).is_ok());
    }

    #[test]
    fn queued_location_applied_on_poll() {
        let mut ctx = context();
        let _ = ctx.new_game(Attributes::default());
        ctx.request_location("riverbank", ChangeReason::Travel);
        assert_eq!(ctx.pending_location_requests(), 1);
        assert_eq!(
            ctx.current_location().map(|r| r.id.as_str()),
            Some(NORMAL_START)
        );

        let report = ctx.poll(Utc::now());
        assert_eq!(report.location_changes, 1);
        assert_eq!(
            ctx.current_location().map(|r| r.id.as_str()),
            Some("riverbank")
        );
    }

    #[test]
    fn trades_use_current_location_and_buffed_charisma() {
        let mut ctx = context();
        let _ = ctx.new_game(Attributes::default());
        let bread = ItemId::new("bread");
        let now = Utc::now();
        let base = ctx
            .price(&LocationId::new(NORMAL_START), &bread)
            .unwrap_or(0);

        ctx.add_buff(TimedBuff {
            attribute: Attribute::Charisma,
            amount: 10,
            expires_at: now + chrono::Duration::minutes(5),
            source: "silver tongue".to_owned(),
        });
        let receipt = ctx.purchase(&bread, 1, now).ok().flatten();
        let unit = receipt.map(|r| r.unit_price).unwrap_or(0);
        assert!(unit < base, "buffed charisma should discount: {unit} vs {base}");
    }

    #[test]
    fn load_rejects_out_of_range_vitals_without_mutation() {
        let mut ctx = context();
        let _ = ctx.new_game(Attributes::default());
        let mut snapshot = ctx.save_state();
        snapshot.player.stats.health = dec!(500);
        ctx.travel_to("greenwood", ChangeReason::Travel);

        assert!(matches!(
            ctx.load_state(snapshot),
            Err(CoreError::InvalidSnapshot { .. })
        ));
        assert_eq!(
            ctx.current_location().map(|r| r.id.as_str()),
            Some("greenwood")
        );
    }

    #[test]
    fn malformed_save_raises_notice() {
        let mut sink = MemorySink::new();
        let _ = sink.store("broken", "{\"version\": 1");
        let mut ctx = SimulationContext::builder(SimulationConfig::default())
            .persistence(Box::new(sink))
            .build();
        assert!(ctx.load_from_sink("broken").is_err());
        let notices = ctx.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.first().map(|n| n.level), Some(NoticeLevel::Error));
        assert!(ctx.drain_notices().is_empty());
    }
}
