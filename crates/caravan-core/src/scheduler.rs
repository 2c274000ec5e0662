//! Frame scheduler: one ordered update per rendered frame.
//!
//! Every frame runs the same steps in the same order:
//!
//! 1. advance the clock by the real delta (clamped to
//!    `scheduler.max_frame_delta_ms`),
//! 2. take one [`TimeSnapshot`],
//! 3. survival decay,
//! 4. market resample and restock,
//! 5. polling (buff expiry, queued location requests, companion status).
//!
//! Steps 3 to 5 all read the same snapshot. A failing step is logged and
//! skipped for that frame; the remaining steps still run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use caravan_types::DeathCause;
use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::companion::ProbeStatus;
use crate::config::SchedulerConfig;
use crate::context::SimulationContext;

/// Source of real time for the scheduler.
pub trait FrameClock: Send {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&self) -> u64;

    /// Wall-clock time, used for buff expiry.
    fn wall_time(&self) -> DateTime<Utc>;
}

/// Real clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemFrameClock {
    origin: Instant,
}

impl SystemFrameClock {
    /// A clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemFrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemFrameClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and headless runs.
///
/// Clones share the same reading, so a test can keep one and hand the other
/// to the scheduler.
#[derive(Debug, Clone)]
pub struct ManualFrameClock {
    millis: Arc<AtomicU64>,
    wall_origin: DateTime<Utc>,
}

impl ManualFrameClock {
    /// A clock reading zero.
    pub fn new() -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(0)),
            wall_origin: Utc::now(),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, ms: u64) {
        let _ = self
            .millis
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |now| {
                Some(now.saturating_add(ms))
            });
    }
}

impl Default for ManualFrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for ManualFrameClock {
    fn now_ms(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }

    fn wall_time(&self) -> DateTime<Utc> {
        let elapsed = i64::try_from(self.now_ms()).unwrap_or(i64::MAX);
        self.wall_origin
            .checked_add_signed(chrono::TimeDelta::milliseconds(elapsed))
            .unwrap_or(self.wall_origin)
    }
}

/// A fallible frame step, as named in [`FrameReport::skipped`].
///
/// The market tick and polling cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    /// Clock advance.
    Time,
    /// Survival decay.
    Survival,
}

impl core::fmt::Display for FrameStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Survival => write!(f, "survival"),
        }
    }
}

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Whether the frame ran at all (false once the scheduler is stopped).
    pub ran: bool,
    /// Real milliseconds applied to the clock.
    pub delta_ms: u64,
    /// Whether the real delta was clamped.
    pub clamped: bool,
    /// Game minutes every step read.
    pub total_minutes: Option<u64>,
    /// Survival intervals applied.
    pub survival_intervals: u64,
    /// Market intervals processed.
    pub market_intervals: u64,
    /// Queued location requests applied.
    pub location_changes: usize,
    /// Buffs that expired.
    pub expired_buffs: usize,
    /// Death detected by the survival step.
    pub death: Option<DeathCause>,
    /// Companion status after polling.
    pub companion: ProbeStatus,
    /// Steps that failed and were skipped.
    pub skipped: Vec<FrameStep>,
}

/// Drives a [`SimulationContext`] one frame at a time.
pub struct UpdateScheduler<C: FrameClock> {
    clock: C,
    config: SchedulerConfig,
    running: bool,
    last_ms: Option<u64>,
    frames: u64,
}

impl<C: FrameClock> UpdateScheduler<C> {
    /// A running scheduler reading real time from `clock`.
    pub const fn new(clock: C, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config,
            running: true,
            last_ms: None,
            frames: 0,
        }
    }

    /// Whether frames still run.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Frames run so far.
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Stop the loop. Later calls to [`frame`](Self::frame) do nothing.
    pub fn stop(&mut self) {
        if self.running {
            debug!(frames = self.frames, "scheduler stopped");
        }
        self.running = false;
    }

    /// Run one frame.
    ///
    /// The first frame only records the real-time origin, so nothing
    /// advances on it.
    pub fn frame(&mut self, ctx: &mut SimulationContext) -> FrameReport {
        if !self.running {
            return FrameReport::default();
        }
        self.frames = self.frames.saturating_add(1);
        let mut report = FrameReport {
            frame: self.frames,
            ran: true,
            ..FrameReport::default()
        };

        let now = self.clock.now_ms();
        let raw = self.last_ms.map_or(0, |last| now.saturating_sub(last));
        self.last_ms = Some(now);
        report.delta_ms = raw.min(self.config.max_frame_delta_ms);
        report.clamped = raw > self.config.max_frame_delta_ms;
        if report.clamped {
            trace!(raw_ms = raw, applied_ms = report.delta_ms, "frame delta clamped");
        }

        if let Err(err) = ctx.advance_time(report.delta_ms) {
            warn!(frame = report.frame, step = %FrameStep::Time, error = %err, "frame step failed, skipped");
            report.skipped.push(FrameStep::Time);
        }

        let snapshot = ctx.time_snapshot();
        report.total_minutes = snapshot.total_minutes;
        let wall = self.clock.wall_time();

        match ctx.survival_step(&snapshot, wall) {
            Ok(outcome) => {
                report.survival_intervals = outcome.intervals;
                report.death = outcome.death;
            }
            Err(err) => {
                warn!(frame = report.frame, step = %FrameStep::Survival, error = %err, "frame step failed, skipped");
                report.skipped.push(FrameStep::Survival);
            }
        }

        let market = ctx.market_step(&snapshot);
        report.market_intervals = market.intervals;

        let poll = ctx.poll(wall);
        report.location_changes = poll.location_changes;
        report.expired_buffs = poll.expired_buffs;
        report.companion = poll.companion;

        report
    }

    /// Run `count` frames back to back, returning the last report.
    pub fn run_frames(&mut self, ctx: &mut SimulationContext, count: u64) -> FrameReport {
        let mut last = FrameReport::default();
        for _ in 0..count {
            if !self.running {
                break;
            }
            last = self.frame(ctx);
        }
        last
    }
}

impl<C: FrameClock + core::fmt::Debug> core::fmt::Debug for UpdateScheduler<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("clock", &self.clock)
            .field("running", &self.running)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use caravan_survival::Activity;
    use caravan_types::Attributes;
    use caravan_world::create_starting_world;

    use super::*;
    use crate::clock::{ClockConfig, GameClock};
    use crate::config::SimulationConfig;

    fn setup() -> (SimulationContext, UpdateScheduler<ManualFrameClock>, ManualFrameClock) {
        let mut builder = SimulationContext::builder(SimulationConfig::default());
        if let Ok(world) = create_starting_world() {
            builder = builder.world_graph(Box::new(world));
        }
        if let Ok(clock) = GameClock::new(ClockConfig::default()) {
            builder = builder.time_source(Box::new(clock));
        }
        let mut ctx = builder.build();
        let _ = ctx.new_game(Attributes::default());
        let clock = ManualFrameClock::new();
        let scheduler = UpdateScheduler::new(clock.clone(), SchedulerConfig::default());
        (ctx, scheduler, clock)
    }

    #[test]
    fn first_frame_only_records_origin() {
        let (mut ctx, mut scheduler, clock) = setup();
        clock.advance(5_000);
        let report = scheduler.frame(&mut ctx);
        assert!(report.ran);
        assert_eq!(report.delta_ms, 0);
        assert_eq!(report.survival_intervals, 0);
    }

    #[test]
    fn long_frames_are_clamped() {
        let (mut ctx, mut scheduler, clock) = setup();
        scheduler.frame(&mut ctx);
        let before = ctx.time().total_minutes().unwrap_or(0);
        clock.advance(60_000);
        let report = scheduler.frame(&mut ctx);
        assert!(report.clamped);
        assert_eq!(report.delta_ms, SchedulerConfig::default().max_frame_delta_ms);
        // 100 ms at 60x is six game seconds: not a full minute.
        assert_eq!(ctx.time().total_minutes().unwrap_or(0), before);
    }

    #[test]
    fn steady_frames_decay_survival_and_tick_market() {
        let (mut ctx, mut scheduler, clock) = setup();
        ctx.set_activity(Activity {
            gathering: true,
            traveling: false,
        });
        let start_hunger = ctx.vitals().hunger;
        scheduler.frame(&mut ctx);

        // 20 game minutes: 200 frames of 100 ms at 60x.
        let mut survival = 0;
        let mut market = 0;
        for _ in 0..200 {
            clock.advance(100);
            let report = scheduler.frame(&mut ctx);
            assert!(report.skipped.is_empty());
            survival += report.survival_intervals;
            market += report.market_intervals;
        }
        assert_eq!(survival, 4);
        assert_eq!(market, 0);
        assert!(ctx.vitals().hunger < start_hunger);
    }

    #[test]
    fn paused_clock_freezes_everything() {
        let (mut ctx, mut scheduler, clock) = setup();
        scheduler.frame(&mut ctx);
        ctx.time_mut().set_paused(true);
        let vitals = ctx.vitals().clone();
        let minutes = ctx.time().total_minutes();
        for _ in 0..100 {
            clock.advance(100);
            scheduler.frame(&mut ctx);
        }
        assert_eq!(ctx.vitals(), &vitals);
        assert_eq!(ctx.time().total_minutes(), minutes);
    }

    #[test]
    fn stopped_scheduler_does_nothing() {
        let (mut ctx, mut scheduler, clock) = setup();
        scheduler.frame(&mut ctx);
        scheduler.stop();
        assert!(!scheduler.is_running());
        clock.advance(100);
        let report = scheduler.frame(&mut ctx);
        assert!(!report.ran);
        assert_eq!(scheduler.frames(), 1);
        assert_eq!(scheduler.run_frames(&mut ctx, 10).frame, 0);
    }

    #[test]
    fn manual_clock_clones_share_reading() {
        let clock = ManualFrameClock::new();
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 250);
        assert!(other.wall_time() > clock.wall_origin);
    }
}
