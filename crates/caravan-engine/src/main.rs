//! Headless host for the Caravan simulation.
//!
//! Loads `caravan-config.yaml` (or the file named by `CARAVAN_CONFIG`),
//! builds a [`SimulationContext`] with the starting world, a game clock and
//! file-backed saves, then drives the frame scheduler on a fixed interval
//! until Ctrl-C. The game autosaves periodically and once more on shutdown.
//!
//! # Architecture
//!
//! ```text
//! tokio interval --> UpdateScheduler::frame --> SimulationContext
//!                                                 (time, survival, market, polling)
//! ```

mod companion;
mod error;
mod storage;

use std::path::PathBuf;
use std::time::Duration;

use caravan_core::{
    CoreError, GameClock, LogFormat, NoticeLevel, PersistenceError, SimulationConfig,
    SimulationContext, SystemFrameClock, UpdateScheduler,
};
use caravan_types::Attributes;
use caravan_world::create_starting_world;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::storage::FileSink;

const ENV_CONFIG_PATH: &str = "CARAVAN_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "caravan-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, world construction or the first
/// placement of the player fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let config_path = std::env::var(ENV_CONFIG_PATH)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = if config_path.exists() {
        (SimulationConfig::from_file(&config_path)?, true)
    } else {
        (SimulationConfig::default(), false)
    };

    init_logging(&config)?;
    info!("caravan-engine starting");
    if from_file {
        info!(path = %config_path.display(), "configuration loaded");
    } else {
        warn!(path = %config_path.display(), "config file not found, using defaults");
    }
    info!(
        seed = config.world.seed,
        frame_interval_ms = config.scheduler.frame_interval_ms,
        save_dir = %config.persistence.save_dir.display(),
        "simulation configuration"
    );

    let world = create_starting_world()?;
    let clock = GameClock::new(config.clock.clone()).map_err(CoreError::from)?;
    let probe = companion::start_probe(&config.companion)?;
    let sink = FileSink::new(config.persistence.save_dir.clone());
    debug!(dir = %sink.dir().display(), "save storage ready");

    let mut ctx = SimulationContext::builder(config.clone())
        .world_graph(Box::new(world))
        .time_source(Box::new(clock))
        .persistence(Box::new(sink))
        .companion(probe)
        .build();

    let slot = config.persistence.autosave_slot.clone();
    let resumed = match ctx.load_from_sink(&slot) {
        Ok(()) => true,
        Err(CoreError::Persistence {
            source: PersistenceError::EmptySlot { .. },
        }) => {
            // First run.
            ctx.drain_notices();
            false
        }
        Err(e) => {
            error!(slot = %slot, error = %e, "autosave unusable, starting a new game");
            log_notices(&mut ctx);
            match FileSink::new(config.persistence.save_dir.clone()).set_aside(&slot) {
                Ok(Some(path)) => info!(path = %path.display(), "unusable autosave kept"),
                Ok(None) => {}
                Err(e) => error!(slot = %slot, error = %e, "could not set autosave aside"),
            }
            false
        }
    };
    if resumed {
        info!(slot = %slot, "resumed from autosave");
    } else {
        let start = ctx.new_game(Attributes::default())?;
        info!(location = %start.id, "new game");
    }

    run(&mut ctx, &config).await;

    match ctx.save_to_sink(&slot) {
        Ok(id) => info!(slot = %slot, snapshot_id = %id, "saved on shutdown"),
        Err(e) => error!(slot = %slot, error = %e, "final save failed"),
    }
    info!("caravan-engine stopped");
    Ok(())
}

/// Drive frames until Ctrl-C.
async fn run(ctx: &mut SimulationContext, config: &SimulationConfig) {
    let mut scheduler = UpdateScheduler::new(SystemFrameClock::new(), config.scheduler.clone());
    let mut interval =
        tokio::time::interval(Duration::from_millis(config.scheduler.frame_interval_ms.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let autosave_every = config.persistence.autosave_every_frames;
    let slot = config.persistence.autosave_slot.as_str();

    info!("entering frame loop");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = scheduler.frame(ctx);
                if !report.skipped.is_empty() {
                    debug!(frame = report.frame, skipped = ?report.skipped, "frame ran partially");
                }
                if let Some(cause) = report.death {
                    info!(cause = %cause, minutes = ?report.total_minutes, "player died");
                }
                log_notices(ctx);
                if autosave_every > 0 && report.frame.checked_rem(autosave_every) == Some(0) {
                    if let Err(e) = ctx.save_to_sink(slot) {
                        warn!(error = %e, "autosave failed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                scheduler.stop();
                break;
            }
        }
    }
}

/// Log and clear pending player notices.
fn log_notices(ctx: &mut SimulationContext) {
    for notice in ctx.drain_notices() {
        match notice.level {
            NoticeLevel::Info => info!(message = %notice.message, "notice"),
            NoticeLevel::Warning => warn!(message = %notice.message, "notice"),
            NoticeLevel::Error => error!(message = %notice.message, "notice"),
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(config: &SimulationConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = match config.logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    result.map_err(|e| EngineError::Logging(e.to_string()))
}
